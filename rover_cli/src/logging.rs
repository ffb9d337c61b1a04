use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "ROVER_LOGLEVEL";

fn default_directives() -> String {
    format!("rtk_rover=info,{}=info", env!("CARGO_CRATE_NAME"))
}

/// `RUST_LOG` wins over `ROVER_LOGLEVEL`; without either the rover and the
/// CLI log at info.
pub fn initialize() {
    let directives = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV))
        .unwrap_or_else(|_| default_directives());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| {
        eprintln!("Invalid log filter '{}', using defaults", directives);
        EnvFilter::new(default_directives())
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
