use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgMatches};
use rtk_rover::RoverConfig;
use serialport::{FlowControl as SerialFlowControl, SerialPort};

pub fn build() -> clap::Command {
    clap::Command::new("rover")
        .author(clap::crate_authors!())
        .version(clap::crate_version!())
        .about("RTK rover: drives a u-blox receiver and relays NTRIP corrections to it")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            clap::Command::new("run")
                .about("Connect to the receiver and start the dispatcher and the NTRIP relay")
                .arg(
                    Arg::new("port")
                        .value_name("port")
                        .short('p')
                        .long("port")
                        .required(true)
                        .help("Serial port the receiver is connected to"),
                )
                .arg(
                    Arg::new("baud")
                        .value_name("baud")
                        .short('s')
                        .long("baud")
                        .default_value("38400")
                        .value_parser(value_parser!(u32))
                        .help("Baud rate for the selected port"),
                )
                .arg(
                    Arg::new("config")
                        .value_name("file")
                        .short('c')
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML file with the rover configuration"),
                )
                .arg(
                    Arg::new("server")
                        .long("server")
                        .help("NTRIP caster host, overrides the configuration file"),
                )
                .arg(
                    Arg::new("ntrip-port")
                        .long("ntrip-port")
                        .value_parser(value_parser!(u16))
                        .help("NTRIP caster port"),
                )
                .arg(
                    Arg::new("mountpoint")
                        .long("mountpoint")
                        .help("Mountpoint to request corrections from"),
                )
                .arg(Arg::new("user").long("user").help("NTRIP user name"))
                .arg(
                    Arg::new("password")
                        .long("password")
                        .help("NTRIP password"),
                )
                .arg(
                    Arg::new("relay")
                        .long("relay")
                        .action(clap::ArgAction::SetTrue)
                        .help("Enable the correction relay right away"),
                )
                .arg(
                    Arg::new("rate")
                        .value_name("ms")
                        .long("rate")
                        .value_parser(value_parser!(u16))
                        .help("Measurement period to configure on startup"),
                )
                .arg(
                    Arg::new("status-interval")
                        .value_name("secs")
                        .long("status-interval")
                        .default_value("10")
                        .value_parser(value_parser!(u64))
                        .help("Seconds between status reports, 0 disables them"),
                ),
        )
        .subcommand(
            clap::Command::new("decode")
                .about("Decode UBX frames read from stdin and print them"),
        )
        .subcommand(
            clap::Command::new("print-config")
                .about("Print the default configuration as TOML"),
        )
}

/// Configuration file (or defaults) with the command line overrides applied
pub fn rover_config(args: &ArgMatches) -> Result<RoverConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        },
        None => RoverConfig::default(),
    };

    let ntrip = &mut config.ntrip;
    if let Some(server) = args.get_one::<String>("server") {
        ntrip.server.clone_from(server);
    }
    if let Some(port) = args.get_one::<u16>("ntrip-port") {
        ntrip.port = *port;
    }
    if let Some(mountpoint) = args.get_one::<String>("mountpoint") {
        ntrip.mountpoint.clone_from(mountpoint);
    }
    if let Some(user) = args.get_one::<String>("user") {
        ntrip.user.clone_from(user);
    }
    if let Some(password) = args.get_one::<String>("password") {
        ntrip.password.clone_from(password);
    }
    Ok(config)
}

pub fn status_interval(args: &ArgMatches) -> Option<Duration> {
    match args.get_one::<u64>("status-interval").copied() {
        Some(0) | None => None,
        Some(secs) => Some(Duration::from_secs(secs)),
    }
}

pub fn serialport(args: &ArgMatches) -> Result<Box<dyn SerialPort>> {
    let port = args
        .get_one::<String>("port")
        .context("Missing 'port' argument")?;
    let baud = args.get_one::<u32>("baud").copied().unwrap_or(38400);

    serialport::new(port, baud)
        .timeout(Duration::from_millis(10))
        .flow_control(SerialFlowControl::None)
        .open()
        .with_context(|| format!("Failed to open port: {}", port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_on_defaults() {
        let matches = build()
            .try_get_matches_from([
                "rover",
                "run",
                "--port",
                "/dev/ttyACM0",
                "--server",
                "caster.example.org",
                "--mountpoint",
                "MP1",
                "--ntrip-port",
                "2102",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        let config = rover_config(args).unwrap();
        assert_eq!(config.ntrip.server, "caster.example.org");
        assert_eq!(config.ntrip.mountpoint, "MP1");
        assert_eq!(config.ntrip.port, 2102);
        assert_eq!(config.ntrip.version, "2.0");
        assert_eq!(status_interval(args), Some(Duration::from_secs(10)));
        assert!(!args.get_flag("relay"));
    }

    #[test]
    fn test_run_requires_port() {
        assert!(build().try_get_matches_from(["rover", "run"]).is_err());
    }
}
