use std::{
    io::{self, Read, Write},
    sync::Arc,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::ArgMatches;
use rtk_rover::{
    serial::{run_reader, run_writer},
    GnssHandler, NtripClient, RoverConfig, RoverContext, UbxMessage,
};
use serialport::SerialPort;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, DuplexStream},
    sync::mpsc,
    time::timeout,
};
use tracing::{error, info, warn};

mod cli;
mod logging;

/// Upper bound for a status poll, the library itself waits forever
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

fn main() -> Result<()> {
    let matches = cli::build().get_matches();
    logging::initialize();

    match matches.subcommand() {
        Some(("run", args)) => run(args),
        Some(("decode", _)) => decode_stdin(),
        Some(("print-config", _)) => {
            print!("{}", toml::to_string(&RoverConfig::default())?);
            Ok(())
        },
        _ => Ok(()),
    }
}

fn run(args: &ArgMatches) -> Result<()> {
    let config = cli::rover_config(args)?;
    let port = cli::serialport(args)?;
    let status_interval = cli::status_interval(args);
    let relay = args.get_flag("relay");
    let rate = args.get_one::<u16>("rate").copied();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the runtime")?;

    rt.block_on(async move {
        let ctx = Arc::new(RoverContext::new(&config));
        let (device, rover) = tokio::io::duplex(4096);
        bridge_serialport(port, device)?;

        let (rover_rx, rover_tx) = tokio::io::split(rover);
        let reader = {
            let ctx = ctx.clone();
            tokio::spawn(async move { run_reader(&ctx, rover_rx).await })
        };
        {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                if let Err(e) = run_writer(&ctx, rover_tx).await {
                    error!("Serial writer stopped: {}", e);
                }
            });
        }
        {
            let client = NtripClient::new(ctx.clone(), config.ntrip.clone());
            tokio::spawn(async move { client.run().await });
        }

        let gnss = GnssHandler::new(ctx);
        startup(&gnss, rate, relay).await;
        if let Some(interval) = status_interval {
            tokio::spawn(report_status(gnss, interval));
        }

        match reader.await {
            Ok(Ok(())) => info!("Receiver closed the serial link"),
            Ok(Err(e)) => return Err(e).context("Serial link failed"),
            Err(e) => return Err(e).context("Dispatcher task failed"),
        }
        Ok::<(), anyhow::Error>(())
    })
}

/// Reduce the receiver's NMEA output to GGA and apply the command line settings
async fn startup(gnss: &GnssHandler, rate: Option<u16>, relay: bool) {
    match timeout(STATUS_TIMEOUT, gnss.set_minimum_nmea_msgs()).await {
        Ok(Ok(())) => info!("NMEA output reduced to GGA"),
        Ok(Err(e)) => warn!("Failed to configure NMEA output: {}", e),
        Err(_) => warn!("Receiver did not answer the NMEA configuration"),
    }
    if let Some(rate) = rate {
        match timeout(STATUS_TIMEOUT, gnss.set_update_rate(rate)).await {
            Ok(Ok(true)) => info!(rate, "update rate set"),
            Ok(Ok(false)) => warn!(rate, "receiver rejected the update rate"),
            Ok(Err(e)) => warn!("Failed to set update rate: {}", e),
            Err(_) => warn!("Receiver did not answer the update rate change"),
        }
    }
    if relay {
        gnss.set_relay_enabled(true);
    }
}

async fn report_status(gnss: GnssHandler, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match timeout(STATUS_TIMEOUT, gnss.real_time_message()).await {
            Ok(Ok(msg)) => info!(
                time = %msg.time,
                fix = msg.fix_type.description(),
                lat = %msg.lat,
                lon = %msg.lon,
                elev = %msg.elev,
                h_acc = msg.h_acc,
                v_acc = msg.v_acc,
                relay = msg.rtcm_enabled,
                "status"
            ),
            Ok(Err(e)) => warn!("Status poll failed: {}", e),
            Err(_) => warn!("Receiver did not answer the status poll"),
        }
    }
}

/// The serial port is blocking: one thread per direction moves bytes between
/// it and the device end of the in-memory pipe.
fn bridge_serialport(port: Box<dyn SerialPort>, device: DuplexStream) -> Result<()> {
    let mut port_rx = port;
    let mut port_tx = port_rx
        .try_clone()
        .context("Failed to clone the serial port handle")?;
    let (mut device_rx, mut device_tx) = tokio::io::split(device);

    let (incoming_tx, mut incoming_rx) = mpsc::channel::<Vec<u8>>(64);
    thread::spawn(move || read_port(&mut port_rx, &incoming_tx));
    tokio::spawn(async move {
        while let Some(chunk) = incoming_rx.recv().await {
            if device_tx.write_all(&chunk).await.is_err() {
                break;
            }
        }
        // the dispatcher sees end of stream once the port is gone
        let _ = device_tx.shutdown().await;
    });

    let (outgoing_tx, outgoing_rx) = std::sync::mpsc::channel::<Vec<u8>>();
    thread::spawn(move || {
        while let Ok(bytes) = outgoing_rx.recv() {
            if let Err(e) = port_tx.write_all(&bytes).and_then(|()| port_tx.flush()) {
                error!("Serial write failed: {}", e);
                break;
            }
        }
    });
    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        loop {
            match device_rx.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if outgoing_tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                },
            }
        }
    });
    Ok(())
}

/// Forward everything read from the port until it reports end of stream or
/// fails. Read timeouts only mean the receiver was quiet.
fn read_port<R: Read>(port: &mut R, tx: &mpsc::Sender<Vec<u8>>) {
    let mut buf = [0u8; 1024];
    loop {
        match port.read(&mut buf) {
            Ok(0) => {
                info!("Serial port reached end of stream");
                break;
            },
            Ok(n) => {
                if tx.blocking_send(buf[..n].to_vec()).is_err() {
                    break;
                }
            },
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {},
            Err(e) => {
                error!("Serial read failed: {}", e);
                break;
            },
        }
    }
}

/// Print every complete UBX frame found in the input, skipping anything else
fn decode_stdin() -> Result<()> {
    let mut data = Vec::new();
    io::stdin()
        .lock()
        .read_to_end(&mut data)
        .context("Failed to read stdin")?;

    let mut stdout = io::stdout().lock();
    let mut pos = 0;
    while let Some(offset) = data[pos..].windows(2).position(|w| w == [0xb5, 0x62]) {
        let start = pos + offset;
        let Some(len_bytes) = data.get(start + 4..start + 6) else {
            break;
        };
        let end = start + 8 + usize::from(u16::from_le_bytes([len_bytes[0], len_bytes[1]]));
        let Some(frame) = data.get(start..end) else {
            break;
        };
        match UbxMessage::decode(frame) {
            Ok(msg) => {
                writeln!(stdout, "{}", msg)?;
                pos = end;
            },
            Err(e) => {
                warn!(offset = start, "Skipping frame: {}", e);
                pos = start + 1;
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays scripted read results
    struct ScriptedPort(Vec<io::Result<Vec<u8>>>);

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Ok(0);
            }
            let bytes = self.0.remove(0)?;
            buf[..bytes.len()].copy_from_slice(&bytes);
            Ok(bytes.len())
        }
    }

    #[test]
    fn test_read_port_stops_at_end_of_stream() {
        let (tx, mut rx) = mpsc::channel(4);
        read_port(&mut &b"\xb5\x62"[..], &tx);
        drop(tx);
        assert_eq!(rx.blocking_recv(), Some(vec![0xb5, 0x62]));
        assert_eq!(rx.blocking_recv(), None);
    }

    #[test]
    fn test_read_port_rides_out_timeouts() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut port = ScriptedPort(vec![
            Err(io::ErrorKind::TimedOut.into()),
            Ok(vec![1, 2]),
            Err(io::ErrorKind::TimedOut.into()),
            Ok(vec![3]),
            Err(io::ErrorKind::BrokenPipe.into()),
            Ok(vec![4]),
        ]);
        read_port(&mut port, &tx);
        drop(tx);
        assert_eq!(rx.blocking_recv(), Some(vec![1, 2]));
        assert_eq!(rx.blocking_recv(), Some(vec![3]));
        assert_eq!(rx.blocking_recv(), None);
        // reading stopped at the failure
        assert_eq!(port.0.len(), 1);
    }
}
