use std::io::Write as _;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info};

use async_serial_port::config::{Config, ConfigLoader, OutputConfig};
use async_serial_port::error::AppResult;
use async_serial_port::logging;
use async_serial_port::port::{
    synthesize, AsyncSerialPort, BaudRate, DataBits, Parity, StopBits, TransportEvent,
};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "async-serial-port",
    version,
    about = "Configure a serial line and talk to it from the terminal.",
    long_about = "Configures a tty with stty (POSIX) or mode (Windows), then streams device output to stdout and stdin lines to the device. Settings come from async-serial.toml, ASYNC_SERIAL_* variables and the flags below, in increasing priority."
)]
struct Cli {
    /// Configuration file (defaults to the standard search path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    line: LineArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List serial ports found on this system
    List,
    /// Print the line configuration command without running it
    Command,
    /// Open the port, print what it sends and forward stdin lines to it
    Monitor,
}

/// Overrides for the configured line settings.
#[derive(Args, Debug)]
struct LineArgs {
    /// Device path, e.g. /dev/ttyUSB0 or COM3
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Platform tag selecting the command dialect (linux, windows)
    #[arg(long, global = true)]
    platform: Option<String>,

    #[arg(short, long, global = true, value_parser = parse_baud)]
    baud: Option<BaudRate>,

    /// none, even, odd, mark, space (or n, e, o, m, s)
    #[arg(long, global = true)]
    parity: Option<Parity>,

    #[arg(long, global = true, value_parser = parse_data_bits)]
    data_bits: Option<DataBits>,

    #[arg(long, global = true, value_parser = parse_stop_bits)]
    stop_bits: Option<StopBits>,

    /// Maximum bytes per read
    #[arg(long, global = true)]
    chunk_size: Option<NonZeroUsize>,

    /// Enable XON/XOFF flow control
    #[arg(long, global = true)]
    xon: bool,

    /// Enable CTS output handshaking
    #[arg(long, global = true)]
    octs: bool,

    #[arg(long, global = true)]
    rts: bool,

    #[arg(long, global = true)]
    dtr: bool,

    /// Fail when the configuration command fails
    #[arg(long, global = true)]
    strict: bool,

    /// Print events as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Prefix output with timestamps
    #[arg(long, global = true)]
    timestamps: bool,
}

impl LineArgs {
    fn apply(self, config: &mut Config) {
        let serial = &mut config.serial;
        if let Some(device) = self.device {
            serial.device = device;
        }
        if let Some(platform) = self.platform {
            serial.platform = platform;
        }
        if let Some(baud) = self.baud {
            serial.baud = baud;
        }
        if let Some(parity) = self.parity {
            serial.parity = parity;
        }
        if let Some(bits) = self.data_bits {
            serial.data_bits = bits;
        }
        if let Some(bits) = self.stop_bits {
            serial.stop_bits = bits;
        }
        if let Some(size) = self.chunk_size {
            serial.chunk_size = size;
        }
        serial.xon |= self.xon;
        serial.octs |= self.octs;
        serial.rts |= self.rts;
        serial.dtr |= self.dtr;

        config.transport.strict_configure |= self.strict;
        config.output.json |= self.json;
        config.output.timestamps |= self.timestamps;
    }
}

fn parse_baud(value: &str) -> Result<BaudRate, String> {
    let rate: u32 = value.parse().map_err(|e| format!("{e}"))?;
    BaudRate::try_from(rate).map_err(|e| e.to_string())
}

fn parse_data_bits(value: &str) -> Result<DataBits, String> {
    let bits: u8 = value.parse().map_err(|e| format!("{e}"))?;
    DataBits::try_from(bits).map_err(|e| e.to_string())
}

fn parse_stop_bits(value: &str) -> Result<StopBits, String> {
    let bits: u8 = value.parse().map_err(|e| format!("{e}"))?;
    StopBits::try_from(bits).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let mut loader = match cli.config {
        Some(ref path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    cli.line.apply(loader.config_mut());

    logging::init(&loader.config().logging)?;
    if let Some(path) = &loader.config_path {
        debug!(path = %path.display(), "Loaded configuration");
    }

    match cli.command {
        Commands::List => list_ports(&loader.config().output),
        Commands::Command => {
            loader.validate()?;
            let serial = &loader.config().serial;
            println!("{}", synthesize(&serial.platform, serial)?);
            Ok(())
        }
        Commands::Monitor => {
            loader.validate()?;
            monitor(loader.into_config()).await
        }
    }
}

fn list_ports(output: &OutputConfig) -> AppResult<()> {
    let ports = serialport::available_ports()?;

    if output.json {
        let port_info: Vec<_> = ports
            .iter()
            .map(|p| json!({ "port_name": p.port_name, "port_type": format!("{:?}", p.port_type) }))
            .collect();
        println!("{}", json!({ "ports": port_info }));
        return Ok(());
    }

    if ports.is_empty() {
        eprintln!("No serial ports found");
    }
    for port in ports {
        match port.port_type {
            serialport::SerialPortType::UsbPort(usb) => println!(
                "{}\tusb {:04x}:{:04x} {}",
                port.port_name,
                usb.vid,
                usb.pid,
                usb.product.unwrap_or_default()
            ),
            other => println!("{}\t{:?}", port.port_name, other),
        }
    }
    Ok(())
}

async fn monitor(config: Config) -> AppResult<()> {
    let (tx, mut events) = mpsc::unbounded_channel();
    let port = AsyncSerialPort::new(&config.serial, Handle::current())
        .with_write_soft_limit(config.transport.write_soft_limit)
        .require_configure_success(config.transport.strict_configure)
        .on_event(move |event| {
            let _ = tx.send(event);
        });

    port.open()?;
    info!(device = %port.device(), "Monitoring, press Ctrl+C to stop");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut stopping = false;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let closed = matches!(event, TransportEvent::Close);
                print_event(&config.output, &event)?;
                if closed {
                    break;
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line? {
                    Some(mut line) => {
                        line.push_str("\r\n");
                        if !port.write(line.as_bytes())? {
                            debug!("Write buffer above soft limit");
                        }
                    }
                    None => stdin_open = false,
                }
            }
            _ = &mut shutdown, if !stopping => {
                stopping = true;
                port.close();
            }
        }
    }

    Ok(())
}

fn print_event(output: &OutputConfig, event: &TransportEvent) -> AppResult<()> {
    let timestamp = output
        .timestamps
        .then(|| chrono::Local::now().format("%H:%M:%S%.3f").to_string());

    if output.json {
        let mut line = json!({ "event": event.kind() });
        match event {
            TransportEvent::Data(bytes) => {
                line["data"] = json!(String::from_utf8_lossy(bytes));
            }
            TransportEvent::Error(error) => line["error"] = json!(error.to_string()),
            TransportEvent::Write(flushed) => line["flushed"] = json!(flushed),
            TransportEvent::Open | TransportEvent::Close => {}
        }
        if let Some(ts) = timestamp {
            line["timestamp"] = json!(ts);
        }
        println!("{line}");
        return Ok(());
    }

    match event {
        TransportEvent::Data(bytes) => {
            let mut stdout = std::io::stdout().lock();
            if let Some(ts) = timestamp {
                write!(stdout, "[{ts}] ")?;
            }
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
        TransportEvent::Error(error) => eprintln!("Port error: {error}"),
        TransportEvent::Close => eprintln!("Port closed"),
        TransportEvent::Open | TransportEvent::Write(_) => {}
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Unable to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, closing port");
}
