use anyhow::Result;
use camctl::api::{Api, Command, MessageCatalog, Response};
use camctl::config::{CamctlConfig, DriverKind, OutputFormat};
use camctl::driver::{CameraContext, DisconnectedDriver, DriverHandle, SimulatedDriver};
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "camctl")]
#[command(about = "Camera control facade: settings, stills, bursts and live view")]
#[command(version)]
#[command(long_about = "Reads one command per line from stdin (list_settings, set_iso 400, \
shot, burst 3, liveview start, liveview stop, autofocus, status, reinitialize, format xml) \
and prints the response envelope for each. Live view frames are served over TCP as a \
length-prefixed JPEG stream.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "camctl.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to daily rolling files in this directory
    #[arg(long, value_name = "DIR", help = "Directory for rolling log files")]
    log_dir: Option<String>,

    /// Override the envelope format (json, xml)
    #[arg(long, value_name = "FORMAT", help = "Response format: json or xml")]
    output: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting camctl v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match CamctlConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let mut format = config.api.output;
    if let Some(requested) = args.output.as_deref() {
        format = parse_format(requested)
            .ok_or_else(|| anyhow::anyhow!("Unknown output format '{}'", requested))?;
    }

    let catalog = match &config.api.messages_file {
        Some(path) => MessageCatalog::load_from_file(path).map_err(|e| {
            error!("Failed to load message catalog: {}", e);
            e
        })?,
        None => MessageCatalog::default(),
    };

    let driver = match config.driver.kind {
        DriverKind::Simulated => DriverHandle::new(SimulatedDriver::new()),
        DriverKind::None => DriverHandle::new(DisconnectedDriver),
    };
    let context = Arc::new(CameraContext::open(driver).await);
    let api = Api::new(context, &config, catalog);

    let outcome = run_commands(&api, &mut format).await;
    api.shutdown().await;

    if let Err(e) = &outcome {
        error!("Command loop failed: {}", e);
    }
    info!("camctl stopped");
    outcome
}

/// Serve stdin commands until EOF, `quit` or Ctrl+C
async fn run_commands(api: &Api, format: &mut OutputFormat) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let line = tokio::select! {
            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            debug!("stdin closed");
            break;
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if matches!(line, "quit" | "exit") {
            break;
        }

        if let Some(requested) = line.strip_prefix("format ") {
            match parse_format(requested.trim()) {
                Some(selected) => {
                    *format = selected;
                    info!("Response format set to {:?}", selected);
                }
                None => eprintln!("Unknown format '{}', expected json or xml", requested.trim()),
            }
            continue;
        }

        let response = match line.parse::<Command>() {
            Ok(command) => api.execute(command).await,
            Err(e) => {
                warn!("Rejected input '{}': {}", line, e);
                eprintln!("{}", e);
                continue;
            }
        };

        write_response(&mut stdout, &response, *format).await?;
    }

    Ok(())
}

async fn write_response(
    stdout: &mut tokio::io::Stdout,
    response: &Response,
    format: OutputFormat,
) -> Result<()> {
    let mut rendered = response.render(format)?;
    rendered.push('\n');
    stdout.write_all(rendered.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

fn parse_format(name: &str) -> Option<OutputFormat> {
    match name.to_ascii_lowercase().as_str() {
        "json" => Some(OutputFormat::Json),
        "xml" => Some(OutputFormat::Xml),
        _ => None,
    }
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("camctl={}", log_level)));

    // stdout carries responses, so console logs go to stderr
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed()
        }
    };

    let (file_layer, guard) = match args.log_dir.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "camctl.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# camctl configuration file");
    println!("# This is the default configuration with all available options.");
    println!("# Any key can be overridden with CAMCTL_<SECTION>__<KEY>, e.g. CAMCTL_LIVEVIEW__PORT=6000");
    println!();
    print!("{}", toml::to_string_pretty(&CamctlConfig::default())?);
    Ok(())
}
