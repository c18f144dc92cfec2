use std::net::IpAddr;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use showprobe::commands;
use showprobe::commands::OutputFormat;
use showprobe::hub::HubClient;
use showprobe::hub::LightCommand;
use showprobe::Config;
use showprobe::LogLevel;
use tokio::sync::oneshot;
use tracing_subscriber::filter::LevelFilter;

/// Diagnostics for a show-control rig: Home Assistant entities and OSC traffic
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (defaults to ./showprobe.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct HubArgs {
    /// Hub base URL (overrides hub.url)
    #[arg(long)]
    url: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every hub entity, grouped by domain
    Entities {
        #[command(flatten)]
        hub: HubArgs,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Show one entity's state and attributes
    Entity {
        entity_id: String,

        #[command(flatten)]
        hub: HubArgs,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Check that the hub API is reachable and the token is accepted
    Ping {
        #[command(flatten)]
        hub: HubArgs,
    },

    /// Switch a hub light
    Light {
        #[command(subcommand)]
        action: LightAction,
    },

    /// Open Sound Control tools
    Osc {
        #[command(subcommand)]
        action: OscAction,
    },
}

#[derive(Debug, Subcommand)]
enum LightAction {
    /// Call light.turn_on
    On {
        entity_id: String,

        /// Colour as r,g,b,w (0-255 each)
        #[arg(long, value_parser = parse_rgbw)]
        rgbw: Option<[u8; 4]>,

        #[arg(long)]
        brightness: Option<u8>,

        /// Fade time in seconds
        #[arg(long)]
        transition: Option<f64>,

        #[arg(long)]
        effect: Option<String>,

        #[command(flatten)]
        hub: HubArgs,
    },

    /// Call light.turn_off
    Off {
        entity_id: String,

        /// Fade time in seconds
        #[arg(long)]
        transition: Option<f64>,

        #[command(flatten)]
        hub: HubArgs,
    },
}

#[derive(Debug, Subcommand)]
enum OscAction {
    /// Print every OSC message received until interrupted
    Monitor {
        /// Interface to listen on (overrides osc.listen)
        #[arg(long)]
        listen: Option<IpAddr>,

        /// Port to listen on (overrides osc.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one OSC message
    Send {
        /// OSC address, e.g. /msc/go/12
        address: String,

        /// Arguments: true/false, nil, integers and floats are typed, anything else is a string
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,

        /// Destination host:port (overrides osc.send_host/osc.send_port)
        #[arg(short, long)]
        target: Option<SocketAddr>,
    },
}

fn parse_rgbw(s: &str) -> Result<[u8; 4], String> {
    let channels = s
        .split(',')
        .map(|c| c.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid colour channel: {}", e))?;

    channels
        .try_into()
        .map_err(|c: Vec<u8>| format!("expected 4 channels (r,g,b,w), got {}", c.len()))
}

fn hub_client(config: &Config, args: &HubArgs) -> anyhow::Result<HubClient> {
    let mut hub_config = config.hub.resolve()?;
    if let Some(url) = &args.url {
        hub_config.url = url.clone();
    }
    tracing::debug!("Using hub at {}", hub_config.url);
    Ok(HubClient::new(hub_config)?)
}

/// Resolves on Ctrl+C. If the signal handler cannot be installed the
/// sender is kept alive so the listener runs until killed.
fn shutdown_on_ctrl_c() -> oneshot::Receiver<()> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received shutdown signal");
                let _ = shutdown_tx.send(());
            }
            Err(e) => {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
                drop(shutdown_tx);
            }
        }
    });
    shutdown_rx
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let stdout = std::io::stdout();

    match cli.command {
        Command::Entities { hub, format } => {
            let client = hub_client(&config, &hub)?;
            commands::list_entities(&client, format, stdout.lock()).await?;
        }
        Command::Entity {
            entity_id,
            hub,
            format,
        } => {
            let client = hub_client(&config, &hub)?;
            commands::show_entity(&client, &entity_id, format, stdout.lock()).await?;
        }
        Command::Ping { hub } => {
            let client = hub_client(&config, &hub)?;
            commands::ping(&client, stdout.lock()).await?;
        }
        Command::Light { action } => match action {
            LightAction::On {
                entity_id,
                rgbw,
                brightness,
                transition,
                effect,
                hub,
            } => {
                let client = hub_client(&config, &hub)?;
                let command = LightCommand {
                    entity_id,
                    rgbw_color: rgbw,
                    brightness,
                    transition,
                    effect,
                };
                commands::light_on(&client, &command, stdout.lock()).await?;
            }
            LightAction::Off {
                entity_id,
                transition,
                hub,
            } => {
                let client = hub_client(&config, &hub)?;
                commands::light_off(&client, &entity_id, transition, stdout.lock()).await?;
            }
        },
        Command::Osc { action } => match action {
            OscAction::Monitor { listen, port } => {
                let mut addr = config.osc.listen_addr();
                if let Some(listen) = listen {
                    addr.set_ip(listen);
                }
                if let Some(port) = port {
                    addr.set_port(port);
                }
                commands::monitor(addr, shutdown_on_ctrl_c()).await?;
            }
            OscAction::Send {
                address,
                args,
                target,
            } => {
                let target = target.unwrap_or_else(|| config.osc.send_addr());
                commands::send_osc(target, &address, &args).await?;
            }
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = Config::load(cli.config.as_deref());

    let level = cli.log_level.unwrap_or(match &loaded {
        Ok((config, _)) => config.logging.level,
        Err(_) => LogLevel::default(),
    });

    // Logs go to stderr so stdout carries only results
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(level))
        .with_writer(std::io::stderr)
        .init();

    let result = match loaded.context("Failed to load configuration") {
        Ok((config, path)) => {
            match path {
                Some(path) => tracing::debug!("Loaded config from: {}", path.display()),
                None => tracing::debug!("No config file, using defaults"),
            }
            run(cli, config).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
