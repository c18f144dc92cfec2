//! The operations behind each `showprobe` subcommand.
//!
//! Results go to the writer passed in (stdout in the binary); logs go through
//! `tracing`. On error nothing is written to the output.

use std::io::Write;
use std::net::SocketAddr;

use anyhow::Context;
use tokio::sync::oneshot;
use tracing::info;

use crate::hub::Entity;
use crate::hub::HubApi;
use crate::hub::LightCommand;
use crate::osc;
use crate::osc::Dispatcher;
use crate::osc::OscArg;
use crate::osc::OscMessage;
use crate::osc::OscServer;
use crate::osc::PrintHandler;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// One `entity_id = state` line per entity
    Text,
}

/// Fetch every entity from the hub and print them grouped by domain.
///
/// Returns the number of entities printed.
pub async fn list_entities(
    hub: &dyn HubApi,
    format: OutputFormat,
    mut out: impl Write,
) -> anyhow::Result<usize> {
    let groups = hub
        .get_entities()
        .await
        .context("Failed to list hub entities")?;
    info!(
        "Hub has {} entities in {} domains",
        groups.entity_count(),
        groups.domains().count()
    );

    match format {
        OutputFormat::Json => groups.write_json(&mut out)?,
        OutputFormat::Text => groups.write_text(&mut out)?,
    }
    Ok(groups.entity_count())
}

pub async fn show_entity(
    hub: &dyn HubApi,
    entity_id: &str,
    format: OutputFormat,
    mut out: impl Write,
) -> anyhow::Result<()> {
    let entity = hub
        .get_state(entity_id)
        .await
        .with_context(|| format!("Failed to fetch {}", entity_id))?;

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &entity)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            writeln!(out, "{} = {}", entity.entity_id, entity.state)?;
            for (key, value) in entity.attributes.iter().flatten() {
                writeln!(out, "  {}: {}", key, value)?;
            }
        }
    }
    Ok(())
}

pub async fn ping(hub: &dyn HubApi, mut out: impl Write) -> anyhow::Result<()> {
    let message = hub.ping().await.context("Hub did not answer")?;
    writeln!(out, "{}", message)?;
    Ok(())
}

pub async fn light_on(
    hub: &dyn HubApi,
    command: &LightCommand,
    out: impl Write,
) -> anyhow::Result<()> {
    let changed = hub
        .turn_on_light(command)
        .await
        .with_context(|| format!("Failed to turn on {}", command.entity_id))?;
    write_changed(&changed, out)
}

pub async fn light_off(
    hub: &dyn HubApi,
    entity_id: &str,
    transition: Option<f64>,
    out: impl Write,
) -> anyhow::Result<()> {
    let changed = hub
        .turn_off_light(entity_id, transition)
        .await
        .with_context(|| format!("Failed to turn off {}", entity_id))?;
    write_changed(&changed, out)
}

fn write_changed(changed: &[Entity], mut out: impl Write) -> anyhow::Result<()> {
    for entity in changed {
        writeln!(out, "{} = {}", entity.entity_id, entity.state)?;
    }
    Ok(())
}

/// Bind an OSC listener whose only route is a catch-all that prints every
/// message to `out`.
pub async fn bind_monitor<W>(addr: SocketAddr, out: W) -> osc::Result<OscServer>
where
    W: Write + Send + 'static,
{
    let mut dispatcher = Dispatcher::new();
    dispatcher.set_default_handler(PrintHandler::new(out));
    OscServer::bind(addr, dispatcher).await
}

/// Run the OSC monitor on stdout until `shutdown_rx` fires
pub async fn monitor(addr: SocketAddr, shutdown_rx: oneshot::Receiver<()>) -> anyhow::Result<()> {
    bind_monitor(addr, std::io::stdout())
        .await?
        .serve(shutdown_rx)
        .await?;
    Ok(())
}

/// Send one message built from command-line words
pub async fn send_osc(target: SocketAddr, address: &str, words: &[String]) -> anyhow::Result<()> {
    let args = words.iter().map(|w| OscArg::parse_cli(w)).collect();
    let msg = OscMessage::new(address, args)?;
    osc::send(target, &msg)
        .await
        .with_context(|| format!("Failed to send OSC message to {}", target))?;
    info!("Sent {} {} to {}", msg, msg.type_tags(), target);
    Ok(())
}
