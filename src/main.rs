use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use rand::Rng;
use serde_json::{Value, json};
use tablescene::behavior::BehaviorRegistry;
use tablescene::bridge::{BridgeError, InMemoryDocument, ReplicatedStateBridge};
use tablescene::config::EngineConfig;
use tablescene::host::RendererClient;
use tablescene::input::{Modifiers, PointerEvent, WheelEvent};
use tablescene::object::{ObjectKind, Position, SortKey, SortKeyError, TableObject};
use tablescene::protocol::{HostMessage, RendererMessage};
use tablescene::renderer::spawn_renderer;
use tablescene::surface::Surface;
use tablescene::texture::TexturePipeline;
use tablescene::transport::{TransportError, TransportMode};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("bridge: {0}")]
    Bridge(#[from] BridgeError),
    #[error("sort key: {0}")]
    SortKey(#[from] SortKeyError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}

#[derive(Parser, Debug)]
#[command(name = "tablescene", about = "Tabletop scene engine diagnostics")]
struct Cli {
    /// Renderer context; overrides TABLESCENE_TRANSPORT.
    #[arg(long)]
    transport: Option<TransportMode>,

    /// Surface size in CSS pixels.
    #[arg(long, default_value_t = 1280.0)]
    width: f64,
    #[arg(long, default_value_t = 720.0)]
    height: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Round-trip a ping through the renderer.
    Ping,
    /// Sync a random table, click an object, zoom, and report.
    Demo {
        /// Number of random objects to place on the table.
        #[arg(long, default_value_t = 200)]
        objects: usize,
        /// Wheel steps to zoom in after the sync.
        #[arg(long, default_value_t = 4)]
        zoom_steps: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = EngineConfig::from_env();
    if let Some(transport) = cli.transport {
        config.transport = transport;
    }
    let surface = Surface::new(cli.width, cli.height, 1.0);

    match cli.command {
        Command::Ping => run_ping(&config, surface).await,
        Command::Demo { objects, zoom_steps } => run_demo(&config, surface, objects, zoom_steps).await,
    }
}

async fn run_ping(config: &EngineConfig, surface: Surface) -> Result<(), CliError> {
    let (mut client, handle) =
        spawn_renderer(config, Arc::new(BehaviorRegistry::with_defaults()), TexturePipeline::standard())?;
    client.init(surface).await?;

    let started = Instant::now();
    let data = client.ping(json!({"sent": "ping"})).await?;
    println!("pong {} in {:?} ({})", data, started.elapsed(), config.transport);

    drop(client);
    handle.join().await?;
    Ok(())
}

async fn run_demo(config: &EngineConfig, surface: Surface, count: usize, zoom_steps: u32) -> Result<(), CliError> {
    let (width, height) = (surface.width(), surface.height());
    let (mut client, handle) =
        spawn_renderer(config, Arc::new(BehaviorRegistry::with_defaults()), TexturePipeline::standard())?;
    client.init(surface).await?;

    let doc = InMemoryDocument::new("cli");
    let topmost = populate(&doc, count, width, height)?;

    let started = Instant::now();
    let tasks = ReplicatedStateBridge::start(&mut client, &doc, None, config.bridge_chunk_size).await?;
    client.flush().await?;
    println!("synced {count} objects in {:?}", started.elapsed());

    if let Some(target) = topmost {
        client.send(HostMessage::PointerDown { event: PointerEvent::at(target.x, target.y) }).await?;
        client.send(HostMessage::PointerUp { event: PointerEvent::at(target.x, target.y) }).await?;
        let selected = wait_for_selection(&mut client, config.request_timeout).await?;
        println!("selected {selected:?}");
    }

    for _ in 0..zoom_steps {
        let event = WheelEvent { x: width / 2.0, y: height / 2.0, delta_x: 0.0, delta_y: -120.0, modifiers: Modifiers::default() };
        client.send(HostMessage::Wheel { event }).await?;
    }
    client.flush().await?;
    let animating = client.check_animation_state(None, None).await?;
    println!("zoomed {zoom_steps} steps; animating: {animating}");

    drop(doc);
    tasks.objects.await.map_err(|e| TransportError::Spawn(e.to_string()))??;
    tasks.awareness.await.map_err(|e| TransportError::Spawn(e.to_string()))??;
    drop(client);
    let stats = handle.join().await?;
    println!("renderer handled {} messages, presented {} frames", stats.messages, stats.frames);
    Ok(())
}

/// Fill `doc` with random objects inside the viewport. Returns the center of
/// the topmost one so the demo has something to click.
fn populate(doc: &InMemoryDocument, count: usize, width: f64, height: f64) -> Result<Option<Position>, CliError> {
    const KINDS: [ObjectKind; 4] = [ObjectKind::Token, ObjectKind::Stack, ObjectKind::Counter, ObjectKind::Dice];
    const MARGIN: f64 = 80.0;

    let mut rng = rand::rng();
    let mut key: Option<SortKey> = None;
    let mut last = None;
    for i in 0..count {
        let next = SortKey::between(key.as_ref(), None)?;
        let kind = KINDS[rng.random_range(0..KINDS.len())];
        let position = Position::new(
            MARGIN + rng.random_range(0.0..(width - 2.0 * MARGIN).max(1.0)),
            MARGIN + rng.random_range(0.0..(height - 2.0 * MARGIN).max(1.0)),
        );
        let mut object = TableObject::new(kind, position, next.clone());
        if kind == ObjectKind::Stack {
            object.fields.insert("cards".into(), json!([format!("card-{i}-a"), format!("card-{i}-b")]));
            object.fields.insert("faceUp".into(), Value::Bool(rng.random_bool(0.5)));
        }
        doc.upsert(format!("obj-{i}"), serde_json::to_value(&object)?);
        key = Some(next);
        last = Some(position);
    }
    Ok(last)
}

async fn wait_for_selection(
    client: &mut RendererClient,
    timeout: Duration,
) -> Result<Vec<String>, CliError> {
    let wait = async {
        loop {
            if let RendererMessage::SelectionChanged { ids } = client.next_message().await? {
                return Ok::<_, CliError>(ids);
            }
        }
    };
    tokio::time::timeout(timeout, wait).await.map_err(|_| CliError::Timeout("selection-changed"))?
}
