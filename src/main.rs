//! CLI for stanbridge
//!
//! Subcommands:
//! - `check`: load the configuration and build the configured broker
//! - `smoke`: connect, subscribe, publish and wait for delivery against an
//!   in-process loopback server (useful for smoke tests)

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use stanbridge::broker::{Broker, BrokerRegistry, Message, Publication, SubscribeOptions};
use stanbridge::client::LoopbackServer;
use stanbridge::config::{Settings, load_config, load_config_from};
use stanbridge::utils::error::{BrokerError, report};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{error, info};

const SMOKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
enum CliError {
    #[error("broker error")]
    Broker(#[from] BrokerError),

    #[error("smoke task failed")]
    Task(#[from] JoinError),

    #[error("no message delivered on '{topic}' within {timeout:?}")]
    NoDelivery { topic: String, timeout: Duration },
}

#[derive(Parser)]
#[command(name = "stanbridge")]
struct Cli {
    /// Configuration file (without extension); defaults to `config/default`
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the configuration and build the configured broker
    Check,
    /// Round-trip one message through an in-process loopback server
    Smoke {
        #[arg(long, default_value = "orders")]
        topic: String,
        #[arg(long, default_value = "hi")]
        body: String,
        /// Queue group to subscribe with
        #[arg(long)]
        queue: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let settings = match cli.config.as_deref() {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            stanbridge::utils::logging::init("info");
            error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };
    stanbridge::utils::logging::init(&settings.logging.level);

    let result = match cli.command {
        Command::Check => run_check(&settings),
        Command::Smoke { topic, body, queue } => run_smoke(settings, &topic, body, queue).await,
    };

    if let Err(e) = result {
        error!("{}", report(&e));
        std::process::exit(1);
    }
}

fn run_check(settings: &Settings) -> Result<(), CliError> {
    let cluster_id = settings.streaming.cluster_id.clone().unwrap_or_default();
    let registry = BrokerRegistry::with_defaults(
        settings.streaming_config()?,
        Arc::new(LoopbackServer::new(cluster_id)),
    );
    let broker = registry.build(&settings.broker.name, settings.broker_options())?;

    println!("broker:  {}", broker.name());
    println!("address: {}", broker.address());
    println!("codec:   {}", broker.options().codec.name());
    Ok(())
}

async fn run_smoke(
    mut settings: Settings,
    topic: &str,
    body: String,
    queue: Option<String>,
) -> Result<(), CliError> {
    let client_id = settings
        .streaming
        .client_id
        .get_or_insert_with(|| format!("stanbridge-{}", uuid::Uuid::new_v4()))
        .clone();
    let cluster_id = settings
        .streaming
        .cluster_id
        .get_or_insert_with(|| "test-cluster".to_string())
        .clone();

    let server = LoopbackServer::new(cluster_id);
    let registry = BrokerRegistry::with_defaults(settings.streaming_config()?, Arc::new(server));
    let mut broker = registry.build(&settings.broker.name, settings.broker_options())?;

    // The loopback server delivers on the publishing thread, so keep the
    // blocking calls off the runtime workers.
    let topic = topic.to_string();
    let subscribed_topic = topic.clone();
    let (tx, mut rx) = mpsc::unbounded_channel::<Publication>();
    let sub = tokio::task::spawn_blocking(move || -> Result<_, BrokerError> {
        broker.connect()?;
        let handler = Arc::new(move |p: &Publication| {
            tx.send(p.clone())
                .map_err(|e| BrokerError::handler(e.to_string()))
        });
        let options = SubscribeOptions {
            queue,
            ..SubscribeOptions::default()
        };
        let sub = broker.subscribe(&topic, handler, options)?;
        broker.publish(&topic, &Message::new(body.into_bytes()))?;
        Ok((broker, sub))
    })
    .await?;
    let (mut broker, sub) = sub?;

    let delivered = match tokio::time::timeout(SMOKE_TIMEOUT, rx.recv()).await {
        Ok(Some(publication)) => {
            info!("{client_id} received a message on {}", publication.topic());
            println!(
                "{}: {}",
                publication.topic(),
                String::from_utf8_lossy(&publication.message().body)
            );
            true
        }
        Ok(None) | Err(_) => false,
    };

    sub.unsubscribe()?;
    broker.disconnect()?;
    if delivered {
        Ok(())
    } else {
        Err(CliError::NoDelivery {
            topic: subscribed_topic,
            timeout: SMOKE_TIMEOUT,
        })
    }
}
