//! CLI for Peril
//!
//! Subcommands:
//! - `server`: declare the topology, log game events and broadcast pause/resume
//! - `client`: join as a player and send moves

use clap::{Parser, Subcommand};
use peril::broker::Broker;
use peril::client::PlayerSession;
use peril::client::handlers::{handle_move, handle_pause, handle_war};
use peril::config::{Settings, load_config};
use peril::commands::{run_player_commands, run_server_commands};
use peril::pubsub::{
    AckDecision, BincodeCodec, JsonCodec, QueueDurability, SubscribeOptions, setup_topology,
    subscribe,
};
use peril::routing::{
    ARMY_MOVES_PREFIX, EXCHANGE_PERIL_DIRECT, EXCHANGE_PERIL_TOPIC, GAME_LOG_SLUG, GameLog,
    PAUSE_KEY, WAR_RECOGNITIONS_PREFIX, any_player, player_key,
};
use peril::transport::{AmqpTransport, Channel, MemoryTransport, Transport};
use peril::utils::logging;
use tokio::io::BufReader;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "peril")]
struct Cli {
    /// Run against an in-process broker instead of RabbitMQ
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the game server
    Server,
    /// Join the game as a player
    Client {
        #[arg(long)]
        username: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {}", e);
            return;
        }
    };
    logging::init(&settings.log.level);

    if let Err(e) = start(cli, &settings).await {
        error!("Peril failed: {}", e);
    }
}

async fn start(cli: Cli, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if cli.memory {
        let transport = MemoryTransport::connect(&Broker::shared())?;
        run(cli.command, transport, settings).await
    } else {
        let transport = AmqpTransport::connect(&settings.broker.url).await?;
        run(cli.command, transport, settings).await
    }
}

async fn run<T: Transport>(
    command: Command,
    transport: T,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let channel = transport.create_channel().await?;
    setup_topology(&channel, &settings.topology).await?;

    let outcome = match command {
        Command::Server => run_server(&transport, channel, settings).await,
        Command::Client { username } => run_client(&transport, channel, settings, &username).await,
    };

    transport.close().await?;
    outcome
}

fn options(settings: &Settings, mode: QueueDurability) -> SubscribeOptions {
    SubscribeOptions::new(mode)
        .dead_letter_exchange(Some(settings.topology.dead_letter_exchange.clone()))
}

async fn run_server<T: Transport>(
    transport: &T,
    publisher: T::Channel,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let logs = subscribe(
        transport,
        BincodeCodec,
        EXCHANGE_PERIL_TOPIC,
        GAME_LOG_SLUG,
        &any_player(GAME_LOG_SLUG),
        options(settings, QueueDurability::Durable),
        |log: GameLog| {
            info!(
                "[{}] {}: {}",
                log.current_time.format("%H:%M:%S"),
                log.username,
                log.message
            );
            AckDecision::Ack
        },
    )
    .await?;

    info!("Peril server started. Type `help` for commands.");
    tokio::select! {
        summary = run_server_commands(&publisher, BufReader::new(tokio::io::stdin())) => {
            let summary = summary?;
            debug!("Server sent {} messages, {} failed", summary.published, summary.failed);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    logs.abort();
    publisher.close().await?;
    Ok(())
}

async fn run_client<T: Transport>(
    transport: &T,
    publisher: T::Channel,
    settings: &Settings,
    username: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = PlayerSession::new(username);

    let subscriptions = [
        subscribe(
            transport,
            JsonCodec,
            EXCHANGE_PERIL_DIRECT,
            &player_key(PAUSE_KEY, username),
            PAUSE_KEY,
            options(settings, QueueDurability::Transient),
            handle_pause(session.clone()),
        )
        .await?,
        subscribe(
            transport,
            JsonCodec,
            EXCHANGE_PERIL_TOPIC,
            &player_key(ARMY_MOVES_PREFIX, username),
            &any_player(ARMY_MOVES_PREFIX),
            options(settings, QueueDurability::Transient),
            handle_move(session.clone()),
        )
        .await?,
        subscribe(
            transport,
            JsonCodec,
            EXCHANGE_PERIL_TOPIC,
            WAR_RECOGNITIONS_PREFIX,
            &any_player(WAR_RECOGNITIONS_PREFIX),
            options(settings, QueueDurability::Durable),
            handle_war(session.clone()),
        )
        .await?,
    ];

    info!("Welcome, {}! Type `help` for commands.", username);
    let input = BufReader::new(tokio::io::stdin());
    tokio::select! {
        summary = run_player_commands(&publisher, &session, input) => {
            let summary = summary?;
            debug!("{} sent {} messages, {} failed", username, summary.published, summary.failed);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    for subscription in &subscriptions {
        subscription.abort();
    }
    publisher.close().await?;
    Ok(())
}
