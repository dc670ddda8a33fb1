use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use votebot_core::models::{Actor, SubjectRef, VoteEvent, ADMIN_SERVICE};
use votebot_core::services::VoteService;
use votebot_core::tasks::{spawn_reward_expiry_task, DEFAULT_INITIAL_DELAY, DEFAULT_PERIOD};
use votebot_core::{Database, Error};

mod context;
use context::build_vote_service;

#[derive(Parser, Debug, Clone)]
#[command(name = "votebot")]
#[command(author, version, about = "VoteBot - vote listener and reward engine")]
struct Args {
    /// Mode: "server", "vote", "give", "expire", "stats" or "list"
    #[arg(long, default_value = "server")]
    mode: String,

    /// Postgres connection URL. `DATABASE_URL` takes precedence when set.
    #[arg(long, default_value = "postgres://votebot@localhost:5432/votebot")]
    db_url: String,

    /// JSON file with triggers, rewards and message templates.
    #[arg(long)]
    config: Option<String>,

    /// Target player name for `vote` and `give`.
    #[arg(long)]
    player: Option<String>,

    /// Vote service name for `vote`.
    #[arg(long, default_value = ADMIN_SERVICE)]
    service: String,

    /// Reward name for `give`.
    #[arg(long)]
    reward: Option<String>,

    /// How many entries `stats` lists.
    #[arg(long, default_value = "10")]
    top: i64,

    /// Seconds before the first expiry sweep.
    #[arg(long, default_value_t = DEFAULT_INITIAL_DELAY.as_secs())]
    expiry_delay_secs: u64,

    /// Seconds between expiry sweeps.
    #[arg(long, default_value_t = DEFAULT_PERIOD.as_secs())]
    expiry_interval_secs: u64,

    /// Only resolve names already stored locally.
    #[arg(long, default_value = "false")]
    offline_identity: bool,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("votebot=info".parse().unwrap_or_default())
        .add_directive("votebot_core=info".parse().unwrap_or_default())
        .add_directive("votebot_server=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("Failed to set global subscriber: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();
    let mut args = Args::parse();
    if let Ok(url) = std::env::var("DATABASE_URL") {
        args.db_url = url;
    }
    info!("VoteBot starting. mode={}", args.mode);

    let db = Database::new(&args.db_url).await?;
    db.migrate().await?;
    let service = build_vote_service(&db, args.config.as_deref(), args.offline_identity).await?;

    let result = match args.mode.as_str() {
        "server" => run_server(&args, service).await,
        "vote" => run_vote(&args, &service).await,
        "give" => run_give(&args, &service).await,
        "expire" => service.expire_pending_rewards().await.map(|n| {
            info!("Expired {} queued reward(s).", n);
        }),
        "stats" => run_stats(&args, &service).await,
        "list" => run_list(&service),
        other => {
            error!(
                "Invalid mode '{}'. Use --mode=server|vote|give|expire|stats|list.",
                other
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{} error: {:?}", args.mode, e);
    }

    db.close().await;
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run_server(args: &Args, service: Arc<VoteService>) -> Result<(), Error> {
    let expiry = spawn_reward_expiry_task(
        service.clone(),
        Duration::from_secs(args.expiry_delay_secs),
        Duration::from_secs(args.expiry_interval_secs),
    );

    info!("Vote engine running; press Ctrl-C to stop.");
    wait_for_shutdown(&service).await?;
    info!("Ctrl-C received; shutting down.");

    expiry.abort();
    Ok(())
}

/// SIGHUP re-reads the reward config; Ctrl-C returns.
#[cfg(unix)]
async fn wait_for_shutdown(service: &VoteService) -> Result<(), Error> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => return Ok(res?),
            _ = hangup.recv() => {
                if let Err(e) = service.context().config.reload().await {
                    error!("Reward config reload failed; keeping current config: {:?}", e);
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_service: &VoteService) -> Result<(), Error> {
    Ok(tokio::signal::ctrl_c().await?)
}

async fn run_vote(args: &Args, service: &VoteService) -> Result<(), Error> {
    let player = required(&args.player, "--player")?;
    let source = if args.service == ADMIN_SERVICE {
        Actor::Admin { subject_id: None }
    } else {
        Actor::Service
    };
    let event = VoteEvent::new(source, SubjectRef::name(player), &args.service);

    let outcome = service.handle_vote(event).await?;
    info!(
        "Vote recorded for {} (subject={}, global={}); fired: [{}]",
        outcome.subject_id,
        outcome.counts.subject,
        outcome.counts.global,
        outcome.fired.join(", ")
    );
    Ok(())
}

async fn run_give(args: &Args, service: &VoteService) -> Result<(), Error> {
    let player = required(&args.player, "--player")?;
    let reward = required(&args.reward, "--reward")?;

    let outcome = service
        .give_reward(Actor::Admin { subject_id: None }, SubjectRef::name(player), reward)
        .await?;
    info!("Gave '{}' to {}: {:?}", reward, player, outcome);
    Ok(())
}

async fn run_stats(args: &Args, service: &VoteService) -> Result<(), Error> {
    if let Some(player) = &args.player {
        match service.subject_stats(&SubjectRef::name(player)).await? {
            Some(stats) => info!(
                "{}: {} vote(s), last at {}",
                player,
                stats.total_votes,
                stats
                    .last_vote
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string())
            ),
            None => info!("{} has not voted yet.", player),
        }
        return Ok(());
    }

    let top = service.top_voters(args.top).await?;
    let listing = serde_json::to_string_pretty(
        &top.iter()
            .map(|r| serde_json::json!({ "player": r.display_name, "votes": r.votes }))
            .collect::<Vec<_>>(),
    )?;
    info!("Top voters:\n{}", listing);
    Ok(())
}

/// Prints the loaded trigger table and reward definitions.
fn run_list(service: &VoteService) -> Result<(), Error> {
    let config = service.context().config.snapshot();
    let listing = serde_json::to_string_pretty(&config.listing())?;
    info!("Reward config:\n{}", listing);
    Ok(())
}

fn required<'a>(value: &'a Option<String>, flag: &str) -> Result<&'a str, Error> {
    value
        .as_deref()
        .ok_or_else(|| Error::Config(format!("{flag} is required for this mode")))
}
