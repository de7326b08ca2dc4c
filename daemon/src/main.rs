//! `reckon`: reconcile, inspect and override participation records.
//!
//! Records live in an LMDB store under the data directory. Upstream evidence
//! (registrations, attendance, certificates, event rosters) is read from a
//! JSON snapshot file. Every command prints pretty JSON on stdout; logs go to
//! stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use reckon_node::{init_logging, NodeConfig, ReckonNode, SnapshotSources};
use reckon_reconcile::RecordFilter;
use reckon_types::{Actor, ActorRole, CanonicalStatus, Email, EventId, ParticipantKey};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "reckon", version, about = "Participation reconciliation engine")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "RECKON_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the record store.
    #[arg(long, env = "RECKON_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// JSON snapshot of the upstream sources. Without it every source is empty.
    #[arg(long, env = "RECKON_SOURCES")]
    sources: Option<PathBuf>,

    /// Number of reconcile workers.
    #[arg(long, env = "RECKON_WORKERS")]
    workers: Option<usize>,

    /// Per-read source timeout in milliseconds.
    #[arg(long, env = "RECKON_SOURCE_TIMEOUT_MS")]
    source_timeout_ms: Option<u64>,

    /// Replace manually overridden statuses on automatic passes.
    #[arg(long, env = "RECKON_IGNORE_OVERRIDES")]
    ignore_overrides: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "RECKON_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "RECKON_LOG_FORMAT")]
    log_format: Option<String>,

    /// Print Prometheus metrics to stderr after the command.
    #[arg(long, env = "RECKON_ENABLE_METRICS")]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct Subject {
    #[arg(long)]
    email: String,
    #[arg(long)]
    event: String,
}

impl Subject {
    fn key(&self) -> anyhow::Result<ParticipantKey> {
        Ok(ParticipantKey::new(
            Email::parse(&self.email)?,
            EventId::new(self.event.as_str())?,
        ))
    }
}

#[derive(clap::Args)]
struct ActorArgs {
    /// Identity of the person making the change.
    #[arg(long, env = "RECKON_ACTOR")]
    actor: String,
    /// "platform_admin" or "member".
    #[arg(long, default_value = "member", env = "RECKON_ACTOR_ROLE")]
    role: String,
}

impl ActorArgs {
    fn actor(&self) -> anyhow::Result<Actor> {
        Ok(Actor::new(self.actor.as_str(), self.role.parse::<ActorRole>()?))
    }
}

#[derive(clap::Subcommand)]
enum Command {
    /// Reconcile one participant.
    Reconcile {
        #[command(flatten)]
        subject: Subject,
    },
    /// Reconcile every registrant of an event through the worker pool.
    ReconcileEvent {
        #[arg(long)]
        event: String,
    },
    /// Show the public status of one participant.
    Status {
        #[command(flatten)]
        subject: Subject,
        /// Print the full record, including signals and history.
        #[arg(long)]
        full: bool,
    },
    /// List an event's records.
    List {
        #[arg(long)]
        event: String,
        /// Only records with this canonical status.
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        requires_review: Option<bool>,
        #[arg(long)]
        suspicious: Option<bool>,
        #[arg(long)]
        verified: Option<bool>,
    },
    /// Per-status counts for an event.
    Stats {
        #[arg(long)]
        event: String,
    },
    /// Force a participant's canonical status.
    Override {
        #[command(flatten)]
        subject: Subject,
        #[command(flatten)]
        actor: ActorArgs,
        /// REGISTERED_ONLY, ATTENDED_NO_CERTIFICATE, CERTIFIED or INVALIDATED.
        #[arg(long)]
        status: String,
        #[arg(long)]
        reason: String,
    },
    /// Release a manual override and restore the automatic status.
    ClearOverride {
        #[command(flatten)]
        subject: Subject,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Print the effective configuration as TOML.
    Config,
}

/// Merge the optional config file with CLI flags; flags win.
fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            NodeConfig::from_toml_file(&path)
                .with_context(|| format!("failed to load config file {path}"))?
        }
        None => NodeConfig::default(),
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(workers) = cli.workers {
        config.worker_count = workers;
    }
    if let Some(timeout) = cli.source_timeout_ms {
        config.source_timeout_ms = timeout;
    }
    if cli.ignore_overrides {
        config.respect_manual_override = false;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    config.enable_metrics |= cli.metrics;

    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format()?, &config.log_level)?;

    if let Command::Config = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let sources = match &cli.sources {
        Some(path) => SnapshotSources::from_json_file(path)?,
        None => {
            tracing::warn!("no --sources given, every signal source is empty");
            SnapshotSources::default()
        }
    };
    let node = ReckonNode::start(config, Arc::new(sources))?;

    let outcome = run(&node, &cli.command).await;

    if let Some(text) = node.metrics_text()? {
        eprint!("{text}");
    }
    node.shutdown().await;
    outcome
}

async fn run(node: &ReckonNode<SnapshotSources>, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Reconcile { subject } => {
            let summary = node.reconcile(subject.key()?).await?;
            print_json(&summary)
        }
        Command::ReconcileEvent { event } => {
            let event = EventId::new(event.as_str())?;
            let batch = tokio::select! {
                batch = node.reconcile_event(&event) => batch?,
                _ = node.shutdown_controller().wait_for_signal() => {
                    bail!("interrupted while reconciling {event}")
                }
            };
            print_json(&batch)
        }
        Command::Status { subject, full } => {
            let key = subject.key()?;
            if *full {
                match node.get_record(&key)? {
                    Some(record) => print_json(&record),
                    None => bail!("no participation record for {key}"),
                }
            } else {
                match node.get_status(&key)? {
                    Some(view) => print_json(&view),
                    None => bail!("no participation record for {key}"),
                }
            }
        }
        Command::List {
            event,
            status,
            requires_review,
            suspicious,
            verified,
        } => {
            let filter = RecordFilter {
                status: status
                    .as_deref()
                    .map(str::parse::<CanonicalStatus>)
                    .transpose()?,
                requires_review: *requires_review,
                suspicious: *suspicious,
                verified: *verified,
            };
            let records = node.list_records(&EventId::new(event.as_str())?, &filter)?;
            print_json(&records)
        }
        Command::Stats { event } => {
            let stats = node.event_stats(&EventId::new(event.as_str())?)?;
            print_json(&stats)
        }
        Command::Override {
            subject,
            actor,
            status,
            reason,
        } => {
            let record =
                node.override_status(&subject.key()?, status, &actor.actor()?, reason)?;
            print_json(&record)
        }
        Command::ClearOverride { subject, actor } => {
            let record = node.clear_override(&subject.key()?, &actor.actor()?)?;
            print_json(&record)
        }
        Command::Config => Ok(()),
    }
}
