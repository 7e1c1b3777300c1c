mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::ledger::LedgerSubcommand;
use cmd::Session;
use hitman_core::approve::DEFAULT_FEEDBACK;
use hitman_core::batcher::{DEFAULT_MAX_PER_HIT, DEFAULT_SPACING_SECS, DEFAULT_WINDOW_SECS};
use hitman_core::bonus::DEFAULT_REASON;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "hitman",
    about = "Approve, bonus and qualify Mechanical Turk workers without paying anyone twice",
    version,
    propagate_version = true
)]
struct Cli {
    /// Experiment directory holding config.txt and the ledger (default: cwd)
    #[arg(long, global = true, env = "HITMAN_DIR")]
    dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Talk to the requester sandbox instead of production
    #[arg(long, global = true)]
    sandbox: bool,

    /// Marketplace endpoint URL (overrides --sandbox)
    #[arg(long, global = true, env = "HITMAN_ENDPOINT", hide = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Approve submitted work on every reviewable HIT with the experiment title
    Approve {
        /// Experiment title (default: `title` in config.txt)
        #[arg(long, short = 't')]
        title: Option<String>,

        /// Feedback sent to each worker
        #[arg(long, default_value = DEFAULT_FEEDBACK)]
        feedback: String,
    },

    /// Approve submitted work on a single HIT
    ApproveHit {
        hit_id: String,

        /// Feedback sent to each worker
        #[arg(long, default_value = DEFAULT_FEEDBACK)]
        feedback: String,
    },

    /// Pay a worker a bonus for their work on a HIT
    Bonus {
        worker_id: String,
        hit_id: String,
        /// Bonus in USD, e.g. 1.50
        amount: String,

        /// Reason shown to the worker
        #[arg(long, default_value = DEFAULT_REASON)]
        reason: String,
    },

    /// Grant a qualification to workers, or update their score
    AssignQualification {
        /// Qualification type id
        qualification: String,

        /// Worker ids
        workers: Vec<String>,

        /// Integer score to set
        #[arg(long, default_value_t = 1)]
        value: i64,

        /// Don't email workers about the grant
        #[arg(long)]
        no_notify: bool,
    },

    /// Create an active qualification type
    CreateQualification {
        name: String,
        description: String,

        /// Seconds a worker must wait before requesting again
        #[arg(long, default_value_t = 123)]
        retry_delay: u64,

        /// Require workers to request the qualification
        #[arg(long)]
        no_auto_grant: bool,

        /// Score given on automatic grant
        #[arg(long, default_value_t = 1)]
        auto_grant_value: i64,
    },

    /// List workers on a HIT or HIT group
    Workers {
        /// HIT id
        #[arg(long, conflicts_with = "hit_group")]
        hit: Option<String>,

        /// HIT group id
        #[arg(long)]
        hit_group: Option<String>,

        /// Show only this worker
        #[arg(long)]
        worker: Option<String>,
    },

    /// Publish assignments in small HITs spread over a time window
    Batch {
        /// Total number of assignments
        assignments: u32,
        /// Reward per assignment in USD
        reward: String,
        /// HIT duration in hours
        duration: f64,

        /// Maximum assignments per HIT
        #[arg(long = "max", short = 'm', default_value_t = DEFAULT_MAX_PER_HIT)]
        max_per_hit: u32,

        /// Seconds between rounds
        #[arg(long, short = 's', default_value_t = DEFAULT_SPACING_SECS)]
        sleep: u64,

        /// Total seconds to spread publishing over
        #[arg(long, default_value_t = DEFAULT_WINDOW_SECS)]
        window: u64,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Inspect the record of processed work
    Ledger {
        #[command(subcommand)]
        subcommand: LedgerSubcommand,
    },
}

fn init_tracing(batch_log: Option<File>) {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        );
    let file = batch_log.map(|f| {
        fmt::layer()
            .with_writer(Mutex::new(f))
            .with_ansi(false)
            .with_target(false)
            .with_filter(LevelFilter::INFO)
    });
    tracing_subscriber::registry().with(console).with(file).init();
}

fn main() {
    let cli = Cli::parse();
    let dir = root::resolve_dir(cli.dir.as_deref());

    let batch_log = match &cli.command {
        Commands::Batch { .. } => match cmd::batch::open_log(&dir) {
            Ok(f) => Some(f),
            Err(e) => {
                eprintln!("error: {e:#}");
                std::process::exit(1);
            }
        },
        _ => None,
    };
    init_tracing(batch_log);

    let session = Session {
        dir,
        json: cli.json,
        sandbox: cli.sandbox,
        endpoint: cli.endpoint,
    };

    let result = match cli.command {
        Commands::Approve { title, feedback } => {
            cmd::approve::run_title(&session, title.as_deref(), &feedback)
        }
        Commands::ApproveHit { hit_id, feedback } => {
            cmd::approve::run_hit(&session, &hit_id, &feedback)
        }
        Commands::Bonus {
            worker_id,
            hit_id,
            amount,
            reason,
        } => cmd::bonus::run(&session, worker_id, hit_id, &amount, reason),
        Commands::AssignQualification {
            qualification,
            workers,
            value,
            no_notify,
        } => cmd::qualification::assign(&session, qualification, workers, value, !no_notify),
        Commands::CreateQualification {
            name,
            description,
            retry_delay,
            no_auto_grant,
            auto_grant_value,
        } => cmd::qualification::create(
            &session,
            name,
            description,
            retry_delay,
            !no_auto_grant,
            auto_grant_value,
        ),
        Commands::Workers {
            hit,
            hit_group,
            worker,
        } => cmd::workers::run(&session, hit, hit_group, worker.as_deref()),
        Commands::Batch {
            assignments,
            reward,
            duration,
            max_per_hit,
            sleep,
            window,
            yes,
        } => cmd::batch::run(
            &session,
            cmd::batch::BatchArgs {
                assignments,
                reward,
                duration,
                max_per_hit,
                sleep,
                window,
                yes,
            },
        ),
        Commands::Ledger { subcommand } => cmd::ledger::run(&session, subcommand),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
