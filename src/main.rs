mod api;

use chore_core::{
    config::{self, shellexpand, Config},
    model::{NewHousehold, NewMember, NewTask, NewUser, Recurrence},
    traits::SnapshotSource,
};
use chore_stats::{completion_timeliness, household_summary_for, member_stats};
use chore_store::Store;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "chorehub", version, about = "ChoreHub — shared household chores")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml", env = "CHOREHUB_CONFIG")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API.
    Serve,
    /// Show configuration and database status.
    Status,
    /// Print statistics for one household.
    Stats {
        /// Household id.
        #[arg(long)]
        household: i64,
        /// Rows in the timeliness table.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Insert a demo household for local use.
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    let _guard = init_logging(&cfg, matches!(cli.command, Commands::Serve))?;

    match cli.command {
        Commands::Serve => {
            let store = Store::new(&cfg.store).await?;
            println!("{} — serving on {}:{}", cfg.chorehub.name, cfg.api.host, cfg.api.port);
            api::serve(&cfg, store).await?;
        }
        Commands::Status => {
            println!("{} — Status Check\n", cfg.chorehub.name);
            println!("Config: {}", cli.config);
            println!("Database: {}", shellexpand(&cfg.store.db_path));

            let store = Store::new(&cfg.store).await?;
            let (households, users, tasks) = store.counts().await?;
            println!("  size: {} bytes", store.db_size().await?);
            println!("  households: {households}");
            println!("  users: {users}");
            println!("  tasks: {tasks}");
            println!(
                "\nAPI: {}:{} ({})",
                cfg.api.host,
                cfg.api.port,
                if cfg.api.api_key.is_empty() {
                    "no auth"
                } else {
                    "bearer auth"
                }
            );
        }
        Commands::Stats { household, limit } => {
            let store = Store::new(&cfg.store).await?;
            let snapshot = store.load_snapshot(household).await?;
            let previous = store.previous_weekly_summary(household, Utc::now()).await?;
            let summary = household_summary_for(&snapshot.tasks, &snapshot.users);

            println!("{} (household {})\n", snapshot.household.name, household);
            println!(
                "  tasks: {} total, {} completed, {} pending, {} unassigned",
                summary.total, summary.completed_count, summary.pending_count, summary.unassigned_count
            );
            println!("  progress: {}%", summary.weekly_progress);
            if let Some(prev) = previous {
                let trend = chore_stats::summary_trend(&summary, Some(&prev));
                println!(
                    "  vs last week: {:+} completed, {:+} pending",
                    trend.completed_diff, trend.pending_diff
                );
            }

            println!("\nMembers:");
            for member in member_stats(&snapshot.tasks, &snapshot.users) {
                println!(
                    "  [{}] {:<20} {:>3}% ({}/{} done, {} pending)",
                    member.initials,
                    member.name,
                    member.completion_rate,
                    member.completed,
                    member.assigned,
                    member.pending
                );
            }

            let entries = completion_timeliness(
                &snapshot.tasks,
                limit.unwrap_or(cfg.stats.timeliness_limit),
            );
            if !entries.is_empty() {
                println!("\nTimeliness:");
                for entry in entries {
                    println!(
                        "  {:<24} {:+} days ({:?})",
                        entry.task_title, entry.days_from_due, entry.status
                    );
                }
            }
        }
        Commands::Seed => {
            let store = Store::new(&cfg.store).await?;
            let household_id = seed(&store).await?;
            println!("Seeded demo household {household_id}");
        }
    }

    Ok(())
}

/// Install the tracing subscriber: stderr always, plus a daily-rolling file
/// under `<data_dir>/logs` for the long-running server.
fn init_logging(cfg: &Config, to_file: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&cfg.chorehub.log_level))
    };

    if !to_file {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    }

    let log_dir = Path::new(&shellexpand(&cfg.chorehub.data_dir)).join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "chorehub.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    Ok(Some(guard))
}

/// Two housemates and a week of chores, some done, some overdue.
async fn seed(store: &Store) -> anyhow::Result<i64> {
    let alice = store
        .create_user(&NewUser {
            username: "alice".into(),
            first_name: "Alice".into(),
            last_name: "Moreau".into(),
            email: "alice@example.com".into(),
            avatar: None,
        })
        .await?;
    let bob = store
        .create_user(&NewUser {
            username: "bob".into(),
            first_name: "Bob".into(),
            last_name: "Okafor".into(),
            email: "bob@example.com".into(),
            avatar: None,
        })
        .await?;

    let household = store
        .create_household(&NewHousehold {
            name: "Flat 4B".into(),
            description: Some("Demo household".into()),
            created_by_id: Some(alice.id),
        })
        .await?;
    store
        .add_member(
            household.id,
            &NewMember {
                user_id: bob.id,
                is_admin: false,
            },
        )
        .await?;

    let now = Utc::now();
    let chores = [
        ("Take out bins", Some(bob.id), Some(now - Duration::days(2)), Recurrence::Weekly),
        ("Clean bathroom", Some(alice.id), Some(now + Duration::days(3)), Recurrence::Weekly),
        ("Water plants", Some(bob.id), Some(now), Recurrence::Daily),
        ("Pay electricity bill", Some(alice.id), Some(now - Duration::days(1)), Recurrence::Monthly),
        ("Defrost freezer", None, None, Recurrence::Never),
    ];

    let mut created = Vec::new();
    for (title, assigned_to_id, due_date, recurring) in chores {
        let task = store
            .create_task(&NewTask {
                household_id: household.id,
                title: title.into(),
                description: None,
                assigned_to_id,
                created_by_id: alice.id,
                due_date,
                recurring,
                send_reminder: true,
            })
            .await?;
        created.push(task);
    }

    // One late completion and one early one, so timeliness has data.
    store.complete_task(created[0].id, bob.id, now).await?;
    store
        .complete_task(created[1].id, alice.id, now)
        .await?;

    Ok(household.id)
}
