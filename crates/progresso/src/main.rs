use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod curriculum;
mod db;
mod html;
mod metrics;
mod server;
mod store;
mod time;
mod tracker;
mod types;

use config::{Overrides, Settings, StoreKind};
use store::{DynStore, ProgressStore};
use time::Clock;
use tracker::{ResetOutcome, Tracker, EXPORT_FILENAME};

#[derive(Parser, Debug)]
#[command(name = "progresso")]
#[command(about = "Track progress through a four-week study curriculum")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding saved progress [env: PROGRESSO_DATA_DIR, default: data]
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Storage backend [env: PROGRESSO_STORE, default: file]
    #[arg(long, value_enum, global = true)]
    store: Option<StoreKind>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on [env: PROGRESSO_PORT, default: 8080]
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print progress for every week
    Status,

    /// Mark a task as done (or not done with --undo)
    Toggle {
        /// Week number, starting at 1
        week: usize,

        /// Task number within the week, starting at 1
        task: usize,

        /// Mark the task as not done
        #[arg(long)]
        undo: bool,
    },

    /// Complete a whole week, or clear it if it is already complete
    MarkWeek {
        /// Week number, starting at 1
        week: usize,
    },

    /// Wipe all progress
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Write a JSON summary of progress per week
    Export {
        /// Output file (defaults to progresso_photoshop.json in the data directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Generate a static index.html in the data directory (no server)
    Build,
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,tower_http=warn", log_level)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
}

/// Convert a 1-based number from the command line into an index
fn to_index(number: usize, what: &str) -> Result<usize> {
    match number.checked_sub(1) {
        Some(index) => Ok(index),
        None => bail!("{} numbers start at 1", what),
    }
}

/// Ask a yes/no question on the terminal; anything but yes means no
fn confirm_on_stdin(prompt: &str) -> bool {
    print!("{} [s/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "sim" | "y" | "yes"
    )
}

fn open_tracker(settings: &Settings) -> Result<Tracker<DynStore>> {
    let store = settings.open_store()?;
    let tracker = Tracker::open(ProgressStore::new(store, curriculum::DEFAULT), Clock::System)
        .context("Failed to load progress")?;
    Ok(tracker)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    let settings = Settings::from_env(Overrides {
        data_dir: args.data_dir,
        store: args.store,
    })?;
    info!(
        data_dir = %settings.data_dir.display(),
        store = ?settings.store,
        "Using progress store"
    );

    let mut tracker = open_tracker(&settings)?;

    // Default to serve if no command specified
    match args.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            let port = config::server_port(port)?;
            server::serve(port, tracker).await?;
        }
        Commands::Status => {
            print!("{}", html::render_text(tracker.state(), &tracker.metrics()));
        }
        Commands::Toggle { week, task, undo } => {
            let week = to_index(week, "Week")?;
            let task = to_index(task, "Task")?;
            let metrics = tracker.toggle_task(week, task, !undo)?;
            info!(
                week_percent = metrics.weeks[week].percent,
                overall = metrics.overall_percent,
                "Task updated"
            );
        }
        Commands::MarkWeek { week } => {
            let week = to_index(week, "Week")?;
            let metrics = tracker.toggle_week(week)?;
            print!("{}", html::render_text(tracker.state(), &metrics));
        }
        Commands::Reset { yes } => match tracker.reset_all(|prompt| yes || confirm_on_stdin(prompt))? {
            ResetOutcome::Reset(metrics) => {
                info!(overall = metrics.overall_percent, "Progress reset");
            }
            ResetOutcome::Declined => {
                info!("Reset cancelled, nothing changed");
            }
        },
        Commands::Export { out } => {
            let path = out.unwrap_or_else(|| settings.data_dir.join(EXPORT_FILENAME));
            let json = tracker.export_summary().to_json()?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Summary exported");
        }
        Commands::Build => {
            std::fs::create_dir_all(&settings.data_dir)?;
            let html_path = settings.data_dir.join("index.html");
            html::generate_html(tracker.state(), &tracker.metrics(), &html_path)?;
            info!(path = %html_path.display(), "HTML saved");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_index() {
        assert_eq!(to_index(1, "Week").unwrap(), 0);
        assert_eq!(to_index(4, "Week").unwrap(), 3);
        assert!(to_index(0, "Week").is_err());
    }

    #[test]
    fn test_args_default_to_serve() {
        let args = Args::try_parse_from(["progresso"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_args_toggle() {
        let args = Args::try_parse_from(["progresso", "toggle", "2", "3", "--undo", "--store", "sqlite"]).unwrap();
        match args.command {
            Some(Commands::Toggle { week, task, undo }) => {
                assert_eq!((week, task, undo), (2, 3, true));
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(args.store, Some(StoreKind::Sqlite));
    }

    #[test]
    fn test_args_reset_and_export() {
        let args = Args::try_parse_from(["progresso", "reset", "--yes"]).unwrap();
        assert!(matches!(args.command, Some(Commands::Reset { yes: true })));

        let args = Args::try_parse_from(["progresso", "-d", "/tmp/p", "export", "-o", "out.json"]).unwrap();
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/p")));
        assert!(matches!(args.command, Some(Commands::Export { out: Some(_) })));
    }

    #[test]
    fn test_args_serve_port() {
        let args = Args::try_parse_from(["progresso", "serve", "--port", "9999"]).unwrap();
        assert!(matches!(args.command, Some(Commands::Serve { port: Some(9999) })));
    }

    #[test]
    fn test_args_reject_unknown_store() {
        assert!(Args::try_parse_from(["progresso", "--store", "redis", "status"]).is_err());
    }
}
