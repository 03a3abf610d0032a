use anyhow::{Context, Result as AnyhowResult};
use clap::{Parser, Subcommand};
use compiler_session::app::{CompilerSession, NavigationType};
use compiler_session::config::Config;
use compiler_session::model::Selection;
use compiler_session::services::execution::HttpExecutionService;
use compiler_session::services::session::SaveOutcome;
use compiler_session::services::storage::{FileStore, KeyValueStore, SharedStore};
use compiler_session::services::time_source::RealTimeSource;
use compiler_session::services::tracing_setup;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Inspect and drive persisted compiler editor sessions
#[derive(Parser, Debug)]
#[command(name = "compiler-session")]
#[command(about = "Inspect and drive persisted compiler editor sessions", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Directory holding the tab and durable stores (default: platform data dir)
    #[arg(long, value_name = "PATH", global = true)]
    data_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Path to log file for diagnostics (default: system temp dir)
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mount the session and print the restored text
    Show {
        /// Mount as a page reload (clears the cached output)
        #[arg(long)]
        reload: bool,
    },
    /// Replace the session text with the contents of FILE and save it now
    Save {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Delete expired and malformed snapshots
    Sweep,
    /// Delete every snapshot, the fallback text and the cached output
    Clear,
    /// Compile and run the session text (or FILE) through the execution service
    Run {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Access token (default: the token in the durable store)
        #[arg(long)]
        token: Option<String>,
    },
}

fn load_config(path: Option<&Path>) -> AnyhowResult<Config> {
    match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn data_dir(args: &Args) -> AnyhowResult<PathBuf> {
    if let Some(dir) = &args.data_dir {
        return Ok(dir.clone());
    }
    let base = dirs::data_dir().context("Could not determine the platform data directory")?;
    Ok(base.join("compiler-session"))
}

struct Stores {
    tab: SharedStore,
    durable: SharedStore,
}

fn open_stores(dir: &Path) -> AnyhowResult<Stores> {
    let tab = FileStore::with_dir(dir.join("tab"));
    let durable = FileStore::with_dir(dir.join("durable"));
    tab.ensure_dir()
        .with_context(|| format!("Failed to create {}", tab.base_dir().display()))?;
    durable
        .ensure_dir()
        .with_context(|| format!("Failed to create {}", durable.base_dir().display()))?;
    Ok(Stores {
        tab: Arc::new(tab),
        durable: Arc::new(durable),
    })
}

fn print_notices(session: &mut CompilerSession) {
    for notice in session.take_notices() {
        eprintln!("[{:?}] {}", notice.level, notice);
    }
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;

    if args.dump_config {
        let json =
            serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
        println!("{}", json);
        return Ok(());
    }

    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(tracing_setup::default_log_path);
    if !tracing_setup::init_global(&log_file) {
        eprintln!("Warning: logging disabled ({} not writable)", log_file.display());
    }

    let Some(command) = &args.command else {
        anyhow::bail!("No command given, see --help");
    };

    let dir = data_dir(&args)?;
    let stores = open_stores(&dir)?;
    tracing::info!("Using session data in {}", dir.display());

    let mut session = CompilerSession::new(
        config.clone(),
        stores.tab.clone(),
        stores.durable.clone(),
        RealTimeSource::shared(),
    );

    match command {
        Command::Show { reload } => {
            let navigation = if *reload {
                NavigationType::Reload
            } else {
                NavigationType::Navigate
            };
            let source = session.mount(navigation);
            eprintln!(
                "session {} restored from {:?}",
                session.session_id().map(|id| id.as_str()).unwrap_or("-"),
                source
            );
            println!("{}", session.code());
            eprintln!("--- output ---\n{}", session.display_output());
        }
        Command::Save { file } => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            session.mount(NavigationType::Navigate);
            session.edit(text.as_str(), Selection::end_of(&text));
            let outcome = session.flush();
            session.unmount();
            print_notices(&mut session);
            match outcome {
                SaveOutcome::Failed { error, .. } => {
                    anyhow::bail!("Failed to save {}: {}", file.display(), error)
                }
                other => eprintln!("{:?}", other),
            }
        }
        Command::Sweep => {
            let removed = session.sweep_expired();
            println!("removed {} stale snapshots", removed);
        }
        Command::Clear => {
            session.mount(NavigationType::Navigate);
            session.clear();
            print_notices(&mut session);
        }
        Command::Run { file, token } => {
            session.mount(NavigationType::Navigate);
            if let Some(file) = file {
                let text = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                session.edit(text.as_str(), Selection::end_of(&text));
            }
            let token = match token {
                Some(token) => Some(token.clone()),
                None => stores
                    .durable
                    .get(&config.keys.auth_token)
                    .context("Failed to read the stored access token")?,
            };

            let service = HttpExecutionService::new(&config.execution);
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            let outcome = runtime.block_on(session.run(&service, token.as_deref()));
            session.flush();
            session.unmount();

            print_notices(&mut session);
            println!("{}", outcome.output);
        }
    }

    Ok(())
}
