//! Slidenote CLI - annotation persistence for tissue slide servers

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use slidenote::config::{self, SlidenoteConfig};
use slidenote::server::AnnotationRouter;
use slidenote::storage::SqliteStore;
use slidenote::ui::{self, Icons};
use slidenote::{AnnotationStore, FsBlobStore, RequestContext, Router, StreamEmitter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "slidenote")]
#[command(version)]
#[command(about = "Annotation persistence for tissue slide image servers")]
#[command(long_about = r#"
Slidenote stores named JSON annotation documents for tissue images,
keeping SQLite metadata and on-disk JSON blobs in step.

Commands use the annotation protocol "<verb>/<payload>":
  getList/<tissuePath>
  load/<annotationId>
  save/<tissuePath>,<name>,<json>
  remove/<annotationId>

Example usage:
  slidenote init
  slidenote exec 'save/scan001,roi1,{"x":1}'
  slidenote serve --port 8080
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true, default_value = "slidenote.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Run one annotation command and print its JSON response
    Exec {
        /// Raw command, e.g. `getList/scan001`
        command: String,

        /// Path to the database file (overrides config)
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Prefix the response with its Content-Type header block
        #[arg(long)]
        header: bool,
    },

    /// Serve the annotation protocol over HTTP
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the database file (overrides config)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show metadata store statistics
    Stats {
        /// Path to the database file (overrides config)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

fn build_router(config: &SlidenoteConfig, database: Option<PathBuf>) -> anyhow::Result<AnnotationRouter> {
    let database = database.unwrap_or_else(|| config.database_path());
    config::ensure_db_dir(&database)?;

    let env = config.environment();
    config::ensure_annotation_folder(&env)?;

    tracing::debug!("Opening metadata store {}", database.display());
    let metadata = SqliteStore::open(&database)?;
    Ok(Router::new(AnnotationStore::new(metadata, FsBlobStore::new(), env)))
}

fn load_or_default(path: &Path) -> anyhow::Result<SlidenoteConfig> {
    match config::load_config(Some(path))? {
        Some(config) => Ok(config),
        None => {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(SlidenoteConfig::default())
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for responses
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => {
            config::write_config(&cli.config, &SlidenoteConfig::starter(), force)?;
            ui::success(&format!("Wrote {}", cli.config.display()));
        }

        Commands::Exec { command, database, header } => {
            let config = load_or_default(&cli.config)?;
            let router = build_router(&config, database)?;

            let stdout = std::io::stdout();
            let mut emitter = if header {
                StreamEmitter::new(stdout.lock())
            } else {
                StreamEmitter::body_only(stdout.lock())
            };
            let mut ctx = RequestContext::new(&mut emitter);

            if let Err(e) = router.handle(&mut ctx, &command) {
                ui::error(&format!("{} ({})", e, e.kind()));
                return Err(e.into());
            }
        }

        Commands::Serve { port, database } => {
            let config = load_or_default(&cli.config)?;
            let port = port.or(config.port).unwrap_or(config::DEFAULT_PORT);
            let router = build_router(&config, database)?;

            let env = router.store().environment().clone();
            ui::header("Starting annotation server");
            ui::info(&format!("{} Slides", Icons::FOLDER), &format!("{}*{}", env.fs_prefix, env.fs_suffix));
            ui::info(&format!("{} Annotations", Icons::FOLDER), &env.annotation_folder);

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(slidenote::server::start_server(port, router))?;
        }

        Commands::Stats { database } => {
            let config = load_or_default(&cli.config)?;
            let database = database.unwrap_or_else(|| config.database_path());
            if !database.exists() {
                ui::warn(&format!("No database at {}", database.display()));
                return Ok(());
            }

            let store = SqliteStore::open(&database)?;
            let stats = store.stats()?;

            ui::info(&format!("{} Database", Icons::DATABASE), &database.display().to_string());
            eprintln!("{} {}", Icons::STATS, stats);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
