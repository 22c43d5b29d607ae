use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_core::config::ProjectConfig;
use storefront_db::{DocumentStore, MemoryStore, PgStore};
use storefront_events::{EventBus, EventRecorder};
use storefront_scripts::{Script, ScriptContext, ScriptOptions};

#[derive(Parser)]
#[command(name = "storefront", version, about = "Storefront provisioning scripts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one script against the configured store.
    Exec {
        /// Script name, see `storefront scripts`.
        script: Script,
        /// Allow destructive scripts such as `fix-regions`.
        #[arg(long)]
        confirm_destructive: bool,
        /// JSON snapshot backing the in-memory store when no database is set.
        #[arg(long, env = "STOREFRONT_SNAPSHOT")]
        snapshot: Option<PathBuf>,
        /// Product handle `verify-final` focuses on.
        #[arg(long)]
        handle: Option<String>,
    },
    /// List available scripts.
    Scripts,
    /// Print the resolved configuration with secrets redacted.
    Config,
}

/// Where documents live for this run.
enum Backend {
    Postgres(Arc<PgStore>),
    Memory {
        store: Arc<MemoryStore>,
        snapshot: Option<PathBuf>,
    },
}

impl Backend {
    async fn open(config: &ProjectConfig, snapshot: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(url) = &config.database_url {
            let pool = storefront_db::create_pool(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connection pool created");

            storefront_db::health_check(&pool)
                .await
                .context("Database health check failed")?;
            storefront_db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");
            return Ok(Self::Postgres(Arc::new(PgStore::new(pool))));
        }

        let store = match &snapshot {
            Some(path) => MemoryStore::load_snapshot(path).await?,
            None => {
                tracing::warn!("DATABASE_URL not set and no snapshot given, changes will not persist");
                MemoryStore::new()
            }
        };
        Ok(Self::Memory {
            store: Arc::new(store),
            snapshot,
        })
    }

    fn store(&self) -> Arc<dyn DocumentStore> {
        match self {
            Self::Postgres(store) => Arc::clone(store) as Arc<dyn DocumentStore>,
            Self::Memory { store, .. } => Arc::clone(store) as Arc<dyn DocumentStore>,
        }
    }

    async fn persist(&self) -> anyhow::Result<()> {
        if let Self::Memory {
            store,
            snapshot: Some(path),
        } = self
        {
            save(store, path).await?;
        }
        Ok(())
    }
}

async fn save(store: &MemoryStore, path: &Path) -> anyhow::Result<()> {
    store
        .save_snapshot(path)
        .await
        .with_context(|| format!("Failed to save snapshot to {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_scripts=info,storefront_workflows=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Scripts => {
            for script in Script::ALL {
                let kind = if script.is_diagnostic() { "read-only" } else { "writes" };
                println!("{:<22} {:<10} {}", script.as_str(), kind, script.description());
            }
            Ok(())
        }
        Command::Config => {
            let config = ProjectConfig::from_env()?;
            println!("{}", serde_json::to_string_pretty(&config.summary())?);
            Ok(())
        }
        Command::Exec {
            script,
            confirm_destructive,
            snapshot,
            handle,
        } => {
            let options = ScriptOptions {
                confirm_destructive,
                product_handle: handle,
            };
            exec(script, options, snapshot).await
        }
    }
}

async fn exec(script: Script, options: ScriptOptions, snapshot: Option<PathBuf>) -> anyhow::Result<()> {
    // --- Configuration ---
    let config = ProjectConfig::from_env()?;
    let summary = config.summary();
    tracing::info!(
        worker_mode = ?summary.worker_mode,
        event_bus = %summary.event_bus,
        workflow_engine = %summary.workflow_engine,
        "Loaded project configuration"
    );
    if summary.default_secrets {
        tracing::warn!("JWT_SECRET or COOKIE_SECRET not set, using insecure defaults");
    }

    // --- Store ---
    let backend = Backend::open(&config, snapshot).await?;

    // --- Event bus ---
    let events = Arc::new(EventBus::default());
    let (recorder, recorder_handle) = EventRecorder::spawn(&events);

    let ctx = ScriptContext::new(backend.store(), Arc::clone(&events)).with_options(options);
    script.run(&ctx).await?;

    let executions = ctx.engine.executions();
    let failed = executions
        .iter()
        .filter(|e| e.error.is_some())
        .count();

    // Dropping every bus handle closes the channel and stops the recorder.
    drop(ctx);
    drop(events);
    if let Err(e) = recorder_handle.await {
        tracing::warn!(error = %e, "Event recorder task failed");
    }

    // Diagnostics only read, so the snapshot is left as loaded.
    if !script.is_diagnostic() {
        backend.persist().await?;
    }
    tracing::info!(
        script = script.as_str(),
        workflows = executions.len(),
        failed,
        events = recorder.events().len(),
        links_created = recorder.count("link.created"),
        "Script finished"
    );
    Ok(())
}
