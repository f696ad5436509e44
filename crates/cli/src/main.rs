//! contentvc command-line management tool.
//!
//! Provides subcommands for creating and inspecting content versions,
//! comparing and merging them, restoring past versions, viewing the audit
//! log, generating / validating configuration files, and running the REST
//! API server.

mod commands;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use contentvc_core::config::AppConfig;
use contentvc_core::db::Database;
use contentvc_core::models::TenantId;
use contentvc_core::store::SqliteVersionStore;
use contentvc_core::VersionControl;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// contentvc command-line management tool.
#[derive(Parser, Debug)]
#[command(
    name = "contentvc",
    version,
    about = "Manage versioned content: history, diffs, merges and restores"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "./contentvc.toml")]
    config: PathBuf,

    /// Tenant on whose behalf the command runs.
    #[arg(short, long, global = true)]
    tenant: Option<i64>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./contentvc.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,

    /// Save a new version of a content item.
    Create {
        /// Content item id.
        #[arg(long)]
        content: i64,

        /// Author id recorded on the version.
        #[arg(long)]
        author: i64,

        /// File holding the body; `-` reads standard input.
        #[arg(short, long, default_value = "-")]
        file: PathBuf,

        /// Tags to attach (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List the versions of a content item, newest first.
    List {
        /// Content item id.
        #[arg(long)]
        content: i64,
    },

    /// Show one version.
    Show {
        /// Version id.
        id: i64,

        /// Print the body after the metadata.
        #[arg(long)]
        body: bool,
    },

    /// Show the current version of a content item.
    Current {
        /// Content item id.
        #[arg(long)]
        content: i64,
    },

    /// Compare two versions.
    Diff {
        /// Version to compare from.
        from: i64,

        /// Version to compare to.
        to: i64,

        /// Print a unified patch instead of change records.
        #[arg(long)]
        unified: bool,

        /// Print the diff as JSON.
        #[arg(long, conflicts_with = "unified")]
        json: bool,
    },

    /// Merge two versions, three-way when a base is given.
    Merge {
        /// Version A.
        ours: i64,

        /// Version B.
        theirs: i64,

        /// Common ancestor of A and B.
        #[arg(long)]
        base: Option<i64>,

        /// Drop lines present only in B.
        #[arg(long)]
        no_additions: bool,

        /// Keep lines the other side deleted.
        #[arg(long)]
        keep_deletions: bool,

        /// Write the merged body to this file instead of standard output.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve the conflict markers in a merged file.
    Resolve {
        /// File containing conflict markers; rewritten in place.
        file: PathBuf,

        /// Resolution for every block: ours, theirs, both or base.
        #[arg(long)]
        strategy: String,
    },

    /// Restore a past version as the new current version.
    Restore {
        /// Version id to restore.
        id: i64,

        /// User id recorded as the restorer.
        #[arg(long)]
        by: i64,

        /// Free-form note stored with the restore record.
        #[arg(long)]
        notes: Option<String>,
    },

    /// List restore records of a content item.
    Restores {
        /// Content item id.
        #[arg(long)]
        content: i64,
    },

    /// Show recent audit log entries.
    Audit {
        /// Maximum number of entries to show.
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Run the REST API server.
    Serve {
        /// Listen address; defaults to `server.listen` from the config.
        #[arg(long)]
        listen: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level(&cli));
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", commands::style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

/// Quiet for one-shot commands; the configured level for the server.
fn default_log_level(cli: &Cli) -> String {
    match cli.command {
        Commands::Serve { .. } => AppConfig::load_from_file(&cli.config)
            .map(|c| c.server.log_level)
            .unwrap_or_else(|_| "info".to_string()),
        _ => "warn".to_string(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => commands::config::cmd_init(&output),
        Commands::Validate => commands::config::cmd_validate(&cli.config),
        Commands::Resolve { file, strategy } => commands::merge::cmd_resolve(&file, &strategy),
        Commands::Serve { listen } => {
            let config = load_config(&cli.config)?;
            let db = open_database(&config)?;
            let listen = listen.unwrap_or_else(|| config.server.listen.clone());
            contentvc_web::WebServer::new(config, db)
                .start(&listen)
                .await
        }
        command => {
            // Everything else acts on behalf of a tenant.
            let tenant = TenantId(
                cli.tenant
                    .context("--tenant is required for this command")?,
            );
            let config = load_config(&cli.config)?;
            let db = open_database(&config)?;

            match command {
                Commands::Audit { limit } => commands::versions::cmd_audit(&db, tenant, limit),
                command => {
                    let store = Arc::new(SqliteVersionStore::new(db));
                    let vc = VersionControl::from_config(&config, store);
                    dispatch(&vc, tenant, command)
                }
            }
        }
    }
}

fn dispatch(vc: &VersionControl, tenant: TenantId, command: Commands) -> Result<()> {
    use commands::{merge, versions};

    match command {
        Commands::Create {
            content,
            author,
            file,
            tags,
        } => versions::cmd_create(vc, tenant, content, author, &file, tags),
        Commands::List { content } => versions::cmd_list(vc, tenant, content),
        Commands::Show { id, body } => versions::cmd_show(vc, tenant, id, body),
        Commands::Current { content } => versions::cmd_current(vc, tenant, content),
        Commands::Diff {
            from,
            to,
            unified,
            json,
        } => merge::cmd_diff(vc, tenant, from, to, unified, json),
        Commands::Merge {
            ours,
            theirs,
            base,
            no_additions,
            keep_deletions,
            output,
        } => merge::cmd_merge(
            vc,
            tenant,
            merge::MergeArgs {
                ours,
                theirs,
                base,
                include_additions: !no_additions,
                exclude_deletions: keep_deletions,
                output,
            },
        ),
        Commands::Restore { id, by, notes } => versions::cmd_restore(vc, tenant, id, by, notes),
        Commands::Restores { content } => versions::cmd_restores(vc, tenant, content),
        other => anyhow::bail!("command {:?} does not act on versions", other),
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_and_resolve(path).context("failed to load configuration file")
}

fn open_database(config: &AppConfig) -> Result<Arc<Database>> {
    let db = Database::from_config(&config.storage).with_context(|| {
        format!(
            "failed to open database {}",
            config.storage.database_path.display()
        )
    })?;
    Ok(Arc::new(db))
}
