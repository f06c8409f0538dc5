//! `scanbox`: barcode batch scanner client.
//!
//! Accumulates scanned codes, submits them to the collection service, and
//! keeps failed batches locally until they are resent or deleted.

mod commands;
mod config;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use scanbox_client::Submitter;
use scanbox_core::StoreConfig;
use scanbox_scan::{PendingReview, SyncWorkflow};

use commands::prompt_yes_no;
use commands::scan::LocalSave;
use config::{ClientConfig, Endpoint};

/// Barcode batch scanner CLI.
#[derive(Parser, Debug)]
#[command(name = "scanbox", about = "Barcode batch scanner client", version)]
struct Cli {
    /// Path to client config file (default: ~/.scanbox/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Directory holding the local store (default: $SCANBOX_DATA_DIR or ~/.scanbox).
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<String>,

    /// Keep pending batches in memory only; nothing is written to disk.
    #[arg(long = "ephemeral", global = true)]
    ephemeral: bool,

    /// Output format: table or json.
    #[arg(long = "output", short = 'o', global = true, default_value = "table")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage service contexts (server URL + API key).
    #[command(name = "context")]
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Switch the current context.
    #[command(name = "use")]
    Use {
        #[command(subcommand)]
        what: UseWhat,
    },

    /// Interactive scan session: one code per line from stdin.
    Scan,

    /// Submit the given codes as one batch.
    Submit {
        /// Scanned codes.
        #[arg(required = true)]
        codes: Vec<String>,
        /// On failure, keep the batch locally without asking.
        #[arg(long = "save-local", conflicts_with = "no_save_local")]
        save_local: bool,
        /// On failure, drop the batch without asking.
        #[arg(long = "no-save-local")]
        no_save_local: bool,
    },

    /// Review batches kept locally after failed submissions.
    Pending {
        #[command(subcommand)]
        action: PendingAction,
    },

    /// Show endpoint and local queue status.
    Status,

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum ContextAction {
    /// Create a new context.
    Create {
        /// Context name.
        name: String,
        /// Service base URL.
        #[arg(long)]
        server: String,
        /// API key sent as X-API-KEY.
        #[arg(long = "api-key")]
        api_key: Option<String>,
    },
    /// List all contexts.
    List,
    /// Set properties on a context.
    Set {
        name: String,
        #[arg(long)]
        server: Option<String>,
        #[arg(long = "api-key")]
        api_key: Option<String>,
    },
    /// Delete a context.
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum UseWhat {
    /// Switch to a context.
    Context { name: String },
}

#[derive(Subcommand, Debug)]
enum PendingAction {
    /// List pending batches.
    List,
    /// Resend a pending batch; it is removed once accepted.
    Resend {
        /// Result number as shown by `pending list`.
        position: usize,
    },
    /// Delete a pending batch without sending it.
    Delete {
        position: usize,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
    /// Delete all pending batches.
    Clear {
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so prompts and listings on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(ClientConfig::default_path);
    let store_config = match cli.data_dir {
        Some(dir) => StoreConfig::with_data_dir(dir),
        None => StoreConfig::default().with_env(),
    };
    let json_output = cli.output == "json";

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    match cli.command {
        Commands::Context { action } => match action {
            ContextAction::Create {
                name,
                server,
                api_key,
            } => {
                commands::context::create(&name, &server, api_key.as_deref(), &config_path)?;
            }
            ContextAction::List => {
                commands::context::list(&config_path)?;
            }
            ContextAction::Set {
                name,
                server,
                api_key,
            } => {
                commands::context::set(
                    &name,
                    server.as_deref(),
                    api_key.as_deref(),
                    &config_path,
                )?;
            }
            ContextAction::Delete { name } => {
                commands::context::delete(&name, &config_path)?;
            }
        },

        Commands::Use { what } => match what {
            UseWhat::Context { name } => {
                commands::context::use_context(&name, &config_path)?;
            }
        },

        Commands::Scan => {
            let config = ClientConfig::load(&config_path)?;
            let submitter = commands::build_submitter(&config.endpoint()?)?;
            let store = commands::open_store(&store_config, cli.ephemeral)?;
            let mut workflow = SyncWorkflow::new(submitter, store, config.failure_policy());
            commands::scan::run_session(&mut workflow, &mut input, &mut out).await?;
        }

        Commands::Submit {
            codes,
            save_local,
            no_save_local,
        } => {
            let config = ClientConfig::load(&config_path)?;
            let submitter = commands::build_submitter(&config.endpoint()?)?;
            let store = commands::open_store(&store_config, cli.ephemeral)?;
            let mut workflow = SyncWorkflow::new(submitter, store, config.failure_policy());
            let local = if save_local {
                LocalSave::Always
            } else if no_save_local {
                LocalSave::Never
            } else {
                LocalSave::Ask
            };
            commands::scan::submit(&mut workflow, codes, local, &mut input, &mut out).await?;
        }

        Commands::Pending { action } => {
            let config = ClientConfig::load(&config_path)?;
            let store = commands::open_store(&store_config, cli.ephemeral)?;
            let resending = matches!(action, PendingAction::Resend { .. });
            let review = PendingReview::new(store, pending_submitter(&config, resending)?);
            match action {
                PendingAction::List => {
                    commands::pending::list(&review, json_output, &mut out).await?;
                }
                PendingAction::Resend { position } => {
                    commands::pending::resend(&review, position, &mut out).await?;
                }
                PendingAction::Delete { position, yes } => {
                    if !yes && !prompt_yes_no(&mut input, &mut out, "Are you sure to delete this result ?")? {
                        writeln!(out, "Cancelled.")?;
                        return Ok(());
                    }
                    commands::pending::delete(&review, position, &mut out).await?;
                }
                PendingAction::Clear { yes } => {
                    if !yes && !prompt_yes_no(&mut input, &mut out, "Are you sure to clear result ?")? {
                        writeln!(out, "Cancelled.")?;
                        return Ok(());
                    }
                    commands::pending::clear(&review, &mut out).await?;
                }
            }
        }

        Commands::Status => {
            let config = ClientConfig::load(&config_path)?;
            let store = commands::open_store(&store_config, cli.ephemeral)?;
            let label = if cli.ephemeral {
                PathBuf::from("(memory)")
            } else {
                store_config.resolve_db_path()
            };
            commands::status::status(&config, &store, &label, json_output, &mut out).await?;
        }

        Commands::Version => {
            println!("scanbox cli v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Submitter for the pending commands. Only `resend` talks to the service, so
/// the others run even when no endpoint is configured.
fn pending_submitter(config: &ClientConfig, resending: bool) -> anyhow::Result<Arc<dyn Submitter>> {
    match config.endpoint() {
        Ok(endpoint) => commands::build_submitter(&endpoint),
        Err(e) if resending => Err(e),
        Err(_) => commands::build_submitter(&Endpoint::unset()),
    }
}
