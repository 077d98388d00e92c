mod db;
mod notifications;
mod search;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use handyhub_core::StatusFilter;
use handyhub_notify::SortOrder;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "handyhub-cli")]
#[command(about = "HandyHub local services marketplace command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Find providers by skill or name, optionally near a location
    Search {
        text: String,
        /// Origin as "lat,lng", "lat lng" or a JSON object
        #[arg(long, conflicts_with = "here", allow_hyphen_values = true)]
        near: Option<String>,
        /// Use the device location (`HANDYHUB_DEVICE_LOCATION`: "lat,lng" or "denied")
        #[arg(long)]
        here: bool,
        #[arg(long)]
        radius_km: Option<f64>,
    },
    /// Read and manage a user's notifications
    Notifications {
        #[arg(long, env = "HANDYHUB_USER_ID", global = true)]
        user: Option<Uuid>,
        #[command(subcommand)]
        command: NotificationCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
    /// Upsert service providers from a YAML seed file
    Seed {
        #[arg(long, default_value = "config/providers.yaml")]
        file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum NotificationCommands {
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        /// Only show notifications whose title or message contains this text
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "newest")]
        sort: SortOrder,
    },
    Read {
        id: Uuid,
    },
    ReadAll,
    Delete {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// Follow the live change feed until Ctrl-C
    Watch {
        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("handyhub-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = handyhub_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool = handyhub_db::connect_pool_from_config(&config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => db::run_ping(&pool).await,
            DbCommands::Migrate => db::run_migrate(&pool).await,
            DbCommands::Seed { file } => db::run_seed(&pool, &file).await,
        },
        Commands::Search {
            text,
            near,
            here,
            radius_km,
        } => {
            search::run_search(
                &pool,
                &config,
                &text,
                near.as_deref(),
                here,
                radius_km.unwrap_or(config.search_default_radius_km),
            )
            .await
        }
        Commands::Notifications { user, command } => {
            let user = user.ok_or_else(|| {
                anyhow::anyhow!("--user (or HANDYHUB_USER_ID) is required for notification commands")
            })?;
            match command {
                NotificationCommands::List {
                    page,
                    limit,
                    status,
                    search,
                    sort,
                } => {
                    let limit = limit.unwrap_or(config.notifications_page_size);
                    notifications::run_list(&pool, user, page, limit, status, search, sort).await
                }
                NotificationCommands::Read { id } => {
                    notifications::run_read(&pool, user, id).await
                }
                NotificationCommands::ReadAll => {
                    notifications::run_read_all(&pool, user).await
                }
                NotificationCommands::Delete { ids } => {
                    notifications::run_delete(&pool, user, &ids).await
                }
                NotificationCommands::Watch { status } => {
                    notifications::run_watch(&pool, &config, user, status).await
                }
            }
        }
    }
}
