//! Store Service - migrations and connectivity checks for the store.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use common::{ProfileResolver, ProfileSettings};
use store_service_lib::config::StoreServiceConfig;
use store_service_lib::service::UserService;
use store_service_lib::{MigrateAction, Persistence};

#[derive(Parser)]
#[command(name = "store-service")]
#[command(about = "Transactional store for users and prescriptions")]
struct Cli {
    /// Store profile (mock, staging, prod); overrides STORE_PROFILE
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateCommands,
    },
    /// Open the store, verify connectivity and the credential settings
    Check,
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let service_config = StoreServiceConfig::from_env()?;
    let guard = service_config.credential_guard()?;
    let token = cli.profile.unwrap_or(service_config.profile);

    let resolver = ProfileResolver::new(ProfileSettings::from_env()?);
    let config = resolver.resolve(&token)?;

    match cli.command {
        Commands::Migrate { action } => {
            let migrate_action = match action {
                MigrateCommands::Up => MigrateAction::Up,
                MigrateCommands::Down => MigrateAction::Down,
                MigrateCommands::Status => MigrateAction::Status,
                MigrateCommands::Fresh => MigrateAction::Fresh,
            };
            let status = store_service_lib::run_migrations(config, migrate_action).await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        Commands::Check => {
            let store = Persistence::open(&resolver).await?;
            store.ping().await?;
            let users = store.users(guard).user_ids().await?.len();
            println!(
                "{} store reachable ({} / {} connections free, {} users)",
                config.profile,
                store.pool().available(),
                store.pool().max_size(),
                users
            );
        }
    }

    Ok(())
}
