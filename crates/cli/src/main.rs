//! Cadastro CLI - Database migrations and account management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! cadastro migrate
//!
//! # Create an account
//! cadastro accounts create -n "Ana Souza" -e ana@exemplo.com -p 's3nh4-f0rte'
//!
//! # Hash credentials still stored in plaintext
//! cadastro accounts migrate-passwords
//!
//! # Mint a bearer token for account 7
//! cadastro accounts issue-token 7
//!
//! # Create the demo account
//! cadastro seed demo
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cadastro")]
#[command(author, version, about = "Cadastro CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    /// Create a new account
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 6 characters)
        #[arg(short, long)]
        password: String,
    },
    /// Hash every credential still stored in plaintext
    MigratePasswords,
    /// Print a bearer token for an account
    IssueToken {
        /// Account id
        id: i32,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Create the demo account (demo@email.com) if missing
    Demo,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Accounts { action } => match action {
            AccountAction::Create {
                name,
                email,
                password,
            } => {
                commands::accounts::create(&name, &email, &password).await?;
            }
            AccountAction::MigratePasswords => commands::accounts::migrate_passwords().await?,
            AccountAction::IssueToken { id } => commands::accounts::issue_token(id).await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Demo => commands::seed::demo().await?,
        },
    }
    Ok(())
}
