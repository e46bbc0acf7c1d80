//! Instashop CLI - Database migrations and administration.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! instashop migrate
//!
//! # Create an admin user
//! instashop admin create -u alice -e alice@example.com -p 'correct horse battery'
//!
//! # Approve, decline, or reset an order
//! instashop order set-status --order 12 --owner 7 --status approved
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create admin users
//! - `order set-status` - Administrative order status change

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "instashop")]
#[command(author, version, about = "Instashop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin username
        #[arg(short, long)]
        username: String,

        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Set an order's status (pending, declined, approved, canceled)
    SetStatus {
        /// Order ID
        #[arg(long)]
        order: i32,

        /// Owning user ID
        #[arg(long)]
        owner: i32,

        /// New status
        #[arg(long)]
        status: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                email,
                password,
            } => {
                commands::admin::create(&username, &email, &password).await?;
            }
        },
        Commands::Order { action } => match action {
            OrderAction::SetStatus {
                order,
                owner,
                status,
            } => commands::order::set_status(order, owner, &status).await?,
        },
    }
    Ok(())
}
