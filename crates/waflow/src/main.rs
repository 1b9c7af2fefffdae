// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Waflow - multi-tenant WhatsApp Business webhook ingestion engine.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};
use waflow_core::types::{Tenant, TenantStatus};
use waflow_storage::Database;
use waflow_storage::queries::tenants;

mod serve;

/// Waflow - multi-tenant WhatsApp Business webhook ingestion engine.
#[derive(Parser, Debug)]
#[command(name = "waflow", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server.
    Serve,
    /// Print the effective configuration.
    Config,
    /// Manage tenants.
    Tenant {
        #[command(subcommand)]
        command: TenantCommands,
    },
}

#[derive(Subcommand, Debug)]
enum TenantCommands {
    /// Register (or update) a tenant.
    Add {
        /// Internal tenant identifier.
        #[arg(long)]
        id: String,
        /// Human-readable business name.
        #[arg(long)]
        name: String,
        /// WhatsApp phone-number id.
        #[arg(long)]
        phone_number_id: String,
        /// WhatsApp business account id.
        #[arg(long)]
        account_id: String,
        /// Verification handshake token. Generated when omitted.
        #[arg(long)]
        verify_token: Option<String>,
        /// Shared secret for signature verification. Omit to skip
        /// verification for this tenant.
        #[arg(long)]
        app_secret: Option<String>,
    },
    /// List registered tenants.
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match waflow_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            waflow_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Config) => {
            match toml::to_string_pretty(&config) {
                Ok(rendered) => {
                    print!("{rendered}");
                    Ok(())
                }
                Err(e) => Err(waflow_core::WaflowError::Internal(e.to_string())),
            }
        }
        Some(Commands::Tenant { command }) => run_tenant(&config, command).await,
        None => {
            println!("waflow: use --help for available commands");
            Ok(())
        }
    };

    if let Err(error) = result {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

async fn run_tenant(
    config: &waflow_config::WaflowConfig,
    command: TenantCommands,
) -> Result<(), waflow_core::WaflowError> {
    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;

    match command {
        TenantCommands::Add {
            id,
            name,
            phone_number_id,
            account_id,
            verify_token,
            app_secret,
        } => {
            let verify_token =
                verify_token.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let tenant = Tenant {
                id: id.clone(),
                display_name: name,
                phone_number_id,
                account_id,
                verify_token: verify_token.clone(),
                app_secret,
                status: TenantStatus::Active,
            };
            tenants::upsert_tenant(&db, &tenant).await?;
            println!("tenant {id} registered (verify_token: {verify_token})");
        }
        TenantCommands::List => {
            let all = tenants::list_tenants(&db).await?;
            if all.is_empty() {
                println!("no tenants registered");
            }
            for tenant in all {
                println!(
                    "{}  {}  phone={}  account={}  status={}  secret={}",
                    tenant.id,
                    tenant.display_name,
                    tenant.phone_number_id,
                    tenant.account_id,
                    tenant.status,
                    if tenant.app_secret.is_some() {
                        "set"
                    } else {
                        "unset"
                    },
                );
            }
        }
    }

    db.close().await
}
