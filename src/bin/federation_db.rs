// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0
//! Manage the schema of the unique id resolver database.
use clap::{Parser, Subcommand};
use color_eyre::Report;
use eyre::WrapErr;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::prelude::*;
use secrecy::ExposeSecret;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    prelude::*,
};

use identity_federation::config::Config;
use identity_federation::db_migration::Migrator;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to the federation config file.
    #[arg(
        short,
        long,
        default_value = "/etc/identity-federation/federation.conf"
    )]
    config: PathBuf,

    /// Verbosity level. Repeat to increase level.
    #[arg(short, long, global=true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations.
    Up {
        /// Number of pending migrations to apply.
        #[arg(short('n'))]
        steps: Option<u32>,
    },
    /// Rollback applied migrations.
    Down {
        /// Number of migrations to rollback.
        #[arg(short('n'))]
        steps: Option<u32>,
    },
    /// Show the pending and applied migrations.
    Status,
    /// Drop the resolver tables and apply all migrations again.
    Fresh,
    /// Rollback all applied migrations.
    Reset,
}

fn init_logging(verbose: u8) {
    let filter = Targets::new().with_default(match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    });
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(filter);
    tracing_subscriber::registry().with(log_layer).init();
}

#[allow(clippy::print_stdout)]
async fn print_status(conn: &DatabaseConnection) -> Result<(), Report> {
    let pending = Migrator::get_pending_migrations(conn).await?;
    if pending.is_empty() {
        println!("No pending migrations");
    } else {
        println!("Pending migrations:");
        for migration in pending {
            println!("  {}", migration.name());
        }
    }
    println!("Applied migrations:");
    for migration in Migrator::get_applied_migrations(conn).await? {
        println!("  {}", migration.name());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Report> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = Config::new(cli.config)?;
    let opt = ConnectOptions::new(cfg.database.get_connection().expose_secret())
        // Keep the password out of the logs.
        .sqlx_logging(false)
        .to_owned();

    info!("Connecting to the resolver database");
    let conn = Database::connect(opt)
        .await
        .wrap_err("Database connection failed")?;

    match cli.command {
        Commands::Up { steps } => Migrator::up(&conn, steps).await?,
        Commands::Down { steps } => Migrator::down(&conn, steps).await?,
        Commands::Status => print_status(&conn).await?,
        Commands::Fresh => Migrator::fresh(&conn).await?,
        Commands::Reset => Migrator::reset(&conn).await?,
    }
    Ok(())
}
