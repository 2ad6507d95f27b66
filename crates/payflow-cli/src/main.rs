//! Operator CLI, grounded on `mqk-cli`'s `clap::Parser`/`Subcommand` shape:
//! thin argument parsing over the same `payflow-db`/`payflow-config` crates
//! the daemon uses, so `db status`/`db migrate`/`config-hash` exercise the
//! exact code paths the running service does.

use anyhow::Result;
use clap::{Parser, Subcommand};
use payflow_daemon::ingest;

#[derive(Parser)]
#[command(name = "payflow")]
#[command(about = "Payflow orchestration platform CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env overlay)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Validate a batch file without submitting it for processing
    ValidateBatch {
        /// Path to the CSV or JSON batch file
        path: String,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let store = payflow_db::PostgresStore::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = store.status().await?;
                    println!("db_ok={} has_batches_table={}", s.ok, s.has_batches_table);
                }
                DbCmd::Migrate => {
                    store.migrate().await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = payflow_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::ValidateBatch { path } => {
            let bytes = std::fs::read(&path)?;
            let is_json = path.ends_with(".json") || serde_json::from_slice::<serde_json::Value>(&bytes).is_ok();
            let outcome = if is_json { ingest::parse_json("VALIDATE", &bytes) } else { ingest::parse_csv("VALIDATE", &bytes) };

            println!("accepted={} rejected={}", outcome.lines.len(), outcome.rejections.len());
            for r in &outcome.rejections {
                println!("row {}: {}", r.row_index, r.reason);
            }
            if !outcome.rejections.is_empty() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
