//! schema_vc CLI
//!
//! Keeps a database schema under version control through a declarative YAML file.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use schema_vc::report::{apply_summary, render_status};
use schema_vc::schema::file;
use schema_vc::utils::init_logging;
use schema_vc::{config, SchemaVersionControl};

/// Database schema version control.
#[derive(Parser)]
#[command(name = "schema_vc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "schema_vc.toml")]
    config: PathBuf,

    /// Schema file, overriding the configured one.
    #[arg(long)]
    schema_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show database schema status.
    Status {
        /// Print the raw difference as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Update the database from the schema file.
    Apply {
        /// Print the statements without executing them.
        #[arg(long)]
        dry_run: bool,

        /// Automatic yes to prompts.
        #[arg(short = 'y', long)]
        assume_yes: bool,

        /// Also enforce the declared column order.
        #[arg(short, long)]
        strict: bool,
    },

    /// Dump the current database schema into the schema file.
    Dump,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_from_file(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(schema_file) = cli.schema_file {
        config.schema.file = schema_file;
    }
    init_logging(config.logging.as_ref())?;

    // Reject a broken schema file before touching the database
    if !matches!(cli.command, Commands::Dump) {
        file::load_file(&config.schema.file)
            .with_context(|| format!("Invalid schema file {}", config.schema.file.display()))?;
    }

    let service = SchemaVersionControl::connect(&config).await?;

    match cli.command {
        Commands::Status { json } => {
            let diff = service.schema_diff(true).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&diff)?);
            } else {
                print!("{}", render_status(&diff));
            }
        }

        Commands::Apply {
            dry_run,
            assume_yes,
            strict,
        } => {
            if dry_run {
                // Column moves depend on the migrated schema and are not previewed
                let statements = service.migration_sql().await?;
                if statements.is_empty() {
                    println!("# schema up-to-date.");
                } else {
                    println!("# Would execute following statements");
                    for statement in &statements {
                        println!("{}", statement);
                    }
                }
                return Ok(());
            }

            if !(assume_yes || config.apply.assume_yes) {
                let diff = service.schema_diff(false).await?;
                for line in apply_summary(&diff) {
                    println!("{}", line);
                }
                if !confirm("Continue (yes/no)? ")? {
                    return Ok(());
                }
            }

            let statements = service.apply_schema(strict || config.apply.strict).await?;
            if statements.is_empty() {
                println!("No Sql statement executed");
            } else {
                println!("{} Sql statements executed", statements.len());
            }
        }

        Commands::Dump => {
            let schema = service.dump_schema().await?;
            println!(
                "# {} tables written to {}",
                schema.tables.len(),
                service.schema_file().display()
            );
        }
    }

    Ok(())
}

/// Ask a yes/no question on the terminal
fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{}", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().to_lowercase().starts_with('y'))
}
