mod commands;
mod error_presentation;
mod url;

use clap::{Parser, Subcommand};
use error_presentation::render_runtime_error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "driftql", version, about = "Declarative database schema management")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Operate on live database schemas.
    #[command(subcommand)]
    Schema(SchemaCommand),
    /// Operate on versioned migration directories.
    #[command(subcommand)]
    Migrate(MigrateCommand),
}

#[derive(Debug, Subcommand)]
enum SchemaCommand {
    /// Print the schema of a live database as SQL.
    Inspect {
        #[arg(long)]
        url: String,
        #[arg(long)]
        schema: Vec<String>,
        #[arg(long)]
        exclude: Vec<String>,
        #[arg(long, default_value = "sql")]
        format: String,
    },
    /// Print the changes that would bring `--url` to the state of `--to`.
    Diff {
        #[arg(long)]
        url: String,
        #[arg(long)]
        to: String,
        /// Compare from this URL instead of `--url`.
        #[arg(long)]
        from: Option<String>,
        /// Normalize the desired state through this dev database first.
        #[arg(long)]
        dev_url: Option<String>,
        #[arg(long)]
        schema: Vec<String>,
        #[arg(long)]
        exclude: Vec<String>,
        #[arg(long = "var")]
        vars: Vec<String>,
    },
    /// Apply the state of `--to` onto `--url`.
    Apply {
        #[arg(long)]
        url: String,
        #[arg(long)]
        to: String,
        /// Normalize the desired state through this dev database first.
        #[arg(long)]
        dev_url: Option<String>,
        #[arg(long)]
        schema: Vec<String>,
        #[arg(long)]
        exclude: Vec<String>,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        auto_approve: bool,
        #[arg(long, default_value = "10s")]
        lock_timeout: String,
        #[arg(long = "var")]
        vars: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
enum MigrateCommand {
    /// Plan the diff against `--to` into a new migration file.
    Diff {
        /// Migration name, used in the file name.
        name: String,
        #[arg(long)]
        dir: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        dev_url: Option<String>,
    },
    /// Apply pending migration files.
    Apply {
        #[arg(long)]
        dir: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        dev_url: Option<String>,
        #[arg(long, default_value = "10s")]
        lock_timeout: String,
        #[arg(long, default_value = "file")]
        tx_mode: String,
        #[arg(long)]
        auto_approve: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate the directory against its checksum file.
    Validate {
        #[arg(long)]
        dir: String,
    },
    /// Show applied and pending migration versions.
    Status {
        #[arg(long)]
        dir: String,
        #[arg(long)]
        url: String,
    },
    /// Recompute and rewrite the checksum file.
    Hash {
        #[arg(long)]
        dir: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // The update notifier is an outward HTTP call and fully out of band; it
    // honors the conventional opt-out before doing nothing further.
    let _update_notifier_disabled = std::env::var_os("ATLAS_NO_UPDATE_NOTIFIER").is_some();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Schema(command) => commands::run_schema(command),
        Command::Migrate(command) => commands::run_migrate(command),
    };

    if let Err(error) = result {
        let code = error.exit_code();
        eprintln!("{}", render_runtime_error(error));
        std::process::exit(code);
    }
}
