//! CLI frontend for inspecting Matters snapshot files.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "matters",
    about = "Matters: inspect prototype-inherited assets and their links",
    version,
    propagate_version = true
)]
struct Cli {
    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a snapshot and report every integrity issue
    Check {
        /// Snapshot file (JSON)
        file: PathBuf,
    },

    /// List matters, optionally filtered
    List {
        /// Snapshot file (JSON)
        file: PathBuf,

        /// Resolved property condition: key=value, or key~regex
        #[arg(short, long = "where", value_name = "COND")]
        conditions: Vec<String>,

        /// Only matters without an owner
        #[arg(short, long)]
        standalone: bool,

        /// Only matters whose parent chain contains this id
        #[arg(short, long, value_name = "ID")]
        descends_from: Option<String>,
    },

    /// Show the resolved fields of a matter
    Show {
        /// Snapshot file (JSON)
        file: PathBuf,

        /// Matter id (or a unique prefix)
        id: String,
    },

    /// Print the link tree reachable from a matter
    Tree {
        /// Snapshot file (JSON)
        file: PathBuf,

        /// Matter id (or a unique prefix)
        id: String,

        /// Maximum depth to descend
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Remove a matter (dry run unless --write)
    Remove {
        /// Snapshot file (JSON)
        file: PathBuf,

        /// Matter id (or a unique prefix)
        id: String,

        /// Write the result back to the file
        #[arg(short, long)]
        write: bool,

        /// Refuse to remove matters that own others instead of cascading
        #[arg(long)]
        block_owners: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check { file } => commands::check::run(&file),
        Commands::List {
            file,
            conditions,
            standalone,
            descends_from,
        } => commands::list::run(&file, &conditions, standalone, descends_from.as_deref()),
        Commands::Show { file, id } => commands::show::run(&file, &id),
        Commands::Tree { file, id, depth } => commands::tree::run(&file, &id, depth),
        Commands::Remove {
            file,
            id,
            write,
            block_owners,
        } => commands::remove::run(&file, &id, write, block_owners),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
