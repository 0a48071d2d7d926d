//! IDIR CLI - issue, revoke, reissue and verify course certificates.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod error;
mod output;

use commands::{canonicalize, history, import, init, issue, reissue, revoke, verify, Context};

#[derive(Parser)]
#[command(name = "idir")]
#[command(about = "IDIR certificate issuance and verification CLI")]
struct Cli {
    /// Configuration file (default: ./idir.toml when present)
    #[arg(long, global = true, env = "IDIR_CONFIG")]
    config: Option<PathBuf>,
    /// SQLite database path, overriding the configuration file
    #[arg(long, global = true, env = "IDIR_DATABASE")]
    database: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply migrations
    Init,
    /// Issue one certificate
    Issue(issue::IssueArgs),
    /// Issue certificates from a CSV file
    Import(import::ImportArgs),
    /// Verify a certificate and its payload hash
    Verify {
        /// Certificate ID
        certificate_id: String,
        /// Print the public verification answer instead of the operator view
        #[arg(long)]
        public: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Revoke a valid certificate
    Revoke {
        /// Certificate ID
        certificate_id: String,
        /// Reason recorded on the certificate and in the audit log
        #[arg(long)]
        reason: String,
        /// Operator email recorded in the audit log
        #[arg(long)]
        actor: Option<String>,
    },
    /// Supersede a valid certificate with a new one
    Reissue {
        /// Certificate ID
        certificate_id: String,
        /// Operator email recorded in the audit log
        #[arg(long)]
        actor: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the audit log of a certificate
    History {
        /// Certificate ID
        certificate_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show canonical bytes and SHA-256 for input JSON
    Canonicalize {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "idir=debug" } else { "idir=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Canonicalize { input } => canonicalize::run(input),
        command => Context::load(cli.config, cli.database).and_then(|ctx| match command {
            Commands::Init => init::run(&ctx),
            Commands::Issue(args) => issue::run(&ctx, args),
            Commands::Import(args) => import::run(&ctx, args),
            Commands::Verify {
                certificate_id,
                public,
                json,
            } => verify::run(&ctx, certificate_id, public, json),
            Commands::Revoke {
                certificate_id,
                reason,
                actor,
            } => revoke::run(&ctx, certificate_id, reason, actor),
            Commands::Reissue {
                certificate_id,
                actor,
                json,
            } => reissue::run(&ctx, certificate_id, actor, json),
            Commands::History {
                certificate_id,
                json,
            } => history::run(&ctx, certificate_id, json),
            Commands::Canonicalize { input } => canonicalize::run(input),
        }),
    };

    if let Err(e) = result {
        let category = error::classify(e.as_ref());
        eprintln!("Error: [{}] {}", category, e);
        std::process::exit(error::exit_code(category));
    }
}
