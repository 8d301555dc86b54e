//! `vxauth` command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{ArtifactKind, RoleArg};

#[derive(Parser)]
#[command(version, about = "VxAuth smart card and artifact signature tool")]
struct Cli {
    /// Only use a reader whose name contains this (overrides config)
    #[arg(short, long)]
    reader: Option<String>,

    /// Config file (default ~/.vxauth/vxauth.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available readers
    Readers,

    /// Follow the auth status as cards come and go
    Watch {
        /// Print statuses as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log in as a system administrator and program the next card inserted
    ProgramCard {
        /// Role to program
        #[arg(value_enum)]
        role: RoleArg,

        /// Election definition file, for election manager cards
        #[arg(long, required_if_eq("role", "election-manager"))]
        election_definition: Option<PathBuf>,
    },

    /// Log in as a system administrator and clear the next card inserted
    UnprogramCard,

    /// Sign an artifact and write its .vxsig file
    SignArtifact {
        /// Kind of artifact
        #[arg(value_enum)]
        kind: ArtifactKind,

        /// Ballot package file or cast vote record directory
        path: PathBuf,

        /// Machine private key (PKCS#8 PEM)
        #[arg(long)]
        key: PathBuf,

        /// Machine certificate (PEM)
        #[arg(long)]
        cert: PathBuf,

        /// Write the signature here instead of next to the artifact
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Flush to disk before exiting
        #[arg(long)]
        removable_media: bool,
    },

    /// Verify an artifact against a trust root
    VerifyArtifact {
        /// Kind of artifact
        #[arg(value_enum)]
        kind: ArtifactKind,

        /// Ballot package file or cast vote record directory
        path: PathBuf,

        /// Trust root certificate (PEM or DER)
        #[arg(long)]
        trust_root: PathBuf,

        /// Signature file, when not next to the artifact
        #[arg(long)]
        signature: Option<PathBuf>,
    },
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(reader) = cli.reader {
        config.reader.name = Some(reader);
    }

    match cli.command {
        Commands::Readers => commands::list_readers(),
        Commands::Watch { json } => commands::watch(&config, json),
        Commands::ProgramCard {
            role,
            election_definition,
        } => commands::program_card(&config, role, election_definition.as_deref()),
        Commands::UnprogramCard => commands::unprogram_card(&config),
        Commands::SignArtifact {
            kind,
            path,
            key,
            cert,
            output_dir,
            removable_media,
        } => commands::sign_artifact(kind, path, &key, &cert, output_dir, removable_media),
        Commands::VerifyArtifact {
            kind,
            path,
            trust_root,
            signature,
        } => commands::verify_artifact(kind, path, &trust_root, signature.as_deref()),
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_ansi(true)
        .init();
}
