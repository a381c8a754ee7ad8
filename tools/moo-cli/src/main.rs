//! moo - MOO CPU test file tool
//!
//! # Commands
//!
//! - `moo convert` - Encode JSON test suites into .MOO files
//! - `moo dump` - Print the contents of a .MOO file
//! - `moo export` - Decode a .MOO file back into JSON
//! - `moo verify` - Check a .MOO file against its JSON source
//!
//! # Usage
//!
//! ```bash
//! # Convert a whole directory of JSON suites
//! moo convert v1/ moo/ --cpu 8088
//!
//! # Show the first two tests
//! moo dump moo/00.MOO --limit 2
//! ```
//!
//! # Configuration (moo.toml)
//!
//! ```toml
//! [convert]
//! cpu = "8088"
//! strict = false
//! parallel = true
//! ```

mod config;
mod convert;
mod dump;
mod export;
mod verify;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// moo - MOO CPU test file tool
#[derive(Parser)]
#[command(name = "moo")]
#[command(about = "Convert, inspect and verify MOO CPU test files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode JSON test suites into .MOO files
    Convert(convert::ConvertArgs),

    /// Print the header, tests and cycle tables of a .MOO file
    Dump(dump::DumpArgs),

    /// Decode a .MOO file back into the JSON test format
    Export(export::ExportArgs),

    /// Compare a .MOO file against the JSON suite it was built from
    Verify(verify::VerifyArgs),
}

fn main() -> Result<()> {
    // Logs go to stderr so dump output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert(args) => convert::execute(args),
        Commands::Dump(args) => dump::execute(args),
        Commands::Export(args) => export::execute(args),
        Commands::Verify(args) => verify::execute(args),
    }
}
