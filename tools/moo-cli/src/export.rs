//! Export command - decode a .MOO file back into the JSON test format

use anyhow::{Context, Result};
use clap::Args;
use moo_format::{SourceTest, decode_document, to_source_test};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Arguments for the export command
#[derive(Args)]
pub struct ExportArgs {
    /// .MOO file to decode
    pub input: PathBuf,

    /// Output JSON file
    pub output: PathBuf,

    /// Indent the JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the export command
pub fn execute(args: ExportArgs) -> Result<()> {
    let data = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let document = decode_document(&data)
        .with_context(|| format!("Failed to decode {}", args.input.display()))?;

    let tests: Vec<SourceTest> = document.tests.iter().map(to_source_test).collect();

    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    if args.pretty {
        serde_json::to_writer_pretty(&mut writer, &tests)?;
    } else {
        serde_json::to_writer(&mut writer, &tests)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    tracing::info!(
        "Exported {} tests ({}) to {}",
        tests.len(),
        document.header.cpu_name,
        args.output.display()
    );
    Ok(())
}
