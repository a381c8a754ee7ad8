//! Convert command - encode JSON test suites into .MOO files
//!
//! INPUT may be a single JSON file or a directory of `*.json` / `*.json.gz`
//! suites. For a directory, every suite is written to `OUTPUT/<name>.MOO`.

use anyhow::{Context, Result};
use clap::Args;
use flate2::read::GzDecoder;
use moo_format::{MooWriter, SourceOptions, normalize_tests, read_source_tests};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::MooConfig;

/// Arguments for the convert command
#[derive(Args)]
pub struct ConvertArgs {
    /// JSON test suite (optionally gzipped), or a directory of suites
    pub input: PathBuf,

    /// Output .MOO file, or output directory
    pub output: PathBuf,

    /// CPU name stored in the header, at most 4 ASCII characters (overrides config)
    #[arg(short, long)]
    pub cpu: Option<String>,

    /// Fail on unknown register names instead of dropping them
    #[arg(long)]
    pub strict: bool,

    /// Encode tests and files in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Path to moo.toml (defaults to ./moo.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// One input suite and where its .MOO file goes
#[derive(Debug, Clone, PartialEq, Eq)]
struct Job {
    input: PathBuf,
    output: PathBuf,
}

#[derive(Debug, Default, Clone, Copy)]
struct Summary {
    tests: usize,
    warnings: usize,
    bytes: usize,
}

/// Execute the convert command
pub fn execute(args: ConvertArgs) -> Result<()> {
    let config = MooConfig::resolve(args.config.as_deref())?;
    let cpu = args.cpu.unwrap_or(config.convert.cpu);
    let parallel = args.parallel || config.convert.parallel;
    let options = SourceOptions {
        strict_registers: args.strict || config.convert.strict,
    };

    // Validate the CPU name before any output is produced
    if cpu.is_empty() {
        anyhow::bail!("CPU name must not be empty");
    }
    let writer = MooWriter::new(&cpu)?.parallel(parallel);

    let jobs = plan_jobs(&args.input, &args.output)?;
    if args.input.is_dir() {
        std::fs::create_dir_all(&args.output).with_context(|| {
            format!("Failed to create output directory: {}", args.output.display())
        })?;
    }

    tracing::info!(
        "Converting {} suite(s) for CPU '{}'{}",
        jobs.len(),
        writer.cpu_name(),
        if parallel { " in parallel" } else { "" }
    );

    let summaries: Vec<Summary> = if parallel {
        jobs.par_iter()
            .map(|job| convert_file(job, &writer, &options))
            .collect::<Result<_>>()?
    } else {
        jobs.iter()
            .map(|job| convert_file(job, &writer, &options))
            .collect::<Result<_>>()?
    };

    let total = summaries.iter().fold(Summary::default(), |acc, s| Summary {
        tests: acc.tests + s.tests,
        warnings: acc.warnings + s.warnings,
        bytes: acc.bytes + s.bytes,
    });
    tracing::info!(
        "Converted {} tests in {} file(s), {} bytes written, {} warning(s)",
        total.tests,
        summaries.len(),
        total.bytes,
        total.warnings
    );
    Ok(())
}

/// Encode one suite; the whole file is built in memory before writing
fn convert_file(job: &Job, writer: &MooWriter, options: &SourceOptions) -> Result<Summary> {
    tracing::info!("Reading {}...", job.input.display());
    let file = File::open(&job.input)
        .with_context(|| format!("Failed to open {}", job.input.display()))?;
    let reader: Box<dyn Read> = if is_gzip(&job.input) {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    let source = read_source_tests(reader)
        .with_context(|| format!("Failed to parse {}", job.input.display()))?;

    let (records, warnings) = normalize_tests(&source, options)
        .with_context(|| format!("Failed to convert {}", job.input.display()))?;
    for warning in &warnings {
        tracing::warn!("{}: {}", job.input.display(), warning);
    }

    let bytes = writer.encode(&records)?;
    std::fs::write(&job.output, &bytes)
        .with_context(|| format!("Failed to write {}", job.output.display()))?;
    tracing::info!(
        "Wrote {} tests to {} ({} bytes)",
        records.len(),
        job.output.display(),
        bytes.len()
    );

    Ok(Summary {
        tests: records.len(),
        warnings: warnings.len(),
        bytes: bytes.len(),
    })
}

/// Pair every input suite with its output path
fn plan_jobs(input: &Path, output: &Path) -> Result<Vec<Job>> {
    if !input.is_dir() {
        let output = if output.is_dir() {
            output.join(moo_file_name(input))
        } else {
            output.to_path_buf()
        };
        return Ok(vec![Job {
            input: input.to_path_buf(),
            output,
        }]);
    }

    let mut jobs = Vec::new();
    for entry in WalkDir::new(input)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry =
            entry.with_context(|| format!("Failed to read directory: {}", input.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_suite(path) {
            continue;
        }
        jobs.push(Job {
            input: path.to_path_buf(),
            output: output.join(moo_file_name(path)),
        });
    }

    if jobs.is_empty() {
        anyhow::bail!(
            "No .json or .json.gz test suites found in {}",
            input.display()
        );
    }
    Ok(jobs)
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

fn is_suite(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.ends_with(".json") || name.ends_with(".json.gz")
}

/// `00.json` / `00.json.gz` -> `00.MOO`
fn moo_file_name(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tests".to_string());
    format!("{stem}.MOO")
}
