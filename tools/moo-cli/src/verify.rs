//! Verify command - compare a .MOO file against its JSON source
//!
//! The JSON suite is normalized exactly as `convert` would, the .MOO file is
//! decoded, and the two are compared test by test. The first difference is
//! reported as an error.

use anyhow::{Context, Result};
use clap::Args;
use moo_format::{
    CpuState, Register, SourceOptions, StateRole, TestRecord, decode_document, normalize_tests,
    read_source_tests,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// Arguments for the verify command
#[derive(Args)]
pub struct VerifyArgs {
    /// JSON test suite
    pub json: PathBuf,

    /// .MOO file built from it
    pub moo: PathBuf,

    /// Expected CPU name in the header
    #[arg(short, long)]
    pub cpu: Option<String>,

    /// Normalize the JSON with strict register checking
    #[arg(long)]
    pub strict: bool,
}

/// Execute the verify command
pub fn execute(args: VerifyArgs) -> Result<()> {
    let file = File::open(&args.json)
        .with_context(|| format!("Failed to open {}", args.json.display()))?;
    let source = read_source_tests(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", args.json.display()))?;
    let options = SourceOptions {
        strict_registers: args.strict,
    };
    let (expected, warnings) = normalize_tests(&source, &options)?;
    for warning in &warnings {
        tracing::warn!("{}: {}", args.json.display(), warning);
    }

    let data = std::fs::read(&args.moo)
        .with_context(|| format!("Failed to read {}", args.moo.display()))?;
    let document = decode_document(&data)
        .with_context(|| format!("Failed to decode {}", args.moo.display()))?;

    if let Some(cpu) = &args.cpu {
        let actual = document.header.cpu_name.to_string();
        if &actual != cpu {
            anyhow::bail!("CPU name mismatch: expected '{}', found '{}'", cpu, actual);
        }
    }

    if document.header.test_count as usize != expected.len() {
        anyhow::bail!(
            "Test count mismatch: {} has {} tests, {} declares {}",
            args.json.display(),
            expected.len(),
            args.moo.display(),
            document.header.test_count
        );
    }

    for (position, (want, got)) in expected.iter().zip(&document.tests).enumerate() {
        if let Some(field) = record_difference(want, got) {
            anyhow::bail!(
                "Test #{} (idx {}) differs in {}",
                position,
                want.index,
                field
            );
        }
    }

    tracing::info!(
        "{} matches {} ({} tests)",
        args.moo.display(),
        args.json.display(),
        expected.len()
    );
    Ok(())
}

/// Describe the first field where two records differ
fn record_difference(expected: &TestRecord, actual: &TestRecord) -> Option<String> {
    if expected.index != actual.index {
        return Some(format!("index ({} != {})", expected.index, actual.index));
    }
    if expected.name != actual.name {
        return Some(format!("name ({:?} != {:?})", expected.name, actual.name));
    }
    if expected.instruction_bytes != actual.instruction_bytes {
        return Some(format!(
            "bytes ({:02X?} != {:02X?})",
            expected.instruction_bytes, actual.instruction_bytes
        ));
    }
    for role in [StateRole::Initial, StateRole::Final] {
        if let Some(field) = state_difference(expected.state(role), actual.state(role)) {
            return Some(format!("{role} {field}"));
        }
    }
    if expected.cycles.len() != actual.cycles.len() {
        return Some(format!(
            "cycle count ({} != {})",
            expected.cycles.len(),
            actual.cycles.len()
        ));
    }
    if let Some(i) = expected
        .cycles
        .iter()
        .zip(&actual.cycles)
        .position(|(a, b)| a != b)
    {
        return Some(format!(
            "cycle {} ({:?} != {:?})",
            i, expected.cycles[i], actual.cycles[i]
        ));
    }
    if expected.hash != actual.hash {
        return Some("hash".to_string());
    }
    None
}

fn state_difference(expected: &CpuState, actual: &CpuState) -> Option<String> {
    for reg in Register::ALL {
        let (want, got) = (expected.registers.get(reg), actual.registers.get(reg));
        if want != got {
            return Some(format!("register {reg} ({want:04X?} != {got:04X?})"));
        }
    }
    if expected.ram != actual.ram {
        return Some("ram".to_string());
    }
    if expected.queue != actual.queue {
        return Some(format!(
            "queue ({:02X?} != {:02X?})",
            expected.queue, actual.queue
        ));
    }
    None
}
