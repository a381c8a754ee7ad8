//! Dump command - print the contents of a .MOO file
//!
//! Shows the header, then for each test its name, instruction bytes, both
//! CPU states, the cycle table and the hash.

use anyhow::{Context, Result};
use clap::Args;
use moo_format::{CpuState, CycleEntry, MooHeader, MooReader, StateRole, TestRecord};
use std::fmt::{self, Write as _};
use std::path::PathBuf;

/// RAM entries listed per state before the list is cut short
const MAX_RAM_LINES: usize = 1000;

/// Queue bytes listed per state before the list is cut short
const MAX_QUEUE_BYTES: usize = 32;

/// Arguments for the dump command
#[derive(Args)]
pub struct DumpArgs {
    /// .MOO file to print
    pub file: PathBuf,

    /// Stop after this many tests
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Only print the test at this position in the file
    #[arg(short, long)]
    pub index: Option<usize>,
}

/// Execute the dump command
pub fn execute(args: DumpArgs) -> Result<()> {
    let data = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let mut reader = MooReader::new(&data)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;

    print!("{}", format_header(reader.header()));

    let skip = args.index.unwrap_or(0);
    let take = match args.index {
        Some(_) => 1,
        None => args.limit.unwrap_or(usize::MAX),
    };

    for _ in 0..skip {
        match reader.next() {
            Some(result) => {
                result?;
            }
            None => anyhow::bail!("{} has no test at position {}", args.file.display(), skip),
        }
    }

    let mut printed = 0;
    while printed < take {
        let start = reader.position();
        let Some(test) = reader.next() else {
            break;
        };
        let test = test.with_context(|| format!("Failed to decode test at offset {start:#x}"))?;
        // Payload size, without the 8-byte frame header
        let size = reader.position() - start - 8;
        print!("{}", format_test(&test, size)?);
        printed += 1;
    }

    if args.index.is_some() && printed == 0 {
        anyhow::bail!("{} has no test at position {}", args.file.display(), skip);
    }
    Ok(())
}

fn format_header(header: &MooHeader) -> String {
    format!(
        "File MOO Chunk:\n  Version: {}\n  Test Count: {}\n  CPU type: {}\n",
        header.version, header.test_count, header.cpu_name
    )
}

fn format_test(test: &TestRecord, size: usize) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "\n==== Test #{} ({} bytes) ====", test.index, size)?;
    writeln!(out, "Name: \"{}\"", test.name)?;
    writeln!(
        out,
        "Bytes ({}): [ {}]",
        test.instruction_bytes.len(),
        hex_list(&test.instruction_bytes)
    )?;
    format_state(&mut out, StateRole::Initial, &test.initial_state)?;
    format_state(&mut out, StateRole::Final, &test.final_state)?;
    format_cycles(&mut out, &test.cycles)?;
    if let Some(hash) = &test.hash {
        let digest: String = hash.iter().map(|b| format!("{b:02X}")).collect();
        writeln!(out, "Hash: {digest}")?;
    }
    Ok(out)
}

fn format_state(out: &mut String, role: StateRole, state: &CpuState) -> fmt::Result {
    let label = match role {
        StateRole::Initial => "Initial",
        StateRole::Final => "Final",
    };
    writeln!(out, "{label} CPU State:")?;

    writeln!(out, "  Registers:")?;
    for (reg, value) in state.registers.iter() {
        writeln!(out, "    {:<5} = {value:04X} ({value})", reg.name())?;
    }

    if state.ram.is_empty() {
        writeln!(out, "  RAM entries: 0 (empty)")?;
    } else {
        writeln!(out, "  RAM entries: {}", state.ram.len())?;
        for entry in state.ram.iter().take(MAX_RAM_LINES) {
            writeln!(
                out,
                "    {:05X} = {:02X} ({})",
                entry.address, entry.value, entry.value
            )?;
        }
        if state.ram.len() > MAX_RAM_LINES {
            writeln!(out, "    ... (truncated)")?;
        }
    }

    writeln!(out, "  Queue length: {}", state.queue.len())?;
    let shown = &state.queue[..state.queue.len().min(MAX_QUEUE_BYTES)];
    let more = if state.queue.len() > MAX_QUEUE_BYTES {
        "... "
    } else {
        ""
    };
    writeln!(out, "  Queue bytes: [ {}{more}]", hex_list(shown))
}

fn format_cycles(out: &mut String, cycles: &[CycleEntry]) -> fmt::Result {
    writeln!(out, "Cycles count: {}", cycles.len())?;
    writeln!(
        out,
        "{:>5} {:>3} {:>5} {:>3} {:>3} {:>3} {:>3} {:>4} {:>7} {:>4} {:>4} {:>2}",
        "Idx", "Pin", "Addr", "Seg", "Mem", "Io", "BHE", "Data", "Bus", "T", "Qop", "Qb"
    )?;
    writeln!(
        out,
        "{:>5} {:>3} {:>5} {:>3} {:>3} {:>3} {:>3} {:>4} {:>7} {:>4} {:>4} {:>2}",
        "---", "---", "-----", "---", "---", "---", "---", "----", "----", "--", "---", "--"
    )?;
    for (i, cycle) in cycles.iter().enumerate() {
        writeln!(
            out,
            "{:>5} {:03X} {:05X} {:>3} {:>3} {:>3} {:>3X} {:>4} {:>7} {:>4} {:>4} {:02X}",
            i,
            cycle.pins,
            cycle.address,
            cycle.segment,
            cycle.memory,
            cycle.io,
            cycle.bhe,
            format!("{:02X}", cycle.data),
            cycle.bus,
            cycle.t_state,
            cycle.queue_op,
            cycle.queue_byte
        )?;
    }
    Ok(())
}

/// `01 D8 ` style byte list
fn hex_list(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X} ")).collect()
}
