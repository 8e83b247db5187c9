use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use ee::{VectorUnit, VuKind};

/// Partition a VU microprogram into basic blocks and report the block map
/// and content-cache statistics.
#[derive(Parser)]
#[clap(name = "vu-mu", version)]
struct Args {
    /// Raw little-endian microprogram image
    program: PathBuf,

    /// Target VU1 (16 KiB micro memory) instead of VU0 (4 KiB)
    #[clap(long)]
    vu1: bool,

    /// Entry address in hex bytes, 8-aligned
    #[clap(long, value_parser = parse_hex, default_value = "0")]
    entry: u32,

    /// After partitioning, dispatch from the entry with this cycle budget
    #[clap(long)]
    run: Option<u64>,
}

fn parse_hex(s: &str) -> Result<u32, std::num::ParseIntError> {
    u32::from_str_radix(s.trim_start_matches("0x"), 16)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let image = fs::read(&args.program)
        .with_context(|| format!("reading {}", args.program.display()))?;

    let kind = if args.vu1 { VuKind::Vu1 } else { VuKind::Vu0 };
    let mut unit = VectorUnit::new(kind);
    unit.load_program(0, &image)?;

    let blocks = unit.partition_reachable(args.entry);
    println!("{} reachable block(s) from {:#06x}:", blocks.len(), args.entry);
    for block in &blocks {
        let mut line = format!(
            "  [{:#06x}, {:#06x}] {} bytes",
            block.begin_address(),
            block.end_address(),
            block.end_address() - block.begin_address() + 4,
        );
        if block.is_linkable() {
            let links = unit.executor().directory().links_for(block.begin_address());
            if let Some(next) = links.next {
                line += &format!(" next={:#06x}", next);
            }
            if let Some(branch) = links.branch {
                line += &format!(" branch={:#06x}", branch);
            }
        } else {
            line += " (not linkable)";
        }
        println!("{}", line);
    }
    println!("{}", unit.executor().stats_line());

    if let Some(budget) = args.run {
        let state = unit.run(args.entry, budget);
        println!(
            "ran {} slot(s), pc={:#06x}, halted={}",
            state.cycle, state.pc, state.halted
        );
    }

    Ok(())
}
