//! mempeek - inspect physical memory claimed by the host's region table.
//!
//! ```text
//! mempeek peek 1000:4        # read four words at 0x1000
//! mempeek regions            # list the region table
//! mempeek session            # configure/read commands from stdin
//! ```

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mempeek::logger::{level_for_verbosity, ConsoleLogger};
use mempeek::mm::{DevMem, DEFAULT_DEVICE};
use mempeek::region::{load_iomem, RegionTable, DEFAULT_IOMEM};
use mempeek::{AdminInterface, PeekService};

#[derive(Parser, Debug)]
#[command(
    name = "mempeek",
    version,
    about = "Read physical memory words from ranges claimed in the host's region table."
)]
struct Cli {
    /// Region listing to validate requests against
    #[arg(long, value_name = "PATH", default_value = DEFAULT_IOMEM)]
    iomem: PathBuf,

    /// Physical memory device to read from
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DEVICE)]
    mem: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Configure a request and read it once
    Peek {
        /// `<hex-address>[:<hex-length>]`, length in words
        request: String,
    },
    /// Print the region table
    Regions,
    /// Read commands from stdin: a request line configures, `read` reads
    Session,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ConsoleLogger::init(level_for_verbosity(cli.verbose)).context("installing logger")?;

    let regions = load_iomem(&cli.iomem)
        .with_context(|| format!("loading region table from {}", cli.iomem.display()))?;

    match cli.command {
        Command::Regions => print_regions(&regions),
        Command::Peek { request } => {
            let service = open_service(regions, &cli.mem)?;
            service.configure(&request)?;
            print!("{}", service.read()?);
            Ok(())
        }
        Command::Session => {
            let service = open_service(regions, &cli.mem)?;
            run_session(&service, io::stdin().lock(), io::stdout().lock())
        }
    }
}

fn open_service(regions: RegionTable, mem: &Path) -> Result<PeekService<DevMem>> {
    let device = DevMem::open(mem).with_context(|| format!("opening {}", mem.display()))?;
    Ok(PeekService::new(Arc::new(regions), device))
}

fn print_regions(regions: &RegionTable) -> Result<()> {
    let mut out = io::stdout().lock();
    for (depth, region) in regions.snapshot() {
        writeln!(
            out,
            "{:indent$}{:08x}-{:08x} : {} [{:?}]",
            "",
            region.start,
            region.end,
            region.label,
            region.flags,
            indent = depth * 2
        )?;
    }
    Ok(())
}

/// Serve one administrative session: every line is either `read`, `quit`
/// or a configuration string. Errors are reported and the session goes on.
fn run_session(
    shell: &impl AdminInterface,
    input: impl BufRead,
    mut out: impl Write,
) -> Result<()> {
    for line in input.lines() {
        let line = line.context("reading session input")?;
        let command = line.trim();

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "read" => match shell.read() {
                Ok(result) => write!(out, "{}", result)?,
                Err(err) => writeln!(out, "error: {}", err)?,
            },
            request => match shell.configure(request) {
                Ok(parsed) => writeln!(
                    out,
                    "ok: {} word(s) at {}",
                    parsed.words(),
                    parsed.address()
                )?,
                Err(err) => writeln!(out, "error: {}", err)?,
            },
        }
        out.flush()?;
    }
    Ok(())
}
