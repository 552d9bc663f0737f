//! memscope command-line entry point.
//!
//! Loads the configuration, connects to the debug agent, runs one subcommand
//! through a [`Debugger`] session, then sends the agent a disconnect.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML file or defaults, CLI overrides on top
//!  └─ TcpTransport::connect()  -- blocking socket to the agent
//!  └─ Debugger::new()          -- protocol engine over the socket
//!  └─ run(command)             -- one subcommand
//!  └─ Debugger::disconnect()
//! ```
//!
//! # Logging (for beginners)
//!
//! Log output goes to stderr so that command output on stdout can be piped.
//! `RUST_LOG=debug memscope regions` shows every request and response; without
//! `RUST_LOG` the `log_level` from the config file is used.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use memscope_client::application::{
    debugger::Debugger,
    dump::{dump_mem, dump_regions},
    scan::{dumpable_regions, parse_hex_pattern, scan_regions},
};
use memscope_client::infrastructure::{
    network::TcpTransport,
    storage::config::{load_config, AppConfig},
};
use memscope_core::MemoryRegion;

/// Inspect and modify the memory of a process through a remote debug agent.
#[derive(Debug, Parser)]
#[command(name = "memscope", version, about)]
struct Cli {
    /// Configuration file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Agent host, overriding the configuration.
    #[arg(long, global = true)]
    host: Option<String>,

    /// Agent port, overriding the configuration.
    #[arg(long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Show the agent's execution state.
    Status,
    /// List the process ids known to the agent.
    Pids,
    /// Show the pid of the process currently running on the target.
    CurrentPid,
    /// Show a process's title id.
    TitleId {
        /// Defaults to the current process.
        #[arg(long, value_parser = parse_number)]
        pid: Option<u64>,
    },
    /// Attach the agent to a process.
    Attach {
        /// Defaults to the current process.
        #[arg(value_parser = parse_number)]
        pid: Option<u64>,
    },
    /// Detach from the attached process.
    Detach,
    /// Pause the attached process.
    Pause,
    /// Resume the attached process.
    Resume,
    /// Enumerate memory regions.
    Regions {
        #[arg(long, default_value = "0", value_parser = parse_number)]
        start: u64,
        #[arg(long)]
        max_count: Option<u32>,
    },
    /// Show the region containing an address.
    Query {
        #[arg(value_parser = parse_number)]
        addr: u64,
    },
    /// Read an integer of 1, 2, 4 or 8 bytes.
    Peek {
        #[arg(value_parser = parse_number)]
        addr: u64,
        #[arg(long, default_value_t = 4, value_parser = parse_width)]
        width: usize,
    },
    /// Write an integer of 1, 2, 4 or 8 bytes.
    Poke {
        #[arg(value_parser = parse_number)]
        addr: u64,
        #[arg(value_parser = parse_number)]
        value: u64,
        #[arg(long, default_value_t = 4, value_parser = parse_width)]
        width: usize,
    },
    /// Read a memory range, printing a hex dump or writing it to a file.
    Read {
        #[arg(value_parser = parse_number)]
        addr: u64,
        #[arg(value_parser = parse_number)]
        size: u64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Dump every readable region of the current process to disk.
    DumpRegions {
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long)]
        include_heap: bool,
    },
    /// Search the current process's readable memory for a hex byte pattern.
    Scan {
        pattern: String,
        #[arg(long)]
        include_heap: bool,
    },
}

/// Accepts decimal or `0x`-prefixed hexadecimal.
fn parse_number(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => text.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid number {text:?}: {e}"))
}

fn parse_width(text: &str) -> Result<usize, String> {
    match text.parse::<usize>() {
        Ok(w @ (1 | 2 | 4 | 8)) => Ok(w),
        _ => Err(format!("width must be 1, 2, 4 or 8, got {text:?}")),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("loading configuration")?;
    if let Some(host) = &cli.host {
        config.agent.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.agent.port = port;
    }

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let transport = TcpTransport::connect(&config.agent)?;
    let debugger = Debugger::new(transport);

    let outcome = run(&debugger, &config, cli.command);

    match debugger.disconnect() {
        Ok(code) if code.failed() => warn!(%code, "agent rejected disconnect"),
        Ok(_) => info!("disconnected"),
        Err(e) => warn!("disconnect failed: {e}"),
    }
    outcome
}

fn run(debugger: &Debugger<TcpTransport>, config: &AppConfig, command: Cmd) -> anyhow::Result<()> {
    match command {
        Cmd::Status => println!("{:?}", debugger.get_status()?),
        Cmd::Pids => {
            for pid in debugger.get_pids()? {
                println!("{pid:#x}");
            }
        }
        Cmd::CurrentPid => println!("{:#x}", debugger.get_current_pid()?),
        Cmd::TitleId { pid } => {
            let title_id = match pid {
                Some(pid) => debugger.get_title_id(pid)?,
                None => debugger.get_current_title_id()?,
            };
            println!("{title_id:016x}");
        }
        Cmd::Attach { pid } => {
            let pid = match pid {
                Some(pid) => pid,
                None => current_pid(debugger)?,
            };
            report("attach", debugger.attach(pid)?)?;
        }
        Cmd::Detach => report("detach", debugger.detach()?)?,
        Cmd::Pause => report("pause", debugger.pause()?)?,
        Cmd::Resume => report("resume", debugger.resume()?)?,
        Cmd::Regions { start, max_count } => {
            let max_count = max_count.unwrap_or(config.dump.max_regions);
            for region in debugger.query_multi(start, max_count)? {
                println!("{region}");
            }
        }
        Cmd::Query { addr } => println!("{}", debugger.query(addr)?),
        Cmd::Peek { addr, width } => {
            let value = debugger.peek(addr, width)?;
            println!("{value:#0w$x}", w = width * 2 + 2);
        }
        Cmd::Poke { addr, value, width } => {
            let max = if width == 8 { u64::MAX } else { (1u64 << (width * 8)) - 1 };
            if value > max {
                bail!("value {value:#x} does not fit in {width} bytes");
            }
            match width {
                1 => debugger.poke8(addr, value as u8)?,
                2 => debugger.poke16(addr, value as u16)?,
                4 => debugger.poke32(addr, value as u32)?,
                _ => debugger.poke64(addr, value)?,
            }
        }
        Cmd::Read { addr, size, output } => {
            let size = u32::try_from(size).context("read size exceeds 32 bits")?;
            match output {
                Some(path) => dump_mem(debugger, addr, size, &path)?,
                None => print_hex_dump(addr, &debugger.read_mem(addr, size)?),
            }
        }
        Cmd::DumpRegions { out_dir, include_heap } => {
            let include_heap = include_heap || config.dump.include_heap;
            let regions = attached_regions(debugger, config, include_heap)?;
            let out_dir = out_dir.unwrap_or_else(|| config.dump.out_dir.clone());
            for path in dump_regions(debugger, &regions, &out_dir)? {
                println!("{}", path.display());
            }
            report("detach", debugger.detach()?)?;
        }
        Cmd::Scan { pattern, include_heap } => {
            let Some(pattern) = parse_hex_pattern(&pattern) else {
                bail!("pattern must be an even number of hex digits");
            };
            let include_heap = include_heap || config.dump.include_heap;
            let regions = attached_regions(debugger, config, include_heap)?;
            for addr in scan_regions(debugger, &regions, &pattern)? {
                println!("{addr:#x}");
            }
            report("detach", debugger.detach()?)?;
        }
    }
    Ok(())
}

fn current_pid(debugger: &Debugger<TcpTransport>) -> anyhow::Result<u64> {
    match debugger.get_current_pid()? {
        0 => bail!("no process is currently running on the target"),
        pid => Ok(pid),
    }
}

fn report(action: &str, code: memscope_core::ResultCode) -> anyhow::Result<()> {
    if code.failed() {
        bail!("{action} failed: {code} ({})", code.error_code());
    }
    println!("{action}: ok");
    Ok(())
}

/// Attaches to the current process and returns its dumpable regions.
fn attached_regions(
    debugger: &Debugger<TcpTransport>,
    config: &AppConfig,
    include_heap: bool,
) -> anyhow::Result<Vec<MemoryRegion>> {
    let pid = current_pid(debugger)?;
    report("attach", debugger.attach(pid)?)?;

    let regions = debugger.query_multi(0, config.dump.max_regions)?;
    let selected = dumpable_regions(&regions, include_heap);
    info!(pid, total = regions.len(), selected = selected.len(), "regions selected");
    Ok(selected)
}

fn print_hex_dump(base: u64, data: &[u8]) {
    for (i, line) in data.chunks(16).enumerate() {
        let hex: Vec<String> = line.iter().map(|b| format!("{b:02x}")).collect();
        let ascii: String = line
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        println!("{:016x}  {:<47}  {ascii}", base + (i * 16) as u64, hex.join(" "));
    }
}
