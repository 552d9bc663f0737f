//! Pattern scanning over a process's readable memory.
//!
//! A scan has two steps:
//!
//! 1. [`dumpable_regions`] filters an enumeration down to regions that are
//!    mapped, readable and (optionally) not heap.
//! 2. [`scan_regions`] reads each of those regions in full and records the
//!    address of the first occurrence of the pattern inside it.
//!
//! Only the first match per region is reported.  Matches that straddle two
//! regions are not found because each region is searched on its own.

use memscope_core::{MemoryRegion, MemoryType, Transport};
use tracing::{debug, info};

use super::debugger::{Debugger, DebuggerError};

/// Regions worth reading: mapped, not reserved, readable, and heap only when
/// `include_heap` is set.
pub fn dumpable_regions(regions: &[MemoryRegion], include_heap: bool) -> Vec<MemoryRegion> {
    regions
        .iter()
        .filter(|r| !matches!(r.memory_type(), MemoryType::Unmapped | MemoryType::Reserved))
        .filter(|r| r.readable())
        .filter(|r| include_heap || r.memory_type() != MemoryType::Heap)
        .copied()
        .collect()
}

/// Index of the first occurrence of `needle` in `haystack`.
///
/// An empty needle never matches.
pub fn find_pattern(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Reads each region and returns the absolute address of the first match of
/// `pattern` in every region that contains it, in region order.
pub fn scan_regions<T: Transport>(
    debugger: &Debugger<T>,
    regions: &[MemoryRegion],
    pattern: &[u8],
) -> Result<Vec<u64>, DebuggerError> {
    if pattern.is_empty() {
        return Ok(Vec::new());
    }

    let mut hits = Vec::new();
    for region in regions {
        let data = debugger.read_region(region)?;
        if let Some(offset) = find_pattern(&data, pattern) {
            let addr = region.address() + offset as u64;
            debug!(%region, addr = format_args!("{addr:#x}"), "pattern found");
            hits.push(addr);
        }
    }

    info!(scanned = regions.len(), hits = hits.len(), "scan complete");
    Ok(hits)
}

/// Parses a hex byte string such as `"DEADbeef"` or `"de ad be ef"`.
///
/// Returns `None` for an odd number of digits or any non-hex character.
pub fn parse_hex_pattern(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(s, 16).ok()
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
