//! Memory dumps: region contents written to disk.
//!
//! Each dumped region lands in its own file named after its start address,
//! `{address:08x}.dmp` (lower-case hex, zero-padded to 8 digits), so a
//! directory of dumps sorts in address order.

use std::fs;
use std::path::{Path, PathBuf};

use memscope_core::{MemoryRegion, Transport};
use tracing::{debug, info};

use super::debugger::{Debugger, DebuggerError};

/// File name used for a dump of memory starting at `addr`.
pub fn dump_file_name(addr: u64) -> String {
    format!("{addr:08x}.dmp")
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), DebuggerError> {
    fs::write(path, data).map_err(|source| DebuggerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads `size` bytes at `addr` and writes them to `path`.
///
/// Nothing is written if the read fails.
pub fn dump_mem<T: Transport>(
    debugger: &Debugger<T>,
    addr: u64,
    size: u32,
    path: &Path,
) -> Result<(), DebuggerError> {
    let data = debugger.read_mem(addr, size)?;
    write_file(path, &data)?;
    debug!(addr = format_args!("{addr:#x}"), size, path = %path.display(), "dumped");
    Ok(())
}

/// Dumps every region in `regions` into `out_dir`, creating it if needed.
///
/// Stops at the first region that cannot be read or written and returns the
/// paths of the files written so far on success.
pub fn dump_regions<T: Transport>(
    debugger: &Debugger<T>,
    regions: &[MemoryRegion],
    out_dir: &Path,
) -> Result<Vec<PathBuf>, DebuggerError> {
    fs::create_dir_all(out_dir).map_err(|source| DebuggerError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(regions.len());
    for region in regions {
        let path = out_dir.join(dump_file_name(region.address()));
        let data = debugger.read_region(region)?;
        write_file(&path, &data)?;
        debug!(%region, path = %path.display(), "dumped region");
        written.push(path);
    }

    info!(count = written.len(), dir = %out_dir.display(), "region dump complete");
    Ok(written)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::env;
    use std::process;

    use memscope_core::transport::mock::ScriptedTransport;

    use super::*;

    /// A scratch directory unique to this test process and `name`.
    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("memscope-dump-{}-{name}", process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn push_read_response(script: &ScriptedTransport, data: &[u8]) {
        script
            .push_result(0)
            .push_result(0)
            .push_raw_chunk(data)
            .push_result(0);
    }

    #[test]
    fn test_dump_file_name_is_padded_lower_hex() {
        assert_eq!(dump_file_name(0xABC), "00000abc.dmp");
        assert_eq!(dump_file_name(0x0071_0000_0000), "7100000000.dmp");
    }

    #[test]
    fn test_dump_mem_writes_exact_bytes() {
        // Arrange
        let dir = scratch_dir("single");
        fs::create_dir_all(&dir).unwrap();
        let script = ScriptedTransport::new();
        push_read_response(&script, &[1, 2, 3, 4]);
        let debugger = Debugger::new(script);
        let path = dir.join("out.bin");

        // Act
        dump_mem(&debugger, 0x1000, 4, &path).unwrap();

        // Assert
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3, 4]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_dump_mem_failed_read_writes_nothing() {
        let dir = scratch_dir("failed");
        fs::create_dir_all(&dir).unwrap();
        let script = ScriptedTransport::new();
        script.push_result(2 | (101 << 9)).push_result(0);
        let debugger = Debugger::new(script);
        let path = dir.join("out.bin");

        let err = dump_mem(&debugger, 0x1000, 4, &path).unwrap_err();

        assert!(matches!(err, DebuggerError::Agent { .. }));
        assert!(!path.exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_dump_regions_creates_one_file_per_region() {
        // Arrange
        let dir = scratch_dir("regions").join("nested");
        let script = ScriptedTransport::new();
        push_read_response(&script, &[0xAA; 4]);
        push_read_response(&script, &[0xBB; 2]);
        let debugger = Debugger::new(script);
        let regions = [
            MemoryRegion::from_raw(0x1000, 4, 0x02, 1).unwrap(),
            MemoryRegion::from_raw(0x2000, 2, 0x05, 3).unwrap(),
        ];

        // Act
        let paths = dump_regions(&debugger, &regions, &dir).unwrap();

        // Assert
        assert_eq!(
            paths,
            vec![dir.join("00001000.dmp"), dir.join("00002000.dmp")]
        );
        assert_eq!(fs::read(&paths[0]).unwrap(), vec![0xAA; 4]);
        assert_eq!(fs::read(&paths[1]).unwrap(), vec![0xBB; 2]);
        fs::remove_dir_all(dir.parent().unwrap()).unwrap();
    }
}
