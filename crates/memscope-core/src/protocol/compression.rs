//! Run-length decoding for bulk-read chunks.
//!
//! Bulk reads arrive as a series of *chunks*.  Each chunk is either raw bytes
//! or a run-length encoded body of `(value, count)` byte pairs:
//!
//! ```text
//! flag == 0:  [flag:1][decompressed_len:4][raw bytes × decompressed_len]
//! flag != 0:  [flag:1][decompressed_len:4][compressed_len:4][(value, count) × compressed_len/2]
//! ```
//!
//! Decoding `AA 03 BB 02` yields `AA AA AA BB BB`.  A run with `count == 0`
//! contributes nothing.  Since each pair is exactly two bytes, an odd
//! compressed length cannot be a valid body and is rejected.

use super::codec::ProtocolError;

/// Expands a run-length body of `(value, count)` pairs.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedChunk`] if `pairs` has an odd length.
///
/// # Examples
///
/// ```rust
/// use memscope_core::protocol::compression::decode_run_length;
///
/// let out = decode_run_length(&[0xAA, 3, 0xBB, 2]).unwrap();
/// assert_eq!(out, vec![0xAA, 0xAA, 0xAA, 0xBB, 0xBB]);
/// ```
pub fn decode_run_length(pairs: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if pairs.len() % 2 != 0 {
        return Err(ProtocolError::MalformedChunk(format!(
            "compressed body of {} bytes has a trailing unpaired byte",
            pairs.len()
        )));
    }

    let total: usize = pairs.chunks_exact(2).map(|pair| usize::from(pair[1])).sum();
    let mut out = Vec::with_capacity(total);
    for pair in pairs.chunks_exact(2) {
        let (value, count) = (pair[0], usize::from(pair[1]));
        out.resize(out.len() + count, value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_runs_expand_in_order() {
        let out = decode_run_length(&[0xAA, 3, 0xBB, 2]).unwrap();
        assert_eq!(out, vec![0xAA, 0xAA, 0xAA, 0xBB, 0xBB]);
    }

    #[test]
    fn test_zero_count_run_appends_nothing() {
        let out = decode_run_length(&[0x11, 0, 0x22, 1, 0x33, 0]).unwrap();
        assert_eq!(out, vec![0x22]);
    }

    #[test]
    fn test_empty_body_decodes_to_empty() {
        assert!(decode_run_length(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_max_count_run() {
        let out = decode_run_length(&[0x7F, 0xFF]).unwrap();
        assert_eq!(out.len(), 255);
        assert!(out.iter().all(|&b| b == 0x7F));
    }

    #[test]
    fn test_odd_length_body_is_rejected() {
        let err = decode_run_length(&[0xAA, 3, 0xBB]).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedChunk(_)));
    }
}
