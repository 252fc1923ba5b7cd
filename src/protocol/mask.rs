//! Payload masking (RFC 6455 Section 5.3).
//!
//! Masking XORs every payload byte with `key[i % 4]`. The operation is its
//! own inverse, so the same functions mask outgoing and unmask incoming
//! payloads.

use crate::error::{Error, Result};

/// Length of a masking key in bytes.
pub const MASK_LEN: usize = 4;

/// Byte-by-byte XOR masking.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// Word-at-a-time XOR masking, equivalent to [`apply_mask`].
#[inline]
pub fn apply_mask_fast(data: &mut [u8], mask: [u8; 4]) {
    let mask_u32 = u32::from_ne_bytes(mask);
    let mut chunks = data.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let val = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&(val ^ mask_u32).to_ne_bytes());
    }
    // The remainder starts at a multiple of 4, so key alignment is preserved.
    for (i, byte) in chunks.into_remainder().iter_mut().enumerate() {
        *byte ^= mask[i];
    }
}

/// Convert a mask of arbitrary length into a key.
///
/// # Errors
///
/// Returns `Error::Protocol` unless `mask` is exactly 4 bytes long.
pub fn mask_key(mask: &[u8]) -> Result<[u8; 4]> {
    <[u8; MASK_LEN]>::try_from(mask).map_err(|_| {
        Error::Protocol(format!(
            "invalid mask length: {} (expected {MASK_LEN})",
            mask.len()
        ))
    })
}

/// Unmask `payload` in place. No-op when `mask` is `None`.
///
/// # Errors
///
/// Returns `Error::Protocol` if a mask is present but not 4 bytes long.
pub fn unmask(payload: &mut [u8], mask: Option<&[u8]>) -> Result<()> {
    if let Some(mask) = mask {
        apply_mask_fast(payload, mask_key(mask)?);
    }
    Ok(())
}
