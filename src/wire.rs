//! Byte-level view of halo payloads.
//!
//! The communicator moves opaque byte slices; the grid stores `f64` cells.
//! Outgoing payloads are zero-copy `Pod` casts. Incoming payloads arrive as
//! plain byte vectors with no alignment guarantee, so they are gathered back
//! into scalars with a copying collect.

use bytemuck::Pod;

/// Cell scalars as wire bytes.
pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Mutable cell scalars as wire bytes.
pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// Gather a received byte payload back into scalars.
pub fn collect_scalars<T: Pod>(bytes: &[u8]) -> Vec<T> {
    bytemuck::pod_collect_to_vec(bytes)
}

/// Check a received payload against the length the protocol posted for it.
pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}
