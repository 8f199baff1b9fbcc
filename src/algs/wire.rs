//! Fixed little-endian wire records for the collective exchanges.

use bytemuck::{Pod, Zeroable};

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// One signed 64-bit value, stored little-endian.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct WireI64 {
    pub v_le: i64,
}

impl WireI64 {
    pub fn new(v: i64) -> Self {
        Self { v_le: v.to_le() }
    }
    pub fn get(&self) -> i64 {
        i64::from_le(self.v_le)
    }
}

/// Decode one [`WireI64`] from an exact-length byte buffer.
pub fn decode_i64(bytes: &[u8]) -> Result<i64, String> {
    expect_exact_len(bytes.len(), std::mem::size_of::<WireI64>())?;
    let mut w = WireI64::default();
    cast_slice_mut(std::slice::from_mut(&mut w)).copy_from_slice(bytes);
    Ok(w.get())
}
