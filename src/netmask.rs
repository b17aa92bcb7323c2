//! Prefix length to packed netmask conversion.

use crate::error::{Error, Result};
use crate::family::AddressFamily;

/// Build a contiguous big-endian netmask of `prefix_len` leading one bits.
///
/// `prefix_len` must be in `1..=32` for IPv4 and `1..=128` for IPv6. A zero
/// length has no mask representation here; callers wanting a default route
/// must handle it before asking for a mask.
pub fn build(family: AddressFamily, prefix_len: u8) -> Result<Vec<u8>> {
    let max = family
        .max_prefix_len()
        .ok_or(Error::UnsupportedFamily(family))?;

    if prefix_len == 0 || prefix_len > max {
        return Err(Error::precondition(format!(
            "invalid {} prefix length {} (expected 1..={})",
            family, prefix_len, max
        )));
    }

    let q = (prefix_len / 8) as usize;
    let r = prefix_len % 8;

    let mut mask = vec![0u8; max as usize / 8];
    mask[..q].fill(0xFF);
    if r > 0 {
        mask[q] = ((0xFF00u16 >> r) & 0xFF) as u8;
    }

    Ok(mask)
}
