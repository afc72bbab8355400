//! Key Hashing
//!
//! Every key is reduced to a 32-bit hash that is cached in the probe slot, so
//! most probe mismatches are rejected without touching the item pool.
//!
//! Two paths exist:
//!
//! - **Register-sized keys (up to 16 bytes)** are widened into a [`FastKey`] pair
//!   of `u64` halves. When the CPU advertises SSE 4.2 the hash is two chained
//!   CRC32 steps over the halves; otherwise a golden-ratio multiplicative mix
//!   is used. Keys shorter than 16 bytes are zero-padded first, so the hash
//!   never observes whatever the caller keeps past the key.
//! - **Wider keys** are folded 8 bytes at a time into a 64-bit accumulator,
//!   with a zero-extended tail, then reduced to 32 bits.
//!
//! CPU support is probed once per process and remembered in an atomic, so the
//! hot path pays a single relaxed load. Hashes are self-consistent within one
//! process image; they are not stable across builds or targets and are not
//! cryptographic.

#[cfg(target_arch = "x86_64")]
use core::sync::atomic::{AtomicU8, Ordering};

/// Knuth's 32-bit golden-ratio constant, used to seed the CRC32 chain.
#[cfg(target_arch = "x86_64")]
const GOLDEN32: u32 = 0x9E37_7989;

/// Knuth's 64-bit golden-ratio constant, used by the multiplicative mixers.
pub(crate) const GOLDEN64: u64 = 0x9E37_79B9_7F4A_7C15;

/// A key of up to 16 bytes, passed around as two `u64` halves.
///
/// On x86-64 a 16-byte struct travels in registers, so the fast lookup path
/// never spills the key to memory. Shorter keys occupy the low bytes of `v0`
/// (then `v1`) with the remainder zeroed.
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct FastKey {
    pub v0: u64,
    pub v1: u64,
}

/// A value of up to 16 bytes, the counterpart of [`FastKey`].
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct FastValue {
    pub v0: u64,
    pub v1: u64,
}

impl FastKey {
    /// Builds a key from its two halves.
    #[inline]
    pub const fn new(v0: u64, v1: u64) -> Self {
        Self { v0, v1 }
    }

    /// Widens up to 16 key bytes, zero-padding the remainder.
    ///
    /// # Panics
    ///
    /// Panics if `key` is longer than 16 bytes.
    #[inline]
    pub fn from_slice(key: &[u8]) -> Self {
        let mut buf = [0u8; 16];
        buf[..key.len()].copy_from_slice(key);
        Self::from_bytes(buf)
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let (lo, hi) = bytes.split_at(8);
        Self {
            v0: u64::from_ne_bytes(lo.try_into().unwrap()),
            v1: u64::from_ne_bytes(hi.try_into().unwrap()),
        }
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.v0.to_ne_bytes());
        bytes[8..].copy_from_slice(&self.v1.to_ne_bytes());
        bytes
    }
}

impl FastValue {
    /// Builds a value from its two halves.
    #[inline]
    pub const fn new(v0: u64, v1: u64) -> Self {
        Self { v0, v1 }
    }

    /// Widens up to 16 value bytes, zero-padding the remainder.
    ///
    /// # Panics
    ///
    /// Panics if `value` is longer than 16 bytes.
    #[inline]
    pub fn from_slice(value: &[u8]) -> Self {
        let mut buf = [0u8; 16];
        buf[..value.len()].copy_from_slice(value);
        Self::from_bytes(buf)
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let (lo, hi) = bytes.split_at(8);
        Self {
            v0: u64::from_ne_bytes(lo.try_into().unwrap()),
            v1: u64::from_ne_bytes(hi.try_into().unwrap()),
        }
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.v0.to_ne_bytes());
        bytes[8..].copy_from_slice(&self.v1.to_ne_bytes());
        bytes
    }
}

#[cfg(target_arch = "x86_64")]
const CRC_UNKNOWN: u8 = 0;
#[cfg(target_arch = "x86_64")]
const CRC_UNAVAILABLE: u8 = 1;
#[cfg(target_arch = "x86_64")]
const CRC_AVAILABLE: u8 = 2;

/// Process-wide CRC32 capability, probed lazily on first use.
#[cfg(target_arch = "x86_64")]
static CRC_SUPPORT: AtomicU8 = AtomicU8::new(CRC_UNKNOWN);

#[cfg(target_arch = "x86_64")]
#[inline]
fn crc32_supported() -> bool {
    match CRC_SUPPORT.load(Ordering::Relaxed) {
        CRC_UNKNOWN => {
            let available = detect_sse42();
            let state = if available {
                CRC_AVAILABLE
            } else {
                CRC_UNAVAILABLE
            };
            CRC_SUPPORT.store(state, Ordering::Relaxed);
            available
        }
        state => state == CRC_AVAILABLE,
    }
}

#[cfg(all(target_arch = "x86_64", feature = "std"))]
fn detect_sse42() -> bool {
    std::is_x86_feature_detected!("sse4.2")
}

#[cfg(all(target_arch = "x86_64", not(feature = "std")))]
fn detect_sse42() -> bool {
    cfg!(target_feature = "sse4.2")
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.2")]
unsafe fn fast_key_hash_crc(key: FastKey) -> u32 {
    use core::arch::x86_64::_mm_crc32_u64;

    let crc = _mm_crc32_u64(u64::from(GOLDEN32), key.v0);
    _mm_crc32_u64(crc, key.v1) as u32
}

#[inline]
fn fast_key_hash_soft(key: FastKey) -> u32 {
    let mut h = key.v0 ^ key.v1.wrapping_add(GOLDEN64);
    h = h.wrapping_mul(GOLDEN64);
    fold32(h)
}

/// Reduces a 64-bit mix to 32 bits, folding the high halves down.
#[inline]
fn fold32(mut h: u64) -> u32 {
    h ^= h >> 32;
    h ^= h >> 16;
    h as u32
}

/// Hashes a register-sized key.
///
/// Uses hardware CRC32 when the CPU supports SSE 4.2 and the capability probe
/// has run, the multiplicative mixer otherwise. Both are deterministic within
/// a process.
#[inline]
pub fn fast_key_hash(key: FastKey) -> u32 {
    #[cfg(target_arch = "x86_64")]
    {
        if crc32_supported() {
            // SAFETY: the sse4.2 capability probe above succeeded.
            return unsafe { fast_key_hash_crc(key) };
        }
    }
    fast_key_hash_soft(key)
}

/// Hashes a key wider than 16 bytes by folding 8-byte chunks.
///
/// The trailing 1..=7 bytes, if any, are zero-extended into a final chunk so
/// that every key byte participates.
pub fn wide_key_hash(key: &[u8]) -> u32 {
    let mut h = GOLDEN64.wrapping_add(key.len() as u64);
    let mut chunks = key.chunks_exact(8);
    for chunk in &mut chunks {
        h ^= u64::from_ne_bytes(chunk.try_into().unwrap());
        h = h.wrapping_mul(GOLDEN64);
    }
    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut buf = [0u8; 8];
        buf[..tail.len()].copy_from_slice(tail);
        h ^= u64::from_ne_bytes(buf);
        h = h.wrapping_mul(GOLDEN64);
    }
    fold32(h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_key_roundtrip() {
        let key = FastKey::new(0x0102_0304_0506_0708, 0x1112_1314_1516_1718);
        assert_eq!(FastKey::from_bytes(key.to_bytes()), key);
    }

    #[test]
    fn test_fast_key_from_slice_pads_with_zero() {
        let short = FastKey::from_slice(&[1, 2, 3]);
        let mut full = [0u8; 16];
        full[..3].copy_from_slice(&[1, 2, 3]);
        assert_eq!(short, FastKey::from_bytes(full));
        assert_eq!(fast_key_hash(short), fast_key_hash(FastKey::from_bytes(full)));
    }

    #[test]
    fn test_fast_key_hash_is_deterministic() {
        let key = FastKey::new(42, 99);
        assert_eq!(fast_key_hash(key), fast_key_hash(key));
        assert_eq!(fast_key_hash_soft(key), fast_key_hash_soft(key));
    }

    #[test]
    fn test_fast_key_hash_distinguishes_halves() {
        let a = FastKey::new(1, 0);
        let b = FastKey::new(0, 1);
        assert_ne!(fast_key_hash(a), fast_key_hash(b));
    }

    #[test]
    fn test_wide_key_hash_is_deterministic() {
        let key = [7u8; 24];
        assert_eq!(wide_key_hash(&key), wide_key_hash(&key));
    }

    #[test]
    fn test_wide_key_hash_uses_tail_bytes() {
        // 20-byte keys leave a 4-byte tail; changing it must change the hash.
        let mut a = [3u8; 20];
        let b = a;
        a[19] = 4;
        assert_ne!(wide_key_hash(&a), wide_key_hash(&b));
    }

    #[test]
    fn test_wide_key_hash_length_matters() {
        // Same leading bytes but different lengths must not collide by
        // construction of the length-seeded accumulator.
        let long = [0u8; 24];
        assert_ne!(wide_key_hash(&long[..17]), wide_key_hash(&long));
    }

    #[test]
    fn test_fast_value_roundtrip() {
        let value = FastValue::new(5, 6);
        assert_eq!(FastValue::from_bytes(value.to_bytes()), value);
        assert_eq!(FastValue::from_slice(&value.to_bytes()), value);
    }
}
