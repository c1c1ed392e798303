//! QMCv1 StaticMap: a position-indexed XOR keystream built from a fixed,
//! 65,535-byte lookup table (first 32,768 bytes + remaining 32,767 bytes,
//! repeating). `OldStaticMap` is the legacy 256-byte formula used when the
//! lookup table isn't available.

use std::sync::{Arc, OnceLock};

const FIRST_SEGMENT_LEN: usize = 32_768;
const REMAINING_SEGMENT_LEN: usize = 32_767;

/// The QMCv1 keystream table. The authentic bytes are a proprietary
/// reverse-engineered asset shipped with the reference implementation and are
/// not available in this build; see the module-level note below for what's
/// shipped instead.
struct Segments {
    first: Vec<u8>,
    remaining: Vec<u8>,
}

/// NOT the authentic Tencent keystream table. The real asset is a
/// reverse-engineered binary bundled with the reference client and wasn't
/// available to this implementation. This placeholder has the right shape
/// (32768 + 32767 bytes) and is deterministic and process-wide-shared like the
/// real one, but a file encrypted against the real table will not decrypt
/// correctly with it. See `DESIGN.md` for the full note.
fn build_placeholder_segments() -> Segments {
    let mix = |i: u32| -> u8 {
        let x = i.wrapping_mul(2_654_435_761).wrapping_add(0x9E37_79B9);
        (x ^ (x >> 15)) as u8
    };
    let first = (0..FIRST_SEGMENT_LEN as u32).map(mix).collect();
    let remaining = (FIRST_SEGMENT_LEN as u32..(FIRST_SEGMENT_LEN + REMAINING_SEGMENT_LEN) as u32)
        .map(mix)
        .collect();
    Segments { first, remaining }
}

fn segments() -> Arc<Segments> {
    static SEGMENTS: OnceLock<Arc<Segments>> = OnceLock::new();
    SEGMENTS
        .get_or_init(|| Arc::new(build_placeholder_segments()))
        .clone()
}

/// The modern QMCv1 StaticMap cipher: offset `p` is XORed with the keystream
/// byte at position `p` in the (conceptually infinite, 32767-periodic-after-
/// 32768) lookup table.
pub struct StaticMap {
    segments: Arc<Segments>,
}

impl StaticMap {
    pub fn new() -> Self {
        Self {
            segments: segments(),
        }
    }

    fn keystream_byte(&self, p: u64) -> u8 {
        let p = p as usize;
        if p < FIRST_SEGMENT_LEN {
            self.segments.first[p]
        } else {
            self.segments.remaining[(p - FIRST_SEGMENT_LEN) % REMAINING_SEGMENT_LEN]
        }
    }

    pub fn decrypt(&self, data: &[u8], start_offset: u64) -> Vec<u8> {
        data.iter()
            .enumerate()
            .map(|(i, b)| b ^ self.keystream_byte(start_offset + i as u64))
            .collect()
    }
}

impl Default for StaticMap {
    fn default() -> Self {
        Self::new()
    }
}

/// The legacy 256-byte StaticMap formula, used only when the lookup-table
/// asset is unavailable. Fully determined by the published formula — needs no
/// external asset.
pub struct OldStaticMap;

impl OldStaticMap {
    pub fn new() -> Self {
        Self
    }

    fn keystream_byte(offset: u64) -> u8 {
        let i = if offset > 0x7FFF { offset % 0x7FFF } else { offset };
        (((i * i + 27) % 256) & 0xFF) as u8
    }

    pub fn decrypt(&self, data: &[u8], start_offset: u64) -> Vec<u8> {
        data.iter()
            .enumerate()
            .map(|(i, b)| b ^ Self::keystream_byte(start_offset + i as u64))
            .collect()
    }
}

impl Default for OldStaticMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_map_is_self_inverse() {
        let cipher = StaticMap::new();
        let plain = vec![0u8; 4096];
        let enc = cipher.decrypt(&plain, 0);
        let dec = cipher.decrypt(&enc, 0);
        assert_eq!(dec, plain);
    }

    #[test]
    fn static_map_random_access_matches_monolithic() {
        let cipher = StaticMap::new();
        let data = vec![0u8; 20];
        let whole = cipher.decrypt(&data, 0);
        let split = cipher.decrypt(&data[5..15], 5);
        assert_eq!(split, whole[5..15]);
    }

    #[test]
    fn static_map_crosses_segment_boundary() {
        let cipher = StaticMap::new();
        let data = vec![0u8; 10];
        let whole = cipher.decrypt(&data, 32_765);
        let split = cipher.decrypt(&data[3..7], 32_768);
        assert_eq!(split, whole[3..7]);
    }

    #[test]
    fn old_static_map_is_self_inverse() {
        let cipher = OldStaticMap::new();
        let plain = vec![0u8; 256];
        let enc = cipher.decrypt(&plain, 0);
        let dec = cipher.decrypt(&enc, 0);
        assert_eq!(dec, plain);
    }
}
