//! QMCv2 Modified RC4: a segmented RC4 variant whose box is sized to the key
//! (not the usual 256) and whose per-segment skip distance is derived from a
//! floating-point hash of the key. Ported byte-for-byte from the reference
//! algorithm's four-phase `decrypt`, including its use of `f64` division in
//! [`ModifiedRc4::get_seg_skip`].

use crate::error::{Error, Result};

const FIRST_SEGSIZE: usize = 128;
const REMAIN_SEGSIZE: usize = 5120;

pub struct ModifiedRc4 {
    key: Vec<u8>,
    key_len: usize,
    box_: Vec<u8>,
    hash_base: u32,
}

impl ModifiedRc4 {
    pub fn new(key: &[u8]) -> Self {
        let key_len = key.len();
        let mut box_: Vec<u8> = (0..key_len).map(|i| (i % 256) as u8).collect();

        let mut j: usize = 0;
        for i in 0..key_len {
            j = (j + box_[i] as usize + key[i % key_len] as usize) % key_len;
            box_.swap(i, j);
        }

        Self {
            key: key.to_vec(),
            key_len,
            box_,
            hash_base: Self::get_hash_base(key),
        }
    }

    pub fn key_bytes(&self) -> &[u8] {
        &self.key
    }

    fn get_hash_base(key: &[u8]) -> u32 {
        let mut hash_base: u32 = 1;
        for &v in key {
            if v == 0 {
                continue;
            }
            let next_hash = hash_base.wrapping_mul(v as u32);
            if next_hash == 0 || next_hash <= hash_base {
                break;
            }
            hash_base = next_hash;
        }
        hash_base
    }

    /// `v` is the absolute stream position (for `gen_first_seg`) or the
    /// segment index (for `gen_remain_seg`) — both unbounded, hence `u64`.
    fn get_seg_skip(&self, v: u64) -> Result<usize> {
        let seed = self.key[(v % self.key_len as u64) as usize];
        if seed == 0 {
            return Err(Error::InvalidData(
                "Modified-RC4 seg-skip hit a zero key byte as divisor".into(),
            ));
        }
        let denom = (v + 1) as f64 * seed as f64;
        let idx = (self.hash_base as f64 / denom * 100.0).trunc() as i64;
        Ok((idx.rem_euclid(self.key_len as i64)) as usize)
    }

    fn gen_first_seg(&self, data_offset: u64, data_len: usize) -> Result<Vec<u8>> {
        (data_offset..data_offset + data_len as u64)
            .map(|i| self.get_seg_skip(i).map(|idx| self.key[idx]))
            .collect()
    }

    fn gen_remain_seg(&self, data_offset: u64, data_len: usize) -> Result<Vec<u8>> {
        let key_len = self.key_len;
        let mut box_ = self.box_.clone();
        let mut j: usize = 0;
        let mut k: usize = 0;

        let skip_len = (data_offset % REMAIN_SEGSIZE as u64) as i64
            + self.get_seg_skip(data_offset / REMAIN_SEGSIZE as u64)? as i64;

        let mut out = Vec::with_capacity(data_len);
        let mut i = -skip_len;
        while i < data_len as i64 {
            j = (j + 1) % key_len;
            k = (box_[j] as usize + k) % key_len;
            box_.swap(j, k);
            if i >= 0 {
                out.push(box_[(box_[j] as usize + box_[k] as usize) % key_len]);
            }
            i += 1;
        }
        Ok(out)
    }

    /// Decrypt (or, symmetrically, encrypt) `cipherdata` at `start_offset`,
    /// reconstructing exactly the keystream bytes `[start_offset,
    /// start_offset + cipherdata.len())` would have produced from offset 0.
    pub fn decrypt(&self, cipherdata: &[u8], start_offset: u64) -> Result<Vec<u8>> {
        let mut pending = cipherdata.len();
        let mut done = 0usize;
        let mut offset = start_offset;
        let mut keystream = vec![0u8; cipherdata.len()];

        if offset < FIRST_SEGSIZE as u64 {
            let mut blksize = pending;
            let room = (FIRST_SEGSIZE as u64 - offset) as usize;
            if blksize > room {
                blksize = room;
            }
            let seg = self.gen_first_seg(offset, blksize)?;
            keystream[..blksize].copy_from_slice(&seg);
            pending -= blksize;
            done += blksize;
            offset += blksize as u64;
            if pending == 0 {
                return Ok(xor(cipherdata, &keystream));
            }
        }

        if offset % REMAIN_SEGSIZE as u64 != 0 {
            let mut blksize = pending;
            let room = REMAIN_SEGSIZE - (offset % REMAIN_SEGSIZE as u64) as usize;
            if blksize > room {
                blksize = room;
            }
            let seg = self.gen_remain_seg(offset, blksize)?;
            keystream[done..done + blksize].copy_from_slice(&seg);
            pending -= blksize;
            done += blksize;
            offset += blksize as u64;
            if pending == 0 {
                return Ok(xor(cipherdata, &keystream));
            }
        }

        while pending > REMAIN_SEGSIZE {
            let seg = self.gen_remain_seg(offset, REMAIN_SEGSIZE)?;
            keystream[done..done + REMAIN_SEGSIZE].copy_from_slice(&seg);
            pending -= REMAIN_SEGSIZE;
            done += REMAIN_SEGSIZE;
            offset += REMAIN_SEGSIZE as u64;
        }

        if pending > 0 {
            let seg = self.gen_remain_seg(offset, pending)?;
            keystream[done..].copy_from_slice(&seg);
        }

        Ok(xor(cipherdata, &keystream))
    }
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Vec<u8> {
        (1..=64u16).map(|i| (i % 251 + 1) as u8).collect()
    }

    #[test]
    fn is_self_inverse_short() {
        let cipher = ModifiedRc4::new(&key());
        let plain: Vec<u8> = (0..64u32).map(|i| (i % 256) as u8).collect();
        let enc = cipher.decrypt(&plain, 0).unwrap();
        let dec = cipher.decrypt(&enc, 0).unwrap();
        assert_eq!(dec, plain);
    }

    #[test]
    fn is_self_inverse_across_all_phases() {
        let cipher = ModifiedRc4::new(&key());
        // Long enough to cross first-segment, partial-remain, whole-block and
        // final-partial phases.
        let plain: Vec<u8> = (0..12_000u32).map(|i| (i % 256) as u8).collect();
        let enc = cipher.decrypt(&plain, 0).unwrap();
        let dec = cipher.decrypt(&enc, 0).unwrap();
        assert_eq!(dec, plain);
    }

    #[test]
    fn random_access_matches_monolithic() {
        let cipher = ModifiedRc4::new(&key());
        let data: Vec<u8> = (0..9_000u32).map(|i| (i * 7 % 256) as u8).collect();
        let whole = cipher.decrypt(&data, 0).unwrap();
        let split = cipher.decrypt(&data[4000..4500], 4000).unwrap();
        assert_eq!(split, whole[4000..4500]);
    }

    #[test]
    fn zero_key_byte_as_divisor_errors() {
        let cipher = ModifiedRc4::new(&[0u8; 8]);
        assert!(cipher.decrypt(&[1, 2, 3], 0).is_err());
    }
}
