//! Tencent-TEA-CBC: the non-standard CBC-like mode Tencent uses to wrap the
//! QMCv2 inner key. Built on top of [`super::tea::TeaEcb`]; never used as a
//! payload stream cipher (`supports_offset = false`).

use rand::Rng;

use super::tea::TeaEcb;
use crate::error::{Error, Result};
use crate::util::xor_equal_length;

const BLOCK_SIZE: usize = 8;
const SALT_LEN: usize = 2;
const ZERO_LEN: usize = 7;

/// The `simple_key` constant documented as `tan(106 + i*0.1) * 100` truncated to
/// `u8`, reproduced verbatim from the reference rather than recomputed (libc
/// `tan` rounding is not portable enough to regenerate this at runtime).
const SIMPLE_KEY: [u8; 8] = [0x69, 0x56, 0x46, 0x38, 0x2B, 0x20, 0x15, 0x0B];

pub struct TencentTeaCbc {
    block_cipher: TeaEcb,
}

impl TencentTeaCbc {
    /// Build the 16-byte TEA key by interleaving `simple_key` and `recipe`,
    /// then construct the CBC-mode wrapper.
    pub fn from_recipe(recipe: &[u8; 8], rounds: u32) -> Result<Self> {
        Self::from_recipe_with_simple_key(recipe, &SIMPLE_KEY, rounds)
    }

    fn from_recipe_with_simple_key(recipe: &[u8; 8], simple_key: &[u8; 8], rounds: u32) -> Result<Self> {
        let mut tea_key = [0u8; 16];
        for i in 0..8 {
            tea_key[2 * i] = simple_key[i];
            tea_key[2 * i + 1] = recipe[i];
        }
        Ok(Self {
            block_cipher: TeaEcb::new(&tea_key, rounds)?,
        })
    }

    /// Decrypt a ciphered key segment (see §4.4 of the design document).
    /// `zero_check` verifies the trailing zero bytes; off by default upstream.
    pub fn decrypt(&self, cipherdata: &[u8], zero_check: bool) -> Result<Vec<u8>> {
        if cipherdata.len() % BLOCK_SIZE != 0 {
            return Err(Error::InvalidData(format!(
                "ciphertext length {} is not a multiple of the block size {BLOCK_SIZE}",
                cipherdata.len()
            )));
        }
        if cipherdata.len() < BLOCK_SIZE * 2 {
            return Err(Error::InvalidData(format!(
                "ciphertext too short (need >= {}, got {})",
                BLOCK_SIZE * 2,
                cipherdata.len()
            )));
        }

        let first_block: &[u8; 8] = (&cipherdata[0..8]).try_into().unwrap();
        let mut dest_buf: [u8; 8] = self.block_cipher.decrypt_block(first_block);
        let pad_len = (dest_buf[0] & 0x7) as usize;
        if pad_len + SALT_LEN != BLOCK_SIZE {
            return Err(Error::InvalidData(format!("invalid pad length {pad_len}")));
        }

        let out_len = cipherdata.len() - pad_len - SALT_LEN - ZERO_LEN - 1;
        let mut out = vec![0u8; out_len];

        let mut iv_prev = [0u8; 8];
        let mut iv_cur: [u8; 8] = cipherdata[0..8].try_into().unwrap();
        let mut cipher_pos = 8usize;
        let mut dest_idx = 1 + pad_len;

        let crypt_block = |dest_buf: &mut [u8; 8],
                                iv_prev: &mut [u8; 8],
                                iv_cur: &mut [u8; 8],
                                cipher_pos: &mut usize| {
            *iv_prev = *iv_cur;
            *iv_cur = cipherdata[*cipher_pos..*cipher_pos + 8].try_into().unwrap();
            let xored = xor_equal_length(&dest_buf[..], &iv_cur[..]).unwrap();
            *dest_buf = self
                .block_cipher
                .decrypt_block(<&[u8; 8]>::try_from(xored.as_slice()).unwrap());
            *cipher_pos += 8;
        };

        let mut i = 1;
        while i <= SALT_LEN {
            if dest_idx < 8 {
                dest_idx += 1;
                i += 1;
            } else {
                crypt_block(&mut dest_buf, &mut iv_prev, &mut iv_cur, &mut cipher_pos);
                dest_idx = 0;
            }
        }

        let mut out_pos = 0;
        while out_pos < out_len {
            if dest_idx < 8 {
                out[out_pos] = dest_buf[dest_idx] ^ iv_prev[dest_idx];
                dest_idx += 1;
                out_pos += 1;
            } else {
                crypt_block(&mut dest_buf, &mut iv_prev, &mut iv_cur, &mut cipher_pos);
                dest_idx = 0;
            }
        }

        if zero_check {
            let mut i = 1;
            while i < ZERO_LEN {
                if dest_idx < 8 {
                    if dest_buf[dest_idx] ^ iv_prev[dest_idx] != 0 {
                        return Err(Error::ValidationError(
                            "Tencent-TEA-CBC trailing zero check failed".into(),
                        ));
                    }
                    dest_idx += 1;
                    i += 1;
                } else {
                    crypt_block(&mut dest_buf, &mut iv_prev, &mut iv_cur, &mut cipher_pos);
                    dest_idx = 0;
                }
            }
        }

        Ok(out)
    }

    /// Encrypt `plaindata`, choosing a `pad_len` that makes the total length a
    /// multiple of 8 with at least 10 bytes of overhead. Salt and padding bytes
    /// are drawn from [`rand`]; their values are irrelevant to interop.
    pub fn encrypt(&self, plaindata: &[u8]) -> Vec<u8> {
        let mut rng = rand::rng();

        let overhead = plaindata.len() + SALT_LEN + ZERO_LEN + 1;
        let mut pad_len = overhead % BLOCK_SIZE;
        if pad_len != 0 {
            pad_len = BLOCK_SIZE - pad_len;
        }

        let out_len = overhead + pad_len;
        let mut out = vec![0u8; out_len];
        let mut out_pos = 0;

        let mut src_buf = [0u8; 8];
        src_buf[0] = (rng.random::<u8>() & 0xf8) | (pad_len as u8);
        let mut src_idx = 1usize;
        for _ in 0..pad_len {
            src_buf[src_idx] = rng.random();
            src_idx += 1;
        }

        let mut iv_plain = [0u8; 8];
        let mut iv_crypt = [0u8; 8];

        let crypt_block = |src_buf: &mut [u8; 8],
                                iv_plain: &mut [u8; 8],
                                iv_crypt: &mut [u8; 8],
                                out: &mut [u8],
                                out_pos: &mut usize| {
            let xored = xor_equal_length(&src_buf[..], &iv_crypt[..]).unwrap();
            *src_buf = xored.try_into().unwrap();
            let enc = self.block_cipher.encrypt_block(src_buf);
            let enc_xored = xor_equal_length(&enc[..], &iv_plain[..]).unwrap();
            out[*out_pos..*out_pos + 8].copy_from_slice(&enc_xored);
            *iv_plain = *src_buf;
            *iv_crypt = enc_xored.try_into().unwrap();
            *out_pos += 8;
        };

        let mut i = 1;
        while i <= SALT_LEN {
            if src_idx < BLOCK_SIZE {
                src_buf[src_idx] = rng.random();
                src_idx += 1;
                i += 1;
            }
            if src_idx == BLOCK_SIZE {
                crypt_block(&mut src_buf, &mut iv_plain, &mut iv_crypt, &mut out, &mut out_pos);
                src_idx = 0;
            }
        }

        let mut plain_pos = 0;
        while plain_pos < plaindata.len() {
            if src_idx < BLOCK_SIZE {
                src_buf[src_idx] = plaindata[plain_pos];
                src_idx += 1;
                plain_pos += 1;
            }
            if src_idx == BLOCK_SIZE {
                crypt_block(&mut src_buf, &mut iv_plain, &mut iv_crypt, &mut out, &mut out_pos);
                src_idx = 0;
            }
        }

        let mut i = 1;
        while i <= ZERO_LEN {
            if src_idx < BLOCK_SIZE {
                src_buf[src_idx] = 0;
                src_idx += 1;
                i += 1;
            }
            if src_idx == BLOCK_SIZE {
                crypt_block(&mut src_buf, &mut iv_plain, &mut iv_crypt, &mut out, &mut out_pos);
                src_idx = 0;
            }
        }

        out
    }
}
