//! Byte-level helpers shared across ciphers and container codecs.

use rand::Rng;

use crate::error::{Error, Result};

/// Alphabet used by [`random_bytes_from_alphabet`] when the caller doesn't pick one:
/// ASCII digits followed by upper- and lower-case letters.
pub const DEFAULT_ALPHABET: &[u8] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// XOR two equal-length byte strings. `LengthMismatch` if they differ.
pub fn xor_equal_length(a: &[u8], b: &[u8]) -> Result<Vec<u8>> {
    if a.len() != b.len() {
        return Err(Error::LengthMismatch(a.len(), b.len()));
    }
    Ok(a.iter().zip(b).map(|(x, y)| x ^ y).collect())
}

/// Draw `n` bytes uniformly from `alphabet`. Used only when a caller creates an
/// empty container without supplying a key.
pub fn random_bytes_from_alphabet(n: usize, alphabet: &[u8]) -> Vec<u8> {
    let mut rng = rand::rng();
    (0..n)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_equal_length_matches() {
        let a = [0xC0, 0xC1, 0xC2];
        let b = [0xA3, 0xA3, 0xA3];
        assert_eq!(xor_equal_length(&a, &b).unwrap(), vec![0x63, 0x62, 0x61]);
    }

    #[test]
    fn xor_length_mismatch_errors() {
        let a = [0u8; 3];
        let b = [0u8; 4];
        assert!(matches!(
            xor_equal_length(&a, &b),
            Err(Error::LengthMismatch(3, 4))
        ));
    }

    #[test]
    fn random_bytes_use_default_alphabet() {
        let bytes = random_bytes_from_alphabet(64, DEFAULT_ALPHABET);
        assert_eq!(bytes.len(), 64);
        assert!(bytes.iter().all(|b| DEFAULT_ALPHABET.contains(b)));
    }
}
