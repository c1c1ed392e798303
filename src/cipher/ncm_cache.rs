//! NCM's cache-file variant: a trivial constant-XOR obfuscation used for the
//! `.uc`/cache files NetEase's client keeps on disk, distinct from the
//! RC4-based `.ncm` container cipher in [`super::ncm_rc4`].

const XOR_BYTE: u8 = 163;

/// Constant-XOR cipher. Offset-independent and self-inverse.
pub struct NcmCache;

impl NcmCache {
    pub fn new() -> Self {
        Self
    }

    pub fn decrypt(&self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|b| b ^ XOR_BYTE).collect()
    }
}

impl Default for NcmCache {
    fn default() -> Self {
        Self::new()
    }
}
