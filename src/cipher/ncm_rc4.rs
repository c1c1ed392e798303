//! The RC4 variant NCM uses to stream-cipher the audio payload: a standard
//! RC4-KSA key schedule over the (already AES-unwrapped) master key, followed
//! by a precomputed 256-byte ring so random-access offsets don't need to
//! replay the PRGA from the start.

/// RC4 key-scheduling algorithm over `key`, producing the permuted S-box.
pub fn rc4_ksa(key: &[u8]) -> [u8; 256] {
    let mut s: [u8; 256] = core::array::from_fn(|i| i as u8);
    let mut j: u8 = 0;
    for i in 0..256usize {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }
    s
}

/// Derive the keystream byte for PRGA index `offset` directly from the S-box,
/// without running PRGA sequentially — this is what makes the cipher
/// randomly seekable.
fn rc4_stream_byte(s: &[u8; 256], offset: u64) -> u8 {
    let j = ((offset + 1) & 0xff) as u8;
    let jv = s[j as usize];
    s[(jv.wrapping_add(s[(jv.wrapping_add(j)) as usize])) as usize]
}

/// NCM's RC4-keystream cipher. Keyed once from the unwrapped master key, then
/// reusable across arbitrarily many, arbitrarily offset `decrypt` calls.
pub struct NcmRc4 {
    s_box: [u8; 256],
    /// Precomputed ring: `ring[i] = rc4_stream_byte(s_box, i)` for `i in 0..256`.
    /// NCM only ever needs the keystream modulo 256, so this ring lets every
    /// byte be produced in O(1) without touching `s_box` on the hot path.
    ring: [u8; 256],
}

impl NcmRc4 {
    pub fn new(key: &[u8]) -> Self {
        let s_box = rc4_ksa(key);
        let ring = core::array::from_fn(|i| rc4_stream_byte(&s_box, i as u64));
        Self { s_box, ring }
    }

    fn keystream_byte(&self, offset: u64) -> u8 {
        self.ring[(offset % 256) as usize]
    }

    /// XOR `data` against the keystream starting at `start_offset`. Self-inverse.
    pub fn decrypt(&self, data: &[u8], start_offset: u64) -> Vec<u8> {
        data.iter()
            .enumerate()
            .map(|(i, b)| b ^ self.keystream_byte(start_offset + i as u64))
            .collect()
    }
}
