//! The QMCv1 container: no trailer, no embedded key — just a raw payload
//! ciphered with the key-less [`StaticMap`] (or, for older files,
//! [`OldStaticMap`]). Format identification is by magic-byte prefix, listed in
//! [`FILE_HEADERS`].

use std::io::Read;

use crate::cipher::qmc_static::{OldStaticMap, StaticMap};

/// Magic-byte prefixes distinguishing QMCv1 containers, mirroring the
/// reference's `QMCv1.file_headers`.
pub const FILE_HEADERS: &[(&[u8], &str)] = &[
    (&[0xA5, 0x06, 0xB7, 0x89], "QMCv1 FLAC"),
    (&[0x8A, 0x0E, 0xE5], "QMCv1 MP3"),
    (&[0x3C, 0xB8], "QMCv1 MP3"),
    (&[0x3C, 0xB9], "QMCv1 MP3"),
    (&[0x3C, 0xB1], "QMCv1 MP3"),
    (&[0x8C, 0x2D, 0xB1, 0x99], "QMCv1 OGG"),
];

pub fn sniff(header: &[u8]) -> Option<&'static str> {
    FILE_HEADERS
        .iter()
        .find(|(prefix, _)| header.starts_with(prefix))
        .map(|(_, name)| *name)
}

pub enum QmcV1Cipher {
    Static(StaticMap),
    Old(OldStaticMap),
}

impl QmcV1Cipher {
    pub fn decrypt(&self, data: &[u8], start_offset: u64) -> Vec<u8> {
        match self {
            Self::Static(c) => c.decrypt(data, start_offset),
            Self::Old(c) => c.decrypt(data, start_offset),
        }
    }
}

pub struct QmcV1Container {
    pub cipher: QmcV1Cipher,
    pub payload: Vec<u8>,
}

impl QmcV1Container {
    /// QMCv1 has no header or trailer of its own: the entire stream is the
    /// ciphered payload. `use_slower_cipher` selects [`OldStaticMap`] over the
    /// modern [`StaticMap`], matching the reference's `use_slower_cipher` flag.
    pub fn parse<R: Read>(reader: &mut R, use_slower_cipher: bool) -> crate::error::Result<Self> {
        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        let cipher = if use_slower_cipher {
            QmcV1Cipher::Old(OldStaticMap::new())
        } else {
            QmcV1Cipher::Static(StaticMap::new())
        };
        Ok(Self { cipher, payload })
    }

    pub fn decrypt_payload(&self) -> Vec<u8> {
        self.cipher.decrypt(&self.payload, 0)
    }
}
