//! The NCM container: a fixed header, an AES-ECB-wrapped RC4 master key, an
//! AES-ECB-wrapped JSON tag blob, an embedded cover image, then the
//! RC4-streamed audio payload. Byte layout ported from the reference
//! implementation's `NCM.load`/`NCM.save`.

use std::io::{Read, Write};

use base64::Engine;

use crate::cipher::aes_ecb;
use crate::cipher::ncm_rc4::NcmRc4;
use crate::error::{Error, Result};
use crate::metadata::NcmMetadata;
use crate::util;

const MAGIC: &[u8; 8] = b"CTENFDAM";
const CORE_KEY: [u8; 16] = *b"hzHRAmso5kInbaxW";
const META_KEY: [u8; 16] = *b"#14ljk_!\\]&0U<'(";
const MASTER_KEY_PREFIX: &[u8] = b"neteasecloudmusic";
const TAGDATA_IDENTIFIER_PREFIX: &[u8] = b"163 key(Don't modify):";
const TAGDATA_JSON_PREFIX: &[u8] = b"music:";

pub struct NcmContainer {
    pub cipher: NcmRc4,
    pub metadata: NcmMetadata,
    /// The raw `identifier` string preceding the base64 tag blob, round-tripped
    /// verbatim so re-saving reproduces the original bytes.
    pub identifier: Option<String>,
    pub cover: Vec<u8>,
    pub payload: Vec<u8>,
}

fn read_u32_le<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

impl NcmContainer {
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let mut header = [0u8; 10];
        reader.read_exact(&mut header)?;
        if !header.starts_with(MAGIC) {
            return Err(Error::FileTypeMismatch("not an NCM file: bad header".into()));
        }

        let key_len = read_u32_le(reader)? as usize;
        let mut encrypted_key = vec![0u8; key_len];
        reader.read_exact(&mut encrypted_key)?;
        for b in &mut encrypted_key {
            *b ^= 0x64;
        }
        let master_key_padded = aes_ecb::decrypt(&CORE_KEY, &encrypted_key)?;
        let master_key = master_key_padded
            .strip_prefix(MASTER_KEY_PREFIX)
            .ok_or_else(|| Error::InvalidData("NCM master key missing expected prefix".into()))?
            .to_vec();

        let tag_len = read_u32_le(reader)? as usize;
        let mut raw_tag = vec![0u8; tag_len];
        reader.read_exact(&mut raw_tag)?;
        for b in &mut raw_tag {
            *b ^= 0x63;
        }
        let identifier = String::from_utf8(raw_tag.clone()).ok();
        let b64_tag = raw_tag
            .strip_prefix(TAGDATA_IDENTIFIER_PREFIX)
            .ok_or_else(|| Error::InvalidData("NCM tag data missing expected prefix".into()))?;
        let encrypted_tag = base64::engine::general_purpose::STANDARD.decode(b64_tag)?;
        let tag_plain = aes_ecb::decrypt(&META_KEY, &encrypted_tag)?;
        let tag_json = tag_plain
            .strip_prefix(TAGDATA_JSON_PREFIX)
            .ok_or_else(|| Error::InvalidData("NCM tag JSON missing expected prefix".into()))?;
        let metadata: NcmMetadata = serde_json::from_slice(tag_json)?;

        let mut skip = [0u8; 5];
        reader.read_exact(&mut skip)?;

        let cover_alloc = read_u32_le(reader)? as usize;
        let cover_size = read_u32_le(reader)? as usize;
        let mut cover = vec![0u8; cover_size];
        if cover_size > 0 {
            reader.read_exact(&mut cover)?;
        }
        let remaining_alloc = cover_alloc.saturating_sub(cover_size);
        if remaining_alloc > 0 {
            std::io::copy(&mut reader.by_ref().take(remaining_alloc as u64), &mut std::io::sink())?;
        }

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;

        Ok(Self {
            cipher: NcmRc4::new(&master_key),
            metadata,
            identifier,
            cover,
            payload,
        })
    }

    /// Decrypt the full audio payload.
    pub fn decrypt_payload(&self) -> Vec<u8> {
        self.cipher.decrypt(&self.payload, 0)
    }

    /// Serialize back to the NCM on-disk layout.
    pub fn write<W: Write>(&self, writer: &mut W, master_key: &[u8]) -> Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_all(&[0u8, 0u8])?;

        let mut master_key_plain = MASTER_KEY_PREFIX.to_vec();
        master_key_plain.extend_from_slice(master_key);
        let mut encrypted_key = aes_ecb::encrypt(&CORE_KEY, &master_key_plain);
        for b in &mut encrypted_key {
            *b ^= 0x64;
        }
        writer.write_all(&(encrypted_key.len() as u32).to_le_bytes())?;
        writer.write_all(&encrypted_key)?;

        let mut tag_no_identifier = self.metadata.clone();
        tag_no_identifier.identifier = None;
        let tag_json = serde_json::to_vec(&tag_no_identifier)?;
        let mut tag_plain = TAGDATA_JSON_PREFIX.to_vec();
        tag_plain.extend_from_slice(&tag_json);
        let encrypted_tag = aes_ecb::encrypt(&META_KEY, &tag_plain);
        let b64_tag = base64::engine::general_purpose::STANDARD.encode(&encrypted_tag);
        let mut raw_tag = TAGDATA_IDENTIFIER_PREFIX.to_vec();
        raw_tag.extend_from_slice(b64_tag.as_bytes());
        for b in &mut raw_tag {
            *b ^= 0x63;
        }
        writer.write_all(&(raw_tag.len() as u32).to_le_bytes())?;
        writer.write_all(&raw_tag)?;

        writer.write_all(&[0u8; 5])?;

        let cover_len = self.cover.len() as u32;
        writer.write_all(&cover_len.to_le_bytes())?;
        writer.write_all(&cover_len.to_le_bytes())?;
        writer.write_all(&self.cover)?;

        writer.write_all(&self.payload)?;
        Ok(())
    }

    /// Build an empty container around plaintext `audio`, generating a fresh
    /// random master key (mirroring the reference's "no filething" path).
    pub fn from_plain_audio(audio: &[u8]) -> Self {
        let key_left = util::random_bytes_from_alphabet(28, b"0123456789");
        let key_right = b"E7fT49x7dof9OKCgg9cdvhEuezy3iZCL1nFvBFd1T4uSktAJKmwZXsijPbijliionVUXXg9plTbXEclAE9Lb";
        let mut master_key = key_left;
        master_key.extend_from_slice(key_right);

        let cipher = NcmRc4::new(&master_key);
        let payload = cipher.decrypt(audio, 0); // XOR cipher: encrypting == decrypting

        Self {
            cipher,
            metadata: NcmMetadata::default(),
            identifier: None,
            cover: Vec::new(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip_master_key() -> Vec<u8> {
        b"a sample unwrapped ncm master key".to_vec()
    }

    #[test]
    fn write_then_parse_roundtrip() {
        let master_key = roundtrip_master_key();
        let plain_payload = b"plain audio content here".to_vec();
        let cipher = NcmRc4::new(&master_key);
        let ciphertext = cipher.decrypt(&plain_payload, 0); // XOR cipher: encrypt == decrypt

        let mut container = NcmContainer::from_plain_audio(&plain_payload);
        container.cipher = NcmRc4::new(&master_key);
        container.payload = ciphertext;
        container.metadata.music_name = Some("Test Song".into());

        let mut buf = Vec::new();
        container.write(&mut buf, &master_key).unwrap();

        let parsed = NcmContainer::parse(&mut Cursor::new(buf)).unwrap();
        assert_eq!(parsed.metadata.music_name.as_deref(), Some("Test Song"));
        assert_eq!(parsed.decrypt_payload(), plain_payload);
    }

    #[test]
    fn bad_header_is_rejected() {
        let mut buf = Cursor::new(b"NOTANCM!!!".to_vec());
        assert!(matches!(
            NcmContainer::parse(&mut buf),
            Err(Error::FileTypeMismatch(_))
        ));
    }
}
