//! The QMCv2 container: audio payload followed by a trailer that encodes the
//! wrapped key, either as a raw little-endian-length-prefixed blob or a
//! comma-separated `QTag` record (`key,songid,unknown`). Ported from the
//! reference's `QMCv2.load`/`QMCv2.save`.

use std::io::{Read, Seek, SeekFrom, Write};

use base64::Engine;

use crate::cipher::legacy_mask::{self, Key256Mask128};
use crate::cipher::qmc_dynamic::DynamicMap;
use crate::cipher::qmc_rc4::ModifiedRc4;
use crate::cipher::tea_cbc::TencentTeaCbc;
use crate::error::{Error, Result};

const NEW_KEY_FORMAT_TAIL: [u8; 4] = [0x25, 0x02, 0x00, 0x00];
const NO_KEY_TAIL: &[u8; 4] = b"STag";
const QTAG_TAIL: &[u8; 4] = b"QTag";
const MAX_RAW_KEY_LEN: u64 = 0x300;

pub enum QmcV2Cipher {
    Dynamic(DynamicMap),
    ModifiedRc4(ModifiedRc4),
    LegacyMask(Key256Mask128),
}

impl QmcV2Cipher {
    pub fn decrypt(&self, data: &[u8], start_offset: u64) -> Result<Vec<u8>> {
        Ok(match self {
            Self::Dynamic(c) => c.decrypt(data, start_offset),
            Self::ModifiedRc4(c) => c.decrypt(data, start_offset)?,
            Self::LegacyMask(c) => c.decrypt(data, start_offset),
        })
    }
}

pub struct QmcV2Container {
    pub cipher: QmcV2Cipher,
    pub payload: Vec<u8>,
    pub songid: Option<i64>,
    pub qtag_unknown: Option<Vec<u8>>,
}

/// Unwrap the base64-encoded, Tencent-TEA-CBC-wrapped key blob that every
/// recoverable QMCv2 trailer carries: `recipe (8 bytes) || ciphered segment`.
fn qmcv2_key_decrypt(ciphered_keydata: &[u8]) -> Result<Vec<u8>> {
    let decoded = base64::engine::general_purpose::STANDARD.decode(ciphered_keydata)?;
    if decoded.len() < 8 {
        return Err(Error::InvalidData("QMCv2 key blob shorter than the TEA recipe".into()));
    }
    let recipe: [u8; 8] = decoded[..8].try_into().unwrap();
    let ciphered_segment = &decoded[8..];

    let cipher = TencentTeaCbc::from_recipe(&recipe, 32)?;
    let mut key = recipe.to_vec();
    key.extend(cipher.decrypt(ciphered_segment, true)?);
    Ok(key)
}

fn qmcv2_key_encrypt(plain_keydata: &[u8]) -> Result<Vec<u8>> {
    if plain_keydata.len() < 8 {
        return Err(Error::InvalidParam("QMCv2 key shorter than the TEA recipe".into()));
    }
    let recipe: [u8; 8] = plain_keydata[..8].try_into().unwrap();
    let plain_segment = &plain_keydata[8..];

    let cipher = TencentTeaCbc::from_recipe(&recipe, 32)?;
    let mut ciphered = recipe.to_vec();
    ciphered.extend(cipher.encrypt(plain_segment));
    Ok(base64::engine::general_purpose::STANDARD
        .encode(&ciphered)
        .into_bytes())
}

fn cipher_from_key(key: Vec<u8>) -> QmcV2Cipher {
    if key.len() < 300 {
        QmcV2Cipher::Dynamic(DynamicMap::new(&key))
    } else {
        QmcV2Cipher::ModifiedRc4(ModifiedRc4::new(&key))
    }
}

/// Read the trailing `QTag` record: `-8` holds a big-endian qtag length, the
/// `qtag_len` bytes before that are `raw_key,songid,unknown` joined by commas.
fn read_qtag<R: Read + Seek>(reader: &mut R) -> Result<(u64, Vec<u8>, i64, Vec<u8>)> {
    reader.seek(SeekFrom::End(-8))?;
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let qtag_len = u32::from_be_bytes(len_buf) as u64;

    let audio_len = reader.seek(SeekFrom::End(-(qtag_len as i64 + 8)))?;
    let mut raw_qtag = vec![0u8; qtag_len as usize];
    reader.read_exact(&mut raw_qtag)?;

    let fields: Vec<&[u8]> = raw_qtag.split(|&b| b == b',').collect();
    if fields.len() != 3 {
        return Err(Error::InvalidData("invalid QTag record".into()));
    }
    let raw_key = fields[0].to_vec();
    let songid: i64 = std::str::from_utf8(fields[1])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::InvalidData("invalid QTag songid field".into()))?;
    let unknown = fields[2].to_vec();

    Ok((audio_len, raw_key, songid, unknown))
}

impl QmcV2Container {
    pub fn parse<R: Read + Seek>(reader: &mut R, try_fallback: bool) -> Result<Self> {
        reader.seek(SeekFrom::End(-4))?;
        let mut tail = [0u8; 4];
        reader.read_exact(&mut tail)?;

        let (audio_len, cipher, songid, qtag_unknown): (u64, QmcV2Cipher, Option<i64>, Option<Vec<u8>>) =
            if tail == NEW_KEY_FORMAT_TAIL || &tail == NO_KEY_TAIL {
                if !try_fallback {
                    return Err(Error::UnsupportedFileType(format!(
                        "QMCv2 file has no recoverable key (trailer {tail:02x?})"
                    )));
                }
                let audio_len = if tail == NEW_KEY_FORMAT_TAIL {
                    reader.seek(SeekFrom::End(-(4 + u32::from_le_bytes(tail) as i64)))?
                } else {
                    reader.seek(SeekFrom::End(-4))?
                };

                reader.seek(SeekFrom::Start(0))?;
                let mut payload = Vec::new();
                reader.by_ref().take(audio_len).read_to_end(&mut payload)?;

                let mask = match legacy_mask::find_mflac_mask(reader)? {
                    Some(mask) => mask,
                    None => legacy_mask::find_mgg_mask(&payload)?.ok_or_else(|| {
                        Error::UnsupportedFileType("legacy mask recovery failed for both mflac and mgg".into())
                    })?,
                };
                (audio_len, QmcV2Cipher::LegacyMask(Key256Mask128::new(mask)), None, None)
            } else if &tail == QTAG_TAIL {
                let (audio_len, raw_key, songid, unknown) = read_qtag(reader)?;
                let key = qmcv2_key_decrypt(&raw_key)?;
                (audio_len, cipher_from_key(key), Some(songid), Some(unknown))
            } else {
                reader.seek(SeekFrom::End(-4))?;
                let mut len_buf = [0u8; 4];
                reader.read_exact(&mut len_buf)?;
                let raw_key_len = u32::from_le_bytes(len_buf) as u64;
                if raw_key_len == 0 || raw_key_len > MAX_RAW_KEY_LEN {
                    return Err(Error::FileTypeMismatch(
                        "not a QMCv2 file: unknown trailer and no recoverable key".into(),
                    ));
                }
                let audio_len = reader.seek(SeekFrom::End(-(4 + raw_key_len as i64)))?;
                let mut raw_key = vec![0u8; raw_key_len as usize];
                reader.read_exact(&mut raw_key)?;
                let key = qmcv2_key_decrypt(&raw_key)?;
                (audio_len, cipher_from_key(key), None, None)
            };

        reader.seek(SeekFrom::Start(0))?;
        let mut payload = vec![0u8; audio_len as usize];
        reader.read_exact(&mut payload)?;

        Ok(Self {
            cipher,
            payload,
            songid,
            qtag_unknown,
        })
    }

    pub fn decrypt_payload(&self) -> Result<Vec<u8>> {
        self.cipher.decrypt(&self.payload, 0)
    }

    fn key(&self) -> Option<Vec<u8>> {
        match &self.cipher {
            QmcV2Cipher::Dynamic(c) => Some(c.key_bytes().to_vec()),
            QmcV2Cipher::ModifiedRc4(c) => Some(c.key_bytes().to_vec()),
            QmcV2Cipher::LegacyMask(_) => None,
        }
    }

    /// Write `payload` followed by the trailer. `use_qtag` selects the QTag
    /// encoding over the plain length-prefixed one; `LegacyMask` containers
    /// can't be re-saved since their wrapped key was never recovered.
    pub fn write<W: Write>(&self, writer: &mut W, use_qtag: bool, songid: Option<i64>) -> Result<()> {
        let key = self
            .key()
            .ok_or_else(|| Error::InvalidParam("cannot re-encode a legacy-mask QMCv2 container".into()))?;
        let encoded_key = qmcv2_key_encrypt(&key)?;

        writer.write_all(&self.payload)?;

        if use_qtag {
            let songid = songid.or(self.songid).unwrap_or(0);
            let unknown = self
                .qtag_unknown
                .clone()
                .unwrap_or_else(|| b"2".to_vec());
            let mut qtag = encoded_key;
            qtag.push(b',');
            qtag.extend(songid.to_string().into_bytes());
            qtag.push(b',');
            qtag.extend(unknown);
            writer.write_all(&qtag)?;
            writer.write_all(&(qtag.len() as u32).to_be_bytes())?;
            writer.write_all(QTAG_TAIL)?;
        } else {
            writer.write_all(&encoded_key)?;
            writer.write_all(&(encoded_key.len() as u32).to_le_bytes())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_key() -> Vec<u8> {
        (0..128u32).map(|i| ((i * 7 + 3) % 256) as u8).collect()
    }

    #[test]
    fn plain_trailer_roundtrip() {
        let key = sample_key();
        let cipher = DynamicMap::new(&key);
        let plain = b"some audio payload bytes, long enough".to_vec();
        let ciphertext = cipher.decrypt(&plain, 0);

        let container = QmcV2Container {
            cipher: QmcV2Cipher::Dynamic(DynamicMap::new(&key)),
            payload: ciphertext,
            songid: None,
            qtag_unknown: None,
        };

        let mut buf = Vec::new();
        container.write(&mut buf, false, None).unwrap();

        let mut cursor = Cursor::new(buf);
        let parsed = QmcV2Container::parse(&mut cursor, false).unwrap();
        assert_eq!(parsed.decrypt_payload().unwrap(), plain);
    }

    #[test]
    fn qtag_trailer_roundtrip() {
        let key = sample_key();
        let cipher = DynamicMap::new(&key);
        let plain = b"more audio payload bytes for the qtag path".to_vec();
        let ciphertext = cipher.decrypt(&plain, 0);

        let container = QmcV2Container {
            cipher: QmcV2Cipher::Dynamic(DynamicMap::new(&key)),
            payload: ciphertext,
            songid: Some(114_514),
            qtag_unknown: Some(b"2".to_vec()),
        };

        let mut buf = Vec::new();
        container.write(&mut buf, true, Some(114_514)).unwrap();

        let mut cursor = Cursor::new(buf);
        let parsed = QmcV2Container::parse(&mut cursor, false).unwrap();
        assert_eq!(parsed.songid, Some(114_514));
        assert_eq!(parsed.decrypt_payload().unwrap(), plain);
    }

    #[test]
    fn unrecoverable_trailer_without_fallback_errors() {
        let mut data = b"short payload".to_vec();
        data.extend_from_slice(&NEW_KEY_FORMAT_TAIL);
        let mut cursor = Cursor::new(data);
        assert!(matches!(
            QmcV2Container::parse(&mut cursor, false),
            Err(Error::UnsupportedFileType(_))
        ));
    }
}
