//! AES-128-ECB with PKCS#7 padding, used only to wrap/unwrap the NCM master key
//! and tag metadata. Never used as a payload stream cipher: `supports_offset` is
//! always false for this primitive.

use aes::Aes128;
use ecb::cipher::block_padding::Pkcs7;
use ecb::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};

use crate::error::{Error, Result};

type Aes128EcbEnc = ecb::Encryptor<Aes128>;
type Aes128EcbDec = ecb::Decryptor<Aes128>;

/// Decrypt `data` with AES-128-ECB and strip PKCS#7 padding.
pub fn decrypt(key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    let mut buf = data.to_vec();
    Aes128EcbDec::new(key.into())
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map(<[u8]>::to_vec)
        .map_err(|e| Error::InvalidData(format!("AES-ECB decrypt: {e}")))
}

/// Encrypt `data` with AES-128-ECB, padding to a block boundary with PKCS#7.
pub fn encrypt(key: &[u8; 16], data: &[u8]) -> Vec<u8> {
    let block_size = 16;
    let pad_len = block_size - (data.len() % block_size);
    let mut buf = vec![0u8; data.len() + pad_len];
    buf[..data.len()].copy_from_slice(data);
    let ct = Aes128EcbEnc::new(key.into())
        .encrypt_padded_mut::<Pkcs7>(&mut buf, data.len())
        .expect("buffer sized for padding");
    ct.to_vec()
}
