//! Audio format sniffing by magic-byte prefix, with an ID3v2 syncsafe-size
//! skip-ahead so ID3-tagged MP3s are recognized by their underlying frame
//! sync rather than the tag header. Ported from the reference's
//! `sniff_audio_file`/`BitPaddedInt`.

/// Magic-byte prefix → file extension, checked in order.
const AUDIO_FILE_HEADERS: &[(&[u8], &str)] = &[
    (b"fLaC", "flac"),
    (b"OggS", "ogg"),
    (&[0xFF, 0xFB], "mp3"),
    (&[0xFF, 0xF3], "mp3"),
    (&[0xFF, 0xF2], "mp3"),
    (&[0xFF, 0xF1], "aac"),
    (b"RIFF", "wav"),
    (&[0x30, 0x26, 0xB2, 0x75], "wma"),
    (b"FRM8", "dff"),
    (&[0x54, 0x54, 0x41, 0x31], "tta"), // "TTA1"
    (b"MAC ", "ape"),
];

/// Decode a 4-byte big-endian ID3v2 "syncsafe" integer: each byte contributes
/// only its low 7 bits.
fn syncsafe_u32(bytes: &[u8; 4]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, &b| (acc << 7) | (b & 0x7f) as u32)
}

/// Identify the audio format in `header`. Skips past an ID3v2 tag if present,
/// since its declared size tells us where the real audio frame sync begins —
/// `header` must extend at least that far for the inner magic to be checked
/// at all; callers should pass the whole decrypted buffer (or enough of its
/// prefix to cover any ID3v2 tag), not a small fixed-size slice.
pub fn sniff_audio_file(header: &[u8]) -> Option<&'static str> {
    if header.len() >= 10 && &header[0..3] == b"ID3" {
        let size_bytes: [u8; 4] = header[6..10].try_into().ok()?;
        let tag_size = syncsafe_u32(&size_bytes) as usize + 10;
        if header.len() < tag_size {
            return None;
        }
        return sniff_prefix(&header[tag_size..]);
    }

    if header.len() >= 8 && &header[4..8] == b"ftyp" {
        return Some("m4a");
    }

    sniff_prefix(header)
}

fn sniff_prefix(data: &[u8]) -> Option<&'static str> {
    AUDIO_FILE_HEADERS
        .iter()
        .find(|(magic, _)| data.starts_with(magic))
        .map(|(_, ext)| *ext)
}
