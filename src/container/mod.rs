//! Container codecs: the on-disk formats that wrap a ciphered audio payload
//! (NCM, QMCv1, QMCv2) plus whatever container-specific metadata they carry.

pub mod ncm;
pub mod qmcv1;
pub mod qmcv2;

use std::io::{Read, Seek};

use crate::error::Result;

pub use ncm::NcmContainer;
pub use qmcv1::QmcV1Container;
pub use qmcv2::QmcV2Container;

/// A parsed container, still holding its ciphered payload and whatever is
/// needed to decrypt it.
pub enum Container {
    Ncm(NcmContainer),
    QmcV1(QmcV1Container),
    QmcV2(QmcV2Container),
}

impl Container {
    pub fn decrypt_payload(&self) -> Result<Vec<u8>> {
        match self {
            Self::Ncm(c) => Ok(c.decrypt_payload()),
            Self::QmcV1(c) => Ok(c.decrypt_payload()),
            Self::QmcV2(c) => c.decrypt_payload(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ncm(_) => "NCM",
            Self::QmcV1(_) => "QMCv1",
            Self::QmcV2(_) => "QMCv2",
        }
    }
}

/// Map a file extension (without the leading dot, case-insensitive) to the
/// container format the reference's extension patterns (`*.ncm`, `*.qmc*`,
/// `*.mflac*`, `*.mgg*`) select.
fn container_kind_for_extension(extension: &str) -> Option<&'static str> {
    let ext = extension.to_ascii_lowercase();
    if ext == "ncm" {
        Some("NCM")
    } else if ext.starts_with("qmc") {
        Some("QMCv1")
    } else if ext.starts_with("mflac") || ext.starts_with("mgg") {
        Some("QMCv2")
    } else {
        None
    }
}

fn parse_as<R: Read + Seek>(
    reader: &mut R,
    kind: &str,
    use_slower_cipher: bool,
    try_fallback: bool,
) -> Result<Container> {
    match kind {
        "NCM" => Ok(Container::Ncm(NcmContainer::parse(reader)?)),
        "QMCv1" => Ok(Container::QmcV1(QmcV1Container::parse(reader, use_slower_cipher)?)),
        _ => Ok(Container::QmcV2(QmcV2Container::parse(reader, try_fallback)?)),
    }
}

/// Content-sniffing dispatch: NCM is recognized by its fixed 8-byte magic;
/// QMCv1 by one of its audio-codec magic prefixes; anything else is attempted
/// as QMCv2, whose format lives entirely in the trailer.
fn parse_by_content<R: Read + Seek>(
    reader: &mut R,
    use_slower_cipher: bool,
    try_fallback: bool,
) -> Result<Container> {
    let mut header = [0u8; 8];
    let n = reader.read(&mut header)?;
    reader.rewind()?;

    if n >= 8 && header.starts_with(b"CTENFDAM") {
        return Ok(Container::Ncm(NcmContainer::parse(reader)?));
    }
    if qmcv1::sniff(&header[..n]).is_some() {
        return Ok(Container::QmcV1(QmcV1Container::parse(reader, use_slower_cipher)?));
    }
    Ok(Container::QmcV2(QmcV2Container::parse(reader, try_fallback)?))
}

/// Parse `reader` as whichever container format applies, per §4.16's
/// extension-first dispatch: when `extension_hint` names a recognized
/// pattern and `probe_content` isn't set, parse directly as that codec,
/// falling back to content-sniffing if that attempt fails. Otherwise (no
/// usable hint, or `probe_content` requested) go straight to content
/// sniffing. `use_slower_cipher` selects QMCv1's legacy `OldStaticMap` over
/// the modern `StaticMap`; `try_fallback` enables QMCv2's legacy
/// Key256Mask128 recovery.
pub fn parse<R: Read + Seek>(
    reader: &mut R,
    extension_hint: Option<&str>,
    probe_content: bool,
    use_slower_cipher: bool,
    try_fallback: bool,
) -> Result<Container> {
    if !probe_content {
        if let Some(kind) = extension_hint.and_then(container_kind_for_extension) {
            reader.rewind()?;
            if let Ok(container) = parse_as(reader, kind, use_slower_cipher, try_fallback) {
                return Ok(container);
            }
            reader.rewind()?;
        }
    }
    parse_by_content(reader, use_slower_cipher, try_fallback)
}
