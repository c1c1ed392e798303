//! Decrypts NCM and QMC (v1/v2) DRM-protected music containers into plain
//! audio streams.
//!
//! The entry point most callers want is [`convert`], which reads a container
//! from disk, decrypts its payload, sniffs the resulting audio format, writes
//! it out, and (for NCM) restores the embedded tag metadata and cover art.
//! Lower-level building blocks — the individual ciphers in [`cipher`], the
//! container codecs in [`container`], and the seekable [`stream::CipherStream`]
//! adaptor — are exported for callers who need more control.

pub mod cipher;
pub mod container;
pub mod dispatch;
pub mod error;
pub mod metadata;
pub mod sniff;
pub mod stream;
pub mod tag;
mod util;

pub use error::{Error, Result};

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::info;

/// Decrypt `input` (an `.ncm`, `.qmcflac`/`.qmc0`/`.qmc3`, or `.mflac`/`.mgg`
/// file) and write the plain audio into `output_dir` (or `input`'s own
/// directory). Returns the path written. For NCM input, also restores tag
/// metadata and cover art onto the output file.
///
/// `input`'s extension drives §4.16's extension-based codec selection unless
/// `probe_content` is set, in which case (or if the extension isn't
/// recognized) the container is identified by content-sniffing instead.
/// `use_slower_cipher` selects QMCv1's legacy `OldStaticMap`; `try_fallback`
/// enables QMCv2's legacy Key256Mask128 recovery for files with no embedded
/// key.
pub fn convert(
    input: &Path,
    output_dir: Option<&Path>,
    probe_content: bool,
    use_slower_cipher: bool,
    try_fallback: bool,
) -> Result<PathBuf> {
    let mut file = File::open(input)?;
    let extension_hint = input.extension().and_then(std::ffi::OsStr::to_str);
    let track = dispatch::decrypt_track(&mut file, extension_hint, probe_content, use_slower_cipher, try_fallback)?;

    let stem = input.file_stem().unwrap_or_default();
    let out_dir = output_dir.unwrap_or_else(|| input.parent().unwrap_or_else(|| Path::new(".")));
    let output_path = out_dir.join(format!("{}.{}", stem.to_string_lossy(), track.extension));

    {
        let out_file = File::create(&output_path)?;
        let mut writer = BufWriter::new(out_file);
        std::io::Write::write_all(&mut writer, &track.audio)?;
    }

    if let Some(meta) = &track.metadata {
        tag::write_tags(&output_path, meta, track.cover.as_deref())?;
    }

    info!(output = %output_path.display(), "converted track");
    Ok(output_path)
}
