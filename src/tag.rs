//! Writes recovered NCM tag metadata (and cover art) into the decrypted audio
//! file on disk via [`lofty`]. QMC containers carry no equivalent tag blob, so
//! this is only ever called for NCM output.

use std::path::Path;

use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, TagExt};

use crate::error::{Error, Result};
use crate::metadata::NcmMetadata;

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub fn write_tags(path: &Path, metadata: &NcmMetadata, cover: Option<&[u8]>) -> Result<()> {
    let mut tagged_file = Probe::open(path)
        .map_err(|e| Error::Tag(e.to_string()))?
        .read()
        .map_err(|e| Error::Tag(e.to_string()))?;

    let has_primary = tagged_file.primary_tag().is_some();
    let tag = if has_primary {
        tagged_file.primary_tag_mut().unwrap()
    } else {
        tagged_file
            .first_tag_mut()
            .ok_or_else(|| Error::Tag("no tag found in file".into()))?
    };

    tag.set_title(metadata.music_name.clone().unwrap_or_default());
    if let Some(artist) = metadata.artist_names() {
        tag.set_artist(artist);
    }
    if let Some(album) = metadata.album.clone() {
        tag.set_album(album);
    }

    if let Some(img_data) = cover {
        let mime = if img_data.starts_with(&PNG_MAGIC) {
            MimeType::Png
        } else {
            MimeType::Jpeg
        };
        let pic = Picture::unchecked(img_data.to_vec())
            .pic_type(PictureType::CoverFront)
            .mime_type(mime)
            .build();
        tag.push_picture(pic);
    }

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| Error::Tag(e.to_string()))?;

    Ok(())
}
