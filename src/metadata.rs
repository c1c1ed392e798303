//! NCM tag metadata: the JSON blob stored (AES-encrypted) inside an `.ncm`
//! container, carried forward so [`crate::tag`] can write it into the
//! decrypted audio file.

use serde::{Deserialize, Serialize};

/// Metadata NetEase embeds in every `.ncm` container. Field names follow the
/// JSON keys the client actually emits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NcmMetadata {
    #[serde(rename = "musicId")]
    pub music_id: Option<i64>,
    #[serde(rename = "musicName")]
    pub music_name: Option<String>,
    pub artist: Option<Vec<(String, i64)>>,
    pub album: Option<String>,
    #[serde(rename = "albumId")]
    pub album_id: Option<i64>,
    #[serde(rename = "albumPicDocId")]
    pub album_pic_doc_id: Option<serde_json::Value>,
    #[serde(rename = "albumPic")]
    pub album_pic: Option<String>,
    pub bitrate: Option<i64>,
    pub duration: Option<i64>,
    pub format: Option<String>,
    #[serde(rename = "mp3DocId")]
    pub mp3_doc_id: Option<String>,
    pub flag: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NcmMetadata {
    /// Join every artist's name with `/`, matching how the reference client
    /// displays multi-artist tracks.
    pub fn artist_names(&self) -> Option<String> {
        let artists = self.artist.as_ref()?;
        if artists.is_empty() {
            return None;
        }
        Some(
            artists
                .iter()
                .map(|(name, _id)| name.as_str())
                .collect::<Vec<_>>()
                .join("/"),
        )
    }
}
