use serde::{Deserialize, Serialize};
use std::path::Path;

mod text;

pub use text::{
    normalize_name, Articles, IndexGroups, IndexRule, DEFAULT_IGNORED_ARTICLES,
    DEFAULT_INDEX_GROUPS, FALLBACK_GROUP,
};

/// Separator used when several values are hashed into one identifier.
pub const KEY_SEP: char = '\x1f';

/// One audio file as discovered by a track source, before normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTrack {
    pub id: String,
    pub title: String,
    pub album: String,
    pub artist: String,
    pub album_artist: String,
    pub compilation: bool,
    pub path: String,
    pub created_at: u64,
    pub updated_at: u64,
    pub year: Option<i32>,
    pub track_no: Option<u16>,
    pub disc_no: Option<u16>,
    pub duration_ms: Option<u32>,
}

impl RawTrack {
    /// The name used to file this track under an artist.
    ///
    /// Compilations and tracks with an explicit album artist belong to the album artist;
    /// everything else belongs to the track artist.
    pub fn real_artist(&self) -> &str {
        if self.compilation || !self.album_artist.trim().is_empty() {
            &self.album_artist
        } else {
            &self.artist
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub artist_id: String,
    pub name: String,
    pub year: Option<i32>,
    pub compilation: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub album_id: String,
    pub artist_id: String,
    pub title: String,
    pub album: String,
    pub artist: String,
    pub album_artist: String,
    pub compilation: bool,
    pub path: String,
    pub track_no: Option<u16>,
    pub disc_no: Option<u16>,
    pub duration_ms: Option<u32>,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Artist reference stored inside an index group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistInfo {
    pub artist_id: String,
    pub artist: String,
}

/// All artists filed under one index group. `id` is the group label.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistIndex {
    pub id: String,
    pub artists: Vec<ArtistInfo>,
}

pub fn stable_id(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

/// Stable id derived from several key parts joined by [`KEY_SEP`].
pub fn stable_id_of(parts: &[&str]) -> String {
    let mut joined = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            joined.push(KEY_SEP);
        }
        joined.push_str(part);
    }
    stable_id(&joined)
}

pub fn relpath_from(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(path_to_slash_string(rel))
}

fn path_to_slash_string(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    parts.join("/")
}
