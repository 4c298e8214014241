use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use common::{relpath_from, stable_id, RawTrack};
use metadata::{read_tags, TagInfo};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::TrackSource;

const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "flac", "ogg", "opus", "m4a", "wav"];
const UNKNOWN_ALBUM: &str = "Unknown Album";
const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Track source over an `Artist/Album/track` folder tree.
///
/// Tags win; folder names fill in whatever the tags leave out.
#[derive(Clone, Copy, Debug, Default)]
pub struct FolderLoader;

impl FolderLoader {
    pub fn new() -> Self {
        Self
    }

    fn load_file(&self, root: &Path, file: &Path) -> Option<RawTrack> {
        let relpath = relpath_from(root, file)?;

        let tag = match read_tags(file) {
            Ok(tag) => tag,
            Err(err) => {
                warn!("Failed to read tags for {:?}: {}", file, err);
                TagInfo::default()
            }
        };

        let parts: Vec<&str> = relpath.split('/').collect();
        let folder = parts.len().checked_sub(2).map(|i| parts[i]);
        let parent_folder = parts.len().checked_sub(3).map(|i| parts[i]);
        let (folder_title, folder_year) = match folder {
            Some(name) => split_title_year(name),
            None => (UNKNOWN_ALBUM.to_string(), None),
        };

        let title = tag.title.unwrap_or_else(|| file_stem(file));
        let album = tag.album.unwrap_or(folder_title);
        let artist = tag
            .artist
            .unwrap_or_else(|| parent_folder.unwrap_or(UNKNOWN_ARTIST).trim().to_string());
        let (created_at, updated_at) = file_times(file);

        Some(RawTrack {
            id: stable_id(&relpath),
            title,
            album,
            artist,
            album_artist: tag.album_artist.unwrap_or_default(),
            compilation: tag.compilation,
            path: relpath,
            created_at,
            updated_at,
            year: tag.year.or(folder_year),
            track_no: tag.track_no,
            disc_no: tag.disc_no,
            duration_ms: tag.duration_ms,
        })
    }
}

impl TrackSource for FolderLoader {
    fn load_tracks(&self, root: &Path) -> Vec<RawTrack> {
        let files = audio_files(root);
        info!("Found {} audio files under {:?}", files.len(), root);
        files
            .iter()
            .filter_map(|file| self.load_file(root, file))
            .collect()
    }
}

fn audio_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if entry.file_type().is_file() && is_audio(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    files
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown Track".to_string())
}

/// Creation and modification times in seconds. Zero when the filesystem cannot say.
fn file_times(path: &Path) -> (u64, u64) {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            warn!("Failed to stat {:?}: {}", path, err);
            return (0, 0);
        }
    };
    let modified = meta.modified().ok().map(epoch_secs).unwrap_or(0);
    let created = meta.created().ok().map(epoch_secs).unwrap_or(modified);
    (created, modified)
}

fn epoch_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn split_title_year(input: &str) -> (String, Option<i32>) {
    let trimmed = input.trim();
    for (open, close) in [('(', ')'), ('[', ']')] {
        if let Some((title, year)) = split_year_suffix(trimmed, open, close) {
            return (title.to_string(), Some(year));
        }
    }
    if trimmed.is_empty() {
        return (UNKNOWN_ALBUM.to_string(), None);
    }
    (trimmed.to_string(), None)
}

fn split_year_suffix(input: &str, open: char, close: char) -> Option<(&str, i32)> {
    let inner = input.strip_suffix(close)?;
    let open_idx = inner.rfind(open)?;
    let year_str = inner[open_idx + open.len_utf8()..].trim();
    if year_str.len() != 4 || !year_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year = year_str.parse::<i32>().ok()?;
    let title = inner[..open_idx].trim_end();
    if title.is_empty() {
        return None;
    }
    Some((title, year))
}
