use std::fmt;
use std::path::Path;
use std::time::Duration;

use lofty::error::LoftyError;
use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};

/// Tag values relevant to cataloguing. Missing or blank tags are `None`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub compilation: bool,
    pub year: Option<i32>,
    pub track_no: Option<u16>,
    pub disc_no: Option<u16>,
    pub duration_ms: Option<u32>,
}

#[derive(Debug)]
pub enum MetadataError {
    Io(std::io::Error),
    Lofty(LoftyError),
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataError::Io(err) => write!(f, "io error: {}", err),
            MetadataError::Lofty(err) => write!(f, "tag error: {}", err),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Io(err)
    }
}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

pub fn read_tags(path: &Path) -> Result<TagInfo, MetadataError> {
    let tagged_file = lofty::read_from_path(path)?;

    let mut info = TagInfo {
        duration_ms: duration_millis(tagged_file.properties().duration()),
        ..TagInfo::default()
    };

    let tag = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        Some(tag) => tag,
        None => return Ok(info),
    };
    let text = |key: &ItemKey| {
        tag.get_string(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    info.title = text(&ItemKey::TrackTitle);
    info.album = text(&ItemKey::AlbumTitle);
    info.album_artist = text(&ItemKey::AlbumArtist);
    info.artist = text(&ItemKey::TrackArtist).or_else(|| info.album_artist.clone());
    info.compilation = text(&ItemKey::FlagCompilation)
        .map(|value| parse_flag(&value))
        .unwrap_or(false);
    info.year = text(&ItemKey::Year).and_then(|value| parse_year(&value));
    info.track_no = text(&ItemKey::TrackNumber).and_then(|value| parse_position(&value));
    info.disc_no = text(&ItemKey::DiscNumber).and_then(|value| parse_position(&value));

    Ok(info)
}

fn duration_millis(duration: Duration) -> Option<u32> {
    let millis = duration.as_millis();
    if millis == 0 {
        None
    } else {
        Some(millis.min(u128::from(u32::MAX)) as u32)
    }
}

/// "3" and "3/12" both give 3.
fn parse_position(text: &str) -> Option<u16> {
    let head = text.split('/').next().unwrap_or(text).trim();
    head.parse().ok().filter(|value| *value > 0)
}

/// First run of at least four digits, e.g. "2004-05-01" gives 2004.
fn parse_year(text: &str) -> Option<i32> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|run| run.len() >= 4)
        .and_then(|run| run.get(..4))
        .and_then(|year| year.parse().ok())
}

fn parse_flag(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}
