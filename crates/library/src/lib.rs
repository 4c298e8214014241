use std::fs;
use std::path::Path;
use std::sync::Arc;

use bincode;
use common::{Album, Artist, ArtistIndex, Track};
use redb::{CommitError, Database, DatabaseError, StorageError, TableError, TransactionError};
use serde::{Deserialize, Serialize};

mod index;
mod loader;
mod normalize;
mod persist;
mod scan;
mod store;
#[cfg(test)]
mod testing;

pub use index::IndexBuilder;
pub use loader::FolderLoader;
pub use normalize::{normalize, NormalizedTrack};
pub use persist::{persist, WriteFailure, WriteStep, WRITE_PLAN};
pub use scan::{
    ScanError, ScanPhase, ScanRun, ScanSettings, ScanSummary, Scanner, TrackSource,
    LAST_SCAN_KEY,
};
pub use store::{
    Entity, PropertyRepository, RedbProperties, RedbRepository, Repositories, Repository,
};

/// Read side of the catalogue database, plus the repositories a scan writes through.
#[derive(Clone)]
pub struct Catalog {
    db: Arc<Database>,
}

impl Catalog {
    pub fn open(path: &Path) -> Result<Self, LibraryError> {
        Ok(Self::with_db(Self::open_db(path)?))
    }

    pub fn open_db(path: &Path) -> Result<Arc<Database>, LibraryError> {
        let db = open_or_create_db(path)?;
        Ok(Arc::new(db))
    }

    pub fn with_db(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn repositories(&self) -> Repositories {
        Repositories::redb(Arc::clone(&self.db))
    }

    pub fn stats(&self) -> Result<LibraryStats, LibraryError> {
        Ok(LibraryStats {
            artists: RedbRepository::<Artist>::new(self.db()).count_all()?,
            albums: RedbRepository::<Album>::new(self.db()).count_all()?,
            tracks: RedbRepository::<Track>::new(self.db()).count_all()?,
        })
    }

    pub fn get_artist(&self, artist_id: &str) -> Result<Option<Artist>, LibraryError> {
        RedbRepository::<Artist>::new(self.db()).get(artist_id)
    }

    pub fn get_album(&self, album_id: &str) -> Result<Option<Album>, LibraryError> {
        RedbRepository::<Album>::new(self.db()).get(album_id)
    }

    pub fn get_track(&self, track_id: &str) -> Result<Option<Track>, LibraryError> {
        RedbRepository::<Track>::new(self.db()).get(track_id)
    }

    pub fn list_artist_albums(&self, artist_id: &str) -> Result<Vec<Album>, LibraryError> {
        let mut albums: Vec<Album> = RedbRepository::<Album>::new(self.db())
            .list()?
            .into_iter()
            .filter(|album| album.artist_id == artist_id)
            .collect();
        albums.sort_by(|a, b| {
            a.year
                .unwrap_or(i32::MAX)
                .cmp(&b.year.unwrap_or(i32::MAX))
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(albums)
    }

    pub fn list_album_tracks(&self, album_id: &str) -> Result<Vec<Track>, LibraryError> {
        let mut tracks: Vec<Track> = RedbRepository::<Track>::new(self.db())
            .list()?
            .into_iter()
            .filter(|track| track.album_id == album_id)
            .collect();
        tracks.sort_by(|a, b| {
            let disc_a = a.disc_no.unwrap_or(u16::MAX);
            let disc_b = b.disc_no.unwrap_or(u16::MAX);
            let track_a = a.track_no.unwrap_or(u16::MAX);
            let track_b = b.track_no.unwrap_or(u16::MAX);
            disc_a
                .cmp(&disc_b)
                .then_with(|| track_a.cmp(&track_b))
                .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(tracks)
    }

    /// Every persisted index group, ordered by group label.
    pub fn list_indexes(&self) -> Result<Vec<ArtistIndex>, LibraryError> {
        RedbRepository::<ArtistIndex>::new(self.db()).list()
    }

    pub fn get_index(&self, group: &str) -> Result<Option<ArtistIndex>, LibraryError> {
        RedbRepository::<ArtistIndex>::new(self.db()).get(group)
    }

    /// Milliseconds since the epoch of the last fully successful scan.
    pub fn last_scan(&self) -> Result<Option<u64>, LibraryError> {
        let value = match RedbProperties::new(self.db()).get(LAST_SCAN_KEY)? {
            Some(value) => value,
            None => return Ok(None),
        };
        let millis = value.trim().parse::<u64>().map_err(|_| LibraryError::Property {
            key: LAST_SCAN_KEY.to_string(),
            value,
        })?;
        Ok(Some(millis))
    }

    pub fn db(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
}

#[derive(Debug)]
pub enum LibraryError {
    Io(std::io::Error),
    Redb(redb::Error),
    Bincode(Box<bincode::ErrorKind>),
    Property { key: String, value: String },
}

impl std::fmt::Display for LibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryError::Io(err) => write!(f, "io error: {}", err),
            LibraryError::Redb(err) => write!(f, "db error: {}", err),
            LibraryError::Bincode(err) => write!(f, "bincode error: {}", err),
            LibraryError::Property { key, value } => {
                write!(f, "invalid value for property {}: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Io(err)
    }
}

impl From<redb::Error> for LibraryError {
    fn from(err: redb::Error) -> Self {
        LibraryError::Redb(err)
    }
}

impl From<DatabaseError> for LibraryError {
    fn from(err: DatabaseError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<TableError> for LibraryError {
    fn from(err: TableError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<TransactionError> for LibraryError {
    fn from(err: TransactionError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<StorageError> for LibraryError {
    fn from(err: StorageError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<CommitError> for LibraryError {
    fn from(err: CommitError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<Box<bincode::ErrorKind>> for LibraryError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        LibraryError::Bincode(err)
    }
}

fn open_or_create_db(path: &Path) -> Result<Database, LibraryError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    if path.exists() {
        Ok(Database::open(path)?)
    } else {
        Ok(Database::create(path)?)
    }
}

pub(crate) fn encode_value<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, LibraryError> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode_value<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, LibraryError> {
    Ok(bincode::deserialize(bytes)?)
}
