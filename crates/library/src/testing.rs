//! In-memory repositories for unit tests, with a shared write journal and
//! per-repository failure injection.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Arc;

use common::{Album, Artist, ArtistIndex, Track};
use parking_lot::Mutex;

use crate::{Entity, LibraryError, PropertyRepository, Repositories, Repository};

pub type Journal = Arc<Mutex<Vec<String>>>;

pub struct MemoryRepository<E> {
    label: &'static str,
    rows: Mutex<BTreeMap<String, E>>,
    journal: Journal,
    fail_when: Option<fn(&E) -> bool>,
}

impl<E: Entity + Clone> MemoryRepository<E> {
    pub fn new(label: &'static str, journal: Journal) -> Self {
        Self {
            label,
            rows: Mutex::new(BTreeMap::new()),
            journal,
            fail_when: None,
        }
    }

    /// Rejects writes for which `predicate` holds, leaving the entity's id untouched.
    pub fn failing_when(mut self, predicate: fn(&E) -> bool) -> Self {
        self.fail_when = Some(predicate);
        self
    }

    pub fn all(&self) -> Vec<E> {
        self.rows.lock().values().cloned().collect()
    }
}

impl<E: Entity + Clone> Repository for MemoryRepository<E> {
    type Entity = E;

    fn put(&self, entity: &mut E) -> Result<(), LibraryError> {
        if self.fail_when.map(|fail| fail(entity)).unwrap_or(false) {
            self.journal.lock().push(format!("{}!", self.label));
            return Err(LibraryError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("{} write rejected", self.label),
            )));
        }
        entity.assign_id();
        self.journal
            .lock()
            .push(format!("{}:{}", self.label, entity.id()));
        self.rows
            .lock()
            .insert(entity.id().to_string(), entity.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<E>, LibraryError> {
        Ok(self.rows.lock().get(id).cloned())
    }

    fn count_all(&self) -> Result<usize, LibraryError> {
        Ok(self.rows.lock().len())
    }
}

#[derive(Default)]
pub struct MemoryProperties {
    values: Mutex<HashMap<String, String>>,
}

impl PropertyRepository for MemoryProperties {
    fn get(&self, key: &str) -> Result<Option<String>, LibraryError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), LibraryError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub struct MemoryStore {
    pub journal: Journal,
    pub artists: Arc<MemoryRepository<Artist>>,
    pub albums: Arc<MemoryRepository<Album>>,
    pub tracks: Arc<MemoryRepository<Track>>,
    pub indexes: Arc<MemoryRepository<ArtistIndex>>,
    pub properties: Arc<MemoryProperties>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        Self {
            artists: Arc::new(MemoryRepository::new("artist", Arc::clone(&journal))),
            albums: Arc::new(MemoryRepository::new("album", Arc::clone(&journal))),
            tracks: Arc::new(MemoryRepository::new("track", Arc::clone(&journal))),
            indexes: Arc::new(MemoryRepository::new("index", Arc::clone(&journal))),
            properties: Arc::new(MemoryProperties::default()),
            journal,
        }
    }

    pub fn with_albums(mut self, albums: MemoryRepository<Album>) -> Self {
        self.albums = Arc::new(albums);
        self
    }

    pub fn with_artists(mut self, artists: MemoryRepository<Artist>) -> Self {
        self.artists = Arc::new(artists);
        self
    }

    pub fn with_indexes(mut self, indexes: MemoryRepository<ArtistIndex>) -> Self {
        self.indexes = Arc::new(indexes);
        self
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            artists: self.artists.clone(),
            albums: self.albums.clone(),
            tracks: self.tracks.clone(),
            indexes: self.indexes.clone(),
            properties: self.properties.clone(),
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }
}
