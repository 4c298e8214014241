//! Entity repositories.
//!
//! The scan pipeline only sees the [`Repository`] and [`PropertyRepository`] traits.
//! The redb implementations keep one table per entity type with bincode values,
//! and every `put` is an upsert committed in its own write transaction.

use std::marker::PhantomData;
use std::sync::Arc;

use common::{stable_id, stable_id_of, Album, Artist, ArtistIndex, Track};
use redb::{Database, ReadableTable, TableDefinition, TableError};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{decode_value, encode_value, LibraryError};

const ARTISTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("artists");
const ALBUMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("albums");
const TRACKS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tracks");
const ARTIST_INDEX_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("artist_index");
const PROPERTIES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("properties");

pub trait Repository: Send + Sync {
    type Entity;

    /// Inserts or replaces the entity. Assigns its id first when it has none.
    fn put(&self, entity: &mut Self::Entity) -> Result<(), LibraryError>;

    fn get(&self, id: &str) -> Result<Option<Self::Entity>, LibraryError>;

    fn count_all(&self) -> Result<usize, LibraryError>;
}

pub trait PropertyRepository: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, LibraryError>;

    fn put(&self, key: &str, value: &str) -> Result<(), LibraryError>;
}

/// A record type with its own table and a repository-derived identity.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]>;

    fn id(&self) -> &str;

    /// Derives the id from the entity's natural key when it is still empty.
    fn assign_id(&mut self);
}

impl Entity for Artist {
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> = ARTISTS_TABLE;

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self) {
        if self.id.is_empty() {
            self.id = stable_id(self.name.trim());
        }
    }
}

impl Entity for Album {
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> = ALBUMS_TABLE;

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self) {
        if self.id.is_empty() {
            self.id = stable_id_of(&[&self.artist_id, self.name.trim()]);
        }
    }
}

impl Entity for Track {
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> = TRACKS_TABLE;

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self) {
        if self.id.is_empty() {
            self.id = stable_id(&self.path);
        }
    }
}

impl Entity for ArtistIndex {
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> = ARTIST_INDEX_TABLE;

    fn id(&self) -> &str {
        &self.id
    }

    // The group label is the id.
    fn assign_id(&mut self) {}
}

pub struct RedbRepository<E> {
    db: Arc<Database>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for RedbRepository<E> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> RedbRepository<E> {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    /// All records in key order.
    pub fn list(&self) -> Result<Vec<E>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(E::TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut items = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            items.push(decode_value(entry.1.value())?);
        }
        Ok(items)
    }
}

impl<E: Entity> Repository for RedbRepository<E> {
    type Entity = E;

    fn put(&self, entity: &mut E) -> Result<(), LibraryError> {
        entity.assign_id();
        let bytes = encode_value(&*entity)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(E::TABLE)?;
            table.insert(entity.id(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<E>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(E::TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let entity = match table.get(id)? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(entity)
    }

    fn count_all(&self) -> Result<usize, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(E::TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        Ok(table.len()? as usize)
    }
}

#[derive(Clone)]
pub struct RedbProperties {
    db: Arc<Database>,
}

impl RedbProperties {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl PropertyRepository for RedbProperties {
    fn get(&self, key: &str) -> Result<Option<String>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(PROPERTIES_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let value = table.get(key)?.map(|value| value.value().to_string());
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), LibraryError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PROPERTIES_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// The stores one scan writes through.
#[derive(Clone)]
pub struct Repositories {
    pub artists: Arc<dyn Repository<Entity = Artist>>,
    pub albums: Arc<dyn Repository<Entity = Album>>,
    pub tracks: Arc<dyn Repository<Entity = Track>>,
    pub indexes: Arc<dyn Repository<Entity = ArtistIndex>>,
    pub properties: Arc<dyn PropertyRepository>,
}

impl Repositories {
    pub fn redb(db: Arc<Database>) -> Self {
        Self {
            artists: Arc::new(RedbRepository::<Artist>::new(Arc::clone(&db))),
            albums: Arc::new(RedbRepository::<Album>::new(Arc::clone(&db))),
            tracks: Arc::new(RedbRepository::<Track>::new(Arc::clone(&db))),
            indexes: Arc::new(RedbRepository::<ArtistIndex>::new(Arc::clone(&db))),
            properties: Arc::new(RedbProperties::new(db)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Catalog;
    use common::ArtistInfo;

    fn temp_db() -> (tempfile::TempDir, Arc<Database>) {
        let dir = tempfile::tempdir().unwrap();
        let db = Catalog::open_db(&dir.path().join("catalog.redb")).unwrap();
        (dir, db)
    }

    #[test]
    fn put_assigns_stable_ids_and_upserts() {
        let (_dir, db) = temp_db();
        let repo = RedbRepository::<Artist>::new(Arc::clone(&db));

        let mut first = Artist {
            id: String::new(),
            name: "Portishead".to_string(),
        };
        repo.put(&mut first).unwrap();
        assert_eq!(first.id, stable_id("Portishead"));

        let mut again = Artist {
            id: String::new(),
            name: " Portishead ".to_string(),
        };
        repo.put(&mut again).unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(repo.count_all().unwrap(), 1);
        assert_eq!(repo.get(&first.id).unwrap().unwrap().name, " Portishead ");
    }

    #[test]
    fn album_identity_includes_artist() {
        let (_dir, db) = temp_db();
        let repo = RedbRepository::<Album>::new(db);

        let mut one = Album {
            artist_id: "artist-a".to_string(),
            name: "Greatest Hits".to_string(),
            ..Album::default()
        };
        let mut two = Album {
            artist_id: "artist-b".to_string(),
            name: "Greatest Hits".to_string(),
            ..Album::default()
        };
        repo.put(&mut one).unwrap();
        repo.put(&mut two).unwrap();
        assert_ne!(one.id, two.id);
        assert_eq!(repo.count_all().unwrap(), 2);
    }

    #[test]
    fn track_keeps_existing_id() {
        let (_dir, db) = temp_db();
        let repo = RedbRepository::<Track>::new(db);
        let mut track = Track {
            id: "fixed".to_string(),
            path: "a/b.mp3".to_string(),
            ..Track::default()
        };
        repo.put(&mut track).unwrap();
        assert_eq!(track.id, "fixed");

        let mut unnamed = Track {
            path: "a/c.mp3".to_string(),
            ..Track::default()
        };
        repo.put(&mut unnamed).unwrap();
        assert_eq!(unnamed.id, stable_id("a/c.mp3"));
    }

    #[test]
    fn empty_tables_count_zero() {
        let (_dir, db) = temp_db();
        let repo = RedbRepository::<ArtistIndex>::new(db);
        assert_eq!(repo.count_all().unwrap(), 0);
        assert!(repo.get("A").unwrap().is_none());
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn index_records_replace_by_group() {
        let (_dir, db) = temp_db();
        let repo = RedbRepository::<ArtistIndex>::new(db);
        let mut group = ArtistIndex {
            id: "B".to_string(),
            artists: vec![ArtistInfo {
                artist_id: "1".to_string(),
                artist: "Beck".to_string(),
            }],
        };
        repo.put(&mut group).unwrap();
        group.artists.clear();
        repo.put(&mut group).unwrap();

        let stored = repo.list().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].artists.is_empty());
    }

    #[test]
    fn properties_round_trip() {
        let (_dir, db) = temp_db();
        let props = RedbProperties::new(db);
        assert_eq!(props.get("last_scan").unwrap(), None);
        props.put("last_scan", "10").unwrap();
        props.put("last_scan", "20").unwrap();
        assert_eq!(props.get("last_scan").unwrap().as_deref(), Some("20"));
    }
}
