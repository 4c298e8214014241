use std::fmt;

use tracing::warn;

use crate::{LibraryError, NormalizedTrack, Repositories, Repository};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteStep {
    Artist,
    Album,
    Track,
}

impl fmt::Display for WriteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteStep::Artist => "artist",
            WriteStep::Album => "album",
            WriteStep::Track => "track",
        };
        f.write_str(name)
    }
}

/// Parents are written before children so that each child can carry its parent's id.
pub const WRITE_PLAN: [WriteStep; 3] = [WriteStep::Artist, WriteStep::Album, WriteStep::Track];

#[derive(Debug)]
pub struct WriteFailure {
    pub step: WriteStep,
    pub error: LibraryError,
}

/// Writes one normalized track following [`WRITE_PLAN`].
///
/// A failed step is logged and reported but never skips the remaining steps; a child
/// then carries whatever id its parent ended up with, which may be empty.
pub fn persist(repos: &Repositories, entities: &mut NormalizedTrack) -> Vec<WriteFailure> {
    let mut failures = Vec::new();
    for step in WRITE_PLAN {
        let result = match step {
            WriteStep::Artist => repos.artists.put(&mut entities.artist),
            WriteStep::Album => {
                entities.album.artist_id = entities.artist.id.clone();
                repos.albums.put(&mut entities.album)
            }
            WriteStep::Track => {
                entities.track.album_id = entities.album.id.clone();
                entities.track.artist_id = entities.artist.id.clone();
                repos.tracks.put(&mut entities.track)
            }
        };
        if let Err(error) = result {
            warn!(
                "Failed to store {} for {:?}: {}",
                step, entities.track.path, error
            );
            failures.push(WriteFailure { step, error });
        }
    }
    failures
}
