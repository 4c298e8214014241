use common::{Album, Artist, RawTrack, Track};

/// The three records derived from one discovered file. Ids are filled in while
/// persisting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedTrack {
    pub track: Track,
    pub album: Album,
    pub artist: Artist,
}

pub fn normalize(raw: &RawTrack) -> NormalizedTrack {
    let track = Track {
        id: raw.id.clone(),
        album_id: String::new(),
        artist_id: String::new(),
        title: raw.title.clone(),
        album: raw.album.clone(),
        artist: raw.artist.clone(),
        album_artist: raw.album_artist.clone(),
        compilation: raw.compilation,
        path: raw.path.clone(),
        track_no: raw.track_no,
        disc_no: raw.disc_no,
        duration_ms: raw.duration_ms,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
    };

    let album = Album {
        id: String::new(),
        artist_id: String::new(),
        name: raw.album.clone(),
        year: raw.year,
        compilation: raw.compilation,
    };

    let artist = Artist {
        id: String::new(),
        name: raw.real_artist().to_string(),
    };

    NormalizedTrack {
        track,
        album,
        artist,
    }
}
