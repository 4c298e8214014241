use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use library::{FolderLoader, ScanError, ScanSummary, TrackSource};
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

use crate::state::{AppState, LibraryStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    AlreadyRunning,
    Unconfigured,
    MissingRoot(PathBuf),
}

impl fmt::Display for TriggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerError::AlreadyRunning => write!(f, "a scan is already running"),
            TriggerError::Unconfigured => write!(f, "music directory not configured"),
            TriggerError::MissingRoot(path) => write!(f, "music directory not found: {:?}", path),
        }
    }
}

impl std::error::Error for TriggerError {}

impl From<ScanError> for TriggerError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::AlreadyRunning => TriggerError::AlreadyRunning,
        }
    }
}

/// Completion handle of a triggered scan. Dropping it does not stop the scan.
pub struct ScanHandle {
    task: JoinHandle<Result<ScanSummary, JoinError>>,
}

impl ScanHandle {
    pub async fn wait(self) -> Result<ScanSummary, JoinError> {
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err),
        }
    }
}

/// Scans the configured music folder in the background.
pub fn start_scan(state: &AppState) -> Result<ScanHandle, TriggerError> {
    start_scan_with(state, Arc::new(FolderLoader::new()))
}

pub fn start_scan_with(
    state: &AppState,
    source: Arc<dyn TrackSource>,
) -> Result<ScanHandle, TriggerError> {
    let settings = match state.config.read().scan_settings(&state.config_path) {
        Some(settings) => settings,
        None => {
            *state.status.write() = LibraryStatus::Unconfigured;
            return Err(TriggerError::Unconfigured);
        }
    };
    if !settings.music_root.exists() {
        let root = settings.music_root;
        set_library_missing(state, root.clone());
        return Err(TriggerError::MissingRoot(root));
    }

    state.scanner.configure(settings);
    let run = state.scanner.begin()?;
    *state.status.write() = LibraryStatus::Scanning {
        started: SystemTime::now(),
    };

    let state = state.clone();
    let task = tokio::spawn(async move {
        let result = tokio::task::spawn_blocking(move || run.run(source.as_ref())).await;
        match result {
            Ok(summary) => {
                let stats = &summary.stats;
                if summary.is_complete() {
                    info!(
                        "Library ready: {} artists, {} albums, {} tracks",
                        stats.artists, stats.albums, stats.tracks
                    );
                    *state.status.write() = LibraryStatus::Ready(summary.clone());
                } else {
                    warn!(
                        "Library scan finished without saving the index: {} artists, {} albums, {} tracks",
                        stats.artists, stats.albums, stats.tracks
                    );
                    *state.status.write() = LibraryStatus::Incomplete(summary.clone());
                }
                Ok(summary)
            }
            Err(err) => {
                let message = err.to_string();
                warn!("Library scan join error: {}", message);
                *state.status.write() = LibraryStatus::Error(message);
                Err(err)
            }
        }
    });

    Ok(ScanHandle { task })
}

pub fn set_library_missing(state: &AppState, path: PathBuf) {
    warn!("Music directory not found: {:?}", path);
    *state.status.write() = LibraryStatus::Missing(path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexerConfig;
    use common::RawTrack;
    use library::Catalog;
    use std::fs;
    use std::path::Path;
    use std::sync::mpsc;
    use std::sync::Mutex;

    fn state_for(dir: &Path, music_root: &str) -> AppState {
        let config = IndexerConfig {
            music_root: music_root.to_string(),
            ..IndexerConfig::default()
        };
        let catalog = Catalog::open(&dir.join("library.redb")).unwrap();
        AppState::new(dir.join("config.yaml"), config, catalog)
    }

    fn tracks() -> Vec<RawTrack> {
        vec![RawTrack {
            title: "Roads".to_string(),
            artist: "Portishead".to_string(),
            album: "Dummy".to_string(),
            path: "portishead/dummy/roads.mp3".to_string(),
            ..RawTrack::default()
        }]
    }

    /// Holds the scan inside the source until the test releases it.
    struct GatedSource {
        gate: Mutex<mpsc::Receiver<()>>,
        tracks: Vec<RawTrack>,
    }

    impl TrackSource for GatedSource {
        fn load_tracks(&self, _root: &Path) -> Vec<RawTrack> {
            if let Ok(gate) = self.gate.lock() {
                let _ = gate.recv();
            }
            self.tracks.clone()
        }
    }

    #[tokio::test]
    async fn scan_completes_and_marks_library_ready() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("music")).unwrap();
        let state = state_for(dir.path(), "music");
        let source: Arc<dyn TrackSource> = Arc::new(tracks());

        let summary = start_scan_with(&state, source).unwrap().wait().await.unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.stats.tracks, 1);
        assert_eq!(state.status(), LibraryStatus::Ready(summary.clone()));
        assert_eq!(state.catalog.last_scan().unwrap(), summary.last_scan);
        assert_eq!(state.catalog.get_index("P").unwrap().unwrap().artists.len(), 1);
    }

    #[tokio::test]
    async fn overlapping_trigger_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("music")).unwrap();
        let state = state_for(dir.path(), "music");
        let (release, gate) = mpsc::channel();
        let gated: Arc<dyn TrackSource> = Arc::new(GatedSource {
            gate: Mutex::new(gate),
            tracks: tracks(),
        });
        let empty: Arc<dyn TrackSource> = Arc::new(Vec::<RawTrack>::new());

        let handle = start_scan_with(&state, gated).unwrap();
        assert!(matches!(state.status(), LibraryStatus::Scanning { .. }));
        assert_eq!(
            start_scan_with(&state, Arc::clone(&empty)).err(),
            Some(TriggerError::AlreadyRunning)
        );

        release.send(()).unwrap();
        let summary = handle.wait().await.unwrap();
        assert_eq!(summary.tracks_seen, 1);

        let again = start_scan_with(&state, empty).unwrap().wait().await.unwrap();
        assert_eq!(again.tracks_seen, 0);
        assert!(again.last_scan > summary.last_scan);
    }

    #[tokio::test]
    async fn dropped_handle_still_finishes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("music")).unwrap();
        let state = state_for(dir.path(), "music");
        let source: Arc<dyn TrackSource> = Arc::new(tracks());

        drop(start_scan_with(&state, source).unwrap());

        let empty: Arc<dyn TrackSource> = Arc::new(Vec::<RawTrack>::new());
        let mut attempts = 0;
        let handle = loop {
            match start_scan_with(&state, Arc::clone(&empty)) {
                Ok(handle) => break handle,
                Err(TriggerError::AlreadyRunning) if attempts < 2000 => {
                    attempts += 1;
                    tokio::task::yield_now().await;
                    std::thread::sleep(std::time::Duration::from_millis(2));
                }
                Err(err) => panic!("unexpected trigger error: {}", err),
            }
        };
        handle.wait().await.unwrap();
        assert_eq!(state.catalog.stats().unwrap().tracks, 1);
    }

    #[tokio::test]
    async fn missing_or_unset_root_is_reported() {
        let dir = tempfile::tempdir().unwrap();

        let unset = state_for(dir.path(), "");
        assert_eq!(start_scan(&unset).err(), Some(TriggerError::Unconfigured));
        assert_eq!(unset.status(), LibraryStatus::Unconfigured);

        let missing = state_for(&dir.path().join("other"), "absent");
        let expected = dir.path().join("other").join("absent");
        assert_eq!(
            start_scan(&missing).err(),
            Some(TriggerError::MissingRoot(expected.clone()))
        );
        assert_eq!(missing.status(), LibraryStatus::Missing(expected));
    }

    #[tokio::test]
    async fn default_source_reads_the_music_folder() {
        let dir = tempfile::tempdir().unwrap();
        let album = dir.path().join("music").join("Air").join("Moon Safari");
        fs::create_dir_all(&album).unwrap();
        fs::write(album.join("01 La Femme d'Argent.mp3"), b"untagged").unwrap();
        let state = state_for(dir.path(), "music");

        let summary = start_scan(&state).unwrap().wait().await.unwrap();

        assert_eq!(summary.tracks_seen, 1);
        assert_eq!(state.catalog.get_index("A").unwrap().unwrap().artists[0].artist, "Air");
    }
}
