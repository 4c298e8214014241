use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use common::{Articles, IndexGroups, RawTrack};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    normalize, persist, IndexBuilder, LibraryStats, PropertyRepository, Repositories, Repository,
};

/// Property key holding the completion time of the last fully successful scan, in
/// milliseconds since the epoch.
pub const LAST_SCAN_KEY: &str = "last_scan";

/// Produces the raw records of one scan, in the order they should be processed.
///
/// Sources are best effort: problems with individual files are handled inside the
/// source and never surface here.
pub trait TrackSource: Send + Sync {
    fn load_tracks(&self, root: &Path) -> Vec<RawTrack>;
}

impl TrackSource for Vec<RawTrack> {
    fn load_tracks(&self, _root: &Path) -> Vec<RawTrack> {
        self.clone()
    }
}

#[derive(Clone, Debug)]
pub struct ScanSettings {
    pub music_root: PathBuf,
    pub index_groups: IndexGroups,
    pub articles: Articles,
}

impl ScanSettings {
    pub fn new(music_root: PathBuf) -> Self {
        Self {
            music_root,
            index_groups: IndexGroups::default(),
            articles: Articles::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Running,
    Finalizing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    AlreadyRunning,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::AlreadyRunning => write!(f, "a scan is already running"),
        }
    }
}

impl std::error::Error for ScanError {}

/// Outcome of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub tracks_seen: usize,
    pub write_failures: usize,
    pub index_groups: usize,
    pub stats: LibraryStats,
    pub last_scan: Option<u64>,
    pub index_error: Option<String>,
}

impl ScanSummary {
    /// True when the index was flushed and the completion time recorded.
    pub fn is_complete(&self) -> bool {
        self.last_scan.is_some()
    }
}

/// Runs scans against one set of repositories, one at a time.
pub struct Scanner {
    settings: RwLock<ScanSettings>,
    repos: Repositories,
    phase: Arc<Mutex<ScanPhase>>,
}

impl Scanner {
    pub fn new(settings: ScanSettings, repos: Repositories) -> Self {
        Self {
            settings: RwLock::new(settings),
            repos,
            phase: Arc::new(Mutex::new(ScanPhase::Idle)),
        }
    }

    pub fn settings(&self) -> ScanSettings {
        self.settings.read().clone()
    }

    /// Replaces the settings used by the next run. A run already in flight keeps
    /// the settings it started with.
    pub fn configure(&self, settings: ScanSettings) {
        *self.settings.write() = settings;
    }

    pub fn phase(&self) -> ScanPhase {
        *self.phase.lock()
    }

    /// Claims the scanner for one run and captures the current settings.
    pub fn begin(&self) -> Result<ScanRun, ScanError> {
        let mut phase = self.phase.lock();
        if *phase != ScanPhase::Idle {
            return Err(ScanError::AlreadyRunning);
        }
        *phase = ScanPhase::Running;
        Ok(ScanRun {
            settings: self.settings(),
            repos: self.repos.clone(),
            phase: Arc::clone(&self.phase),
        })
    }

    pub fn scan(&self, source: &dyn TrackSource) -> Result<ScanSummary, ScanError> {
        Ok(self.begin()?.run(source))
    }
}

/// A claimed run. Dropping it returns the scanner to idle.
pub struct ScanRun {
    settings: ScanSettings,
    repos: Repositories,
    phase: Arc<Mutex<ScanPhase>>,
}

impl ScanRun {
    pub fn run(self, source: &dyn TrackSource) -> ScanSummary {
        let started = Instant::now();
        let root = &self.settings.music_root;
        info!("Scanning {:?}", root);

        let records = source.load_tracks(root);
        let mut index = IndexBuilder::new(
            self.settings.index_groups.clone(),
            self.settings.articles.clone(),
        );
        let mut summary = ScanSummary {
            tracks_seen: records.len(),
            ..ScanSummary::default()
        };

        for raw in &records {
            let mut entities = normalize(raw);
            let failures = persist(&self.repos, &mut entities);
            summary.write_failures += failures.len();
            index.collect(&entities.artist);
        }

        *self.phase.lock() = ScanPhase::Finalizing;
        let group_count = index.group_count();
        let flushed = match index.flush(self.repos.indexes.as_ref()) {
            Ok(written) => {
                summary.index_groups = written;
                true
            }
            Err(err) => {
                error!("Failed to save artist index: {}", err);
                summary.index_error = Some(err.to_string());
                false
            }
        };

        summary.stats = self.read_stats();
        info!(
            "Scanned {} tracks in {:?}: {} artists, {} albums, {} tracks stored, {} index groups",
            summary.tracks_seen,
            started.elapsed(),
            summary.stats.artists,
            summary.stats.albums,
            summary.stats.tracks,
            group_count
        );
        if summary.write_failures > 0 {
            warn!("{} entity writes failed", summary.write_failures);
        }

        if flushed {
            summary.last_scan = self.record_last_scan();
        }
        summary
    }

    fn read_stats(&self) -> LibraryStats {
        LibraryStats {
            artists: count_or_zero("artists", self.repos.artists.as_ref()),
            albums: count_or_zero("albums", self.repos.albums.as_ref()),
            tracks: count_or_zero("tracks", self.repos.tracks.as_ref()),
        }
    }

    fn record_last_scan(&self) -> Option<u64> {
        let properties = self.repos.properties.as_ref();
        let previous = match properties.get(LAST_SCAN_KEY) {
            Ok(value) => value.and_then(|v| v.trim().parse::<u64>().ok()),
            Err(err) => {
                warn!("Failed to read {}: {}", LAST_SCAN_KEY, err);
                None
            }
        };
        let millis = next_scan_millis(now_millis(), previous);
        match properties.put(LAST_SCAN_KEY, &millis.to_string()) {
            Ok(()) => Some(millis),
            Err(err) => {
                error!("Failed to record {}: {}", LAST_SCAN_KEY, err);
                None
            }
        }
    }
}

impl Drop for ScanRun {
    fn drop(&mut self) {
        *self.phase.lock() = ScanPhase::Idle;
    }
}

fn count_or_zero<R: Repository + ?Sized>(label: &str, repo: &R) -> usize {
    match repo.count_all() {
        Ok(count) => count,
        Err(err) => {
            warn!("Failed to count {}: {}", label, err);
            0
        }
    }
}

fn next_scan_millis(now: u64, previous: Option<u64>) -> u64 {
    match previous {
        Some(prev) => now.max(prev.saturating_add(1)),
        None => now,
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
