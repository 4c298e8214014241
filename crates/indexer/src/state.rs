use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use library::{Catalog, ScanSummary, Scanner};
use parking_lot::RwLock;

use crate::config::IndexerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config_path: PathBuf,
    pub config: Arc<RwLock<IndexerConfig>>,
    pub catalog: Catalog,
    pub scanner: Arc<Scanner>,
    pub status: Arc<RwLock<LibraryStatus>>,
}

impl AppState {
    pub fn new(config_path: PathBuf, config: IndexerConfig, catalog: Catalog) -> Self {
        let settings = config
            .scan_settings(&config_path)
            .unwrap_or_else(|| library::ScanSettings::new(PathBuf::new()));
        let scanner = Scanner::new(settings, catalog.repositories());
        Self {
            config_path,
            config: Arc::new(RwLock::new(config)),
            catalog,
            scanner: Arc::new(scanner),
            status: Arc::new(RwLock::new(LibraryStatus::Unconfigured)),
        }
    }

    pub fn status(&self) -> LibraryStatus {
        self.status.read().clone()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LibraryStatus {
    Unconfigured,
    Missing(PathBuf),
    Scanning { started: SystemTime },
    Ready(ScanSummary),
    /// The scan finished but the index could not be saved.
    Incomplete(ScanSummary),
    Error(String),
}
