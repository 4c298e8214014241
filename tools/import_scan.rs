use std::env;
use std::path::PathBuf;

use common::{Articles, IndexGroups};
use library::{Catalog, FolderLoader, ScanSettings, Scanner};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let music_root = args
        .next()
        .or_else(|| env::var("MUSIC_ROOT").ok())
        .ok_or("MUSIC_ROOT not set and no path argument")?;
    let index_path = args
        .next()
        .or_else(|| env::var("INDEX_PATH").ok())
        .unwrap_or_else(|| "data/library.redb".to_string());

    let mut settings = ScanSettings::new(PathBuf::from(&music_root));
    if let Ok(groups) = env::var("INDEX_GROUPS") {
        settings.index_groups = IndexGroups::parse(&groups);
    }
    if let Ok(articles) = env::var("IGNORED_ARTICLES") {
        settings.articles = Articles::parse(&articles);
    }

    let catalog = Catalog::open(&PathBuf::from(&index_path))?;
    let scanner = Scanner::new(settings, catalog.repositories());
    let summary = scanner.scan(&FolderLoader::new())?;

    println!(
        "Indexed: {} artists, {} albums, {} tracks ({} index groups)",
        summary.stats.artists, summary.stats.albums, summary.stats.tracks, summary.index_groups
    );
    if let Some(err) = &summary.index_error {
        warn!("Artist index was not saved: {}", err);
        return Err(format!("artist index was not saved: {}", err).into());
    }

    Ok(())
}
