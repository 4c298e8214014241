use std::env;
use std::path::PathBuf;

use common::ArtistIndex;
use library::Catalog;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct IndexDump {
    last_scan: Option<u64>,
    groups: Vec<ArtistIndex>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut json = false;
    let mut index_path = None;
    for arg in env::args().skip(1) {
        if arg == "--json" {
            json = true;
        } else {
            index_path = Some(arg);
        }
    }
    let index_path = index_path
        .or_else(|| env::var("INDEX_PATH").ok())
        .unwrap_or_else(|| "data/library.redb".to_string());
    let index_path = PathBuf::from(index_path);
    if !index_path.exists() {
        return Err(format!("no index at {:?}", index_path).into());
    }

    let catalog = Catalog::open(&index_path)?;
    let dump = IndexDump {
        last_scan: catalog.last_scan()?,
        groups: catalog.list_indexes()?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    match dump.last_scan {
        Some(millis) => println!("Last scan: {} ms since epoch", millis),
        None => println!("Last scan: never completed"),
    }
    for group in &dump.groups {
        println!("{} ({})", group.id, group.artists.len());
        for info in &group.artists {
            println!("  {}  {}", info.artist, info.artist_id);
        }
    }

    Ok(())
}
