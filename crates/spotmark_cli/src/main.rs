//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `spotmark_core` linkage.
//! - Print a marker summary for a database file passed as first argument.

use spotmark_core::db::open_db;
use spotmark_core::{KvMarkerStore, MarkerStore, SqliteKeyValueStorage};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("spotmark_core ping={}", spotmark_core::ping());
    println!("spotmark_core version={}", spotmark_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    let conn = match open_db(&db_path) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("failed to open `{db_path}`: {err}");
            return ExitCode::FAILURE;
        }
    };
    let store = KvMarkerStore::new(SqliteKeyValueStorage::new(conn));
    match store.load() {
        Ok(markers) => {
            println!("markers={}", markers.len());
            for marker in &markers {
                println!(
                    "{} {:.5},{:.5} {}",
                    marker.key,
                    marker.coordinate.latitude,
                    marker.coordinate.longitude,
                    marker.display_label()
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to load markers: {err}");
            ExitCode::FAILURE
        }
    }
}
