//!
//! src/main.rs  Oct 19th, 2026
//!
//! Entry point of the release crawler. Loads configuration, starts the
//! logger and runs each configured discovery mode in turn.
//!
//!

mod album_check;
mod cache;
mod catalog;
mod config;
mod crawler;
mod denylist;
mod fetch;
mod ids;
mod logging;
mod paging;
mod persistent;
mod playlist;
mod track_check;
mod types;

#[cfg(test)]
mod testing;

mod errors;
use crate::errors::ReleaseError;

use tracing::{error, info, warn};

use crate::config::{AppConfig, RunMode};
use crate::crawler::{ArtistRun, LabelRun, RunReport};
use crate::fetch::SpotifyClient;
use crate::persistent::Persistent;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();

    let guard = match config::build_logging(&|key: &str| std::env::var(key).ok())
        .and_then(|cfg| logging::init_logging(&cfg)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("release-crawler: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run().await {
        error!(error = %e, "crawler.failed");
        drop(guard);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ReleaseError> {
    let cfgs = config::load_config()?;
    info!(
        modes = ?cfgs.general.modes,
        region = %cfgs.general.region,
        days = cfgs.general.days,
        radio_shows = cfgs.filters.radio_shows.len(),
        extended_mixes = cfgs.filters.extended_mixes.len(),
        log_format = ?cfgs.logging.format,
        "crawler.start"
    );

    let spotify = SpotifyClient::new(&cfgs.http, &cfgs.spotify)?;
    let today = chrono::Local::now().date_naive();

    for mode in &cfgs.general.modes {
        let report = match mode {
            RunMode::Artists => artist_mode(&spotify, &cfgs, today).await?,
            RunMode::Labels  => label_mode(&spotify, &cfgs, today).await?
        };
        info!(mode = report.mode.as_str(), accepted = report.accepted, "mode.done");
    }
    Ok(())
}

async fn artist_mode(
    spotify: &SpotifyClient,
    cfgs: &AppConfig,
    today: chrono::NaiveDate
) -> Result<RunReport, ReleaseError> {
    // seeds first so a bad file never leaves the store open
    let listed = if cfgs.general.use_artists_file {
        Some(ids::load_artist_seeds(&cfgs.general.artists_file)?)
    } else {
        None
    };

    let store = Persistent::open(&cfgs.persistence.cache_file).await?;
    match store.count().await {
        Ok(entries) => info!(path = %cfgs.persistence.cache_file.display(), entries, "cache.open"),
        Err(e) => warn!(error = %e, "cache.count.failed")
    }

    let mut run = ArtistRun::new(spotify, &cfgs.general, &cfgs.filters, store, today);
    if let Some(artists) = listed {
        run.set_artist_list(artists);
    }
    run.run().await
}

async fn label_mode(
    spotify: &SpotifyClient,
    cfgs: &AppConfig,
    today: chrono::NaiveDate
) -> Result<RunReport, ReleaseError> {
    let labels = ids::load_label_seeds(&cfgs.general.labels_file)?;
    let mut run = LabelRun::new(spotify, &cfgs.general, &cfgs.filters, today);
    run.set_label_list(labels);
    run.run().await
}
