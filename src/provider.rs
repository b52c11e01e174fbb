use std::collections::HashSet;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::arcsets::{MAX_YEAR, MIN_YEAR};
use crate::career::{career_arcs, career_flags, dedup_career_path, find_career_path};
use crate::players::{CountryIndex, PlayerDirectory, PlayerIdentity};
use crate::state::{Delta, ProviderCommand};
use crate::year_cache::{ArcSource, YearDataCache};

/// Background worker that owns all network access. Fetch results flow back
/// to the UI thread as deltas; the UI never blocks on the network.
pub fn spawn_provider(
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
    cache: Arc<YearDataCache>,
    source: Arc<dyn ArcSource>,
) {
    thread::spawn(move || run_provider(tx, cmd_rx, cache, source));
}

fn run_provider(
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
    cache: Arc<YearDataCache>,
    source: Arc<dyn ArcSource>,
) {
    let index = match source.fetch_country_index() {
        Ok(index) => {
            let index = Arc::new(index);
            let _ = tx.send(Delta::SetCountryIndex(index.clone()));
            index
        }
        Err(err) => {
            let _ = tx.send(Delta::Log(format!("[WARN] Country map fetch failed: {err}")));
            Arc::new(CountryIndex::default())
        }
    };

    let directory = load_directory(&tx, &cache, &source);

    let inflight_years: Arc<Mutex<HashSet<u16>>> = Arc::new(Mutex::new(HashSet::new()));

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            ProviderCommand::LoadYear(year) => {
                if cache.contains(year) {
                    let _ = tx.send(Delta::YearLoaded { year });
                    continue;
                }
                {
                    let mut inflight = inflight_years.lock().expect("inflight years lock poisoned");
                    if !inflight.insert(year) {
                        continue;
                    }
                }

                let tx = tx.clone();
                let cache = cache.clone();
                let inflight_years = inflight_years.clone();
                thread::spawn(move || {
                    match cache.get(year) {
                        Ok(_) => {
                            let _ = tx.send(Delta::YearLoaded { year });
                        }
                        Err(err) => {
                            let _ = tx.send(Delta::YearFailed {
                                year,
                                error: err.to_string(),
                            });
                        }
                    }
                    let mut inflight = inflight_years.lock().expect("inflight years lock poisoned");
                    inflight.remove(&year);
                });
            }
            ProviderCommand::BuildCareerPath {
                player_id,
                player_name,
            } => {
                let tx = tx.clone();
                let cache = cache.clone();
                let index = index.clone();
                let directory = directory.clone();
                thread::spawn(move || {
                    build_career(&tx, &cache, &index, directory.as_deref(), player_id, player_name)
                });
            }
        }
    }
}

/// Loads the curated directory, or reconstructs placeholder identities from
/// the full yearly range when `players.json` is unavailable.
fn load_directory(
    tx: &Sender<Delta>,
    cache: &Arc<YearDataCache>,
    source: &Arc<dyn ArcSource>,
) -> Option<Arc<PlayerDirectory>> {
    match source.fetch_player_directory() {
        Ok(directory) => {
            let directory = Arc::new(directory);
            let _ = tx.send(Delta::SetDirectory(directory.clone()));
            Some(directory)
        }
        Err(err) => {
            let _ = tx.send(Delta::DirectoryUnavailable {
                reason: err.to_string(),
            });
            for (year, err) in cache.preload_range(MIN_YEAR, MAX_YEAR) {
                let _ = tx.send(Delta::Log(format!("[WARN] Preload {year} failed: {err}")));
            }
            let directory = Arc::new(PlayerDirectory::synthesize_from_years(&cache.snapshot()));
            if directory.is_empty() {
                return None;
            }
            let _ = tx.send(Delta::SetDirectory(directory.clone()));
            Some(directory)
        }
    }
}

fn build_career(
    tx: &Sender<Delta>,
    cache: &YearDataCache,
    index: &CountryIndex,
    directory: Option<&PlayerDirectory>,
    player_id: String,
    player_name: String,
) {
    let player = directory
        .and_then(|d| d.get(&player_id))
        .cloned()
        .unwrap_or_else(|| PlayerIdentity::placeholder(&player_name));

    // Without a canonical history the scan needs every year in the cache.
    if player.canonical_transfers().is_none() {
        for (year, err) in cache.preload_range(MIN_YEAR, MAX_YEAR) {
            let _ = tx.send(Delta::Log(format!("[WARN] Preload {year} failed: {err}")));
        }
    }

    let years = cache.snapshot();
    let (path, path_source) = find_career_path(&player, &years);
    let path = dedup_career_path(path);
    let arcs = career_arcs(&path, &player_name, path_source, index, &years);

    if arcs.is_empty() {
        let _ = tx.send(Delta::CareerPathEmpty {
            player_id,
            player_name,
        });
        return;
    }

    let flags = career_flags(&arcs, Some(&player), directory, index);
    let _ = tx.send(Delta::SetCareerPath {
        player_id,
        player_name,
        arcs,
        flags,
    });
}
