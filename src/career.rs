use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::arcsets::{RenderableArc, YearlyDataset, ARC_PLAYER};
use crate::players::{CountryIndex, PlayerDirectory, PlayerIdentity};

/// Seconds each transfer stays on screen in career mode.
pub const TRANSFER_PERIOD: Duration = Duration::from_secs(3);

const CANONICAL_STROKE: f32 = 0.2;
const FALLBACK_STROKE: f32 = 0.5;
/// Stroke of the single arc currently shown by the sequencer.
pub const SHOWN_STROKE: f32 = 0.5;
/// Stroke of the always-visible glow copies of the full path.
pub const GLOW_STROKE: f32 = 0.6;

/// One step of a player's chronological transfer path, before coordinate
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareerTransfer {
    pub year: u16,
    pub from: String,
    pub to: String,
    pub from_club: Option<String>,
    pub to_club: Option<String>,
}

impl CareerTransfer {
    fn dedup_key(&self) -> (String, String, String, String) {
        (
            self.from.clone(),
            self.to.clone(),
            self.from_club.clone().unwrap_or_default(),
            self.to_club.clone().unwrap_or_default(),
        )
    }
}

/// Where a career path came from; decides arc styling and whether the
/// yearly cache had to be exhaustively preloaded first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    Canonical,
    YearlyScan,
}

/// Builds a player's raw transfer sequence. The curated directory entry is
/// the preferred, non-lossy source; scanning every cached year by name
/// substring is the fallback for players without one.
pub fn find_career_path(
    player: &PlayerIdentity,
    years: &[Arc<YearlyDataset>],
) -> (Vec<CareerTransfer>, PathSource) {
    if let Some(transfers) = player.canonical_transfers() {
        let path = transfers
            .into_iter()
            .map(|t| CareerTransfer {
                year: t.year,
                from: t.from,
                to: t.to,
                from_club: t.from_club,
                to_club: t.to_club,
            })
            .collect();
        return (path, PathSource::Canonical);
    }

    let needle = player.name.to_lowercase();
    let mut sorted_years: Vec<&Arc<YearlyDataset>> = years.iter().collect();
    sorted_years.sort_by_key(|d| d.year);

    let mut path = Vec::new();
    for dataset in sorted_years {
        for arc in &dataset.arcs {
            if arc
                .players
                .iter()
                .any(|p| p.to_lowercase().contains(&needle))
            {
                path.push(CareerTransfer {
                    year: dataset.year,
                    from: arc.from.clone(),
                    to: arc.to.clone(),
                    from_club: None,
                    to_club: None,
                });
            }
        }
    }
    (path, PathSource::YearlyScan)
}

/// Collapses duplicate observations of the same real-world transfer.
///
/// Two transfers with identical (from, to, club-pair) whose years differ by
/// at most one are overlapping-season artifacts; the earlier year wins. A
/// gap of more than one year means the player genuinely moved on that route
/// again, so both stay. Stable fixed point: running this on its own output
/// changes nothing.
pub fn dedup_career_path(mut transfers: Vec<CareerTransfer>) -> Vec<CareerTransfer> {
    transfers.sort_by_key(|t| t.year);

    let mut kept: Vec<CareerTransfer> = Vec::new();
    let mut last_by_key: HashMap<(String, String, String, String), usize> = HashMap::new();
    for transfer in transfers {
        let key = transfer.dedup_key();
        if let Some(&idx) = last_by_key.get(&key) {
            let diff = kept[idx].year.abs_diff(transfer.year);
            if diff <= 1 {
                if transfer.year < kept[idx].year {
                    kept[idx] = transfer;
                }
                continue;
            }
        }
        last_by_key.insert(key, kept.len());
        kept.push(transfer);
    }
    kept
}

/// Resolves a deduplicated path into renderable arcs. Transfers whose
/// country coordinates cannot be resolved even via the arc-endpoint scan
/// are skipped rather than drawn at the origin.
pub fn career_arcs(
    path: &[CareerTransfer],
    player_name: &str,
    source: PathSource,
    index: &CountryIndex,
    years: &[Arc<YearlyDataset>],
) -> Vec<RenderableArc> {
    let stroke = match source {
        PathSource::Canonical => CANONICAL_STROKE,
        PathSource::YearlyScan => FALLBACK_STROKE,
    };
    path.iter()
        .filter_map(|transfer| {
            let (start_lat, start_lng) = index.coords_or_scan(&transfer.from, years)?;
            let (end_lat, end_lng) = index.coords_or_scan(&transfer.to, years)?;
            Some(RenderableArc {
                start_lat,
                start_lng,
                end_lat,
                end_lng,
                color: ARC_PLAYER,
                scale: 0.5,
                stroke,
                from: transfer.from.clone(),
                to: transfer.to.clone(),
                count: 1,
                players: vec![player_name.to_string()],
                year: Some(transfer.year),
                from_club: transfer.from_club.clone(),
                to_club: transfer.to_club.clone(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryFlag {
    pub code: String,
    pub name: String,
    pub url: String,
}

/// Flag chain for the career panel: the origin of the first transfer, then
/// every destination in path order (duplicates included). Per-player flag
/// map first, then any flag the directory knows for the code, then the
/// deterministic flagcdn fallback.
pub fn career_flags(
    arcs: &[RenderableArc],
    player: Option<&PlayerIdentity>,
    directory: Option<&PlayerDirectory>,
    index: &CountryIndex,
) -> Vec<CountryFlag> {
    let mut flags = Vec::new();
    let Some(first) = arcs.first() else {
        return flags;
    };
    flags.push(resolve_flag(&first.from, player, directory, index));
    for arc in arcs {
        flags.push(resolve_flag(&arc.to, player, directory, index));
    }
    flags
}

fn resolve_flag(
    code: &str,
    player: Option<&PlayerIdentity>,
    directory: Option<&PlayerDirectory>,
    index: &CountryIndex,
) -> CountryFlag {
    let url = player
        .and_then(|p| p.country_flags.get(code).cloned())
        .or_else(|| directory.and_then(|d| d.flag_for(code)))
        .unwrap_or_else(|| fallback_flag_url(code));
    CountryFlag {
        code: code.to_string(),
        name: index.name_of(code).unwrap_or(code).to_string(),
        url,
    }
}

pub fn fallback_flag_url(code: &str) -> String {
    format!("https://flagcdn.com/w20/{}.png", code.to_lowercase())
}

/// Steps through a career path one arc at a time, wrapping after the last.
/// The only time-driven renderer besides the year ticker; the two never run
/// at once.
#[derive(Debug, Clone)]
pub struct CareerSequencer {
    index: usize,
    next_advance: Instant,
}

impl CareerSequencer {
    pub fn new(now: Instant) -> Self {
        Self {
            index: 0,
            next_advance: now + TRANSFER_PERIOD,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Advances to the next transfer when the period has elapsed. Returns
    /// true when the shown arc changed.
    pub fn advance_if_due(&mut self, now: Instant, len: usize) -> bool {
        if len == 0 || now < self.next_advance {
            return false;
        }
        self.index = (self.index + 1) % len;
        self.next_advance = now + TRANSFER_PERIOD;
        true
    }
}
