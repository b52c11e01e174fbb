use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use crate::arcsets::{compute_visible_arcs, RenderableArc};
use crate::career::{CareerSequencer, CountryFlag, GLOW_STROKE, SHOWN_STROKE};
use crate::persist::{self, Theme};
use crate::playback::{PlaybackController, Tick};
use crate::players::{CountryIndex, PlayerDirectory, PlayerIdentity};
use crate::render::{build_glow_arcs, glow_copy, RenderSink};
use crate::year_cache::YearDataCache;

const LOG_CAPACITY: usize = 200;

/// Every filter dimension the UI can arm. Mutated only through the
/// [`AppState`] methods, which also refresh the visible arc set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub selected_country_codes: BTreeSet<String>,
    pub show_transfers_in: bool,
    pub show_transfers_out: bool,
    pub source_country_code: Option<String>,
    pub dest_country_code: Option<String>,
    pub country_pair_active: bool,
    pub bidirectional: bool,
    pub player_name: Option<String>,
    pub player_filter_active: bool,
    pub filters_applied: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            selected_country_codes: BTreeSet::new(),
            show_transfers_in: true,
            show_transfers_out: true,
            source_country_code: None,
            dest_country_code: None,
            country_pair_active: false,
            bidirectional: false,
            player_name: None,
            player_filter_active: false,
            filters_applied: false,
        }
    }
}

/// Which driver owns the screen. Career mode supersedes year browsing
/// entirely; the year ticker and the transfer sequencer never run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    YearBrowse,
    PlayerCareer,
}

#[derive(Debug, Clone)]
pub struct CareerView {
    pub player_id: String,
    pub player_name: String,
    pub arcs: Vec<RenderableArc>,
    pub flags: Vec<CountryFlag>,
    pub sequencer: CareerSequencer,
}

/// Requests the UI thread sends to the data provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    LoadYear(u16),
    BuildCareerPath {
        player_id: String,
        player_name: String,
    },
}

/// Results flowing back from the provider thread. Everything asynchronous
/// enters the state through here.
#[derive(Debug, Clone)]
pub enum Delta {
    SetCountryIndex(Arc<CountryIndex>),
    SetDirectory(Arc<PlayerDirectory>),
    DirectoryUnavailable {
        reason: String,
    },
    YearLoaded {
        year: u16,
    },
    YearFailed {
        year: u16,
        error: String,
    },
    SetCareerPath {
        player_id: String,
        player_name: String,
        arcs: Vec<RenderableArc>,
        flags: Vec<CountryFlag>,
    },
    CareerPathEmpty {
        player_id: String,
        player_name: String,
    },
    Log(String),
}

pub struct AppState {
    pub cache: Arc<YearDataCache>,
    pub filter: FilterState,
    pub mode: ViewMode,
    pub playback: PlaybackController,
    pub pre_career_year: u16,
    pub countries: Arc<CountryIndex>,
    pub directory: Option<Arc<PlayerDirectory>>,
    pub career: Option<CareerView>,
    pub career_pending: bool,
    pub visible_arcs: Vec<RenderableArc>,
    pub glow_arcs: Vec<RenderableArc>,
    pub hovered_arc: Option<String>,
    pub theme: Theme,
    pub status: Option<String>,
    pub logs: VecDeque<String>,
    pub player_search: String,
    pub search_results: Vec<PlayerIdentity>,
    pub selected_player_id: Option<String>,
}

impl AppState {
    pub fn new(cache: Arc<YearDataCache>, start_year: u16) -> Self {
        Self {
            cache,
            filter: FilterState::default(),
            mode: ViewMode::YearBrowse,
            playback: PlaybackController::new(start_year),
            pre_career_year: start_year,
            countries: Arc::new(CountryIndex::default()),
            directory: None,
            career: None,
            career_pending: false,
            visible_arcs: Vec::new(),
            glow_arcs: Vec::new(),
            hovered_arc: None,
            theme: persist::load_theme(),
            status: None,
            logs: VecDeque::with_capacity(LOG_CAPACITY),
            player_search: String::new(),
            search_results: Vec::new(),
            selected_player_id: None,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        if self.logs.len() >= LOG_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(msg.into());
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some(msg.into());
    }

    pub fn clear_hover(&mut self) {
        self.hovered_arc = None;
    }

    /// Hover tracking by derived arc key, not allocation identity; a key
    /// that no longer names a visible arc is dropped.
    pub fn set_hover(&mut self, key: Option<String>) {
        self.hovered_arc = key.filter(|k| self.visible_arcs.iter().any(|a| &a.key() == k));
    }

    pub fn current_year(&self) -> u16 {
        self.playback.year()
    }

    /// Recomputes the rendered arc lists from whichever driver owns the
    /// view. A year whose dataset is not cached yet keeps the previous
    /// lists on screen; the caller requests the load.
    pub fn refresh_arcs(&mut self) {
        match self.mode {
            ViewMode::PlayerCareer => {
                if let Some(career) = &self.career {
                    self.glow_arcs = career
                        .arcs
                        .iter()
                        .map(|a| glow_copy(a, GLOW_STROKE))
                        .collect();
                }
                self.show_current_career_arc();
            }
            ViewMode::YearBrowse => {
                let year = self.playback.year();
                if let Some(dataset) = self.cache.peek(year) {
                    let arcs = compute_visible_arcs(&dataset, &self.filter);
                    self.glow_arcs = build_glow_arcs(&arcs);
                    self.visible_arcs = arcs;
                    self.clear_hover();
                }
            }
        }
    }

    /// Hands the current lists to an external render sink.
    pub fn publish(&self, sink: &mut dyn RenderSink) {
        sink.set_glow_arcs(self.glow_arcs.clone());
        sink.set_arcs(self.visible_arcs.clone());
    }

    fn show_current_career_arc(&mut self) {
        let Some(career) = &self.career else {
            self.visible_arcs.clear();
            self.clear_hover();
            return;
        };
        let Some(arc) = career.arcs.get(career.sequencer.index()) else {
            return;
        };
        let mut shown = arc.clone();
        shown.stroke = SHOWN_STROKE;
        self.visible_arcs = vec![shown];
        self.clear_hover();
    }

    /// The transfer currently on screen in career mode.
    pub fn current_career_transfer(&self) -> Option<&RenderableArc> {
        let career = self.career.as_ref()?;
        career.arcs.get(career.sequencer.index())
    }

    /// Drives whichever ticker is live. Called from the main loop.
    pub fn tick(&mut self, now: Instant) {
        match self.mode {
            ViewMode::YearBrowse => match self.playback.tick(now) {
                Tick::Advanced(_) => self.refresh_arcs(),
                Tick::Finished => self.push_log("[INFO] Playback reached the final year"),
                Tick::Idle => {}
            },
            ViewMode::PlayerCareer => {
                let advanced = match &mut self.career {
                    Some(career) => {
                        let len = career.arcs.len();
                        career.sequencer.advance_if_due(now, len)
                    }
                    None => false,
                };
                if advanced {
                    self.show_current_career_arc();
                }
            }
        }
    }

    // ---- filter mutators -------------------------------------------------

    pub fn toggle_country(&mut self, code: &str) {
        self.leave_career_for_filter_change();
        if !self.filter.selected_country_codes.remove(code) {
            self.filter.selected_country_codes.insert(code.to_string());
        }
        self.filter.filters_applied = true;
        self.refresh_arcs();
    }

    pub fn select_all_countries(&mut self) {
        self.leave_career_for_filter_change();
        self.filter.selected_country_codes = self.countries.sorted_codes().into_iter().collect();
        self.filter.filters_applied = true;
        self.refresh_arcs();
    }

    pub fn clear_countries(&mut self) {
        self.leave_career_for_filter_change();
        self.filter.selected_country_codes.clear();
        self.filter.filters_applied = true;
        self.refresh_arcs();
    }

    pub fn set_directions(&mut self, transfers_in: bool, transfers_out: bool) {
        self.leave_career_for_filter_change();
        self.filter.show_transfers_in = transfers_in;
        self.filter.show_transfers_out = transfers_out;
        self.filter.filters_applied = true;
        self.refresh_arcs();
    }

    /// Country-pair filter. Both sides empty resets the pair silently
    /// rather than rejecting, matching the dropdown behavior.
    pub fn set_country_pair(&mut self, source: Option<String>, dest: Option<String>) {
        self.leave_career_for_filter_change();
        if source.is_none() && dest.is_none() {
            self.reset_country_pair();
            return;
        }
        self.filter.bidirectional = source.is_some() && dest.is_some();
        self.filter.source_country_code = source;
        self.filter.dest_country_code = dest;
        self.filter.country_pair_active = true;
        self.filter.filters_applied = true;
        self.refresh_arcs();
    }

    pub fn reset_country_pair(&mut self) {
        self.filter.source_country_code = None;
        self.filter.dest_country_code = None;
        self.filter.country_pair_active = false;
        self.filter.bidirectional = false;
        if self.mode == ViewMode::PlayerCareer {
            return;
        }
        if !self.filter.player_filter_active && self.filter.selected_country_codes.is_empty() {
            self.filter.filters_applied = false;
        }
        self.refresh_arcs();
    }

    // ---- player search / career mode ------------------------------------

    pub fn update_player_search(&mut self, term: String) {
        self.player_search = term;
        self.search_results = match &self.directory {
            Some(directory) => directory
                .search(&self.player_search)
                .into_iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        };
    }

    /// Submitting free text without picking a suggestion is rejected with
    /// no state mutation.
    pub fn require_player_selection(&mut self) -> bool {
        if self.player_search.trim().is_empty() {
            self.set_status("Type a player name first");
            return false;
        }
        if self.selected_player_id.is_none() {
            self.set_status("Pick a player from the suggestions");
            return false;
        }
        true
    }

    /// Arms the player filter and enters career mode. The career path is
    /// built asynchronously; the caller sends the returned command to the
    /// provider.
    pub fn select_player(&mut self, player: &PlayerIdentity) -> ProviderCommand {
        self.player_search = player.name.clone();
        self.search_results.clear();
        self.selected_player_id = Some(player.id.clone());

        self.filter.player_name = Some(player.name.clone());
        self.filter.player_filter_active = true;
        self.filter.filters_applied = true;

        self.pre_career_year = self.playback.year();
        self.playback.pause();
        self.mode = ViewMode::PlayerCareer;
        self.career = None;
        self.career_pending = true;
        self.visible_arcs.clear();
        self.glow_arcs.clear();
        self.clear_hover();
        self.set_status(format!("Tracing career of {}", player.name));

        ProviderCommand::BuildCareerPath {
            player_id: player.id.clone(),
            player_name: player.name.clone(),
        }
    }

    /// Leaves career mode and restores year browsing at the pre-career
    /// year with default filters.
    pub fn exit_career_mode(&mut self) {
        self.mode = ViewMode::YearBrowse;
        self.career = None;
        self.career_pending = false;
        self.selected_player_id = None;
        self.player_search.clear();
        self.search_results.clear();
        self.filter = FilterState::default();
        self.playback.set_year(self.pre_career_year);
        self.visible_arcs.clear();
        self.glow_arcs.clear();
        self.clear_hover();
        self.status = None;
        self.refresh_arcs();
    }

    fn leave_career_for_filter_change(&mut self) {
        if self.mode == ViewMode::PlayerCareer {
            self.exit_career_mode();
        }
    }

    fn career_path_empty(&mut self, player_name: &str) {
        self.push_log(format!("[WARN] No transfers found for {player_name}"));
        let message = format!("No transfers found for {player_name}");
        self.exit_career_mode();
        self.set_status(message);
    }

    // ---- playback passthroughs ------------------------------------------

    pub fn toggle_play(&mut self, now: Instant) {
        if self.mode == ViewMode::PlayerCareer {
            return;
        }
        self.playback.toggle(now);
    }

    pub fn toggle_speed(&mut self, now: Instant) {
        self.playback.toggle_speed(now);
    }

    /// Moves the year cursor and refreshes. Returns the new year when the
    /// cursor moved, so the caller can request a missing dataset.
    pub fn step_year(&mut self, delta: i32) -> Option<u16> {
        if self.mode == ViewMode::PlayerCareer {
            return None;
        }
        if self.playback.step(delta) {
            self.refresh_arcs();
            return Some(self.playback.year());
        }
        None
    }

    pub fn set_year(&mut self, year: u16) -> Option<u16> {
        if self.mode == ViewMode::PlayerCareer {
            return None;
        }
        if self.playback.set_year(year) {
            self.refresh_arcs();
            return Some(self.playback.year());
        }
        None
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        persist::save_theme(self.theme);
        self.push_log(format!("[INFO] Theme: {}", self.theme.label()));
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetCountryIndex(index) => {
            state.countries = index;
        }
        Delta::SetDirectory(directory) => {
            state.push_log(format!(
                "[INFO] Player directory ready ({} players)",
                directory.len()
            ));
            state.directory = Some(directory);
            if !state.player_search.is_empty() {
                let term = state.player_search.clone();
                state.update_player_search(term);
            }
        }
        Delta::DirectoryUnavailable { reason } => {
            state.push_log(format!("[WARN] Player directory unavailable: {reason}"));
        }
        Delta::YearLoaded { year } => {
            // The dataset is cached either way; only the year still on
            // screen refreshes the visible arcs (stale-response guard).
            if state.mode == ViewMode::YearBrowse && state.playback.year() == year {
                state.refresh_arcs();
            }
        }
        Delta::YearFailed { year, error } => {
            state.push_log(format!("[WARN] Year {year} failed: {error}"));
        }
        Delta::SetCareerPath {
            player_id,
            player_name,
            arcs,
            flags,
        } => {
            if !state.career_pending
                || state.selected_player_id.as_deref() != Some(player_id.as_str())
            {
                return;
            }
            if arcs.is_empty() {
                state.career_path_empty(&player_name);
                return;
            }
            state.career_pending = false;
            state.set_status(format!("{}: {} transfers", player_name, arcs.len()));
            state.career = Some(CareerView {
                player_id,
                player_name,
                arcs,
                flags,
                sequencer: CareerSequencer::new(Instant::now()),
            });
            state.refresh_arcs();
        }
        Delta::CareerPathEmpty {
            player_id,
            player_name,
        } => {
            if !state.career_pending
                || state.selected_player_id.as_deref() != Some(player_id.as_str())
            {
                return;
            }
            state.career_path_empty(&player_name);
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
