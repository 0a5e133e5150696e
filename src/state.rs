use std::collections::VecDeque;
use std::env;

use serde::{Deserialize, Serialize};

use crate::fetch::FetchFailure;
use crate::filters::{CommitGesture, FilterInputs};
use crate::history::{HistoryEntry, HistoryStack};
use crate::pager::{FetchTicket, LoadCompletion, LoadDecision, ReplayLoader};
use crate::query::{DateRange, PlayerSlot, ReplayQuery};

/// One collapsed set of replays between two players, as served by the
/// archive. The engine passes it through untouched; only the renderer and
/// the download-link display read its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySet {
    pub replay_id: u64,
    pub p1: String,
    pub p2: String,
    pub p1icon: String,
    pub p2icon: String,
    pub p1wins: u32,
    pub p2wins: u32,
    pub p1_character_id: u32,
    pub p2_character_id: u32,
    pub recorded_at: String,
    #[serde(default)]
    pub set: Vec<u64>,
}

/// Decoded body of `GET /api/replay-sets`. An empty `replays` sequence is
/// the exhaustion signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayPage {
    #[serde(default)]
    pub replays: Vec<ReplaySet>,
    #[serde(default)]
    pub max_page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterIcon {
    pub id: u32,
    pub path: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFocus {
    List,
    P1Name,
    P2Name,
    DateRange,
    P1Character,
    P2Character,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    PageLoaded {
        epoch: u64,
        page: u32,
        batch: ReplayPage,
    },
    PageFailed {
        epoch: u64,
        page: u32,
        failure: FetchFailure,
    },
    SetCharacterIcons(Vec<CharacterIcon>),
    Log(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCommand {
    FetchPage(FetchTicket),
    FetchCharacterIcons,
}

pub struct AppState {
    pub focus: SearchFocus,
    pub query: ReplayQuery,
    pub loader: ReplayLoader,
    pub history: HistoryStack,
    pub filters: FilterInputs,
    pub replays: Vec<ReplaySet>,
    pub icons: Vec<CharacterIcon>,
    pub selected: usize,
    pub picker_cursor: usize,
    pub logs: VecDeque<String>,
    pub last_failure: Option<FetchFailure>,
    pub help_overlay: bool,
    pub scroll_prefetch_rows: usize,
}

impl AppState {
    pub fn new(initial: ReplayQuery) -> Self {
        let scroll_prefetch_rows = env::var("SCROLL_PREFETCH_ROWS")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(5)
            .clamp(1, 50);

        let mut filters = FilterInputs::new();
        filters.populate_from(&initial);

        Self {
            focus: SearchFocus::List,
            loader: ReplayLoader::new(initial.clone()),
            query: initial,
            history: HistoryStack::new(),
            filters,
            replays: Vec::new(),
            icons: Vec::new(),
            selected: 0,
            picker_cursor: 0,
            logs: VecDeque::new(),
            last_failure: None,
            help_overlay: false,
            scroll_prefetch_rows,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn icon_for(&self, character_id: u32) -> Option<&str> {
        self.icons
            .iter()
            .find(|icon| icon.id == character_id)
            .map(|icon| icon.path.as_str())
    }

    pub fn character_name(&self, character_id: u32) -> Option<&str> {
        self.icons
            .iter()
            .find(|icon| icon.id == character_id)
            .map(|icon| icon.name.as_str())
    }

    /// Viewport-proximity signal: the selection sits within the prefetch
    /// margin of the end of the loaded list.
    pub fn near_list_end(&self) -> bool {
        self.replays.len().saturating_sub(self.selected + 1) <= self.scroll_prefetch_rows
    }

    /// Asks the loader for the next page of the current query. All
    /// correctness (single-flight, past-end convergence, filter adoption)
    /// lives in the loader; this is safe to call from any trigger.
    pub fn request_next_page(&mut self) -> Option<ProviderCommand> {
        match self.loader.begin(&self.query) {
            LoadDecision::Busy | LoadDecision::PastEnd => None,
            LoadDecision::Fetch(ticket) => {
                self.history.begin_loading();
                Some(ProviderCommand::FetchPage(ticket))
            }
        }
    }

    /// Filter edits clear the visible list before fetching page 1 of the
    /// new view.
    fn reload(&mut self) -> Option<ProviderCommand> {
        self.replays.clear();
        self.selected = 0;
        self.request_next_page()
    }

    pub fn commit_player_filter(
        &mut self,
        slot: PlayerSlot,
        gesture: CommitGesture,
    ) -> Option<ProviderCommand> {
        let mut query = self.query.clone();
        let reload = self.filters.commit_player(slot, gesture, &mut query);
        self.query = query;
        if reload { self.reload() } else { None }
    }

    pub fn apply_date_range(&mut self, range: DateRange) -> Option<ProviderCommand> {
        let mut query = self.query.clone();
        if self.filters.apply_date(range, &mut query) {
            self.query = query;
            self.reload()
        } else {
            None
        }
    }

    pub fn cancel_date_range(&mut self) -> Option<ProviderCommand> {
        let mut query = self.query.clone();
        let reload = self.filters.cancel_date(&mut query);
        self.query = query;
        if reload { self.reload() } else { None }
    }

    pub fn pick_character(&mut self, slot: PlayerSlot, id: Option<u32>) -> Option<ProviderCommand> {
        let mut query = self.query.clone();
        if self.filters.pick_character(slot, id, &mut query) {
            self.query = query;
            self.reload()
        } else {
            None
        }
    }

    /// Replays the previous history snapshot verbatim: restores the query,
    /// the cursor (stepped one past the stored page) and every stored
    /// record. Never touches the network.
    pub fn navigate_back(&mut self) -> bool {
        let Some(entry) = self.history.back().cloned() else {
            return false;
        };
        self.restore_entry(entry);
        true
    }

    pub fn navigate_forward(&mut self) -> bool {
        let Some(entry) = self.history.forward().cloned() else {
            return false;
        };
        self.restore_entry(entry);
        true
    }

    fn restore_entry(&mut self, entry: HistoryEntry) {
        let restored = ReplayQuery::parse(&entry.query);
        self.replays = entry.replays;
        self.query = restored.clone();
        self.filters.populate_from(&self.query);
        self.loader.restore(restored, entry.page, entry.max_page);
        self.selected = self.selected.min(self.replays.len().saturating_sub(1));
        self.last_failure = None;
        self.history.finish_replay();
    }

    /// The explicit retry affordance after a failed load; the guard was
    /// already released, so this re-issues the fetch for the same page.
    pub fn retry_last(&mut self) -> Option<ProviderCommand> {
        if self.last_failure.take().is_none() {
            return None;
        }
        self.request_next_page()
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::PageLoaded { epoch, page, batch } => {
            match state.loader.complete_success(epoch, &batch) {
                LoadCompletion::Stale => {
                    state.push_log(format!("[INFO] Discarded stale response for page {page}"));
                }
                LoadCompletion::Loaded {
                    page,
                    appended,
                    exhausted,
                } => {
                    state.last_failure = None;
                    if page == 1 {
                        state.replays.clear();
                        state.selected = 0;
                    }
                    state.replays.extend(batch.replays);

                    let mut snap_query = state.loader.active_query().clone();
                    snap_query.page = page;
                    let entry = HistoryEntry {
                        query: snap_query.serialize(),
                        page,
                        max_page: state.loader.cursor.max_page,
                        replays: state.replays.clone(),
                    };
                    if page == 1 {
                        state.history.push(entry);
                    } else {
                        state.history.replace(entry);
                    }

                    if exhausted {
                        state.push_log(format!("[INFO] No more results past page {page}"));
                    } else {
                        state.push_log(format!("[INFO] Loaded page {page} ({appended} sets)"));
                    }
                }
            }
        }
        Delta::PageFailed {
            epoch,
            page,
            failure,
        } => {
            if state.loader.complete_failure(epoch) {
                state.push_log(format!(
                    "[WARN] Page {page} {} failure: {} (r to retry)",
                    failure.label(),
                    failure.message
                ));
                state.last_failure = Some(failure);
                state.history.abort_loading();
            } else {
                state.push_log(format!("[INFO] Discarded stale failure for page {page}"));
            }
        }
        Delta::SetCharacterIcons(icons) => {
            state.push_log(format!("[INFO] Loaded {} character icons", icons.len()));
            state.icons = icons;
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
