use crate::query::ReplayQuery;
use crate::state::ReplayPage;

/// Pagination progress for the active query. `max_page: None` means the bound
/// is not yet known, which keeps incremental loading unblocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub current_page: u32,
    pub max_page: Option<u32>,
    pub loading: bool,
}

impl PageCursor {
    pub fn unbounded() -> Self {
        Self {
            current_page: 1,
            max_page: None,
            loading: false,
        }
    }
}

/// One dispatched page request. The epoch ties the eventual response back to
/// the filter generation that issued it; a response whose epoch no longer
/// matches the loader's is discarded on arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub epoch: u64,
    pub page: u32,
    pub query: ReplayQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadDecision {
    /// A fetch for this filter is already outstanding.
    Busy,
    /// Cursor sits past the known bound; reset toward convergence, no fetch.
    PastEnd,
    Fetch(FetchTicket),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadCompletion {
    /// Response belongs to a superseded filter generation.
    Stale,
    Loaded {
        page: u32,
        appended: usize,
        exhausted: bool,
    },
}

/// Single-flight incremental page loader. At most one fetch is outstanding at
/// any time; concurrent triggers observe `Busy` and become no-ops.
#[derive(Debug, Clone)]
pub struct ReplayLoader {
    pub cursor: PageCursor,
    active: ReplayQuery,
    epoch: u64,
}

impl ReplayLoader {
    pub fn new(initial: ReplayQuery) -> Self {
        Self {
            cursor: PageCursor {
                current_page: initial.page,
                max_page: None,
                loading: false,
            },
            active: initial,
            epoch: 0,
        }
    }

    pub fn active_query(&self) -> &ReplayQuery {
        &self.active
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Decides whether `candidate` warrants a fetch, in guard order:
    /// an outstanding fetch or a cursor past the bound suppress same-filter
    /// triggers; a genuine filter change resets the cursor, bumps the epoch
    /// (invalidating anything in flight) and adopts the candidate at page 1.
    pub fn begin(&mut self, candidate: &ReplayQuery) -> LoadDecision {
        let filter_changed = !candidate.same_filter(&self.active);

        if !filter_changed {
            if self.cursor.loading {
                return LoadDecision::Busy;
            }
            if let Some(max) = self.cursor.max_page
                && (self.cursor.current_page > max || self.active.page > max)
            {
                self.cursor.current_page = 1;
                return LoadDecision::PastEnd;
            }
        } else {
            self.epoch += 1;
            self.cursor = PageCursor::unbounded();
            self.active = candidate.clone();
            self.active.page = 1;
        }

        self.cursor.loading = true;
        let mut query = self.active.clone();
        query.page = self.cursor.current_page;
        LoadDecision::Fetch(FetchTicket {
            epoch: self.epoch,
            page: self.cursor.current_page,
            query,
        })
    }

    /// Applies a decoded response. An empty batch marks the previous page as
    /// the bound and advances nothing; otherwise the server's `max_page` is
    /// adopted (with `1` stored as "unbounded" so a single-page result does
    /// not retire the scroll trigger) and the cursor moves on.
    pub fn complete_success(&mut self, epoch: u64, batch: &ReplayPage) -> LoadCompletion {
        if epoch != self.epoch {
            return LoadCompletion::Stale;
        }

        let page = self.cursor.current_page;
        let appended = batch.replays.len();
        let exhausted = appended == 0;

        if exhausted {
            self.cursor.max_page = Some(page.saturating_sub(1));
        } else {
            self.cursor.max_page = if batch.max_page == 1 {
                None
            } else {
                Some(batch.max_page)
            };
            self.cursor.current_page = page + 1;
            self.active.page = self.cursor.current_page;
        }
        self.cursor.loading = false;

        LoadCompletion::Loaded {
            page,
            appended,
            exhausted,
        }
    }

    /// Releases the guard after a failed fetch. Cursor and bound are left
    /// untouched so a retry targets the same page. Returns false when the
    /// failure belongs to a superseded epoch.
    pub fn complete_failure(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.cursor.loading = false;
        true
    }

    /// Restores cursor state verbatim from a history snapshot, then steps
    /// one page past it so forward pagination resumes seamlessly. Bumps the
    /// epoch so any in-flight response is discarded.
    pub fn restore(&mut self, query: ReplayQuery, page: u32, max_page: Option<u32>) {
        self.epoch += 1;
        self.cursor = PageCursor {
            current_page: page + 1,
            max_page,
            loading: false,
        };
        self.active = query;
        self.active.page = page + 1;
    }
}
