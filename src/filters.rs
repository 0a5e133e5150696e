use chrono::NaiveDate;

use crate::query::{DATE_WIRE_FORMAT, DateRange, PlayerSlot, ReplayQuery};

/// How a filter-field edit was committed. `Confirm` covers the explicit
/// confirm key, `Blur` the field losing focus, `BackspaceEmpty` the
/// delete-to-empty gesture, which is the only empty commit that reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitGesture {
    Confirm,
    Blur,
    BackspaceEmpty,
}

/// Edit buffers plus the last-committed value per filter field. Only a commit
/// that actually changes a value writes into the query; the memo is what
/// makes repeated blurs and confirm keys idempotent.
#[derive(Debug, Clone, Default)]
pub struct FilterInputs {
    pub p1_input: String,
    pub p2_input: String,
    pub date_input: String,
    prev_p1: Option<String>,
    prev_p2: Option<String>,
    prev_recorded_at: Option<DateRange>,
}

impl FilterInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self, slot: PlayerSlot) -> &str {
        match slot {
            PlayerSlot::P1 => &self.p1_input,
            PlayerSlot::P2 => &self.p2_input,
        }
    }

    pub fn buffer_mut(&mut self, slot: PlayerSlot) -> &mut String {
        match slot {
            PlayerSlot::P1 => &mut self.p1_input,
            PlayerSlot::P2 => &mut self.p2_input,
        }
    }

    /// Commits a player-name field. Returns true when the caller must reload
    /// the result list. A non-empty change sets the filter and resets the
    /// page; an emptied field deletes the filter, reloading only for the
    /// backspace-to-empty gesture.
    pub fn commit_player(
        &mut self,
        slot: PlayerSlot,
        gesture: CommitGesture,
        query: &mut ReplayQuery,
    ) -> bool {
        let value = self.buffer(slot).to_string();
        if gesture == CommitGesture::BackspaceEmpty && !value.is_empty() {
            return false;
        }

        let previous = match slot {
            PlayerSlot::P1 => &mut self.prev_p1,
            PlayerSlot::P2 => &mut self.prev_p2,
        };
        if previous.as_deref() == Some(value.as_str()) {
            return false;
        }
        *previous = Some(value.clone());

        if value.is_empty() {
            query.clear_player(slot);
            query.page = 1;
            gesture == CommitGesture::BackspaceEmpty
        } else {
            query.set_player(slot, value);
            query.page = 1;
            true
        }
    }

    /// Applies a committed date range. Returns true when the range differs
    /// from the last committed one.
    pub fn apply_date(&mut self, range: DateRange, query: &mut ReplayQuery) -> bool {
        if self.prev_recorded_at == Some(range) {
            return false;
        }
        self.prev_recorded_at = Some(range);
        self.date_input = format_date_range(&range);
        query.recorded_at = Some(range);
        query.page = 1;
        true
    }

    /// Clears the date filter. Returns true when there was a range to clear.
    pub fn cancel_date(&mut self, query: &mut ReplayQuery) -> bool {
        self.date_input.clear();
        let had_range = self.prev_recorded_at.take().is_some() || query.recorded_at.is_some();
        query.recorded_at = None;
        query.page = 1;
        had_range
    }

    /// Character picks commit immediately, no memo involved. `None` is the
    /// "Any" choice that removes the filter. Always reloads.
    pub fn pick_character(
        &mut self,
        slot: PlayerSlot,
        id: Option<u32>,
        query: &mut ReplayQuery,
    ) -> bool {
        match id {
            Some(id) => query.set_character(slot, id),
            None => query.clear_character(slot),
        }
        query.page = 1;
        true
    }

    /// Fills buffers and memos from a restored query, so the next blur or
    /// confirm against unchanged fields is a no-op.
    pub fn populate_from(&mut self, query: &ReplayQuery) {
        self.p1_input = query.p1.clone().unwrap_or_default();
        self.p2_input = query.p2.clone().unwrap_or_default();
        self.prev_p1 = query.p1.clone();
        self.prev_p2 = query.p2.clone();
        self.prev_recorded_at = query.recorded_at;
        self.date_input = query
            .recorded_at
            .as_ref()
            .map(format_date_range)
            .unwrap_or_default();
    }
}

pub fn format_date_range(range: &DateRange) -> String {
    format!(
        "{} - {}",
        range.start.format(DATE_WIRE_FORMAT),
        range.end.format(DATE_WIRE_FORMAT)
    )
}

/// Parses a typed date-range, `DD/MM/YYYY - DD/MM/YYYY`. A single date is
/// read as a one-day range.
pub fn parse_date_input(raw: &str) -> Option<DateRange> {
    let mut dates = raw
        .split('-')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| NaiveDate::parse_from_str(part, DATE_WIRE_FORMAT));

    let start = dates.next()?.ok()?;
    match dates.next() {
        None => Some(DateRange::new(start, start)),
        Some(Ok(end)) => {
            if dates.next().is_some() {
                return None;
            }
            Some(DateRange::new(start, end))
        }
        Some(Err(_)) => None,
    }
}
