use chrono::NaiveDate;

/// Wire format for the two dates inside the `recorded_at` filter value.
pub const DATE_WIRE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerSlot {
    P1,
    P2,
}

impl PlayerSlot {
    pub fn label(self) -> &'static str {
        match self {
            PlayerSlot::P1 => "p1",
            PlayerSlot::P2 => "p2",
        }
    }
}

/// Inclusive calendar-date range for the `recorded_at` filter. Serialized on
/// the wire as a JSON two-element array of `DD/MM/YYYY` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    pub fn to_wire(&self) -> String {
        format!(
            "[\"{}\",\"{}\"]",
            self.start.format(DATE_WIRE_FORMAT),
            self.end.format(DATE_WIRE_FORMAT)
        )
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        let parts: Vec<String> = serde_json::from_str(raw).ok()?;
        let [start, end] = parts.as_slice() else {
            return None;
        };
        let start = NaiveDate::parse_from_str(start, DATE_WIRE_FORMAT).ok()?;
        let end = NaiveDate::parse_from_str(end, DATE_WIRE_FORMAT).ok()?;
        Some(Self::new(start, end))
    }
}

/// Canonical search filter. The serialized form is deterministic (fixed key
/// order, absent filters omitted) so two queries can be compared by string
/// equality, and the same pairs feed the fetch layer unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayQuery {
    pub p1: Option<String>,
    pub p2: Option<String>,
    pub recorded_at: Option<DateRange>,
    pub p1_character_id: Option<u32>,
    pub p2_character_id: Option<u32>,
    pub page: u32,
}

impl Default for ReplayQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayQuery {
    pub fn new() -> Self {
        Self {
            p1: None,
            p2: None,
            recorded_at: None,
            p1_character_id: None,
            p2_character_id: None,
            page: 1,
        }
    }

    /// Parses a raw `k=v&k=v` query string, e.g. from `REPLAY_QUERY` or a
    /// stored history entry. Unknown keys and malformed values are dropped.
    pub fn parse(raw: &str) -> Self {
        let mut query = Self::new();
        for pair in raw.trim().trim_start_matches('?').split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            match key {
                "p1" => query.p1 = Some(value.to_string()),
                "p2" => query.p2 = Some(value.to_string()),
                "recorded_at" => query.recorded_at = DateRange::from_wire(value),
                "p1_character_id" => query.p1_character_id = value.parse().ok(),
                "p2_character_id" => query.p2_character_id = value.parse().ok(),
                "page" => query.page = value.parse().unwrap_or(1).max(1),
                _ => {}
            }
        }
        query
    }

    /// Filter pairs in canonical order, `page` always last and always present.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(6);
        if let Some(p1) = &self.p1 {
            pairs.push(("p1", p1.clone()));
        }
        if let Some(p2) = &self.p2 {
            pairs.push(("p2", p2.clone()));
        }
        if let Some(range) = &self.recorded_at {
            pairs.push(("recorded_at", range.to_wire()));
        }
        if let Some(id) = self.p1_character_id {
            pairs.push(("p1_character_id", id.to_string()));
        }
        if let Some(id) = self.p2_character_id {
            pairs.push(("p2_character_id", id.to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs
    }

    pub fn serialize(&self) -> String {
        let pairs: Vec<String> = self
            .query_pairs()
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        pairs.join("&")
    }

    /// Serialization with `page` stripped; the equality key for telling a
    /// genuine filter change apart from a page bump.
    pub fn filter_key(&self) -> String {
        let pairs: Vec<String> = self
            .query_pairs()
            .into_iter()
            .filter(|(key, _)| *key != "page")
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        pairs.join("&")
    }

    pub fn same_filter(&self, other: &ReplayQuery) -> bool {
        self.filter_key() == other.filter_key()
    }

    pub fn player(&self, slot: PlayerSlot) -> Option<&str> {
        match slot {
            PlayerSlot::P1 => self.p1.as_deref(),
            PlayerSlot::P2 => self.p2.as_deref(),
        }
    }

    pub fn set_player(&mut self, slot: PlayerSlot, name: String) {
        match slot {
            PlayerSlot::P1 => self.p1 = Some(name),
            PlayerSlot::P2 => self.p2 = Some(name),
        }
    }

    pub fn clear_player(&mut self, slot: PlayerSlot) {
        match slot {
            PlayerSlot::P1 => self.p1 = None,
            PlayerSlot::P2 => self.p2 = None,
        }
    }

    pub fn character(&self, slot: PlayerSlot) -> Option<u32> {
        match slot {
            PlayerSlot::P1 => self.p1_character_id,
            PlayerSlot::P2 => self.p2_character_id,
        }
    }

    pub fn set_character(&mut self, slot: PlayerSlot, id: u32) {
        match slot {
            PlayerSlot::P1 => self.p1_character_id = Some(id),
            PlayerSlot::P2 => self.p2_character_id = Some(id),
        }
    }

    pub fn clear_character(&mut self, slot: PlayerSlot) {
        match slot {
            PlayerSlot::P1 => self.p1_character_id = None,
            PlayerSlot::P2 => self.p2_character_id = None,
        }
    }
}
