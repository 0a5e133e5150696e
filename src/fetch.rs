use std::env;
use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use crate::icon_cache;
use crate::state::{CharacterIcon, ReplayPage};

const REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
const CLIENT_UA: &str = "replay-terminal/0.1";

static CLIENT: OnceCell<Client> = OnceCell::new();

fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

pub fn api_base() -> String {
    env::var("REPLAY_API_BASE")
        .ok()
        .map(|base| base.trim().trim_end_matches('/').to_string())
        .filter(|base| !base.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

/// A transport-level failure and a malformed body are not the same problem:
/// the former is transient unavailability, the latter a protocol mismatch.
/// Both abort the load without retrying; the UI surfaces the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Decode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchFailure {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Network,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Decode,
            message: message.into(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self.kind {
            FailureKind::Network => "network",
            FailureKind::Decode => "decode",
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure: {}", self.label(), self.message)
    }
}

/// Fetches one page of replay sets. `query` is the canonical pair list from
/// `ReplayQuery::query_pairs`; reqwest handles the URL encoding.
pub fn fetch_replay_page(query: &[(&'static str, String)]) -> Result<ReplayPage, FetchFailure> {
    let client = http_client().map_err(|err| FetchFailure::network(err.to_string()))?;
    let url = format!("{}/api/replay-sets", api_base());
    let resp = client
        .get(&url)
        .query(query)
        .header(USER_AGENT, CLIENT_UA)
        .send()
        .map_err(|err| FetchFailure::network(format!("replay request failed: {err}")))?;

    let status = resp.status();
    let body = resp
        .text()
        .map_err(|err| FetchFailure::network(format!("failed reading replay body: {err}")))?;
    if !status.is_success() {
        return Err(FetchFailure::network(format!(
            "http {}: {}",
            status,
            body_snippet(&body)
        )));
    }

    parse_replay_page_json(&body)
}

pub fn parse_replay_page_json(raw: &str) -> Result<ReplayPage, FetchFailure> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(ReplayPage {
            replays: Vec::new(),
            max_page: 0,
        });
    }
    serde_json::from_str(trimmed)
        .map_err(|err| FetchFailure::decode(format!("invalid replay page json: {err}")))
}

/// Fetches the character-icon roster, served from the disk cache while it is
/// fresh. Icons change rarely; a miss here is logged and the pickers simply
/// run without artwork labels.
pub fn fetch_character_icons() -> Result<Vec<CharacterIcon>> {
    if let Some(icons) = icon_cache::load_fresh() {
        return Ok(icons);
    }

    let client = http_client()?;
    let url = format!("{}/api/character-icons", api_base());
    let resp = client
        .get(&url)
        .header(USER_AGENT, CLIENT_UA)
        .send()
        .context("icon request failed")?;

    let status = resp.status();
    let body = resp.text().context("failed reading icon body")?;
    if !status.is_success() {
        return Err(anyhow::anyhow!(
            "icons http {}: {}",
            status,
            body_snippet(&body)
        ));
    }

    let icons = parse_character_icons_json(&body)?;
    icon_cache::store(&icons);
    Ok(icons)
}

pub fn parse_character_icons_json(raw: &str) -> Result<Vec<CharacterIcon>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).context("invalid character icon json")
}

fn body_snippet(body: &str) -> String {
    body.trim()
        .replace('\n', " ")
        .replace('\r', " ")
        .chars()
        .take(220)
        .collect()
}
