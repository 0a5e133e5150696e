use chrono::NaiveDate;

use replay_terminal::filters::{CommitGesture, FilterInputs, parse_date_input};
use replay_terminal::query::{DateRange, PlayerSlot, ReplayQuery};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn confirm_commits_new_value_and_resets_page() {
    let mut filters = FilterInputs::new();
    let mut query = ReplayQuery::new();
    query.page = 4;

    filters.p1_input = "Ken".to_string();
    assert!(filters.commit_player(PlayerSlot::P1, CommitGesture::Confirm, &mut query));
    assert_eq!(query.p1.as_deref(), Some("Ken"));
    assert_eq!(query.page, 1);

    // Same value again: no change, no reload.
    query.page = 4;
    assert!(!filters.commit_player(PlayerSlot::P1, CommitGesture::Confirm, &mut query));
    assert_eq!(query.page, 4);
}

#[test]
fn blur_on_emptied_field_deletes_without_reload() {
    let mut filters = FilterInputs::new();
    let mut query = ReplayQuery::new();

    filters.p2_input = "Ryu".to_string();
    assert!(filters.commit_player(PlayerSlot::P2, CommitGesture::Blur, &mut query));

    filters.p2_input.clear();
    let reload = filters.commit_player(PlayerSlot::P2, CommitGesture::Blur, &mut query);
    assert!(!reload);
    assert_eq!(query.p2, None);
    assert_eq!(query.page, 1);
}

#[test]
fn backspace_to_empty_deletes_and_reloads() {
    let mut filters = FilterInputs::new();
    let mut query = ReplayQuery::new();

    filters.p1_input = "Ken".to_string();
    filters.commit_player(PlayerSlot::P1, CommitGesture::Confirm, &mut query);

    filters.p1_input.clear();
    assert!(filters.commit_player(PlayerSlot::P1, CommitGesture::BackspaceEmpty, &mut query));
    assert_eq!(query.p1, None);

    // The gesture only fires on an empty buffer.
    filters.p1_input = "Ke".to_string();
    assert!(!filters.commit_player(PlayerSlot::P1, CommitGesture::BackspaceEmpty, &mut query));
    assert_eq!(query.p1, None);
}

#[test]
fn date_apply_is_memoized_and_cancel_clears() {
    let mut filters = FilterInputs::new();
    let mut query = ReplayQuery::new();
    let range = DateRange::new(date(2024, 5, 1), date(2024, 5, 31));

    assert!(filters.apply_date(range, &mut query));
    assert_eq!(query.recorded_at, Some(range));
    assert!(!filters.apply_date(range, &mut query));

    assert!(filters.cancel_date(&mut query));
    assert_eq!(query.recorded_at, None);
    assert!(filters.date_input.is_empty());

    // Nothing left to clear: no reload.
    assert!(!filters.cancel_date(&mut query));
}

#[test]
fn character_picks_always_reload() {
    let mut filters = FilterInputs::new();
    let mut query = ReplayQuery::new();
    query.page = 3;

    assert!(filters.pick_character(PlayerSlot::P1, Some(5), &mut query));
    assert_eq!(query.p1_character_id, Some(5));
    assert_eq!(query.page, 1);

    assert!(filters.pick_character(PlayerSlot::P1, None, &mut query));
    assert_eq!(query.p1_character_id, None);
}

#[test]
fn populate_from_restores_buffers_and_memos() {
    let mut query = ReplayQuery::new();
    query.set_player(PlayerSlot::P1, "Ken".to_string());
    query.recorded_at = Some(DateRange::new(date(2024, 5, 1), date(2024, 5, 31)));

    let mut filters = FilterInputs::new();
    filters.populate_from(&query);
    assert_eq!(filters.p1_input, "Ken");
    assert_eq!(filters.date_input, "01/05/2024 - 31/05/2024");

    // A blur against the restored value is not a change.
    assert!(!filters.commit_player(PlayerSlot::P1, CommitGesture::Blur, &mut query));
}

#[test]
fn date_input_parsing() {
    assert_eq!(
        parse_date_input("01/05/2024 - 31/05/2024"),
        Some(DateRange::new(date(2024, 5, 1), date(2024, 5, 31)))
    );
    // Single date reads as a one-day range.
    assert_eq!(
        parse_date_input("01/05/2024"),
        Some(DateRange::new(date(2024, 5, 1), date(2024, 5, 1)))
    );
    assert_eq!(parse_date_input("yesterday - today"), None);
    assert_eq!(parse_date_input(""), None);
    assert_eq!(parse_date_input("01/05/2024 - 02/05/2024 - 03/05/2024"), None);
}
