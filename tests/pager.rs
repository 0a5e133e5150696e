use replay_terminal::pager::{FetchTicket, LoadCompletion, LoadDecision, ReplayLoader};
use replay_terminal::query::{PlayerSlot, ReplayQuery};
use replay_terminal::state::{ReplayPage, ReplaySet};

fn sample_set(id: u64) -> ReplaySet {
    ReplaySet {
        replay_id: id,
        p1: "Ken".to_string(),
        p2: "Ryu".to_string(),
        p1icon: "ken.png".to_string(),
        p2icon: "ryu.png".to_string(),
        p1wins: 2,
        p2wins: 1,
        p1_character_id: 3,
        p2_character_id: 7,
        recorded_at: "Sat, 01 Jun 2024 18:23:11 GMT".to_string(),
        set: vec![id, id + 1],
    }
}

fn page_of(count: usize, max_page: u32) -> ReplayPage {
    ReplayPage {
        replays: (0..count as u64).map(sample_set).collect(),
        max_page,
    }
}

fn ken_query() -> ReplayQuery {
    let mut query = ReplayQuery::new();
    query.set_player(PlayerSlot::P1, "Ken".to_string());
    query
}

fn expect_fetch(decision: LoadDecision) -> FetchTicket {
    match decision {
        LoadDecision::Fetch(ticket) => ticket,
        other => panic!("expected fetch, got {other:?}"),
    }
}

#[test]
fn single_flight_suppresses_concurrent_triggers() {
    let mut loader = ReplayLoader::new(ReplayQuery::new());
    let query = ReplayQuery::new();

    let ticket = expect_fetch(loader.begin(&query));
    assert_eq!(ticket.page, 1);

    // Any number of triggers while the fetch is outstanding are no-ops.
    for _ in 0..5 {
        assert_eq!(loader.begin(&query), LoadDecision::Busy);
    }
    assert!(loader.cursor.loading);
}

#[test]
fn filter_change_resets_cursor_before_fetch() {
    let mut loader = ReplayLoader::new(ken_query());
    let ticket = expect_fetch(loader.begin(&ken_query()));
    loader.complete_success(ticket.epoch, &page_of(20, 5));
    assert_eq!(loader.cursor.current_page, 2);
    assert_eq!(loader.cursor.max_page, Some(5));

    let mut changed = ken_query();
    changed.set_player(PlayerSlot::P2, "Ryu".to_string());
    let ticket = expect_fetch(loader.begin(&changed));

    assert_eq!(ticket.page, 1);
    assert_eq!(ticket.query.page, 1);
    assert_eq!(loader.cursor.max_page, None);
    assert!(loader.active_query().same_filter(&changed));
}

#[test]
fn exhaustion_converges_to_no_ops() {
    let mut loader = ReplayLoader::new(ken_query());
    let ticket = expect_fetch(loader.begin(&ken_query()));

    let outcome = loader.complete_success(ticket.epoch, &page_of(0, 9));
    assert_eq!(
        outcome,
        LoadCompletion::Loaded {
            page: 1,
            appended: 0,
            exhausted: true
        }
    );
    // Empty response at page 1 bounds the view at page 0; the reported
    // max_page is not adopted.
    assert_eq!(loader.cursor.max_page, Some(0));
    assert_eq!(loader.cursor.current_page, 1);
    assert!(!loader.cursor.loading);

    for _ in 0..3 {
        assert_eq!(loader.begin(&ken_query()), LoadDecision::PastEnd);
    }

    // A filter change lifts the bound.
    let mut changed = ken_query();
    changed.set_character(PlayerSlot::P1, 3);
    let ticket = expect_fetch(loader.begin(&changed));
    assert_eq!(ticket.page, 1);
}

#[test]
fn single_page_result_keeps_scroll_live() {
    let mut loader = ReplayLoader::new(ReplayQuery::new());
    let ticket = expect_fetch(loader.begin(&ReplayQuery::new()));

    loader.complete_success(ticket.epoch, &page_of(8, 1));
    // max_page == 1 is stored as "unbounded" so later triggers still probe.
    assert_eq!(loader.cursor.max_page, None);
    assert_eq!(loader.cursor.current_page, 2);

    let ticket = expect_fetch(loader.begin(&ReplayQuery::new()));
    assert_eq!(ticket.page, 2);
}

#[test]
fn bounded_walkthrough_converges() {
    let mut loader = ReplayLoader::new(ken_query());

    let ticket = expect_fetch(loader.begin(&ken_query()));
    loader.complete_success(ticket.epoch, &page_of(20, 3));
    assert_eq!((loader.cursor.current_page, loader.cursor.max_page), (2, Some(3)));

    let ticket = expect_fetch(loader.begin(&ken_query()));
    loader.complete_success(ticket.epoch, &page_of(20, 3));
    assert_eq!((loader.cursor.current_page, loader.cursor.max_page), (3, Some(3)));

    let ticket = expect_fetch(loader.begin(&ken_query()));
    loader.complete_success(ticket.epoch, &page_of(5, 3));
    assert_eq!((loader.cursor.current_page, loader.cursor.max_page), (4, Some(3)));

    // Past the bound: no-op, cursor converges back to 1...
    assert_eq!(loader.begin(&ken_query()), LoadDecision::PastEnd);
    assert_eq!(loader.cursor.current_page, 1);
    // ...and stays a no-op (no duplicate fetch of page 1).
    assert_eq!(loader.begin(&ken_query()), LoadDecision::PastEnd);
}

#[test]
fn stale_epoch_response_is_discarded() {
    let mut loader = ReplayLoader::new(ken_query());
    let stale = expect_fetch(loader.begin(&ken_query()));

    // Filter edit mid-flight supersedes the outstanding request.
    let mut changed = ken_query();
    changed.set_player(PlayerSlot::P2, "Ryu".to_string());
    let fresh = expect_fetch(loader.begin(&changed));
    assert_ne!(stale.epoch, fresh.epoch);

    assert_eq!(
        loader.complete_success(stale.epoch, &page_of(20, 5)),
        LoadCompletion::Stale
    );
    // The guard still belongs to the fresh request.
    assert!(loader.cursor.loading);
    assert_eq!(loader.cursor.current_page, 1);

    let outcome = loader.complete_success(fresh.epoch, &page_of(10, 2));
    assert_eq!(
        outcome,
        LoadCompletion::Loaded {
            page: 1,
            appended: 10,
            exhausted: false
        }
    );
    assert_eq!(loader.cursor.current_page, 2);
}

#[test]
fn failure_releases_guard_without_moving_cursor() {
    let mut loader = ReplayLoader::new(ken_query());
    let ticket = expect_fetch(loader.begin(&ken_query()));

    assert!(loader.complete_failure(ticket.epoch));
    assert!(!loader.cursor.loading);
    assert_eq!(loader.cursor.current_page, 1);
    assert_eq!(loader.cursor.max_page, None);

    // Retry targets the same page.
    let retry = expect_fetch(loader.begin(&ken_query()));
    assert_eq!(retry.page, 1);

    // A failure from a superseded epoch is ignored.
    assert!(!loader.complete_failure(retry.epoch + 1));
}

#[test]
fn restore_resumes_one_page_past_snapshot() {
    let mut loader = ReplayLoader::new(ReplayQuery::new());
    let before = loader.epoch();

    let mut query = ken_query();
    query.page = 3;
    loader.restore(query, 3, Some(7));

    assert_eq!(loader.cursor.current_page, 4);
    assert_eq!(loader.cursor.max_page, Some(7));
    assert!(!loader.cursor.loading);
    assert!(loader.epoch() > before);

    let ticket = expect_fetch(loader.begin(&ken_query()));
    assert_eq!(ticket.page, 4);
}
