use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use chrono::NaiveDate;

use replay_terminal::fetch::parse_replay_page_json;
use replay_terminal::query::{DateRange, PlayerSlot, ReplayQuery};

const PAGE_JSON: &str = r#"{
  "replays": [
    {
      "replay_id": 9001,
      "p1": "Daigo",
      "p2": "Tokido",
      "p1icon": "ky.png",
      "p2icon": "sol.png",
      "p1wins": 2,
      "p2wins": 1,
      "p1_character_id": 2,
      "p2_character_id": 1,
      "recorded_at": "Sat, 01 Jun 2024 18:23:11 GMT",
      "set": [9001, 9002, 9003]
    },
    {
      "replay_id": 9004,
      "p1": "Punk",
      "p2": "MenaRD",
      "p1icon": "may.png",
      "p2icon": "axl.png",
      "p1wins": 0,
      "p2wins": 2,
      "p1_character_id": 3,
      "p2_character_id": 4,
      "recorded_at": "Sat, 01 Jun 2024 19:02:45 GMT",
      "set": [9004, 9005]
    }
  ],
  "max_page": 3
}"#;

fn bench_page_parse(c: &mut Criterion) {
    c.bench_function("replay_page_parse", |b| {
        b.iter(|| {
            let page = parse_replay_page_json(black_box(PAGE_JSON)).unwrap();
            black_box(page.max_page);
        })
    });
}

fn bench_query_serialize(c: &mut Criterion) {
    let mut query = ReplayQuery::new();
    query.set_player(PlayerSlot::P1, "Ken".to_string());
    query.set_player(PlayerSlot::P2, "Ryu".to_string());
    query.set_character(PlayerSlot::P1, 3);
    query.set_character(PlayerSlot::P2, 7);
    query.recorded_at = Some(DateRange::new(
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
    ));
    query.page = 12;

    c.bench_function("query_serialize", |b| {
        b.iter(|| {
            let serialized = black_box(&query).serialize();
            black_box(serialized.len());
        })
    });
}

criterion_group!(benches, bench_page_parse, bench_query_serialize);
criterion_main!(benches);
