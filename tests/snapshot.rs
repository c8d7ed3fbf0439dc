mod common;

use std::fs;

use table_roller::{
    data::{Record, Value},
    decode::{DecodeOptions, InputFormat, decode_groups},
    error::SnapshotError,
    filter::parse_filter,
    normalize::{RawTable, normalize_tables},
    snapshot::Snapshot,
    state::AppState,
};

use common::{CYOA, TestWorkspace, WORKBOOK};

fn workbook_state() -> AppState {
    let groups = decode_groups(WORKBOOK.as_bytes(), &DecodeOptions::default()).unwrap();
    AppState::from_groups(groups).toggle_all()
}

#[test]
fn saved_snapshot_restores_an_equivalent_state() {
    let ws = TestWorkspace::new();
    let state = workbook_state()
        .set_mapping("Cost", "Price", Some(0))
        .set_mapping("Title", "Name", Some(1))
        .set_hidden("Tier", true)
        .set_filters(vec![parse_filter("price:Price < 100").unwrap()])
        .rename_group("Drawbacks", "Flaws")
        .unwrap();
    let state = state.keep(state.pool()[0].clone());

    let path = ws.path().join("snapshot.json");
    Snapshot::export(&state).save(&path).unwrap();
    let restored = Snapshot::load(&path).unwrap().import().unwrap();

    assert_eq!(restored.pool(), state.pool());
    assert_eq!(restored.kept(), state.kept());
    assert_eq!(restored.filters(), state.filters());
    assert_eq!(restored.groups(), state.groups());
    assert_eq!(restored.pool()[3].group, "Flaws");
    assert!(restored.pool()[3].record.contains_key("Name"));
}

#[test]
fn cyoa_snapshot_keeps_object_ids() {
    let options = DecodeOptions {
        format: InputFormat::Cyoa,
        ..DecodeOptions::default()
    };
    let state = AppState::from_groups(decode_groups(CYOA.as_bytes(), &options).unwrap())
        .select("powers", true)
        .unwrap();
    let text = Snapshot::export(&state).to_json().unwrap();
    let restored = Snapshot::from_json(&text).unwrap().import().unwrap();
    let ids = restored.pool().iter().filter_map(|r| r.id()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["o1", "o2"]);
    assert_eq!(restored.pool()[0].group, "Powers");
}

#[test]
fn corrupt_documents_are_rejected() {
    let ws = TestWorkspace::new();
    let garbage = ws.write("garbage.json", "{ not json");
    assert!(matches!(Snapshot::load(&garbage), Err(SnapshotError::Parse(_))));

    let missing = ws.path().join("missing.json");
    assert!(matches!(Snapshot::load(&missing), Err(SnapshotError::Io(_))));

    let mut snapshot = Snapshot::export(&workbook_state());
    snapshot.mapping.rules.push(table_roller::mapping::MappingRule {
        from: String::new(),
        to: "X".into(),
        order: 9,
    });
    assert!(matches!(snapshot.import(), Err(SnapshotError::Invalid(_))));

    let mut future = Snapshot::export(&workbook_state());
    future.version = 99;
    assert!(matches!(future.import(), Err(SnapshotError::Invalid(_))));
}

#[test]
fn hand_written_snapshot_replays_changes() {
    let ws = TestWorkspace::new();
    let path = ws.write(
        "hand.json",
        r#"{
  "version": 1,
  "selectedGroups": ["Perks"],
  "mapping": {
    "rules": [{"from": "Cost", "to": "Price", "order": 0}],
    "changes": [{"id": "c1", "from": "Cost", "to": "Price", "timestamp": 10}]
  },
  "sourceGroups": [{
    "name": "Perks",
    "kind": "sheet",
    "fields": [],
    "records": [{"Name": "Flight", "Cost": "50 CP", "_id": "r1"}]
  }]
}"#,
    );
    let state = Snapshot::load(&path).unwrap().import().unwrap();
    let record = &state.pool()[0].record;
    assert_eq!(record.keys().collect::<Vec<_>>(), vec!["Price", "Name", "_id"]);
    assert!(state.mapping().is_hidden("_id"));
    assert!(state.kept().is_empty());
    fs::remove_file(&path).unwrap();
}

#[test]
fn swapped_and_chained_renames_survive_a_reload() {
    let records: Vec<Record> = vec![
        [("A", "a"), ("B", "b"), ("C", "c")].into_iter().collect(),
        [("A", "a2"), ("B", "b2")].into_iter().collect(),
    ];
    let loaded = AppState::from_groups(normalize_tables(vec![RawTable {
        name: "Swaps".into(),
        records,
    }]))
    .toggle_all();

    let swapped = loaded
        .set_mapping("A", "B", Some(0))
        .set_mapping("B", "A", Some(1));
    let restored = Snapshot::export(&swapped).import().unwrap();
    assert_eq!(restored.pool(), swapped.pool());
    let first = &restored.pool()[0].record;
    assert_eq!(first.get("B"), Some(&Value::from("a")));
    assert_eq!(first.get("A"), Some(&Value::from("b")));

    let chained = loaded
        .set_mapping("A", "B", Some(0))
        .set_mapping("B", "C", Some(1))
        .set_mapping("C", "D", Some(2));
    let restored = Snapshot::export(&chained).import().unwrap();
    assert_eq!(restored.pool(), chained.pool());
}
