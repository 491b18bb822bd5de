#[path = "support/fake_conn.rs"]
mod fake_conn;

use std::{collections::BTreeMap, time::Duration};

use chrono::Utc;
use driftql_core::migrate::{
    ExecutionState, MemRevisions, Revision, RevisionIdent, RevisionReadWriter,
};
use fake_conn::FakeConn;

fn revision(version: &str, state: ExecutionState) -> Revision {
    Revision {
        version: version.to_string(),
        description: "init".to_string(),
        state,
        executed_at: Utc::now(),
        execution_time: Duration::from_millis(15),
        hash: "h1:abc".to_string(),
        operator_version: "0.1.0".to_string(),
        meta: BTreeMap::new(),
    }
}

#[test]
fn execution_state_round_trips_through_strings() {
    for state in [
        ExecutionState::Pending,
        ExecutionState::Applied,
        ExecutionState::Failed,
        ExecutionState::RolledBack,
    ] {
        assert_eq!(ExecutionState::parse(state.as_str()).expect("parse"), state);
    }
    assert!(ExecutionState::parse("unknown").is_err());
}

#[test]
fn write_upserts_by_version_and_read_orders_ascending() {
    let store = MemRevisions::new();
    let mut conn = FakeConn::new();

    store
        .write(
            &mut conn,
            &[revision("2", ExecutionState::Pending), revision("1", ExecutionState::Applied)],
        )
        .expect("write");
    store
        .write(&mut conn, &[revision("2", ExecutionState::Applied)])
        .expect("upsert");

    let read = store.read(&mut conn).expect("read");
    let versions: Vec<&str> = read.iter().map(|r| r.version.as_str()).collect();
    assert_eq!(versions, vec!["1", "2"]);
    assert_eq!(read[1].state, ExecutionState::Applied);
}

#[test]
fn meta_map_encodes_as_json() {
    let mut rev = revision("1", ExecutionState::Failed);
    rev.meta.insert("applied_stmts".to_string(), "3".to_string());
    rev.meta.insert("error".to_string(), "boom".to_string());

    let encoded = rev.meta_json().expect("encode");
    let decoded = Revision::meta_from_json(&encoded).expect("decode");
    assert_eq!(decoded, rev.meta);

    assert!(Revision::meta_from_json("").expect("empty ok").is_empty());
    assert!(Revision::meta_from_json("not json").is_err());
}

#[test]
fn default_ident_names_the_shared_revision_table() {
    let ident = RevisionIdent::default();
    assert_eq!(ident.schema, "atlas_schema_revisions");
    assert_eq!(ident.name, "atlas_schema_revisions");
}
