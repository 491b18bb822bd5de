#[path = "support/builders.rs"]
mod builders;

use builders::{fk, int_column, table_in};
use driftql_core::{
    Change, TableChange,
    diff::{DiffDriver, DiffEngine, break_add_cycles},
    schema::Schema,
};

struct DefaultDriver;

impl DiffDriver for DefaultDriver {}

#[test]
fn two_new_tables_with_mutual_fks_defer_the_cycle() {
    let mut a = table_in("public", "a");
    a.columns.push(int_column("b_id"));
    a.foreign_keys.push(fk("a_b_fk", "b_id", "public", "b"));
    let mut b = table_in("public", "b");
    b.columns.push(int_column("a_id"));
    b.foreign_keys.push(fk("b_a_fk", "a_id", "public", "a"));

    let changes = break_add_cycles(vec![Change::AddTable(a), Change::AddTable(b)]);

    // Both creations come first; the broken constraints trail as deferred
    // foreign-key additions.
    let tags: Vec<&str> = changes.iter().map(Change::tag).collect();
    assert_eq!(
        tags,
        vec!["AddTable", "AddTable", "ModifyTable", "ModifyTable"]
    );

    for change in &changes[2..] {
        let Change::ModifyTable { changes, .. } = change else {
            panic!("expected deferred ModifyTable, got {change:?}");
        };
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0], TableChange::AddForeignKey(_)));
    }

    // The constraint was stripped from at least one of the creations.
    let retained: usize = changes[..2]
        .iter()
        .map(|change| match change {
            Change::AddTable(table) => table.foreign_keys.len(),
            _ => 0,
        })
        .sum();
    assert!(retained < 2, "cycle not broken: {changes:?}");
}

#[test]
fn acyclic_fk_chain_is_left_untouched() {
    let mut parent = table_in("public", "parent");
    parent.columns.push(int_column("id"));
    let mut child = table_in("public", "child");
    child.columns.push(int_column("parent_id"));
    child
        .foreign_keys
        .push(fk("child_parent_fk", "parent_id", "public", "parent"));

    let changes = break_add_cycles(vec![
        Change::AddTable(parent),
        Change::AddTable(child.clone()),
    ]);

    assert_eq!(changes.len(), 2);
    let Change::AddTable(emitted_child) = &changes[1] else {
        panic!("expected AddTable");
    };
    assert_eq!(emitted_child.foreign_keys.len(), 1);
}

#[test]
fn self_referencing_fk_is_not_a_cycle() {
    let mut node = table_in("public", "node");
    node.columns.push(int_column("parent_id"));
    node.foreign_keys
        .push(fk("node_parent_fk", "parent_id", "public", "node"));
    let other = table_in("public", "other");

    let changes = break_add_cycles(vec![Change::AddTable(node), Change::AddTable(other)]);
    assert_eq!(changes.len(), 2);
    let Change::AddTable(table) = &changes[0] else {
        panic!("expected AddTable");
    };
    assert_eq!(table.foreign_keys.len(), 1);
}

#[test]
fn schema_diff_applies_cycle_breaking_end_to_end() {
    let from = Schema::named("public");
    let mut to = Schema::named("public");

    let mut a = table_in("public", "a");
    a.columns.push(int_column("b_id"));
    a.foreign_keys.push(fk("a_b_fk", "b_id", "public", "b"));
    let mut b = table_in("public", "b");
    b.columns.push(int_column("a_id"));
    b.foreign_keys.push(fk("b_a_fk", "a_id", "public", "a"));
    to.tables.push(a);
    to.tables.push(b);

    static DRIVER: DefaultDriver = DefaultDriver;
    let changes = DiffEngine::new(&DRIVER)
        .schema_diff(&from, &to)
        .expect("diff must succeed");

    let add_positions: Vec<usize> = changes
        .iter()
        .enumerate()
        .filter_map(|(idx, change)| matches!(change, Change::AddTable(_)).then_some(idx))
        .collect();
    let deferred_positions: Vec<usize> = changes
        .iter()
        .enumerate()
        .filter_map(|(idx, change)| matches!(change, Change::ModifyTable { .. }).then_some(idx))
        .collect();

    assert!(!deferred_positions.is_empty(), "no deferred fks: {changes:?}");
    let last_add = add_positions.last().copied().unwrap_or(0);
    assert!(
        deferred_positions.iter().all(|idx| *idx > last_add),
        "deferred fks must follow all creations: {changes:?}"
    );
}
