use std::collections::{BTreeMap, BTreeSet};

use crate::{
    Change, TableChange,
    schema::{Table, TableRef},
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct TableKey {
    schema: Option<String>,
    name: String,
}

impl TableKey {
    fn of_table(table: &Table) -> Self {
        Self {
            schema: table.schema.clone(),
            name: table.name.clone(),
        }
    }

    fn of_ref(reference: &TableRef, fallback_schema: Option<&String>) -> Self {
        Self {
            schema: reference.schema.clone().or_else(|| fallback_schema.cloned()),
            name: reference.name.clone(),
        }
    }
}

/// Breaks foreign-key cycles among newly added tables: the offending
/// constraints are stripped from their `AddTable` and re-emitted as deferred
/// `AddForeignKey` modifications after all table creations, so re-applying
/// the list in order never references a not-yet-created table.
///
/// This is the only reordering the generic layer performs.
#[must_use]
pub fn break_add_cycles(changes: Vec<Change>) -> Vec<Change> {
    let added_tables = changes
        .iter()
        .filter_map(|change| match change {
            Change::AddTable(table) => Some(table),
            _ => None,
        })
        .collect::<Vec<_>>();
    if added_tables.len() < 2 {
        return changes;
    }

    let index_by_table = added_tables
        .iter()
        .enumerate()
        .map(|(idx, table)| (TableKey::of_table(table), idx))
        .collect::<BTreeMap<_, _>>();
    let dependencies = build_dependencies(&added_tables, &index_by_table);
    let cyclic_edges = find_cyclic_edges(&dependencies);
    if cyclic_edges.is_empty() {
        return changes;
    }

    let mut rewritten = Vec::with_capacity(changes.len());
    let mut deferred = Vec::new();
    let mut node_idx = 0;

    for change in changes {
        match change {
            Change::AddTable(mut table) => {
                let source_key = TableKey::of_table(&table);
                let mut retained = Vec::with_capacity(table.foreign_keys.len());

                for fk in std::mem::take(&mut table.foreign_keys) {
                    let target_key = TableKey::of_ref(&fk.ref_table, table.schema.as_ref());
                    if target_key == source_key {
                        retained.push(fk);
                        continue;
                    }
                    let Some(target_idx) = index_by_table.get(&target_key).copied() else {
                        retained.push(fk);
                        continue;
                    };
                    if cyclic_edges.contains(&(node_idx, target_idx)) {
                        deferred.push((table.clone(), fk));
                    } else {
                        retained.push(fk);
                    }
                }

                table.foreign_keys = retained;
                node_idx += 1;
                rewritten.push(Change::AddTable(table));
            }
            other => rewritten.push(other),
        }
    }

    for (mut table, fk) in deferred {
        table.foreign_keys.push(fk.clone());
        rewritten.push(Change::ModifyTable {
            table,
            changes: vec![TableChange::AddForeignKey(fk)],
        });
    }
    rewritten
}

fn build_dependencies(
    tables: &[&Table],
    index_by_table: &BTreeMap<TableKey, usize>,
) -> Vec<BTreeSet<usize>> {
    let mut dependencies = vec![BTreeSet::new(); tables.len()];
    for (idx, table) in tables.iter().enumerate() {
        let source_key = TableKey::of_table(table);
        for fk in &table.foreign_keys {
            let target_key = TableKey::of_ref(&fk.ref_table, table.schema.as_ref());
            if target_key == source_key {
                continue;
            }
            if let Some(target_idx) = index_by_table.get(&target_key).copied() {
                dependencies[idx].insert(target_idx);
            }
        }
    }
    dependencies
}

fn find_cyclic_edges(dependencies: &[BTreeSet<usize>]) -> BTreeSet<(usize, usize)> {
    let mut cyclic_edges = BTreeSet::new();
    for (source_idx, targets) in dependencies.iter().enumerate() {
        for target_idx in targets {
            if can_reach(*target_idx, source_idx, dependencies) {
                cyclic_edges.insert((source_idx, *target_idx));
            }
        }
    }
    cyclic_edges
}

fn can_reach(start: usize, target: usize, dependencies: &[BTreeSet<usize>]) -> bool {
    let mut stack = vec![start];
    let mut visited = BTreeSet::new();

    while let Some(node_idx) = stack.pop() {
        if node_idx == target {
            return true;
        }
        if !visited.insert(node_idx) {
            continue;
        }
        for next_idx in &dependencies[node_idx] {
            if !visited.contains(next_idx) {
                stack.push(*next_idx);
            }
        }
    }

    false
}
