#![allow(dead_code)]

use driftql_core::schema::{
    Column, ColumnType, ForeignKey, Index, IntegerType, PartKind, Realm, Schema, StringType,
    Table, TableRef, Type,
};

pub fn int_column(name: &str) -> Column {
    Column::new(
        name,
        ColumnType::new(
            "int",
            Type::Integer(IntegerType {
                t: "int".to_string(),
                unsigned: false,
            }),
        ),
    )
}

pub fn varchar_column(name: &str, size: i64) -> Column {
    Column::new(
        name,
        ColumnType::new(
            format!("varchar({size})"),
            Type::String(StringType {
                t: "varchar".to_string(),
                size: Some(size),
            }),
        ),
    )
}

pub fn column_index(name: &str, column: &str) -> Index {
    let mut index = Index::named(name);
    index.push_part(PartKind::Column(column.to_string()));
    index
}

pub fn fk(symbol: &str, column: &str, ref_schema: &str, ref_table: &str) -> ForeignKey {
    ForeignKey {
        symbol: symbol.to_string(),
        columns: vec![column.to_string()],
        ref_table: TableRef::new(Some(ref_schema), ref_table),
        ref_columns: vec!["id".to_string()],
        on_update: None,
        on_delete: None,
        attrs: Vec::new(),
    }
}

pub fn table_in(schema: &str, name: &str) -> Table {
    let mut table = Table::named(name);
    table.schema = Some(schema.to_string());
    table.columns.push(int_column("id"));
    table
}

pub fn realm_of(schemas: Vec<Schema>) -> Realm {
    Realm {
        schemas,
        attrs: Vec::new(),
    }
}
