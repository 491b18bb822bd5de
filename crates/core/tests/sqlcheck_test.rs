#[path = "support/builders.rs"]
mod builders;
#[path = "support/fake_conn.rs"]
mod fake_conn;
#[path = "support/fake_driver.rs"]
mod fake_driver;

use builders::{int_column, table_in, varchar_column};
use driftql_core::{
    Change, ColumnChange, TableChange,
    Row, Value,
    sqlcheck::{Analyzer as _, CheckFile, CheckStmt, DataDependent, Destructive, Pass, Report, Severity},
};
use fake_conn::FakeConn;
use fake_driver::FakeDriver;

fn count_row(n: u64) -> Vec<Row> {
    vec![Row::new(vec!["n".to_string()], vec![Value::UInt(n)])]
}

fn check_file(changes: Vec<Change>) -> CheckFile {
    CheckFile {
        name: "1_change.sql".to_string(),
        stmts: vec![CheckStmt {
            pos: 0,
            text: "ALTER ...".to_string(),
            changes,
        }],
    }
}

#[test]
fn destructive_flags_drop_of_non_empty_table() {
    let driver = FakeDriver::new();
    let mut dev = FakeConn::new().with_result("SELECT COUNT(*) AS n FROM public.users", count_row(3));
    let file = check_file(vec![Change::DropTable {
        schema: Some("public".to_string()),
        name: "users".to_string(),
    }]);

    let mut report = Report::default();
    let mut pass = Pass {
        file: &file,
        driver: &driver,
        dev: Some(&mut dev),
        report: &mut report,
    };
    Destructive.analyze(&mut pass).expect("analyze");

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].severity, Severity::Error);
    assert!(report.has_errors());
}

#[test]
fn destructive_skips_empty_tables_with_dev_emulation() {
    let driver = FakeDriver::new();
    let mut dev = FakeConn::new().with_result("SELECT COUNT(*) AS n FROM public.users", count_row(0));
    let file = check_file(vec![Change::DropTable {
        schema: Some("public".to_string()),
        name: "users".to_string(),
    }]);

    let mut report = Report::default();
    let mut pass = Pass {
        file: &file,
        driver: &driver,
        dev: Some(&mut dev),
        report: &mut report,
    };
    Destructive.analyze(&mut pass).expect("analyze");
    assert!(report.is_empty());
}

#[test]
fn destructive_without_dev_assumes_the_worst() {
    let driver = FakeDriver::new();
    let mut table = table_in("public", "users");
    table.columns.push(varchar_column("email", 255));
    let file = check_file(vec![Change::ModifyTable {
        table,
        changes: vec![TableChange::DropColumn {
            name: "email".to_string(),
        }],
    }]);

    let mut report = Report::default();
    let mut pass = Pass {
        file: &file,
        driver: &driver,
        dev: None,
        report: &mut report,
    };
    Destructive.analyze(&mut pass).expect("analyze");
    assert!(report.has_errors());
}

#[test]
fn data_dependent_reports_the_implicit_fill() {
    let driver = FakeDriver {
        implicit_fill: Some("'a'".to_string()),
        ..FakeDriver::new()
    };
    let mut status = int_column("status");
    status.ty.nullable = false;
    let file = check_file(vec![Change::ModifyTable {
        table: table_in("public", "users"),
        changes: vec![TableChange::AddColumn(status)],
    }]);

    let mut report = Report::default();
    let mut pass = Pass {
        file: &file,
        driver: &driver,
        dev: None,
        report: &mut report,
    };
    DataDependent.analyze(&mut pass).expect("analyze");

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].severity, Severity::Warning);
    assert!(
        report.diagnostics[0]
            .message
            .contains("implicitly sets existing rows with 'a'"),
        "unexpected message: {}",
        report.diagnostics[0].message
    );
}

#[test]
fn data_dependent_ignores_nullable_or_defaulted_columns() {
    let driver = FakeDriver::new();
    let mut nullable = int_column("age");
    nullable.ty.nullable = true;
    let file = check_file(vec![Change::ModifyTable {
        table: table_in("public", "users"),
        changes: vec![TableChange::AddColumn(nullable)],
    }]);

    let mut report = Report::default();
    let mut pass = Pass {
        file: &file,
        driver: &driver,
        dev: None,
        report: &mut report,
    };
    DataDependent.analyze(&mut pass).expect("analyze");
    assert!(report.is_empty());
}

#[test]
fn data_dependent_flags_narrowing_and_family_changes() {
    let driver = FakeDriver::new();
    let wide = varchar_column("name", 255);
    let narrow = varchar_column("name", 10);
    let int_variant = int_column("name");

    let file = check_file(vec![Change::ModifyTable {
        table: table_in("public", "users"),
        changes: vec![
            TableChange::ModifyColumn {
                from: wide.clone(),
                to: narrow,
                kinds: ColumnChange::Type.into(),
            },
            TableChange::ModifyColumn {
                from: wide,
                to: int_variant,
                kinds: ColumnChange::Type.into(),
            },
        ],
    }]);

    let mut report = Report::default();
    let mut pass = Pass {
        file: &file,
        driver: &driver,
        dev: None,
        report: &mut report,
    };
    DataDependent.analyze(&mut pass).expect("analyze");

    assert_eq!(report.diagnostics.len(), 2);
    assert!(report.diagnostics[0].message.contains("truncate"));
    assert!(report.diagnostics[1].message.contains("family") || report.diagnostics[1].message.contains("changing type"));
}
