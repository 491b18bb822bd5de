use driftql_core::migrate::{Formatter, Plan, PlanStmt};

fn sample_plan(reversible: bool) -> Plan {
    let mut stmts = vec![
        PlanStmt::new("CREATE TABLE users (id int)")
            .reversible("DROP TABLE users")
            .commented("create table users"),
    ];
    if reversible {
        stmts.push(
            PlanStmt::new("CREATE UNIQUE INDEX users_email ON users (email)")
                .reversible("DROP INDEX users_email"),
        );
    } else {
        stmts.push(PlanStmt::new("DROP TABLE legacy"));
    }
    Plan::from_stmts("add_users", true, stmts)
}

#[test]
fn plan_is_reversible_only_when_every_statement_reverses() {
    assert!(sample_plan(true).reversible);
    assert!(!sample_plan(false).reversible);
}

#[test]
fn formatter_names_files_from_the_template() {
    let file = Formatter::default().format(&sample_plan(true), Some("20240115"));
    assert_eq!(file.name(), "20240115_add_users.sql");
    assert_eq!(file.version(), "20240115");
    assert_eq!(file.desc(), "add_users");
}

#[test]
fn formatter_defaults_to_a_timestamp_version() {
    let file = Formatter::default().format(&sample_plan(true), None);
    assert!(file.name().ends_with("_add_users.sql"));
    let version = file.version();
    assert_eq!(version.len(), 14, "timestamp version: {version}");
    assert!(version.chars().all(|c| c.is_ascii_digit()));
}

#[test]
fn formatter_renders_comments_and_terminators() {
    let file = Formatter::default().format(&sample_plan(true), Some("1"));
    let content = String::from_utf8(file.bytes().to_vec()).expect("utf-8");
    assert_eq!(
        content,
        "-- create table users\nCREATE TABLE users (id int);\nCREATE UNIQUE INDEX users_email ON users (email);\n"
    );
}

#[test]
fn custom_name_templates_are_honored() {
    let file = Formatter::new("{version}.sql").format(&sample_plan(true), Some("0001"));
    assert_eq!(file.name(), "0001.sql");
}
