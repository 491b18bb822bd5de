use driftql_core::migrate::{ScanOptions, directive, file_directives, scan, stmts};

fn default_opts() -> ScanOptions {
    ScanOptions::default()
}

#[test]
fn splits_on_semicolons() {
    let sql = "CREATE TABLE a (id int);\nCREATE TABLE b (id int);\n";
    let out = stmts(sql, &default_opts()).expect("scan must succeed");
    assert_eq!(
        out,
        vec!["CREATE TABLE a (id int)", "CREATE TABLE b (id int)"]
    );
}

#[test]
fn semicolons_inside_strings_and_identifiers_do_not_split() {
    let sql = "INSERT INTO t VALUES ('a;b', \"c;d\", `e;f`);\nSELECT 1;";
    let out = stmts(sql, &default_opts()).expect("scan must succeed");
    assert_eq!(out.len(), 2);
    assert!(out[0].contains("'a;b'"));
}

#[test]
fn doubled_quotes_escape_inside_strings() {
    let sql = "INSERT INTO t VALUES ('it''s; fine');";
    let out = stmts(sql, &default_opts()).expect("scan must succeed");
    assert_eq!(out.len(), 1);
}

#[test]
fn backslash_escapes_are_dialect_gated() {
    let sql = r"INSERT INTO t VALUES ('a\'; b');SELECT 1;";
    let mysql = ScanOptions {
        backslash_escapes: true,
        ..ScanOptions::default()
    };
    assert_eq!(stmts(sql, &mysql).expect("scan must succeed").len(), 2);
}

#[test]
fn comments_attach_to_the_following_statement() {
    let sql = "-- create the users table\n-- with a single column\nCREATE TABLE users (id int);";
    let decls = scan(sql, &default_opts()).expect("scan must succeed");
    assert_eq!(decls.len(), 1);
    assert_eq!(decls[0].comments.len(), 2);
    assert_eq!(decls[0].comments[0], "-- create the users table");
    assert!(decls[0].pos > 0);
    assert_eq!(decls[0].text, "CREATE TABLE users (id int)");
}

#[test]
fn statement_positions_are_byte_offsets() {
    let sql = "SELECT 1;\nSELECT 2;";
    let decls = scan(sql, &default_opts()).expect("scan must succeed");
    assert_eq!(decls[0].pos, 0);
    assert_eq!(decls[1].pos, 10);
}

#[test]
fn delimiter_directive_changes_the_separator() {
    let sql = "-- atlas:delimiter ;;\nCREATE PROCEDURE p() BEGIN SELECT 1; SELECT 2; END;;\nSELECT 3;;";
    let out = stmts(sql, &default_opts()).expect("scan must succeed");
    assert_eq!(out.len(), 2);
    assert!(out[0].starts_with("CREATE PROCEDURE"));
    assert!(out[0].contains("SELECT 2; END"));
}

#[test]
fn begin_end_blocks_swallow_semicolons() {
    let sql = "CREATE TRIGGER tr BEFORE INSERT ON t FOR EACH ROW BEGIN UPDATE x SET n = 1; END;\nSELECT 1;";
    let opts = ScanOptions {
        match_begin: true,
        ..ScanOptions::default()
    };
    let out = stmts(sql, &opts).expect("scan must succeed");
    assert_eq!(out.len(), 2);
    assert!(out[0].ends_with("END"));
}

#[test]
fn begin_atomic_blocks_require_the_atomic_keyword() {
    let opts = ScanOptions {
        match_begin_atomic: true,
        ..ScanOptions::default()
    };
    let atomic = "CREATE FUNCTION f() BEGIN ATOMIC SELECT 1; END;SELECT 2;";
    assert_eq!(stmts(atomic, &opts).expect("scan must succeed").len(), 2);

    // A bare BEGIN does not open a block in atomic mode.
    let plain = "BEGIN; SELECT 1;";
    assert_eq!(stmts(plain, &opts).expect("scan must succeed").len(), 2);
}

#[test]
fn dollar_quoted_bodies_are_opaque() {
    let sql = "CREATE FUNCTION f() RETURNS int AS $fn$ SELECT 1; SELECT 2; $fn$ LANGUAGE sql;SELECT 3;";
    let opts = ScanOptions {
        match_dollar_quote: true,
        ..ScanOptions::default()
    };
    let out = stmts(sql, &opts).expect("scan must succeed");
    assert_eq!(out.len(), 2);
    assert!(out[0].contains("$fn$ SELECT 1; SELECT 2; $fn$"));
}

#[test]
fn directive_parsing_matches_name_and_args() {
    assert_eq!(
        directive("-- atlas:delimiter ;;", "delimiter"),
        Some(";;".to_string())
    );
    assert_eq!(
        directive("/* atlas:sum ignore */", "sum"),
        Some("ignore".to_string())
    );
    assert_eq!(directive("-- atlas:sum ignore", "delimiter"), None);
    assert_eq!(directive("-- just a comment", "sum"), None);
}

#[test]
fn file_directives_require_a_blank_separator() {
    let with_block = "-- atlas:txmode none\n-- atlas:sum ignore\n\nSELECT 1;\n";
    let directives = file_directives(with_block);
    assert_eq!(
        directives,
        vec![
            ("txmode".to_string(), "none".to_string()),
            ("sum".to_string(), "ignore".to_string()),
        ]
    );

    let without_separator = "-- atlas:txmode none\nSELECT 1;\n";
    assert!(file_directives(without_separator).is_empty());
}
