use driftql_core::{driver::TypeParseFormatter as _, schema::Type};
use driftql_dialect_sqlite::SQLite;
use driftql_testkit::run_type_cases;

const CASES: &str = r"
cases:
  - raw: integer
  - raw: int
  - raw: bigint
  - raw: text
  - raw: varchar(255)
  - raw: char(10)
  - raw: blob
  - raw: real
  - raw: double
  - raw: numeric
  - raw: numeric(10,2)
  - raw: date
  - raw: datetime
  - raw: timestamp
  - raw: json
  - raw: bool
    normalized: boolean
";

#[test]
fn sqlite_types_round_trip() {
    let driver = SQLite::new(std::env::temp_dir());
    run_type_cases(&driver, CASES);
}

#[test]
fn unknown_spellings_are_preserved_verbatim() {
    let driver = SQLite::new(std::env::temp_dir());
    let parsed = driver.parse_type("something custom").expect("parse");
    assert!(matches!(parsed, Type::Unsupported(_)));
    assert_eq!(
        driver.format_type(&parsed).expect("format"),
        "something custom"
    );
}
