use driftql_core::{driver::TypeParseFormatter as _, schema::Type};
use driftql_dialect_spanner::Spanner;
use driftql_testkit::run_type_cases;

const CASES: &str = r"
cases:
  - raw: INT64
  - raw: BOOL
  - raw: FLOAT64
  - raw: FLOAT32
  - raw: NUMERIC
  - raw: STRING(100)
  - raw: STRING(MAX)
  - raw: BYTES(1024)
  - raw: BYTES(MAX)
  - raw: DATE
  - raw: TIMESTAMP
  - raw: JSON
  - raw: ARRAY<INT64>
  - raw: ARRAY<STRING(36)>
";

#[test]
fn spanner_types_round_trip() {
    let driver = Spanner::new(std::env::temp_dir());
    run_type_cases(&driver, CASES);
}

#[test]
fn arrays_nest_their_element_types() {
    let driver = Spanner::new(std::env::temp_dir());
    let parsed = driver.parse_type("ARRAY<STRING(36)>").expect("parse");
    let Type::Array(array) = parsed else {
        panic!("expected array, got something else");
    };
    assert!(matches!(array.elem, Type::String(_)));
    assert_eq!(array.raw, "STRING(36)");
}
