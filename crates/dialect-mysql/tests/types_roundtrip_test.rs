use driftql_core::{Version, schema::Type};
use driftql_dialect_mysql::MySql;
use driftql_testkit::run_type_cases;

const CASES: &str = r"
cases:
  - raw: int
  - raw: bigint
  - raw: tinyint
  - raw: int unsigned
  - raw: bigint unsigned
  - raw: varchar(255)
  - raw: char(36)
  - raw: text
  - raw: longtext
  - raw: binary(16)
  - raw: varbinary(255)
  - raw: blob
  - raw: decimal(10,2)
  - raw: decimal(65,30) unsigned
  - raw: float
  - raw: double
  - raw: bit(4)
  - raw: date
  - raw: datetime(6)
  - raw: timestamp(6)
  - raw: time
  - raw: year
  - raw: json
  - raw: point
  - raw: geometry
  - raw: enum('a','b')
  - raw: set('x','y')
  - raw: tinyint(1)
    normalized: bool
  - raw: boolean
    normalized: bool
  - raw: numeric(8,3)
    normalized: decimal(8,3)
  - raw: real
    normalized: double
  - raw: float(30)
    normalized: double
";

#[test]
fn mysql_types_round_trip() {
    let driver = MySql::new(Version::new(8, 0, 33));
    run_type_cases(&driver, CASES);
}

#[test]
fn tinyint_width_one_is_boolean() {
    let driver = MySql::new(Version::new(8, 0, 33));
    let parsed = driftql_core::driver::TypeParseFormatter::parse_type(&driver, "tinyint(1)")
        .expect("parse");
    assert!(matches!(parsed, Type::Bool));

    // The unsigned spelling stays an integer.
    let unsigned =
        driftql_core::driver::TypeParseFormatter::parse_type(&driver, "tinyint(1) unsigned")
            .expect("parse");
    assert!(matches!(unsigned, Type::Integer(_)));
}

#[test]
fn enum_values_survive_embedded_quotes() {
    let driver = MySql::new(Version::new(8, 0, 33));
    let parsed = driftql_core::driver::TypeParseFormatter::parse_type(&driver, "enum('a','it''s')")
        .expect("parse");
    let Type::Enum(enum_ref) = parsed else {
        panic!("expected enum, got {parsed:?}");
    };
    assert_eq!(enum_ref.values, vec!["a".to_string(), "it's".to_string()]);
}
