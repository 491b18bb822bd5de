use driftql_core::{Version, driver::TypeParseFormatter as _, schema::Type};
use driftql_dialect_postgres::Postgres;
use driftql_testkit::run_type_cases;

const CASES: &str = r"
cases:
  - raw: smallint
  - raw: integer
  - raw: bigint
  - raw: serial
  - raw: bigserial
  - raw: boolean
  - raw: numeric
  - raw: numeric(10,2)
  - raw: real
  - raw: double precision
  - raw: character varying(255)
  - raw: character(12)
  - raw: text
  - raw: bytea
  - raw: date
  - raw: time without time zone
  - raw: timestamp without time zone
  - raw: timestamp with time zone
  - raw: timestamp(3) with time zone
  - raw: interval
  - raw: json
  - raw: uuid
  - raw: money
  - raw: inet
  - raw: cidr
  - raw: macaddr
  - raw: bit(8)
  - raw: bit varying(16)
  - raw: point
  - raw: polygon
  - raw: integer[]
  - raw: character varying(64)[]
  - raw: int4
    normalized: integer
  - raw: int8
    normalized: bigint
  - raw: varchar(100)
    normalized: character varying(100)
  - raw: bool
    normalized: boolean
  - raw: decimal(6,3)
    normalized: numeric(6,3)
  - raw: float8
    normalized: double precision
  - raw: timestamptz
    normalized: timestamp with time zone
";

#[test]
fn postgres_types_round_trip() {
    let driver = Postgres::new(Version::new(15, 0, 0));
    run_type_cases(&driver, CASES);
}

#[test]
fn arrays_wrap_their_element_type() {
    let driver = Postgres::new(Version::new(15, 0, 0));
    let parsed = driver.parse_type("integer[]").expect("parse");
    let Type::Array(array) = parsed else {
        panic!("expected array, got {parsed:?}");
    };
    assert!(matches!(array.elem, Type::Integer(_)));
    assert_eq!(array.raw, "integer");
}

#[test]
fn unknown_spellings_become_user_defined() {
    let driver = Postgres::new(Version::new(15, 0, 0));
    let parsed = driver.parse_type("ticket_status").expect("parse");
    assert!(matches!(parsed, Type::UserDefined(_)));
    assert_eq!(driver.format_type(&parsed).expect("format"), "ticket_status");
}
