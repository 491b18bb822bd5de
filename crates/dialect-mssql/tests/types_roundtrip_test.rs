use driftql_core::{Version, driver::TypeParseFormatter as _, schema::{StringType, Type}};
use driftql_dialect_mssql::Mssql;
use driftql_testkit::run_type_cases;

const CASES: &str = r"
cases:
  - raw: int
  - raw: bigint
  - raw: smallint
  - raw: tinyint
  - raw: decimal(18,2)
  - raw: float(24)
  - raw: real
  - raw: money
  - raw: char(10)
  - raw: varchar(255)
  - raw: varchar(MAX)
  - raw: nchar(10)
  - raw: nvarchar(50)
  - raw: nvarchar(MAX)
  - raw: binary(16)
  - raw: varbinary(255)
  - raw: varbinary(MAX)
  - raw: date
  - raw: datetime
  - raw: datetime2(7)
  - raw: datetimeoffset(7)
  - raw: time(3)
  - raw: uniqueidentifier
  - raw: geography
  - raw: bit
";

#[test]
fn mssql_types_round_trip() {
    let driver = Mssql::new(Version::new(15, 0, 0));
    run_type_cases(&driver, CASES);
}

#[test]
fn national_types_store_double_byte_sizes() {
    let driver = Mssql::new(Version::new(15, 0, 0));
    let parsed = driver.parse_type("nvarchar(50)").expect("parse");
    let Type::String(StringType { t, size }) = &parsed else {
        panic!("expected string type, got {parsed:?}");
    };
    assert_eq!(t, "nvarchar");
    assert_eq!(*size, Some(100), "declared 50 characters occupy 100 bytes");
    assert_eq!(driver.format_type(&parsed).expect("format"), "nvarchar(50)");
}

#[test]
fn max_variants_store_negative_one() {
    let driver = Mssql::new(Version::new(15, 0, 0));
    for raw in ["varchar(MAX)", "nvarchar(MAX)", "varbinary(MAX)"] {
        let parsed = driver.parse_type(raw).expect("parse");
        let size = match &parsed {
            Type::String(StringType { size, .. }) => *size,
            Type::Binary(binary) => binary.size,
            other => panic!("unexpected type for {raw}: {other:?}"),
        };
        assert_eq!(size, Some(-1), "{raw} must store size -1");
        assert_eq!(driver.format_type(&parsed).expect("format"), raw);
    }
}
