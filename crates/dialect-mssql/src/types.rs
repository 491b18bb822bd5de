use driftql_core::{
    Error, Result,
    schema::{
        BinaryType, BitType, DecimalType, FloatType, IntegerType, SpatialType, StringType,
        TimeType, Type,
    },
};

/// Parses a SQL Server type, e.g. `nvarchar(50)`, `varchar(MAX)`,
/// `decimal(18,2)`. National character types store the double-byte size
/// internally (`nvarchar(50)` carries size 100) and `MAX` is size -1; both
/// are undone by [`format_type`], which is the documented normalization.
pub fn parse_type(raw: &str) -> Result<Type> {
    let lowered = raw.trim().to_ascii_lowercase();
    let (name, args) = match lowered.find('(') {
        Some(open) => {
            let close = lowered.rfind(')').unwrap_or(lowered.len());
            (lowered[..open].trim(), lowered[open + 1..close].trim().to_string())
        }
        None => (lowered.as_str(), String::new()),
    };
    let is_max = args.eq_ignore_ascii_case("max");
    let ints: Vec<i64> = args
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect();

    let ty = match name {
        "tinyint" | "smallint" | "int" | "bigint" => Type::Integer(IntegerType {
            t: name.to_string(),
            unsigned: false,
        }),
        "bit" => Type::Bool,
        "decimal" | "numeric" => Type::Decimal(DecimalType {
            t: "decimal".to_string(),
            precision: ints.first().copied().unwrap_or(18) as u32,
            scale: ints.get(1).copied().unwrap_or(0) as u32,
            unsigned: false,
        }),
        "float" => Type::Float(FloatType {
            t: "float".to_string(),
            precision: ints.first().map(|p| *p as u32),
            unsigned: false,
        }),
        "real" => Type::Float(FloatType {
            t: "real".to_string(),
            precision: None,
            unsigned: false,
        }),
        "money" | "smallmoney" => Type::Currency,
        "char" | "varchar" | "text" => Type::String(StringType {
            t: name.to_string(),
            size: if is_max {
                Some(-1)
            } else {
                ints.first().copied()
            },
        }),
        // National types: declared n characters occupy 2n bytes.
        "nchar" | "nvarchar" | "ntext" => Type::String(StringType {
            t: name.to_string(),
            size: if is_max {
                Some(-1)
            } else {
                ints.first().map(|size| size * 2)
            },
        }),
        "binary" | "varbinary" | "image" => Type::Binary(BinaryType {
            t: name.to_string(),
            size: if is_max {
                Some(-1)
            } else {
                ints.first().copied()
            },
        }),
        "date" | "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset" | "time" => {
            Type::Time(TimeType {
                t: name.to_string(),
                precision: ints.first().map(|p| *p as u32),
            })
        }
        "uniqueidentifier" => Type::Uuid,
        "xml" => Type::Unsupported("xml".to_string()),
        "geometry" | "geography" => Type::Spatial(SpatialType {
            t: name.to_string(),
        }),
        "rowversion" | "timestamp" => Type::Bit(BitType {
            t: "rowversion".to_string(),
            size: None,
        }),
        other => Type::Unsupported(other.to_string()),
    };
    Ok(ty)
}

pub fn format_type(ty: &Type) -> Result<String> {
    Ok(match ty {
        Type::Integer(integer) => integer.t.clone(),
        Type::Bool => "bit".to_string(),
        Type::Decimal(decimal) => format!("decimal({},{})", decimal.precision, decimal.scale),
        Type::Float(float) => match float.precision {
            Some(precision) if float.t == "float" => format!("float({precision})"),
            _ => float.t.clone(),
        },
        Type::Currency => "money".to_string(),
        Type::String(string) => format_sized(&string.t, string.size),
        Type::Binary(binary) => format_sized(&binary.t, binary.size),
        Type::Time(time) => match time.precision {
            Some(precision) => format!("{}({precision})", time.t),
            None => time.t.clone(),
        },
        Type::Uuid => "uniqueidentifier".to_string(),
        Type::Spatial(spatial) => spatial.t.clone(),
        Type::Bit(_) => "rowversion".to_string(),
        Type::Unsupported(raw) => raw.clone(),
        other => {
            return Err(Error::Unsupported(format!(
                "sql server has no spelling for {other:?}"
            )));
        }
    })
}

fn format_sized(name: &str, size: Option<i64>) -> String {
    let national = matches!(name, "nchar" | "nvarchar");
    match size {
        Some(-1) => format!("{name}(MAX)"),
        Some(size) if national => format!("{name}({})", size / 2),
        Some(size) if sized(name) => format!("{name}({size})"),
        _ => name.to_string(),
    }
}

fn sized(name: &str) -> bool {
    matches!(name, "char" | "varchar" | "binary" | "varbinary")
}
