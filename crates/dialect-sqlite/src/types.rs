use driftql_core::{
    Result,
    schema::{BinaryType, DecimalType, IntegerType, StringType, TimeType, Type},
};

/// SQLite types are affinities: the declared spelling is preserved in the
/// schema, so parsing keeps the original name and formatting echoes it.
pub fn parse_type(raw: &str) -> Result<Type> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let (name, args) = match lowered.find('(') {
        Some(open) => {
            let close = lowered.rfind(')').unwrap_or(lowered.len());
            (lowered[..open].trim(), lowered[open + 1..close].to_string())
        }
        None => (lowered.as_str(), String::new()),
    };
    let ints: Vec<i64> = args
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect();

    let ty = match name {
        "int" | "integer" | "bigint" | "smallint" | "tinyint" | "mediumint" | "int2" | "int8"
        | "unsigned big int" => Type::Integer(IntegerType {
            t: name.to_string(),
            unsigned: false,
        }),
        "boolean" | "bool" => Type::Bool,
        "real" | "double" | "double precision" | "float" => {
            Type::Float(driftql_core::schema::FloatType {
                t: name.to_string(),
                precision: None,
                unsigned: false,
            })
        }
        "numeric" | "decimal" => Type::Decimal(DecimalType {
            t: name.to_string(),
            precision: ints.first().copied().unwrap_or(0) as u32,
            scale: ints.get(1).copied().unwrap_or(0) as u32,
            unsigned: false,
        }),
        "text" | "clob" | "varchar" | "character" | "char" | "nchar" | "nvarchar"
        | "varying character" => Type::String(StringType {
            t: name.to_string(),
            size: ints.first().copied(),
        }),
        "blob" => Type::Binary(BinaryType {
            t: "blob".to_string(),
            size: None,
        }),
        "date" | "datetime" | "time" | "timestamp" => Type::Time(TimeType {
            t: name.to_string(),
            precision: None,
        }),
        "json" => Type::Json,
        "" => Type::Unsupported(String::new()),
        _ => Type::Unsupported(lowered.clone()),
    };
    Ok(ty)
}

pub fn format_type(ty: &Type) -> Result<String> {
    Ok(match ty {
        Type::Integer(integer) => integer.t.clone(),
        Type::Bool => "boolean".to_string(),
        Type::Float(float) => float.t.clone(),
        Type::Decimal(decimal) => {
            if decimal.precision == 0 {
                decimal.t.clone()
            } else {
                format!("{}({},{})", decimal.t, decimal.precision, decimal.scale)
            }
        }
        Type::String(string) => match string.size {
            Some(size) => format!("{}({size})", string.t),
            None => string.t.clone(),
        },
        Type::Binary(_) => "blob".to_string(),
        Type::Time(time) => time.t.clone(),
        Type::Json => "json".to_string(),
        Type::Unsupported(raw) => raw.clone(),
        other => {
            // Anything else keeps whatever spelling the model carries; the
            // engine only honors affinities anyway.
            return Err(driftql_core::Error::Unsupported(format!(
                "sqlite has no spelling for {other:?}"
            )));
        }
    })
}
