use driftql_core::{
    Error, Result,
    schema::{ArrayType, BinaryType, DecimalType, FloatType, IntegerType, StringType, TimeType, Type},
};

/// Parses a Cloud Spanner GoogleSQL type, e.g. `STRING(100)`, `STRING(MAX)`,
/// `ARRAY<INT64>`, `NUMERIC`. Spellings are upper-case and `MAX` sizes are
/// stored as -1, mirroring the other bounded-size dialects.
pub fn parse_type(raw: &str) -> Result<Type> {
    let trimmed = raw.trim();
    let upper = trimmed.to_ascii_uppercase();

    if let Some(inner) = upper.strip_prefix("ARRAY<").and_then(|s| s.strip_suffix('>')) {
        let elem = parse_type(inner)?;
        return Ok(Type::Array(Box::new(ArrayType {
            raw: format_type(&elem)?,
            elem,
        })));
    }

    let (name, args) = match upper.find('(') {
        Some(open) => {
            let close = upper.rfind(')').unwrap_or(upper.len());
            (upper[..open].trim(), upper[open + 1..close].trim().to_string())
        }
        None => (upper.as_str(), String::new()),
    };
    let size = if args.eq_ignore_ascii_case("max") {
        Some(-1)
    } else {
        args.parse::<i64>().ok()
    };

    let ty = match name {
        "INT64" => Type::Integer(IntegerType {
            t: "INT64".to_string(),
            unsigned: false,
        }),
        "BOOL" => Type::Bool,
        "FLOAT32" | "FLOAT64" => Type::Float(FloatType {
            t: name.to_string(),
            precision: None,
            unsigned: false,
        }),
        "NUMERIC" => Type::Decimal(DecimalType {
            t: "NUMERIC".to_string(),
            precision: 38,
            scale: 9,
            unsigned: false,
        }),
        "STRING" => Type::String(StringType {
            t: "STRING".to_string(),
            size,
        }),
        "BYTES" => Type::Binary(BinaryType {
            t: "BYTES".to_string(),
            size,
        }),
        "DATE" | "TIMESTAMP" => Type::Time(TimeType {
            t: name.to_string(),
            precision: None,
        }),
        "JSON" => Type::Json,
        other => Type::Unsupported(other.to_string()),
    };
    Ok(ty)
}

pub fn format_type(ty: &Type) -> Result<String> {
    Ok(match ty {
        Type::Integer(_) => "INT64".to_string(),
        Type::Bool => "BOOL".to_string(),
        Type::Float(float) => float.t.clone(),
        Type::Decimal(_) => "NUMERIC".to_string(),
        Type::String(string) => sized("STRING", string.size),
        Type::Binary(binary) => sized("BYTES", binary.size),
        Type::Time(time) => time.t.clone(),
        Type::Json => "JSON".to_string(),
        Type::Array(array) => format!("ARRAY<{}>", format_type(&array.elem)?),
        Type::Unsupported(raw) => raw.clone(),
        other => {
            return Err(Error::Unsupported(format!(
                "spanner has no spelling for {other:?}"
            )));
        }
    })
}

fn sized(name: &str, size: Option<i64>) -> String {
    match size {
        Some(-1) => format!("{name}(MAX)"),
        Some(size) => format!("{name}({size})"),
        None => format!("{name}(MAX)"),
    }
}
