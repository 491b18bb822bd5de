use driftql_core::{
    Error, Result,
    schema::{
        BinaryType, BitType, DecimalType, EnumRef, FloatType, IntegerType, SetType, SpatialType,
        StringType, TimeType, Type,
    },
};

const INTEGER_TYPES: &[&str] = &["tinyint", "smallint", "mediumint", "int", "integer", "bigint"];
const STRING_TYPES: &[&str] = &[
    "char", "varchar", "tinytext", "text", "mediumtext", "longtext",
];
const BINARY_TYPES: &[&str] = &[
    "binary", "varbinary", "tinyblob", "blob", "mediumblob", "longblob",
];
const TIME_TYPES: &[&str] = &["date", "datetime", "time", "timestamp", "year"];
const SPATIAL_TYPES: &[&str] = &[
    "geometry", "point", "linestring", "polygon", "multipoint", "multilinestring",
    "multipolygon", "geometrycollection", "geomcollection",
];

/// Parses a MySQL column type as spelled by `INFORMATION_SCHEMA.COLUMN_TYPE`,
/// e.g. `int unsigned`, `varchar(255)`, `decimal(10,2)`, `enum('a','b')`.
pub fn parse_type(raw: &str) -> Result<Type> {
    let lowered = raw.trim().to_ascii_lowercase();
    let (name, args, modifiers) = split_type(&lowered);

    if name == "enum" {
        return Ok(Type::Enum(EnumRef {
            name: None,
            schema: None,
            values: parse_quoted_list(&args),
        }));
    }
    if name == "set" {
        return Ok(Type::Set(SetType {
            values: parse_quoted_list(&args),
        }));
    }

    let unsigned = modifiers.contains(&"unsigned");
    let ints = parse_int_args(&args);

    if INTEGER_TYPES.contains(&name) {
        // tinyint(1) is the canonical boolean spelling.
        if name == "tinyint" && ints.first() == Some(&1) && !unsigned {
            return Ok(Type::Bool);
        }
        return Ok(Type::Integer(IntegerType {
            t: name.to_string(),
            unsigned,
        }));
    }
    if name == "bool" || name == "boolean" {
        return Ok(Type::Bool);
    }
    if name == "decimal" || name == "numeric" {
        return Ok(Type::Decimal(DecimalType {
            t: "decimal".to_string(),
            precision: ints.first().copied().unwrap_or(10) as u32,
            scale: ints.get(1).copied().unwrap_or(0) as u32,
            unsigned,
        }));
    }
    if name == "float" || name == "double" || name == "real" {
        return Ok(Type::Float(FloatType {
            t: normalize_float_name(name, ints.first().copied()),
            precision: ints.first().map(|p| *p as u32),
            unsigned,
        }));
    }
    if name == "bit" {
        return Ok(Type::Bit(BitType {
            t: "bit".to_string(),
            size: ints.first().map(|s| *s as u32),
        }));
    }
    if STRING_TYPES.contains(&name) {
        return Ok(Type::String(StringType {
            t: name.to_string(),
            size: ints.first().copied(),
        }));
    }
    if BINARY_TYPES.contains(&name) {
        return Ok(Type::Binary(BinaryType {
            t: name.to_string(),
            size: ints.first().copied(),
        }));
    }
    if TIME_TYPES.contains(&name) {
        return Ok(Type::Time(TimeType {
            t: name.to_string(),
            precision: ints.first().map(|p| *p as u32),
        }));
    }
    if name == "json" {
        return Ok(Type::Json);
    }
    if SPATIAL_TYPES.contains(&name) {
        return Ok(Type::Spatial(SpatialType {
            t: name.to_string(),
        }));
    }

    Ok(Type::Unsupported(raw.trim().to_string()))
}

/// Formats a type back to its MySQL spelling. Round-trips `parse_type` for
/// every supported type.
pub fn format_type(ty: &Type) -> Result<String> {
    match ty {
        Type::Integer(integer) => Ok(with_unsigned(integer.t.clone(), integer.unsigned)),
        Type::Bool => Ok("bool".to_string()),
        Type::Decimal(decimal) => Ok(with_unsigned(
            format!("decimal({},{})", decimal.precision, decimal.scale),
            decimal.unsigned,
        )),
        Type::Float(float) => {
            let base = match float.precision {
                // float(p>23) is stored as double; the parser already
                // normalized the name.
                Some(precision) if float.t == "float" => format!("float({precision})"),
                _ => float.t.clone(),
            };
            Ok(with_unsigned(base, float.unsigned))
        }
        Type::Bit(bit) => Ok(match bit.size {
            Some(size) => format!("bit({size})"),
            None => "bit".to_string(),
        }),
        Type::String(string) => Ok(match string.size {
            Some(size) if needs_size(&string.t) => format!("{}({size})", string.t),
            _ => string.t.clone(),
        }),
        Type::Binary(binary) => Ok(match binary.size {
            Some(size) if needs_size(&binary.t) => format!("{}({size})", binary.t),
            _ => binary.t.clone(),
        }),
        Type::Time(time) => Ok(match time.precision {
            Some(precision) if precision > 0 => format!("{}({precision})", time.t),
            _ => time.t.clone(),
        }),
        Type::Json => Ok("json".to_string()),
        Type::Spatial(spatial) => Ok(spatial.t.clone()),
        Type::Enum(enum_ref) => Ok(format!("enum({})", quote_list(&enum_ref.values))),
        Type::Set(set) => Ok(format!("set({})", quote_list(&set.values))),
        Type::Unsupported(raw) => Ok(raw.clone()),
        other => Err(Error::Unsupported(format!(
            "mysql has no spelling for {other:?}"
        ))),
    }
}

/// float(p) with p > 23 is a double in MySQL; both spellings compare equal
/// after normalization.
fn normalize_float_name(name: &str, precision: Option<i64>) -> String {
    match (name, precision) {
        ("float", Some(p)) if p > 23 => "double".to_string(),
        ("real", _) => "double".to_string(),
        (other, _) => other.to_string(),
    }
}

fn needs_size(name: &str) -> bool {
    matches!(name, "char" | "varchar" | "binary" | "varbinary")
}

fn with_unsigned(base: String, unsigned: bool) -> String {
    if unsigned {
        format!("{base} unsigned")
    } else {
        base
    }
}

fn split_type(raw: &str) -> (&str, String, Vec<&str>) {
    match raw.find('(') {
        Some(open) => {
            let close = raw.rfind(')').unwrap_or(raw.len());
            let name = raw[..open].trim();
            let args = raw[open + 1..close].to_string();
            let modifiers = raw[close + 1..].split_whitespace().collect();
            (name, args, modifiers)
        }
        None => {
            let mut parts = raw.split_whitespace();
            let name = parts.next().unwrap_or_default();
            (name, String::new(), parts.collect())
        }
    }
}

fn parse_int_args(args: &str) -> Vec<i64> {
    args.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

fn parse_quoted_list(args: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = args.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' if in_quote => {
                if chars.peek() == Some(&'\'') {
                    current.push('\'');
                    chars.next();
                } else {
                    in_quote = false;
                    values.push(std::mem::take(&mut current));
                }
            }
            '\'' => in_quote = true,
            _ if in_quote => current.push(ch),
            _ => {}
        }
    }
    values
}

fn quote_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("'{}'", value.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(",")
}
