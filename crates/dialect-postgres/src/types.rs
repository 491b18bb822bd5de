use driftql_core::{
    Error, Result,
    schema::{
        ArrayType, BinaryType, BitType, DecimalType, EnumRef, FloatType, IntegerType, NetworkType,
        SpatialType, StringType, TimeType, Type, UserDefinedType,
    },
};

/// Parses a PostgreSQL type as spelled by `format_type`, e.g.
/// `character varying(255)`, `numeric(10,2)`, `timestamp with time zone`,
/// `integer[]`. Aliases (`int4`, `varchar`, `bool`) canonicalize to the
/// catalog spelling, which is the documented normalization for this driver.
pub fn parse_type(raw: &str) -> Result<Type> {
    let trimmed = raw.trim();
    if let Some(elem) = trimmed.strip_suffix("[]") {
        let elem_ty = parse_type(elem)?;
        return Ok(Type::Array(Box::new(ArrayType {
            raw: format_type(&elem_ty)?,
            elem: elem_ty,
        })));
    }

    let lowered = trimmed.to_ascii_lowercase();
    let (name, args) = split_type(&lowered);
    let ints = parse_int_args(&args);

    let ty = match canonical_name(name) {
        "smallint" | "integer" | "bigint" => Type::Integer(IntegerType {
            t: canonical_name(name).to_string(),
            unsigned: false,
        }),
        "smallserial" | "serial" | "bigserial" => Type::Integer(IntegerType {
            t: canonical_name(name).to_string(),
            unsigned: false,
        }),
        "boolean" => Type::Bool,
        "numeric" => Type::Decimal(DecimalType {
            t: "numeric".to_string(),
            precision: ints.first().copied().unwrap_or(0) as u32,
            scale: ints.get(1).copied().unwrap_or(0) as u32,
            unsigned: false,
        }),
        "real" => Type::Float(FloatType {
            t: "real".to_string(),
            precision: None,
            unsigned: false,
        }),
        "double precision" => Type::Float(FloatType {
            t: "double precision".to_string(),
            precision: None,
            unsigned: false,
        }),
        "character varying" => Type::String(StringType {
            t: "character varying".to_string(),
            size: ints.first().copied(),
        }),
        "character" => Type::String(StringType {
            t: "character".to_string(),
            size: ints.first().copied(),
        }),
        "text" => Type::String(StringType {
            t: "text".to_string(),
            size: None,
        }),
        "bytea" => Type::Binary(BinaryType {
            t: "bytea".to_string(),
            size: None,
        }),
        "date" => Type::Time(TimeType {
            t: "date".to_string(),
            precision: None,
        }),
        "time without time zone" | "time with time zone" | "timestamp without time zone"
        | "timestamp with time zone" => Type::Time(TimeType {
            t: canonical_name(name).to_string(),
            precision: ints.first().map(|p| *p as u32),
        }),
        "interval" => Type::Interval,
        "json" | "jsonb" => {
            if canonical_name(name) == "jsonb" {
                // jsonb keeps its spelling through the user-defined path.
                Type::UserDefined(UserDefinedType {
                    t: "jsonb".to_string(),
                    schema: None,
                })
            } else {
                Type::Json
            }
        }
        "uuid" => Type::Uuid,
        "money" => Type::Currency,
        "inet" | "cidr" | "macaddr" | "macaddr8" => Type::Network(NetworkType {
            t: canonical_name(name).to_string(),
        }),
        "bit" | "bit varying" => Type::Bit(BitType {
            t: canonical_name(name).to_string(),
            size: ints.first().map(|s| *s as u32),
        }),
        "point" | "line" | "lseg" | "box" | "path" | "polygon" | "circle" => {
            Type::Spatial(SpatialType {
                t: canonical_name(name).to_string(),
            })
        }
        other => Type::UserDefined(UserDefinedType {
            t: other.to_string(),
            schema: None,
        }),
    };
    Ok(ty)
}

pub fn format_type(ty: &Type) -> Result<String> {
    match ty {
        Type::Integer(integer) => Ok(integer.t.clone()),
        Type::Bool => Ok("boolean".to_string()),
        Type::Decimal(decimal) => Ok(if decimal.precision == 0 {
            "numeric".to_string()
        } else {
            format!("numeric({},{})", decimal.precision, decimal.scale)
        }),
        Type::Float(float) => Ok(float.t.clone()),
        Type::String(string) => Ok(match string.size {
            Some(size) if string.t != "text" => format!("{}({size})", string.t),
            _ => string.t.clone(),
        }),
        Type::Binary(_) => Ok("bytea".to_string()),
        Type::Time(time) => Ok(match (time.precision, time.t.split_once(' ')) {
            (Some(precision), Some((base, zone))) => format!("{base}({precision}) {zone}"),
            (Some(precision), None) => format!("{}({precision})", time.t),
            (None, _) => time.t.clone(),
        }),
        Type::Interval => Ok("interval".to_string()),
        Type::Json => Ok("json".to_string()),
        Type::Uuid => Ok("uuid".to_string()),
        Type::Currency => Ok("money".to_string()),
        Type::Network(network) => Ok(network.t.clone()),
        Type::Bit(bit) => Ok(match bit.size {
            Some(size) => format!("{}({size})", bit.t),
            None => bit.t.clone(),
        }),
        Type::Spatial(spatial) => Ok(spatial.t.clone()),
        Type::Array(array) => Ok(format!("{}[]", format_type(&array.elem)?)),
        Type::Enum(EnumRef {
            name: Some(name),
            schema,
            ..
        }) => Ok(match schema {
            Some(schema) => format!("{schema}.{name}"),
            None => name.clone(),
        }),
        Type::Enum(_) => Err(Error::Unsupported(
            "postgres enums must reference a named type".to_string(),
        )),
        Type::UserDefined(udt) => Ok(match &udt.schema {
            Some(schema) => format!("{schema}.{}", udt.t),
            None => udt.t.clone(),
        }),
        Type::Unsupported(raw) => Ok(raw.clone()),
        other => Err(Error::Unsupported(format!(
            "postgres has no spelling for {other:?}"
        ))),
    }
}

fn canonical_name(name: &str) -> &str {
    match name {
        "int" | "int4" => "integer",
        "int2" => "smallint",
        "int8" => "bigint",
        "serial4" => "serial",
        "serial8" => "bigserial",
        "serial2" => "smallserial",
        "bool" => "boolean",
        "varchar" => "character varying",
        "char" | "bpchar" => "character",
        "decimal" => "numeric",
        "float4" => "real",
        "float8" => "double precision",
        "timestamp" => "timestamp without time zone",
        "timestamptz" => "timestamp with time zone",
        "time" => "time without time zone",
        "timetz" => "time with time zone",
        "varbit" => "bit varying",
        other => other,
    }
}

/// Splits `timestamp(3) with time zone` into a canonical name and its
/// parenthesized arguments.
fn split_type(raw: &str) -> (&str, String) {
    match raw.find('(') {
        Some(open) => {
            let close = raw.rfind(')').unwrap_or(raw.len());
            let head = raw[..open].trim_end();
            let tail = raw[close + 1..].trim_start();
            let args = raw[open + 1..close].to_string();
            if tail.is_empty() {
                (head, args)
            } else {
                // The precision sits mid-name: `timestamp(3) with time zone`.
                let name = match (head, tail) {
                    ("timestamp", "with time zone") => "timestamp with time zone",
                    ("timestamp", "without time zone") => "timestamp without time zone",
                    ("time", "with time zone") => "time with time zone",
                    ("time", "without time zone") => "time without time zone",
                    _ => head,
                };
                (name, args)
            }
        }
        None => (raw, String::new()),
    }
}

fn parse_int_args(args: &str) -> Vec<i64> {
    args.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}
