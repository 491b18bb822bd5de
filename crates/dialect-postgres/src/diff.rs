use driftql_core::{
    Result,
    diff::DiffDriver,
    schema::{Column, DefaultValue, Type},
};

use crate::Postgres;

impl DiffDriver for Postgres {
    /// Raw spellings go through the parser before comparison so `varchar`
    /// and `character varying` never read as a type change.
    fn column_type_changed(&self, from: &Column, to: &Column) -> Result<bool> {
        if from.ty.raw.eq_ignore_ascii_case(&to.ty.raw) {
            return Ok(false);
        }
        let before = crate::types::parse_type(&from.ty.raw)?;
        let after = crate::types::parse_type(&to.ty.raw)?;
        if before == after {
            return Ok(false);
        }
        Ok(match (&from.ty.ty, &to.ty.ty) {
            (Type::Enum(before), Type::Enum(after)) => before.name != after.name,
            (before, after) => before != after,
        })
    }

    /// The server canonicalizes expressions (`lower('Hello')` becomes
    /// `lower('Hello'::text)`); comparisons strip casts and surrounding
    /// parentheses so declared and inspected forms match.
    fn defaults_equal(&self, from: Option<&DefaultValue>, to: Option<&DefaultValue>) -> bool {
        match (from, to) {
            (None, None) => true,
            (Some(before), Some(after)) => strip_casts(raw(before)) == strip_casts(raw(after)),
            _ => false,
        }
    }
}

fn raw(default: &DefaultValue) -> &str {
    match default {
        DefaultValue::Literal(literal) => literal,
        DefaultValue::RawExpr(expr) => expr,
    }
}

fn strip_casts(expr: &str) -> String {
    // Casts trail the expression; cut at the first `::` outside quotes.
    let trimmed = expr.trim();
    let mut in_quote = false;
    let mut cut = trimmed.len();
    let bytes = trimmed.as_bytes();
    for position in 0..bytes.len() {
        match bytes[position] {
            b'\'' => in_quote = !in_quote,
            b':' if !in_quote && bytes.get(position + 1) == Some(&b':') => {
                cut = position;
                break;
            }
            _ => {}
        }
    }

    let head = trimmed[..cut].trim();
    let unwrapped = head
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(head);
    unwrapped.to_ascii_lowercase()
}
