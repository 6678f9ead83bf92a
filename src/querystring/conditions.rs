use sea_orm::{
    ColumnTrait, ColumnType, EntityTrait, IdenStatic, Iterable, Value,
    sea_query::{BinOper, Expr, Func, SimpleExpr},
};
use uuid::Uuid;

use crate::errors::CrudError;

// Basic safety limit
const MAX_FIELD_VALUE_LENGTH: usize = 10_000;

/// Resolve a column of `E` by its name
///
/// # Errors
///
/// Returns [`CrudError::Projection`] when `E` has no such column.
pub fn find_column<E: EntityTrait>(model: &str, name: &str) -> Result<E::Column, CrudError> {
    <E::Column as Iterable>::iter()
        .find(|column| column.as_str() == name)
        .ok_or_else(|| CrudError::projection(model, name))
}

fn invalid_value(column: &impl ColumnTrait, raw: &str) -> CrudError {
    CrudError::parse(format!(
        "Invalid value '{raw}' for field '{}'",
        column.as_str()
    ))
}

/// Convert a querystring value into a database value of the column's type
///
/// # Errors
///
/// Returns [`CrudError::Parse`] if the text does not parse as the column type.
pub fn coerce_str<C: ColumnTrait>(column: &C, raw: &str) -> Result<Value, CrudError> {
    if raw.len() > MAX_FIELD_VALUE_LENGTH {
        return Err(CrudError::parse(format!(
            "Value for field '{}' is too long",
            column.as_str()
        )));
    }

    let trimmed = raw.trim();
    let value = match column.def().get_column_type() {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger
        | ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned => trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid_value(column, raw))?,
        ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) => trimmed
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| invalid_value(column, raw))?,
        ColumnType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => Value::from(true),
            "false" | "0" => Value::from(false),
            _ => return Err(invalid_value(column, raw)),
        },
        ColumnType::Uuid => Uuid::parse_str(trimmed)
            .map(Value::from)
            .map_err(|_| invalid_value(column, raw))?,
        _ => Value::from(raw.to_string()),
    };
    Ok(value)
}

/// Convert a JSON scalar (primary key or foreign key value) into a database
/// value of the column's type
///
/// # Errors
///
/// Returns [`CrudError::Parse`] for null, arrays, objects and values that do
/// not parse as the column type.
pub fn coerce_json<C: ColumnTrait>(
    column: &C,
    value: &serde_json::Value,
) -> Result<Value, CrudError> {
    match value {
        serde_json::Value::String(text) => coerce_str(column, text),
        serde_json::Value::Number(number) => coerce_str(column, &number.to_string()),
        serde_json::Value::Bool(flag) => coerce_str(column, &flag.to_string()),
        other => Err(invalid_value(column, &other.to_string())),
    }
}

/// Expression for one `filter[<key>][<op>]=<raw>` entry.
///
/// | op | SQL |
/// |---|---|
/// | `eq` | `col = v` |
/// | `like` | `col LIKE '%v%'` |
/// | `ilike` | `UPPER(col) LIKE UPPER('%v%')` |
/// | `lt`, `lte`, `gt`, `gte` | comparisons |
/// | `in` | `col IN (v1, v2, ...)` with comma separated values |
///
/// # Errors
///
/// Returns [`CrudError::Parse`] for unknown operators and values that do not
/// parse as the column type.
pub fn build_filter_expr<C: ColumnTrait>(
    column: C,
    op: &str,
    raw: &str,
) -> Result<SimpleExpr, CrudError> {
    let expr = match op {
        "eq" => column.eq(coerce_str(&column, raw)?),
        "like" => column.like(format!("%{raw}%")),
        // both sides folded by the database, which may only fold ASCII
        "ilike" => Expr::expr(Func::upper(Expr::col((column.entity_name(), column)))).binary(
            BinOper::Like,
            Func::upper(Expr::val(format!("%{raw}%"))),
        ),
        "lt" => column.lt(coerce_str(&column, raw)?),
        "lte" => column.lte(coerce_str(&column, raw)?),
        "gt" => column.gt(coerce_str(&column, raw)?),
        "gte" => column.gte(coerce_str(&column, raw)?),
        "in" => {
            let values = raw
                .split(',')
                .map(|item| coerce_str(&column, item))
                .collect::<Result<Vec<Value>, CrudError>>()?;
            column.is_in(values)
        }
        _ => {
            return Err(CrudError::parse(format!(
                "Filter operator '{op}' does not exist"
            )));
        }
    };
    Ok(expr)
}
