//! # Querystring directives
//!
//! The FuretUI client encodes list queries in a bracketed querystring:
//!
//! ```text
//! GET /crud?model=customer&fields=name,city
//!     &filter[name][ilike]=bob        include rows where name ILIKE %bob%
//!     &~filter[city][eq]=Paris        exclude rows where city = Paris
//!     &context[lang]=fr               free-form context for tag adapters
//!     &tag=vip&tags=active,recent     named filters resolved by the model
//!     &order_by[name]=asc
//!     &limit=20&offset=40
//! ```
//!
//! [`deserialize_querystring`] turns the raw pairs into [`QueryDirectives`];
//! [`QueryString`](builder::QueryString) applies them to a Sea-ORM query.

pub mod builder;
pub mod conditions;

use serde::Serialize;
use std::collections::HashMap;

use crate::errors::CrudError;

pub use builder::QueryString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Include,
    Exclude,
}

/// One `filter[<key>][<op>]=<value>` or `~filter[...]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterBy {
    pub key: String,
    pub op: String,
    pub value: String,
    pub mode: FilterMode,
}

/// One `order_by[<key>]=<op>` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    pub key: String,
    pub op: String,
}

/// Structured form of a FuretUI querystring.
///
/// `filter_by`, `order_by` and `tags` keep the order in which their keys
/// appeared in the querystring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryDirectives {
    pub filter_by: Vec<FilterBy>,
    pub order_by: Vec<OrderBy>,
    pub tags: Vec<String>,
    pub context: HashMap<String, String>,
    pub limit: Option<u64>,
    pub offset: u64,
}

/// Text between the first `[` and the next `]`, plus what follows it
fn take_bracket<'a>(key: &'a str, rest: &'a str) -> Result<(&'a str, &'a str), CrudError> {
    let start = rest
        .find('[')
        .ok_or_else(|| CrudError::parse(format!("Malformed querystring key '{key}'")))?;
    let after = &rest[start + 1..];
    let end = after
        .find(']')
        .ok_or_else(|| CrudError::parse(format!("Malformed querystring key '{key}'")))?;
    Ok((&after[..end], &after[end + 1..]))
}

fn parse_key_with_one_element(key: &str) -> Result<String, CrudError> {
    let (first, _) = take_bracket(key, key)?;
    Ok(first.to_string())
}

fn parse_key_with_two_elements(key: &str) -> Result<(String, String), CrudError> {
    let (first, rest) = take_bracket(key, key)?;
    if !rest.starts_with('[') {
        return Err(CrudError::parse(format!(
            "Malformed querystring key '{key}': expected two bracket groups"
        )));
    }
    let (second, _) = take_bracket(key, rest)?;
    Ok((first.to_string(), second.to_string()))
}

fn parse_integer(key: &str, value: &str) -> Result<u64, CrudError> {
    value.trim().parse::<u64>().map_err(|_| {
        CrudError::parse(format!(
            "'{key}' must be a non-negative integer, got '{value}'"
        ))
    })
}

/// Build [`QueryDirectives`] from querystring pairs.
///
/// Every pair is observed, so repeated keys (`tag=a&tag=b`) accumulate.
/// Keys outside the FuretUI vocabulary (`model`, `fields`, anything else) are
/// ignored.
///
/// # Errors
///
/// Returns [`CrudError::Parse`] for a `filter[`, `~filter[`, `context[` or
/// `order_by[` key without the expected bracket groups, and for a `limit` or
/// `offset` that is not a non-negative integer.
pub fn deserialize_querystring<I, K, V>(params: I) -> Result<QueryDirectives, CrudError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut directives = QueryDirectives::default();

    for (key, value) in params {
        let (k, v) = (key.as_ref(), value.as_ref());

        if k.starts_with("filter[") {
            let (key, op) = parse_key_with_two_elements(k)?;
            directives.filter_by.push(FilterBy {
                key,
                op,
                value: v.to_string(),
                mode: FilterMode::Include,
            });
        } else if k.starts_with("~filter[") {
            let (key, op) = parse_key_with_two_elements(k)?;
            directives.filter_by.push(FilterBy {
                key,
                op,
                value: v.to_string(),
                mode: FilterMode::Exclude,
            });
        } else if k.starts_with("context[") {
            let key = parse_key_with_one_element(k)?;
            directives.context.insert(key, v.to_string());
        } else if k == "tag" {
            directives.tags.push(v.to_string());
        } else if k == "tags" {
            directives.tags.extend(v.split(',').map(str::to_string));
        } else if k.starts_with("order_by[") {
            let key = parse_key_with_one_element(k)?;
            directives.order_by.push(OrderBy {
                key,
                op: v.to_string(),
            });
        } else if k == "limit" {
            directives.limit = if v.is_empty() {
                None
            } else {
                Some(parse_integer(k, v)?)
            };
        } else if k == "offset" {
            directives.offset = parse_integer(k, v)?;
        }
    }

    Ok(directives)
}
