use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::core::Row;
use crate::errors::CrudError;
use crate::querystring::{QueryDirectives, deserialize_querystring};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum UpdateKind {
    #[serde(rename = "UPDATE_DATA")]
    UpdateData,
}

/// One entry of the client cache: the data of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateRecord {
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    pub model: String,
    #[schema(value_type = Object)]
    pub pk: Row,
    #[schema(value_type = Object)]
    pub data: Row,
}

impl UpdateRecord {
    #[must_use]
    pub fn new(model: impl Into<String>, pk: Row, data: Row) -> Self {
        Self {
            kind: UpdateKind::UpdateData,
            model: model.into(),
            pk,
            data,
        }
    }
}

/// Result of a read: the page of root primary keys, the number of rows
/// matching the filters, and the records to merge into the client cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResponseEnvelope {
    #[schema(value_type = Vec<Object>)]
    pub pks: Vec<Row>,
    pub total: u64,
    pub data: Vec<UpdateRecord>,
}

/// Parsed `fields` parameter.
///
/// `fields=name,customer.name,customer.city,lines.amount` gives
///
/// - `fields`: `name, customer, lines`
/// - `fields2read`: `name`
/// - `subfields`: `customer → [name, city]`, `lines → [amount]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSpec {
    pub fields: Vec<String>,
    pub fields2read: Vec<String>,
    pub subfields: Vec<(String, Vec<String>)>,
}

impl FieldSpec {
    /// # Errors
    ///
    /// [`CrudError::Parse`] for paths deeper than `field.subfield`.
    pub fn parse(raw: &str) -> Result<Self, CrudError> {
        let mut spec = Self::default();

        for item in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            if let Some((field, subfield)) = item.split_once('.') {
                if field.is_empty() || subfield.is_empty() || subfield.contains('.') {
                    return Err(CrudError::parse(format!(
                        "Field '{item}' must be 'field' or 'field.subfield'"
                    )));
                }
                spec.touch(field);
                match spec.subfields.iter_mut().find(|(name, _)| name == field) {
                    Some((_, subfields)) => subfields.push(subfield.to_string()),
                    None => spec
                        .subfields
                        .push((field.to_string(), vec![subfield.to_string()])),
                }
            } else {
                spec.fields2read.push(item.to_string());
                spec.touch(item);
            }
        }

        Ok(spec)
    }

    fn touch(&mut self, field: &str) {
        if !self.fields.iter().any(|name| name == field) {
            self.fields.push(field.to_string());
        }
    }
}

/// A read request: the model, the requested fields and the querystring
/// directives, all taken from the same querystring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    pub model: String,
    pub fields: FieldSpec,
    pub directives: QueryDirectives,
}

impl ReadRequest {
    /// # Errors
    ///
    /// [`CrudError::Parse`] when `model` or `fields` is missing, or when the
    /// querystring is malformed.
    pub fn from_params<K, V>(params: &[(K, V)]) -> Result<Self, CrudError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let lookup = |name: &str| {
            params
                .iter()
                .rev()
                .find(|(key, _)| key.as_ref() == name)
                .map(|(_, value)| value.as_ref().to_string())
                .ok_or_else(|| CrudError::parse(format!("Missing '{name}' parameter")))
        };
        let model = lookup("model")?;
        let fields = FieldSpec::parse(&lookup("fields")?)?;
        let directives = deserialize_querystring(
            params.iter().map(|(key, value)| (key.as_ref(), value.as_ref())),
        )?;

        Ok(Self {
            model,
            fields,
            directives,
        })
    }
}

/// Client change set: `{<model>: {"new": {<temp key>: {...}}, <json pk>: {...}}}`
pub type ChangeSet = Map<String, Value>;
