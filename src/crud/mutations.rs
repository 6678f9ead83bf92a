use serde_json::Value;

use super::Crud;
use super::models::{ChangeSet, UpdateRecord};
use crate::core::{DynResource, FieldKind, Row};
use crate::errors::CrudError;

/// Key of the change set entry holding the entities to create
const NEW_KEY: &str = "new";

fn into_payload(model: &str, value: Value) -> Result<Row, CrudError> {
    match value {
        Value::Object(data) => Ok(data),
        Value::Null => Ok(Row::new()),
        other => Err(CrudError::parse(format!(
            "Changes for '{model}' must be an object, got {other}"
        ))),
    }
}

/// Pop `changes[model]["new"][temp_key]`
fn take_new(changes: &mut ChangeSet, model: &str, temp_key: &str) -> Result<Row, CrudError> {
    let entry = changes
        .get_mut(model)
        .and_then(Value::as_object_mut)
        .and_then(|entries| entries.get_mut(NEW_KEY))
        .and_then(Value::as_object_mut)
        .and_then(|created| created.remove(temp_key));
    entry.map_or_else(|| Ok(Row::new()), |value| into_payload(model, value))
}

/// Pop the entry of `changes[model]` whose JSON encoded key decodes to `pks`
fn take_existing(changes: &mut ChangeSet, model: &str, pks: &Row) -> Result<Row, CrudError> {
    let Some(entries) = changes.get_mut(model).and_then(Value::as_object_mut) else {
        return Ok(Row::new());
    };

    let mut found = None;
    for key in entries.keys().filter(|key| *key != NEW_KEY) {
        let decoded: Value = serde_json::from_str(key).map_err(|err| {
            CrudError::parse(format!("Invalid primary key '{key}' for '{model}': {err}"))
        })?;
        if decoded.as_object() == Some(pks) {
            found = Some(key.clone());
            break;
        }
    }

    match found.and_then(|key| entries.remove(&key)) {
        Some(value) => into_payload(model, value),
        None => Ok(Row::new()),
    }
}

impl Crud<'_> {
    /// Replace every to-one entry of `data` by the foreign key columns it
    /// stands for, read from the related entity. Scalars pass through.
    ///
    /// # Errors
    ///
    /// [`CrudError::Projection`] for unknown fields, [`CrudError::NotFound`]
    /// when the related entity does not exist, [`CrudError::Unsupported`]
    /// for to-many fields.
    pub async fn format_data(
        &self,
        resource: &dyn DynResource,
        data: Row,
    ) -> Result<Row, CrudError> {
        let mut formatted = Row::new();
        for (name, value) in data {
            let field = resource.field(&name)?;
            match field.kind {
                FieldKind::Scalar => {
                    formatted.insert(name, value);
                }
                FieldKind::ToOne => {
                    let related_row = match value {
                        Value::Null => None,
                        Value::Object(pks) => {
                            let model = field.model.ok_or_else(|| {
                                CrudError::projection(resource.name(), field.name.as_str())
                            })?;
                            let related = self.registry.get(model)?;
                            Some(related.from_primary_keys(self.db, &pks).await?)
                        }
                        other => {
                            return Err(CrudError::parse(format!(
                                "Field '{name}' expects a primary key mapping, got {other}"
                            )));
                        }
                    };
                    for (local, remote) in field.join {
                        let fk = related_row
                            .as_ref()
                            .and_then(|row| row.get(*remote).cloned())
                            .unwrap_or(Value::Null);
                        formatted.insert((*local).to_string(), fk);
                    }
                }
                FieldKind::ToMany => {
                    return Err(CrudError::unsupported(format!(
                        "Writing the to-many field '{name}' of '{}' is not supported",
                        resource.name()
                    )));
                }
            }
        }
        Ok(formatted)
    }

    /// Create the entity stored under `changes[model]["new"][temp_key]`. The
    /// entry is removed from `changes`; a missing entry creates an entity
    /// from an empty payload.
    ///
    /// # Errors
    ///
    /// See [`format_data`](Self::format_data), plus the insert errors.
    pub async fn create(
        &self,
        model: &str,
        temp_key: &str,
        changes: &mut ChangeSet,
    ) -> Result<UpdateRecord, CrudError> {
        let resource = self.registry.get(model)?;
        let data = take_new(changes, model, temp_key)?;
        let data = self.format_data(resource.as_ref(), data).await?;
        let row = resource.insert(self.db, data).await?;
        tracing::info!(model, temp_key, "crud create");
        Ok(UpdateRecord::new(
            resource.name(),
            resource.to_primary_keys(&row),
            row,
        ))
    }

    /// Update the entity `pks` of `model` with the change set entry keyed by
    /// the JSON encoding of `pks`. The entry is removed from `changes`.
    ///
    /// # Errors
    ///
    /// [`CrudError::Parse`] for change set keys that are not JSON,
    /// [`CrudError::NotFound`] when the entity does not exist, and see
    /// [`format_data`](Self::format_data).
    pub async fn update(
        &self,
        model: &str,
        pks: &Row,
        changes: &mut ChangeSet,
    ) -> Result<UpdateRecord, CrudError> {
        let resource = self.registry.get(model)?;
        let data = take_existing(changes, model, pks)?;
        let data = self.format_data(resource.as_ref(), data).await?;
        let row = resource.update(self.db, pks, data).await?;
        tracing::info!(model, ?pks, "crud update");
        Ok(UpdateRecord::new(
            resource.name(),
            resource.to_primary_keys(&row),
            row,
        ))
    }

    /// # Errors
    ///
    /// [`CrudError::NotFound`] when the entity does not exist.
    pub async fn delete(&self, model: &str, pks: &Row) -> Result<(), CrudError> {
        let resource = self.registry.get(model)?;
        resource.delete(self.db, pks).await?;
        tracing::info!(model, ?pks, "crud delete");
        Ok(())
    }
}
