use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    IdenStatic, IntoActiveModel, Iterable, ModelTrait, PrimaryKeyToColumn, Select, TryIntoModel,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use utoipa::ToSchema;

use super::adapter::TagAdapter;
use crate::errors::CrudError;

/// How a field relates to other models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Plain column
    Scalar,
    /// Many2One / One2One: a single related entity or nothing
    ToOne,
    /// One2Many / Many2Many: a collection of related entities
    ToMany,
}

/// Metadata of one field of a model, as exposed to the client and used by
/// the read pipeline to decide how relations are loaded and emitted.
///
/// `join` pairs a column of this model with a column of the related model:
///
/// - to-one: `(local foreign key, related primary key)`
/// - to-many: `(local column, foreign key on the related model)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldDescription {
    pub name: String,
    pub kind: FieldKind,
    /// Related model name (relations only)
    pub model: Option<&'static str>,
    #[schema(value_type = Vec<Vec<String>>)]
    pub join: &'static [(&'static str, &'static str)],
    pub primary_key: bool,
}

impl FieldDescription {
    #[must_use]
    pub fn scalar(name: impl Into<String>, primary_key: bool) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Scalar,
            model: None,
            join: &[],
            primary_key,
        }
    }

    #[must_use]
    pub fn to_one(
        name: impl Into<String>,
        model: &'static str,
        join: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::ToOne,
            model: Some(model),
            join,
            primary_key: false,
        }
    }

    #[must_use]
    pub fn to_many(
        name: impl Into<String>,
        model: &'static str,
        join: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::ToMany,
            model: Some(model),
            join,
            primary_key: false,
        }
    }

    #[must_use]
    pub fn is_relation(&self) -> bool {
        self.kind != FieldKind::Scalar
    }
}

/// Primary key column names of an entity, in declaration order
#[must_use]
pub fn primary_key_names<E: EntityTrait>() -> Vec<String> {
    <E::PrimaryKey as Iterable>::iter()
        .map(|pk| pk.into_column().as_str().to_string())
        .collect()
}

/// A Sea-ORM entity served to the FuretUI client.
///
/// Scalar fields come from the entity columns; relations are declared by
/// [`relations`](Self::relations). The `furetui_*` hooks are the persistence
/// entry points used by the mutation operations; override them to attach
/// UI-aware side effects (refresh events, audit, ...).
///
/// ```rust,ignore
/// pub struct Customer;
///
/// #[async_trait]
/// impl FuretuiResource for Customer {
///     type EntityType = customer::Entity;
///     type ModelType = customer::Model;
///     type ActiveModelType = customer::ActiveModel;
///
///     const MODEL_NAME: &'static str = "Model.Customer";
///
///     fn relations() -> Vec<FieldDescription> {
///         vec![FieldDescription::to_many("invoices", "Model.Invoice", &[("id", "customer_id")])]
///     }
/// }
/// ```
#[async_trait]
pub trait FuretuiResource: Send + Sync + 'static {
    type EntityType: EntityTrait<Model = Self::ModelType> + Sync;
    type ModelType: ModelTrait<Entity = Self::EntityType>
        + IntoActiveModel<Self::ActiveModelType>
        + FromQueryResult
        + Serialize
        + DeserializeOwned
        + Clone
        + Send
        + Sync;
    type ActiveModelType: ActiveModelTrait<Entity = Self::EntityType>
        + ActiveModelBehavior
        + TryIntoModel<Self::ModelType>
        + Send
        + Sync;

    /// Name the client uses for this model
    const MODEL_NAME: &'static str;

    #[must_use]
    fn relations() -> Vec<FieldDescription> {
        vec![]
    }

    #[must_use]
    fn fields_description() -> Vec<FieldDescription> {
        let pks = primary_key_names::<Self::EntityType>();
        let mut fields: Vec<FieldDescription> =
            <<Self::EntityType as EntityTrait>::Column as Iterable>::iter()
                .map(|column| {
                    let name = column.as_str().to_string();
                    let primary_key = pks.contains(&name);
                    FieldDescription::scalar(name, primary_key)
                })
                .collect();
        fields.extend(Self::relations());
        fields
    }

    /// Tag filters of this model
    #[must_use]
    fn adapter() -> TagAdapter {
        TagAdapter::default()
    }

    /// Unfiltered query every read starts from
    #[must_use]
    fn base_query() -> Select<Self::EntityType> {
        Self::EntityType::find()
    }

    /// Insert a new entity from a JSON object of column values.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Parse`] if the payload does not fit the model,
    /// or the database error of the insert.
    async fn furetui_insert(
        db: &DatabaseConnection,
        data: Value,
    ) -> Result<Self::ModelType, CrudError> {
        let active_model = Self::ActiveModelType::from_json(data).map_err(|err| {
            CrudError::parse(format!("Invalid data for '{}': {err}", Self::MODEL_NAME))
        })?;
        let model = active_model.insert(db).await?;
        tracing::info!(model = Self::MODEL_NAME, "entity inserted");
        Ok(model)
    }

    /// Apply a JSON object of column values to an existing entity. Columns
    /// missing from `data` are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Parse`] if the payload does not fit the model,
    /// or the database error of the update.
    async fn furetui_update(
        db: &DatabaseConnection,
        model: Self::ModelType,
        data: Value,
    ) -> Result<Self::ModelType, CrudError> {
        if data.as_object().is_none_or(serde_json::Map::is_empty) {
            return Ok(model);
        }
        let mut active_model: Self::ActiveModelType = model.into_active_model();
        active_model.set_from_json(data).map_err(|err| {
            CrudError::parse(format!("Invalid data for '{}': {err}", Self::MODEL_NAME))
        })?;
        let updated = active_model.update(db).await?;
        tracing::info!(model = Self::MODEL_NAME, "entity updated");
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns the database error of the delete.
    async fn furetui_delete(
        db: &DatabaseConnection,
        model: Self::ModelType,
    ) -> Result<(), CrudError> {
        let active_model: Self::ActiveModelType = model.into_active_model();
        active_model.delete(db).await?;
        tracing::info!(model = Self::MODEL_NAME, "entity deleted");
        Ok(())
    }
}
