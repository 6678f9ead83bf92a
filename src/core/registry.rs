use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, QueryFilter, QueryOrder, QuerySelect, Select,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use super::traits::{FieldDescription, FuretuiResource, primary_key_names};
use crate::errors::CrudError;
use crate::querystring::QueryDirectives;
use crate::querystring::builder::{QueryString, count_rows};
use crate::querystring::conditions::{coerce_json, find_column};

/// A row as exchanged with the client: column name → JSON value
pub type Row = Map<String, Value>;

/// Name-based view of a [`FuretuiResource`], so that models can be picked by
/// the name the client sends.
#[async_trait]
pub trait DynResource: Send + Sync {
    fn name(&self) -> &'static str;

    fn fields_description(&self) -> Vec<FieldDescription>;

    fn primary_key_names(&self) -> Vec<String>;

    /// # Errors
    ///
    /// [`CrudError::Projection`] when the model has no such field.
    fn field(&self, name: &str) -> Result<FieldDescription, CrudError> {
        self.fields_description()
            .into_iter()
            .find(|field| field.name == name)
            .ok_or_else(|| CrudError::projection(self.name(), name))
    }

    /// Primary key mapping of a row
    fn to_primary_keys(&self, row: &Row) -> Row {
        self.primary_key_names()
            .into_iter()
            .map(|name| {
                let value = row.get(&name).cloned().unwrap_or(Value::Null);
                (name, value)
            })
            .collect()
    }

    /// Run the querystring pipeline: the filtered query is counted, then
    /// ordered, paginated, projected on `columns` and fetched.
    async fn query(
        &self,
        db: &DatabaseConnection,
        directives: &QueryDirectives,
        columns: &[String],
    ) -> Result<(Vec<Row>, u64), CrudError>;

    /// Rows whose `criteria` columns equal one of the `keys` tuples, in one
    /// query, projected on `columns` and ordered by primary key. Each tuple
    /// holds one value per criteria column.
    async fn select_rows(
        &self,
        db: &DatabaseConnection,
        criteria: &[String],
        keys: &[Vec<Value>],
        columns: &[String],
    ) -> Result<Vec<Row>, CrudError>;

    /// Full row of the entity with the given primary key
    async fn from_primary_keys(&self, db: &DatabaseConnection, pks: &Row)
    -> Result<Row, CrudError>;

    async fn insert(&self, db: &DatabaseConnection, data: Row) -> Result<Row, CrudError>;

    async fn update(
        &self,
        db: &DatabaseConnection,
        pks: &Row,
        data: Row,
    ) -> Result<Row, CrudError>;

    async fn delete(&self, db: &DatabaseConnection, pks: &Row) -> Result<(), CrudError>;
}

/// [`DynResource`] implementation for any [`FuretuiResource`]
pub struct ResourceHandle<R: FuretuiResource> {
    resource: PhantomData<fn() -> R>,
}

impl<R: FuretuiResource> Default for ResourceHandle<R> {
    fn default() -> Self {
        Self {
            resource: PhantomData,
        }
    }
}

impl<R: FuretuiResource> ResourceHandle<R> {
    fn project(
        query: Select<R::EntityType>,
        columns: &[String],
    ) -> Result<Select<R::EntityType>, CrudError> {
        let columns = columns
            .iter()
            .map(|name| find_column::<R::EntityType>(R::MODEL_NAME, name))
            .collect::<Result<Vec<_>, CrudError>>()?;
        Ok(query.select_only().columns(columns))
    }

    fn primary_key_condition(pks: &Row) -> Result<Condition, CrudError> {
        let names = primary_key_names::<R::EntityType>();
        if let Some(extra) = pks.keys().find(|key| !names.contains(*key)) {
            return Err(CrudError::projection(R::MODEL_NAME, extra.as_str()));
        }

        let mut condition = Condition::all();
        for name in names {
            let value = pks.get(&name).ok_or_else(|| {
                CrudError::parse(format!(
                    "Primary key '{name}' missing for '{}'",
                    R::MODEL_NAME
                ))
            })?;
            let column = find_column::<R::EntityType>(R::MODEL_NAME, &name)?;
            condition = condition.add(column.eq(coerce_json(&column, value)?));
        }
        Ok(condition)
    }

    async fn find_model(db: &DatabaseConnection, pks: &Row) -> Result<R::ModelType, CrudError> {
        R::base_query()
            .filter(Self::primary_key_condition(pks)?)
            .one(db)
            .await?
            .ok_or_else(|| CrudError::not_found(R::MODEL_NAME, Some(pks.clone())))
    }

    fn to_row(model: &R::ModelType) -> Result<Row, CrudError> {
        match serde_json::to_value(model) {
            Ok(Value::Object(row)) => Ok(row),
            Ok(_) => Err(CrudError::database(sea_orm::DbErr::Json(format!(
                "'{}' does not serialize to an object",
                R::MODEL_NAME
            )))),
            Err(err) => Err(CrudError::database(sea_orm::DbErr::Json(err.to_string()))),
        }
    }
}

fn into_rows(values: Vec<Value>) -> Vec<Row> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(row) => Some(row),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl<R: FuretuiResource> DynResource for ResourceHandle<R> {
    fn name(&self) -> &'static str {
        R::MODEL_NAME
    }

    fn fields_description(&self) -> Vec<FieldDescription> {
        R::fields_description()
    }

    fn primary_key_names(&self) -> Vec<String> {
        primary_key_names::<R::EntityType>()
    }

    async fn query(
        &self,
        db: &DatabaseConnection,
        directives: &QueryDirectives,
        columns: &[String],
    ) -> Result<(Vec<Row>, u64), CrudError> {
        let qs = QueryString::<R>::new(directives.clone());
        let query = qs.build_base_query();
        let query = qs.from_filter_by(query)?;
        let query = qs.from_tags(query)?;

        let page = qs.from_order_by(query.clone())?;
        let page = qs.from_limit(page);
        let page = qs.from_offset(page);
        let page = Self::project(page, columns)?;

        let rows = into_rows(page.into_json().all(db).await?);
        let total = count_rows(query, db).await?;
        tracing::debug!(
            model = R::MODEL_NAME,
            rows = rows.len(),
            total,
            "querystring executed"
        );
        Ok((rows, total))
    }

    async fn select_rows(
        &self,
        db: &DatabaseConnection,
        criteria: &[String],
        keys: &[Vec<Value>],
        columns: &[String],
    ) -> Result<Vec<Row>, CrudError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let criteria = criteria
            .iter()
            .map(|name| find_column::<R::EntityType>(R::MODEL_NAME, name))
            .collect::<Result<Vec<_>, CrudError>>()?;

        let mut query = R::base_query();
        if let [column] = criteria.as_slice() {
            let values = keys
                .iter()
                .filter_map(|key| key.first())
                .map(|value| coerce_json(column, value))
                .collect::<Result<Vec<_>, CrudError>>()?;
            query = query.filter(column.is_in(values));
        } else {
            let mut any = Condition::any();
            for key in keys {
                let mut all = Condition::all();
                for (column, value) in criteria.iter().zip(key) {
                    all = all.add(column.eq(coerce_json(column, value)?));
                }
                any = any.add(all);
            }
            query = query.filter(any);
        }
        for name in primary_key_names::<R::EntityType>() {
            query = query.order_by_asc(find_column::<R::EntityType>(R::MODEL_NAME, &name)?);
        }
        let query = Self::project(query, columns)?;
        Ok(into_rows(query.into_json().all(db).await?))
    }

    async fn from_primary_keys(
        &self,
        db: &DatabaseConnection,
        pks: &Row,
    ) -> Result<Row, CrudError> {
        Self::to_row(&Self::find_model(db, pks).await?)
    }

    async fn insert(&self, db: &DatabaseConnection, data: Row) -> Result<Row, CrudError> {
        let model = R::furetui_insert(db, Value::Object(data)).await?;
        Self::to_row(&model)
    }

    async fn update(
        &self,
        db: &DatabaseConnection,
        pks: &Row,
        data: Row,
    ) -> Result<Row, CrudError> {
        let model = Self::find_model(db, pks).await?;
        let model = R::furetui_update(db, model, Value::Object(data)).await?;
        Self::to_row(&model)
    }

    async fn delete(&self, db: &DatabaseConnection, pks: &Row) -> Result<(), CrudError> {
        let model = Self::find_model(db, pks).await?;
        R::furetui_delete(db, model).await
    }
}

/// Models exposed to the client, by name.
///
/// ```rust,ignore
/// let registry = Registry::new()
///     .register::<Customer>()
///     .register::<Invoice>();
/// let customer = registry.get("Model.Customer")?;
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    resources: HashMap<&'static str, Arc<dyn DynResource>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn register<R: FuretuiResource>(mut self) -> Self {
        tracing::debug!(model = R::MODEL_NAME, "model registered");
        self.resources
            .insert(R::MODEL_NAME, Arc::new(ResourceHandle::<R>::default()));
        self
    }

    /// # Errors
    ///
    /// [`CrudError::Lookup`] when no model is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn DynResource>, CrudError> {
        self.resources
            .get(name)
            .cloned()
            .ok_or_else(|| CrudError::lookup(name))
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.resources.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("models", &self.names())
            .finish()
    }
}
