use serde_json::Value;
use std::sync::Arc;

use super::Crud;
use super::models::{ReadRequest, ResponseEnvelope, UpdateRecord};
use crate::core::{DynResource, FieldDescription, FieldKind, Row};
use crate::errors::CrudError;

/// Related rows of one owner row
enum Loaded {
    ToOne(Option<Row>),
    ToMany(Vec<Row>),
}

impl Loaded {
    fn rows(&self) -> &[Row] {
        match self {
            Self::ToOne(Some(row)) => std::slice::from_ref(row),
            Self::ToOne(None) => &[],
            Self::ToMany(rows) => rows.as_slice(),
        }
    }
}

/// A relation to load for every row of a batch
struct RelationPlan {
    field: FieldDescription,
    resource: Arc<dyn DynResource>,
    subfields: Vec<String>,
    columns: Vec<String>,
}

/// A relation loaded for a batch: `rows[i]` belongs to the i-th owner row
struct LoadedRelation {
    plan: RelationPlan,
    rows: Vec<Loaded>,
}

fn push_unique(columns: &mut Vec<String>, name: &str) {
    if !columns.iter().any(|column| column == name) {
        columns.push(name.to_string());
    }
}

/// Columns to select so that `fields` can be rendered from a row of
/// `resource`: primary keys, scalar fields and the local side of every
/// relation join.
fn columns_for(resource: &dyn DynResource, fields: &[String]) -> Result<Vec<String>, CrudError> {
    let mut columns = Vec::new();
    for name in resource.primary_key_names() {
        push_unique(&mut columns, &name);
    }
    for name in fields {
        let field = resource.field(name)?;
        match field.kind {
            FieldKind::Scalar => push_unique(&mut columns, &field.name),
            FieldKind::ToOne | FieldKind::ToMany => {
                for (local, _) in field.join {
                    push_unique(&mut columns, local);
                }
            }
        }
    }
    Ok(columns)
}

/// `(remote column, value of the local column)` for each join pair, or
/// `None` when a local value is null: there is nothing to join on.
fn join_criteria(field: &FieldDescription, row: &Row) -> Option<Vec<(String, Value)>> {
    field
        .join
        .iter()
        .map(|(local, remote)| match row.get(*local) {
            Some(Value::Null) | None => None,
            Some(value) => Some(((*remote).to_string(), value.clone())),
        })
        .collect()
}

fn matches_criteria(row: &Row, criteria: &[(String, Value)]) -> bool {
    criteria
        .iter()
        .all(|(column, value)| row.get(column) == Some(value))
}

/// Render `fields` of the `index`-th row of a batch: scalars as they are,
/// relations as the primary key mapping of the related entity (to-one, or
/// null) or the list of those mappings (to-many).
fn to_dict(
    resource: &dyn DynResource,
    row: &Row,
    fields: &[String],
    relations: &[LoadedRelation],
    index: usize,
) -> Result<Row, CrudError> {
    let mut values = Row::new();
    for name in fields {
        let field = resource.field(name)?;
        let loaded = relations
            .iter()
            .find(|relation| relation.plan.field.name == field.name)
            .and_then(|relation| Some((relation, relation.rows.get(index)?)));
        let value = match (field.kind, loaded) {
            (FieldKind::Scalar, _) => row.get(&field.name).cloned().unwrap_or(Value::Null),
            (FieldKind::ToOne, Some((relation, loaded))) => loaded
                .rows()
                .first()
                .map_or(Value::Null, |related_row| {
                    Value::Object(relation.plan.resource.to_primary_keys(related_row))
                }),
            (FieldKind::ToMany, Some((relation, loaded))) => Value::Array(
                loaded
                    .rows()
                    .iter()
                    .map(|related_row| {
                        Value::Object(relation.plan.resource.to_primary_keys(related_row))
                    })
                    .collect(),
            ),
            (FieldKind::ToOne, None) => join_criteria(&field, row)
                .map_or(Value::Null, |criteria| Value::Object(criteria.into_iter().collect())),
            (FieldKind::ToMany, None) => Value::Array(Vec::new()),
        };
        values.insert(field.name.clone(), value);
    }
    Ok(values)
}

impl Crud<'_> {
    /// Read a page of `request.model` and every requested relation.
    ///
    /// For each root row, in order, the root record is emitted followed by
    /// the records of its relations in the order they were requested. An
    /// absent to-one relation emits nothing, a to-many relation emits one
    /// record per related entity. `total` counts the filtered rows before
    /// `limit` and `offset`.
    ///
    /// Each relation is loaded with one query for the whole page, whatever
    /// the number of root rows.
    ///
    /// # Errors
    ///
    /// [`CrudError::Lookup`] for unknown models, [`CrudError::Projection`]
    /// for unknown fields or dotted fields that are not relations,
    /// [`CrudError::Parse`] for bad filter values and the database errors.
    pub async fn read(&self, request: &ReadRequest) -> Result<ResponseEnvelope, CrudError> {
        let resource = self.registry.get(&request.model)?;

        let mut plans = Vec::with_capacity(request.fields.subfields.len());
        for (name, subfields) in &request.fields.subfields {
            let field = resource.field(name)?;
            if !field.is_relation() {
                return Err(CrudError::projection(resource.name(), name.as_str()));
            }
            plans.push(self.plan(resource.as_ref(), field, subfields.clone())?);
        }
        let emitted = plans.len();
        let key_plans = self.key_plans(resource.as_ref(), &request.fields.fields, &plans)?;
        plans.extend(key_plans);

        let columns = columns_for(resource.as_ref(), &request.fields.fields)?;
        let (rows, total) = resource
            .query(self.db, &request.directives, &columns)
            .await?;
        let relations = self.load(plans, &rows).await?;

        // related rows of each emitted relation, in emission order, with
        // the to-many keys their own fields need
        let mut nested = Vec::with_capacity(emitted);
        for relation in relations.iter().take(emitted) {
            let related_rows: Vec<Row> = relation
                .rows
                .iter()
                .flat_map(|loaded| loaded.rows().iter().cloned())
                .collect();
            let related = relation.plan.resource.as_ref();
            let key_plans = self.key_plans(related, &relation.plan.subfields, &[])?;
            let loaded = self.load(key_plans, &related_rows).await?;
            nested.push((related_rows, loaded));
        }

        let mut pks = Vec::with_capacity(rows.len());
        let mut data = Vec::new();
        let mut cursors = vec![0; emitted];
        for (index, row) in rows.iter().enumerate() {
            let pk = resource.to_primary_keys(row);
            let values = to_dict(
                resource.as_ref(),
                row,
                &request.fields.fields,
                &relations,
                index,
            )?;
            data.push(UpdateRecord::new(resource.name(), pk.clone(), values));
            pks.push(pk);

            let emitting = relations.iter().zip(&nested).zip(cursors.iter_mut());
            for ((relation, (related_rows, loaded)), cursor) in emitting {
                let count = relation.rows.get(index).map_or(0, |rows| rows.rows().len());
                let related = relation.plan.resource.as_ref();
                let batch = related_rows.iter().enumerate().skip(*cursor).take(count);
                for (position, related_row) in batch {
                    let values =
                        to_dict(related, related_row, &relation.plan.subfields, loaded, position)?;
                    data.push(UpdateRecord::new(
                        related.name(),
                        related.to_primary_keys(related_row),
                        values,
                    ));
                }
                *cursor += count;
            }
        }

        tracing::debug!(
            model = resource.name(),
            roots = pks.len(),
            records = data.len(),
            total,
            "crud read"
        );
        Ok(ResponseEnvelope { pks, total, data })
    }

    fn plan(
        &self,
        owner: &dyn DynResource,
        field: FieldDescription,
        subfields: Vec<String>,
    ) -> Result<RelationPlan, CrudError> {
        let model = field
            .model
            .ok_or_else(|| CrudError::projection(owner.name(), field.name.as_str()))?;
        let resource = self.registry.get(model)?;
        let mut columns = columns_for(resource.as_ref(), &subfields)?;
        for (_, remote) in field.join {
            push_unique(&mut columns, remote);
        }
        Ok(RelationPlan {
            field,
            resource,
            subfields,
            columns,
        })
    }

    /// Plans for the to-many `fields` of `resource` that no plan in
    /// `existing` covers: only their primary keys are loaded.
    fn key_plans(
        &self,
        resource: &dyn DynResource,
        fields: &[String],
        existing: &[RelationPlan],
    ) -> Result<Vec<RelationPlan>, CrudError> {
        let mut plans: Vec<RelationPlan> = Vec::new();
        for name in fields {
            let field = resource.field(name)?;
            let known = existing
                .iter()
                .chain(&plans)
                .any(|plan| plan.field.name == field.name);
            if field.kind == FieldKind::ToMany && !known {
                plans.push(self.plan(resource, field, Vec::new())?);
            }
        }
        Ok(plans)
    }

    async fn load(
        &self,
        plans: Vec<RelationPlan>,
        rows: &[Row],
    ) -> Result<Vec<LoadedRelation>, CrudError> {
        let mut relations = Vec::with_capacity(plans.len());
        for plan in plans {
            let loaded = self.load_relation(&plan, rows).await?;
            relations.push(LoadedRelation { plan, rows: loaded });
        }
        Ok(relations)
    }

    /// Load one relation for all `rows` with a single query, then hand each
    /// row the related rows matching its join values.
    async fn load_relation(
        &self,
        plan: &RelationPlan,
        rows: &[Row],
    ) -> Result<Vec<Loaded>, CrudError> {
        let criteria: Vec<Option<Vec<(String, Value)>>> = rows
            .iter()
            .map(|row| join_criteria(&plan.field, row))
            .collect();
        let mut keys: Vec<Vec<Value>> = Vec::new();
        for key in criteria.iter().flatten() {
            let values: Vec<Value> = key.iter().map(|(_, value)| value.clone()).collect();
            if !keys.contains(&values) {
                keys.push(values);
            }
        }
        let remote: Vec<String> = plan
            .field
            .join
            .iter()
            .map(|(_, remote)| (*remote).to_string())
            .collect();
        let related_rows = plan
            .resource
            .select_rows(self.db, &remote, &keys, &plan.columns)
            .await?;

        Ok(criteria
            .iter()
            .map(|key| {
                let matching: Vec<Row> = key.as_deref().map_or_else(Vec::new, |key| {
                    related_rows
                        .iter()
                        .filter(|related_row| matches_criteria(related_row, key))
                        .cloned()
                        .collect()
                });
                match plan.field.kind {
                    FieldKind::ToOne => Loaded::ToOne(matching.into_iter().next()),
                    FieldKind::ToMany | FieldKind::Scalar => Loaded::ToMany(matching),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_join_criteria() {
        let field =
            FieldDescription::to_one("customer", "Model.Customer", &[("customer_id", "id")]);
        assert_eq!(
            join_criteria(&field, &row(json!({"customer_id": 4}))),
            Some(vec![("id".to_string(), json!(4))])
        );
        assert_eq!(join_criteria(&field, &row(json!({"customer_id": null}))), None);
        assert_eq!(join_criteria(&field, &row(json!({}))), None);
    }

    #[test]
    fn test_matches_criteria_compares_every_pair() {
        let related = row(json!({"id": 4, "city": "Lyon"}));
        assert!(matches_criteria(&related, &[("id".to_string(), json!(4))]));
        assert!(!matches_criteria(
            &related,
            &[("id".to_string(), json!(4)), ("city".to_string(), json!("Paris"))]
        ));
        assert!(!matches_criteria(&related, &[("missing".to_string(), json!(4))]));
    }

    #[test]
    fn test_loaded_rows() {
        let customer = row(json!({"id": 1}));
        assert_eq!(Loaded::ToOne(Some(customer.clone())).rows(), &[customer.clone()]);
        assert!(Loaded::ToOne(None).rows().is_empty());
        assert_eq!(Loaded::ToMany(vec![customer.clone(), customer]).rows().len(), 2);
    }

    #[test]
    fn test_push_unique_keeps_first_position() {
        let mut columns = vec!["id".to_string()];
        push_unique(&mut columns, "name");
        push_unique(&mut columns, "id");
        assert_eq!(columns, vec!["id", "name"]);
    }
}
