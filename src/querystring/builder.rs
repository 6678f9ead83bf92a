use sea_orm::{
    Condition, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect,
    Select, sea_query::Expr,
};
use std::marker::PhantomData;

use super::conditions::{build_filter_expr, find_column};
use super::{FilterMode, QueryDirectives, deserialize_querystring};
use crate::core::adapter::TagAdapter;
use crate::core::traits::{FuretuiResource, primary_key_names};
use crate::errors::CrudError;

// Some backends reject OFFSET without LIMIT
const UNBOUNDED_LIMIT: u64 = i64::MAX.unsigned_abs();

/// Applies [`QueryDirectives`] to Sea-ORM queries of the resource `R`.
///
/// Every step takes a query and returns a new one, so callers choose the
/// order. The read pipeline uses
/// `base → filter_by → tags` for the counted query, then
/// `→ order_by → limit → offset` for the page.
pub struct QueryString<R: FuretuiResource> {
    pub directives: QueryDirectives,
    adapter: TagAdapter,
    resource: PhantomData<fn() -> R>,
}

impl<R: FuretuiResource> QueryString<R> {
    #[must_use]
    pub fn new(directives: QueryDirectives) -> Self {
        Self {
            directives,
            adapter: R::adapter(),
            resource: PhantomData,
        }
    }

    /// # Errors
    ///
    /// See [`deserialize_querystring`].
    pub fn from_params<I, K, V>(params: I) -> Result<Self, CrudError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Ok(Self::new(deserialize_querystring(params)?))
    }

    #[must_use]
    pub fn build_base_query(&self) -> Select<R::EntityType> {
        R::base_query()
    }

    /// # Errors
    ///
    /// [`CrudError::Projection`] for unknown fields, [`CrudError::Parse`] for
    /// unknown operators or values that do not fit the column.
    pub fn from_filter_by(
        &self,
        mut query: Select<R::EntityType>,
    ) -> Result<Select<R::EntityType>, CrudError> {
        for filter in &self.directives.filter_by {
            let column = find_column::<R::EntityType>(R::MODEL_NAME, &filter.key)?;
            let expr = build_filter_expr(column, &filter.op, &filter.value)?;
            let condition = Condition::all().add(expr);
            query = match filter.mode {
                FilterMode::Include => query.filter(condition),
                FilterMode::Exclude => query.filter(condition.not()),
            };
        }
        Ok(query)
    }

    /// # Errors
    ///
    /// [`CrudError::Parse`] for tags the adapter does not know.
    pub fn from_tags(
        &self,
        query: Select<R::EntityType>,
    ) -> Result<Select<R::EntityType>, CrudError> {
        if self.directives.tags.is_empty() {
            return Ok(query);
        }
        let condition = self
            .adapter
            .condition(&self.directives.tags, &self.directives.context)?;
        Ok(query.filter(condition))
    }

    /// Orders by each `order_by` entry in turn, then by primary key so that
    /// pages are stable between identical requests.
    ///
    /// # Errors
    ///
    /// [`CrudError::Projection`] for unknown fields, [`CrudError::Parse`] for
    /// a direction other than `asc` / `desc`.
    pub fn from_order_by(
        &self,
        mut query: Select<R::EntityType>,
    ) -> Result<Select<R::EntityType>, CrudError> {
        for order in &self.directives.order_by {
            let column = find_column::<R::EntityType>(R::MODEL_NAME, &order.key)?;
            let direction = match order.op.to_ascii_lowercase().as_str() {
                "asc" => Order::Asc,
                "desc" => Order::Desc,
                other => {
                    return Err(CrudError::parse(format!(
                        "Order '{other}' does not exist for '{}'",
                        order.key
                    )));
                }
            };
            query = query.order_by(column, direction);
        }
        for name in primary_key_names::<R::EntityType>() {
            let column = find_column::<R::EntityType>(R::MODEL_NAME, &name)?;
            query = query.order_by(column, Order::Asc);
        }
        Ok(query)
    }

    #[must_use]
    pub fn from_limit(&self, query: Select<R::EntityType>) -> Select<R::EntityType> {
        match self.directives.limit {
            Some(limit) => query.limit(limit),
            None => query,
        }
    }

    /// Skips `offset` rows. Without a `limit`, an unbounded one is added.
    #[must_use]
    pub fn from_offset(&self, query: Select<R::EntityType>) -> Select<R::EntityType> {
        if self.directives.offset == 0 {
            return query;
        }
        let query = match self.directives.limit {
            Some(_) => query,
            None => query.limit(UNBOUNDED_LIMIT),
        };
        query.offset(self.directives.offset)
    }
}

/// `SELECT COUNT(*)` over the filtered query itself. `PaginatorTrait::count`
/// would wrap the query in a sub-select, which MySQL handles badly.
#[must_use]
pub fn count_select<E: EntityTrait>(query: Select<E>) -> Select<E> {
    query
        .select_only()
        .column_as(Expr::cust("COUNT(*)"), "num_items")
}

/// Number of rows matched by `query`. Call it before pagination is applied.
///
/// # Errors
///
/// Returns the database error of the count.
pub async fn count_rows<E: EntityTrait>(
    query: Select<E>,
    db: &DatabaseConnection,
) -> Result<u64, CrudError> {
    let total: Option<i64> = count_select(query).into_tuple().one(db).await?;
    Ok(total.and_then(|n| u64::try_from(n).ok()).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::querystring::deserialize_querystring;
    use sea_orm::{DbBackend, QueryTrait};

    mod person {
        use sea_orm::entity::prelude::*;
        use serde::{Deserialize, Serialize};

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
        #[sea_orm(table_name = "person")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub name: String,
            pub age: i32,
            pub vip: bool,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    struct Person;

    impl FuretuiResource for Person {
        type EntityType = person::Entity;
        type ModelType = person::Model;
        type ActiveModelType = person::ActiveModel;

        const MODEL_NAME: &'static str = "Model.Person";

        fn adapter() -> TagAdapter {
            use sea_orm::ColumnTrait;
            TagAdapter::new().tag("vip", |_| Condition::all().add(person::Column::Vip.eq(true)))
        }
    }

    fn query_string(items: &[(&str, &str)]) -> QueryString<Person> {
        QueryString::new(deserialize_querystring(items.iter().copied()).unwrap())
    }

    fn sql(query: Select<person::Entity>) -> String {
        query.build(DbBackend::Sqlite).to_string()
    }

    #[test]
    fn test_base_query_selects_every_row() {
        let qs = query_string(&[]);
        let sql = sql(qs.build_base_query());
        assert!(!sql.contains("WHERE"), "{sql}");
    }

    #[test]
    fn test_include_and_exclude_filters() {
        let qs = query_string(&[("filter[age][gte]", "18"), ("~filter[name][eq]", "bob")]);
        let sql = sql(qs.from_filter_by(qs.build_base_query()).unwrap());
        assert!(sql.contains(r#""person"."age" >= 18"#), "{sql}");
        assert!(sql.contains("NOT"), "{sql}");
        assert!(sql.contains(r#""person"."name" = 'bob'"#), "{sql}");
    }

    #[test]
    fn test_filter_on_unknown_field() {
        let qs = query_string(&[("filter[nickname][eq]", "bob")]);
        assert!(matches!(
            qs.from_filter_by(qs.build_base_query()),
            Err(CrudError::Projection { .. })
        ));
    }

    #[test]
    fn test_tags_go_through_the_adapter() {
        let qs = query_string(&[("tag", "vip")]);
        let sql = sql(qs.from_tags(qs.build_base_query()).unwrap());
        assert!(sql.contains(r#""person"."vip" = "#), "{sql}");

        let qs = query_string(&[("tag", "gold")]);
        assert!(qs.from_tags(qs.build_base_query()).is_err());
    }

    #[test]
    fn test_order_then_pagination() {
        let qs = query_string(&[("order_by[name]", "DESC"), ("limit", "5"), ("offset", "10")]);
        let query = qs.from_order_by(qs.build_base_query()).unwrap();
        let query = qs.from_offset(qs.from_limit(query));
        let sql = sql(query);
        assert!(
            sql.contains(r#"ORDER BY "person"."name" DESC, "person"."id" ASC LIMIT 5 OFFSET 10"#),
            "{sql}"
        );
    }

    #[test]
    fn test_no_limit_means_no_limit_clause() {
        let qs = query_string(&[]);
        let sql = sql(qs.from_offset(qs.from_limit(qs.build_base_query())));
        assert!(!sql.contains("LIMIT"), "{sql}");
        assert!(!sql.contains("OFFSET"), "{sql}");
    }

    #[test]
    fn test_offset_without_limit() {
        let qs = query_string(&[("offset", "2")]);
        let sql = sql(qs.from_offset(qs.from_limit(qs.build_base_query())));
        assert!(sql.ends_with("LIMIT 9223372036854775807 OFFSET 2"), "{sql}");
    }

    #[test]
    fn test_unknown_direction() {
        let qs = query_string(&[("order_by[name]", "sideways")]);
        assert!(matches!(
            qs.from_order_by(qs.build_base_query()),
            Err(CrudError::Parse { .. })
        ));
    }

    #[test]
    fn test_count_is_not_a_subquery() {
        let qs = query_string(&[("filter[age][gt]", "30")]);
        let sql = sql(count_select(qs.from_filter_by(qs.build_base_query()).unwrap()));
        assert!(sql.starts_with("SELECT COUNT(*) AS \"num_items\" FROM \"person\""), "{sql}");
        assert_eq!(sql.matches("SELECT").count(), 1);
    }
}
