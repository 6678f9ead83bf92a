use furetui_crud::{FieldDescription, FuretuiResource, TagAdapter};
use sea_orm::{Condition, entity::prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customer")]
#[serde(default)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub city: Option<String>,
    pub vip: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::invoice::Entity")]
    Invoices,
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub struct Customer;

impl FuretuiResource for Customer {
    type EntityType = Entity;
    type ModelType = Model;
    type ActiveModelType = ActiveModel;

    const MODEL_NAME: &'static str = "Model.Customer";

    fn relations() -> Vec<FieldDescription> {
        vec![FieldDescription::to_many(
            "invoices",
            super::invoice::Invoice::MODEL_NAME,
            &[("id", "customer_id")],
        )]
    }

    fn adapter() -> TagAdapter {
        TagAdapter::new()
            .tag("vip", |_| Condition::all().add(Column::Vip.eq(true)))
            .tag("local", |context| match context.get("city") {
                Some(city) => Condition::all().add(Column::City.eq(city.as_str())),
                None => Condition::all(),
            })
    }
}
