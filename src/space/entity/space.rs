use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::{FieldDescription, FuretuiResource};

/// A top-level area of the application, holding menus
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "furetui_space")]
#[serde(default)]
#[schema(as = Space)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub label: String,
    #[sea_orm(default_value = 100)]
    pub order: i32,
    pub description: Option<String>,
    pub icon_code: Option<String>,
    pub icon_type: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::menu_root::Entity")]
    Menus,
}

impl Related<super::menu_root::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Menus.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub const DEFAULT_ORDER: i32 = 100;

impl Default for Model {
    fn default() -> Self {
        Self {
            code: String::new(),
            label: String::new(),
            order: DEFAULT_ORDER,
            description: None,
            icon_code: None,
            icon_type: None,
        }
    }
}

pub struct FuretuiSpace;

impl FuretuiResource for FuretuiSpace {
    type EntityType = Entity;
    type ModelType = Model;
    type ActiveModelType = ActiveModel;

    const MODEL_NAME: &'static str = "Model.FuretUI.Space";

    fn relations() -> Vec<FieldDescription> {
        vec![FieldDescription::to_many(
            "menus",
            super::menu_root::FuretuiMenuRoot::MODEL_NAME,
            &[("code", "space_code")],
        )]
    }
}
