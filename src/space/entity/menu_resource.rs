use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::{FieldDescription, FuretuiResource};

/// A menu entry pointing at a client resource
#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "furetui_menu_resource")]
#[serde(default)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub root_id: i32,
    pub resource_id: Option<i32>,
    pub label: String,
    pub order: i32,
    /// Entry opened when the space is entered
    pub is_default: bool,
    pub icon_code: Option<String>,
    pub icon_type: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::menu_root::Entity",
        from = "Column::RootId",
        to = "super::menu_root::Column::Id",
        on_delete = "Cascade"
    )]
    Root,
}

impl Related<super::menu_root::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Root.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub struct FuretuiMenuResource;

impl FuretuiResource for FuretuiMenuResource {
    type EntityType = Entity;
    type ModelType = Model;
    type ActiveModelType = ActiveModel;

    const MODEL_NAME: &'static str = "Model.FuretUI.Menu.Resource";

    fn relations() -> Vec<FieldDescription> {
        vec![FieldDescription::to_one(
            "root",
            super::menu_root::FuretuiMenuRoot::MODEL_NAME,
            &[("root_id", "id")],
        )]
    }
}
