use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::{FieldDescription, FuretuiResource};

/// A menu group of a space. Roots without a label are rendered inline.
#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "furetui_menu_root")]
#[serde(default)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub space_code: String,
    pub label: Option<String>,
    pub order: i32,
    pub icon_code: Option<String>,
    pub icon_type: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::space::Entity",
        from = "Column::SpaceCode",
        to = "super::space::Column::Code",
        on_delete = "Cascade"
    )]
    Space,
    #[sea_orm(has_many = "super::menu_resource::Entity")]
    Resources,
}

impl Related<super::space::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Space.def()
    }
}

impl Related<super::menu_resource::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Resources.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub struct FuretuiMenuRoot;

impl FuretuiResource for FuretuiMenuRoot {
    type EntityType = Entity;
    type ModelType = Model;
    type ActiveModelType = ActiveModel;

    const MODEL_NAME: &'static str = "Model.FuretUI.Menu.Root";

    fn relations() -> Vec<FieldDescription> {
        vec![
            FieldDescription::to_one(
                "space",
                super::space::FuretuiSpace::MODEL_NAME,
                &[("space_code", "code")],
            ),
            FieldDescription::to_many(
                "resources",
                super::menu_resource::FuretuiMenuResource::MODEL_NAME,
                &[("id", "root_id")],
            ),
        ]
    }
}
