//! Space navigation: the spaces a user can enter and the menus of each.

pub mod entity;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use utoipa::ToSchema;

use crate::core::{FuretuiResource, Registry};
use crate::errors::CrudError;
use entity::{menu_resource, menu_root, space};

pub use entity::{FuretuiMenuResource, FuretuiMenuRoot, FuretuiSpace};

/// Register the space models so the CRUD routes can serve them
#[must_use]
pub fn register(registry: Registry) -> Registry {
    registry
        .register::<FuretuiSpace>()
        .register::<FuretuiMenuRoot>()
        .register::<FuretuiMenuResource>()
}

/// A menu entry pointing at a client resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MenuResourceEntry {
    pub resource: Option<i32>,
    pub id: i32,
    pub order: i32,
    pub label: String,
    pub icon_code: Option<String>,
    pub icon_type: Option<String>,
}

impl From<menu_resource::Model> for MenuResourceEntry {
    fn from(model: menu_resource::Model) -> Self {
        Self {
            resource: model.resource_id,
            id: model.id,
            order: model.order,
            label: model.label,
            icon_code: model.icon_code,
            icon_type: model.icon_type,
        }
    }
}

/// A labelled menu root and its entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MenuRootEntry {
    pub children: Vec<MenuResourceEntry>,
    pub id: i32,
    pub order: i32,
    pub label: Option<String>,
    pub icon_code: Option<String>,
    pub icon_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum MenuEntry {
    Root(MenuRootEntry),
    Resource(MenuResourceEntry),
}

/// Client path opened when entering `space`:
/// `/space/<code>/menu/<menu id>/resource/<resource id>`.
///
/// The menu is the first resource flagged `is_default`, else the first
/// resource, ordering by root order then resource order (both descending)
/// then resource id. Ids are `0` when the space has no menu.
///
/// # Errors
///
/// Returns the database errors.
pub async fn get_path(db: &DatabaseConnection, space: &space::Model) -> Result<String, CrudError> {
    let query = menu_resource::Entity::find()
        .inner_join(menu_root::Entity)
        .filter(menu_root::Column::SpaceCode.eq(space.code.as_str()))
        .order_by_desc(menu_root::Column::Order)
        .order_by_desc(menu_resource::Column::Order)
        .order_by_asc(menu_resource::Column::Id);

    let default = query
        .clone()
        .filter(menu_resource::Column::IsDefault.eq(true))
        .one(db)
        .await?;
    let entry = match default {
        Some(entry) => Some(entry),
        None => query.one(db).await?,
    };

    Ok(format!(
        "/space/{}/menu/{}/resource/{}",
        space.code,
        entry.as_ref().map_or(0, |entry| entry.id),
        entry.and_then(|entry| entry.resource_id).unwrap_or(0)
    ))
}

/// Spaces shown to `authenticated_userid`, by order.
///
/// Every space is returned for now: spaces carry no access rules.
///
/// # Errors
///
/// Returns the database errors.
pub async fn get_for_user(
    db: &DatabaseConnection,
    authenticated_userid: Option<&str>,
) -> Result<Vec<space::Model>, CrudError> {
    let spaces = space::Entity::find()
        .order_by_asc(space::Column::Order)
        .order_by_asc(space::Column::Code)
        .all(db)
        .await?;
    tracing::debug!(
        user = authenticated_userid.unwrap_or("anonymous"),
        spaces = spaces.len(),
        "spaces for user"
    );
    Ok(spaces)
}

/// Menus of `space` by root order. Roots without entries are skipped; the
/// entries of an unlabelled root are inlined at the top level.
///
/// # Errors
///
/// Returns the database errors.
pub async fn get_menus(
    db: &DatabaseConnection,
    space: &space::Model,
) -> Result<Vec<MenuEntry>, CrudError> {
    let roots = space
        .find_related(menu_root::Entity)
        .order_by_asc(menu_root::Column::Order)
        .order_by_asc(menu_root::Column::Id)
        .all(db)
        .await?;

    let mut menus = Vec::new();
    for root in roots {
        let children: Vec<MenuResourceEntry> = root
            .find_related(menu_resource::Entity)
            .order_by_asc(menu_resource::Column::Order)
            .order_by_asc(menu_resource::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(MenuResourceEntry::from)
            .collect();
        if children.is_empty() {
            continue;
        }

        if root.label.is_some() {
            menus.push(MenuEntry::Root(MenuRootEntry {
                children,
                id: root.id,
                order: root.order,
                label: root.label,
                icon_code: root.icon_code,
                icon_type: root.icon_type,
            }));
        } else {
            menus.extend(children.into_iter().map(MenuEntry::Resource));
        }
    }
    Ok(menus)
}

/// Space by code
///
/// # Errors
///
/// [`CrudError::NotFound`] for unknown codes.
pub async fn get_space(db: &DatabaseConnection, code: &str) -> Result<space::Model, CrudError> {
    space::Entity::find_by_id(code.to_string())
        .one(db)
        .await?
        .ok_or_else(|| {
            let mut pks = serde_json::Map::new();
            pks.insert("code".to_string(), code.into());
            CrudError::not_found(FuretuiSpace::MODEL_NAME, Some(pks))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlabelled_root_entries_serialize_flat() {
        let entry = MenuEntry::Resource(MenuResourceEntry {
            resource: Some(3),
            id: 1,
            order: 100,
            label: "Customers".to_string(),
            icon_code: None,
            icon_type: None,
        });
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({
                "resource": 3,
                "id": 1,
                "order": 100,
                "label": "Customers",
                "icon_code": null,
                "icon_type": null,
            })
        );
    }

    #[test]
    fn test_space_models_are_registered() {
        let registry = register(Registry::new());
        assert_eq!(
            registry.names(),
            vec![
                "Model.FuretUI.Menu.Resource",
                "Model.FuretUI.Menu.Root",
                "Model.FuretUI.Space",
            ]
        );
    }
}
