//! Axum routes of the FuretUI data layer.
//!
//! ```rust,ignore
//! let registry = furetui_crud::space::register(Registry::new().register::<Customer>());
//! let app = furetui_crud::routes::router(CrudState::new(db, registry));
//! ```

use axum::{
    Form, Json, Router,
    extract::{FromRequest, Path, Query, Request, State},
    http::{StatusCode, header},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::core::{FieldDescription, FieldKind, Registry, Row};
use crate::crud::{ChangeSet, Crud, ReadRequest, ResponseEnvelope, UpdateKind, UpdateRecord};
use crate::errors::CrudError;
use crate::space::{self, MenuEntry, MenuResourceEntry, MenuRootEntry};

#[derive(Clone, Debug)]
pub struct CrudState {
    pub db: DatabaseConnection,
    pub registry: Arc<Registry>,
}

impl CrudState {
    #[must_use]
    pub fn new(db: DatabaseConnection, registry: Registry) -> Self {
        Self {
            db,
            registry: Arc::new(registry),
        }
    }

    fn crud(&self) -> Crud<'_> {
        Crud::new(&self.registry, &self.db)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRequest {
    pub model: String,
    /// Temporary key of the entity under `changes[model]["new"]`
    pub uuid: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub changes: ChangeSet,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateRequest {
    pub model: String,
    #[schema(value_type = Object)]
    pub pks: Row,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub changes: ChangeSet,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeleteRequest {
    pub model: String,
    #[schema(value_type = Object)]
    pub pks: Row,
}

/// The written entity and what is left of the change set
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MutationResponse {
    pub record: UpdateRecord,
    #[schema(value_type = Object)]
    pub changes: ChangeSet,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FieldsQuery {
    pub model: String,
}

/// `GET /spaces` parameters
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SpacesQuery {
    pub authenticated_userid: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SpaceResponse {
    pub path: String,
    pub menus: Vec<MenuEntry>,
}

#[utoipa::path(
    get,
    path = "/crud",
    params(
        ("model" = String, Query, description = "Registered model name"),
        ("fields" = String, Query, description = "Comma separated fields, `relation.field` for related data"),
        ("filter[<field>][<op>]" = Option<String>, Query, description = "Include filter, `~filter[...]` to exclude"),
        ("order_by[<field>]" = Option<String>, Query, description = "`asc` or `desc`"),
        ("tag" = Option<String>, Query, description = "Named filter of the model, `tags` for a comma separated list"),
        ("limit" = Option<u64>, Query),
        ("offset" = Option<u64>, Query),
    ),
    responses(
        (status = StatusCode::OK, description = "Page of entities and their relations", body = ResponseEnvelope),
        (status = StatusCode::BAD_REQUEST, description = "Malformed querystring or unknown field"),
        (status = StatusCode::NOT_FOUND, description = "Unknown model"),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error")
    ),
    operation_id = "crud_read",
    summary = "Read entities",
)]
pub async fn read_handler(
    State(state): State<CrudState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<ResponseEnvelope>, CrudError> {
    let request = ReadRequest::from_params(&params)?;
    Ok(Json(state.crud().read(&request).await?))
}

/// Querystring pairs of a JSON read body. Lists are joined with commas.
fn body_params(body: Row) -> Result<Vec<(String, String)>, CrudError> {
    body.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => text,
                Value::Number(_) | Value::Bool(_) => value.to_string(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
                Value::Null | Value::Object(_) => {
                    return Err(CrudError::parse(format!(
                        "Parameter '{key}' must be a string, a number or a list"
                    )));
                }
            };
            Ok((key, value))
        })
        .collect()
}

#[utoipa::path(
    post,
    path = "/crud",
    request_body(
        content = HashMap<String, String>,
        content_type = "application/x-www-form-urlencoded",
        description = "The read parameters as a form, or as a JSON object with `Content-Type: application/json`"
    ),
    responses(
        (status = StatusCode::OK, description = "Page of entities and their relations", body = ResponseEnvelope),
        (status = StatusCode::BAD_REQUEST, description = "Malformed body or unknown field"),
        (status = StatusCode::NOT_FOUND, description = "Unknown model"),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error")
    ),
    operation_id = "crud_read_body",
    summary = "Read entities, parameters in the body",
)]
pub async fn read_body_handler(
    State(state): State<CrudState>,
    request: Request,
) -> Result<Json<ResponseEnvelope>, CrudError> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    let params = if is_json {
        let Json(body) = Json::<Row>::from_request(request, &state)
            .await
            .map_err(|rejection| CrudError::parse(rejection.body_text()))?;
        body_params(body)?
    } else {
        let Form(params) = Form::<Vec<(String, String)>>::from_request(request, &state)
            .await
            .map_err(|rejection| CrudError::parse(rejection.body_text()))?;
        params
    };
    let request = ReadRequest::from_params(&params)?;
    Ok(Json(state.crud().read(&request).await?))
}

#[utoipa::path(
    get,
    path = "/crud/fields",
    params(FieldsQuery),
    responses(
        (status = StatusCode::OK, description = "Fields of the model", body = [FieldDescription]),
        (status = StatusCode::NOT_FOUND, description = "Unknown model")
    ),
    operation_id = "crud_fields",
    summary = "Describe the fields of a model",
)]
pub async fn fields_handler(
    State(state): State<CrudState>,
    Query(query): Query<FieldsQuery>,
) -> Result<Json<Vec<FieldDescription>>, CrudError> {
    let resource = state.registry.get(&query.model)?;
    Ok(Json(resource.fields_description()))
}

#[utoipa::path(
    post,
    path = "/crud/create",
    request_body = CreateRequest,
    responses(
        (status = StatusCode::OK, description = "Created entity", body = MutationResponse),
        (status = StatusCode::BAD_REQUEST, description = "Invalid changes"),
        (status = StatusCode::NOT_FOUND, description = "Unknown model or related entity"),
        (status = StatusCode::NOT_IMPLEMENTED, description = "To-many fields in the changes"),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error")
    ),
    operation_id = "crud_create",
    summary = "Create an entity from the change set",
)]
pub async fn create_handler(
    State(state): State<CrudState>,
    Json(mut request): Json<CreateRequest>,
) -> Result<Json<MutationResponse>, CrudError> {
    let record = state
        .crud()
        .create(&request.model, &request.uuid, &mut request.changes)
        .await?;
    Ok(Json(MutationResponse {
        record,
        changes: request.changes,
    }))
}

#[utoipa::path(
    post,
    path = "/crud/update",
    request_body = UpdateRequest,
    responses(
        (status = StatusCode::OK, description = "Updated entity", body = MutationResponse),
        (status = StatusCode::BAD_REQUEST, description = "Invalid changes"),
        (status = StatusCode::NOT_FOUND, description = "Unknown model or entity"),
        (status = StatusCode::NOT_IMPLEMENTED, description = "To-many fields in the changes"),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error")
    ),
    operation_id = "crud_update",
    summary = "Update an entity from the change set",
)]
pub async fn update_handler(
    State(state): State<CrudState>,
    Json(mut request): Json<UpdateRequest>,
) -> Result<Json<MutationResponse>, CrudError> {
    let record = state
        .crud()
        .update(&request.model, &request.pks, &mut request.changes)
        .await?;
    Ok(Json(MutationResponse {
        record,
        changes: request.changes,
    }))
}

#[utoipa::path(
    post,
    path = "/crud/delete",
    request_body = DeleteRequest,
    responses(
        (status = StatusCode::NO_CONTENT, description = "Entity deleted"),
        (status = StatusCode::NOT_FOUND, description = "Unknown model or entity"),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error")
    ),
    operation_id = "crud_delete",
    summary = "Delete an entity",
)]
pub async fn delete_handler(
    State(state): State<CrudState>,
    Json(request): Json<DeleteRequest>,
) -> Result<StatusCode, CrudError> {
    state.crud().delete(&request.model, &request.pks).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/spaces",
    params(SpacesQuery),
    responses(
        (status = StatusCode::OK, description = "Spaces of the user", body = [space::entity::space::Model]),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error")
    ),
    operation_id = "spaces",
    summary = "List the spaces of a user",
)]
pub async fn spaces_handler(
    State(state): State<CrudState>,
    Query(query): Query<SpacesQuery>,
) -> Result<Json<Vec<space::entity::space::Model>>, CrudError> {
    let spaces = space::get_for_user(&state.db, query.authenticated_userid.as_deref()).await?;
    Ok(Json(spaces))
}

#[utoipa::path(
    get,
    path = "/space/{code}",
    params(("code" = String, Path, description = "Space code")),
    responses(
        (status = StatusCode::OK, description = "Default path and menus of the space", body = SpaceResponse),
        (status = StatusCode::NOT_FOUND, description = "Unknown space"),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error")
    ),
    operation_id = "space",
    summary = "Enter a space",
)]
pub async fn space_handler(
    State(state): State<CrudState>,
    Path(code): Path<String>,
) -> Result<Json<SpaceResponse>, CrudError> {
    let space = space::get_space(&state.db, &code).await?;
    let path = space::get_path(&state.db, &space).await?;
    let menus = space::get_menus(&state.db, &space).await?;
    Ok(Json(SpaceResponse { path, menus }))
}

#[must_use]
pub fn router(state: CrudState) -> Router {
    Router::new()
        .route("/crud", get(read_handler).post(read_body_handler))
        .route("/crud/fields", get(fields_handler))
        .route("/crud/create", post(create_handler))
        .route("/crud/update", post(update_handler))
        .route("/crud/delete", post(delete_handler))
        .route("/spaces", get(spaces_handler))
        .route("/space/{code}", get(space_handler))
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        read_handler,
        read_body_handler,
        fields_handler,
        create_handler,
        update_handler,
        delete_handler,
        spaces_handler,
        space_handler
    ),
    components(schemas(
        ResponseEnvelope,
        UpdateRecord,
        UpdateKind,
        FieldDescription,
        FieldKind,
        CreateRequest,
        UpdateRequest,
        DeleteRequest,
        MutationResponse,
        SpaceResponse,
        MenuEntry,
        MenuRootEntry,
        MenuResourceEntry,
        space::entity::space::Model
    ))
)]
pub struct ApiDoc;
