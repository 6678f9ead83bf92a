//! # furetui-crud
//!
//! Data access layer behind the FuretUI client: list queries expressed in a
//! bracketed querystring, reads that return every entity the client cache
//! needs as `UPDATE_DATA` records, and writes driven by the client change
//! set. Models are Sea-ORM entities exposed by name through a [`Registry`].
//!
//! ```rust,ignore
//! use furetui_crud::{CrudState, Registry, router};
//!
//! let registry = Registry::new()
//!     .register::<Customer>()
//!     .register::<Invoice>();
//! let registry = furetui_crud::space::register(registry);
//! let app = router(CrudState::new(db, registry));
//! ```
//!
//! ## Modules
//!
//! - [`querystring`]: querystring parsing and its translation to Sea-ORM
//! - [`core`]: model metadata, tag filters and the model registry
//! - [`crud`]: read pipeline and change set mutations
//! - [`routes`]: Axum handlers and the OpenAPI document
//! - [`space`]: space navigation (spaces, menus, default path)

pub mod core;
pub mod crud;
pub mod errors;
pub mod querystring;
pub mod routes;
pub mod space;

pub use crate::core::{
    DynResource, FieldDescription, FieldKind, FuretuiResource, Registry, Row, TagAdapter,
};
pub use crud::{Crud, ReadRequest, ResponseEnvelope, UpdateRecord};
pub use errors::CrudError;
pub use querystring::{QueryDirectives, QueryString, deserialize_querystring};
pub use routes::{ApiDoc, CrudState, router};
