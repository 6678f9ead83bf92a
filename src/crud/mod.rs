//! Read and write access to registered models, in the shape the FuretUI
//! client cache expects.

pub mod models;
pub mod mutations;
pub mod read;

use sea_orm::DatabaseConnection;

use crate::core::Registry;

pub use models::{ChangeSet, FieldSpec, ReadRequest, ResponseEnvelope, UpdateKind, UpdateRecord};

/// CRUD operations over the models of a [`Registry`]
#[derive(Debug, Clone, Copy)]
pub struct Crud<'a> {
    registry: &'a Registry,
    db: &'a DatabaseConnection,
}

impl<'a> Crud<'a> {
    #[must_use]
    pub fn new(registry: &'a Registry, db: &'a DatabaseConnection) -> Self {
        Self { registry, db }
    }
}
