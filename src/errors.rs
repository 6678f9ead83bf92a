//! # Error Handling for the CRUD layer
//!
//! Every fallible operation of this crate returns [`CrudError`]. The variants
//! follow the failure taxonomy of the FuretUI client protocol:
//!
//! - **Lookup**: the requested model is not registered
//! - **Parse**: malformed querystring key, value or change-set key
//! - **Projection**: a field name that the model does not declare
//! - **`NotFound`**: no entity matches the given primary key
//! - **Unsupported**: an operation the layer deliberately does not implement
//! - **Database**: any other Sea-ORM error (logged, never sent to clients)
//!
//! Nothing is retried or recovered locally. Errors surface to the Axum
//! handlers, where [`IntoResponse`] maps them to a status code and a
//! sanitized JSON body.
//!
//! ```rust,ignore
//! async fn handler(State(state): State<CrudState>) -> Result<Json<ResponseEnvelope>, CrudError> {
//!     let resource = state.registry.get("customer")?;
//!     // ...
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug)]
pub enum CrudError {
    /// Unknown model name
    Lookup {
        model: String,
    },

    /// Malformed input (querystring key, integer, JSON primary key, ...)
    Parse {
        message: String,
    },

    /// Field requested or written that the model does not declare
    Projection {
        model: String,
        field: String,
    },

    /// Entity not found by primary key
    NotFound {
        model: String,
        /// Primary key mapping that was looked up, if known
        pks: Option<Map<String, Value>>,
    },

    /// Operation that is intentionally not implemented
    Unsupported {
        message: String,
    },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database {
        internal: DbErr,
    },
}

impl CrudError {
    pub fn lookup(model: impl Into<String>) -> Self {
        Self::Lookup {
            model: model.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn projection(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Projection {
            model: model.into(),
            field: field.into(),
        }
    }

    pub fn not_found(model: impl Into<String>, pks: Option<Map<String, Value>>) -> Self {
        Self::NotFound {
            model: model.into(),
            pks,
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Wrap a database error. Details are logged when the error is turned
    /// into a response and never sent to the client.
    ///
    /// ```rust,ignore
    /// let rows = query.all(db).await.map_err(CrudError::database)?;
    /// ```
    pub fn database(err: DbErr) -> Self {
        Self::Database { internal: err }
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Lookup { .. } | Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Parse { .. } | Self::Projection { .. } => StatusCode::BAD_REQUEST,
            Self::Unsupported { .. } => StatusCode::NOT_IMPLEMENTED,
            Self::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Lookup { model } => format!("Unknown model '{model}'"),
            Self::Parse { message } | Self::Unsupported { message } => message.clone(),
            Self::Projection { model, field } => {
                format!("Model '{model}' has no field '{field}'")
            }
            Self::NotFound { model, pks } => match pks {
                Some(pks) => format!("{model} with primary key {} not found", Value::Object(pks.clone())),
                None => format!("{model} not found"),
            },
            Self::Database { .. } => "A database error occurred".to_string(),
        }
    }

    fn log_internal(&self) {
        if let Self::Database { internal } = self {
            tracing::error!(error = ?internal, "Database error occurred");
        } else {
            tracing::debug!(
                error = %self.user_message(),
                status = %self.status_code(),
                "CRUD error"
            );
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for CrudError {
    fn into_response(self) -> Response {
        self.log_internal();
        let status = self.status_code();
        (
            status,
            Json(ErrorResponse {
                error: self.user_message(),
            }),
        )
            .into_response()
    }
}

impl fmt::Display for CrudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Display is for logs, so the database cause is included here
            Self::Database { internal } => write!(f, "database error: {internal}"),
            _ => write!(f, "{}", self.user_message()),
        }
    }
}

impl std::error::Error for CrudError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database { internal } => Some(internal),
            _ => None,
        }
    }
}

/// `DbErr::RecordNotFound` becomes [`CrudError::NotFound`]; every other
/// database error is internal.
impl From<DbErr> for CrudError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let model = msg.split_whitespace().next().unwrap_or("Record");
                Self::NotFound {
                    model: model.to_string(),
                    pks: None,
                }
            }
            _ => Self::Database { internal: err },
        }
    }
}

impl From<serde_json::Error> for CrudError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: format!("Invalid JSON: {err}"),
        }
    }
}
