use knowledge_search_client::{Error, ErrorKind};
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::{json, Value};

/// Everything a tool call or resource read can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Unknown resource: {0}")]
    UnknownResource(String),
    #[error(transparent)]
    Upstream(#[from] Error),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::UnknownTool(_) => "unknown_tool",
            ApiError::InvalidArguments(_) => "invalid_arguments",
            ApiError::UnknownResource(_) => "unknown_resource",
            ApiError::Upstream(err) => match err.kind() {
                ErrorKind::InvalidParameter => "invalid_arguments",
                kind => kind.into(),
            },
        }
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::UnknownTool(_) | ApiError::UnknownResource(_) => Status::NotFound,
            ApiError::InvalidArguments(_) => Status::BadRequest,
            ApiError::Upstream(err) => match err.kind() {
                ErrorKind::InvalidParameter => Status::BadRequest,
                ErrorKind::Timeout => Status::GatewayTimeout,
                ErrorKind::Configuration => Status::ServiceUnavailable,
                _ => Status::BadGateway,
            },
        }
    }

    /// The structured body every failure is reported with.
    pub fn payload(&self) -> Value {
        json!({
            "isError": true,
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidArguments(err.to_string())
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        log::warn!("{} {} failed: {}", request.method(), request.uri(), self);
        (self.status(), Json(self.payload())).respond_to(request)
    }
}
