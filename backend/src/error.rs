use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::{ElectionError, ErrorCode, ErrorResponse};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Election(#[from] ElectionError),
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Election(e) => match e.code() {
                ErrorCode::InvalidInput => Status::BadRequest,
                ErrorCode::NotFound => Status::NotFound,
                ErrorCode::Unauthorized => Status::Unauthorized,
                ErrorCode::Forbidden => Status::Forbidden,
                ErrorCode::Conflict => Status::Conflict,
                ErrorCode::SystemError => Status::InternalServerError,
            },
            ApiError::NotAuthenticated => Status::Unauthorized,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }
}

impl From<shared::validation::ValidationError> for ApiError {
    fn from(err: shared::validation::ValidationError) -> Self {
        ApiError::Election(err.into())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let message = if status == Status::InternalServerError {
            error!(error = %self, path = %req.uri(), "Request failed");
            "An internal server error occurred.".to_string()
        } else {
            self.to_string()
        };

        rocket::Response::build_from(Json(ErrorResponse { error: message }).respond_to(req)?)
            .status(status)
            .ok()
    }
}
