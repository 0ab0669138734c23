#![cfg(feature = "web")]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;
use thiserror::Error;

use crate::backup::BackupError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Not found")]
    NotFound,

    #[error("Sheet error: {0}")]
    Store(#[from] StoreError),

    #[error("Backup failed: {0}")]
    Backup(#[from] BackupError),

    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("Internal error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Backup(_) | AppError::Template(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        error!("request failed with {}: {}", status, self);
        (status, self.to_string()).into_response()
    }
}
