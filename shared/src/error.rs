use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::env::{which, Environment};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Não autenticado")]
    UnauthenticatedError,
    #[error("Credenciais inválidas")]
    InvalidCredentials,
    #[error("Sem permissão")]
    ForbiddenOperation,
    #[error("{0}")]
    EntityNotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Dados inválidos")]
    ValidationError(#[from] garde::Report),
    #[error("Corpo do pedido inválido")]
    InvalidJsonBody(#[from] JsonRejection),
    #[error("Parâmetro inválido")]
    InvalidPathParam(#[from] PathRejection),
    #[error("Parâmetro inválido")]
    InvalidQueryParam(#[from] QueryRejection),
    #[error("トランザクションを実行できませんでした。")]
    TransactionError(#[source] sqlx::Error),
    #[error("データベース処理実行中にエラーが発生しました。")]
    SpecificOperationError(#[source] sqlx::Error),
    #[error("No rows affected: {0}")]
    NoRowsAffectedError(String),
    #[error("{0}")]
    PasswordHashError(String),
    #[error("{0}")]
    ConversionEntityError(String),
    #[error("{0}")]
    ExternalServiceError(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::UnauthenticatedError | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::ForbiddenOperation => StatusCode::FORBIDDEN,
            AppError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)
            | AppError::ValidationError(_)
            | AppError::InvalidJsonBody(_)
            | AppError::InvalidPathParam(_)
            | AppError::InvalidQueryParam(_) => StatusCode::BAD_REQUEST,
            AppError::TransactionError(_)
            | AppError::SpecificOperationError(_)
            | AppError::NoRowsAffectedError(_)
            | AppError::PasswordHashError(_)
            | AppError::ConversionEntityError(_)
            | AppError::ExternalServiceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_body(self, environment: Environment) -> ErrorResponse {
        match self {
            AppError::ValidationError(report) => ErrorResponse {
                error: "Dados inválidos".into(),
                details: Some(report.to_string()),
            },
            AppError::InvalidJsonBody(rejection) => ErrorResponse {
                error: "Corpo do pedido inválido".into(),
                details: Some(rejection.body_text()),
            },
            AppError::InvalidPathParam(rejection) => ErrorResponse {
                error: "Parâmetro inválido".into(),
                details: Some(rejection.body_text()),
            },
            AppError::InvalidQueryParam(rejection) => ErrorResponse {
                error: "Parâmetro inválido".into(),
                details: Some(rejection.body_text()),
            },
            e if e.status_code().is_server_error() => ErrorResponse {
                error: "Erro interno do servidor".into(),
                details: (environment == Environment::Development).then(|| match &e {
                    AppError::TransactionError(inner)
                    | AppError::SpecificOperationError(inner) => format!("{e}: {inner}"),
                    _ => e.to_string(),
                }),
            },
            e => ErrorResponse {
                error: e.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!(
                error.cause_chain = ?self,
                error.message = %self,
                "Unexpected error happened"
            );
        } else {
            tracing::debug!(status = %status_code, error.message = %self, "request rejected");
        }

        (status_code, Json(self.into_body(which()))).into_response()
    }
}
