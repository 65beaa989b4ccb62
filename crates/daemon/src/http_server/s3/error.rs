use axum::response::{IntoResponse, Response};
use http::StatusCode;

use common::prelude::CacheError;

use super::xml::{xml_response, XmlWriter};

/// Errors surfaced to S3 clients as `<Error>` documents.
#[derive(Debug, thiserror::Error)]
pub enum S3Error {
    #[error("The specified bucket does not exist")]
    NoSuchBucket { bucket: String },
    #[error("The specified key does not exist")]
    NoSuchKey { bucket: String, key: String },
    #[error("{message}")]
    InvalidRequest {
        message: String,
        bucket: Option<String>,
        key: Option<String>,
    },
    #[error("{0}")]
    InvalidArgument(String),
    #[error("The specified method is not allowed against this resource")]
    MethodNotAllowed,
    #[error("The requested resource does not exist")]
    NotFound,
    #[error("We encountered an internal error. Please try again.")]
    InternalError,
}

impl S3Error {
    pub fn invalid_path(bucket: &str, key: Option<&str>) -> Self {
        S3Error::InvalidRequest {
            message: "Invalid path".to_string(),
            bucket: Some(bucket.to_string()),
            key: key.map(str::to_string),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            S3Error::NoSuchBucket { .. } | S3Error::NoSuchKey { .. } | S3Error::NotFound => {
                StatusCode::NOT_FOUND
            }
            S3Error::InvalidRequest { .. } | S3Error::InvalidArgument(_) => {
                StatusCode::BAD_REQUEST
            }
            S3Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            S3Error::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            S3Error::NoSuchBucket { .. } => "NoSuchBucket",
            S3Error::NoSuchKey { .. } => "NoSuchKey",
            S3Error::InvalidRequest { .. } => "InvalidRequest",
            S3Error::InvalidArgument(_) => "InvalidArgument",
            S3Error::MethodNotAllowed => "MethodNotAllowed",
            S3Error::NotFound => "NotFound",
            S3Error::InternalError => "InternalError",
        }
    }

    fn bucket(&self) -> Option<&str> {
        match self {
            S3Error::NoSuchBucket { bucket } | S3Error::NoSuchKey { bucket, .. } => Some(bucket),
            S3Error::InvalidRequest { bucket, .. } => bucket.as_deref(),
            _ => None,
        }
    }

    fn key(&self) -> Option<&str> {
        match self {
            S3Error::NoSuchKey { key, .. } => Some(key),
            S3Error::InvalidRequest { key, .. } => key.as_deref(),
            _ => None,
        }
    }

    pub fn to_xml(&self) -> String {
        let mut xml = XmlWriter::new();
        xml.open("Error")
            .element("Code", self.code())
            .element("Message", self.to_string());
        if let Some(bucket) = self.bucket() {
            xml.element("BucketName", bucket);
        }
        if let Some(key) = self.key() {
            xml.element("Key", key);
        }
        xml.close("Error");
        xml.finish()
    }
}

impl From<CacheError> for S3Error {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NoSuchBucket(bucket) => S3Error::NoSuchBucket { bucket },
            CacheError::NoSuchKey { bucket, key } => S3Error::NoSuchKey { bucket, key },
            err => {
                tracing::error!(error = %err, "unexpected cache error");
                S3Error::InternalError
            }
        }
    }
}

impl IntoResponse for S3Error {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        } else {
            tracing::debug!(code = self.code(), "{}", self);
        }
        xml_response(self.status(), self.to_xml())
    }
}
