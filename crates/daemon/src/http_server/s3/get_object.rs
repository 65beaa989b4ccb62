use axum::extract::{Path, Request, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, TimeDelta, Utc};
use http::header::{CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use http::{HeaderMap, HeaderValue, StatusCode};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use common::prelude::Entry;

use super::error::S3Error;
use super::{http_date, parse_http_date, validate};
use crate::ServiceState;

const DIRECTORY_CONTENT_TYPE: &str = "application/x-directory";

/// Whether the request's validators say the client copy is still current.
pub fn is_not_modified(headers: &HeaderMap, entry: &Entry) -> bool {
    let etag_matches = headers
        .get(IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|tags| entry.fingerprint.matches(tags));
    if etag_matches {
        return true;
    }

    headers
        .get(IF_MODIFIED_SINCE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_http_date)
        .is_some_and(|since| not_modified_since(&entry.last_modified, &since))
}

// HTTP dates carry whole seconds only
fn not_modified_since(last_modified: &DateTime<Utc>, since: &DateTime<Utc>) -> bool {
    *last_modified < *since + TimeDelta::seconds(1)
}

fn validators(entry: &Entry) -> Result<[(http::HeaderName, HeaderValue); 2], S3Error> {
    let etag = HeaderValue::from_str(entry.fingerprint.as_str()).map_err(|e| {
        tracing::error!(error = %e, "fingerprint is not a valid header value");
        S3Error::InternalError
    })?;
    let last_modified = HeaderValue::from_str(&http_date(&entry.last_modified)).map_err(|e| {
        tracing::error!(error = %e, "date is not a valid header value");
        S3Error::InternalError
    })?;
    Ok([(ETAG, etag), (LAST_MODIFIED, last_modified)])
}

#[tracing::instrument(skip(state, request), fields(method = %request.method()))]
pub async fn handler(
    State(state): State<ServiceState>,
    Path((bucket, key)): Path<(String, String)>,
    request: Request,
) -> Result<Response, S3Error> {
    validate::object_key(&bucket, &key)?;

    let entry = state.cache().get_entry(&bucket, &key)?;
    let validators = validators(&entry)?;

    if is_not_modified(request.headers(), &entry) {
        return Ok((StatusCode::NOT_MODIFIED, validators).into_response());
    }

    if entry.is_dir {
        return Ok((
            StatusCode::OK,
            validators,
            [(CONTENT_TYPE, DIRECTORY_CONTENT_TYPE)],
        )
            .into_response());
    }

    let path = state.object_path(&bucket, &key);
    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    // gone since the last scan
    if response.status() == StatusCode::NOT_FOUND {
        tracing::debug!(path = %path.display(), "cached key no longer on disk");
        return Err(S3Error::NoSuchKey { bucket, key });
    }

    let mut response = response.map(axum::body::Body::new);
    if response.status().is_success() {
        let headers = response.headers_mut();
        for (name, value) in validators {
            headers.insert(name, value);
        }
    }
    Ok(response)
}
