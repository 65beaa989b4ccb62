use axum::response::Response;
use chrono::{DateTime, SecondsFormat, Utc};

pub mod error;
pub mod get_object;
pub mod list_buckets;
pub mod list_objects;
pub mod validate;
pub mod xml;

pub use error::S3Error;

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// RFC 3339 with millisecond precision, as used in listings.
pub fn iso8601(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// IMF-fixdate, as used in `Last-Modified`.
pub fn http_date(time: &DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

/// Method fallback for every S3 route; the gateway is read-only.
pub async fn method_not_allowed() -> Response {
    axum::response::IntoResponse::into_response(S3Error::MethodNotAllowed)
}
