use axum::extract::State;
use axum::response::Response;
use http::StatusCode;

use super::xml::{xml_response, XmlWriter};
use crate::ServiceState;

const OWNER: &str = "vedro";

pub fn render(buckets: &[String]) -> String {
    let mut xml = XmlWriter::new();
    xml.root("ListAllMyBucketsResult")
        .open("Owner")
        .element("ID", OWNER)
        .element("DisplayName", OWNER)
        .close("Owner")
        .open("Buckets");
    for name in buckets {
        xml.open("Bucket").element("Name", name).close("Bucket");
    }
    xml.close("Buckets").close("ListAllMyBucketsResult");
    xml.finish()
}

#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>) -> Response {
    let buckets = state.cache().list_buckets();
    xml_response(StatusCode::OK, render(&buckets))
}
