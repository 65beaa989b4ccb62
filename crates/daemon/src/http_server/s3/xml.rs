use std::borrow::Cow;
use std::fmt::Write;

use axum::response::{IntoResponse, Response};
use http::header::CONTENT_TYPE;
use http::StatusCode;

pub const S3_XMLNS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

const XML_CONTENT_TYPE: &str = "application/xml";

/// Escape the five XML special characters.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['<', '>', '&', '"', '\'']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Minimal writer for the handful of S3 response documents we produce.
#[derive(Debug)]
pub struct XmlWriter {
    buf: String,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            buf: String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#),
        }
    }

    /// Open the document root, tagged with the S3 namespace.
    pub fn root(&mut self, tag: &str) -> &mut Self {
        let _ = write!(self.buf, r#"<{tag} xmlns="{S3_XMLNS}">"#);
        self
    }

    pub fn open(&mut self, tag: &str) -> &mut Self {
        let _ = write!(self.buf, "<{tag}>");
        self
    }

    pub fn close(&mut self, tag: &str) -> &mut Self {
        let _ = write!(self.buf, "</{tag}>");
        self
    }

    pub fn element(&mut self, tag: &str, text: impl AsRef<str>) -> &mut Self {
        let _ = write!(self.buf, "<{tag}>{}</{tag}>", escape(text.as_ref()));
        self
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(CONTENT_TYPE, XML_CONTENT_TYPE)], body).into_response()
}
