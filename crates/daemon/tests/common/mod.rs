//! Router fixtures for HTTP tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::Router;
use http::{Request, Response};
use tempfile::TempDir;
use tower::ServiceExt;

use vedro_daemon::http_server;
use vedro_daemon::ServiceState;

/// A scratch root plus a router serving it.
pub struct TestServer {
    dir: TempDir,
    state: ServiceState,
    router: Router,
}

impl TestServer {
    /// A server whose root has not been scanned yet.
    pub fn unscanned() -> Self {
        let dir = TempDir::new().unwrap();
        let state = ServiceState::new(dir.path());
        let config = http_server::Config::new("127.0.0.1:0".parse().unwrap());
        let router = http_server::router(&config, state.clone());
        Self { dir, state, router }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn write(&self, bucket: &str, key: &str, content: &[u8]) -> PathBuf {
        let path = self.dir.path().join(bucket).join(key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn mkdir(&self, bucket: &str, key: &str) -> PathBuf {
        let path = self.dir.path().join(bucket).join(key);
        fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn scan(&self) {
        self.state.cache().scan_all(self.dir.path()).unwrap();
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: http::header::HeaderName) -> &'a str {
    response.headers()[name].to_str().unwrap()
}
