//! Local stand-in for the Chrome for Testing endpoints.
//!
//! The updater is blocking, so the server runs on its own thread with a
//! current-thread tokio runtime instead of inside the test.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use zip::write::SimpleFileOptions;

use cft_updater::{ArtifactType, Platform, UpdaterConfig};

pub const VERSION_PATH: &str = "/LATEST_RELEASE_STABLE";

#[derive(Default)]
struct Shared {
    latest: Mutex<String>,
    /// Status the version endpoint answers with instead of 200
    latest_status: Mutex<Option<StatusCode>>,
    archives: Mutex<HashMap<String, Vec<u8>>>,
    /// Remaining 503 responses per path
    failures: Mutex<HashMap<String, u32>>,
    hits: Mutex<Vec<String>>,
}

pub struct MockCdn {
    pub addr: SocketAddr,
    shared: Arc<Shared>,
}

impl MockCdn {
    pub fn start() -> Self {
        let shared = Arc::new(Shared::default());
        let app = Router::new()
            .route(VERSION_PATH, get(latest))
            .fallback(archive)
            .with_state(shared.clone());

        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        let addr = rx.recv().unwrap();
        Self { addr, shared }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Config pointing at this server, with instant retries
    pub fn config(&self) -> UpdaterConfig {
        UpdaterConfig {
            version_url: format!("{}{VERSION_PATH}", self.base_url()),
            download_base: self.base_url(),
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            max_retries: 2,
            retry_base_delay_ms: 0,
            ..UpdaterConfig::default()
        }
    }

    pub fn set_latest(&self, body: &str) {
        *self.shared.latest.lock().unwrap() = body.to_string();
    }

    pub fn set_latest_status(&self, status: StatusCode) {
        *self.shared.latest_status.lock().unwrap() = Some(status);
    }

    pub fn archive_path(version: &str, platform: Platform, artifact: ArtifactType) -> String {
        format!("/{version}/{platform}/{}", artifact.archive_file_name(platform))
    }

    /// Publish an archive containing `<stem>/<file>` entries
    pub fn publish(&self, version: &str, platform: Platform, artifact: ArtifactType, files: &[(&str, &[u8])]) {
        let stem = artifact.stem(platform);
        let entries: Vec<(String, &[u8])> = files
            .iter()
            .map(|(name, body)| (format!("{stem}/{name}"), *body))
            .collect();
        self.publish_raw(
            &Self::archive_path(version, platform, artifact),
            zip_bytes(&entries),
        );
    }

    pub fn publish_raw(&self, path: &str, body: Vec<u8>) {
        self.shared
            .archives
            .lock()
            .unwrap()
            .insert(path.to_string(), body);
    }

    /// Answer the next `count` requests for `path` with 503
    pub fn fail_next(&self, path: &str, count: u32) {
        self.shared
            .failures
            .lock()
            .unwrap()
            .insert(path.to_string(), count);
    }

    /// Requests seen for `path`, failed ones included
    pub fn hits(&self, path: &str) -> usize {
        self.shared
            .hits
            .lock()
            .unwrap()
            .iter()
            .filter(|p| *p == path)
            .count()
    }

    /// Requests for anything but the version endpoint
    pub fn archive_hits(&self) -> usize {
        self.shared
            .hits
            .lock()
            .unwrap()
            .iter()
            .filter(|p| *p != VERSION_PATH)
            .count()
    }
}

impl Shared {
    /// Record the hit and report whether it should fail
    fn hit(&self, path: &str) -> bool {
        self.hits.lock().unwrap().push(path.to_string());
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(path) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

async fn latest(State(shared): State<Arc<Shared>>) -> Response {
    if shared.hit(VERSION_PATH) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let status = shared.latest_status.lock().unwrap().unwrap_or(StatusCode::OK);
    let body = shared.latest.lock().unwrap().clone();
    (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

async fn archive(State(shared): State<Arc<Shared>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    if shared.hit(&path) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    match shared.archives.lock().unwrap().get(&path) {
        Some(body) => (
            [(header::CONTENT_TYPE, "application/zip")],
            body.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// In-memory zip; names ending in `/` become directories
pub fn zip_bytes<S: AsRef<str>>(entries: &[(S, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, body) in entries {
        let name = name.as_ref();
        if name.ends_with('/') {
            zip.add_directory(name, options).unwrap();
        } else {
            zip.start_file(name, options).unwrap();
            zip.write_all(body).unwrap();
        }
    }
    zip.finish().unwrap().into_inner()
}
