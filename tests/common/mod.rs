#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tower::ServiceExt;

use mess_feedback::app::{AppState, prepare_sheet, router};
use mess_feedback::cell::CellValue;
use mess_feedback::login::AdminCredentials;
use mess_feedback::store::{LocalSheetStore, SheetStore, StoreError};
use mess_feedback::window::WindowStore;

/// In-memory sheet that counts the calls the web layer makes
pub struct CountingStore {
    inner: LocalSheetStore,
    pub appends: AtomicUsize,
    pub full_reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        CountingStore {
            inner: LocalSheetStore::in_memory(),
            appends: AtomicUsize::new(0),
            full_reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    pub fn full_reads(&self) -> usize {
        self.full_reads.load(Ordering::SeqCst)
    }

    /// Block writes, counting a whole batch as one
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.appends.store(0, Ordering::SeqCst);
        self.full_reads.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl SheetStore for CountingStore {
    async fn clear(&self) -> Result<(), StoreError> {
        self.inner.clear().await
    }

    async fn update(&self, anchor: &str, values: Vec<Vec<CellValue>>) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(anchor, values).await
    }

    async fn batch_update(&self, updates: Vec<(&str, Vec<Vec<CellValue>>)>) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.batch_update(updates).await
    }

    async fn append_row(&self, values: Vec<CellValue>) -> Result<(), StoreError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.inner.append_row(values).await
    }

    async fn get_all_values(&self) -> Result<Vec<Vec<String>>, StoreError> {
        self.full_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_all_values().await
    }

    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        self.inner.get_range(range).await
    }
}

pub struct Harness {
    pub app: Router,
    pub state: Arc<AppState>,
    pub store: Arc<CountingStore>,
    pub dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_state_file("window.json").await
    }

    /// Harness whose window state lives at `state_file` inside the temp dir
    pub async fn with_state_file(state_file: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CountingStore::new());
        prepare_sheet(store.as_ref()).await.unwrap();
        store.reset_counters();

        let state = Arc::new(
            AppState::new(
                store.clone(),
                WindowStore::new(dir.path().join(state_file)),
                AdminCredentials::new("admin", "mess123").unwrap(),
                dir.path().join("backups"),
            )
            .unwrap(),
        );
        let app = router(state.clone(), &dir.path().join("static"));

        Harness {
            app,
            state,
            store,
            dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookies: &str) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str, body: &str, cookies: &str) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Log in as the default admin and return the `session=...` cookie pair
    pub async fn login(&self) -> String {
        let response = self
            .post("/admin", "username=admin&password=mess123", "")
            .await;
        assert_eq!(location(&response), "/admin-panel");
        cookie(&response, "session").expect("login sets a session cookie")
    }

    /// Log in and open the collection window
    pub async fn open_window(&self) -> String {
        let session = self.login().await;
        let response = self.post("/admin-panel", "action=start", &session).await;
        assert_eq!(location(&response), "/admin-panel");
        session
    }

    pub async fn submit(&self, body: &str) -> Response<Body> {
        self.post("/submit", body, "").await
    }

    pub async fn sheet(&self) -> Vec<Vec<String>> {
        self.store.inner.get_all_values().await.unwrap()
    }
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

/// `name=value` pair from the response's Set-Cookie headers
pub fn cookie(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| v.starts_with(&prefix))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
        .next()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
