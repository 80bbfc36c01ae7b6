//! Shared harness: a router over a temp-dir database, a fake media host
//! and a notifier that remembers the tokens it was handed.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use snapfeed::auth::notify::Notifier;
use snapfeed::config::Config;
use snapfeed::db;
use snapfeed::db::models::User;
use snapfeed::media::{MediaError, MediaHost, UploadOptions, UploadedMedia};
use snapfeed::routes;
use snapfeed::state::{AppState, DbPool};

const BOUNDARY: &str = "snapfeed-test-boundary";

/// One call the fake host received.
#[derive(Debug, Clone)]
pub struct SeenUpload {
    pub path: PathBuf,
    pub existed: bool,
    pub contents: Vec<u8>,
    pub file_name: String,
    pub options: UploadOptions,
}

#[derive(Default)]
pub struct FakeMediaHost {
    pub fail: bool,
    pub seen: Mutex<Vec<SeenUpload>>,
}

#[async_trait]
impl MediaHost for FakeMediaHost {
    async fn upload(
        &self,
        path: &Path,
        file_name: &str,
        options: &UploadOptions,
    ) -> Result<UploadedMedia, MediaError> {
        let existed = path.exists();
        let contents = std::fs::read(path).unwrap_or_default();
        let n = {
            let mut seen = self.seen.lock().unwrap();
            seen.push(SeenUpload {
                path: path.to_path_buf(),
                existed,
                contents,
                file_name: file_name.to_string(),
                options: options.clone(),
            });
            seen.len()
        };

        if self.fail {
            return Err(MediaError::Rejected {
                status: 500,
                message: "storage unavailable".into(),
            });
        }

        let stored = format!("{}_{}", n, file_name);
        Ok(UploadedMedia {
            url: format!("https://media.test/feed/{}", stored),
            name: stored,
            file_id: Some(format!("file_{}", n)),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub reset_tokens: Mutex<Vec<(String, String)>>,
    pub verify_tokens: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn last_reset_token(&self) -> Option<String> {
        self.reset_tokens.lock().unwrap().last().map(|(_, t)| t.clone())
    }

    pub fn last_verify_token(&self) -> Option<String> {
        self.verify_tokens.lock().unwrap().last().map(|(_, t)| t.clone())
    }
}

impl Notifier for RecordingNotifier {
    fn reset_password_requested(&self, user: &User, token: &str) {
        self.reset_tokens
            .lock()
            .unwrap()
            .push((user.email.clone(), token.to_string()));
    }

    fn verification_requested(&self, user: &User, token: &str) {
        self.verify_tokens
            .lock()
            .unwrap()
            .push((user.email.clone(), token.to_string()));
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: DbPool,
    pub media: Arc<FakeMediaHost>,
    pub notifier: Arc<RecordingNotifier>,
    _dir: TempDir,
}

pub struct Response {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_media(FakeMediaHost::default())
    }

    pub fn with_failing_media() -> Self {
        Self::with_media(FakeMediaHost {
            fail: true,
            ..FakeMediaHost::default()
        })
    }

    fn with_media(media: FakeMediaHost) -> Self {
        let dir = TempDir::new().unwrap();
        let pool = db::create_pool(&dir.path().join("test.db")).expect("create pool");
        db::run_migrations(&pool).expect("run migrations");

        let mut config = Config::default();
        config.database.path = Some(dir.path().join("test.db"));
        // Lowest bcrypt cost keeps the suite fast
        config.auth.password_cost = 4;

        let media = Arc::new(media);
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState {
            db: pool.clone(),
            config,
            media: media.clone(),
            notifier: notifier.clone(),
        };

        Self {
            router: routes::app(state),
            db: pool,
            media,
            notifier,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Response {
            status,
            set_cookie,
            body,
        }
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.empty(Method::GET, uri, token).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response {
        self.empty(Method::DELETE, uri, token).await
    }

    async fn empty(&self, method: Method, uri: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn register(&self, email: &str, password: &str) -> Response {
        self.json(
            Method::POST,
            "/auth/register",
            None,
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        let form = format!("username={}&password={}", email, password);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/auth/jwt/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        self.send(request).await
    }

    /// Register and log in; returns the bearer token.
    pub async fn signup(&self, email: &str) -> String {
        let registered = self.register(email, "s3cret-pass").await;
        assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);
        let login = self.login(email, "s3cret-pass").await;
        assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);
        login.body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn create_post(
        &self,
        token: Option<&str>,
        caption: Option<&str>,
        file: Option<(&str, Option<&str>, &[u8])>,
    ) -> Response {
        let body = multipart_body(caption, file);
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/post")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub fn post_count(&self) -> i64 {
        let conn = self.db.get().unwrap();
        conn.query_row("SELECT COUNT(*) FROM posts", [], |r| r.get(0))
            .unwrap()
    }

    pub fn user_count(&self) -> i64 {
        let conn = self.db.get().unwrap();
        conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .unwrap()
    }
}

/// Build a multipart body with an optional caption and an optional
/// `(file_name, content_type, bytes)` file part.
pub fn multipart_body(caption: Option<&str>, file: Option<(&str, Option<&str>, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(caption) = caption {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\n{}\r\n",
                BOUNDARY, caption
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        if let Some(ct) = content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
