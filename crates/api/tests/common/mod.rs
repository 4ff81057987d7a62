#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sikjipsa_api::auth::jwt::{generate_access_token, JwtConfig};
use sikjipsa_api::config::ServerConfig;
use sikjipsa_api::engine::dispatcher::DispatcherConfig;
use sikjipsa_api::middleware::rate_limit::UploadRateLimiter;
use sikjipsa_api::router::build_app_router;
use sikjipsa_api::state::AppState;
use sikjipsa_db::models::user::CreateUser;
use sikjipsa_db::repositories::UserRepo;
use sikjipsa_media::{CloudinaryConfig, HostedImage, ImageHost, ImageUpload, MediaError};
use sikjipsa_plantid::PlantIdConfig;
use sqlx::PgPool;
use tokio::sync::Notify;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";
pub const BOUNDARY: &str = "sikjipsa-test-boundary";

/// Image host that records uploads instead of sending them anywhere.
#[derive(Default)]
pub struct FakeImageHost {
    pub uploads: Mutex<Vec<ImageUpload>>,
    pub fail: bool,
}

#[async_trait]
impl ImageHost for FakeImageHost {
    async fn upload(&self, image: ImageUpload) -> Result<HostedImage, MediaError> {
        if self.fail {
            return Err(MediaError::Api {
                status: 500,
                body: "storage exploded".into(),
            });
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(image);
        let n = uploads.len();
        Ok(HostedImage {
            secure_url: format!("https://img.test/sikjipsa/diagnosis/{n}.jpg"),
            public_id: format!("sikjipsa/diagnosis/{n}"),
        })
    }
}

/// Build a test `ServerConfig` with a provider key set and fast defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        upload_rate_limit_per_hour: 20,
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
            access_token_expiry_mins: 60,
        },
        plant_id: PlantIdConfig {
            api_key: Some("test-key".into()),
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
        },
        cloudinary: CloudinaryConfig {
            cloud_name: "demo".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            api_url: "http://127.0.0.1:9".into(),
        },
        dispatcher: DispatcherConfig {
            poll_interval: Duration::from_millis(100),
            ..DispatcherConfig::default()
        },
    }
}

/// Handles tests need alongside the router.
pub struct TestApp {
    pub router: Router,
    pub image_host: Arc<FakeImageHost>,
    pub queue: Arc<Notify>,
}

/// Build the full application router with the default test config.
pub fn build_test_app(pool: PgPool) -> TestApp {
    build_test_app_with(pool, test_config(), FakeImageHost::default())
}

/// Build the full application router with a custom config and image host.
pub fn build_test_app_with(pool: PgPool, config: ServerConfig, host: FakeImageHost) -> TestApp {
    let image_host = Arc::new(host);
    let queue = Arc::new(Notify::new());

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        image_host: image_host.clone(),
        upload_limiter: Arc::new(UploadRateLimiter::per_hour(
            config.upload_rate_limit_per_hour,
        )),
        diagnosis_queue: queue.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        image_host,
        queue,
    }
}

/// Insert a user and return `(id, bearer token)`.
pub async fn create_user(pool: &PgPool, email: &str) -> (i64, String) {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            username: email.split('@').next().unwrap_or("user").to_string(),
        },
    )
    .await
    .unwrap();
    (user.id, token_for(user.id, email))
}

pub fn token_for(user_id: i64, email: &str) -> String {
    let config = JwtConfig {
        secret: JWT_SECRET.to_string(),
        access_token_expiry_mins: 60,
    };
    generate_access_token(user_id, email, &config).unwrap()
}

/// One multipart part: `(field name, optional file name, bytes)`.
pub type Part<'a> = (&'a str, Option<&'a str>, &'a [u8]);

/// Encode parts as a `multipart/form-data` body using [`BOUNDARY`].
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a multipart form, optionally authenticated.
pub async fn post_multipart(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    parts: &[Part<'_>],
) -> Response<Body> {
    let mut builder = Request::post(uri).header(
        "content-type",
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(multipart_body(parts))).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// GET a URI, optionally authenticated.
pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A small valid-looking PNG payload.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
