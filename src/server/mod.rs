use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::json;
use thiserror::Error;

use crate::notify;
use crate::records::{EditField, Record};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server stopped: {source}")]
    Serve {
        #[source]
        source: std::io::Error,
    },
}

/// Why a record update could not be applied. Maps one-to-one onto the
/// endpoint's status codes.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("field '{field}' is not editable")]
    FieldNotEditable { field: String },

    #[error("record {id} not found")]
    NotFound { id: i64 },

    #[error("failed to read data file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("failed to write data file '{path}': {message}")]
    Write { path: String, message: String },
}

/// The backing collection: a flat JSON array of records, rewritten in full
/// on every update. No locking; a single process owns the file.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &FsPath {
        &self.path
    }

    pub fn read_records(&self) -> Result<Vec<Record>, UpdateError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| UpdateError::Read {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| UpdateError::Read {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Read-entire-file, mutate the matching entry, write-entire-file.
    pub fn apply_edit(&self, id: i64, field: &str, value: &str) -> Result<(), UpdateError> {
        let field = EditField::parse(field).ok_or_else(|| UpdateError::FieldNotEditable {
            field: field.to_string(),
        })?;
        let mut records = self.read_records()?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(UpdateError::NotFound { id })?;
        record.set_field(field, value.to_string());
        let json = serde_json::to_string_pretty(&records).map_err(|e| UpdateError::Write {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, json).map_err(|e| UpdateError::Write {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub addr: SocketAddr,
    pub data_file: PathBuf,
}

async fn root() -> &'static str {
    "roster API is up"
}

/// GET /records. A read failure degrades to an empty list with a 200 so the
/// frontend keeps working against no data; the cause is reported server-side.
async fn get_records(State(store): State<Arc<FileStore>>) -> Json<Vec<Record>> {
    match store.read_records() {
        Ok(records) => Json(records),
        Err(e) => {
            notify::error(&e.to_string());
            Json(Vec::new())
        }
    }
}

/// PUT /records/{id} with body `{"field": ..., "value": ...}`.
async fn put_record(
    State(store): State<Arc<FileStore>>,
    Path(id): Path<i64>,
    body: Json<serde_json::Value>,
) -> Response {
    let field = body.get("field").and_then(|v| v.as_str());
    let value = body.get("value").and_then(|v| v.as_str());
    let (field, value) = match (field, value) {
        (Some(field), Some(value)) => (field, value),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid request body" })),
            )
                .into_response();
        }
    };

    match store.apply_edit(id, field, value) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "record updated" })),
        )
            .into_response(),
        Err(e @ UpdateError::FieldNotEditable { .. }) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
        Err(e @ UpdateError::NotFound { .. }) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
        Err(e) => {
            notify::error(&e.to_string());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to persist update" })),
            )
                .into_response()
        }
    }
}

fn apply_cors_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, PUT, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}

/// Permissive CORS on every response; OPTIONS preflight is answered with a
/// bare 200 before it reaches a route.
async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        apply_cors_headers(&mut response);
        return response;
    }
    let mut response = next.run(request).await;
    apply_cors_headers(&mut response);
    response
}

pub fn router(store: Arc<FileStore>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/records", get(get_records))
        .route("/records/:id", put(put_record))
        .layer(middleware::from_fn(cors))
        .with_state(store)
}

pub async fn run(options: ServerOptions) -> Result<(), ServerError> {
    let store = Arc::new(FileStore::new(options.data_file));
    let app = router(store.clone());

    let listener = tokio::net::TcpListener::bind(options.addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: options.addr,
            source,
        })?;
    notify::info(&format!(
        "serving {} on http://{}",
        store.path().display(),
        options.addr
    ));
    axum::serve(listener, app)
        .await
        .map_err(|source| ServerError::Serve { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store(dir: &tempfile::TempDir) -> FileStore {
        let path = dir.path().join("records.json");
        std::fs::write(
            &path,
            r#"[{"id":1,"name":"Ana","address":"Calle 1"},{"id":2,"name":"Bob","address":"Calle 2"}]"#,
        )
        .unwrap();
        FileStore::new(path)
    }

    #[test]
    fn read_records_parses_backing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let records = store.read_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Ana");
    }

    #[test]
    fn apply_edit_rewrites_only_the_matching_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        store.apply_edit(2, "address", "Calle 9").unwrap();
        let records = store.read_records().unwrap();
        assert_eq!(records[1].address, "Calle 9");
        assert_eq!(records[0].address, "Calle 1");
    }

    #[test]
    fn apply_edit_rejects_fields_outside_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        assert!(matches!(
            store.apply_edit(1, "id", "99"),
            Err(UpdateError::FieldNotEditable { .. })
        ));
    }

    #[test]
    fn apply_edit_reports_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        assert!(matches!(
            store.apply_edit(42, "name", "Zoe"),
            Err(UpdateError::NotFound { id: 42 })
        ));
    }

    #[test]
    fn missing_backing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing.json"));
        assert!(matches!(
            store.read_records(),
            Err(UpdateError::Read { .. })
        ));
    }
}
