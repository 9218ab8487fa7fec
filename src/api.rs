//! HTTP client for the code-generation backend.
//!
//! Every screen talks to the backend through [`ApiRequest`] values that the
//! event loop hands to [`ApiClient::execute`] on a tokio task. The answer comes
//! back as an [`ApiResponse`] tagged with the ticket of the request.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::validators::{dotted_extension, validate_extension};

/// Errors from a backend call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx answer. `detail` is the FastAPI `detail` string when the body had one.
    #[error("server returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Server {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    InvalidDocument(String),
}

impl ApiError {
    /// Message to show the user: the server's own explanation when it gave one,
    /// otherwise the screen's fallback text.
    pub fn detail_or(&self, fallback: &str) -> String {
        match self {
            ApiError::Server {
                detail: Some(detail),
                ..
            } => detail.clone(),
            ApiError::InvalidDocument(message) => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Practice {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct SnippetList {
    snippets: Vec<Snippet>,
}

#[derive(Debug, Deserialize)]
struct PracticeList {
    practices: Vec<Practice>,
}

/// Answer to a document upload. Only `document_id` is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    pub document_id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub content_preview: Option<String>,
    #[serde(default)]
    pub content_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposePromptRequest {
    pub document_id: String,
    pub snippet_ids: Vec<String>,
    pub practice_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ComposedPrompt {
    prompt: String,
}

#[derive(Debug, Serialize)]
struct GenerateCodeRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    #[serde(default)]
    pub content: String,
}

/// Result of a code generation run.
///
/// When the model answer could not be split into files, `files` is empty and
/// `raw_text` carries the whole answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedProject {
    pub project_id: String,
    #[serde(default)]
    pub files: Vec<GeneratedFile>,
    pub download_url: String,
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl GeneratedProject {
    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn raw_text(&self) -> &str {
        self.raw_text.as_deref().unwrap_or("")
    }
}

/// Work a screen wants done against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    Health,
    Upload {
        path: PathBuf,
    },
    ListSnippets,
    ListPractices,
    ComposePrompt(ComposePromptRequest),
    GenerateCode {
        prompt: String,
    },
    Download {
        download_url: String,
        project_id: String,
        directory: PathBuf,
    },
}

impl ApiRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ApiRequest::Health => "health",
            ApiRequest::Upload { .. } => "upload",
            ApiRequest::ListSnippets => "list_snippets",
            ApiRequest::ListPractices => "list_practices",
            ApiRequest::ComposePrompt(_) => "compose_prompt",
            ApiRequest::GenerateCode { .. } => "generate_code",
            ApiRequest::Download { .. } => "download",
        }
    }
}

#[derive(Debug)]
pub enum ApiResponse {
    Health(bool),
    Uploaded(ApiResult<UploadResponse>),
    Snippets(ApiResult<Vec<Snippet>>),
    Practices(ApiResult<Vec<Practice>>),
    Prompt(ApiResult<String>),
    Generated(ApiResult<GeneratedProject>),
    Downloaded(ApiResult<PathBuf>),
}

/// A response routed back to the UI loop.
#[derive(Debug)]
pub struct ApiMessage {
    pub ticket: u64,
    pub response: ApiResponse,
}

/// MIME type sent with an uploaded document.
fn mime_for(file_name: &str) -> &'static str {
    match dotted_extension(file_name).as_deref() {
        Some(".docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some(".pdf") => "application/pdf",
        Some(".md") => "text/markdown",
        Some(".txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Pull the `detail` string out of a FastAPI error body.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .and_then(|d| d.as_str())
        .map(|d| d.to_string())
}

/// File name of a downloaded project archive.
pub fn archive_file_name(project_id: &str) -> String {
    let safe: String = project_id
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("generated_project_{}.zip", safe)
}

/// Backend client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path. Absolute URLs are returned untouched,
    /// which covers download links pointing at another host.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn parse<T: DeserializeOwned>(resp: Response) -> ApiResult<T> {
        let resp = Self::check(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn check(resp: Response) -> ApiResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let detail = extract_detail(&body);
        warn!(status = %status, detail = ?detail, "api_error_response");
        Err(ApiError::Server { status, detail })
    }

    /// True when `GET /health` answers with a success status.
    pub async fn health_check(&self) -> bool {
        match self.client.get(self.resolve("/health")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "health_check_failed");
                false
            }
        }
    }

    pub async fn upload_document(&self, path: &Path) -> ApiResult<UploadResponse> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        if let Some(message) = validate_extension(&file_name) {
            return Err(ApiError::InvalidDocument(message));
        }

        let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
            action: "read",
            path: path.to_path_buf(),
            source,
        })?;
        let size = bytes.len();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(mime_for(&file_name))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(self.resolve("/api/upload"))
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadResponse = Self::parse(resp).await?;
        info!(file = %file_name, size, document_id = %uploaded.document_id, "document_uploaded");
        Ok(uploaded)
    }

    pub async fn list_snippets(&self) -> ApiResult<Vec<Snippet>> {
        let resp = self.client.get(self.resolve("/api/snippets")).send().await?;
        let list: SnippetList = Self::parse(resp).await?;
        debug!(count = list.snippets.len(), "snippets_loaded");
        Ok(list.snippets)
    }

    pub async fn list_practices(&self) -> ApiResult<Vec<Practice>> {
        let resp = self.client.get(self.resolve("/api/practices")).send().await?;
        let list: PracticeList = Self::parse(resp).await?;
        debug!(count = list.practices.len(), "practices_loaded");
        Ok(list.practices)
    }

    pub async fn compose_prompt(&self, request: &ComposePromptRequest) -> ApiResult<String> {
        let resp = self
            .client
            .post(self.resolve("/api/compose-prompt"))
            .json(request)
            .send()
            .await?;
        let composed: ComposedPrompt = Self::parse(resp).await?;
        info!(
            document_id = %request.document_id,
            snippets = request.snippet_ids.len(),
            practices = request.practice_ids.len(),
            prompt_len = composed.prompt.len(),
            "prompt_composed"
        );
        Ok(composed.prompt)
    }

    pub async fn generate_code(&self, prompt: &str) -> ApiResult<GeneratedProject> {
        let resp = self
            .client
            .post(self.resolve("/api/generate-code"))
            .json(&GenerateCodeRequest { prompt })
            .send()
            .await?;
        let project: GeneratedProject = Self::parse(resp).await?;
        info!(
            project_id = %project.project_id,
            files = project.files.len(),
            "code_generated"
        );
        Ok(project)
    }

    /// Fetch the project archive and write it into `directory`.
    /// Returns the path of the written file.
    pub async fn download_project(
        &self,
        download_url: &str,
        project_id: &str,
        directory: &Path,
    ) -> ApiResult<PathBuf> {
        let resp = self.client.get(self.resolve(download_url)).send().await?;
        let bytes = Self::check(resp).await?.bytes().await?;

        tokio::fs::create_dir_all(directory)
            .await
            .map_err(|source| ApiError::Io {
                action: "create",
                path: directory.to_path_buf(),
                source,
            })?;
        let target = directory.join(archive_file_name(project_id));
        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|source| ApiError::Io {
                action: "write",
                path: target.clone(),
                source,
            })?;

        info!(path = ?target, bytes = bytes.len(), "project_downloaded");
        Ok(target)
    }

    /// Run a queued request to completion.
    pub async fn execute(&self, request: ApiRequest) -> ApiResponse {
        match request {
            ApiRequest::Health => ApiResponse::Health(self.health_check().await),
            ApiRequest::Upload { path } => ApiResponse::Uploaded(self.upload_document(&path).await),
            ApiRequest::ListSnippets => ApiResponse::Snippets(self.list_snippets().await),
            ApiRequest::ListPractices => ApiResponse::Practices(self.list_practices().await),
            ApiRequest::ComposePrompt(body) => ApiResponse::Prompt(self.compose_prompt(&body).await),
            ApiRequest::GenerateCode { prompt } => {
                ApiResponse::Generated(self.generate_code(&prompt).await)
            }
            ApiRequest::Download {
                download_url,
                project_id,
                directory,
            } => ApiResponse::Downloaded(
                self.download_project(&download_url, &project_id, &directory)
                    .await,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Router;
    use axum::extract::Multipart;
    use axum::http::{StatusCode as HttpStatus, header};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::Json;
    use serde_json::{Value, json};

    async fn spawn_backend(router: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ApiClient::new(&format!("http://{}/", addr), Duration::from_secs(5)).unwrap()
    }

    async fn upload_handler(mut multipart: Multipart) -> Json<Value> {
        let field = multipart.next_field().await.unwrap().unwrap();
        let field_name = field.name().unwrap().to_string();
        let file_name = field.file_name().unwrap().to_string();
        let content_type = field.content_type().unwrap().to_string();
        let bytes = field.bytes().await.unwrap();
        Json(json!({
            "document_id": format!("doc-{}", field_name),
            "filename": file_name,
            "file_type": content_type,
            "content_preview": String::from_utf8_lossy(&bytes),
            "content_length": bytes.len(),
        }))
    }

    #[test]
    fn test_resolve_joins_paths() {
        let client = ApiClient::new("http://api:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://api:8000");
        assert_eq!(client.resolve("/api/snippets"), "http://api:8000/api/snippets");
        assert_eq!(client.resolve("api/practices"), "http://api:8000/api/practices");
        assert_eq!(
            client.resolve("https://cdn.example.com/p.zip"),
            "https://cdn.example.com/p.zip"
        );
    }

    #[test]
    fn test_extract_detail() {
        assert_eq!(
            extract_detail(r#"{"detail": "Document not found"}"#),
            Some("Document not found".to_string())
        );
        // Validation errors carry a list, which is not user-facing text.
        assert_eq!(extract_detail(r#"{"detail": [{"loc": ["body"]}]}"#), None);
        assert_eq!(extract_detail("Internal Server Error"), None);
    }

    #[test]
    fn test_detail_or_fallback() {
        let with_detail = ApiError::Server {
            status: StatusCode::BAD_REQUEST,
            detail: Some("File type not supported".to_string()),
        };
        assert_eq!(with_detail.detail_or("Upload failed"), "File type not supported");

        let without = ApiError::Server {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: None,
        };
        assert_eq!(without.detail_or("Upload failed"), "Upload failed");
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("a.PDF"), "application/pdf");
        assert_eq!(mime_for("a.md"), "text/markdown");
        assert_eq!(mime_for("a.txt"), "text/plain");
        assert!(mime_for("a.docx").contains("wordprocessingml"));
    }

    #[test]
    fn test_archive_file_name() {
        assert_eq!(archive_file_name("abc-123"), "generated_project_abc-123.zip");
        assert_eq!(archive_file_name("../x"), "generated_project_.._x.zip");
    }

    #[test]
    fn test_generated_project_defaults() {
        let project: GeneratedProject = serde_json::from_value(json!({
            "project_id": "p1",
            "download_url": "/api/download/p1",
        }))
        .unwrap();
        assert!(!project.has_files());
        assert_eq!(project.raw_text(), "");
        assert!(project.instructions.is_none());
    }

    #[tokio::test]
    async fn test_upload_document_sends_multipart_file() {
        let client = spawn_backend(Router::new().route("/api/upload", post(upload_handler))).await;
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("requirements.md");
        std::fs::write(&doc, "# Todo app").unwrap();

        let uploaded = client.upload_document(&doc).await.unwrap();
        assert_eq!(uploaded.document_id, "doc-file");
        assert_eq!(uploaded.filename.as_deref(), Some("requirements.md"));
        assert_eq!(uploaded.file_type.as_deref(), Some("text/markdown"));
        assert_eq!(uploaded.content_preview.as_deref(), Some("# Todo app"));
        assert_eq!(uploaded.content_length, Some(10));
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_extension_locally() {
        let client = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let err = client
            .upload_document(Path::new("/tmp/diagram.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidDocument(_)));
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_io_error() {
        let client = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = client
            .upload_document(&dir.path().join("gone.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Io { action: "read", .. }));
    }

    #[tokio::test]
    async fn test_server_error_detail_is_surfaced() {
        let router = Router::new().route(
            "/api/upload",
            post(|| async {
                (
                    HttpStatus::BAD_REQUEST,
                    Json(json!({"detail": "File type not supported. Allowed types: .docx, .pdf, .md, .txt"})),
                )
            }),
        );
        let client = spawn_backend(router).await;
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("notes.txt");
        std::fs::write(&doc, "hello").unwrap();

        let err = client.upload_document(&doc).await.unwrap_err();
        match &err {
            ApiError::Server { status, detail } => {
                assert_eq!(*status, StatusCode::BAD_REQUEST);
                assert!(detail.as_deref().unwrap().starts_with("File type not supported"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_snippets_and_practices() {
        let router = Router::new()
            .route(
                "/api/snippets",
                get(|| async {
                    Json(json!({"snippets": [
                        {"id": "senior_dev", "title": "Senior developer", "description": "Act senior", "content": "..."},
                        {"id": "qa_perspective", "title": "QA", "description": "Write tests", "content": "..."}
                    ]}))
                }),
            )
            .route(
                "/api/practices",
                get(|| async {
                    Json(json!({"practices": [
                        {"id": "clean-code", "title": "Clean Code", "excerpt": "Small functions", "content": "# Clean Code"}
                    ]}))
                }),
            );
        let client = spawn_backend(router).await;

        let snippets = client.list_snippets().await.unwrap();
        assert_eq!(
            snippets.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            ["senior_dev", "qa_perspective"]
        );
        assert_eq!(snippets[1].description, "Write tests");

        let practices = client.list_practices().await.unwrap();
        assert_eq!(practices.len(), 1);
        assert_eq!(practices[0].excerpt, "Small functions");
    }

    #[tokio::test]
    async fn test_compose_prompt_sends_selection() {
        let router = Router::new().route(
            "/api/compose-prompt",
            post(|Json(body): Json<Value>| async move {
                let prompt = format!(
                    "{}|{}|{}",
                    body["document_id"].as_str().unwrap(),
                    body["snippet_ids"].as_array().unwrap().len(),
                    body["practice_ids"].as_array().unwrap().len()
                );
                Json(json!({ "prompt": prompt }))
            }),
        );
        let client = spawn_backend(router).await;

        let prompt = client
            .compose_prompt(&ComposePromptRequest {
                document_id: "doc-9".to_string(),
                snippet_ids: vec!["senior_dev".to_string(), "generate_tests".to_string()],
                practice_ids: vec![],
            })
            .await
            .unwrap();
        assert_eq!(prompt, "doc-9|2|0");
    }

    #[tokio::test]
    async fn test_generate_then_download() {
        let router = Router::new()
            .route(
                "/api/generate-code",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({
                        "project_id": "p-42",
                        "files": [{"path": "src/main.py", "content": body["prompt"]}],
                        "download_url": "/api/download/p-42",
                        "raw_text": "",
                    }))
                }),
            )
            .route(
                "/api/download/p-42",
                get(|| async {
                    (
                        [(header::CONTENT_TYPE, "application/zip")],
                        vec![0x50u8, 0x4b, 0x03, 0x04],
                    )
                        .into_response()
                }),
            );
        let client = spawn_backend(router).await;

        let project = client.generate_code("build a todo app").await.unwrap();
        assert_eq!(project.project_id, "p-42");
        assert_eq!(project.files[0].content, "build a todo app");

        let dir = tempfile::tempdir().unwrap();
        let target_dir = dir.path().join("downloads");
        let saved = client
            .download_project(&project.download_url, &project.project_id, &target_dir)
            .await
            .unwrap();
        assert_eq!(saved, target_dir.join("generated_project_p-42.zip"));
        assert_eq!(std::fs::read(&saved).unwrap(), vec![0x50, 0x4b, 0x03, 0x04]);
    }

    #[tokio::test]
    async fn test_download_not_found() {
        let router = Router::new().route(
            "/api/download/missing",
            get(|| async { (HttpStatus::NOT_FOUND, Json(json!({"detail": "Project not found"}))) }),
        );
        let client = spawn_backend(router).await;
        let dir = tempfile::tempdir().unwrap();

        let err = client
            .download_project("/api/download/missing", "missing", dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.detail_or("Download failed"), "Project not found");
        assert!(!dir.path().join("generated_project_missing.zip").exists());
    }

    #[tokio::test]
    async fn test_health_check() {
        let client =
            spawn_backend(Router::new().route("/health", get(|| async { Json(json!({"status": "healthy"})) })))
                .await;
        assert!(client.health_check().await);

        let offline = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        assert!(!offline.health_check().await);
    }

    #[tokio::test]
    async fn test_execute_routes_requests() {
        let router = Router::new().route(
            "/api/snippets",
            get(|| async { Json(json!({"snippets": []})) }),
        );
        let client = spawn_backend(router).await;

        match client.execute(ApiRequest::ListSnippets).await {
            ApiResponse::Snippets(Ok(list)) => assert!(list.is_empty()),
            other => panic!("unexpected response: {other:?}"),
        }
        match client.execute(ApiRequest::ListPractices).await {
            ApiResponse::Practices(Err(ApiError::Server { status, .. })) => {
                assert_eq!(status, StatusCode::NOT_FOUND)
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
