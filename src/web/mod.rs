//! Web surface: the upload form and a JSON endpoint over the same pipeline.

mod page;

pub use page::{escape_html, markdown_to_html, render_error, render_index, render_report};

use crate::analysis::{AnalysisParameters, LearningLevel};
use crate::credential::Credential;
use crate::orchestrator::{Orchestrator, PipelineReport};
use crate::upload::AudioUpload;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Headroom on top of the audio limit for the other form fields.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state.
pub struct AppState {
    pub orchestrator: Orchestrator,
    /// Whether the server was started with a usable key.
    pub has_credential: bool,
}

/// Build the router with all routes.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/analyze", post(analyze_html))
        .route("/api/analyze", post(analyze_json))
        .route("/levels", get(levels))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes + FORM_OVERHEAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Why a form submission was rejected before the pipeline ran.
#[derive(Debug)]
enum FormError {
    MissingFile,
    MissingCredential,
    Unsupported(String),
    InvalidLevel(String),
    Multipart(MultipartError),
}

impl FormError {
    fn status(&self) -> StatusCode {
        match self {
            FormError::Multipart(e) => e.status(),
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> String {
        match self {
            FormError::MissingFile => "⚠️ 분석을 시작하기 전에 음성 파일을 업로드해주세요.".to_string(),
            FormError::MissingCredential => {
                "OpenAI API 키가 필요합니다. 서버 설정에 키를 지정하거나 입력란에 키를 입력해주세요."
                    .to_string()
            }
            FormError::Unsupported(name) => format!(
                "지원하지 않는 파일 형식입니다: {} ({})",
                name,
                crate::upload::SUPPORTED_EXTENSIONS.join(", ")
            ),
            FormError::InvalidLevel(level) => format!("알 수 없는 학습 수준입니다: {}", level),
            FormError::Multipart(e) => format!("업로드를 읽을 수 없습니다: {}", e.body_text()),
        }
    }
}

impl From<MultipartError> for FormError {
    fn from(e: MultipartError) -> Self {
        FormError::Multipart(e)
    }
}

/// The fields of one submission.
#[derive(Debug, Default)]
struct AnalyzeForm {
    upload: Option<AudioUpload>,
    level: LearningLevel,
    field: String,
    api_key: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<AnalyzeForm, FormError> {
    let mut form = AnalyzeForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was chosen.
                if !file_name.is_empty() {
                    form.upload = Some(AudioUpload::new(file_name, bytes.to_vec()));
                }
            }
            "level" => {
                let text = field.text().await?;
                if !text.trim().is_empty() {
                    form.level = text.parse().map_err(|_| FormError::InvalidLevel(text))?;
                }
            }
            "field" => form.field = field.text().await?,
            "api_key" => {
                let key = field.text().await?;
                if !key.trim().is_empty() {
                    form.api_key = Some(key);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Validate a submission and run the pipeline on it.
async fn run_form(state: &AppState, multipart: Multipart) -> Result<PipelineReport, FormError> {
    let form = read_form(multipart).await?;

    let orchestrator = match form.api_key {
        Some(key) => state.orchestrator.with_credential(Credential::new(key)),
        None if state.has_credential => state.orchestrator.clone(),
        None => return Err(FormError::MissingCredential),
    };

    let upload = form.upload.ok_or(FormError::MissingFile)?;
    upload
        .ensure_supported()
        .map_err(|_| FormError::Unsupported(upload.file_name.clone()))?;

    let params = AnalysisParameters::new(form.level, form.field);
    let report = orchestrator.process_upload(&upload, &params).await;
    info!(
        "Finished '{}' (success: {}, warnings: {})",
        report.upload.file_name,
        report.outcome.is_success(),
        report.warnings.len()
    );
    Ok(report)
}

// === Handlers ===

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index(state.has_credential))
}

async fn analyze_html(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    match run_form(&state, multipart).await {
        Ok(report) => Html(render_report(&report)).into_response(),
        Err(e) => {
            warn!("Rejected submission: {:?}", e);
            (e.status(), Html(render_error(&e.message()))).into_response()
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn analyze_json(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    match run_form(&state, multipart).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            warn!("Rejected submission: {:?}", e);
            (e.status(), Json(ErrorResponse { error: e.message() })).into_response()
        }
    }
}

#[derive(Serialize)]
struct LevelInfo {
    id: &'static str,
    label: &'static str,
    default: bool,
}

async fn levels() -> impl IntoResponse {
    let levels: Vec<LevelInfo> = LearningLevel::ALL
        .iter()
        .map(|level| LevelInfo {
            id: level.slug(),
            label: level.label(),
            default: *level == LearningLevel::default(),
        })
        .collect();
    Json(levels)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::FakeAnalyzer;
    use crate::config::Settings;
    use crate::failure::FailureKind;
    use crate::transcription::testing::FakeTranscriber;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    const BOUNDARY: &str = "kangui-test-boundary";

    struct Fixture {
        app: Router,
        transcriber: Arc<FakeTranscriber>,
        analyzer: Arc<FakeAnalyzer>,
        _dir: tempfile::TempDir,
    }

    fn fixture(key: &str, transcriber: FakeTranscriber, analyzer: FakeAnalyzer) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.general.temp_dir = dir.path().join("temp_audio").to_string_lossy().to_string();

        let transcriber = Arc::new(transcriber);
        let analyzer = Arc::new(analyzer);
        let credential = Credential::new(key);
        let has_credential = !credential.is_blank();
        let orchestrator = Orchestrator::with_components(
            &settings,
            credential,
            transcriber.clone(),
            analyzer.clone(),
        )
        .unwrap();

        let state = Arc::new(AppState {
            orchestrator,
            has_credential,
        });
        Fixture {
            app: router(state, settings.server.max_upload_bytes()),
            transcriber,
            analyzer,
            _dir: dir,
        }
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_request(uri: &str, parts: &[Part]) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, file_name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n",
                            name, file_name
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_levels() {
        let f = fixture("sk-test", FakeTranscriber::returning("t"), FakeAnalyzer::returning("a"));

        let response = f
            .app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = f
            .app
            .oneshot(Request::get("/levels").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let levels: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        let levels = levels.as_array().unwrap();
        assert_eq!(levels.len(), 6);
        assert_eq!(levels[2]["label"], "고등학생");
        assert_eq!(levels[3]["default"], true);
    }

    #[tokio::test]
    async fn test_index_hides_key_field_when_configured() {
        let f = fixture("sk-test", FakeTranscriber::returning("t"), FakeAnalyzer::returning("a"));
        let response = f
            .app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let page = body_string(response).await;
        assert!(page.contains("대상 학습 수준"));
        assert!(!page.contains("name=\"api_key\""));
    }

    #[tokio::test]
    async fn test_api_analyze_success() {
        let f = fixture(
            "sk-test",
            FakeTranscriber::returning("오늘은 뉴턴의 운동법칙을 배웠습니다."),
            FakeAnalyzer::returning("### 💡 핵심 요약\n뉴턴"),
        );
        let request = multipart_request(
            "/api/analyze",
            &[
                Part::File("audio", "lec 1.mp3", b"ID3"),
                Part::Text("level", "고등학생"),
                Part::Text("field", ""),
            ],
        );

        let response = f.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let report: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(report["outcome"]["status"], "analyzed");
        assert_eq!(report["upload"]["file_name"], "lec 1.mp3");
        assert_eq!(report["warnings"].as_array().unwrap().len(), 0);

        assert_eq!(f.transcriber.calls(), 1);
        let requests = f.analyzer.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].prompt.contains("고등학생"));
        assert!(requests[0].prompt.contains("지정되지 않음"));
    }

    #[tokio::test]
    async fn test_html_analyze_shows_partial_success() {
        let f = fixture(
            "sk-test",
            FakeTranscriber::returning("강의 내용"),
            FakeAnalyzer::failing(FailureKind::RateLimited),
        );
        let request = multipart_request("/analyze", &[Part::File("audio", "lec.wav", b"RIFF")]);

        let response = f.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let page = body_string(response).await;
        assert!(page.contains("강의 내용"));
        assert!(page.contains("AI 분석 실패: 오류: OpenAI API 요청 한도를 초과했습니다 (GPT)."));
    }

    #[tokio::test]
    async fn test_api_failure_carries_status_line() {
        let f = fixture(
            "sk-test",
            FakeTranscriber::failing(FailureKind::InvalidCredential),
            FakeAnalyzer::returning("a"),
        );
        let request = multipart_request("/api/analyze", &[Part::File("audio", "lec.mp3", b"ID3")]);

        let response = f.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let report: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(report["outcome"]["status"], "transcription_failed");
        assert_eq!(
            report["outcome"]["message"],
            "오류: OpenAI API 키가 유효하지 않습니다 (Whisper). 키를 확인해주세요."
        );
        assert_eq!(
            report["error"],
            "STT 변환 실패: 오류: OpenAI API 키가 유효하지 않습니다 (Whisper). 키를 확인해주세요."
        );
        assert!(f.analyzer.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_rejected() {
        let f = fixture("sk-test", FakeTranscriber::returning("t"), FakeAnalyzer::returning("a"));
        let request = multipart_request(
            "/analyze",
            &[Part::File("audio", "", b""), Part::Text("level", "중학생")],
        );

        let response = f.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response)
            .await
            .contains("⚠️ 분석을 시작하기 전에 음성 파일을 업로드해주세요."));
        assert_eq!(f.transcriber.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_is_rejected() {
        let f = fixture("", FakeTranscriber::returning("t"), FakeAnalyzer::returning("a"));
        let request = multipart_request("/api/analyze", &[Part::File("audio", "lec.mp3", b"ID3")]);

        let response = f.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert!(body["error"].as_str().unwrap().contains("OpenAI API 키가 필요합니다"));
        assert_eq!(f.transcriber.calls(), 0);
        assert!(f.analyzer.requests().is_empty());
    }

    #[tokio::test]
    async fn test_form_key_is_used_when_server_has_none() {
        let f = fixture("", FakeTranscriber::returning("t"), FakeAnalyzer::returning("a"));
        let request = multipart_request(
            "/api/analyze",
            &[
                Part::Text("api_key", "sk-from-form"),
                Part::File("audio", "lec.mp3", b"ID3"),
            ],
        );

        let response = f.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(f.transcriber.calls(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_rejected() {
        let f = fixture("sk-test", FakeTranscriber::returning("t"), FakeAnalyzer::returning("a"));
        let request = multipart_request("/api/analyze", &[Part::File("audio", "slides.pdf", b"%PDF")]);

        let response = f.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("slides.pdf"));
        assert_eq!(f.transcriber.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_level_is_rejected() {
        let f = fixture("sk-test", FakeTranscriber::returning("t"), FakeAnalyzer::returning("a"));
        let request = multipart_request(
            "/api/analyze",
            &[Part::File("audio", "lec.mp3", b"ID3"), Part::Text("level", "phd")],
        );

        let response = f.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(f.transcriber.calls(), 0);
    }
}
