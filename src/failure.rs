//! Typed failures for the transcription and analysis stages.
//!
//! Every stage returns a [`StageOutcome`]. A [`Failure`] records which stage
//! failed and why; its `Display` output is the Korean status line shown to
//! the user, which always starts with [`Failure::SENTINEL`].

use async_openai::error::{ApiError, OpenAIError};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// Result of a single stage invocation.
pub type StageOutcome<T> = std::result::Result<T, Failure>;

/// The pipeline stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Transcription,
    Analysis,
}

impl Stage {
    /// Label used inside user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Transcription => "Whisper",
            Stage::Analysis => "GPT",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Transcription => write!(f, "transcription"),
            Stage::Analysis => write!(f, "analysis"),
        }
    }
}

/// Why a stage failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// No credential was supplied. Detected before any network call.
    MissingCredential,
    /// The audio file does not exist. Detected before any network call.
    AudioNotFound { path: PathBuf },
    /// Request quota or rate limit exceeded upstream.
    RateLimited,
    /// The upstream API rejected the credential.
    InvalidCredential,
    /// The upstream API could not be reached (connect failure or timeout).
    ConnectionFailed,
    /// Any other error reported by the upstream API, with its message.
    Upstream {
        #[serde(rename = "detail")]
        message: String,
    },
    /// Anything else. Only the error category is kept.
    Unexpected { category: String },
}

impl FailureKind {
    /// Build an `Unexpected` failure from the category name of an error.
    pub fn unexpected(category: impl Into<String>) -> Self {
        FailureKind::Unexpected {
            category: category.into(),
        }
    }
}

/// A failed stage invocation.
///
/// Serializes as `stage`, the `kind` tag with its fields, and the
/// user-facing `message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub stage: Stage,
    pub kind: FailureKind,
}

impl Failure {
    /// Leading marker of every failure message.
    pub const SENTINEL: &'static str = "오류:";

    pub fn new(stage: Stage, kind: FailureKind) -> Self {
        Self { stage, kind }
    }

    /// The user-facing status line.
    pub fn message(&self) -> String {
        let label = self.stage.label();
        let body = match &self.kind {
            FailureKind::MissingCredential => "OpenAI API 키가 제공되지 않았습니다.".to_string(),
            FailureKind::AudioNotFound { path } => {
                format!("오디오 파일을 찾을 수 없습니다 - {}", path.display())
            }
            FailureKind::RateLimited => format!(
                "OpenAI API 요청 한도를 초과했습니다 ({}). 잠시 후 다시 시도해주세요.",
                label
            ),
            FailureKind::InvalidCredential => format!(
                "OpenAI API 키가 유효하지 않습니다 ({}). 키를 확인해주세요.",
                label
            ),
            FailureKind::ConnectionFailed => format!(
                "OpenAI 서버에 연결할 수 없습니다 ({}). 네트워크 연결을 확인해주세요.",
                label
            ),
            FailureKind::Upstream { message } => {
                format!("{} API 처리 중 문제가 발생했습니다. {}", label, message)
            }
            FailureKind::Unexpected { category } => match self.stage {
                Stage::Transcription => {
                    format!("음성 변환 중 예상치 못한 문제가 발생했습니다. ({})", category)
                }
                Stage::Analysis => format!("AI 분석 중 문제가 발생했습니다. ({})", category),
            },
        };
        format!("{} {}", Self::SENTINEL, body)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for Failure {}

impl Serialize for Failure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Repr<'a> {
            stage: Stage,
            #[serde(flatten)]
            kind: &'a FailureKind,
            message: String,
        }

        Repr {
            stage: self.stage,
            kind: &self.kind,
            message: self.message(),
        }
        .serialize(serializer)
    }
}

const UNREADABLE_RESPONSE: &str = "서버 응답을 해석할 수 없습니다.";

/// Map an error from the OpenAI client onto a failure kind.
pub fn classify_openai_error(err: &OpenAIError) -> FailureKind {
    match err {
        OpenAIError::ApiError(api) => classify_api_error(api),
        OpenAIError::Reqwest(e) if e.is_connect() || e.is_timeout() => {
            FailureKind::ConnectionFailed
        }
        // A gateway error page instead of a JSON body.
        OpenAIError::JSONDeserialize(_) => FailureKind::Upstream {
            message: UNREADABLE_RESPONSE.to_string(),
        },
        other => FailureKind::unexpected(variant_name(other)),
    }
}

fn classify_api_error(api: &ApiError) -> FailureKind {
    let code = api.code.as_deref().unwrap_or_default();
    let kind = api.r#type.as_deref().unwrap_or_default();

    match (code, kind) {
        ("rate_limit_exceeded" | "insufficient_quota", _)
        | (_, "insufficient_quota" | "requests" | "tokens") => FailureKind::RateLimited,
        ("invalid_api_key", _) | (_, "authentication_error") => FailureKind::InvalidCredential,
        _ => FailureKind::Upstream {
            message: api.message.clone(),
        },
    }
}

/// Variant name of an enum error, taken from its `Debug` output.
pub(crate) fn variant_name(err: &impl fmt::Debug) -> String {
    let debug = format!("{:?}", err);
    debug
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("Error")
        .to_string()
}
