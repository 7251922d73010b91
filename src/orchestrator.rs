//! Pipeline orchestrator for Kangui.
//!
//! Stores the upload as a transient file, runs transcription, builds the
//! analysis prompt, runs analysis, and always removes the transient file.

use crate::analysis::{
    AnalysisParameters, AnalysisResult, AnalysisStage, Analyzer, ChatAnalyzer,
};
use crate::config::{Prompts, Settings};
use crate::credential::Credential;
use crate::error::Result;
use crate::failure::Failure;
use crate::transcription::{Transcriber, Transcript, TranscriptionStage, WhisperTranscriber};
use crate::upload::{AudioUpload, TransientFile, UploadSummary};
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// The main orchestrator for the Kangui pipeline.
#[derive(Clone)]
pub struct Orchestrator {
    prompts: Prompts,
    transcription: TranscriptionStage,
    analysis: AnalysisStage,
    temp_dir: PathBuf,
    credential: Credential,
}

impl Orchestrator {
    /// Create an orchestrator using the OpenAI backends from `settings`.
    pub fn new(settings: &Settings, credential: Credential) -> Result<Self> {
        let transcriber = Arc::new(WhisperTranscriber::with_config(
            &settings.transcription.model,
            settings.request_timeout(),
        ));
        let analyzer = Arc::new(ChatAnalyzer::new(settings.request_timeout()));

        Self::with_components(settings, credential, transcriber, analyzer)
    }

    /// Create an orchestrator with custom backends.
    pub fn with_components(
        settings: &Settings,
        credential: Credential,
        transcriber: Arc<dyn Transcriber>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let analysis = AnalysisStage::new(analyzer, settings.analysis.clone(), &prompts);

        Ok(Self {
            prompts,
            transcription: TranscriptionStage::new(transcriber),
            analysis,
            temp_dir: settings.temp_dir(),
            credential,
        })
    }

    /// The same pipeline, using a different credential.
    pub fn with_credential(&self, credential: Credential) -> Self {
        Self {
            credential,
            ..self.clone()
        }
    }

    /// Build the analysis prompt for a transcript.
    pub fn build_prompt(&self, transcript: &Transcript, params: &AnalysisParameters) -> String {
        params.build_prompt(&self.prompts, transcript)
    }

    /// Run the whole pipeline for one upload.
    ///
    /// Never fails: every problem ends up in the report's outcome, and a
    /// failure to remove the transient file is added to its warnings.
    #[instrument(skip(self, upload, params), fields(file = %upload.file_name, size = upload.size(), learning_level = %params.level))]
    pub async fn process_upload(
        &self,
        upload: &AudioUpload,
        params: &AnalysisParameters,
    ) -> PipelineReport {
        let transient = TransientFile::reserve(&self.temp_dir, &upload.file_name);

        let outcome = match self.run_stages(&transient, upload, params).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Pipeline aborted: {}", e);
                PipelineOutcome::Aborted {
                    message: format!("처리 중 예상치 못한 오류 발생: {}", e),
                }
            }
        };

        let mut warnings = Vec::new();
        if let Err(e) = transient.release().await {
            warn!("Failed to remove transient file: {}", e);
            warnings.push(format!("임시 파일 삭제 중 오류 발생: {}", e));
        }

        PipelineReport {
            upload: upload.summary(),
            outcome,
            warnings,
        }
    }

    async fn run_stages(
        &self,
        transient: &TransientFile,
        upload: &AudioUpload,
        params: &AnalysisParameters,
    ) -> Result<PipelineOutcome> {
        transient.write(&upload.bytes).await?;
        info!("{}", upload.summary().status_line());

        let transcript = match self.transcription.run(transient.path(), &self.credential).await {
            Ok(transcript) => transcript,
            Err(failure) => return Ok(PipelineOutcome::TranscriptionFailed(failure)),
        };

        let prompt = self.build_prompt(&transcript, params);

        let outcome = match self.analysis.run(&prompt, &self.credential).await {
            Ok(analysis) => PipelineOutcome::Analyzed {
                transcript,
                analysis,
            },
            Err(failure) => PipelineOutcome::AnalysisFailed {
                transcript,
                failure,
            },
        };
        Ok(outcome)
    }
}

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Both stages succeeded.
    Analyzed {
        transcript: Transcript,
        analysis: AnalysisResult,
    },
    /// Transcription failed; analysis was not attempted.
    TranscriptionFailed(Failure),
    /// Transcription succeeded but analysis failed. The transcript is kept.
    AnalysisFailed {
        transcript: Transcript,
        failure: Failure,
    },
    /// The upload could not be stored.
    Aborted { message: String },
}

impl PipelineOutcome {
    pub fn transcript(&self) -> Option<&Transcript> {
        match self {
            PipelineOutcome::Analyzed { transcript, .. }
            | PipelineOutcome::AnalysisFailed { transcript, .. } => Some(transcript),
            _ => None,
        }
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match self {
            PipelineOutcome::Analyzed { analysis, .. } => Some(analysis),
            _ => None,
        }
    }

    /// The user-facing error line, if the run did not fully succeed.
    pub fn error_message(&self) -> Option<String> {
        match self {
            PipelineOutcome::Analyzed { .. } => None,
            PipelineOutcome::TranscriptionFailed(failure) => {
                Some(format!("STT 변환 실패: {}", failure))
            }
            PipelineOutcome::AnalysisFailed { failure, .. } => {
                Some(format!("AI 분석 실패: {}", failure))
            }
            PipelineOutcome::Aborted { message } => Some(message.clone()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Analyzed { .. })
    }
}

/// Everything the presentation layer needs to display one run.
///
/// The serialized form also carries `error`, the same status line the
/// result page shows, when the run did not fully succeed.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub upload: UploadSummary,
    pub outcome: PipelineOutcome,
    /// Non-fatal problems, such as a transient file that could not be removed.
    pub warnings: Vec<String>,
}

impl Serialize for PipelineReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Repr<'a> {
            upload: &'a UploadSummary,
            outcome: &'a PipelineOutcome,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<String>,
            warnings: &'a [String],
        }

        Repr {
            upload: &self.upload,
            outcome: &self.outcome,
            error: self.outcome.error_message(),
            warnings: &self.warnings,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::FakeAnalyzer;
    use crate::analysis::{LearningLevel, FIELD_PLACEHOLDER};
    use crate::failure::{FailureKind, Stage};
    use crate::transcription::testing::FakeTranscriber;
    use std::path::Path;
    use std::sync::Mutex;

    const TRANSCRIPT: &str = "오늘은 뉴턴의 운동법칙을 배웠습니다.";

    fn settings_in(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.temp_dir = dir.join("temp_audio").to_string_lossy().to_string();
        settings
    }

    fn orchestrator(
        dir: &Path,
        transcriber: Arc<FakeTranscriber>,
        analyzer: Arc<FakeAnalyzer>,
    ) -> Orchestrator {
        Orchestrator::with_components(
            &settings_in(dir),
            Credential::new("sk-test"),
            transcriber,
            analyzer,
        )
        .unwrap()
    }

    fn scratch_is_empty(dir: &Path) -> bool {
        let scratch = dir.join("temp_audio");
        !scratch.exists() || std::fs::read_dir(scratch).unwrap().next().is_none()
    }

    /// Transcriber hook that remembers the transient path it was given.
    fn recording_hook(seen: Arc<Mutex<Option<PathBuf>>>) -> impl Fn(&Path) + Send + 'static {
        move |path: &Path| {
            assert!(path.exists());
            *seen.lock().unwrap() = Some(path.to_path_buf());
        }
    }

    #[tokio::test]
    async fn test_full_run_builds_prompt_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(None));
        let transcriber =
            Arc::new(FakeTranscriber::returning(TRANSCRIPT).with_hook(recording_hook(seen.clone())));
        let analyzer = Arc::new(FakeAnalyzer::returning("### 💡 핵심 요약"));
        let pipeline = orchestrator(dir.path(), transcriber.clone(), analyzer.clone());

        let upload = AudioUpload::new("lec 1!.mp3", b"audio".to_vec());
        let params = AnalysisParameters::new(LearningLevel::High, "");
        let report = pipeline.process_upload(&upload, &params).await;

        assert!(report.outcome.is_success());
        assert_eq!(report.outcome.transcript().unwrap().as_str(), TRANSCRIPT);
        assert_eq!(report.outcome.analysis().unwrap().markdown, "### 💡 핵심 요약");
        assert!(report.warnings.is_empty());

        assert_eq!(transcriber.calls(), 1);
        let requests = analyzer.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].prompt.contains(TRANSCRIPT));
        assert!(requests[0].prompt.contains("고등학생"));
        assert!(requests[0].prompt.contains(FIELD_PLACEHOLDER));
        assert_eq!(
            requests[0].prompt,
            pipeline.build_prompt(&Transcript::new(TRANSCRIPT), &params)
        );

        let transient = seen.lock().unwrap().clone().unwrap();
        assert!(transient.to_str().unwrap().ends_with("_lec_1_.mp3"));
        assert!(!transient.exists());
        assert!(scratch_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_transcription_failure_skips_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let transcriber = Arc::new(FakeTranscriber::failing(FailureKind::InvalidCredential));
        let analyzer = Arc::new(FakeAnalyzer::returning("unused"));
        let pipeline = orchestrator(dir.path(), transcriber, analyzer.clone());

        let report = pipeline
            .process_upload(
                &AudioUpload::new("lec.mp3", b"audio".to_vec()),
                &AnalysisParameters::default(),
            )
            .await;

        assert_eq!(
            report.outcome,
            PipelineOutcome::TranscriptionFailed(Failure::new(
                Stage::Transcription,
                FailureKind::InvalidCredential
            ))
        );
        assert_eq!(
            report.outcome.error_message().unwrap(),
            "STT 변환 실패: 오류: OpenAI API 키가 유효하지 않습니다 (Whisper). 키를 확인해주세요."
        );
        assert!(analyzer.requests().is_empty());
        assert!(scratch_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_analysis_failure_keeps_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let transcriber = Arc::new(FakeTranscriber::returning(TRANSCRIPT));
        let analyzer = Arc::new(FakeAnalyzer::failing(FailureKind::RateLimited));
        let pipeline = orchestrator(dir.path(), transcriber, analyzer.clone());

        let report = pipeline
            .process_upload(
                &AudioUpload::new("lec.mp3", b"audio".to_vec()),
                &AnalysisParameters::default(),
            )
            .await;

        assert!(matches!(report.outcome, PipelineOutcome::AnalysisFailed { .. }));
        assert_eq!(report.outcome.transcript().unwrap().as_str(), TRANSCRIPT);
        assert!(report.outcome.analysis().is_none());
        assert_eq!(analyzer.requests().len(), 1);
        assert!(scratch_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_any_call() {
        let dir = tempfile::tempdir().unwrap();
        let transcriber = Arc::new(FakeTranscriber::returning(TRANSCRIPT));
        let analyzer = Arc::new(FakeAnalyzer::returning("unused"));
        let pipeline = orchestrator(dir.path(), transcriber.clone(), analyzer.clone())
            .with_credential(Credential::new(""));

        let report = pipeline
            .process_upload(
                &AudioUpload::new("lec.mp3", b"audio".to_vec()),
                &AnalysisParameters::default(),
            )
            .await;

        assert_eq!(
            report.outcome,
            PipelineOutcome::TranscriptionFailed(Failure::new(
                Stage::Transcription,
                FailureKind::MissingCredential
            ))
        );
        assert_eq!(transcriber.calls(), 0);
        assert!(analyzer.requests().is_empty());
        assert!(scratch_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_write_failure_aborts_and_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the scratch directory should be.
        std::fs::write(dir.path().join("temp_audio"), b"not a directory").unwrap();

        let transcriber = Arc::new(FakeTranscriber::returning(TRANSCRIPT));
        let analyzer = Arc::new(FakeAnalyzer::returning("unused"));
        let pipeline = orchestrator(dir.path(), transcriber.clone(), analyzer);

        let report = pipeline
            .process_upload(
                &AudioUpload::new("lec.mp3", b"audio".to_vec()),
                &AnalysisParameters::default(),
            )
            .await;

        match &report.outcome {
            PipelineOutcome::Aborted { message } => {
                assert!(message.starts_with("처리 중 예상치 못한 오류 발생:"))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(report.warnings.is_empty());
        assert_eq!(transcriber.calls(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_failure_is_only_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(None));
        let seen_by_hook = seen.clone();
        // Swap the transient file for a directory so removing it fails.
        let transcriber = Arc::new(FakeTranscriber::returning(TRANSCRIPT).with_hook(
            move |path: &Path| {
                std::fs::remove_file(path).unwrap();
                std::fs::create_dir(path).unwrap();
                *seen_by_hook.lock().unwrap() = Some(path.to_path_buf());
            },
        ));
        let analyzer = Arc::new(FakeAnalyzer::returning("### 결과"));
        let pipeline = orchestrator(dir.path(), transcriber, analyzer);

        let report = pipeline
            .process_upload(
                &AudioUpload::new("lec.mp3", b"audio".to_vec()),
                &AnalysisParameters::default(),
            )
            .await;

        assert!(report.outcome.is_success());
        assert_eq!(report.outcome.analysis().unwrap().markdown, "### 결과");
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("임시 파일 삭제 중 오류 발생:"));

        let path = seen.lock().unwrap().clone().unwrap();
        std::fs::remove_dir(path).unwrap();
    }

    #[tokio::test]
    async fn test_identical_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_hook = seen.clone();
        let transcriber = Arc::new(FakeTranscriber::returning(TRANSCRIPT).with_hook(
            move |path: &Path| seen_by_hook.lock().unwrap().push(path.to_path_buf()),
        ));
        let analyzer = Arc::new(FakeAnalyzer::returning("ok"));
        let pipeline = orchestrator(dir.path(), transcriber, analyzer);

        let upload = AudioUpload::new("same.mp3", b"audio".to_vec());
        let params = AnalysisParameters::default();
        let (a, b) = tokio::join!(
            pipeline.process_upload(&upload, &params),
            pipeline.process_upload(&upload, &params)
        );

        assert!(a.outcome.is_success() && b.outcome.is_success());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_ne!(seen[0], seen[1]);
    }

    #[test]
    fn test_report_serializes_status() {
        let report = PipelineReport {
            upload: AudioUpload::new("lec.mp3", vec![0; 10]).summary(),
            outcome: PipelineOutcome::TranscriptionFailed(Failure::new(
                Stage::Transcription,
                FailureKind::RateLimited,
            )),
            warnings: Vec::new(),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["status"], "transcription_failed");
        assert_eq!(json["outcome"]["stage"], "transcription");
        assert_eq!(json["outcome"]["kind"], "rate_limited");
        assert_eq!(
            json["outcome"]["message"],
            "오류: OpenAI API 요청 한도를 초과했습니다 (Whisper). 잠시 후 다시 시도해주세요."
        );
        assert_eq!(
            json["error"],
            "STT 변환 실패: 오류: OpenAI API 요청 한도를 초과했습니다 (Whisper). 잠시 후 다시 시도해주세요."
        );
        assert_eq!(json["upload"]["size_bytes"], 10);
    }

    #[test]
    fn test_analysis_failure_report_keeps_transcript_and_message() {
        let report = PipelineReport {
            upload: AudioUpload::new("lec.mp3", vec![0; 10]).summary(),
            outcome: PipelineOutcome::AnalysisFailed {
                transcript: Transcript::new("강의 내용"),
                failure: Failure::new(Stage::Analysis, FailureKind::InvalidCredential),
            },
            warnings: Vec::new(),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["status"], "analysis_failed");
        assert_eq!(json["outcome"]["transcript"], "강의 내용");
        assert_eq!(
            json["outcome"]["failure"]["message"],
            "오류: OpenAI API 키가 유효하지 않습니다 (GPT). 키를 확인해주세요."
        );
        assert!(json["error"].as_str().unwrap().starts_with("AI 분석 실패: 오류:"));
    }

    #[test]
    fn test_successful_report_has_no_error() {
        let report = PipelineReport {
            upload: AudioUpload::new("lec.mp3", vec![0; 10]).summary(),
            outcome: PipelineOutcome::Analyzed {
                transcript: Transcript::new("t"),
                analysis: AnalysisResult {
                    markdown: "a".to_string(),
                },
            },
            warnings: Vec::new(),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("error").is_none());
    }
}
