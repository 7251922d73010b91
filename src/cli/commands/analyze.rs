//! Analyze command implementation.

use crate::analysis::{AnalysisParameters, LearningLevel};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, PipelineOutcome, PipelineReport};
use crate::upload::AudioUpload;
use anyhow::Result;
use std::path::Path;

/// Run the analyze command.
pub async fn run_analyze(
    file: &str,
    level: LearningLevel,
    field: &str,
    output: Option<&str>,
    api_key: Option<&str>,
    settings: &Settings,
) -> Result<()> {
    let credential = match preflight::check(Operation::Analyze, api_key, settings) {
        Ok(Some(credential)) => credential,
        Ok(None) => anyhow::bail!("OpenAI API key not set"),
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'kangui doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let upload = AudioUpload::from_path(Path::new(&shellexpand::tilde(file).to_string())).await?;
    upload.ensure_supported()?;

    let params = AnalysisParameters::new(level, field);
    let orchestrator = Orchestrator::new(settings, credential)?;

    Output::info(&upload.summary().status_line());
    Output::kv("학습 수준", level.label());
    Output::kv("강의 분야", params.field_or_placeholder());

    let spinner = Output::spinner("음성 변환 및 AI 분석 중...");
    let report = orchestrator.process_upload(&upload, &params).await;
    spinner.finish_and_clear();

    print_report(&report);

    if let (Some(path), Some(analysis)) = (output, report.outcome.analysis()) {
        let path = shellexpand::tilde(path).to_string();
        std::fs::write(&path, &analysis.markdown)?;
        Output::success(&format!("분석 결과 저장: {}", path));
    }

    exit_status(&report.outcome)
}

/// Short error for the process exit. The full status line was already printed.
fn exit_status(outcome: &PipelineOutcome) -> Result<()> {
    let stage = match outcome {
        PipelineOutcome::Analyzed { .. } => return Ok(()),
        PipelineOutcome::TranscriptionFailed(_) => "transcription",
        PipelineOutcome::AnalysisFailed { .. } => "analysis",
        PipelineOutcome::Aborted { .. } => "storing the upload",
    };
    anyhow::bail!("lecture analysis failed during {}", stage)
}

fn print_report(report: &PipelineReport) {
    if let Some(transcript) = report.outcome.transcript() {
        Output::success("✅ 텍스트 변환 완료!");
        Output::header("📝 음성 변환 결과");
        Output::block(transcript.as_str());
    }

    if let PipelineOutcome::Analyzed { analysis, .. } = &report.outcome {
        Output::success("✅ AI 분석 및 학습 자료 생성 완료!");
        Output::header("📊 AI 분석 결과");
        println!();
        println!("{}", analysis.markdown);
    } else if let Some(message) = report.outcome.error_message() {
        Output::error(&message);
    }

    for warning in &report.warnings {
        Output::warning(warning);
    }
}
