//! HTML rendering for the upload form and the result page.

use crate::analysis::LearningLevel;
use crate::orchestrator::PipelineReport;
use crate::upload::SUPPORTED_EXTENSIONS;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use std::fmt::Write;

const TITLE: &str = "🎓 강의 분석 AI 도우미 (OpenAI Whisper & GPT)";

const STYLE: &str = r#"
body { font-family: sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; line-height: 1.6; }
.error { background: #fdecea; border-left: 4px solid #e53935; padding: .75rem 1rem; }
.warning { background: #fff8e1; border-left: 4px solid #ffb300; padding: .75rem 1rem; }
.success { background: #e8f5e9; border-left: 4px solid #43a047; padding: .75rem 1rem; }
.info { background: #e3f2fd; border-left: 4px solid #1e88e5; padding: .75rem 1rem; }
pre.transcript { white-space: pre-wrap; background: #f5f5f5; padding: 1rem; }
label { display: block; margin-top: 1rem; font-weight: bold; }
button { margin-top: 1.5rem; width: 100%; padding: .75rem; font-size: 1rem; }
"#;

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// URL schemes allowed in rendered links and images.
const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Whether a link destination may be emitted as is.
///
/// Relative links and fragments have no scheme and are kept.
fn is_safe_url(url: &str) -> bool {
    let trimmed = url.trim_start();
    match trimmed.find(|c: char| matches!(c, ':' | '/' | '?' | '#')) {
        Some(pos) if trimmed[pos..].starts_with(':') => {
            let scheme = trimmed[..pos].to_ascii_lowercase();
            SAFE_SCHEMES.contains(&scheme.as_str())
        }
        _ => true,
    }
}

fn neutralize_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) {
        url
    } else {
        CowStr::Borrowed("#")
    }
}

/// Render model output as HTML.
///
/// Raw HTML in the input is shown as text, and link or image destinations
/// with a scheme other than http, https or mailto become `#`.
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: neutralize_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: neutralize_url(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"ko\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>강의 분석 AI 도우미</title>\n<style>{}</style>\n</head>\n<body>\n\
         <h1>{}</h1>\n{}\n</body>\n</html>\n",
        STYLE, TITLE, body
    )
}

/// The upload form. The key field is shown only when the server has none.
pub fn render_index(has_credential: bool) -> String {
    let accept: Vec<String> = SUPPORTED_EXTENSIONS.iter().map(|e| format!(".{}", e)).collect();

    let mut options = String::new();
    for level in LearningLevel::ALL {
        let selected = if level == LearningLevel::default() { " selected" } else { "" };
        let _ = writeln!(
            options,
            "<option value=\"{}\"{}>{}</option>",
            level.slug(),
            selected,
            level.label()
        );
    }

    let key_field = if has_credential {
        String::new()
    } else {
        "<p class=\"info\">서버에 OpenAI API 키가 설정되어 있지 않습니다. 아래에 키를 입력하면 이번 요청에만 사용됩니다.</p>\n\
         <label for=\"api_key\">OpenAI API 키 (sk-...)</label>\n\
         <input type=\"password\" id=\"api_key\" name=\"api_key\" autocomplete=\"off\">\n"
            .to_string()
    };

    let body = format!(
        "<p>음성 파일을 업로드하면 OpenAI가 내용을 분석하고 학습 자료를 만들어줍니다.</p>\n<hr>\n\
         <form method=\"post\" action=\"/analyze\" enctype=\"multipart/form-data\">\n\
         <h2>1. 음성 파일 업로드</h2>\n\
         <label for=\"audio\">분석할 음성 파일을 올려주세요 ({})</label>\n\
         <input type=\"file\" id=\"audio\" name=\"audio\" accept=\"{}\">\n\
         {}\
         <h2>2. 분석 옵션 설정</h2>\n\
         <label for=\"level\">대상 학습 수준</label>\n\
         <select id=\"level\" name=\"level\">\n{}</select>\n\
         <label for=\"field\">강의 분야</label>\n\
         <input type=\"text\" id=\"field\" name=\"field\" placeholder=\"예: 파이썬 머신러닝\">\n\
         <hr>\n<button type=\"submit\">✨ AI 분석 시작하기</button>\n</form>",
        SUPPORTED_EXTENSIONS.join(", "),
        accept.join(","),
        key_field,
        options
    );

    layout(&body)
}

/// The result page for one pipeline run.
pub fn render_report(report: &PipelineReport) -> String {
    let mut body = String::new();

    let _ = writeln!(body, "<p>{}</p>", escape_html(&report.upload.status_line()));

    if let Some(transcript) = report.outcome.transcript() {
        let _ = writeln!(body, "<p class=\"success\">✅ 텍스트 변환 완료!</p>");
        let _ = writeln!(
            body,
            "<details>\n<summary>📝 음성 변환 결과 보기 (클릭)</summary>\n<pre class=\"transcript\">{}</pre>\n</details>\n<hr>",
            escape_html(transcript.as_str())
        );
    }

    if let Some(analysis) = report.outcome.analysis() {
        let _ = writeln!(body, "<p class=\"success\">✅ AI 분석 및 학습 자료 생성 완료!</p>");
        let _ = writeln!(
            body,
            "<h2>📊 AI 분석 결과</h2>\n<div class=\"analysis\">\n{}</div>",
            markdown_to_html(&analysis.markdown)
        );
    }

    if let Some(message) = report.outcome.error_message() {
        let _ = writeln!(body, "<p class=\"error\">{}</p>", escape_html(&message));
    }

    for warning in &report.warnings {
        let _ = writeln!(body, "<p class=\"warning\">{}</p>", escape_html(warning));
    }

    body.push_str("<p><a href=\"/\">← 다른 파일 분석하기</a></p>");
    layout(&body)
}

/// A page carrying a single message, for requests rejected before the pipeline.
pub fn render_error(message: &str) -> String {
    layout(&format!(
        "<p class=\"warning\">{}</p>\n<p><a href=\"/\">← 돌아가기</a></p>",
        escape_html(message)
    ))
}
