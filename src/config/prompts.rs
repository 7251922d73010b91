//! Prompt templates for Kangui.
//!
//! Prompts can be customized by placing an `analysis.toml` file in the custom
//! prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub analysis: AnalysisPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for lecture analysis.
///
/// The user template receives `{{field}}`, `{{level}}` and `{{transcript}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnalysisPrompts {
    fn default() -> Self {
        Self {
            system: "You are a helpful assistant skilled in analyzing lecture transcripts and generating educational content based on Korean user requests. Always respond in Korean.".to_string(),

            user: r#"당신은 한국어로 소통하는 매우 유능한 교육 콘텐츠 전문가입니다. 주어진 강의 내용을 바탕으로 다음 요청사항을 명확하고 상세하게, 지정된 학습 수준에 맞춰 한국어로 작성해주세요.

**강의 정보:**
* **강의 분야:** {{field}}
* **대상 학습 수준:** {{level}}

**원본 강의 텍스트:**
```
{{transcript}}
```

**요청 사항:**

1.  **핵심 요약 (200자 내외):** 강의의 가장 중요한 내용을 {{level}} 수준에 맞춰 간결하게 요약해주세요. 핵심 메시지가 잘 드러나야 합니다.

2.  **주요 개념 정리 (3가지):** 강의에서 등장한 핵심 개념이나 용어 3가지를 선정하여, 각각 {{level}} 학생이 이해하기 쉽도록 명확하고 친절하게 설명해주세요. 필요하다면 예시를 들어주세요.

3.  **복습 퀴즈 (객관식 3문제):** 강의 내용을 잘 이해했는지 확인할 수 있는 객관식 문제 3개를 만들어주세요. 각 문제에는 4개의 보기와 정답 표시가 있어야 하며, {{level}} 수준에 적합해야 합니다.

**출력 형식:**
결과는 아래와 같이 명확한 제목과 함께 Markdown 형식을 사용하여 가독성 좋게 작성해주세요.

---
### 💡 핵심 요약
[여기에 요약 내용 작성]

---
### 🔑 주요 개념 정리
**1. [개념1]:** [개념1 설명]
**2. [개념2]:** [개념2 설명]
**3. [개념3]:** [개념3 설명]

---
### ❓ 복습 퀴즈
**문제 1:** [문제 내용]
(1) [보기1] (2) [보기2] (3) [보기3] (4) [보기4]
**정답:** (번호)

**문제 2:** [문제 내용]
(1) [보기1] (2) [보기2] (3) [보기3] (4) [보기4]
**정답:** (번호)

**문제 3:** [문제 내용]
(1) [보기1] (2) [보기2] (3) [보기3] (4) [보기4]
**정답:** (번호)
---
"#
            .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let analysis_path = custom_path.join("analysis.toml");
            if analysis_path.exists() {
                let content = std::fs::read_to_string(&analysis_path)?;
                prompts.analysis = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is a single pass over the template, so `{{...}}` text
    /// inside a substituted value (a transcript, say) is left alone.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = &after[..end];
                    match vars.get(key) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(key);
                            result.push_str("}}");
                        }
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
