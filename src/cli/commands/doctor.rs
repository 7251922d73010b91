//! Doctor command - verify configuration and environment.

use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::credential::Credential;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(api_key: Option<&str>, settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Kangui Doctor");
    println!();
    println!("Checking configuration and environment...\n");

    let sections = [
        ("API Configuration", vec![check_credential(api_key, settings)]),
        ("Directories", vec![check_scratch_dir(&settings.temp_dir())]),
        (
            "Configuration",
            vec![check_config_file(config_path), check_prompts(settings)],
        ),
    ];

    let mut errors = 0;
    let mut warnings = 0;
    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
            match check.status {
                CheckStatus::Error => errors += 1,
                CheckStatus::Warning => warnings += 1,
                CheckStatus::Ok => {}
            }
        }
        println!();
    }

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Kangui.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s).",
            warnings
        ));
    } else {
        Output::success("All checks passed! Kangui is ready to use.");
    }

    Ok(())
}

/// Check that an OpenAI key is available from the flag, environment or config.
fn check_credential(api_key: Option<&str>, settings: &Settings) -> CheckResult {
    let hint = "Set with: export OPENAI_API_KEY='sk-...' (or kangui config set openai.api_key sk-...)";

    match Credential::resolve(api_key, settings) {
        Some(credential) => {
            let key = credential.expose();
            if key.starts_with("sk-") && key.chars().count() > 20 {
                let tail: String = key.chars().skip(key.chars().count() - 4).collect();
                CheckResult::ok("OpenAI API key", &format!("configured (sk-...{})", tail))
            } else {
                CheckResult::warning(
                    "OpenAI API key",
                    "set but format looks unusual",
                    "Expected format: sk-... (OpenAI API key)",
                )
            }
        }
        None => CheckResult::error("OpenAI API key", "not set", hint),
    }
}

/// Check that uploads can be stored in the scratch directory.
fn check_scratch_dir(dir: &Path) -> CheckResult {
    let name = "Scratch directory";
    let hint = "Set general.temp_dir to a writable location";

    if let Err(e) = std::fs::create_dir_all(dir) {
        return CheckResult::error(name, &format!("{} ({})", dir.display(), e), hint);
    }

    match tempfile::NamedTempFile::new_in(dir) {
        Ok(_) => CheckResult::ok(name, &format!("{} (writable)", dir.display())),
        Err(e) => CheckResult::error(name, &format!("{} not writable ({})", dir.display(), e), hint),
    }
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: kangui config edit",
        )
    }
}

/// Check that the analysis prompt (default or custom) loads.
fn check_prompts(settings: &Settings) -> CheckResult {
    match Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    ) {
        Ok(_) => match &settings.prompts.custom_dir {
            Some(dir) => CheckResult::ok("Prompts", &format!("custom ({})", dir)),
            None => CheckResult::ok("Prompts", "built-in"),
        },
        Err(e) => CheckResult::error(
            "Prompts",
            &format!("{}", e),
            "Fix or remove analysis.toml in prompts.custom_dir",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_check_credential() {
        let settings = Settings::default();
        assert_eq!(check_credential(None, &settings).status, CheckStatus::Error);
        assert_eq!(check_credential(Some("  "), &settings).status, CheckStatus::Error);
        assert_eq!(check_credential(Some("abc"), &settings).status, CheckStatus::Warning);

        let result = check_credential(Some("sk-abcdefghijklmnopqrstuvwxyz1234"), &settings);
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.message.ends_with("1234)"));
        assert!(!result.message.contains("abcdefgh"));
    }

    #[test]
    fn test_check_scratch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("temp_audio");
        assert_eq!(check_scratch_dir(&scratch).status, CheckStatus::Ok);
        assert!(scratch.is_dir());

        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        assert_eq!(check_scratch_dir(&blocker.join("sub")).status, CheckStatus::Error);
    }

    #[test]
    fn test_check_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(check_config_file(&path).status, CheckStatus::Warning);

        std::fs::write(&path, "").unwrap();
        assert_eq!(check_config_file(&path).status, CheckStatus::Ok);
    }

    #[test]
    fn test_check_prompts_default() {
        assert_eq!(check_prompts(&Settings::default()).status, CheckStatus::Ok);
    }
}
