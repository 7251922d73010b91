//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings, config_path: PathBuf) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings.redacted())
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let updated = set_value(&settings, key, value)?;
            updated.save_to(&config_path)?;
            Output::success(&format!("Set {} in {}", key, config_path.display()));
        }

        ConfigAction::Edit => {
            if !config_path.exists() {
                settings.save_to(&config_path)?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor)
                .arg(&config_path)
                .status();

            match status {
                Ok(s) if s.success() => {
                    Output::success("Config saved.");
                }
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Apply `section.key = value` to a copy of the settings.
///
/// Numbers and booleans are parsed, anything else is taken as a string.
/// The result must still deserialize.
fn set_value(settings: &Settings, key: &str, value: &str) -> Result<Settings> {
    let (section, field) = key
        .split_once('.')
        .with_context(|| format!("Key must look like 'section.field', got '{}'", key))?;

    let mut doc = toml::Value::try_from(settings)?;
    let table = doc
        .get_mut(section)
        .and_then(|v| v.as_table_mut())
        .with_context(|| format!("Unknown config section '{}'", section))?;

    let parsed = parse_scalar(value);

    match table.get(field) {
        Some(existing) if existing.is_str() => {
            table.insert(field.to_string(), toml::Value::String(value.to_string()));
        }
        Some(_) => {
            table.insert(field.to_string(), parsed);
        }
        // Unset optional keys are absent from the serialized table.
        None if matches!((section, field), ("openai", "api_key") | ("prompts", "custom_dir")) => {
            table.insert(field.to_string(), toml::Value::String(value.to_string()));
        }
        None => anyhow::bail!("Unknown config key '{}'", key),
    }

    doc.try_into::<Settings>()
        .with_context(|| format!("Invalid value for {}: {}", key, value))
}

fn parse_scalar(value: &str) -> toml::Value {
    if let Ok(i) = value.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = value.parse::<f64>() {
        toml::Value::Float(f)
    } else if let Ok(b) = value.parse::<bool>() {
        toml::Value::Boolean(b)
    } else {
        toml::Value::String(value.to_string())
    }
}
