//! Configuration loading utilities
//!
//! This module handles loading configuration from files and the environment
//! with proper precedence and validation.

use super::*;
use crate::core::error::{Error, Result};
use std::env;
use std::fs;
use std::path::Path;

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::ConfigurationError(format!("Invalid {}: {}", name, e)))
}

/// Apply `SURVEY_*` environment variables on top of `config`
pub fn apply_env(config: &mut AnalysisConfig) -> Result<()> {
    if let Ok(alpha) = env::var("SURVEY_ALPHA") {
        config.analysis.alpha = parse_env("SURVEY_ALPHA", &alpha)?;
    }

    if let Ok(top_n) = env::var("SURVEY_TOP_N") {
        config.analysis.top_n = parse_env("SURVEY_TOP_N", &top_n)?;
    }

    if let Ok(dir) = env::var("SURVEY_OUTPUT_DIR") {
        config.output.dir = dir.into();
    }

    if let Ok(level) = env::var("SURVEY_LOG_LEVEL") {
        config.logging.level = level;
    }

    Ok(())
}

/// Load configuration from environment variables
pub fn load_from_env() -> Result<AnalysisConfig> {
    let mut config = AnalysisConfig::default();
    apply_env(&mut config)?;
    Ok(config)
}

/// Load configuration from a file (YAML or TOML based on extension)
pub fn load_from_file(path: &Path) -> Result<AnalysisConfig> {
    if !path.exists() {
        return Err(Error::ConfigurationError(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        Error::ConfigurationError(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => load_from_yaml(&contents),
        Some("toml") => load_from_toml(&contents),
        _ => load_from_toml(&contents).or_else(|_| load_from_yaml(&contents)),
    }
}

/// Load configuration from YAML string
pub fn load_from_yaml(yaml: &str) -> Result<AnalysisConfig> {
    serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigurationError(format!("Failed to parse YAML config: {}", e)))
}

/// Load configuration from TOML string
pub fn load_from_toml(toml: &str) -> Result<AnalysisConfig> {
    toml::from_str(toml)
        .map_err(|e| Error::ConfigurationError(format!("Failed to parse TOML config: {}", e)))
}

/// Load configuration with precedence: defaults -> file -> environment
pub fn load_with_precedence<P: AsRef<Path>>(config_file: Option<P>) -> Result<AnalysisConfig> {
    let mut config = AnalysisConfig::default();

    if let Some(file_path) = config_file {
        let file_config = load_from_file(file_path.as_ref())?;
        config.merge(&file_config);
        log::debug!("Loaded configuration from {}", file_path.as_ref().display());
    }

    // Environment has the highest precedence
    apply_env(&mut config)?;

    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: [&str; 4] = [
        "SURVEY_ALPHA",
        "SURVEY_TOP_N",
        "SURVEY_OUTPUT_DIR",
        "SURVEY_LOG_LEVEL",
    ];

    fn clear_env() -> Vec<(String, Option<String>)> {
        ENV_VARS
            .iter()
            .map(|name| {
                let orig = env::var(name).ok();
                env::remove_var(name);
                (name.to_string(), orig)
            })
            .collect()
    }

    fn restore_env(saved: Vec<(String, Option<String>)>) {
        for (name, value) in saved {
            match value {
                Some(v) => env::set_var(&name, v),
                None => env::remove_var(&name),
            }
        }
    }

    #[test]
    fn test_load_from_env() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap();
        let saved = clear_env();

        env::set_var("SURVEY_ALPHA", "0.01");
        env::set_var("SURVEY_TOP_N", "7");
        env::set_var("SURVEY_OUTPUT_DIR", "/tmp/survey-out");
        env::set_var("SURVEY_LOG_LEVEL", "debug");

        let config = load_from_env().unwrap();
        assert_eq!(config.analysis.alpha, 0.01);
        assert_eq!(config.analysis.top_n, 7);
        assert_eq!(config.output.dir, PathBuf::from("/tmp/survey-out"));
        assert_eq!(config.logging.level, "debug");

        restore_env(saved);
    }

    #[test]
    fn test_invalid_env_value() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap();
        let saved = clear_env();

        env::set_var("SURVEY_TOP_N", "many");
        let result = load_from_env();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));

        restore_env(saved);
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
analysis:
  alpha: 0.1
  top_n: 3
  categorical_pairs:
    - [GENERO, CIUDAD_AGENCIA]
output:
  dir: reports
"#;
        let config = load_from_yaml(yaml).unwrap();
        assert_eq!(config.analysis.alpha, 0.1);
        assert_eq!(config.analysis.top_n, 3);
        assert_eq!(
            config.analysis.categorical_pairs,
            vec![("GENERO".to_string(), "CIUDAD_AGENCIA".to_string())]
        );
        // untouched sections keep their defaults
        assert_eq!(config.input.delimiter, ';');
        assert_eq!(config.output.excel_file, "resultados_analisis.xlsx");
    }

    #[test]
    fn test_load_from_toml() {
        let toml = r#"
[analysis]
alpha = 0.01
grouping_columns = ["SEGMENTO"]

[input]
delimiter = ","
"#;
        let config = load_from_toml(toml).unwrap();
        assert_eq!(config.analysis.alpha, 0.01);
        assert_eq!(config.analysis.grouping_columns, vec!["SEGMENTO".to_string()]);
        assert_eq!(config.input.delimiter, ',');
    }

    #[test]
    fn test_missing_file() {
        let result = load_from_file(Path::new("/nonexistent/survey.toml"));
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_precedence() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap();
        let saved = clear_env();

        let dir = tempdir().unwrap();
        let config_path = dir.path().join("survey.yml");
        fs::write(&config_path, "analysis:\n  alpha: 0.1\n  top_n: 9\n").unwrap();

        env::set_var("SURVEY_ALPHA", "0.02");

        let config = load_with_precedence(Some(&config_path)).unwrap();
        // env wins over file, file wins over defaults
        assert_eq!(config.analysis.alpha, 0.02);
        assert_eq!(config.analysis.top_n, 9);

        restore_env(saved);
    }

    #[test]
    fn test_precedence_rejects_invalid_file() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap();
        let saved = clear_env();

        let dir = tempdir().unwrap();
        let config_path = dir.path().join("survey.toml");
        fs::write(&config_path, "[analysis]\nalpha = 1.5\n").unwrap();

        let result = load_with_precedence(Some(&config_path));
        assert!(matches!(result, Err(Error::ConfigurationError(_))));

        restore_env(saved);
    }
}
