//! Configuration validation utilities

use super::*;
use crate::core::error::{Error, Result};

/// Validate the entire configuration
pub fn validate_config(config: &AnalysisConfig) -> Result<()> {
    validate_analysis(&config.analysis)?;
    validate_input(&config.input)?;
    validate_output(&config.output)?;
    validate_plot(&config.plot)?;
    Ok(())
}

fn check_probability(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(Error::ConfigurationError(format!(
            "{} must be between 0 and 1 (exclusive), got {}",
            name, value
        )))
    }
}

/// Validate statistical parameters
pub fn validate_analysis(config: &AnalysisSettings) -> Result<()> {
    check_probability("alpha", config.alpha)?;
    check_probability("target_power", config.target_power)?;

    if config.top_n == 0 {
        return Err(Error::ConfigurationError(
            "top_n must be greater than 0".to_string(),
        ));
    }

    if config.exact_threshold == 0 {
        return Err(Error::ConfigurationError(
            "exact_threshold must be greater than 0".to_string(),
        ));
    }

    for inference in &config.inference {
        if inference.group_a == inference.group_b {
            return Err(Error::ConfigurationError(format!(
                "Inference on '{}' compares group '{}' with itself",
                inference.target, inference.group_a
            )));
        }
    }

    Ok(())
}

/// Validate input parsing settings
pub fn validate_input(config: &InputSettings) -> Result<()> {
    if config.delimiter == config.decimal {
        return Err(Error::ConfigurationError(format!(
            "Delimiter and decimal separator must differ, both are '{}'",
            config.delimiter
        )));
    }

    if !config.delimiter.is_ascii() {
        return Err(Error::ConfigurationError(format!(
            "Delimiter must be a single ASCII character, got '{}'",
            config.delimiter
        )));
    }

    if config.date_format.trim().is_empty() {
        return Err(Error::ConfigurationError(
            "date_format cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validate export destinations
pub fn validate_output(config: &OutputSettings) -> Result<()> {
    if config.dir.as_os_str().is_empty() {
        return Err(Error::ConfigurationError(
            "Output directory cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("excel_file", &config.excel_file),
        ("pdf_file", &config.pdf_file),
        ("png_dir", &config.png_dir),
        ("json_dir", &config.json_dir),
    ] {
        if value.trim().is_empty() {
            return Err(Error::ConfigurationError(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

fn validate_plot(config: &PlotDefaults) -> Result<()> {
    if config.width < 100 || config.height < 100 {
        return Err(Error::ConfigurationError(format!(
            "Plot size {}x{} is too small",
            config.width, config.height
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_defaults() {
        assert!(validate_config(&AnalysisConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_alpha() {
        let mut config = AnalysisConfig::default();
        config.analysis.alpha = 0.0;
        assert!(validate_config(&config).is_err());
        config.analysis.alpha = 1.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_top_n() {
        let mut config = AnalysisConfig::default();
        config.analysis.top_n = 0;
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_delimiter_equal_to_decimal() {
        let mut config = AnalysisConfig::default();
        config.input.delimiter = ',';
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_output_file() {
        let mut config = AnalysisConfig::default();
        config.output.pdf_file = " ".to_string();
        assert!(validate_config(&config).is_err());
    }
}
