//! Error handling for the GenomeShader CLI

use genomeshader_core::GenomeShaderError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid variant data in {source_name}: {message}")]
    InvalidData { source_name: String, message: String },

    #[error("Invalid locus '{locus}': {message}")]
    InvalidLocus { locus: String, message: String },

    #[error("Invalid argument {argument}: {message}")]
    InvalidArgument { argument: String, message: String },

    #[error("Variant {id} is not in the loaded track")]
    UnknownVariant { id: u64 },

    #[error("Rendering error: {message}")]
    Rendering { message: String },
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn invalid_argument<A: Into<String>, M: Into<String>>(argument: A, message: M) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }

    pub fn rendering<S: Into<String>>(message: S) -> Self {
        Self::Rendering { message: message.into() }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        Self::config(format!("TOML serialization error: {}", err))
    }
}

impl From<GenomeShaderError> for CliError {
    fn from(err: GenomeShaderError) -> Self {
        match err {
            GenomeShaderError::Io(e) => Self::io(e.to_string()),
            GenomeShaderError::Json(e) => Self::InvalidData {
                source_name: "input".to_string(),
                message: e.to_string(),
            },
            GenomeShaderError::InvalidData { source_name, message } => Self::InvalidData { source_name, message },
            GenomeShaderError::InvalidLocus { locus, message } => Self::InvalidLocus { locus, message },
            GenomeShaderError::Config(message) => Self::Config { message },
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Ensure you have read permissions for the file\n\
                 • Compressed payloads must end in .gz",
                path.display()
            ));
        }

        CliError::InvalidData { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Variants are JSON with camelCase keys (id, position, refAllele, altAlleles, sampleGenotypes)\n\
                 • Either a bare array or {\"variants\": [...], \"insertions\": [...]}\n\
                 • Variant ids must be unique and the insertion table sorted by position",
            );
        }

        CliError::InvalidLocus { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Use chr:start-end (e.g. chr6:31,972,046-32,055,647) or chr:pos\n\
                 • End must be greater than start",
            );
        }

        CliError::UnknownVariant { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Run 'genomeshader transitions' with ids from the input file\n\
                 • Check that the locus covers the variant",
            );
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your genomeshader.toml configuration file\n\
                 • Use 'genomeshader config --example' to generate a sample configuration\n\
                 • Verify that all configuration values are valid",
            );
        }

        _ => {}
    }

    message
}

/// Print error with helpful suggestions and exit
pub fn print_error_and_exit(error: &CliError) -> ! {
    eprintln!("Error: {}", format_error_with_suggestions(error));
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CliError::config("test message");
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_error_suggestions() {
        let err = CliError::file_not_found(PathBuf::from("variants.json"));
        let formatted = format_error_with_suggestions(&err);
        assert!(formatted.contains("Suggestions:"));
        assert!(formatted.contains("Check that the file path is correct"));
    }

    #[test]
    fn test_core_error_conversion() {
        let core = GenomeShaderError::invalid_locus("chr1:9-1", "end must be greater than start");
        let cli: CliError = core.into();
        assert!(matches!(cli, CliError::InvalidLocus { .. }));
        assert!(format_error_with_suggestions(&cli).contains("chr:start-end"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(matches!(cli_err, CliError::Io { .. }));
    }
}
