//! Error type for fallible library operations (loading, parsing, config).
//!
//! Geometry problems are never errors: the mapping and layout code clamps to
//! a safe default and logs a warning instead.

/// Errors produced by GenomeShader core
#[derive(Debug, thiserror::Error)]
pub enum GenomeShaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid locus '{locus}': {message}")]
    InvalidLocus { locus: String, message: String },

    #[error("Invalid variant data in {source_name}: {message}")]
    InvalidData { source_name: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GenomeShaderError {
    pub fn invalid_locus<S: Into<String>, M: Into<String>>(locus: S, message: M) -> Self {
        Self::InvalidLocus {
            locus: locus.into(),
            message: message.into(),
        }
    }

    pub fn invalid_data<S: Into<String>, M: Into<String>>(source_name: S, message: M) -> Self {
        Self::InvalidData {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }
}

pub type Result<T> = std::result::Result<T, GenomeShaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = GenomeShaderError::invalid_locus("chr1:abc", "start is not a number");
        assert_eq!(err.to_string(), "Invalid locus 'chr1:abc': start is not a number");

        let err = GenomeShaderError::invalid_data("variants.json", "duplicate id 4");
        assert!(err.to_string().contains("variants.json"));
    }

    #[test]
    fn io_errors_convert() {
        fn open() -> Result<()> {
            std::fs::File::open("/definitely/not/here.json")?;
            Ok(())
        }
        assert!(matches!(open(), Err(GenomeShaderError::Io(_))));
    }
}
