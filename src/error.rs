use thiserror::Error;

/// Failures that abort checking a file. These indicate a pipeline problem
/// upstream of the checker, so they are never reported as diagnostics.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("Script source file {0} doesn't exist in CompilationCache")]
    NotInCompilationCache(String),

    #[error("Template source {file} for script {script} could not be read")]
    MissingTemplateSource { script: String, file: String },

    #[error("Invalid compilation output for {file}: {source}")]
    InvalidCompilation {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid compiler options: {0}")]
    InvalidCompilerOptions(#[source] serde_json::Error),
}
