use serde::{Deserialize, Serialize};

use crate::error::CheckerError;

/// The subset of TypeScript compiler options that affects assignability.
///
/// Values are forwarded unchanged to the assignability checker; `strict`
/// only supplies the default for flags that are not set explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    #[serde(default)]
    pub strict: Option<bool>,
    #[serde(default)]
    pub strict_null_checks: Option<bool>,
    #[serde(default)]
    pub strict_function_types: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TsConfig {
    #[serde(default)]
    compiler_options: CompilerOptions,
}

impl CompilerOptions {
    pub fn strict() -> Self {
        Self {
            strict: Some(true),
            ..Default::default()
        }
    }

    /// Reads the `compilerOptions` block of a tsconfig-shaped JSON document.
    /// Unknown options are ignored.
    pub fn from_tsconfig_json(json: &str) -> Result<Self, CheckerError> {
        let config: TsConfig =
            serde_json::from_str(json).map_err(CheckerError::InvalidCompilerOptions)?;
        Ok(config.compiler_options)
    }

    pub fn strict_null_checks_enabled(&self) -> bool {
        self.strict_null_checks
            .unwrap_or_else(|| self.strict.unwrap_or(false))
    }

    pub fn strict_function_types_enabled(&self) -> bool {
        self.strict_function_types
            .unwrap_or_else(|| self.strict.unwrap_or(false))
    }
}
