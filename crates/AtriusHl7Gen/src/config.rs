use proc_macro2::TokenStream;
use quote::ToTokens;

use crate::error::{GeneratorError, GeneratorResult};

/// Options that shape the emitted source without changing what it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Path under which generated code reaches the runtime crate.
    ///
    /// `crate` when the output is compiled inside `atrius-hl7-lib` itself (the build script
    /// case), `atrius_hl7_lib` when it is written into a downstream crate.
    pub runtime_path: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            runtime_path: "crate".to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn with_runtime_path(mut self, path: impl Into<String>) -> Self {
        self.runtime_path = path.into();
        self
    }

    pub(crate) fn runtime_tokens(&self) -> GeneratorResult<TokenStream> {
        let path: syn::Path = syn::parse_str(&self.runtime_path)
            .map_err(|_| GeneratorError::InvalidRuntimePath(self.runtime_path.clone()))?;
        Ok(path.to_token_stream())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_path_parsing() {
        let config = GeneratorConfig::default();
        assert_eq!(config.runtime_tokens().unwrap().to_string(), "crate");

        let config = GeneratorConfig::default().with_runtime_path("::atrius_hl7_lib");
        let tokens = config.runtime_tokens().unwrap().to_string();
        assert!(tokens.ends_with("atrius_hl7_lib"));

        let config = GeneratorConfig::default().with_runtime_path("not a path");
        assert!(matches!(
            config.runtime_tokens(),
            Err(GeneratorError::InvalidRuntimePath(_))
        ));
    }
}
