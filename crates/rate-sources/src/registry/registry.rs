//! Registry of rate source adapters keyed by normalized source code.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info};

use crate::errors::RegistryError;
use crate::models::{normalize_code, SourceModuleDefinition};
use crate::provider::mnb::MNB_CODE;
use crate::provider::RateSource;

/// Source used when a schedule entry or import request names none
pub const DEFAULT_SOURCE_CODE: &str = MNB_CODE;

/// Immutable index of the registered rate sources.
///
/// Built once at startup. Codes are compared case-insensitively.
pub struct SourceRegistry {
    sources: BTreeMap<String, Arc<dyn RateSource>>,
    default_code: String,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("default_code", &self.default_code)
            .finish()
    }
}

impl SourceRegistry {
    /// Index `sources` by code.
    ///
    /// Fails with [`RegistryError::DuplicateSource`] naming every code that
    /// was registered more than once. The default source is
    /// [`DEFAULT_SOURCE_CODE`].
    pub fn register(sources: Vec<Arc<dyn RateSource>>) -> Result<Self, RegistryError> {
        let mut index: BTreeMap<String, Arc<dyn RateSource>> = BTreeMap::new();
        let mut duplicates = Vec::new();

        for source in sources {
            let code = source.module().normalized().code;
            if index.contains_key(&code) {
                if !duplicates.contains(&code) {
                    duplicates.push(code);
                }
                continue;
            }
            debug!("Registered rate source '{}'", code);
            index.insert(code, source);
        }

        if !duplicates.is_empty() {
            duplicates.sort();
            return Err(RegistryError::DuplicateSource { codes: duplicates });
        }

        info!(
            "Source registry initialized with {} source(s): {}",
            index.len(),
            index.keys().cloned().collect::<Vec<_>>().join(", ")
        );

        Ok(Self {
            sources: index,
            default_code: DEFAULT_SOURCE_CODE.to_string(),
        })
    }

    /// Replace the default source. The code must be registered.
    pub fn with_default(mut self, code: &str) -> Result<Self, RegistryError> {
        let code = normalize_code(Some(code))
            .ok_or_else(|| RegistryError::UnknownSource(code.to_string()))?;
        if !self.sources.contains_key(&code) {
            return Err(RegistryError::UnknownSource(code));
        }
        self.default_code = code;
        Ok(self)
    }

    pub fn default_code(&self) -> &str {
        &self.default_code
    }

    /// Normalize `code`, falling back to the default when blank or absent.
    ///
    /// Does not check that the code is registered.
    pub fn effective_code(&self, code: Option<&str>) -> String {
        normalize_code(code).unwrap_or_else(|| self.default_code.clone())
    }

    /// The adapter for `code`, or the default adapter when `code` is blank.
    pub fn resolve(&self, code: Option<&str>) -> Result<Arc<dyn RateSource>, RegistryError> {
        let code = self.effective_code(code);
        self.sources
            .get(&code)
            .cloned()
            .ok_or(RegistryError::UnknownSource(code))
    }

    pub fn contains(&self, code: &str) -> bool {
        normalize_code(Some(code))
            .map(|c| self.sources.contains_key(&c))
            .unwrap_or(false)
    }

    /// Module definitions of every registered source, sorted by code.
    pub fn list_modules(&self) -> Vec<SourceModuleDefinition> {
        self.sources
            .values()
            .map(|source| source.module().normalized())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceError;
    use crate::models::{NormalizedRate, RateRequest};
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct MockSource {
        module: SourceModuleDefinition,
    }

    impl MockSource {
        fn new(code: &str, reference: &str) -> Arc<dyn RateSource> {
            // Bypass normalization to exercise the registry's own handling
            Arc::new(Self {
                module: SourceModuleDefinition {
                    code: code.to_string(),
                    display_name: format!("{} bank", code),
                    default_reference_currency: reference.to_string(),
                },
            })
        }
    }

    #[async_trait]
    impl RateSource for MockSource {
        fn module(&self) -> &SourceModuleDefinition {
            &self.module
        }

        async fn fetch_rates(
            &self,
            _request: &RateRequest,
            _cancel: &CancellationToken,
        ) -> Result<Vec<NormalizedRate>, SourceError> {
            Ok(Vec::new())
        }
    }

    fn registry() -> SourceRegistry {
        SourceRegistry::register(vec![
            MockSource::new("ECB", "EUR"),
            MockSource::new("MNB", "HUF"),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = registry();
        assert_eq!(registry.resolve(Some("ecb")).unwrap().code(), "ECB");
        assert_eq!(registry.resolve(Some(" Mnb ")).unwrap().code(), "MNB");
    }

    #[test]
    fn test_blank_code_resolves_default() {
        let registry = registry();
        assert_eq!(registry.default_code(), "MNB");
        assert_eq!(registry.resolve(None).unwrap().code(), "MNB");
        assert_eq!(registry.resolve(Some("  ")).unwrap().code(), "MNB");
    }

    #[test]
    fn test_unknown_source() {
        let err = registry().resolve(Some("fed")).err().unwrap();
        assert_eq!(err, RegistryError::UnknownSource("FED".to_string()));
        assert_eq!(err.to_string(), "Rate source 'FED' is not supported");
    }

    #[test]
    fn test_duplicate_codes_rejected() {
        let result = SourceRegistry::register(vec![
            MockSource::new("ecb", "EUR"),
            MockSource::new("MNB", "HUF"),
            MockSource::new("ECB ", "EUR"),
            MockSource::new("Ecb", "EUR"),
        ]);

        match result {
            Err(RegistryError::DuplicateSource { codes }) => assert_eq!(codes, vec!["ECB"]),
            _ => panic!("expected duplicate source error"),
        }
    }

    #[test]
    fn test_list_modules_sorted_and_normalized() {
        let registry = SourceRegistry::register(vec![
            MockSource::new("mnb", "HUF"),
            MockSource::new("ECB", "EUR"),
        ])
        .unwrap();

        let codes: Vec<_> = registry
            .list_modules()
            .into_iter()
            .map(|m| m.code)
            .collect();
        assert_eq!(codes, vec!["ECB", "MNB"]);
    }

    #[test]
    fn test_with_default() {
        let registry = registry().with_default("ecb").unwrap();
        assert_eq!(registry.resolve(None).unwrap().code(), "ECB");

        let err = SourceRegistry::register(vec![MockSource::new("ECB", "EUR")])
            .unwrap()
            .with_default("boe")
            .err()
            .unwrap();
        assert_eq!(err, RegistryError::UnknownSource("BOE".to_string()));
    }

    #[test]
    fn test_contains_and_effective_code() {
        let registry = registry();
        assert!(registry.contains("mnb"));
        assert!(!registry.contains(""));
        assert_eq!(registry.effective_code(None), "MNB");
        assert_eq!(registry.effective_code(Some("ecb")), "ECB");
        assert_eq!(registry.len(), 2);
    }
}
