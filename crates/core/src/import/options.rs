use fxbridge_rate_sources::SourceRegistry;
use serde::Serialize;

/// Allowed gateway environments and the fallback used for one-shot imports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvironmentPolicy {
    /// Allowed environments; empty allows any
    pub available: Vec<String>,
    pub default_environment: String,
}

impl EnvironmentPolicy {
    pub fn new(available: Vec<String>, default_environment: impl Into<String>) -> Self {
        Self {
            available,
            default_environment: default_environment.into(),
        }
    }

    /// The requested environment if allowed, otherwise the default.
    ///
    /// The allowed list's spelling is returned for a case-insensitive match.
    pub fn resolve(&self, requested: Option<&str>) -> String {
        let selected = requested
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(self.default_environment.as_str());

        if self.available.is_empty() {
            return selected.to_string();
        }

        self.available
            .iter()
            .find(|allowed| allowed.eq_ignore_ascii_case(selected))
            .cloned()
            .unwrap_or_else(|| self.default_environment.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOption {
    pub code: String,
    pub display_name: String,
}

/// Choices offered to a one-shot import caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    pub default_environment: String,
    pub available_environments: Vec<String>,
    pub default_source: String,
    pub available_sources: Vec<SourceOption>,
}

impl ImportOptions {
    /// The default source is the registry default when registered, else the
    /// first module by code.
    pub fn build(environments: &EnvironmentPolicy, registry: &SourceRegistry) -> Self {
        let available_sources: Vec<SourceOption> = registry
            .list_modules()
            .into_iter()
            .map(|module| SourceOption {
                code: module.code,
                display_name: module.display_name,
            })
            .collect();

        let default_source = available_sources
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(registry.default_code()))
            .or_else(|| available_sources.first())
            .map(|s| s.code.clone())
            .unwrap_or_else(|| registry.default_code().to_string());

        Self {
            default_environment: environments.default_environment.clone(),
            available_environments: environments.available.clone(),
            default_source,
            available_sources,
        }
    }
}
