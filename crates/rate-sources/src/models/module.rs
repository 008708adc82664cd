use serde::{Deserialize, Serialize};

/// Identity of a registered rate source adapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceModuleDefinition {
    /// Upper-case source code, unique within a registry
    pub code: String,

    /// Human readable provider name
    pub display_name: String,

    /// Currency the provider quotes all rates against
    pub default_reference_currency: String,
}

impl SourceModuleDefinition {
    pub fn new(code: &str, display_name: &str, default_reference_currency: &str) -> Self {
        Self {
            code: code.trim().to_uppercase(),
            display_name: display_name.to_string(),
            default_reference_currency: default_reference_currency.trim().to_uppercase(),
        }
    }

    /// Returns this definition with its code normalized.
    pub fn normalized(&self) -> Self {
        Self {
            code: self.code.trim().to_uppercase(),
            ..self.clone()
        }
    }
}

/// Normalize a source code: trimmed and upper-cased, `None` when blank.
pub fn normalize_code(code: Option<&str>) -> Option<String> {
    code.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(Some(" ecb ")), Some("ECB".to_string()));
        assert_eq!(normalize_code(Some("Mnb")), Some("MNB".to_string()));
        assert_eq!(normalize_code(Some("   ")), None);
        assert_eq!(normalize_code(None), None);
    }

    #[test]
    fn test_definition_normalizes() {
        let module = SourceModuleDefinition::new("ecb", "European Central Bank", "eur");
        assert_eq!(module.code, "ECB");
        assert_eq!(module.default_reference_currency, "EUR");
    }
}
