use crate::errors::{EditorError, EditorResult};
use querybar_document::{FieldDefinition, FieldRegistry, FreeTextMode};
use querybar_validation::{RuleRegistry, RuleSpec};
use serde::{Deserialize, Serialize};

/// Editor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Fields that filter tokens can refer to
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub free_text_mode: FreeTextMode,

    /// Separates key, operator and value; fixed for the editor's lifetime
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Quiet period before typed free text is tokenized
    #[serde(default = "default_tokenize_debounce_ms")]
    pub tokenize_debounce_ms: u64,

    /// Maximum undo levels (0 = unlimited)
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

fn default_delimiter() -> String {
    ":".to_string()
}

fn default_tokenize_debounce_ms() -> u64 {
    50
}

fn default_history_depth() -> usize {
    100
}

impl EditorConfig {
    pub fn from_json(json: &str) -> EditorResult<Self> {
        let config: EditorConfig = serde_json::from_str(json)?;
        config.delimiter_char()?;
        Ok(config)
    }

    pub fn with_fields(mut self, fields: Vec<FieldDefinition>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_rules(mut self, rules: Vec<RuleSpec>) -> Self {
        self.validation.rules = rules;
        self
    }

    pub fn with_free_text_mode(mut self, mode: FreeTextMode) -> Self {
        self.free_text_mode = mode;
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// The delimiter must be exactly one character that the lexer does not
    /// treat specially.
    pub fn delimiter_char(&self) -> EditorResult<char> {
        let mut chars = self.delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_whitespace() && c != '"' && c != '\\' => Ok(c),
            _ => Err(EditorError::InvalidDelimiter(self.delimiter.clone())),
        }
    }

    pub fn field_registry(&self) -> FieldRegistry {
        FieldRegistry::new(self.fields.clone())
    }

    pub fn build_rules(&self) -> EditorResult<RuleRegistry> {
        Ok(RuleRegistry::from_specs(&self.validation.rules)?)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            validation: ValidationConfig::default(),
            free_text_mode: FreeTextMode::default(),
            delimiter: default_delimiter(),
            tokenize_debounce_ms: default_tokenize_debounce_ms(),
            history_depth: default_history_depth(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querybar_document::FieldType;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "fields": [
                { "key": "status", "label": "Status", "type": "enum",
                  "operators": ["is", "not"], "enumValues": ["open", "closed"] },
                { "key": "owner", "label": "Owner", "immutable": true,
                  "validation": { "unique": false } }
            ],
            "validation": { "rules": [ { "type": "unique", "by": "key" } ] },
            "freeTextMode": "tokenize",
            "delimiter": "="
        }"#;

        let config = EditorConfig::from_json(json).unwrap();
        assert_eq!(config.fields.len(), 2);
        assert_eq!(config.fields[0].field_type, FieldType::Enum);
        assert!(config.fields[1].immutable);
        assert_eq!(config.free_text_mode, FreeTextMode::Tokenize);
        assert_eq!(config.delimiter_char().unwrap(), '=');
        assert_eq!(config.tokenize_debounce_ms, 50);
        assert_eq!(config.history_depth, 100);
        assert_eq!(config.build_rules().unwrap().rules().len(), 1);
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::from_json("{}").unwrap();
        assert_eq!(config.delimiter, ":");
        assert_eq!(config.free_text_mode, FreeTextMode::Plain);
    }

    #[test]
    fn test_invalid_delimiters() {
        for delimiter in ["", "::", " ", "\"", "\t"] {
            let config = EditorConfig::default().with_delimiter(delimiter);
            assert!(
                matches!(config.delimiter_char(), Err(EditorError::InvalidDelimiter(_))),
                "{delimiter:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(
            EditorConfig::from_json(r#"{ "delimiter": 3 }"#),
            Err(EditorError::Config(_))
        ));
    }
}
