use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Enum,
    Date,
    Datetime,
}

/// A field that filter tokens can refer to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub key: String,

    #[serde(default)]
    pub label: String,

    #[serde(default, rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub operators: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,

    #[serde(default)]
    pub immutable: bool,

    /// Per-rule switches; `false` disables that rule id for this field
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub validation: HashMap<String, bool>,
}

pub const DEFAULT_OPERATOR: &str = "is";

impl FieldDefinition {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            field_type: FieldType::String,
            operators: Vec::new(),
            enum_values: Vec::new(),
            immutable: false,
            validation: HashMap::new(),
        }
    }

    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub fn with_operators<I, S>(mut self, operators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operators = operators.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_type = FieldType::Enum;
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = immutable;
        self
    }

    pub fn disable_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.validation.insert(rule_id.into(), false);
        self
    }

    /// Operator a freshly created token starts with
    pub fn default_operator(&self) -> &str {
        self.operators
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_OPERATOR)
    }

    pub fn rule_enabled(&self, rule_id: &str) -> bool {
        self.validation.get(rule_id).copied().unwrap_or(true)
    }
}

/// Field definitions indexed by key
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<FieldDefinition>,
    by_key: HashMap<String, usize>,
}

impl FieldRegistry {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        let by_key = fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field.key.clone(), index))
            .collect();
        Self { fields, by_key }
    }

    pub fn get(&self, key: &str) -> Option<&FieldDefinition> {
        self.by_key.get(key).map(|&index| &self.fields[index])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn is_immutable(&self, key: &str) -> bool {
        self.get(key).is_some_and(|field| field.immutable)
    }

    /// Whether `rule_id` applies to tokens of `key`; unknown keys allow every rule
    pub fn rule_enabled(&self, key: &str, rule_id: &str) -> bool {
        self.get(key).map_or(true, |field| field.rule_enabled(rule_id))
    }
}
