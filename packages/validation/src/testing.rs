use crate::context::{collect_tokens, RuleContext, TokenSnapshot};
use querybar_document::{parse, FieldRegistry, IdGenerator, ParseOptions};
use std::collections::HashSet;

/// Owns everything a `RuleContext` borrows
pub(crate) struct Fixture {
    pub tokens: Vec<TokenSnapshot>,
    pub new_ids: HashSet<String>,
    pub modified_ids: HashSet<String>,
    pub editing_ids: HashSet<String>,
    pub fields: FieldRegistry,
    pub force_check: bool,
}

impl Fixture {
    pub fn parse(input: &str) -> Self {
        let doc = parse(input, &ParseOptions::new(':'), &mut IdGenerator::from_seed("t".to_string()));
        Self {
            tokens: collect_tokens(&doc),
            new_ids: HashSet::new(),
            modified_ids: HashSet::new(),
            editing_ids: HashSet::new(),
            fields: FieldRegistry::default(),
            force_check: false,
        }
    }

    pub fn id(&self, index: usize) -> String {
        self.tokens[index].id.clone()
    }

    /// Mark the token at `index` as freshly inserted
    pub fn new_token(mut self, index: usize) -> Self {
        let id = self.id(index);
        self.editing_ids.insert(id.clone());
        self.new_ids.insert(id);
        self
    }

    pub fn editing(mut self, index: usize) -> Self {
        let id = self.id(index);
        self.editing_ids.insert(id);
        self
    }

    pub fn fields(mut self, fields: FieldRegistry) -> Self {
        self.fields = fields;
        self
    }

    pub fn forced(mut self) -> Self {
        self.force_check = true;
        self
    }

    pub fn ctx(&self) -> RuleContext<'_> {
        RuleContext {
            tokens: &self.tokens,
            new_token_ids: &self.new_ids,
            modified_token_ids: &self.modified_ids,
            editing_token_ids: &self.editing_ids,
            fields: &self.fields,
            force_check: self.force_check,
        }
    }
}
