use serde::{Deserialize, Serialize};

/// A persona the automated respondent can play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationProfile {
    /// Unique, stable identifier recorded on the conversation
    pub id: String,
    /// Display name used inside the prompt
    pub name: String,
    /// Free-form description of who the respondent pretends to be
    #[serde(default)]
    pub persona: String,
    /// Overrides the default prompt template for this profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

impl AutomationProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            persona: String::new(),
            prompt_template: None,
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }
}
