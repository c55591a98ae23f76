//! Built-in fallback profile.

use super::model::AutomationProfile;

/// Used when the catalog is empty or cannot be read.
pub const DEFAULT_PROFILE_ID: &str = "default";

/// Template variables: `name`, `persona`, `transcript`.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
You are {{ name }}, chatting with a stranger in a short online conversation game. \
{{ persona }}
Reply like a real person typing casually: one or two short sentences, no lists, \
no emoji overload, and never admit to being an AI.

Conversation so far:
{{ transcript }}

Your reply:";

pub fn default_profile() -> AutomationProfile {
    AutomationProfile::new(DEFAULT_PROFILE_ID, "Alex")
        .with_persona("You are a friendly person in your twenties who likes music and travel.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_uses_reserved_id() {
        let profile = default_profile();
        assert_eq!(profile.id, DEFAULT_PROFILE_ID);
        assert!(profile.prompt_template.is_none());
    }

    #[test]
    fn test_default_template_names_its_variables() {
        for var in ["{{ name }}", "{{ persona }}", "{{ transcript }}"] {
            assert!(DEFAULT_PROMPT_TEMPLATE.contains(var), "missing {}", var);
        }
    }
}
