//! Automation profile catalog loaded from the `[[profile]]` config entries.

use imitation_core::profile::{AutomationProfile, DEFAULT_PROMPT_TEMPLATE};
use rand::seq::SliceRandom;

#[derive(Debug, Clone)]
pub struct ProfileCatalog {
    profiles: Vec<AutomationProfile>,
    default_template: String,
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ProfileCatalog {
    pub fn new(profiles: Vec<AutomationProfile>) -> Self {
        Self {
            profiles,
            default_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }

    pub fn with_default_template(mut self, template: impl Into<String>) -> Self {
        self.default_template = template.into();
        self
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn random(&self) -> Option<AutomationProfile> {
        self.profiles.choose(&mut rand::thread_rng()).cloned()
    }

    pub fn get(&self, profile_id: &str) -> Option<AutomationProfile> {
        self.profiles.iter().find(|p| p.id == profile_id).cloned()
    }

    /// The profile's own template, else the catalog default.
    pub fn template_for(&self, profile_id: Option<&str>) -> String {
        profile_id
            .and_then(|id| self.profiles.iter().find(|p| p.id == id))
            .and_then(|p| p.prompt_template.clone())
            .unwrap_or_else(|| self.default_template.clone())
    }
}
