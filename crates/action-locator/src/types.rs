//! Provider profile data

use std::collections::BTreeMap;

use mailpilot_core_types::{LogicalTarget, SelectorStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::LocatorError;

/// One way of finding a UI element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorCandidate {
    pub selector: String,
    #[serde(default)]
    pub strategy: SelectorStrategy,
    #[serde(default)]
    pub description: String,
}

impl LocatorCandidate {
    pub fn css(selector: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(selector, SelectorStrategy::Css, description)
    }

    pub fn xpath(selector: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(selector, SelectorStrategy::Xpath, description)
    }

    pub fn text(text: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(text, SelectorStrategy::TextContains, description)
    }

    pub fn new(
        selector: impl Into<String>,
        strategy: SelectorStrategy,
        description: impl Into<String>,
    ) -> Self {
        Self {
            selector: selector.into(),
            strategy,
            description: description.into(),
        }
    }
}

/// Everything provider-specific the automation needs: where to go, how to
/// tell the page state apart, and where the controls are.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub home_url: String,
    /// Current URL containing any of these means a login page.
    #[serde(default)]
    pub login_url_markers: Vec<String>,
    /// Lower-cased page text that means a login page.
    #[serde(default)]
    pub login_content_markers: Vec<String>,
    /// Current URL containing any of these means the mailbox is open.
    #[serde(default)]
    pub authenticated_url_markers: Vec<String>,
    /// Lower-cased page text that means automated access was refused.
    #[serde(default)]
    pub blocked_content_markers: Vec<String>,
    /// Candidates per target, most specific first.
    #[serde(default)]
    pub locators: BTreeMap<LogicalTarget, Vec<LocatorCandidate>>,
}

impl ProviderProfile {
    pub fn display_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }

    /// Ordered candidates for `target`; never empty on success.
    pub fn candidates(&self, target: LogicalTarget) -> Result<&[LocatorCandidate], LocatorError> {
        match self.locators.get(&target) {
            Some(candidates) if !candidates.is_empty() => Ok(candidates),
            _ => Err(LocatorError::UnknownTarget {
                provider: self.id.clone(),
                target,
            }),
        }
    }

    pub fn has_target(&self, target: LogicalTarget) -> bool {
        self.candidates(target).is_ok()
    }

    pub fn validate(&self) -> Result<(), LocatorError> {
        let invalid = |reason: String| LocatorError::InvalidProfile {
            provider: self.id.clone(),
            reason,
        };
        if self.id.trim().is_empty() {
            return Err(invalid("provider id is empty".to_string()));
        }
        url::Url::parse(&self.home_url)
            .map_err(|err| invalid(format!("home_url '{}': {err}", self.home_url)))?;
        if let Some(missing) = LogicalTarget::REQUIRED
            .iter()
            .find(|target| !self.has_target(**target))
        {
            return Err(invalid(format!("no candidates for {missing}")));
        }
        if let Some((target, _)) = self
            .locators
            .iter()
            .find(|(_, candidates)| candidates.iter().any(|c| c.selector.trim().is_empty()))
        {
            return Err(invalid(format!("empty selector for {target}")));
        }
        Ok(())
    }
}
