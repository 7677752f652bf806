//! Provider catalog: built-in profiles plus optional YAML overrides

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use mailpilot_core_types::{LogicalTarget, ProviderId};
use serde::Deserialize;
use tracing::{debug, info};

use crate::builtin;
use crate::errors::LocatorError;
use crate::resolver::LocatorResolver;
use crate::types::{LocatorCandidate, ProviderProfile};

#[derive(Debug, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    providers: Vec<ProviderProfile>,
}

/// Known providers keyed by normalized id.
#[derive(Clone, Debug, Default)]
pub struct ProviderCatalog {
    profiles: BTreeMap<String, Arc<ProviderProfile>>,
}

impl ProviderCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Gmail and Outlook.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for profile in builtin::all() {
            let id = ProviderId::new(&profile.id);
            catalog.profiles.insert(id.as_str().to_string(), Arc::new(profile));
        }
        catalog
    }

    /// Adds or replaces a profile after validating it.
    pub fn insert(&mut self, mut profile: ProviderProfile) -> Result<(), LocatorError> {
        profile.id = ProviderId::new(&profile.id).as_str().to_string();
        profile.validate()?;
        let replaced = self
            .profiles
            .insert(profile.id.clone(), Arc::new(profile))
            .is_some();
        debug!(replaced, "provider profile registered");
        Ok(())
    }

    /// Merges profiles from a YAML document; returns how many were applied.
    pub fn merge_yaml(&mut self, yaml: &str) -> Result<usize, LocatorError> {
        let file: ProfileFile = serde_yaml::from_str(yaml).map_err(|err| LocatorError::Load {
            path: "<inline>".to_string(),
            reason: err.to_string(),
        })?;
        let count = file.providers.len();
        for profile in file.providers {
            self.insert(profile)?;
        }
        Ok(count)
    }

    pub fn load_overrides(&mut self, path: impl AsRef<Path>) -> Result<usize, LocatorError> {
        let path = path.as_ref();
        let load_error = |reason: String| LocatorError::Load {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|err| load_error(err.to_string()))?;
        let count = self.merge_yaml(&raw).map_err(|err| match err {
            LocatorError::Load { reason, .. } => load_error(reason),
            other => other,
        })?;
        info!(path = %path.display(), count, "provider profiles loaded");
        Ok(count)
    }

    pub fn profile(&self, provider: &str) -> Result<Arc<ProviderProfile>, LocatorError> {
        let id = ProviderId::new(provider);
        self.profiles
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| LocatorError::UnknownProvider(id.as_str().to_string()))
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.profiles.contains_key(ProviderId::new(provider).as_str())
    }

    /// Sorted provider ids.
    pub fn known_providers(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Arc<ProviderProfile>> {
        self.profiles.values()
    }
}

impl LocatorResolver for ProviderCatalog {
    fn resolve(
        &self,
        provider: &str,
        target: LogicalTarget,
    ) -> Result<Vec<LocatorCandidate>, LocatorError> {
        let profile = self.profile(provider)?;
        let candidates = profile.candidates(target)?;
        Ok(candidates.to_vec())
    }
}
