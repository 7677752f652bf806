//! Candidate resolution for (provider, target) pairs

use mailpilot_core_types::LogicalTarget;

use crate::errors::LocatorError;
use crate::types::LocatorCandidate;

/// Resolves a logical target to its ordered candidate chain.
///
/// Resolution is deterministic and side-effect free. The first candidate is
/// the most specific, later ones are progressively looser fallbacks.
pub trait LocatorResolver: Send + Sync {
    fn resolve(
        &self,
        provider: &str,
        target: LogicalTarget,
    ) -> Result<Vec<LocatorCandidate>, LocatorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderCatalog;

    #[test]
    fn every_configured_pair_resolves_to_a_stable_non_empty_chain() {
        let catalog = ProviderCatalog::builtin();
        for provider in catalog.known_providers() {
            for target in LogicalTarget::REQUIRED {
                let first = catalog.resolve(&provider, target).unwrap();
                let second = catalog.resolve(&provider, target).unwrap();
                assert!(!first.is_empty());
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn gmail_chains_keep_their_priority_order() {
        let catalog = ProviderCatalog::builtin();
        let compose = catalog.resolve("gmail", LogicalTarget::ComposeButton).unwrap();
        assert_eq!(compose.first().unwrap().selector, "div[gh='cm']");
        assert_eq!(compose.last().unwrap().selector, ".z0>.L3");
        let send = catalog.resolve("gmail", LogicalTarget::SendButton).unwrap();
        assert_eq!(send[0].selector, "div[role='button'][data-tooltip='Send']");
    }

    #[test]
    fn outlook_has_no_compose_url_indicator() {
        let catalog = ProviderCatalog::builtin();
        let err = catalog
            .resolve("outlook", LogicalTarget::NewComposeIndicatorUrlFragment)
            .unwrap_err();
        assert_eq!(
            err,
            LocatorError::UnknownTarget {
                provider: "outlook".into(),
                target: LogicalTarget::NewComposeIndicatorUrlFragment,
            }
        );
        assert!(catalog
            .resolve("gmail", LogicalTarget::NewComposeIndicatorUrlFragment)
            .is_ok());
    }

    #[test]
    fn unknown_provider_is_a_configuration_error() {
        let err = ProviderCatalog::builtin()
            .resolve("bogus", LogicalTarget::SendButton)
            .unwrap_err();
        assert_eq!(err.kind(), Some(mailpilot_core_types::ErrorKind::UnknownProvider));
    }
}
