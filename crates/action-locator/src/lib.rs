//! Locator resolution for webmail providers
//!
//! This crate maps abstract UI roles to concrete markup:
//! - [`ProviderProfile`]: home URL, page signatures and candidate chains
//! - [`ProviderCatalog`]: built-in Gmail/Outlook profiles plus YAML overrides
//! - [`LocatorResolver`]: (provider, target) to ordered candidates

pub mod builtin;
pub mod catalog;
pub mod errors;
pub mod resolver;
pub mod types;

pub use catalog::*;
pub use errors::*;
pub use resolver::*;
pub use types::*;
