pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::config::FilterConfig;
pub use crate::core::binding::{CascadingSelector, RefreshOutcome};
pub use crate::core::diagnostics::{CollectingSink, TracingSink};
pub use crate::core::form::{FormPage, SelectElement};
pub use crate::core::lookup::{HttpSubServiceLookup, StaticLookup};
pub use crate::utils::error::{FilterError, LookupFailure, Result};
