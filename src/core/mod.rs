pub mod binding;
pub mod diagnostics;
pub mod form;
pub mod lookup;

pub use crate::domain::model::{OptionList, SelectOption, ServiceRef, SubServiceOption};
pub use crate::domain::ports::{ControlLocator, DiagnosticSink, SelectControl, SubServiceLookup};
pub use crate::utils::error::Result;
