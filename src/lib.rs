pub mod context;
pub mod diagnostics;
mod errors;
pub mod instance;
pub mod logging;
pub mod logical_device;
pub mod physical_device;
pub mod surface;
pub mod swapchain;

pub use context::Context;
pub use errors::{Error, Result};
pub use physical_device::SelectionStrategy;

/// Whether the validation layer and debug messenger are wired in.
/// Resolved at build time from the `enable_validations` feature.
#[cfg(feature = "enable_validations")]
pub(crate) const ENABLE_VALIDATIONS: bool = true;
#[cfg(not(feature = "enable_validations"))]
pub(crate) const ENABLE_VALIDATIONS: bool = false;
