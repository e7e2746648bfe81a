use ash::vk;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong during bring-up. All variants are fatal:
/// nothing here is retried or recovered locally, the whole sequence aborts
/// and `main` translates the error into a failure exit status.
#[derive(Debug, Error)]
pub enum Error {
    /// A requested optional capability (such as the validation layer) is
    /// not available on this host.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The Vulkan backend rejected a creation request or query.
    #[error("{operation} failed: {source}")]
    ResourceCreation {
        operation: &'static str,
        #[source]
        source: vk::Result,
    },

    /// Zero physical devices were enumerated, or none passed the
    /// suitability checks.
    #[error("no suitable physical device found")]
    NoSuitableDevice,
}

impl Error {
    /// Adapter for `map_err` on raw `vk::Result` returns.
    pub(crate) fn vulkan(operation: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |source| Self::ResourceCreation { operation, source }
    }
}
