use std::ffi::{c_void, CStr};

use ash::{
    ext::debug_utils,
    vk::{
        Bool32, DebugUtilsMessageSeverityFlagsEXT, DebugUtilsMessageTypeFlagsEXT,
        DebugUtilsMessengerCallbackDataEXT, DebugUtilsMessengerCreateInfoEXT,
        DebugUtilsMessengerEXT,
    },
    Entry,
};
use tracing::{event, Level};

use crate::{
    errors::{Error, Result},
    instance::Instance,
};

/// The layer that validates API usage and reports violations through the
/// messenger callback.
pub(crate) const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Messenger configuration shared between instance creation (so the
/// create/destroy calls themselves are covered) and the standalone
/// messenger registered afterwards.
pub fn messenger_create_info() -> DebugUtilsMessengerCreateInfoEXT<'static> {
    DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | DebugUtilsMessageSeverityFlagsEXT::INFO
                | DebugUtilsMessageSeverityFlagsEXT::WARNING
                | DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            DebugUtilsMessageTypeFlagsEXT::GENERAL
                | DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_utils_callback))
}

/// Forwards (severity, category, message) tuples from the driver to the
/// tracing sink installed by [`crate::logging::init`].
unsafe extern "system" fn debug_utils_callback(
    message_severity: DebugUtilsMessageSeverityFlagsEXT,
    message_type: DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> Bool32 {
    let message = format!("{:?}", CStr::from_ptr((*p_callback_data).p_message));
    let ty = format!("{:?}", message_type).to_lowercase();

    match message_severity {
        DebugUtilsMessageSeverityFlagsEXT::INFO => {
            event!(Level::INFO, message = message, ty = ty)
        }
        DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            event!(Level::WARN, message = message, ty = ty)
        }
        DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            event!(Level::ERROR, message = message, ty = ty)
        }
        // VERBOSE, or anything a newer driver might add. Never abort
        // inside an FFI callback.
        _ => event!(Level::TRACE, message = message, ty = ty),
    }
    // dont skip driver
    ash::vk::FALSE
}

/// Owns the registered debug messenger and the extension function table it
/// was resolved from, so teardown is self-contained.
pub struct DebugMessenger {
    debug_utils: debug_utils::Instance,
    messenger: DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Resolves the debug-utils entry points once and registers the
    /// messenger. Registration failure is a resource-creation error.
    pub fn new(entry: &Entry, instance: &Instance) -> Result<Self> {
        let debug_utils = debug_utils::Instance::new(entry, instance);
        let create_info = messenger_create_info();
        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
            .map_err(Error::vulkan("debug messenger creation"))?;
        Ok(Self {
            debug_utils,
            messenger,
        })
    }
}

impl Drop for DebugMessenger {
    fn drop(&mut self) {
        unsafe {
            self.debug_utils
                .destroy_debug_utils_messenger(self.messenger, None)
        }
    }
}
