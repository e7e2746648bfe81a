use std::{
    ffi::{c_char, CStr},
    ops::Deref,
};

use ash::{
    ext::debug_utils,
    vk::{make_api_version, ApplicationInfo, InstanceCreateInfo, API_VERSION_1_3},
    Entry,
};
use tracing::{debug, info};

use crate::{
    diagnostics::{messenger_create_info, VALIDATION_LAYER},
    errors::{Error, Result},
    ENABLE_VALIDATIONS,
};

const APP_NAME: &CStr = c"Hello Triangle";
const ENGINE_NAME: &CStr = c"Kutory Engine";
const API_VERSION: u32 = API_VERSION_1_3;

/// The top-level connection to the Vulkan backend. Owns the loader entry
/// alongside the instance so everything resolved from it stays valid for
/// the instance's lifetime.
pub struct Instance {
    instance: ash::Instance,
    entry: Entry,
}

impl Instance {
    /// Creates the instance with the extensions the windowing system needs,
    /// plus the debug-utils extension and validation layer when validations
    /// are enabled. Fails with a configuration error before any creation
    /// call if the validation layer was requested but is not installed.
    pub fn new(entry: Entry, required_extensions: &[*const c_char]) -> Result<Self> {
        if ENABLE_VALIDATIONS && !Self::validation_layer_available(&entry)? {
            return Err(Error::Configuration(format!(
                "validation layer {VALIDATION_LAYER:?} is not available on this host"
            )));
        }

        Self::log_available_extensions(&entry)?;

        let app_version = make_api_version(0, 1, 0, 0);
        let app_info = ApplicationInfo::default()
            .application_name(APP_NAME)
            .application_version(app_version)
            .api_version(API_VERSION)
            .engine_name(ENGINE_NAME)
            .engine_version(app_version);

        let mut extension_names = required_extensions.to_vec();
        if ENABLE_VALIDATIONS {
            extension_names.push(debug_utils::NAME.as_ptr());
        }

        let layer_names: Vec<*const c_char> = if ENABLE_VALIDATIONS {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        };

        let mut debug_create_info = messenger_create_info();
        let mut create_info = InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names);
        if ENABLE_VALIDATIONS {
            create_info = create_info.push_next(&mut debug_create_info);
        }

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(Error::vulkan("instance creation"))?;

        Ok(Self { instance, entry })
    }

    pub fn get_entry(&self) -> &Entry {
        &self.entry
    }

    /// Advisory only: lists what the host exposes, never gates success.
    fn log_available_extensions(entry: &Entry) -> Result<()> {
        let extensions = unsafe { entry.enumerate_instance_extension_properties(None) }
            .map_err(Error::vulkan("instance extension enumeration"))?;
        info!("{} instance extensions available", extensions.len());
        for extension in &extensions {
            if let Ok(name) = extension.extension_name_as_c_str() {
                debug!("available instance extension: {:?}", name);
            }
        }
        Ok(())
    }

    /// Checks for the validation layer among the host's instance layers,
    /// logging everything found along the way.
    fn validation_layer_available(entry: &Entry) -> Result<bool> {
        let layers = unsafe { entry.enumerate_instance_layer_properties() }
            .map_err(Error::vulkan("instance layer enumeration"))?;
        let mut available = false;
        for layer in &layers {
            if let Ok(name) = layer.layer_name_as_c_str() {
                debug!("available instance layer: {:?}", name);
                available |= name == VALIDATION_LAYER;
            }
        }
        Ok(available)
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe { self.instance.destroy_instance(None) }
    }
}

impl Deref for Instance {
    type Target = ash::Instance;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}
