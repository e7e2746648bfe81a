use ash::Entry;
use tracing::{debug, info};
use winit::{raw_window_handle::HasDisplayHandle, window::Window};

use crate::{
    diagnostics::DebugMessenger,
    errors::{Error, Result},
    instance::Instance,
    logical_device::LogicalDevice,
    physical_device::{pick_physical_device, SelectionStrategy},
    surface::Surface,
    swapchain::Swapchain,
    ENABLE_VALIDATIONS,
};

/// Sole owner of every handle the bring-up sequence produces. Fields drop
/// in declaration order, which is kept as the exact reverse of
/// acquisition: swapchain, logical device (invalidating its queues),
/// messenger, surface, instance.
pub struct Context {
    swapchain: Swapchain,
    logical_device: LogicalDevice,
    debug_messenger: Option<DebugMessenger>,
    surface: Surface,
    instance: Instance,
}

impl Context {
    /// Brings the process up on a GPU, in strict order: instance (with the
    /// messenger, if validations are on), surface, device selection,
    /// logical device, swapchain. Each step must fully succeed before the
    /// next begins; any failure aborts the whole sequence.
    pub fn new(window: &Window) -> Result<Self> {
        Self::with_strategy(window, SelectionStrategy::default())
    }

    pub fn with_strategy(window: &Window, strategy: SelectionStrategy) -> Result<Self> {
        let display_handle = window
            .display_handle()
            .map_err(|e| Error::Configuration(format!("no display handle: {e}")))?;
        let required_extensions =
            ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(Error::vulkan("surface extension enumeration"))?;

        let entry = Entry::linked();
        let instance = Instance::new(entry, required_extensions)?;
        debug!("instance ready");

        let debug_messenger = if ENABLE_VALIDATIONS {
            Some(DebugMessenger::new(instance.get_entry(), &instance)?)
        } else {
            None
        };

        let surface = Surface::new(&instance, window)?;
        debug!("surface ready");

        let selected = pick_physical_device(&instance, &surface, strategy)?;
        let logical_device = LogicalDevice::new(&instance, &selected)?;
        debug!("logical device ready");

        let window_size = window.inner_size();
        let swapchain = Swapchain::new(
            &instance,
            &logical_device,
            &surface,
            &selected.swapchain_support,
            (window_size.width, window_size.height),
        )?;
        info!("context ready");

        Ok(Self {
            swapchain,
            logical_device,
            debug_messenger,
            surface,
            instance,
        })
    }

    pub fn get_instance(&self) -> &Instance {
        &self.instance
    }

    pub fn get_surface(&self) -> &Surface {
        &self.surface
    }

    pub fn get_logical_device(&self) -> &LogicalDevice {
        &self.logical_device
    }

    pub fn get_swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub fn has_debug_messenger(&self) -> bool {
        self.debug_messenger.is_some()
    }
}
