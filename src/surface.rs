use ash::{
    khr::surface,
    vk::{PhysicalDevice, PresentModeKHR, SurfaceCapabilitiesKHR, SurfaceFormatKHR, SurfaceKHR},
};
use winit::{
    raw_window_handle::{HasDisplayHandle, HasWindowHandle},
    window::Window,
};

use crate::{
    errors::{Error, Result},
    instance::Instance,
};

/// A presentable surface bound to the window, plus the queries the device
/// selector runs against it. Owns its own function table so teardown does
/// not reach back into the instance.
pub struct Surface {
    surface_fn: surface::Instance,
    surface: SurfaceKHR,
}

impl Surface {
    pub fn new(instance: &Instance, window: &Window) -> Result<Self> {
        let surface_fn = surface::Instance::new(instance.get_entry(), instance);
        let display_handle = window
            .display_handle()
            .map_err(|e| Error::Configuration(format!("no display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| Error::Configuration(format!("no window handle: {e}")))?;
        let surface = unsafe {
            ash_window::create_surface(
                instance.get_entry(),
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(Error::vulkan("surface creation"))?;
        Ok(Self {
            surface_fn,
            surface,
        })
    }

    pub fn get_handle(&self) -> SurfaceKHR {
        self.surface
    }

    pub(crate) fn get_physical_device_surface_capabilities(
        &self,
        physical_device: &PhysicalDevice,
    ) -> Result<SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_fn
                .get_physical_device_surface_capabilities(*physical_device, self.surface)
        }
        .map_err(Error::vulkan("surface capabilities query"))
    }

    pub(crate) fn get_physical_device_surface_formats(
        &self,
        physical_device: &PhysicalDevice,
    ) -> Result<Vec<SurfaceFormatKHR>> {
        unsafe {
            self.surface_fn
                .get_physical_device_surface_formats(*physical_device, self.surface)
        }
        .map_err(Error::vulkan("surface formats query"))
    }

    pub(crate) fn get_physical_device_surface_present_modes(
        &self,
        physical_device: &PhysicalDevice,
    ) -> Result<Vec<PresentModeKHR>> {
        unsafe {
            self.surface_fn
                .get_physical_device_surface_present_modes(*physical_device, self.surface)
        }
        .map_err(Error::vulkan("surface present modes query"))
    }

    pub(crate) fn get_physical_device_surface_support(
        &self,
        physical_device: &PhysicalDevice,
        queue_family_index: u32,
    ) -> Result<bool> {
        unsafe {
            self.surface_fn.get_physical_device_surface_support(
                *physical_device,
                queue_family_index,
                self.surface,
            )
        }
        .map_err(Error::vulkan("surface support query"))
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe { self.surface_fn.destroy_surface(self.surface, None) }
    }
}
