use std::{ffi::c_char, ops::Deref};

use ash::{
    vk::{DeviceCreateInfo, DeviceQueueCreateInfo, PhysicalDeviceFeatures, Queue},
    Device,
};
use tracing::debug;

use crate::{
    diagnostics::VALIDATION_LAYER,
    errors::{Error, Result},
    instance::Instance,
    physical_device::{SuitableDevice, REQUIRED_DEVICE_EXTENSIONS},
    ENABLE_VALIDATIONS,
};

/// The configured connection to the selected physical device, plus one
/// queue handle per role. When the graphics and present roles share a
/// family the two handles alias the same underlying queue, and callers
/// must serialize their submissions to it.
pub struct LogicalDevice {
    device: Device,
    graphics_family: u32,
    present_family: u32,
    graphics_queue: Queue,
    present_queue: Queue,
}

impl LogicalDevice {
    /// Creates the device with one uniform-priority queue per distinct
    /// family the selection needs, the swapchain extension, and (for
    /// loaders that still read device layers) the same validation layer
    /// as the instance. No features beyond defaults are requested.
    pub fn new(instance: &Instance, selected: &SuitableDevice) -> Result<Self> {
        let queue_family_indices =
            unique_queue_family_indices(selected.graphics_family, selected.present_family);
        debug!("creating device queues for families {queue_family_indices:?}");

        let queue_priorities = [1.0f32];
        let queue_create_infos = queue_family_indices
            .iter()
            .map(|queue_family_index| {
                DeviceQueueCreateInfo::default()
                    .queue_family_index(*queue_family_index)
                    .queue_priorities(&queue_priorities)
            })
            .collect::<Vec<_>>();

        let features = PhysicalDeviceFeatures::default();

        let extension_names = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|extension_name| extension_name.as_ptr())
            .collect::<Vec<_>>();

        let layer_names: Vec<*const c_char> = if ENABLE_VALIDATIONS {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        };

        // device layers are ignored by modern implementations but older
        // loaders still read them
        #[allow(deprecated)]
        let device_create_info = DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_features(&features)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names);

        let device = unsafe {
            instance.create_device(selected.physical_device, &device_create_info, None)
        }
        .map_err(Error::vulkan("logical device creation"))?;

        let graphics_queue = unsafe { device.get_device_queue(selected.graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(selected.present_family, 0) };

        Ok(Self {
            device,
            graphics_family: selected.graphics_family,
            present_family: selected.present_family,
            graphics_queue,
            present_queue,
        })
    }

    pub fn get_graphics_family(&self) -> u32 {
        self.graphics_family
    }

    pub fn get_present_family(&self) -> u32 {
        self.present_family
    }

    pub fn get_graphics_queue(&self) -> Queue {
        self.graphics_queue
    }

    pub fn get_present_queue(&self) -> Queue {
        self.present_queue
    }
}

/// A shared family appears once; order is stable for logging and tests.
fn unique_queue_family_indices(graphics_family: u32, present_family: u32) -> Vec<u32> {
    if graphics_family == present_family {
        vec![graphics_family]
    } else {
        vec![graphics_family, present_family]
    }
}

impl Deref for LogicalDevice {
    type Target = Device;

    fn deref(&self) -> &Self::Target {
        &self.device
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe { self.device.destroy_device(None) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_family_is_requested_once() {
        assert_eq!(unique_queue_family_indices(0, 0), vec![0]);
        assert_eq!(unique_queue_family_indices(3, 3), vec![3]);
    }

    #[test]
    fn distinct_families_are_both_requested() {
        assert_eq!(unique_queue_family_indices(0, 1), vec![0, 1]);
        assert_eq!(unique_queue_family_indices(2, 0), vec![2, 0]);
    }
}
