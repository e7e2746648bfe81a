use std::{
    collections::HashSet,
    ffi::{CStr, CString},
};

use ash::vk::{
    PhysicalDevice, PhysicalDeviceFeatures, PhysicalDeviceProperties, PhysicalDeviceType,
    QueueFlags, FALSE, KHR_SWAPCHAIN_NAME,
};
use tracing::{debug, info};

use crate::{
    errors::{Error, Result},
    instance::Instance,
    surface::Surface,
    swapchain::SwapchainSupportDetails,
};

/// Every selected device must be able to drive a swapchain.
pub const REQUIRED_DEVICE_EXTENSIONS: &[&CStr] = &[KHR_SWAPCHAIN_NAME];

/// The queue family indices a device probe discovered. Either role may be
/// unfilled, and both may land on the same index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// Family capable of running graphics commands.
    pub graphics: Option<u32>,
    /// Family capable of presenting to the surface.
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// True once both roles have a family.
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }
}

/// A physical device that passed every suitability check, together with
/// the probe results everything downstream reuses verbatim.
pub struct SuitableDevice {
    pub physical_device: PhysicalDevice,
    pub graphics_family: u32,
    pub present_family: u32,
    pub swapchain_support: SwapchainSupportDetails,
}

/// How to pick among the enumerated devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Take the first device that passes the suitability checks, in
    /// enumeration order.
    #[default]
    FirstSuitable,
    /// Score every suitable device and take the best. Discrete GPUs and
    /// larger texture limits score higher; devices without geometry
    /// shader support are vetoed outright.
    HighestScore,
}

/// Enumerates the physical devices and picks one per the strategy.
pub fn pick_physical_device(
    instance: &Instance,
    surface: &Surface,
    strategy: SelectionStrategy,
) -> Result<SuitableDevice> {
    let physical_devices = unsafe { instance.enumerate_physical_devices() }
        .map_err(Error::vulkan("physical device enumeration"))?;
    if physical_devices.is_empty() {
        return Err(Error::NoSuitableDevice);
    }
    debug!("{} physical devices enumerated", physical_devices.len());

    match strategy {
        SelectionStrategy::FirstSuitable => {
            for physical_device in physical_devices {
                if let Some(candidate) = probe_device(instance, physical_device, surface)? {
                    log_selected(instance, &candidate);
                    return Ok(candidate);
                }
            }
            Err(Error::NoSuitableDevice)
        }
        SelectionStrategy::HighestScore => {
            let mut best: Option<(u32, SuitableDevice)> = None;
            for physical_device in physical_devices {
                let Some(candidate) = probe_device(instance, physical_device, surface)? else {
                    continue;
                };
                let properties =
                    unsafe { instance.get_physical_device_properties(physical_device) };
                let features = unsafe { instance.get_physical_device_features(physical_device) };
                let score = score_device(&properties, &features);
                debug!(
                    "device {:?} scored {score}",
                    properties.device_name_as_c_str().unwrap_or_default()
                );
                if score == 0 {
                    continue;
                }
                // strictly-greater keeps the earliest device on ties
                match &best {
                    Some((best_score, _)) if *best_score >= score => {}
                    _ => best = Some((score, candidate)),
                }
            }
            let (_, candidate) = best.ok_or(Error::NoSuitableDevice)?;
            log_selected(instance, &candidate);
            Ok(candidate)
        }
    }
}

fn log_selected(instance: &Instance, candidate: &SuitableDevice) {
    let properties = unsafe { instance.get_physical_device_properties(candidate.physical_device) };
    info!(
        "selected physical device {:?} (graphics family {}, present family {})",
        properties.device_name_as_c_str().unwrap_or_default(),
        candidate.graphics_family,
        candidate.present_family,
    );
}

/// Runs the suitability checks against one device: complete queue
/// families, required extensions present, and a surface pair with at least
/// one format and one present mode.
fn probe_device(
    instance: &Instance,
    physical_device: PhysicalDevice,
    surface: &Surface,
) -> Result<Option<SuitableDevice>> {
    let indices = find_queue_families(instance, &physical_device, surface)?;
    let (Some(graphics_family), Some(present_family)) = (indices.graphics, indices.present) else {
        return Ok(None);
    };

    if !check_device_extension_support(instance, &physical_device)? {
        return Ok(None);
    }

    let swapchain_support = SwapchainSupportDetails::query(&physical_device, surface)?;
    if !swapchain_support.is_adequate() {
        return Ok(None);
    }

    Ok(Some(SuitableDevice {
        physical_device,
        graphics_family,
        present_family,
        swapchain_support,
    }))
}

/// Scans the device's queue families in index order. The first
/// graphics-capable family and the first family that can present to the
/// surface are recorded independently; the scan stops early once both
/// roles are filled.
pub fn find_queue_families(
    instance: &Instance,
    physical_device: &PhysicalDevice,
    surface: &Surface,
) -> Result<QueueFamilyIndices> {
    let queue_family_properties =
        unsafe { instance.get_physical_device_queue_family_properties(*physical_device) };

    let mut indices = QueueFamilyIndices::default();
    for (index, properties) in queue_family_properties.iter().enumerate() {
        let index = index as u32;
        if indices.graphics.is_none() && properties.queue_flags.contains(QueueFlags::GRAPHICS) {
            indices.graphics = Some(index);
        }
        if indices.present.is_none()
            && surface.get_physical_device_surface_support(physical_device, index)?
        {
            indices.present = Some(index);
        }
        if indices.is_complete() {
            break;
        }
    }
    Ok(indices)
}

/// True iff every required device extension shows up in the device's
/// enumerated extension list.
fn check_device_extension_support(
    instance: &Instance,
    physical_device: &PhysicalDevice,
) -> Result<bool> {
    let extension_properties =
        unsafe { instance.enumerate_device_extension_properties(*physical_device) }
            .map_err(Error::vulkan("device extension enumeration"))?;

    let available = extension_properties
        .iter()
        .filter_map(|properties| {
            properties
                .extension_name_as_c_str()
                .ok()
                .map(CStr::to_owned)
        })
        .collect::<HashSet<_>>();

    Ok(extensions_supported(REQUIRED_DEVICE_EXTENSIONS, &available))
}

/// Set-difference check: supported iff required minus available is empty.
fn extensions_supported(required: &[&CStr], available: &HashSet<CString>) -> bool {
    required.iter().all(|name| available.contains(*name))
}

/// Ranking used by [`SelectionStrategy::HighestScore`]. Zero means the
/// device is vetoed.
fn score_device(properties: &PhysicalDeviceProperties, features: &PhysicalDeviceFeatures) -> u32 {
    if features.geometry_shader == FALSE {
        return 0;
    }
    let mut score = 0;
    if properties.device_type == PhysicalDeviceType::DISCRETE_GPU {
        score += 1000;
    }
    score + properties.limits.max_image_dimension2_d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cstring_set(names: &[&CStr]) -> HashSet<CString> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    #[test]
    fn extensions_supported_iff_required_is_subset() {
        let available = cstring_set(&[KHR_SWAPCHAIN_NAME, c"VK_KHR_maintenance1"]);
        assert!(extensions_supported(REQUIRED_DEVICE_EXTENSIONS, &available));

        let without_swapchain = cstring_set(&[c"VK_KHR_maintenance1"]);
        assert!(!extensions_supported(
            REQUIRED_DEVICE_EXTENSIONS,
            &without_swapchain
        ));

        // empty requirement set is trivially supported
        assert!(extensions_supported(&[], &HashSet::new()));
    }

    #[test]
    fn indices_complete_only_with_both_roles() {
        let mut indices = QueueFamilyIndices::default();
        assert!(!indices.is_complete());

        indices.graphics = Some(0);
        assert!(!indices.is_complete());

        indices.present = Some(0);
        assert!(indices.is_complete());

        // roles on different families are just as complete
        indices.present = Some(2);
        assert!(indices.is_complete());
    }

    #[test]
    fn score_vetoes_devices_without_geometry_shaders() {
        let mut properties = PhysicalDeviceProperties::default();
        properties.device_type = PhysicalDeviceType::DISCRETE_GPU;
        properties.limits.max_image_dimension2_d = 16384;
        let features = PhysicalDeviceFeatures::default();

        assert_eq!(score_device(&properties, &features), 0);
    }

    #[test]
    fn score_prefers_discrete_gpus_and_larger_texture_limits() {
        let features = PhysicalDeviceFeatures::default().geometry_shader(true);

        let mut discrete = PhysicalDeviceProperties::default();
        discrete.device_type = PhysicalDeviceType::DISCRETE_GPU;
        discrete.limits.max_image_dimension2_d = 4096;

        let mut integrated = PhysicalDeviceProperties::default();
        integrated.device_type = PhysicalDeviceType::INTEGRATED_GPU;
        integrated.limits.max_image_dimension2_d = 4096;

        assert!(score_device(&discrete, &features) > score_device(&integrated, &features));

        let mut bigger_textures = integrated;
        bigger_textures.limits.max_image_dimension2_d = 8192;
        assert!(
            score_device(&bigger_textures, &features) > score_device(&integrated, &features)
        );
    }
}
