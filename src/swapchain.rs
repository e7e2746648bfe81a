use ash::{
    khr::swapchain,
    vk::{
        ColorSpaceKHR, CompositeAlphaFlagsKHR, Extent2D, Format, Image, ImageUsageFlags,
        PhysicalDevice, PresentModeKHR, SharingMode, SurfaceCapabilitiesKHR, SurfaceFormatKHR,
        SwapchainCreateInfoKHR, SwapchainKHR,
    },
};
use tracing::info;

use crate::{
    errors::{Error, Result},
    instance::Instance,
    logical_device::LogicalDevice,
    surface::Surface,
};

/// What the (device, surface) pair supports, as queried during device
/// selection and retained for the selected device until swapchain
/// creation.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    pub capabilities: SurfaceCapabilitiesKHR,
    /// Supported (format, color space) pairs, in enumeration order.
    pub formats: Vec<SurfaceFormatKHR>,
    pub present_modes: Vec<PresentModeKHR>,
}

/// Whether swapchain images are shared across queue families or owned by
/// one. Concurrent sharing avoids explicit ownership transfers at a
/// possible throughput cost.
#[derive(Debug, Clone)]
pub enum SharingStrategy {
    Exclusive,
    Concurrent { queue_family_indices: Vec<u32> },
}

/// The concrete parameters negotiation settled on. Negotiating twice from
/// the same support details and drawable size yields the same config.
#[derive(Debug, Clone)]
pub struct SwapchainConfig {
    pub surface_format: SurfaceFormatKHR,
    pub present_mode: PresentModeKHR,
    pub extent: Extent2D,
    pub image_count: u32,
    pub sharing: SharingStrategy,
}

impl SwapchainSupportDetails {
    pub fn query(physical_device: &PhysicalDevice, surface: &Surface) -> Result<Self> {
        let capabilities = surface.get_physical_device_surface_capabilities(physical_device)?;
        let formats = surface.get_physical_device_surface_formats(physical_device)?;
        let present_modes = surface.get_physical_device_surface_present_modes(physical_device)?;

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// A device is only worth a swapchain if there is at least one format
    /// and one present mode to negotiate from.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }

    /// Prefers 8-bit BGRA with the non-linear SRGB color space; otherwise
    /// the first supported pair in enumeration order.
    pub fn choose_surface_format(&self) -> SurfaceFormatKHR {
        self.formats
            .iter()
            .copied()
            .find(|surface_format| {
                surface_format.format == Format::B8G8R8A8_SRGB
                    && surface_format.color_space == ColorSpaceKHR::SRGB_NONLINEAR
            })
            // selection guarantees at least one format
            .unwrap_or(self.formats[0])
    }

    /// Prefers mailbox, where a queued image is replaced by a newer one
    /// instead of blocking. Falls back to FIFO, the only mode the API
    /// guarantees, so this never fails.
    pub fn choose_present_mode(&self) -> PresentModeKHR {
        if self.present_modes.contains(&PresentModeKHR::MAILBOX) {
            return PresentModeKHR::MAILBOX;
        }
        PresentModeKHR::FIFO
    }

    /// Uses the surface's reported extent verbatim unless it is the
    /// "indeterminate" sentinel (u32::MAX on both axes), in which case the
    /// drawable pixel size is clamped per axis into the supported range.
    pub fn choose_extent(&self, drawable_size: (u32, u32)) -> Extent2D {
        let current = self.capabilities.current_extent;
        if current.width != u32::MAX || current.height != u32::MAX {
            return current;
        }
        let (width, height) = drawable_size;
        Extent2D {
            width: width.clamp(
                self.capabilities.min_image_extent.width,
                self.capabilities.max_image_extent.width,
            ),
            height: height.clamp(
                self.capabilities.min_image_extent.height,
                self.capabilities.max_image_extent.height,
            ),
        }
    }

    /// One more than the minimum, so rendering is not stuck waiting on the
    /// driver; capped by the maximum unless the maximum is 0 (unbounded).
    pub fn choose_image_count(&self) -> u32 {
        let mut image_count = self.capabilities.min_image_count + 1;
        if self.capabilities.max_image_count > 0 {
            image_count = image_count.min(self.capabilities.max_image_count);
        }
        image_count
    }

    /// Settles every negotiable parameter. Pure: no backend calls.
    pub fn negotiate(
        &self,
        graphics_family: u32,
        present_family: u32,
        drawable_size: (u32, u32),
    ) -> SwapchainConfig {
        let sharing = if graphics_family == present_family {
            SharingStrategy::Exclusive
        } else {
            SharingStrategy::Concurrent {
                queue_family_indices: vec![graphics_family, present_family],
            }
        };
        SwapchainConfig {
            surface_format: self.choose_surface_format(),
            present_mode: self.choose_present_mode(),
            extent: self.choose_extent(drawable_size),
            image_count: self.choose_image_count(),
            sharing,
        }
    }
}

/// The created swapchain, its images, and the negotiated parameters later
/// rendering stages (and any future recreation) will need.
pub struct Swapchain {
    swapchain_fn: swapchain::Device,
    swapchain: SwapchainKHR,
    images: Vec<Image>,
    config: SwapchainConfig,
}

impl Swapchain {
    pub fn new(
        instance: &Instance,
        logical_device: &LogicalDevice,
        surface: &Surface,
        support: &SwapchainSupportDetails,
        drawable_size: (u32, u32),
    ) -> Result<Self> {
        let config = support.negotiate(
            logical_device.get_graphics_family(),
            logical_device.get_present_family(),
            drawable_size,
        );
        info!(
            "swapchain negotiated: format {:?}/{:?}, present mode {:?}, extent {}x{}, {} images",
            config.surface_format.format,
            config.surface_format.color_space,
            config.present_mode,
            config.extent.width,
            config.extent.height,
            config.image_count,
        );

        let mut create_info = SwapchainCreateInfoKHR::default()
            .surface(surface.get_handle())
            .min_image_count(config.image_count)
            .image_format(config.surface_format.format)
            .image_color_space(config.surface_format.color_space)
            .image_extent(config.extent)
            .present_mode(config.present_mode)
            // always 1 unless doing stereoscopic 3D
            .image_array_layers(1)
            // images are drawn to as color attachments
            .image_usage(ImageUsageFlags::COLOR_ATTACHMENT)
            // keep whatever transform the surface already reports
            .pre_transform(support.capabilities.current_transform)
            // no blending with other windows on the desktop
            .composite_alpha(CompositeAlphaFlagsKHR::OPAQUE)
            // obscured pixels may be discarded
            .clipped(true)
            // first-time creation; recreation on resize is not handled
            .old_swapchain(SwapchainKHR::null());
        match &config.sharing {
            SharingStrategy::Exclusive => {
                create_info = create_info.image_sharing_mode(SharingMode::EXCLUSIVE);
            }
            SharingStrategy::Concurrent {
                queue_family_indices,
            } => {
                create_info = create_info
                    .image_sharing_mode(SharingMode::CONCURRENT)
                    .queue_family_indices(queue_family_indices);
            }
        }

        let swapchain_fn = swapchain::Device::new(instance, logical_device);
        let swapchain = unsafe { swapchain_fn.create_swapchain(&create_info, None) }
            .map_err(Error::vulkan("swapchain creation"))?;

        // the driver may hand back more images than requested
        let images = unsafe { swapchain_fn.get_swapchain_images(swapchain) }
            .map_err(Error::vulkan("swapchain image query"))?;
        info!("swapchain created with {} images", images.len());

        Ok(Self {
            swapchain_fn,
            swapchain,
            images,
            config,
        })
    }

    pub fn get_handle(&self) -> SwapchainKHR {
        self.swapchain
    }

    pub fn get_images(&self) -> &[Image] {
        &self.images
    }

    pub fn get_config(&self) -> &SwapchainConfig {
        &self.config
    }

    pub fn get_extent(&self) -> Extent2D {
        self.config.extent
    }

    pub fn get_surface_format(&self) -> SurfaceFormatKHR {
        self.config.surface_format
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe { self.swapchain_fn.destroy_swapchain(self.swapchain, None) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(
        min_image_count: u32,
        max_image_count: u32,
        current_extent: (u32, u32),
        min_image_extent: (u32, u32),
        max_image_extent: (u32, u32),
    ) -> SurfaceCapabilitiesKHR {
        let mut capabilities = SurfaceCapabilitiesKHR::default();
        capabilities.min_image_count = min_image_count;
        capabilities.max_image_count = max_image_count;
        capabilities.current_extent = Extent2D {
            width: current_extent.0,
            height: current_extent.1,
        };
        capabilities.min_image_extent = Extent2D {
            width: min_image_extent.0,
            height: min_image_extent.1,
        };
        capabilities.max_image_extent = Extent2D {
            width: max_image_extent.0,
            height: max_image_extent.1,
        };
        capabilities
    }

    fn support(
        formats: Vec<SurfaceFormatKHR>,
        present_modes: Vec<PresentModeKHR>,
    ) -> SwapchainSupportDetails {
        SwapchainSupportDetails {
            capabilities: capabilities(2, 8, (u32::MAX, u32::MAX), (1, 1), (4096, 4096)),
            formats,
            present_modes,
        }
    }

    fn format(format: Format, color_space: ColorSpaceKHR) -> SurfaceFormatKHR {
        SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    #[test]
    fn format_prefers_bgra8_srgb() {
        let details = support(
            vec![
                format(Format::R8G8B8A8_SRGB, ColorSpaceKHR::SRGB_NONLINEAR),
                format(Format::B8G8R8A8_SRGB, ColorSpaceKHR::SRGB_NONLINEAR),
            ],
            vec![PresentModeKHR::FIFO],
        );
        let chosen = details.choose_surface_format();
        assert_eq!(chosen.format, Format::B8G8R8A8_SRGB);
        assert_eq!(chosen.color_space, ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn format_falls_back_to_first_supported_pair() {
        let details = support(
            vec![format(Format::R8G8B8A8_SRGB, ColorSpaceKHR::SRGB_NONLINEAR)],
            vec![PresentModeKHR::FIFO],
        );
        let chosen = details.choose_surface_format();
        assert_eq!(chosen.format, Format::R8G8B8A8_SRGB);
        assert_eq!(chosen.color_space, ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn present_mode_prefers_mailbox() {
        let details = support(
            vec![format(Format::B8G8R8A8_SRGB, ColorSpaceKHR::SRGB_NONLINEAR)],
            vec![
                PresentModeKHR::FIFO,
                PresentModeKHR::MAILBOX,
                PresentModeKHR::IMMEDIATE,
            ],
        );
        assert_eq!(details.choose_present_mode(), PresentModeKHR::MAILBOX);
    }

    #[test]
    fn present_mode_falls_back_to_fifo() {
        let details = support(
            vec![format(Format::B8G8R8A8_SRGB, ColorSpaceKHR::SRGB_NONLINEAR)],
            vec![PresentModeKHR::FIFO],
        );
        assert_eq!(details.choose_present_mode(), PresentModeKHR::FIFO);

        // FIFO is guaranteed by the API even when the queried list only
        // holds other modes
        let immediate_only = support(
            vec![format(Format::B8G8R8A8_SRGB, ColorSpaceKHR::SRGB_NONLINEAR)],
            vec![PresentModeKHR::IMMEDIATE],
        );
        assert_eq!(immediate_only.choose_present_mode(), PresentModeKHR::FIFO);
    }

    #[test]
    fn extent_uses_drawable_size_when_surface_reports_sentinel() {
        let mut details = support(vec![], vec![]);
        details.capabilities = capabilities(2, 8, (u32::MAX, u32::MAX), (1, 1), (4096, 4096));

        let extent = details.choose_extent((800, 600));
        assert_eq!(extent, Extent2D {
            width: 800,
            height: 600
        });
    }

    #[test]
    fn extent_uses_explicit_surface_extent_verbatim() {
        let mut details = support(vec![], vec![]);
        details.capabilities = capabilities(2, 8, (1024, 768), (1, 1), (4096, 4096));

        // drawable size is irrelevant once the surface reports an extent
        let extent = details.choose_extent((800, 600));
        assert_eq!(extent, Extent2D {
            width: 1024,
            height: 768
        });
    }

    #[test]
    fn extent_clamps_each_axis_independently() {
        let mut details = support(vec![], vec![]);
        details.capabilities = capabilities(2, 8, (u32::MAX, u32::MAX), (32, 32), (4096, 4096));

        let extent = details.choose_extent((8000, 4));
        assert_eq!(extent.width, 4096);
        assert_eq!(extent.height, 32);
    }

    #[test]
    fn image_count_is_one_over_minimum_within_bounds() {
        let mut details = support(vec![], vec![]);

        details.capabilities = capabilities(2, 8, (1, 1), (1, 1), (1, 1));
        assert_eq!(details.choose_image_count(), 3);

        // clamped down when the maximum is tight
        details.capabilities = capabilities(2, 2, (1, 1), (1, 1), (1, 1));
        assert_eq!(details.choose_image_count(), 2);

        // zero maximum means unbounded
        details.capabilities = capabilities(5, 0, (1, 1), (1, 1), (1, 1));
        assert_eq!(details.choose_image_count(), 6);
    }

    #[test]
    fn sharing_is_exclusive_for_a_shared_family() {
        let details = support(
            vec![format(Format::B8G8R8A8_SRGB, ColorSpaceKHR::SRGB_NONLINEAR)],
            vec![PresentModeKHR::FIFO],
        );
        let config = details.negotiate(0, 0, (800, 600));
        assert!(matches!(config.sharing, SharingStrategy::Exclusive));
    }

    #[test]
    fn sharing_is_concurrent_across_distinct_families() {
        let details = support(
            vec![format(Format::B8G8R8A8_SRGB, ColorSpaceKHR::SRGB_NONLINEAR)],
            vec![PresentModeKHR::FIFO],
        );
        let config = details.negotiate(0, 2, (800, 600));
        match config.sharing {
            SharingStrategy::Concurrent {
                queue_family_indices,
            } => assert_eq!(queue_family_indices, vec![0, 2]),
            SharingStrategy::Exclusive => panic!("expected concurrent sharing"),
        }
    }

    #[test]
    fn negotiation_is_idempotent() {
        let details = support(
            vec![
                format(Format::R8G8B8A8_SRGB, ColorSpaceKHR::SRGB_NONLINEAR),
                format(Format::B8G8R8A8_SRGB, ColorSpaceKHR::SRGB_NONLINEAR),
            ],
            vec![PresentModeKHR::FIFO, PresentModeKHR::MAILBOX],
        );

        let first = details.negotiate(0, 1, (800, 600));
        let second = details.negotiate(0, 1, (800, 600));

        assert_eq!(first.surface_format.format, second.surface_format.format);
        assert_eq!(
            first.surface_format.color_space,
            second.surface_format.color_space
        );
        assert_eq!(first.present_mode, second.present_mode);
        assert_eq!(first.extent, second.extent);
        assert_eq!(first.image_count, second.image_count);
    }

    #[test]
    fn empty_format_list_is_not_adequate() {
        // such a device is rejected during selection even if its queue
        // families are complete and its extensions check out
        let no_formats = support(vec![], vec![PresentModeKHR::FIFO]);
        assert!(!no_formats.is_adequate());

        let no_modes = support(
            vec![format(Format::B8G8R8A8_SRGB, ColorSpaceKHR::SRGB_NONLINEAR)],
            vec![],
        );
        assert!(!no_modes.is_adequate());

        let both = support(
            vec![format(Format::B8G8R8A8_SRGB, ColorSpaceKHR::SRGB_NONLINEAR)],
            vec![PresentModeKHR::FIFO],
        );
        assert!(both.is_adequate());
    }
}
