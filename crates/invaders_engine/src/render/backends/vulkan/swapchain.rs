//! Swapchain creation and recreation

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

use super::{VulkanContext, VulkanError, VulkanResult};

/// Swapchain, its images and their views
pub struct Swapchain {
    device: Device,
    loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain for the context's surface.
    ///
    /// `window_extent` is used only when the surface leaves the size to the
    /// application. Pass the previous swapchain as `old` when recreating.
    pub fn new(
        context: &VulkanContext,
        window_extent: vk::Extent2D,
        old: Option<&Swapchain>,
        prefer_mailbox: bool,
    ) -> VulkanResult<Self> {
        let device = context.device().clone();
        let loader = SwapchainLoader::new(context.instance(), &device);
        let physical_device = context.physical_device.device;
        let surface = context.surface;

        let caps = unsafe {
            context
                .surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)?
        };
        let formats = unsafe {
            context
                .surface_loader
                .get_physical_device_surface_formats(physical_device, surface)?
        };
        let present_modes = unsafe {
            context
                .surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)?
        };

        let format = formats
            .iter()
            .find(|sf| sf.format == vk::Format::B8G8R8A8_SRGB && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
            .or_else(|| formats.first())
            .copied()
            .ok_or_else(|| VulkanError::InitializationFailed("Surface reports no formats".to_string()))?;

        let present_mode = if prefer_mailbox && present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
            vk::PresentModeKHR::MAILBOX
        } else {
            vk::PresentModeKHR::FIFO
        };

        let extent = if caps.current_extent.width != u32::MAX {
            caps.current_extent
        } else {
            vk::Extent2D {
                width: window_extent
                    .width
                    .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
                height: window_extent
                    .height
                    .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
            }
        };

        let mut image_count = caps.min_image_count + 1;
        if caps.max_image_count > 0 {
            image_count = image_count.min(caps.max_image_count);
        }

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old.map_or(vk::SwapchainKHR::null(), |s| s.swapchain));

        let swapchain = unsafe { loader.create_swapchain(&create_info, None)? };
        let images = unsafe { loader.get_swapchain_images(swapchain)? };

        let mut chain = Self {
            device,
            loader,
            swapchain,
            image_views: Vec::with_capacity(images.len()),
            format,
            extent,
        };
        for image in images {
            let view = create_color_view(&chain.device, image, format.format)?;
            chain.image_views.push(view);
        }

        log::info!(
            "Swapchain {}x{} with {} images ({:?})",
            extent.width,
            extent.height,
            chain.image_views.len(),
            present_mode
        );
        Ok(chain)
    }

    /// Image size
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Image format
    pub fn format(&self) -> vk::Format {
        self.format.format
    }

    /// One view per swapchain image
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Acquire the next image. `Ok(None)` means the swapchain must be recreated.
    pub fn acquire_next_image(&self, signal: vk::Semaphore) -> VulkanResult<Option<u32>> {
        match unsafe {
            self.loader
                .acquire_next_image(self.swapchain, u64::MAX, signal, vk::Fence::null())
        } {
            Ok((index, _suboptimal)) => Ok(Some(index)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Present `image_index`. `Ok(false)` means the swapchain should be recreated.
    pub fn present(&self, queue: vk::Queue, image_index: u32, wait: vk::Semaphore) -> VulkanResult<bool> {
        let wait_semaphores = [wait];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.loader.queue_present(queue, &present_info) } {
            Ok(suboptimal) => Ok(!suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// 2D colour view over the whole of `image`
pub fn create_color_view(device: &Device, image: vk::Image, format: vk::Format) -> VulkanResult<vk::ImageView> {
    create_view(device, image, format, vk::ImageAspectFlags::COLOR)
}

/// 2D view of one aspect over the whole of `image`
pub fn create_view(
    device: &Device,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
) -> VulkanResult<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });
    Ok(unsafe { device.create_image_view(&create_info, None)? })
}
