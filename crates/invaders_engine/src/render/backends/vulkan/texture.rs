//! Device-local images and sampled textures

use ash::{vk, Device};

use super::buffer::Buffer;
use super::swapchain::create_view;
use super::sync::CommandPool;
use super::{VulkanContext, VulkanResult};

/// Device-local 2D image with one view
pub struct Image {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
}

impl Image {
    /// Allocate a single-mip 2D image and a view of `aspect`
    pub fn new(
        context: &VulkanContext,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        aspect: vk::ImageAspectFlags,
    ) -> VulkanResult<Self> {
        let device = context.device().clone();
        let create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);
        let image = unsafe { device.create_image(&create_info, None)? };

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory = context
            .find_memory_type(requirements.memory_type_bits, vk::MemoryPropertyFlags::DEVICE_LOCAL)
            .and_then(|memory_type_index| {
                let allocate_info = vk::MemoryAllocateInfo::builder()
                    .allocation_size(requirements.size)
                    .memory_type_index(memory_type_index);
                Ok(unsafe { device.allocate_memory(&allocate_info, None)? })
            });
        let memory = match memory {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let mut wrapper = Self {
            device,
            image,
            memory,
            view: vk::ImageView::null(),
        };
        unsafe { wrapper.device.bind_image_memory(image, memory, 0)? };
        wrapper.view = create_view(&wrapper.device, image, format, aspect)?;
        Ok(wrapper)
    }

    /// Image handle
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// View handle
    pub fn view(&self) -> vk::ImageView {
        self.view
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.device.destroy_image_view(self.view, None);
            }
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Sampled RGBA8 texture with its own sampler
pub struct Texture {
    device: Device,
    image: Image,
    sampler: vk::Sampler,
    extent: vk::Extent2D,
}

impl Texture {
    /// Upload tightly packed RGBA8 `pixels` through a staging buffer
    pub fn from_rgba(
        context: &VulkanContext,
        commands: &CommandPool,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> VulkanResult<Self> {
        let extent = vk::Extent2D { width, height };
        let image = Image::new(
            context,
            extent,
            vk::Format::R8G8B8A8_SRGB,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            vk::ImageAspectFlags::COLOR,
        )?;

        let staging = Buffer::with_data(context, pixels, vk::BufferUsageFlags::TRANSFER_SRC)?;
        commands.submit_once(context.device.graphics_queue, |device, command_buffer| {
            record_upload(device, command_buffer, staging.handle(), image.handle(), extent);
        })?;

        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::NEAREST);
        let device = context.device().clone();
        let sampler = unsafe { device.create_sampler(&sampler_info, None)? };

        log::debug!("Uploaded texture {}x{}", width, height);
        Ok(Self {
            device,
            image,
            sampler,
            extent,
        })
    }

    /// 1x1 opaque white, bound wherever a draw has no texture
    pub fn white(context: &VulkanContext, commands: &CommandPool) -> VulkanResult<Self> {
        Self::from_rgba(context, commands, 1, 1, &[255, 255, 255, 255])
    }

    /// Image view for descriptor writes
    pub fn view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Sampler for descriptor writes
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }

    /// Size in pixels
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}

/// Layout transition to transfer destination, copy, transition to shader read
fn record_upload(
    device: &Device,
    command_buffer: vk::CommandBuffer,
    staging: vk::Buffer,
    image: vk::Image,
    extent: vk::Extent2D,
) {
    let range = vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    };

    let to_transfer = vk::ImageMemoryBarrier::builder()
        .old_layout(vk::ImageLayout::UNDEFINED)
        .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(range)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .build();

    let region = vk::BufferImageCopy::builder()
        .image_subresource(vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        })
        .image_extent(vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        })
        .build();

    let to_shader = vk::ImageMemoryBarrier::builder()
        .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(range)
        .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .dst_access_mask(vk::AccessFlags::SHADER_READ)
        .build();

    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[to_transfer],
        );
        device.cmd_copy_buffer_to_image(
            command_buffer,
            staging,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[to_shader],
        );
    }
}
