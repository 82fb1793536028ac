//! Render pass, depth buffer and framebuffers

use ash::{vk, Device};

use super::swapchain::Swapchain;
use super::texture::Image;
use super::{VulkanContext, VulkanResult};

/// Depth attachment format
pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Single-subpass render pass: colour cleared and presented, depth cleared
pub struct RenderPassObject {
    device: Device,
    render_pass: vk::RenderPass,
}

impl RenderPassObject {
    /// Create the forward pass for `color_format`
    pub fn new(device: Device, color_format: vk::Format) -> VulkanResult<Self> {
        let attachments = [
            vk::AttachmentDescription::builder()
                .format(color_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
                .build(),
            vk::AttachmentDescription::builder()
                .format(DEPTH_FORMAT)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .build(),
        ];

        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let depth_ref = vk::AttachmentReference {
            attachment: 1,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };
        let subpasses = [vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref)
            .build()];

        let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
        let dependencies = [vk::SubpassDependency::builder()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stages)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(stages)
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
            .build()];

        let create_info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);
        let render_pass = unsafe { device.create_render_pass(&create_info, None)? };

        Ok(Self { device, render_pass })
    }

    /// Render pass handle
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }
}

impl Drop for RenderPassObject {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

/// Depth image plus one framebuffer per swapchain image; rebuilt with the swapchain
pub struct RenderTargets {
    device: Device,
    framebuffers: Vec<vk::Framebuffer>,
    depth: Image,
}

impl RenderTargets {
    /// Build targets for every image in `swapchain`
    pub fn new(context: &VulkanContext, render_pass: &RenderPassObject, swapchain: &Swapchain) -> VulkanResult<Self> {
        let extent = swapchain.extent();
        let depth = Image::new(
            context,
            extent,
            DEPTH_FORMAT,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::ImageAspectFlags::DEPTH,
        )?;

        let mut targets = Self {
            device: context.device().clone(),
            framebuffers: Vec::with_capacity(swapchain.image_views().len()),
            depth,
        };
        for &view in swapchain.image_views() {
            let attachments = [view, targets.depth.view()];
            let create_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass.handle())
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);
            let framebuffer = unsafe { targets.device.create_framebuffer(&create_info, None)? };
            targets.framebuffers.push(framebuffer);
        }
        Ok(targets)
    }

    /// Framebuffer for swapchain image `index`
    pub fn framebuffer(&self, index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(index as usize).copied()
    }
}

impl Drop for RenderTargets {
    fn drop(&mut self) {
        unsafe {
            for &framebuffer in &self.framebuffers {
                self.device.destroy_framebuffer(framebuffer, None);
            }
        }
    }
}
