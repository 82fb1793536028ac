//! Command pool and per-frame synchronization

use ash::{vk, Device};

use super::VulkanResult;

/// Command pool with resettable buffers on the graphics queue family
pub struct CommandPool {
    device: Device,
    pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a pool for `queue_family`
    pub fn new(device: Device, queue_family: u32) -> VulkanResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let pool = unsafe { device.create_command_pool(&create_info, None)? };
        Ok(Self { device, pool })
    }

    /// Allocate one primary command buffer
    pub fn allocate(&self) -> VulkanResult<vk::CommandBuffer> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.device.allocate_command_buffers(&allocate_info)? };
        Ok(buffers[0])
    }

    /// Record and submit a one-off command buffer, then wait for the queue
    pub fn submit_once<F>(&self, queue: vk::Queue, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&Device, vk::CommandBuffer),
    {
        let command_buffer = self.allocate()?;
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        let result = unsafe {
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .and_then(|()| {
                    record(&self.device, command_buffer);
                    self.device.end_command_buffer(command_buffer)
                })
                .and_then(|()| {
                    let command_buffers = [command_buffer];
                    let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);
                    self.device
                        .queue_submit(queue, &[submit_info.build()], vk::Fence::null())
                })
                .and_then(|()| self.device.queue_wait_idle(queue))
        };

        unsafe { self.device.free_command_buffers(self.pool, &[command_buffer]) };
        Ok(result?)
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.pool, None);
        }
    }
}

/// Semaphores and fence for the single frame in flight
pub struct FrameSync {
    device: Device,
    /// Signalled when the swapchain image is ready to render into
    pub image_available: vk::Semaphore,
    /// Signalled when rendering finished and the image may be presented
    pub render_finished: vk::Semaphore,
    /// Signalled when the GPU finished the frame's commands
    pub in_flight: vk::Fence,
}

impl FrameSync {
    /// Create the objects; the fence starts signalled so the first wait returns at once
    pub fn new(device: Device) -> VulkanResult<Self> {
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);
        unsafe {
            let image_available = device.create_semaphore(&semaphore_info, None)?;
            let render_finished = device.create_semaphore(&semaphore_info, None)?;
            let in_flight = device.create_fence(&fence_info, None)?;
            Ok(Self {
                device,
                image_available,
                render_finished,
                in_flight,
            })
        }
    }

    /// Block until the previous frame's commands completed
    pub fn wait(&self) -> VulkanResult<()> {
        unsafe { self.device.wait_for_fences(&[self.in_flight], true, u64::MAX)? };
        Ok(())
    }

    /// Unsignal the fence right before a submit
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe { self.device.reset_fences(&[self.in_flight])? };
        Ok(())
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.image_available, None);
            self.device.destroy_semaphore(self.render_finished, None);
            self.device.destroy_fence(self.in_flight, None);
        }
    }
}
