//! Host-visible buffers for vertices, indices and uniforms

use ash::{vk, Device};

use super::{VulkanContext, VulkanError, VulkanResult};

/// Buffer and its memory; host visible and coherent so writes need no flush
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create an uninitialized buffer of `size` bytes
    pub fn new(context: &VulkanContext, size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> VulkanResult<Self> {
        let device = context.device().clone();
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size.max(1))
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe { device.create_buffer(&buffer_info, None)? };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory_type_index = match context.find_memory_type(
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ) {
            Ok(index) => index,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);
        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e.into());
            }
        };

        let wrapper = Self {
            device,
            buffer,
            memory,
            size,
        };
        unsafe { wrapper.device.bind_buffer_memory(buffer, memory, 0)? };
        Ok(wrapper)
    }

    /// Create a buffer holding exactly `data`
    pub fn with_data<T: bytemuck::Pod>(
        context: &VulkanContext,
        data: &[T],
        usage: vk::BufferUsageFlags,
    ) -> VulkanResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let buffer = Self::new(context, bytes.len() as vk::DeviceSize, usage)?;
        buffer.write(bytes)?;
        Ok(buffer)
    }

    /// Copy `bytes` to the start of the buffer
    pub fn write(&self, bytes: &[u8]) -> VulkanResult<()> {
        let requested = bytes.len() as vk::DeviceSize;
        if requested > self.size {
            return Err(VulkanError::BufferOverflow {
                requested,
                capacity: self.size,
            });
        }
        if bytes.is_empty() {
            return Ok(());
        }

        unsafe {
            let ptr = self
                .device
                .map_memory(self.memory, 0, requested, vk::MemoryMapFlags::empty())?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            self.device.unmap_memory(self.memory);
        }
        Ok(())
    }

    /// Buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}
