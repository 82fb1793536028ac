//! Vulkan rendering backend
//!
//! One frame in flight, one render pass with a colour and a depth attachment,
//! and one graphics pipeline per [`RenderPass`](crate::render::RenderPass).
//! Every wrapper owns its Vulkan object and destroys it on drop.

pub mod backend;
pub mod buffer;
pub mod context;
pub mod pipeline;
pub mod swapchain;
pub mod sync;
pub mod targets;
pub mod texture;

use ash::vk;
use thiserror::Error;

pub use backend::VulkanBackend;
pub use context::VulkanContext;

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// No suitable memory type found for allocation
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,

    /// Write past the end of a buffer
    #[error("Write of {requested} bytes into buffer of {capacity}")]
    BufferOverflow {
        /// Bytes asked to write
        requested: u64,
        /// Buffer size in bytes
        capacity: u64,
    },

    /// Every texture descriptor set is in use
    #[error("Texture limit of {0} reached")]
    TextureLimit(u32),
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

impl From<vk::Result> for VulkanError {
    fn from(result: vk::Result) -> Self {
        VulkanError::Api(result)
    }
}
