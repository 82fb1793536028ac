//! Rendering backends

pub mod recording;
pub mod vulkan;

pub use recording::RecordingBackend;
pub use vulkan::VulkanBackend;
