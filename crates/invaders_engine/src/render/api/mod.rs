//! Backend-facing rendering API

pub mod render_backend;

pub use render_backend::{
    BackendResult, BufferHandle, BufferUsage, MeshDraw, MeshHandle, PassState, PassTracker, PointsDraw, QuadDraw,
    RenderBackend, RenderPass, TextureHandle,
};
