//! Asset loading: PNG textures and OBJ meshes
//!
//! Loading never aborts the game. A texture or mesh that fails to load is
//! logged and handed back as the null handle; the backend draws a null texture
//! as plain white and skips draws of a null mesh.

pub mod image_loader;
pub mod obj_loader;

use std::path::Path;

use thiserror::Error;

pub use image_loader::ImageData;
pub use obj_loader::{ObjError, ObjLoader};

use crate::render::api::{MeshHandle, RenderBackend, TextureHandle};
use crate::render::RenderError;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// IO error during asset loading
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// OBJ parsing failed
    #[error("OBJ error: {0}")]
    Obj(#[from] ObjError),

    /// The backend rejected the decoded data
    #[error("Upload failed: {0}")]
    Upload(#[from] RenderError),
}

/// Decode `path` and upload it as a texture
pub fn try_load_texture(backend: &mut dyn RenderBackend, path: impl AsRef<Path>) -> Result<TextureHandle, AssetError> {
    let image = ImageData::from_file(path)?;
    Ok(backend.create_texture(&image)?)
}

/// Parse `path` as OBJ and upload it as a mesh
pub fn try_load_mesh(backend: &mut dyn RenderBackend, path: impl AsRef<Path>) -> Result<MeshHandle, AssetError> {
    let mesh = ObjLoader::load_obj(path)?;
    Ok(backend.create_mesh(&mesh)?)
}

/// Load a texture, or log the failure and return [`TextureHandle::NULL`]
pub fn load_texture(backend: &mut dyn RenderBackend, path: impl AsRef<Path>) -> TextureHandle {
    let path = path.as_ref();
    match try_load_texture(backend, path) {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("Failed to load texture {:?}: {}", path, e);
            TextureHandle::NULL
        }
    }
}

/// Load a mesh, or log the failure and return [`MeshHandle::NULL`]
pub fn load_mesh(backend: &mut dyn RenderBackend, path: impl AsRef<Path>) -> MeshHandle {
    let path = path.as_ref();
    match try_load_mesh(backend, path) {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("Failed to load mesh {:?}: {}", path, e);
            MeshHandle::NULL
        }
    }
}
