//! Game asset loading
//!
//! Missing or broken files never stop the game: the engine hands back null
//! handles, which draw as untextured (white) or not at all.

use invaders_engine::assets::{load_mesh, load_texture};
use invaders_engine::render::{
    Font, FontMetrics, GraphicsEngine, Mesh, RenderBackend, RenderObject, RenderResult, TextureHandle,
};

use crate::config::AssetManifest;
use crate::state::SceneObjects;

/// 16x16 glyph sheet covering character codes 0..256
pub const SMALL_FONT: FontMetrics = FontMetrics {
    base: 0,
    texture_height: 256.0,
    lines: 16.0,
    glyph_width: 16.0,
    glyph_height: 16.0,
};

/// 32x48 glyph sheet starting at the space character
pub const BIG_FONT: FontMetrics = FontMetrics {
    base: 32,
    texture_height: 512.0,
    lines: 9.5,
    glyph_width: 32.0,
    glyph_height: 48.0,
};

/// Everything loaded at startup
pub struct GameAssets {
    /// Cube, loaded with the rest though nothing draws it; the built-in cube
    /// stands in when the model is missing
    pub cube: RenderObject,
    /// Ship, alien, shot and explosion
    pub scene: SceneObjects,
    /// Small HUD font
    pub small_font: Font,
    /// Large HUD font
    pub big_font: Font,
    /// Font sheet textures (owned here, not by the fonts)
    font_textures: [TextureHandle; 2],
}

fn object(backend: &mut dyn RenderBackend, model: &str, texture: &str) -> RenderObject {
    let texture = load_texture(backend, texture);
    let mesh = load_mesh(backend, model);
    RenderObject::new(mesh, texture)
}

impl GameAssets {
    /// Load every texture and model in `manifest` and build the fonts
    pub fn load(graphics: &mut GraphicsEngine, manifest: &AssetManifest) -> RenderResult<Self> {
        let backend = graphics.backend_mut();
        let mut cube = object(backend, &manifest.cube_model, &manifest.cube_texture);
        if cube.mesh.is_null() {
            cube.mesh = backend.create_mesh(&Mesh::cube())?;
        }
        let scene = SceneObjects {
            ship: object(backend, &manifest.ship_model, &manifest.ship_texture),
            alien: object(backend, &manifest.alien_model, &manifest.alien_texture),
            shot: object(backend, &manifest.shot_model, &manifest.shot_texture),
            explosion: load_texture(backend, &manifest.explosion_texture),
        };

        let small_texture = load_texture(backend, &manifest.small_font);
        let big_texture = load_texture(backend, &manifest.big_font);
        let small_font = graphics.create_font(small_texture, SMALL_FONT)?;
        let big_font = graphics.create_font(big_texture, BIG_FONT)?;

        let assets = Self {
            cube,
            scene,
            small_font,
            big_font,
            font_textures: [small_texture, big_texture],
        };
        log::info!("Loaded assets ({} missing)", assets.missing());
        Ok(assets)
    }

    /// Number of handles that failed to load
    pub fn missing(&self) -> usize {
        let meshes = [self.cube.mesh, self.scene.ship.mesh, self.scene.alien.mesh, self.scene.shot.mesh];
        let textures = [
            self.cube.texture,
            self.scene.ship.texture,
            self.scene.alien.texture,
            self.scene.shot.texture,
            self.scene.explosion,
            self.font_textures[0],
            self.font_textures[1],
        ];
        meshes.iter().filter(|mesh| mesh.is_null()).count() + textures.iter().filter(|tex| tex.is_null()).count()
    }

    /// Release fonts, meshes and textures
    pub fn release(self, backend: &mut dyn RenderBackend) {
        self.small_font.destroy(backend);
        self.big_font.destroy(backend);

        let objects = [self.cube, self.scene.ship, self.scene.alien, self.scene.shot];
        for RenderObject { mesh, texture } in objects {
            backend.destroy_mesh(mesh);
            backend.destroy_texture(texture);
        }
        for texture in [self.scene.explosion, self.font_textures[0], self.font_textures[1]] {
            backend.destroy_texture(texture);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invaders_engine::render::backends::RecordingBackend;

    fn graphics() -> GraphicsEngine {
        GraphicsEngine::new(Box::new(RecordingBackend::new(640, 480)), [0.0; 4]).unwrap()
    }

    fn recording(graphics: &GraphicsEngine) -> &RecordingBackend {
        graphics.backend().as_any().downcast_ref::<RecordingBackend>().unwrap()
    }

    fn missing_manifest() -> AssetManifest {
        let dir = "does/not/exist";
        AssetManifest {
            cube_texture: format!("{dir}/dice.png"),
            ship_texture: format!("{dir}/ship.png"),
            alien_texture: format!("{dir}/alien.png"),
            shot_texture: format!("{dir}/shot.png"),
            explosion_texture: format!("{dir}/explosion.png"),
            small_font: format!("{dir}/font.png"),
            big_font: format!("{dir}/bigfont.png"),
            cube_model: format!("{dir}/cube.obj"),
            ship_model: format!("{dir}/ship.obj"),
            alien_model: format!("{dir}/alien.obj"),
            shot_model: format!("{dir}/shot.obj"),
        }
    }

    #[test]
    fn test_missing_files_load_as_null() {
        let mut graphics = graphics();
        let assets = GameAssets::load(&mut graphics, &missing_manifest()).unwrap();
        assert_eq!(assets.missing(), 10);
        assert!(!assets.cube.mesh.is_null());
        assert!(assets.scene.ship.mesh.is_null());
        assert!(assets.scene.alien.texture.is_null());
        // Fonts still get their quad buffers
        assert!(!assets.small_font.vertices().is_null());
        assert_eq!(assets.big_font.metrics().base, 32);
    }

    #[test]
    fn test_release_frees_font_buffers() {
        let mut graphics = graphics();
        let before = recording(&graphics).live_resources().2;
        let assets = GameAssets::load(&mut graphics, &missing_manifest()).unwrap();
        assert_eq!(recording(&graphics).live_resources().2, before + 4);

        assets.release(graphics.backend_mut());
        assert_eq!(recording(&graphics).live_resources(), (0, 0, before));
    }
}
