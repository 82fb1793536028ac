//! Game state and the per-tick update
//!
//! All pools are sized once at startup. Nothing is allocated or freed while
//! playing: shots and aliens are recycled through their flags, and every
//! alien keeps its own explosion effect for the whole run.

use invaders_engine::foundation::math::{Mat4, Vec3};
use invaders_engine::input::InputState;
use invaders_engine::render::{
    compose, GraphicsEngine, PointCloud, RenderBackend, RenderObject, RenderResult, Rotation, TextureHandle,
};
use rand::Rng;

use crate::config::{CameraConfig, GameplayConfig};
use crate::pid::{self, PidState};

/// Yaw that turns the ship model to face down -Z
const SHIP_YAW: f32 = 3.1416;
/// Visual roll per unit of controller roll
const SHIP_ROLL_SCALE: f32 = 3.0;
/// Forward tilt of every alien
const ALIEN_PITCH: f32 = 0.2;
/// Shots tumble this many times faster than the phase
const SHOT_SPIN: f32 = 4.0;
/// Range each explosion velocity component is drawn from before normalizing
const EXPLOSION_SPREAD: std::ops::Range<f32> = -1.0..1.0;
/// Aliens per row in a wave
const ALIENS_PER_ROW: usize = 6;

/// What the world is drawn with
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneObjects {
    /// Player ship
    pub ship: RenderObject,
    /// Alien
    pub alien: RenderObject,
    /// Player shot
    pub shot: RenderObject,
    /// Explosion point sprite
    pub explosion: TextureHandle,
}

/// The player ship
#[derive(Debug, Clone, Default)]
pub struct Player {
    /// World position
    pub position: Vec3,
    /// Roll the controller steers towards; set by movement, cleared every tick
    pub roll_intent: f32,
    /// Current smoothed roll
    pub roll: f32,
    /// Ticks until the next shot may fire (fires once below zero)
    pub fire_count: i32,
    /// Roll controller memory
    pub pid: PidState,
}

/// One slot of the shot pool
#[derive(Debug, Clone, Copy, Default)]
pub struct Shot {
    /// World position
    pub position: Vec3,
    /// Whether the slot is in flight
    pub alive: bool,
}

/// One slot of the alien pool.
///
/// Never `alive` and `exploding` at once.
#[derive(Debug)]
pub struct Alien {
    /// World position
    pub position: Vec3,
    /// Still in formation
    pub alive: bool,
    /// Playing its explosion
    pub exploding: bool,
    /// The explosion, reused on every hit
    pub explosion: PointCloud,
}

impl Alien {
    /// Neither alive nor exploding
    pub fn is_idle(&self) -> bool {
        !self.alive && !self.exploding
    }
}

/// Everything that changes while playing
#[derive(Debug)]
pub struct GameState {
    gameplay: GameplayConfig,
    camera: CameraConfig,
    frame: u64,
    phase: f32,
    player: Player,
    shots: Vec<Shot>,
    aliens: Vec<Alien>,
    eye: Vec3,
    centre: Vec3,
}

impl GameState {
    /// Build the pools, one explosion buffer per alien, and lay out the first wave
    pub fn new<R: Rng + ?Sized>(
        backend: &mut dyn RenderBackend,
        gameplay: &GameplayConfig,
        camera: &CameraConfig,
        rng: &mut R,
    ) -> RenderResult<Self> {
        let mut aliens = Vec::with_capacity(gameplay.max_aliens);
        for _ in 0..gameplay.max_aliens {
            let mut explosion = PointCloud::create(backend, gameplay.explosion_particles)?;
            explosion.reset(rng, EXPLOSION_SPREAD);
            aliens.push(Alien {
                position: Vec3::zeros(),
                alive: false,
                exploding: false,
                explosion,
            });
        }

        let mut state = Self {
            gameplay: gameplay.clone(),
            camera: camera.clone(),
            frame: 0,
            phase: 0.0,
            player: Player::default(),
            shots: vec![Shot::default(); gameplay.max_shots],
            aliens,
            eye: Vec3::from(camera.eye),
            centre: Vec3::from(camera.centre),
        };
        state.reset_aliens();
        log::info!(
            "Game state ready: {} aliens, {} shot slots",
            state.aliens.len(),
            state.shots.len()
        );
        Ok(state)
    }

    /// Put every alien back in formation: two rows of six, the back row two
    /// units further away
    pub fn reset_aliens(&mut self) {
        for (n, alien) in self.aliens.iter_mut().enumerate() {
            let mut x = -5.0 + 2.0 * n as f32;
            let mut z = -6.0;
            if n >= ALIENS_PER_ROW {
                x -= 2.0 * ALIENS_PER_ROW as f32;
                z = -8.0;
            }
            alien.position = Vec3::new(x, 0.0, z);
            alien.alive = true;
            alien.exploding = false;
        }
        log::debug!("Wave reset at frame {}", self.frame);
    }

    /// Advance one tick and queue its draws.
    ///
    /// Draws use the view from the end of the previous tick; the camera is
    /// moved last. A failed draw never stops the simulation.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        graphics: &mut GraphicsEngine,
        scene: &SceneObjects,
        input: InputState,
        rng: &mut R,
    ) {
        self.frame = self.frame.wrapping_add(1);
        self.phase = self.frame as f32 * self.gameplay.phase_step;

        self.update_player(graphics, scene);
        self.handle_fire(input);
        self.advance_shots(graphics, scene);
        self.handle_movement(input);
        self.track_player();

        let idle = self.update_aliens(graphics, scene, rng);
        if idle == self.aliens.len() {
            self.reset_aliens();
        }

        self.update_explosions(graphics, scene);
        self.apply_camera(graphics);
    }

    fn update_player(&mut self, graphics: &mut GraphicsEngine, scene: &SceneObjects) {
        let player = &mut self.player;
        player.roll += pid::step(player.roll_intent, player.roll, &mut player.pid) / 2.0;

        let model = compose(
            player.position,
            Rotation::new(0.0, SHIP_YAW, -player.roll * SHIP_ROLL_SCALE),
        );
        graphics.draw_object(&scene.ship, &model);
    }

    /// Fire from the first free slot when the trigger is held and the
    /// cooldown has run out. A full pool drops the shot.
    fn handle_fire(&mut self, input: InputState) {
        self.player.fire_count = self.player.fire_count.saturating_sub(1);
        if !input.contains(InputState::FIRE) || self.player.fire_count >= 0 {
            return;
        }
        if let Some(shot) = self.shots.iter_mut().find(|shot| !shot.alive) {
            shot.alive = true;
            shot.position = self.player.position;
            self.player.fire_count = self.gameplay.fire_cooldown;
        }
    }

    fn advance_shots(&mut self, graphics: &mut GraphicsEngine, scene: &SceneObjects) {
        let spin = Rotation::new(self.phase * SHOT_SPIN, 0.0, -self.phase * SHOT_SPIN);
        for shot in self.shots.iter_mut().filter(|shot| shot.alive) {
            shot.position.z -= self.gameplay.shot_speed;
            if shot.position.z < self.gameplay.shot_limit {
                shot.alive = false;
            }
            // Drawn once more on the tick it leaves the field
            graphics.draw_object(&scene.shot, &compose(shot.position, spin));
        }
    }

    fn handle_movement(&mut self, input: InputState) {
        let limit = self.gameplay.lateral_limit;
        let player = &mut self.player;
        player.roll_intent = 0.0;

        if input.contains(InputState::LEFT) && player.position.x > -limit {
            player.position.x -= self.gameplay.lateral_speed;
            player.roll_intent = self.gameplay.roll_intent;
        }
        if input.contains(InputState::RIGHT) && player.position.x < limit {
            player.position.x += self.gameplay.lateral_speed;
            player.roll_intent = -self.gameplay.roll_intent;
        }
        player.position.x = player.position.x.clamp(-limit, limit);
    }

    fn track_player(&mut self) {
        let position = self.player.position;
        self.eye.x = position.x * self.camera.eye_follow;
        self.centre = Vec3::new(position.x, position.y + self.camera.centre_height, position.z);
    }

    /// Draw live aliens, resolve hits, and return how many aliens are idle
    fn update_aliens<R: Rng + ?Sized>(
        &mut self,
        graphics: &mut GraphicsEngine,
        scene: &SceneObjects,
        rng: &mut R,
    ) -> usize {
        let tilt = Rotation::new(ALIEN_PITCH, 0.0, 0.0);
        let hit_radius = self.gameplay.hit_radius;
        let mut idle = 0;

        for alien in &mut self.aliens {
            if alien.alive {
                graphics.draw_object(&scene.alien, &compose(alien.position, tilt));

                // Every shot in range is spent, even when several reach the same alien
                let mut hit = false;
                for shot in self.shots.iter_mut().filter(|shot| shot.alive) {
                    if (alien.position - shot.position).norm() < hit_radius {
                        shot.alive = false;
                        hit = true;
                    }
                }
                if hit {
                    alien.alive = false;
                    alien.exploding = true;
                    alien.explosion.reset(rng, EXPLOSION_SPREAD);
                }
            }
            if alien.is_idle() {
                idle += 1;
            }
        }
        idle
    }

    fn update_explosions(&mut self, graphics: &mut GraphicsEngine, scene: &SceneObjects) {
        for alien in self.aliens.iter_mut().filter(|alien| alien.exploding) {
            let model = Mat4::new_translation(&alien.position);
            if let Err(e) = graphics.draw_particles(&alien.explosion, &model, scene.explosion) {
                log::warn!("Explosion at {:?} not drawn: {}", alien.position, e);
            }
            alien.explosion.advance();
            if alien.explosion.is_finished() {
                alien.exploding = false;
            }
        }
    }

    fn apply_camera(&self, graphics: &mut GraphicsEngine) {
        let camera = graphics.camera_mut();
        camera.set_position(self.eye);
        camera.set_target(self.centre);
        graphics.refresh_view();
    }

    /// Release every explosion buffer
    pub fn destroy(self, backend: &mut dyn RenderBackend) {
        for alien in self.aliens {
            alien.explosion.destroy(backend);
        }
    }

    /// Ticks so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Rotation phase in radians
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// The player
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// The shot pool
    pub fn shots(&self) -> &[Shot] {
        &self.shots
    }

    /// The alien pool
    pub fn aliens(&self) -> &[Alien] {
        &self.aliens
    }

    /// Camera eye as of the last tick
    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    /// Camera centre as of the last tick
    pub fn centre(&self) -> Vec3 {
        self.centre
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use invaders_engine::render::backends::RecordingBackend;
    use invaders_engine::render::MeshHandle;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Harness {
        graphics: GraphicsEngine,
        state: GameState,
        scene: SceneObjects,
        rng: StdRng,
    }

    impl Harness {
        fn new() -> Self {
            let mut graphics =
                GraphicsEngine::new(Box::new(RecordingBackend::new(640, 480)), [0.0, 0.5, 1.0, 1.0]).unwrap();
            let mut rng = StdRng::seed_from_u64(42);
            let state = GameState::new(
                graphics.backend_mut(),
                &GameplayConfig::default(),
                &CameraConfig::default(),
                &mut rng,
            )
            .unwrap();
            let scene = SceneObjects {
                ship: RenderObject::new(MeshHandle(1), TextureHandle(11)),
                alien: RenderObject::new(MeshHandle(2), TextureHandle(12)),
                shot: RenderObject::new(MeshHandle(3), TextureHandle(13)),
                explosion: TextureHandle(14),
            };
            Self {
                graphics,
                state,
                scene,
                rng,
            }
        }

        fn tick(&mut self, input: InputState) {
            self.state.tick(&mut self.graphics, &self.scene, input, &mut self.rng);
        }

        /// Tick and drop the queued draws, as a presented frame would
        fn run(&mut self, input: InputState, ticks: usize) {
            for _ in 0..ticks {
                self.tick(input);
                self.graphics.render_frame().unwrap();
            }
        }

        fn alive_shots(&self) -> usize {
            self.state.shots().iter().filter(|shot| shot.alive).count()
        }
    }

    #[test]
    fn test_first_wave_layout() {
        let harness = Harness::new();
        let aliens = harness.state.aliens();
        assert_eq!(aliens.len(), 12);
        assert_eq!(aliens[0].position, Vec3::new(-5.0, 0.0, -6.0));
        assert_eq!(aliens[5].position, Vec3::new(5.0, 0.0, -6.0));
        assert_eq!(aliens[6].position, Vec3::new(-5.0, 0.0, -8.0));
        assert_eq!(aliens[11].position, Vec3::new(5.0, 0.0, -8.0));
        assert!(aliens.iter().all(|alien| alien.alive && !alien.exploding));
    }

    #[test]
    fn test_fire_respects_cooldown_and_pool() {
        let mut harness = Harness::new();
        harness.tick(InputState::FIRE);
        assert_eq!(harness.alive_shots(), 1);
        assert_eq!(harness.state.player().fire_count, 15);

        // Cooldown: 15 more ticks without a new shot
        harness.run(InputState::FIRE, 15);
        assert_eq!(harness.alive_shots(), 1);
        harness.run(InputState::FIRE, 1);
        assert_eq!(harness.alive_shots(), 2);
        harness.run(InputState::FIRE, 16);
        assert_eq!(harness.alive_shots(), 3);
    }

    #[test]
    fn test_fire_with_full_pool_is_noop() {
        let mut harness = Harness::new();
        for shot in &mut harness.state.shots {
            shot.alive = true;
            shot.position = Vec3::new(30.0, 0.0, 0.0);
        }
        harness.state.player.fire_count = -1;

        harness.tick(InputState::FIRE);
        assert_eq!(harness.alive_shots(), 3);
        // Nothing was fired, so no cooldown was started either
        assert_eq!(harness.state.player().fire_count, -2);
    }

    #[test]
    fn test_shots_travel_and_expire() {
        let mut harness = Harness::new();
        // Off to the side so no alien is hit
        harness.state.player.position.x = 9.0;
        harness.tick(InputState::FIRE);
        let shot = harness.state.shots()[0];
        assert_relative_eq!(shot.position.z, -0.08, epsilon = 1e-6);

        // Past -10 after about 125 moves
        harness.run(InputState::empty(), 119);
        assert!(harness.state.shots()[0].alive);
        harness.run(InputState::empty(), 10);
        assert!(!harness.state.shots()[0].alive);
    }

    #[test]
    fn test_player_x_clamps_at_limits() {
        let mut harness = Harness::new();
        harness.run(InputState::LEFT, 150);
        assert_relative_eq!(harness.state.player().position.x, -10.0);
        harness.run(InputState::LEFT, 5);
        assert!(harness.state.player().position.x >= -10.0);

        harness.run(InputState::RIGHT, 300);
        assert_relative_eq!(harness.state.player().position.x, 10.0);
        assert!(harness.state.player().position.x <= 10.0);
    }

    #[test]
    fn test_roll_intent_is_transient() {
        let mut harness = Harness::new();
        harness.tick(InputState::LEFT);
        assert_relative_eq!(harness.state.player().roll_intent, 0.2);
        // Intent is consumed on the following tick
        assert_relative_eq!(harness.state.player().roll, 0.0);

        harness.tick(InputState::RIGHT);
        assert_relative_eq!(harness.state.player().roll_intent, -0.2);
        assert!(harness.state.player().roll > 0.0);

        harness.tick(InputState::empty());
        assert_relative_eq!(harness.state.player().roll_intent, 0.0);
    }

    #[test]
    fn test_alien_explodes_once_per_tick() {
        let mut harness = Harness::new();
        let target = harness.state.aliens[3].position;
        for shot in &mut harness.state.shots {
            shot.alive = true;
            shot.position = target + Vec3::new(0.0, 0.0, 0.1 + 0.08);
        }

        harness.tick(InputState::empty());
        let alien = &harness.state.aliens()[3];
        assert!(!alien.alive && alien.exploding);
        // Every shot in range is spent on the one alien
        assert_eq!(harness.alive_shots(), 0);
        assert_eq!(harness.state.aliens().iter().filter(|a| a.exploding).count(), 1);
    }

    #[test]
    fn test_stacked_shots_do_not_reach_back_row() {
        let mut harness = Harness::new();
        // Front-row alien 0 and back-row alien 6 share a column
        let front = harness.state.aliens[0].position;
        assert_relative_eq!(harness.state.aliens[6].position.x, front.x);
        harness.state.shots[0].alive = true;
        harness.state.shots[0].position = front + Vec3::new(0.0, 0.0, 0.38);
        harness.state.shots[1].alive = true;
        harness.state.shots[1].position = front + Vec3::new(0.0, 0.0, -0.22);

        harness.tick(InputState::empty());
        assert!(harness.state.aliens()[0].exploding);
        assert_eq!(harness.alive_shots(), 0);

        harness.run(InputState::empty(), 40);
        assert!(harness.state.aliens()[6].alive);
    }

    #[test]
    fn test_failed_explosion_upload_still_ages_out() {
        let mut harness = Harness::new();
        harness.state.aliens[0].alive = false;
        harness.state.aliens[0].exploding = true;
        harness.state.aliens[1].alive = false;
        harness.state.aliens[1].exploding = true;
        // Uploads into a released buffer fail
        let buffer = harness.state.aliens[0].explosion.buffer();
        harness.graphics.backend_mut().destroy_buffer(buffer);
        harness.state.player.position.x = -3.0;

        harness.tick(InputState::empty());
        // Only the healthy explosion was queued
        assert_eq!(harness.graphics.queue().particles().len(), 1);
        assert_eq!(harness.graphics.camera().position, Vec3::new(-3.75, 2.0, 4.0));

        harness.run(InputState::empty(), 25);
        assert!(harness.state.aliens()[0].is_idle());
        assert!(harness.state.aliens()[1].is_idle());
    }

    #[test]
    fn test_explosion_expires_after_26_ticks() {
        let mut harness = Harness::new();
        harness.state.aliens[0].alive = false;
        harness.state.aliens[0].exploding = true;

        harness.run(InputState::empty(), 25);
        assert!(harness.state.aliens()[0].exploding);
        harness.run(InputState::empty(), 1);
        assert!(harness.state.aliens()[0].is_idle());
    }

    #[test]
    fn test_no_wave_reset_while_one_explodes() {
        let mut harness = Harness::new();
        for alien in &mut harness.state.aliens {
            alien.alive = false;
        }
        harness.state.aliens[7].exploding = true;

        harness.tick(InputState::empty());
        assert!(harness.state.aliens().iter().all(|alien| !alien.alive));

        harness.state.aliens[7].exploding = false;
        harness.tick(InputState::empty());
        assert!(harness.state.aliens().iter().all(|alien| alien.alive));
    }

    #[test]
    fn test_draws_and_camera() {
        let mut harness = Harness::new();
        harness.state.player.position.x = 2.0;
        harness.tick(InputState::empty());

        // Ship plus twelve aliens, in the opaque pass
        let opaque = harness.graphics.queue().opaque();
        assert_eq!(opaque.len(), 13);
        assert_eq!(opaque[0].mesh, MeshHandle(1));
        assert!(opaque[1..].iter().all(|draw| draw.mesh == MeshHandle(2)));

        assert_relative_eq!(harness.state.eye(), Vec3::new(2.5, 2.0, 4.0));
        assert_relative_eq!(harness.state.centre(), Vec3::new(2.0, 1.0, 0.0));
        assert_eq!(harness.graphics.camera().position, Vec3::new(2.5, 2.0, 4.0));
    }

    #[test]
    fn test_explosion_drawn_at_alien_with_texture() {
        let mut harness = Harness::new();
        harness.state.aliens[2].alive = false;
        harness.state.aliens[2].exploding = true;
        let view_projection = *harness.graphics.view_projection();

        harness.tick(InputState::empty());
        let particles = harness.graphics.queue().particles();
        assert_eq!(particles.len(), 1);
        assert_eq!(particles[0].texture, TextureHandle(14));
        assert_eq!(particles[0].count, 40);
        let model = Mat4::new_translation(&harness.state.aliens()[2].position);
        assert_eq!(particles[0].mvp, view_projection * model);
    }

    #[test]
    fn test_destroy_releases_explosions() {
        let mut harness = Harness::new();
        let recording = |graphics: &GraphicsEngine| {
            graphics
                .backend()
                .as_any()
                .downcast_ref::<RecordingBackend>()
                .unwrap()
                .live_resources()
                .2
        };
        let before = recording(&harness.graphics);
        harness.state.destroy(harness.graphics.backend_mut());
        assert_eq!(recording(&harness.graphics), before - 12);
    }

    #[test]
    fn test_frame_counter_wraps() {
        let mut harness = Harness::new();
        harness.state.frame = u64::MAX;
        harness.tick(InputState::empty());
        assert_eq!(harness.state.frame(), 0);
        assert_relative_eq!(harness.state.phase(), 0.0);
    }
}
