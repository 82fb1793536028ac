//! [`RenderBackend`] implementation on top of the Vulkan wrappers

use std::path::Path;

use ash::vk;
use slotmap::{DefaultKey, Key, KeyData, SlotMap};

use super::buffer::Buffer;
use super::context::VulkanContext;
use super::pipeline::{vertex_attribute, vertex_binding, GraphicsPipeline, PipelineDesc, ShaderModule};
use super::swapchain::Swapchain;
use super::sync::{CommandPool, FrameSync};
use super::targets::{RenderPassObject, RenderTargets};
use super::texture::Texture;
use super::{VulkanError, VulkanResult};
use crate::assets::ImageData;
use crate::config::RendererConfig;
use crate::foundation::math::Mat4;
use crate::render::api::{
    BackendResult, BufferHandle, BufferUsage, MeshDraw, MeshHandle, PassTracker, PointsDraw, QuadDraw,
    RenderBackend, RenderPass, TextureHandle,
};
use crate::render::primitives::{Mesh, Vertex};
use crate::render::RenderError;
use crate::window::GlfwWindow;

/// Mesh pipeline push constants: mvp, model-view
const MESH_PUSH_FLOATS: usize = 32;
/// Particle pipeline push constants: mvp, point size
const POINTS_PUSH_FLOATS: usize = 17;
/// Overlay pipeline push constants: transform, uv offset, size
const QUAD_PUSH_FLOATS: usize = 20;

/// Floats per overlay corner position
const QUAD_POSITION_FLOATS: u64 = 3;

/// Per-frame lighting block (set 1, binding 0 of the mesh pipeline)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniforms {
    light_dir: [f32; 4],
    view_dir: [f32; 4],
}

fn mat4_floats(matrix: &Mat4) -> &[f32] {
    // nalgebra stores column-major, as GLSL expects
    matrix.as_slice()
}

fn mesh_push_constants(draw: &MeshDraw) -> [f32; MESH_PUSH_FLOATS] {
    let mut data = [0.0; MESH_PUSH_FLOATS];
    data[..16].copy_from_slice(mat4_floats(&draw.mvp));
    data[16..].copy_from_slice(mat4_floats(&draw.model_view));
    data
}

fn points_push_constants(draw: &PointsDraw) -> [f32; POINTS_PUSH_FLOATS] {
    let mut data = [0.0; POINTS_PUSH_FLOATS];
    data[..16].copy_from_slice(mat4_floats(&draw.mvp));
    data[16] = draw.point_size;
    data
}

fn quad_push_constants(draw: &QuadDraw) -> [f32; QUAD_PUSH_FLOATS] {
    let mut data = [0.0; QUAD_PUSH_FLOATS];
    data[..16].copy_from_slice(mat4_floats(&draw.transform));
    data[16..18].copy_from_slice(&draw.uv_offset);
    data[18..].copy_from_slice(&draw.size);
    data
}

fn to_handle(key: DefaultKey) -> u64 {
    key.data().as_ffi()
}

fn to_key(handle: u64) -> DefaultKey {
    KeyData::from_ffi(handle).into()
}

/// Descriptor pool and the two set layouts
struct Descriptors {
    device: ash::Device,
    pool: vk::DescriptorPool,
    texture_layout: vk::DescriptorSetLayout,
    frame_layout: vk::DescriptorSetLayout,
}

impl Descriptors {
    fn new(device: ash::Device, max_textures: u32) -> VulkanResult<Self> {
        let mut descriptors = Self {
            device,
            pool: vk::DescriptorPool::null(),
            texture_layout: vk::DescriptorSetLayout::null(),
            frame_layout: vk::DescriptorSetLayout::null(),
        };

        let texture_bindings = [vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)
            .build()];
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&texture_bindings);
        descriptors.texture_layout = unsafe { descriptors.device.create_descriptor_set_layout(&layout_info, None)? };

        let frame_bindings = [vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .build()];
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&frame_bindings);
        descriptors.frame_layout = unsafe { descriptors.device.create_descriptor_set_layout(&layout_info, None)? };

        // One set per texture, one for the default white texture, one for the frame block
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: max_textures + 1,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 1,
            },
        ];
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .max_sets(max_textures + 2)
            .pool_sizes(&pool_sizes);
        descriptors.pool = unsafe { descriptors.device.create_descriptor_pool(&pool_info, None)? };

        Ok(descriptors)
    }

    fn allocate(&self, layout: vk::DescriptorSetLayout) -> VulkanResult<vk::DescriptorSet> {
        let layouts = [layout];
        let allocate_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);
        let sets = unsafe { self.device.allocate_descriptor_sets(&allocate_info)? };
        Ok(sets[0])
    }

    fn texture_set(&self, texture: &Texture) -> VulkanResult<vk::DescriptorSet> {
        let set = self.allocate(self.texture_layout)?;
        let image_info = [vk::DescriptorImageInfo {
            sampler: texture.sampler(),
            image_view: texture.view(),
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }];
        let write = vk::WriteDescriptorSet::builder()
            .dst_set(set)
            .dst_binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_info)
            .build();
        unsafe { self.device.update_descriptor_sets(&[write], &[]) };
        Ok(set)
    }

    fn frame_set(&self, buffer: &Buffer) -> VulkanResult<vk::DescriptorSet> {
        let set = self.allocate(self.frame_layout)?;
        let buffer_info = [vk::DescriptorBufferInfo {
            buffer: buffer.handle(),
            offset: 0,
            range: buffer.size(),
        }];
        let write = vk::WriteDescriptorSet::builder()
            .dst_set(set)
            .dst_binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(&buffer_info)
            .build();
        unsafe { self.device.update_descriptor_sets(&[write], &[]) };
        Ok(set)
    }

    fn free(&self, set: vk::DescriptorSet) {
        if let Err(e) = unsafe { self.device.free_descriptor_sets(self.pool, &[set]) } {
            log::warn!("Failed to free descriptor set: {:?}", e);
        }
    }
}

impl Drop for Descriptors {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
            self.device.destroy_descriptor_set_layout(self.texture_layout, None);
            self.device.destroy_descriptor_set_layout(self.frame_layout, None);
        }
    }
}

/// Uploaded texture and the descriptor set that samples it
struct TextureEntry {
    texture: Texture,
    set: vk::DescriptorSet,
}

/// Uploaded mesh
struct GpuMesh {
    vertices: Buffer,
    indices: Buffer,
    index_count: u32,
}

/// One pipeline per render pass
struct Pipelines {
    mesh: GraphicsPipeline,
    particles: GraphicsPipeline,
    overlay: GraphicsPipeline,
}

impl Pipelines {
    fn new(
        device: &ash::Device,
        render_pass: vk::RenderPass,
        descriptors: &Descriptors,
        shader_dir: &Path,
    ) -> BackendResult<Self> {
        let load = |name: &str| {
            let path = shader_dir.join(format!("{name}.spv"));
            ShaderModule::from_file(device.clone(), &path)
                .map_err(|e| RenderError::ShaderLoad(format!("{}: {}", path.display(), e)))
        };

        let mesh = {
            let vertex = load("mesh.vert")?;
            let fragment = load("mesh.frag")?;
            let bindings = [vertex_binding(0, std::mem::size_of::<Vertex>() as u32)];
            let attributes = [
                vertex_attribute(0, 0, vk::Format::R32G32B32_SFLOAT, 0),
                vertex_attribute(1, 0, vk::Format::R32G32B32_SFLOAT, 12),
                vertex_attribute(2, 0, vk::Format::R32G32_SFLOAT, 24),
            ];
            GraphicsPipeline::new(
                device.clone(),
                render_pass,
                &PipelineDesc {
                    vertex: &vertex,
                    fragment: &fragment,
                    bindings: &bindings,
                    attributes: &attributes,
                    topology: vk::PrimitiveTopology::TRIANGLE_LIST,
                    state: RenderPass::Opaque.state(),
                    cull_mode: vk::CullModeFlags::NONE,
                    set_layouts: &[descriptors.texture_layout, descriptors.frame_layout],
                    push_constant_size: (MESH_PUSH_FLOATS * 4) as u32,
                },
            )?
        };

        let particles = {
            let vertex = load("particle.vert")?;
            let fragment = load("particle.frag")?;
            let bindings = [vertex_binding(0, 12)];
            let attributes = [vertex_attribute(0, 0, vk::Format::R32G32B32_SFLOAT, 0)];
            GraphicsPipeline::new(
                device.clone(),
                render_pass,
                &PipelineDesc {
                    vertex: &vertex,
                    fragment: &fragment,
                    bindings: &bindings,
                    attributes: &attributes,
                    topology: vk::PrimitiveTopology::POINT_LIST,
                    state: RenderPass::Particles.state(),
                    cull_mode: vk::CullModeFlags::NONE,
                    set_layouts: &[descriptors.texture_layout],
                    push_constant_size: (POINTS_PUSH_FLOATS * 4) as u32,
                },
            )?
        };

        let overlay = {
            let vertex = load("overlay.vert")?;
            let fragment = load("overlay.frag")?;
            let bindings = [vertex_binding(0, 12), vertex_binding(1, 8)];
            let attributes = [
                vertex_attribute(0, 0, vk::Format::R32G32B32_SFLOAT, 0),
                vertex_attribute(1, 1, vk::Format::R32G32_SFLOAT, 0),
            ];
            GraphicsPipeline::new(
                device.clone(),
                render_pass,
                &PipelineDesc {
                    vertex: &vertex,
                    fragment: &fragment,
                    bindings: &bindings,
                    attributes: &attributes,
                    topology: vk::PrimitiveTopology::TRIANGLE_LIST,
                    state: RenderPass::Overlay.state(),
                    cull_mode: vk::CullModeFlags::NONE,
                    set_layouts: &[descriptors.texture_layout],
                    push_constant_size: (QUAD_PUSH_FLOATS * 4) as u32,
                },
            )?
        };

        Ok(Self {
            mesh,
            particles,
            overlay,
        })
    }

    fn for_pass(&self, pass: RenderPass) -> &GraphicsPipeline {
        match pass {
            RenderPass::Opaque => &self.mesh,
            RenderPass::Particles => &self.particles,
            RenderPass::Overlay => &self.overlay,
        }
    }
}

/// State of the frame being recorded
struct ActiveFrame {
    image_index: u32,
    passes: PassTracker,
    lighting_written: bool,
}

/// Vulkan implementation of [`RenderBackend`].
///
/// Field order is drop order: GPU resources go first, the context last.
pub struct VulkanBackend {
    textures: SlotMap<DefaultKey, TextureEntry>,
    meshes: SlotMap<DefaultKey, GpuMesh>,
    buffers: SlotMap<DefaultKey, Buffer>,
    white: TextureEntry,
    frame_uniforms: Buffer,
    frame_set: vk::DescriptorSet,
    pipelines: Pipelines,
    descriptors: Descriptors,
    targets: Option<RenderTargets>,
    swapchain: Option<Swapchain>,
    render_pass: RenderPassObject,
    sync: FrameSync,
    command_buffer: vk::CommandBuffer,
    commands: CommandPool,
    frame: Option<ActiveFrame>,
    surface_size: (u32, u32),
    needs_recreate: bool,
    prefer_mailbox: bool,
    max_textures: u32,
    context: VulkanContext,
}

impl VulkanBackend {
    /// Set up Vulkan for `window` and load the pipelines from `config.shader_dir`
    pub fn new(window: &GlfwWindow, config: &RendererConfig, app_name: &str) -> BackendResult<Self> {
        let context = VulkanContext::new(window, app_name, config.enable_validation)?;
        let device = context.device().clone();

        let commands = CommandPool::new(device.clone(), context.physical_device.graphics_family)?;
        let command_buffer = commands.allocate()?;
        let sync = FrameSync::new(device.clone())?;

        let (width, height) = window.framebuffer_size();
        let swapchain = Swapchain::new(&context, vk::Extent2D { width, height }, None, config.prefer_mailbox)?;
        let render_pass = RenderPassObject::new(device.clone(), swapchain.format())?;
        let targets = RenderTargets::new(&context, &render_pass, &swapchain)?;

        let descriptors = Descriptors::new(device.clone(), config.max_textures)?;
        let pipelines = Pipelines::new(&device, render_pass.handle(), &descriptors, Path::new(&config.shader_dir))?;

        let white_texture = Texture::white(&context, &commands)?;
        let white = TextureEntry {
            set: descriptors.texture_set(&white_texture)?,
            texture: white_texture,
        };

        let frame_uniforms = Buffer::new(
            &context,
            std::mem::size_of::<FrameUniforms>() as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
        )?;
        let frame_set = descriptors.frame_set(&frame_uniforms)?;

        let extent = swapchain.extent();
        log::info!("Vulkan backend ready ({}x{})", extent.width, extent.height);

        Ok(Self {
            textures: SlotMap::new(),
            meshes: SlotMap::new(),
            buffers: SlotMap::new(),
            white,
            frame_uniforms,
            frame_set,
            pipelines,
            descriptors,
            targets: Some(targets),
            swapchain: Some(swapchain),
            render_pass,
            sync,
            command_buffer,
            commands,
            frame: None,
            surface_size: (extent.width, extent.height),
            needs_recreate: false,
            prefer_mailbox: config.prefer_mailbox,
            max_textures: config.max_textures,
            context,
        })
    }

    fn device(&self) -> &ash::Device {
        self.context.device()
    }

    fn recreate_swapchain(&mut self) -> VulkanResult<()> {
        unsafe { self.device().device_wait_idle()? };

        let (width, height) = self.surface_size;
        self.targets = None;
        let old = self.swapchain.take();
        let swapchain = Swapchain::new(
            &self.context,
            vk::Extent2D { width, height },
            old.as_ref(),
            self.prefer_mailbox,
        )?;
        drop(old);

        self.targets = Some(RenderTargets::new(&self.context, &self.render_pass, &swapchain)?);
        let extent = swapchain.extent();
        log::debug!("Swapchain recreated at {}x{}", extent.width, extent.height);
        self.surface_size = (extent.width, extent.height);
        self.swapchain = Some(swapchain);
        self.needs_recreate = false;
        Ok(())
    }

    fn active_frame(&mut self, pass: RenderPass) -> BackendResult<&mut ActiveFrame> {
        let frame = self.frame.as_mut().ok_or(RenderError::NoActiveFrame)?;
        frame.passes.require(pass)?;
        Ok(frame)
    }

    fn texture_set(&self, texture: TextureHandle) -> BackendResult<vk::DescriptorSet> {
        if texture.is_null() {
            return Ok(self.white.set);
        }
        self.textures
            .get(to_key(texture.0))
            .map(|entry| entry.set)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{texture:?}")))
    }

    fn buffer(&self, buffer: BufferHandle) -> BackendResult<&Buffer> {
        self.buffers
            .get(to_key(buffer.0))
            .ok_or_else(|| RenderError::InvalidHandle(format!("{buffer:?}")))
    }

    fn push<const N: usize>(&self, pass: RenderPass, data: &[f32; N]) {
        unsafe {
            self.device().cmd_push_constants(
                self.command_buffer,
                self.pipelines.for_pass(pass).layout(),
                vk::ShaderStageFlags::VERTEX,
                0,
                bytemuck::cast_slice(data),
            );
        }
    }

    fn bind_texture(&self, pass: RenderPass, set: vk::DescriptorSet) {
        unsafe {
            self.device().cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipelines.for_pass(pass).layout(),
                0,
                &[set],
                &[],
            );
        }
    }
}

impl RenderBackend for VulkanBackend {
    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn create_texture(&mut self, image: &ImageData) -> BackendResult<TextureHandle> {
        if self.textures.len() as u32 >= self.max_textures {
            return Err(VulkanError::TextureLimit(self.max_textures).into());
        }
        let texture = Texture::from_rgba(&self.context, &self.commands, image.width, image.height, &image.data)?;
        let set = self.descriptors.texture_set(&texture)?;
        let key = self.textures.insert(TextureEntry { texture, set });
        Ok(TextureHandle(to_handle(key)))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if texture.is_null() {
            return;
        }
        if let Err(e) = self.sync.wait() {
            log::warn!("Wait before texture release failed: {}", e);
        }
        if let Some(entry) = self.textures.remove(to_key(texture.0)) {
            self.descriptors.free(entry.set);
            log::trace!("Released texture {:?} ({:?})", texture, entry.texture.extent());
        }
    }

    fn create_mesh(&mut self, mesh: &Mesh) -> BackendResult<MeshHandle> {
        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            return Err(RenderError::BackendError("mesh has no geometry".to_string()));
        }
        let vertices = Buffer::with_data(&self.context, &mesh.vertices, vk::BufferUsageFlags::VERTEX_BUFFER)?;
        let indices = Buffer::with_data(&self.context, &mesh.indices, vk::BufferUsageFlags::INDEX_BUFFER)?;
        let key = self.meshes.insert(GpuMesh {
            vertices,
            indices,
            index_count: mesh.index_count(),
        });
        log::debug!("Uploaded mesh with {} indices", mesh.index_count());
        Ok(MeshHandle(to_handle(key)))
    }

    fn destroy_mesh(&mut self, mesh: MeshHandle) {
        if mesh.is_null() {
            return;
        }
        if let Err(e) = self.sync.wait() {
            log::warn!("Wait before mesh release failed: {}", e);
        }
        self.meshes.remove(to_key(mesh.0));
    }

    fn create_vertex_buffer(&mut self, data: &[f32], _usage: BufferUsage) -> BackendResult<BufferHandle> {
        let buffer = Buffer::with_data(&self.context, data, vk::BufferUsageFlags::VERTEX_BUFFER)?;
        Ok(BufferHandle(to_handle(self.buffers.insert(buffer))))
    }

    fn update_vertex_buffer(&mut self, buffer: BufferHandle, data: &[f32]) -> BackendResult<()> {
        // The previous frame may still read this buffer
        self.sync.wait()?;
        self.buffer(buffer)?.write(bytemuck::cast_slice(data))?;
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if buffer.is_null() {
            return;
        }
        if let Err(e) = self.sync.wait() {
            log::warn!("Wait before buffer release failed: {}", e);
        }
        self.buffers.remove(to_key(buffer.0));
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) -> BackendResult<bool> {
        if self.frame.is_some() {
            return Err(RenderError::BackendError("frame already in progress".to_string()));
        }
        let (width, height) = self.surface_size;
        if width == 0 || height == 0 {
            return Ok(false);
        }
        if self.needs_recreate {
            self.recreate_swapchain()?;
        }

        self.sync.wait()?;

        let (Some(swapchain), Some(targets)) = (&self.swapchain, &self.targets) else {
            return Ok(false);
        };
        let Some(image_index) = swapchain.acquire_next_image(self.sync.image_available)? else {
            self.needs_recreate = true;
            return Ok(false);
        };
        let framebuffer = targets
            .framebuffer(image_index)
            .ok_or_else(|| RenderError::BackendError(format!("no framebuffer for image {image_index}")))?;
        let extent = swapchain.extent();

        let device = self.context.device();
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue { float32: clear_color },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        unsafe {
            device.reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty()).map_err(VulkanError::from)?;
            let begin_info = vk::CommandBufferBeginInfo::builder()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device.begin_command_buffer(self.command_buffer, &begin_info).map_err(VulkanError::from)?;

            let pass_info = vk::RenderPassBeginInfo::builder()
                .render_pass(self.render_pass.handle())
                .framebuffer(framebuffer)
                .render_area(render_area)
                .clear_values(&clear_values);
            device.cmd_begin_render_pass(self.command_buffer, &pass_info, vk::SubpassContents::INLINE);
            device.cmd_set_viewport(self.command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(self.command_buffer, 0, &[render_area]);
        }

        self.frame = Some(ActiveFrame {
            image_index,
            passes: PassTracker::default(),
            lighting_written: false,
        });
        Ok(true)
    }

    fn begin_pass(&mut self, pass: RenderPass) -> BackendResult<()> {
        let frame = self.frame.as_mut().ok_or(RenderError::NoActiveFrame)?;
        frame.passes.enter(pass)?;
        unsafe {
            self.context.device().cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipelines.for_pass(pass).handle(),
            );
        }
        Ok(())
    }

    fn draw_mesh(&mut self, draw: &MeshDraw) -> BackendResult<()> {
        let first_mesh = !self.active_frame(RenderPass::Opaque)?.lighting_written;
        if draw.mesh.is_null() {
            log::trace!("Skipping draw of null mesh");
            return Ok(());
        }

        let texture_set = self.texture_set(draw.texture)?;
        let mesh = self
            .meshes
            .get(to_key(draw.mesh.0))
            .ok_or_else(|| RenderError::InvalidHandle(format!("{:?}", draw.mesh)))?;

        if first_mesh {
            let uniforms = FrameUniforms {
                light_dir: [draw.light_dir.x, draw.light_dir.y, draw.light_dir.z, 0.0],
                view_dir: [draw.view_dir.x, draw.view_dir.y, draw.view_dir.z, 0.0],
            };
            self.frame_uniforms.write(bytemuck::bytes_of(&uniforms))?;
        }

        let layout = self.pipelines.mesh.layout();
        let device = self.context.device();
        unsafe {
            device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                &[texture_set, self.frame_set],
                &[],
            );
            device.cmd_bind_vertex_buffers(self.command_buffer, 0, &[mesh.vertices.handle()], &[0]);
            device.cmd_bind_index_buffer(self.command_buffer, mesh.indices.handle(), 0, vk::IndexType::UINT32);
        }
        self.push(RenderPass::Opaque, &mesh_push_constants(draw));
        unsafe {
            device.cmd_draw_indexed(self.command_buffer, mesh.index_count, 1, 0, 0, 0);
        }

        if let Some(frame) = self.frame.as_mut() {
            frame.lighting_written = true;
        }
        Ok(())
    }

    fn draw_points(&mut self, draw: &PointsDraw) -> BackendResult<()> {
        self.active_frame(RenderPass::Particles)?;
        if draw.count == 0 {
            return Ok(());
        }
        let texture_set = self.texture_set(draw.texture)?;
        let buffer = self.buffer(draw.buffer)?.handle();

        self.bind_texture(RenderPass::Particles, texture_set);
        self.push(RenderPass::Particles, &points_push_constants(draw));
        unsafe {
            let device = self.device();
            device.cmd_bind_vertex_buffers(self.command_buffer, 0, &[buffer], &[0]);
            device.cmd_draw(self.command_buffer, draw.count, 1, 0, 0);
        }
        Ok(())
    }

    fn draw_quad(&mut self, draw: &QuadDraw) -> BackendResult<()> {
        self.active_frame(RenderPass::Overlay)?;
        let texture_set = self.texture_set(draw.texture)?;
        let vertices = self.buffer(draw.vertices)?;
        let vertex_count = (vertices.size() / (QUAD_POSITION_FLOATS * 4)) as u32;
        let buffers = [vertices.handle(), self.buffer(draw.uvs)?.handle()];

        self.bind_texture(RenderPass::Overlay, texture_set);
        self.push(RenderPass::Overlay, &quad_push_constants(draw));
        unsafe {
            let device = self.device();
            device.cmd_bind_vertex_buffers(self.command_buffer, 0, &buffers, &[0, 0]);
            device.cmd_draw(self.command_buffer, vertex_count, 1, 0, 0);
        }
        Ok(())
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        let frame = self.frame.take().ok_or(RenderError::NoActiveFrame)?;
        let device = self.context.device();

        unsafe {
            device.cmd_end_render_pass(self.command_buffer);
            device.end_command_buffer(self.command_buffer).map_err(VulkanError::from)?;
        }

        self.sync.reset()?;
        let wait_semaphores = [self.sync.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.command_buffer];
        let signal_semaphores = [self.sync.render_finished];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);
        unsafe {
            device.queue_submit(
                self.context.device.graphics_queue,
                &[submit_info.build()],
                self.sync.in_flight,
            ).map_err(VulkanError::from)?;
        }

        let presented = match &self.swapchain {
            Some(swapchain) => swapchain.present(
                self.context.device.present_queue,
                frame.image_index,
                self.sync.render_finished,
            )?,
            None => false,
        };
        if !presented {
            self.needs_recreate = true;
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> BackendResult<()> {
        self.surface_size = (width, height);
        self.needs_recreate = true;
        Ok(())
    }

    fn wait_idle(&self) -> BackendResult<()> {
        unsafe { self.device().device_wait_idle().map_err(VulkanError::from)? };
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        unsafe {
            let _ = self.context.device().device_wait_idle();
        }
        log::debug!(
            "Releasing Vulkan backend ({} textures, {} meshes, {} buffers still live)",
            self.textures.len(),
            self.meshes.len(),
            self.buffers.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_push_constant_sizes_fit_minimum_limit() {
        // 128 bytes is the smallest maxPushConstantsSize a device may report
        assert!(MESH_PUSH_FLOATS * 4 <= 128);
        assert!(POINTS_PUSH_FLOATS * 4 <= 128);
        assert!(QUAD_PUSH_FLOATS * 4 <= 128);
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 32);
    }

    #[test]
    fn test_quad_push_constant_layout() {
        let draw = QuadDraw {
            vertices: BufferHandle(1),
            uvs: BufferHandle(2),
            texture: TextureHandle::NULL,
            transform: Mat4::new_translation(&Vec3::new(5.0, 6.0, 7.0)),
            uv_offset: [0.25, 0.5],
            size: [32.0, 48.0],
        };
        let data = quad_push_constants(&draw);
        // Column-major: translation is the last column
        assert_eq!(&data[12..15], &[5.0, 6.0, 7.0]);
        assert_eq!(&data[16..], &[0.25, 0.5, 32.0, 48.0]);
    }

    #[test]
    fn test_mesh_push_constant_layout() {
        let draw = MeshDraw {
            mesh: MeshHandle(1),
            texture: TextureHandle::NULL,
            mvp: Mat4::identity() * 2.0,
            model_view: Mat4::identity(),
            light_dir: Vec3::y(),
            view_dir: Vec3::z(),
        };
        let data = mesh_push_constants(&draw);
        assert_eq!(data[0], 2.0);
        assert_eq!(data[16], 1.0);
        assert_eq!(data[17], 0.0);
    }

    #[test]
    fn test_handles_are_never_null() {
        let mut map: SlotMap<DefaultKey, ()> = SlotMap::new();
        let key = map.insert(());
        let handle = to_handle(key);
        assert_ne!(handle, 0);
        assert_eq!(to_key(handle), key);
    }
}
