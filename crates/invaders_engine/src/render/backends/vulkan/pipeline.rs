//! SPIR-V shader loading and graphics pipelines

use std::ffi::CStr;
use std::path::Path;

use ash::{vk, Device};

use super::{VulkanError, VulkanResult};
use crate::render::api::PassState;

/// Shader module with RAII cleanup
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create a module from SPIR-V bytes
    pub fn from_bytes(device: Device, bytes: &[u8]) -> VulkanResult<Self> {
        let code = ash::util::read_spv(&mut std::io::Cursor::new(bytes))
            .map_err(|e| VulkanError::InitializationFailed(format!("Invalid SPIR-V: {}", e)))?;
        let create_info = vk::ShaderModuleCreateInfo::builder().code(&code);
        let module = unsafe { device.create_shader_module(&create_info, None)? };
        Ok(Self { device, module })
    }

    /// Load a compiled `.spv` file
    pub fn from_file(device: Device, path: impl AsRef<Path>) -> VulkanResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            VulkanError::InitializationFailed(format!("Failed to read shader {}: {}", path.display(), e))
        })?;
        log::debug!("Loaded shader {}", path.display());
        Self::from_bytes(device, &bytes)
    }

    fn stage_info(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(ENTRY_POINT)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

const ENTRY_POINT: &CStr = match CStr::from_bytes_with_nul(b"main\0") {
    Ok(name) => name,
    Err(_) => panic!("invalid entry point"),
};

/// Everything that differs between the mesh, particle and overlay pipelines
pub struct PipelineDesc<'a> {
    /// Vertex shader
    pub vertex: &'a ShaderModule,
    /// Fragment shader
    pub fragment: &'a ShaderModule,
    /// Vertex buffer bindings
    pub bindings: &'a [vk::VertexInputBindingDescription],
    /// Vertex attributes
    pub attributes: &'a [vk::VertexInputAttributeDescription],
    /// Primitive topology
    pub topology: vk::PrimitiveTopology,
    /// Depth and blend state
    pub state: PassState,
    /// Face culling
    pub cull_mode: vk::CullModeFlags,
    /// Descriptor set layouts, set 0 first
    pub set_layouts: &'a [vk::DescriptorSetLayout],
    /// Bytes of vertex-stage push constants
    pub push_constant_size: u32,
}

/// Graphics pipeline and its layout. Viewport and scissor are dynamic so the
/// pipeline survives swapchain recreation.
pub struct GraphicsPipeline {
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Build a pipeline for subpass 0 of `render_pass`
    pub fn new(device: Device, render_pass: vk::RenderPass, desc: &PipelineDesc<'_>) -> VulkanResult<Self> {
        let shader_stages = [
            desc.vertex.stage_info(vk::ShaderStageFlags::VERTEX),
            desc.fragment.stage_info(vk::ShaderStageFlags::FRAGMENT),
        ];

        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(desc.bindings)
            .vertex_attribute_descriptions(desc.attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(desc.topology)
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        // Meshes are counter-clockwise in world space; the Y flip in the
        // projection chain turns them clockwise on screen.
        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(desc.cull_mode)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(desc.state.depth_test)
            .depth_write_enable(desc.state.depth_write)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(desc.state.blend)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD)
            .build()];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let push_constant_ranges = [vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: desc.push_constant_size,
        }];
        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(desc.set_layouts)
            .push_constant_ranges(&push_constant_ranges);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None)? };

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, err)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(err.into());
            }
        };

        Ok(Self {
            device,
            pipeline,
            layout,
        })
    }

    /// Pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

/// Vertex binding of `stride` bytes at `binding`
pub fn vertex_binding(binding: u32, stride: u32) -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
        binding,
        stride,
        input_rate: vk::VertexInputRate::VERTEX,
    }
}

/// Float vector attribute
pub fn vertex_attribute(
    location: u32,
    binding: u32,
    format: vk::Format,
    offset: u32,
) -> vk::VertexInputAttributeDescription {
    vk::VertexInputAttributeDescription {
        location,
        binding,
        format,
        offset,
    }
}
