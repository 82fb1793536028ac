//! Instance, device and surface setup

#[cfg(debug_assertions)]
use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Entry, Instance};
use std::ffi::{CStr, CString};

use super::{VulkanError, VulkanResult};
use crate::window::GlfwWindow;

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Vulkan instance with optional debug messenger
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    #[cfg(debug_assertions)]
    debug: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanInstance {
    /// Create an instance with the extensions GLFW needs, plus validation in
    /// debug builds when `enable_validation` is set
    pub fn new(window: &GlfwWindow, app_name: &str, enable_validation: bool) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to load Vulkan: {:?}", e)))?;

        let app_name = to_cstring(app_name)?;
        let engine_name = to_cstring("invaders_engine")?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let required_extensions = window
            .required_instance_extensions()
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to get required extensions: {}", e)))?;
        let extension_names = required_extensions
            .iter()
            .map(|name| to_cstring(name))
            .collect::<VulkanResult<Vec<_>>>()?;

        let validation = cfg!(debug_assertions) && enable_validation;

        #[allow(unused_mut)]
        let mut extensions: Vec<*const std::os::raw::c_char> = extension_names.iter().map(|ext| ext.as_ptr()).collect();
        #[cfg(debug_assertions)]
        if validation {
            extensions.push(DebugUtils::name().as_ptr());
        }

        let layer_names = if validation {
            vec![to_cstring(VALIDATION_LAYER)?]
        } else {
            Vec::new()
        };
        let layers: Vec<*const std::os::raw::c_char> = layer_names.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        let instance = unsafe { entry.create_instance(&create_info, None)? };
        log::debug!("Vulkan instance created (validation: {})", validation);

        #[cfg(debug_assertions)]
        let debug = if validation {
            let utils = DebugUtils::new(&entry, &instance);
            let messenger = Self::setup_debug_messenger(&utils)?;
            Some((utils, messenger))
        } else {
            None
        };

        Ok(Self {
            entry,
            instance,
            #[cfg(debug_assertions)]
            debug,
        })
    }

    #[cfg(debug_assertions)]
    fn setup_debug_messenger(debug_utils: &DebugUtils) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        Ok(unsafe { debug_utils.create_debug_utils_messenger(&create_info, None)? })
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            #[cfg(debug_assertions)]
            if let Some((utils, messenger)) = self.debug.take() {
                utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Validation messages go to the log
#[cfg(debug_assertions)]
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::error!("[Vulkan] {:?} - {}", message_type, message);
    } else {
        log::warn!("[Vulkan] {:?} - {}", message_type, message);
    }

    vk::FALSE
}

fn to_cstring(value: &str) -> VulkanResult<CString> {
    CString::new(value).map_err(|_| VulkanError::InitializationFailed(format!("interior NUL in {:?}", value)))
}

/// Chosen GPU and its queue families
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Index of the graphics queue family
    pub graphics_family: u32,
    /// Index of the presentation queue family
    pub present_family: u32,
}

impl PhysicalDeviceInfo {
    /// First device with graphics and present queues and swapchain support
    pub fn select_suitable_device(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> VulkanResult<Self> {
        let devices = unsafe { instance.enumerate_physical_devices()? };

        for device in devices {
            if let Some(info) = Self::evaluate_device(instance, device, surface, surface_loader)? {
                log::info!("Selected GPU: {}", unsafe {
                    CStr::from_ptr(info.properties.device_name.as_ptr()).to_string_lossy()
                });
                return Ok(info);
            }
        }

        Err(VulkanError::InitializationFailed("No suitable GPU found".to_string()))
    }

    fn evaluate_device(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> VulkanResult<Option<Self>> {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };

        let mut graphics_family = None;
        let mut present_family = None;
        for (index, family) in queue_families.iter().enumerate() {
            let index = index as u32;
            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && graphics_family.is_none() {
                graphics_family = Some(index);
            }
            let present_support =
                unsafe { surface_loader.get_physical_device_surface_support(device, index, surface)? };
            if present_support && present_family.is_none() {
                present_family = Some(index);
            }
        }

        let extensions = unsafe { instance.enumerate_device_extension_properties(device)? };
        let has_swapchain = extensions.iter().any(|available| {
            let name = unsafe { CStr::from_ptr(available.extension_name.as_ptr()) };
            name == SwapchainLoader::name()
        });

        Ok(match (graphics_family, present_family, has_swapchain) {
            (Some(graphics_family), Some(present_family), true) => Some(Self {
                device,
                properties,
                graphics_family,
                present_family,
            }),
            _ => None,
        })
    }
}

/// Logical device and its queues
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Graphics operations queue
    pub graphics_queue: vk::Queue,
    /// Surface presentation queue
    pub present_queue: vk::Queue,
}

impl LogicalDevice {
    /// Create the device with one graphics and one present queue
    pub fn new(instance: &Instance, info: &PhysicalDeviceInfo) -> VulkanResult<Self> {
        let mut families = vec![info.graphics_family];
        if info.present_family != info.graphics_family {
            families.push(info.present_family);
        }

        let priorities = [1.0];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let extensions = [SwapchainLoader::name().as_ptr()];
        let features = vk::PhysicalDeviceFeatures::default();
        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = unsafe { instance.create_device(info.device, &create_info, None)? };
        let graphics_queue = unsafe { device.get_device_queue(info.graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(info.present_family, 0) };

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

/// Core Vulkan objects every other wrapper is created from.
///
/// Field order is drop order: the surface goes before the device, the device
/// before the instance.
pub struct VulkanContext {
    /// Window surface
    pub surface: vk::SurfaceKHR,
    /// Surface extension loader
    pub surface_loader: Surface,
    /// Selected GPU
    pub physical_device: PhysicalDeviceInfo,
    /// Logical device and queues
    pub device: LogicalDevice,
    /// Instance
    pub instance: VulkanInstance,
}

impl VulkanContext {
    /// Create instance, surface and device for `window`
    pub fn new(window: &GlfwWindow, app_name: &str, enable_validation: bool) -> VulkanResult<Self> {
        let instance = VulkanInstance::new(window, app_name, enable_validation)?;

        let surface_loader = Surface::new(&instance.entry, &instance.instance);
        let surface = window
            .create_vulkan_surface(instance.instance.handle())
            .map_err(|e| VulkanError::InitializationFailed(format!("Surface creation: {}", e)))?;

        let physical_device = PhysicalDeviceInfo::select_suitable_device(&instance.instance, surface, &surface_loader)?;
        let device = LogicalDevice::new(&instance.instance, &physical_device)?;

        Ok(Self {
            surface,
            surface_loader,
            physical_device,
            device,
            instance,
        })
    }

    /// The Vulkan instance
    pub fn instance(&self) -> &Instance {
        &self.instance.instance
    }

    /// The logical device
    pub fn device(&self) -> &Device {
        &self.device.device
    }

    /// Index of a memory type matching `type_filter` with all of `properties`
    pub fn find_memory_type(&self, type_filter: u32, properties: vk::MemoryPropertyFlags) -> VulkanResult<u32> {
        let memory = unsafe {
            self.instance()
                .get_physical_device_memory_properties(self.physical_device.device)
        };
        (0..memory.memory_type_count)
            .find(|&i| {
                type_filter & (1 << i) != 0 && memory.memory_types[i as usize].property_flags.contains(properties)
            })
            .ok_or(VulkanError::NoSuitableMemoryType)
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device.device_wait_idle();
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
