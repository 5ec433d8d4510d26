// SPDX-License-Identifier: CEPL-1.0
use ash::vk;

pub const DEBUG_UTILS_EXTENSION: &str = "VK_EXT_debug_utils";
pub const SWAPCHAIN_EXTENSION: &str = "VK_KHR_swapchain";
pub const KHRONOS_VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Lowest driver message severity forwarded to the log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Verbose,
    Info,
    Warning,
    Error,
}

impl DiagnosticSeverity {
    /// Every severity at or above `self`.
    pub fn flags(self) -> vk::DebugUtilsMessageSeverityFlagsEXT {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        match self {
            DiagnosticSeverity::Verbose => S::VERBOSE | S::INFO | S::WARNING | S::ERROR,
            DiagnosticSeverity::Info => S::INFO | S::WARNING | S::ERROR,
            DiagnosticSeverity::Warning => S::WARNING | S::ERROR,
            DiagnosticSeverity::Error => S::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageCategories {
    pub general: bool,
    pub performance: bool,
    pub validation: bool,
}

impl Default for MessageCategories {
    fn default() -> Self {
        Self {
            general: true,
            performance: true,
            validation: true,
        }
    }
}

impl MessageCategories {
    pub fn flags(self) -> vk::DebugUtilsMessageTypeFlagsEXT {
        let mut flags = vk::DebugUtilsMessageTypeFlagsEXT::empty();
        if self.general {
            flags |= vk::DebugUtilsMessageTypeFlagsEXT::GENERAL;
        }
        if self.performance {
            flags |= vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE;
        }
        if self.validation {
            flags |= vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION;
        }
        flags
    }
}

#[derive(Clone, Debug)]
pub struct DiagnosticsConfig {
    /// Enables the validation layers and the debug messenger.
    pub enabled: bool,
    pub layers: Vec<String>,
    pub min_severity: DiagnosticSeverity,
    pub categories: MessageCategories,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(debug_assertions),
            layers: vec![KHRONOS_VALIDATION_LAYER.to_owned()],
            min_severity: DiagnosticSeverity::Warning,
            categories: MessageCategories::default(),
        }
    }
}

/// Static inputs to the device bootstrap. Built once, never mutated by the
/// pipeline.
#[derive(Clone, Debug)]
pub struct BootstrapConfig {
    pub app_name: String,
    pub app_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    pub api_version: u32,
    /// Instance extensions required on top of the windowing ones.
    pub instance_extensions: Vec<String>,
    pub device_extensions: Vec<String>,
    /// Capabilities the "graphics" queue family must advertise, all of them.
    pub queue_requirement: vk::QueueFlags,
    pub diagnostics: DiagnosticsConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            app_name: "BrickCraft".to_owned(),
            app_version: vk::make_api_version(0, 1, 3, 0),
            engine_name: "DapperCraft".to_owned(),
            engine_version: vk::make_api_version(0, 1, 3, 0),
            api_version: vk::API_VERSION_1_3,
            instance_extensions: Vec::new(),
            device_extensions: vec![SWAPCHAIN_EXTENSION.to_owned()],
            queue_requirement: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl BootstrapConfig {
    /// Windowing extensions, then configured extensions, then the debug
    /// extension when diagnostics are on. Duplicates are dropped.
    pub fn required_instance_extensions(&self, window_extensions: &[String]) -> Vec<String> {
        let debug = self
            .diagnostics
            .enabled
            .then(|| DEBUG_UTILS_EXTENSION.to_owned());
        dedup(
            window_extensions
                .iter()
                .cloned()
                .chain(self.instance_extensions.iter().cloned())
                .chain(debug),
        )
    }

    /// Layers to enable, empty when diagnostics are off.
    pub fn enabled_layers(&self) -> Vec<String> {
        if self.diagnostics.enabled {
            dedup(self.diagnostics.layers.iter().cloned())
        } else {
            Vec::new()
        }
    }
}

fn dedup(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
