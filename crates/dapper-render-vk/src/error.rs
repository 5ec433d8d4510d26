// SPDX-License-Identifier: CEPL-1.0
use std::fmt;

use ash::vk;
use raw_window_handle::HandleError;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapabilityKind {
    InstanceExtension,
    InstanceLayer,
    DeviceExtension,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CapabilityKind::InstanceExtension => "instance extension",
            CapabilityKind::InstanceLayer => "instance layer",
            CapabilityKind::DeviceExtension => "device extension",
        })
    }
}

/// Coarse classification of a bootstrap failure. None of them is
/// recoverable at this layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    MissingCapability,
    NoSuitableDevice,
    DriverFailure,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("missing required {kind}(s) {missing:?} (available: {available:?})")]
    MissingCapability {
        kind: CapabilityKind,
        missing: Vec<String>,
        available: Vec<String>,
    },
    #[error("no Vulkan physical devices were enumerated")]
    NoPhysicalDevice,
    #[error("none of the {candidates} physical device(s) meet the requirements")]
    NoSuitableDevice { candidates: usize },
    #[error("{call} failed: {result}")]
    Driver {
        call: &'static str,
        result: vk::Result,
    },
    #[error("window handle unavailable: {0}")]
    Window(#[from] HandleError),
    #[error("name {0:?} contains an interior nul byte")]
    InvalidName(String),
    #[error("{0} used before it was created")]
    OutOfOrder(&'static str),
}

impl BootstrapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BootstrapError::MissingCapability { .. } => ErrorKind::MissingCapability,
            BootstrapError::NoPhysicalDevice | BootstrapError::NoSuitableDevice { .. } => {
                ErrorKind::NoSuitableDevice
            }
            BootstrapError::Driver { .. }
            | BootstrapError::Window(_)
            | BootstrapError::InvalidName(_)
            | BootstrapError::OutOfOrder(_) => ErrorKind::DriverFailure,
        }
    }
}

/// Tags a raw `VkResult` with the driver call that produced it.
pub trait VkResultExt<T> {
    fn during(self, call: &'static str) -> Result<T, BootstrapError>;
}

impl<T> VkResultExt<T> for Result<T, vk::Result> {
    fn during(self, call: &'static str) -> Result<T, BootstrapError> {
        self.map_err(|result| BootstrapError::Driver { call, result })
    }
}
