// SPDX-License-Identifier: CEPL-1.0
//! Debug messenger callback and the formatting of its payloads.

use std::ffi::{c_void, CStr};
use std::fmt::Write as _;

use ash::vk;

pub const LOG_TARGET: &str = "dapper::vulkan";

#[derive(Clone, Debug, Default)]
pub struct DebugObject {
    pub object_type: vk::ObjectType,
    pub handle: u64,
    pub name: Option<String>,
}

/// Owned copy of `VkDebugUtilsMessengerCallbackDataEXT`.
#[derive(Clone, Debug, Default)]
pub struct DebugPayload {
    pub message_id_name: String,
    pub message_id_number: i32,
    pub message: String,
    pub queue_labels: Vec<String>,
    pub cmd_buf_labels: Vec<String>,
    pub objects: Vec<DebugObject>,
}

impl DebugPayload {
    /// # Safety
    /// `data` must point to callback data handed to a debug messenger
    /// callback, valid for the duration of the call.
    pub unsafe fn from_raw(data: &vk::DebugUtilsMessengerCallbackDataEXT<'_>) -> Self {
        // SAFETY: the driver guarantees every count/pointer pair and string in
        // the callback data is valid while the callback runs.
        unsafe {
            Self {
                message_id_name: lossy(data.p_message_id_name),
                message_id_number: data.message_id_number,
                message: lossy(data.p_message),
                queue_labels: slice(data.p_queue_labels, data.queue_label_count)
                    .iter()
                    .map(|l| lossy(l.p_label_name))
                    .collect(),
                cmd_buf_labels: slice(data.p_cmd_buf_labels, data.cmd_buf_label_count)
                    .iter()
                    .map(|l| lossy(l.p_label_name))
                    .collect(),
                objects: slice(data.p_objects, data.object_count)
                    .iter()
                    .map(|o| DebugObject {
                        object_type: o.object_type,
                        handle: o.object_handle,
                        name: (!o.p_object_name.is_null()).then(|| lossy(o.p_object_name)),
                    })
                    .collect(),
            }
        }
    }

    pub fn format(&self, message_types: vk::DebugUtilsMessageTypeFlagsEXT) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{message_types:?}:");
        let _ = writeln!(out, "\tmessageIDName   = <{}>", self.message_id_name);
        let _ = writeln!(out, "\tmessageIdNumber = {}", self.message_id_number);
        let _ = write!(out, "\tmessage         = <{}>", self.message);
        if !self.queue_labels.is_empty() {
            let _ = write!(out, "\n\tQueue Labels:");
            for label in &self.queue_labels {
                let _ = write!(out, "\n\t\tlabelName = <{label}>");
            }
        }
        if !self.cmd_buf_labels.is_empty() {
            let _ = write!(out, "\n\tCommandBuffer Labels:");
            for label in &self.cmd_buf_labels {
                let _ = write!(out, "\n\t\tlabelName = <{label}>");
            }
        }
        if !self.objects.is_empty() {
            let _ = write!(out, "\n\tObjects:");
            for (i, object) in self.objects.iter().enumerate() {
                let _ = write!(out, "\n\t\tObject {i}");
                let _ = write!(out, "\n\t\t\tobjectType   = {:?}", object.object_type);
                let _ = write!(out, "\n\t\t\tobjectHandle = {:#x}", object.handle);
                if let Some(name) = &object.name {
                    let _ = write!(out, "\n\t\t\tobjectName   = <{name}>");
                }
            }
        }
        out
    }
}

/// Logs at the level matching the driver severity. Anything that is not a
/// single known severity bit is an anomaly and goes out at error level.
pub fn log_message(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    payload: &DebugPayload,
) {
    use vk::DebugUtilsMessageSeverityFlagsEXT as S;
    let text = payload.format(message_types);
    match severity {
        S::VERBOSE => tracing::trace!(target: LOG_TARGET, "{text}"),
        S::INFO => tracing::info!(target: LOG_TARGET, "{text}"),
        S::WARNING => tracing::warn!(target: LOG_TARGET, "{text}"),
        S::ERROR => tracing::error!(target: LOG_TARGET, "{text}"),
        _ => tracing::error!(target: LOG_TARGET, "unknown severity {severity:?}: {text}"),
    }
}

pub unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() {
        return vk::FALSE;
    }
    // SAFETY: non-null, and valid for the duration of the callback.
    let payload = unsafe { DebugPayload::from_raw(&*data) };
    log_message(severity, message_types, &payload);
    vk::FALSE
}

unsafe fn lossy(ptr: *const std::ffi::c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: caller passes a nul-terminated string or null.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

unsafe fn slice<'a, T>(ptr: *const T, count: u32) -> &'a [T] {
    if ptr.is_null() || count == 0 {
        return &[];
    }
    // SAFETY: caller guarantees `count` elements at `ptr`.
    unsafe { std::slice::from_raw_parts(ptr, count as usize) }
}
