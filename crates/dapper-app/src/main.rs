// SPDX-License-Identifier: CEPL-1.0
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use dapper_core::init_tracing;
use dapper_platform::{PlatformWindow, WindowSettings};
use dapper_render_vk::{
    AshDriver, BootstrapConfig, DiagnosticSeverity, MessageCategories, VkRenderEngine,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use dapper_platform::winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::WindowId,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file; missing file means defaults
    #[arg(long, default_value = "dapper.toml")]
    config: PathBuf,
    /// Disable validation layers and the debug messenger
    #[arg(long)]
    no_validation: bool,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct AppCfg {
    #[serde(default)]
    window: WindowCfg,
    #[serde(default)]
    vulkan: VulkanCfg,
}

#[derive(Debug, Deserialize)]
struct WindowCfg {
    #[serde(default = "default_title")]
    title: String,
    #[serde(default = "default_width")]
    width: u32,
    #[serde(default = "default_height")]
    height: u32,
}

impl Default for WindowCfg {
    fn default() -> Self {
        WindowCfg {
            title: default_title(),
            width: default_width(),
            height: default_height(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct VulkanCfg {
    app_name: Option<String>,
    engine_name: Option<String>,
    #[serde(default)]
    instance_extensions: Vec<String>,
    device_extensions: Option<Vec<String>>,
    validation: Option<bool>,
    validation_layers: Option<Vec<String>>,
    #[serde(default)]
    min_severity: SeverityCfg,
    #[serde(default)]
    messages: MessagesCfg,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
enum SeverityCfg {
    Verbose,
    Info,
    #[default]
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct MessagesCfg {
    #[serde(default = "default_true")]
    general: bool,
    #[serde(default = "default_true")]
    performance: bool,
    #[serde(default = "default_true")]
    validation: bool,
}

impl Default for MessagesCfg {
    fn default() -> Self {
        MessagesCfg {
            general: true,
            performance: true,
            validation: true,
        }
    }
}

fn default_title() -> String {
    WindowSettings::default().title
}
fn default_width() -> u32 {
    WindowSettings::default().width
}
fn default_height() -> u32 {
    WindowSettings::default().height
}
fn default_true() -> bool {
    true
}

fn load_cfg(path: &Path) -> AppCfg {
    match fs::read_to_string(path) {
        Ok(s) => toml::from_str::<AppCfg>(&s).unwrap_or_else(|e| {
            warn!("ignoring malformed {}: {e}", path.display());
            AppCfg::default()
        }),
        Err(_) => {
            debug!("no config at {}, using defaults", path.display());
            AppCfg::default()
        }
    }
}

impl VulkanCfg {
    fn to_bootstrap(&self, no_validation: bool) -> BootstrapConfig {
        let mut cfg = BootstrapConfig::default();
        if let Some(name) = &self.app_name {
            cfg.app_name = name.clone();
        }
        if let Some(name) = &self.engine_name {
            cfg.engine_name = name.clone();
        }
        cfg.instance_extensions = self.instance_extensions.clone();
        if let Some(exts) = &self.device_extensions {
            cfg.device_extensions = exts.clone();
        }
        if let Some(on) = self.validation {
            cfg.diagnostics.enabled = on;
        }
        if no_validation {
            cfg.diagnostics.enabled = false;
        }
        if let Some(layers) = &self.validation_layers {
            cfg.diagnostics.layers = layers.clone();
        }
        cfg.diagnostics.min_severity = match self.min_severity {
            SeverityCfg::Verbose => DiagnosticSeverity::Verbose,
            SeverityCfg::Info => DiagnosticSeverity::Info,
            SeverityCfg::Warning => DiagnosticSeverity::Warning,
            SeverityCfg::Error => DiagnosticSeverity::Error,
        };
        cfg.diagnostics.categories = MessageCategories {
            general: self.messages.general,
            performance: self.messages.performance,
            validation: self.messages.validation,
        };
        cfg
    }
}

struct App {
    settings: WindowSettings,
    bootstrap: BootstrapConfig,
    // Dropped before `window`: the surface is bound to it.
    engine: Option<VkRenderEngine>,
    window: Option<PlatformWindow>,
    failure: Option<anyhow::Error>,
}

impl App {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = PlatformWindow::create(event_loop, &self.settings)?;
        let engine = VkRenderEngine::new(AshDriver::new(), self.bootstrap.clone(), &window)?;
        self.window = Some(window);
        self.engine = Some(engine);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.engine = None;
        self.window = None;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.failure.is_some() {
            return;
        }
        info!("initializing engine context");
        match self.init(event_loop) {
            Ok(()) => info!("engine context ready"),
            Err(e) => {
                error!("fatal: render engine bootstrap failed: {e:#}");
                self.failure = Some(e);
                self.shutdown();
                event_loop.exit();
                return;
            }
        }
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = &self.window {
            if window_id != window.window().id() {
                return;
            }
        }

        if let WindowEvent::CloseRequested = event {
            info!("CloseRequested");
            self.shutdown();
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
        debug!("engine context destroyed");
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = load_cfg(&args.config);

    let mut app = App {
        settings: WindowSettings {
            title: cfg.window.title.clone(),
            width: args.width.unwrap_or(cfg.window.width),
            height: args.height.unwrap_or(cfg.window.height),
            resizable: false,
        },
        bootstrap: cfg.vulkan.to_bootstrap(args.no_validation),
        engine: None,
        window: None,
        failure: None,
    };

    let event_loop: EventLoop<()> = EventLoop::new()?;
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(e) => Err(e.context("engine context failed to start")),
        None => Ok(()),
    }
}
