//! GPU context — wgpu instance, adapter, device and queue.
//!
//! [`GpuContext`] is created once, on the render thread, and outlives every
//! other GPU resource. There is no surface: everything renders into
//! off-screen textures.

use thiserror::Error;

use crate::config::RenderConfig;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

/// Wraps the wgpu device and queue used for all rendering.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Initialize wgpu without a window: create instance, adapter, device and
    /// queue.
    pub fn headless(config: &RenderConfig) -> Result<Self, ContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = match pollster::block_on(instance.request_adapter(
            &wgpu::RequestAdapterOptions {
                power_preference: config.power_preference.into(),
                compatible_surface: None,
                force_fallback_adapter: false,
            },
        )) {
            Ok(adapter) => adapter,
            Err(err) if config.allow_fallback_adapter => {
                log::warn!("no hardware adapter ({err}), trying the fallback adapter");
                pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: config.power_preference.into(),
                    compatible_surface: None,
                    force_fallback_adapter: true,
                }))?
            }
            Err(err) => return Err(err.into()),
        };

        let adapter_info = adapter.get_info();
        log::info!(
            "using adapter \"{}\" ({:?}, {:?})",
            adapter_info.name,
            adapter_info.backend,
            adapter_info.device_type
        );

        // Ask for what the adapter can actually do resolution-wise so large
        // frame targets are limited by hardware, not by conservative defaults.
        let mut required_limits =
            wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits());
        if let Some(limit) = config.texture_size_limit {
            required_limits.max_texture_dimension_2d =
                required_limits.max_texture_dimension_2d.min(limit);
            log::info!(
                "texture size limited to {}",
                required_limits.max_texture_dimension_2d
            );
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("snapframe device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            ..Default::default()
        }))?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Largest width or height a 2D texture may have on this device.
    pub fn max_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Run `f` inside validation and out-of-memory error scopes and return
    /// whichever error the device reported, if any.
    ///
    /// wgpu reports resource creation failures asynchronously; without a
    /// scope they reach the uncaptured error handler and abort the process.
    pub(crate) fn scoped<T>(&self, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        (value, oom.or(validation))
    }
}
