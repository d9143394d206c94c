//! GPU device initialization and the frame target.
//!
//! [`RenderContext`] owns the wgpu device and queue plus either a window
//! surface or an offscreen texture to present into.

use std::sync::Arc;

use winit::window::Window;

/// Format of the offscreen target.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Error type for render context initialization failures.
#[derive(Debug, thiserror::Error)]
pub enum RenderContextError {
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    /// Failed to request GPU device.
    #[error("failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// Failed to create surface.
    #[error("failed to create surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
}

/// Error type for frame acquisition failures.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// Surface was lost and could not be recovered.
    #[error("surface lost")]
    Lost,

    /// GPU ran out of memory.
    #[error("out of memory")]
    OutOfMemory,

    /// Operation timed out (recoverable, skip the frame).
    #[error("timeout")]
    Timeout,
}

/// Where finished frames go.
pub enum FrameTarget {
    /// A window's swapchain.
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    /// A texture nobody displays, for runs without a window.
    Offscreen {
        texture: wgpu::Texture,
        width: u32,
        height: u32,
    },
}

/// A frame acquired from the target.
pub enum AcquiredFrame {
    Surface(wgpu::SurfaceTexture),
    Offscreen,
}

/// Owns the GPU device, its queue and the frame target.
pub struct RenderContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub target: FrameTarget,
    pub target_format: wgpu::TextureFormat,
}

impl RenderContext {
    /// Initialize the GPU for presenting into `window`.
    pub async fn for_window(window: Arc<Window>) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let size = window.inner_size();
        let surface = instance.create_surface(window)?;
        let adapter = request_adapter(&instance, Some(&surface)).await?;
        let (device, queue) = request_device(&adapter).await?;

        let caps = surface.get_capabilities(&adapter);
        let format = select_preferred_srgb_format(&caps.formats);
        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::Mailbox
        };
        let alpha_mode = if caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            caps.alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto)
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            device,
            queue,
            target: FrameTarget::Surface { surface, config },
            target_format: format,
        })
    }

    /// Initialize the GPU with an offscreen target of `width`×`height`.
    pub async fn offscreen(width: u32, height: u32) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = request_adapter(&instance, None).await?;
        let (device, queue) = request_device(&adapter).await?;
        let texture = create_offscreen_texture(&device, width, height);
        Ok(Self {
            device,
            queue,
            target: FrameTarget::Offscreen {
                texture,
                width: width.max(1),
                height: height.max(1),
            },
            target_format: OFFSCREEN_FORMAT,
        })
    }

    /// Size of the frame target in physical pixels.
    pub fn target_size(&self) -> (u32, u32) {
        match &self.target {
            FrameTarget::Surface { config, .. } => (config.width, config.height),
            FrameTarget::Offscreen { width, height, .. } => (*width, *height),
        }
    }

    /// Resize the frame target. Zero dimensions are clamped to one.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        match &mut self.target {
            FrameTarget::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.device, config);
            }
            FrameTarget::Offscreen {
                texture,
                width: w,
                height: h,
            } => {
                if (*w, *h) != (width, height) {
                    *texture = create_offscreen_texture(&self.device, width, height);
                    *w = width;
                    *h = height;
                }
            }
        }
    }

    /// Acquire the next frame and a view to draw it into, recovering once
    /// from a lost or outdated surface.
    pub fn acquire(&self) -> Result<(AcquiredFrame, wgpu::TextureView), SurfaceError> {
        let (surface, config) = match &self.target {
            FrameTarget::Surface { surface, config } => (surface, config),
            FrameTarget::Offscreen { texture, .. } => {
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                return Ok((AcquiredFrame::Offscreen, view));
            }
        };
        let texture = match surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("surface lost, reconfiguring");
                surface.configure(&self.device, config);
                surface
                    .get_current_texture()
                    .map_err(|_| SurfaceError::Lost)?
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(SurfaceError::OutOfMemory),
            Err(wgpu::SurfaceError::Timeout) => return Err(SurfaceError::Timeout),
            Err(wgpu::SurfaceError::Other) => {
                tracing::error!("unknown surface error");
                return Err(SurfaceError::Lost);
            }
        };
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok((AcquiredFrame::Surface(texture), view))
    }
}

impl AcquiredFrame {
    /// Hand the frame to the compositor. Offscreen frames stay in their texture.
    pub fn present(self) {
        if let AcquiredFrame::Surface(texture) = self {
            texture.present();
        }
    }
}

async fn request_adapter(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> Result<wgpu::Adapter, RenderContextError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|_| RenderContextError::NoAdapter)?;
    let info = adapter.get_info();
    tracing::info!(
        name = %info.name,
        backend = ?info.backend,
        device_type = ?info.device_type,
        "selected GPU"
    );
    Ok(adapter)
}

async fn request_device(
    adapter: &wgpu::Adapter,
) -> Result<(wgpu::Device, wgpu::Queue), RenderContextError> {
    let pair = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("splash-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        })
        .await?;
    Ok(pair)
}

fn create_offscreen_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen-target"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

/// Initialize a window context synchronously using `pollster`.
pub fn init_window_context_blocking(
    window: Arc<Window>,
) -> Result<RenderContext, RenderContextError> {
    pollster::block_on(RenderContext::for_window(window))
}

/// Initialize an offscreen context synchronously using `pollster`.
pub fn init_offscreen_context_blocking(
    width: u32,
    height: u32,
) -> Result<RenderContext, RenderContextError> {
    pollster::block_on(RenderContext::offscreen(width, height))
}

/// Prefer Bgra8UnormSrgb, then Rgba8UnormSrgb, then any sRGB format.
fn select_preferred_srgb_format(formats: &[wgpu::TextureFormat]) -> wgpu::TextureFormat {
    if formats.contains(&wgpu::TextureFormat::Bgra8UnormSrgb) {
        wgpu::TextureFormat::Bgra8UnormSrgb
    } else if formats.contains(&wgpu::TextureFormat::Rgba8UnormSrgb) {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| formats.first().copied())
            .unwrap_or(OFFSCREEN_FORMAT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_bgra_srgb() {
        let formats = [
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ];
        assert_eq!(
            select_preferred_srgb_format(&formats),
            wgpu::TextureFormat::Bgra8UnormSrgb
        );
    }

    #[test]
    fn test_falls_back_to_first_format() {
        let formats = [wgpu::TextureFormat::Rgba16Float];
        assert_eq!(
            select_preferred_srgb_format(&formats),
            wgpu::TextureFormat::Rgba16Float
        );
        assert_eq!(select_preferred_srgb_format(&[]), OFFSCREEN_FORMAT);
    }

    #[test]
    fn test_offscreen_context_when_adapter_available() {
        // Headless CI has no adapter; that is not a failure.
        let Ok(mut ctx) = init_offscreen_context_blocking(64, 32) else {
            return;
        };
        assert_eq!(ctx.target_size(), (64, 32));
        ctx.resize(0, 16);
        assert_eq!(ctx.target_size(), (1, 16));
        assert!(ctx.acquire().is_ok());
    }
}
