//! Window, event loop and frame pacing.
//!
//! [`run`] opens a window and drives a [`Layers`] stack until the window is
//! closed. The loop follows this pattern each frame:
//! 1. Translate cursor and button input into [`MouseEvent`]s for the stack
//! 2. Call `update` on all layers with the time since the last frame
//! 3. Let all layers `render` into a [`QuadBatcher`]
//! 4. Upload the batches and draw them in one render pass
//! 5. Present the frame
//!
//! When the window closes, `delete` is called once on every layer.

use std::{iter, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::AppConfig,
    context::Context,
    event::MouseEvent,
    layers::Layers,
    pipelines::sprite::SpritePipeline,
    render::QuadBatcher,
};

/// GPU context plus the pipeline, available once the window exists.
struct AppState {
    ctx: Context,
    pipeline: SpritePipeline,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, clear_colour: wgpu::Color) -> anyhow::Result<Self> {
        let ctx = Context::new(window, clear_colour).await?;
        let pipeline = SpritePipeline::new(&ctx.device, ctx.config.format);
        Ok(Self {
            ctx,
            pipeline,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self, batcher: &QuadBatcher) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let frame = self.pipeline.prepare(&self.ctx, batcher);
        log::trace!("drawing {} batches", frame.draw_calls());

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.pipeline.draw(&mut render_pass, &frame);
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: AppConfig,
    layers: Layers,
    batcher: QuadBatcher,
    state: Option<AppState>,
    cursor: PhysicalPosition<f64>,
    last_time: Instant,
    deleted: bool,
}

impl App {
    pub fn new(config: AppConfig, layers: Layers) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            config,
            layers,
            batcher: QuadBatcher::new(),
            state: None,
            cursor: PhysicalPosition::new(0.0, 0.0),
            last_time: Instant::now(),
            deleted: false,
        })
    }

    fn delete_layers(&mut self) {
        if !self.deleted {
            self.layers.delete();
            self.deleted = true;
        }
    }

    /// Hands an event measured in physical pixels to the layers.
    fn dispatch(&mut self, event: MouseEvent) {
        let scale_factor = self
            .state
            .as_ref()
            .map_or(1.0, |state| state.ctx.window.scale_factor());
        let event = event.to_logical(scale_factor);
        let handled = self.layers.handle_mouse_event(&event);
        log::trace!("{:?} handled: {}", event, handled);
    }

    fn redraw(&mut self) {
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();
        self.layers.update(dt);

        self.batcher.clear();
        self.layers.render(&mut self.batcher);

        let Some(state) = &mut self.state else {
            return;
        };
        match state.render(&self.batcher) {
            Ok(_) => {}
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
            }
            Err(e) => {
                log::error!("Unable to render {}", e);
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create the main window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match self
            .async_runtime
            .block_on(AppState::new(window, self.config.clear_colour))
        {
            Ok(mut state) => {
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                state.ctx.window.request_redraw();
                self.last_time = Instant::now();
                self.state = Some(state);
            }
            Err(e) => {
                log::error!("App initialization failed. Cannot create the main context: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.delete_layers();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.resize(size.width, size.height);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = position;
                self.dispatch(MouseEvent::moved(position.x, position.y));
            }
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                let (x, y) = (self.cursor.x, self.cursor.y);
                let event = if button_state.is_pressed() {
                    MouseEvent::pressed(x, y, button.into())
                } else {
                    MouseEvent::released(x, y, button.into())
                };
                self.dispatch(event);
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.delete_layers();
    }
}

/// Opens a window and runs `layers` until it is closed.
pub fn run(config: AppConfig, layers: Layers) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, layers)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
