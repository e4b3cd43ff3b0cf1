//! Window management and input handling

use std::sync::Arc;

use anyhow::Result;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use nimbus_scene::{PackedSplats, SceneEvent, SceneHandle};

use crate::camera::OrbitCamera;
use crate::renderer::Renderer;

pub struct App {
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    scene: SceneHandle,

    // Scene handed over to the worker once the window exists
    pending: Option<PackedSplats>,
    alpha_cutoff: u8,

    camera: OrbitCamera,
    orbiting: bool,
}

impl App {
    pub fn new(packed: PackedSplats, alpha_cutoff: u8) -> Self {
        Self {
            window: None,
            renderer: None,
            scene: SceneHandle::spawn(),
            pending: Some(packed),
            alpha_cutoff,
            camera: OrbitCamera::new(),
            orbiting: false,
        }
    }

    fn set_alpha_cutoff(&mut self, cutoff: u8) {
        let cutoff = cutoff.max(1);
        if cutoff != self.alpha_cutoff {
            self.alpha_cutoff = cutoff;
            match self.scene.set_alpha_cutoff(cutoff) {
                Ok(()) => tracing::info!(cutoff, "alpha cutoff changed"),
                Err(error) => tracing::error!(%error, "alpha cutoff not applied"),
            }
        }
    }

    /// Per-frame pump: request a sort for the current view, fold in whatever
    /// the worker produced, then draw with the latest state.
    fn redraw(&mut self) {
        let Some(renderer) = &mut self.renderer else {
            return;
        };

        let (width, height) = renderer.size();
        if let Err(error) = self
            .scene
            .request_sort(self.camera.view_proj(width, height).to_cols_array())
        {
            tracing::warn!(%error, "sort request dropped");
        }

        for event in self.scene.poll() {
            match event {
                SceneEvent::Texture(texture) => renderer.install_texture(&texture),
                SceneEvent::Order(order) => renderer.apply_order(&order),
                SceneEvent::LoadFailed(message) => {
                    tracing::error!(%message, "scene load failed; keeping previous scene");
                }
            }
        }

        if let Err(error) = renderer.render(&self.camera) {
            tracing::warn!(%error, "frame dropped");
        }

        if let Some(window) = &self.window {
            window.set_title(&format!("nimbus | {}", renderer.status()));
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window_attrs = Window::default_attributes()
            .with_title("nimbus")
            .with_inner_size(PhysicalSize::new(1280, 720))
            .with_transparent(true);

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("failed to create window"),
        );

        let renderer = pollster::block_on(Renderer::new(Arc::clone(&window)))
            .expect("failed to initialize the splat renderer");

        if let Some(packed) = self.pending.take() {
            if let Err(error) = self
                .scene
                .load(packed)
                .and_then(|()| self.scene.set_alpha_cutoff(self.alpha_cutoff))
            {
                tracing::error!(%error, "scene handoff failed");
            }
        }

        window.request_redraw();
        self.window = Some(window);
        self.renderer = Some(renderer);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                if let PhysicalKey::Code(key) = event.physical_key {
                    match key {
                        KeyCode::Escape => event_loop.exit(),
                        KeyCode::KeyR => self.camera = OrbitCamera::new(),
                        KeyCode::BracketLeft => {
                            self.set_alpha_cutoff(self.alpha_cutoff.saturating_sub(8));
                        }
                        KeyCode::BracketRight => {
                            self.set_alpha_cutoff(self.alpha_cutoff.saturating_add(8));
                        }
                        _ => {}
                    }
                }
            }

            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.orbiting = state == ElementState::Pressed;
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
                };
                self.camera.zoom(amount);
            }

            WindowEvent::RedrawRequested => self.redraw(),

            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _: &ActiveEventLoop,
        _: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.orbiting {
                self.camera.rotate(dx as f32, dy as f32);
            }
        }
    }
}

/// Open a window and render the packed scene until the user quits.
pub fn run(packed: PackedSplats, alpha_cutoff: u8) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(packed, alpha_cutoff);
    event_loop.run_app(&mut app)?;

    Ok(())
}
