//! wgpu splat renderer and windowed viewer shell

pub mod camera;
pub mod pipeline;
pub mod renderer;
pub mod window;

pub use camera::OrbitCamera;
pub use renderer::Renderer;
pub use window::run;
