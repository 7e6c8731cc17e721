//! Rendering module
//!
//! Repaints the whole surface every frame through the `Surface` trait. The
//! web build paints into a canvas 2D context; headless builds record commands.

#[cfg(target_arch = "wasm32")]
pub mod canvas;
pub mod draw;
pub mod label;
pub mod surface;

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasSurface;
pub use draw::Renderer;
pub use label::LabelEntity;
pub use surface::{DrawCommand, RecordingSurface, Surface};
