mod renderer;
mod transform;

pub use renderer::Renderer;
pub use transform::{ndc_to_pointer_px, pointer_px_to_ndc, world_to_screen_px, Viewport};

pub const MARKER_HALF_SIZE_PX: i32 = 6;
