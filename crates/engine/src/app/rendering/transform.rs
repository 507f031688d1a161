use crate::app::{Camera3D, Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn from_window_size(window_size: (u32, u32)) -> Self {
        Self {
            width: window_size.0,
            height: window_size.1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// Window pixels (origin top-left, y down) to normalized device coordinates
/// (origin center, y up).
pub fn pointer_px_to_ndc(pointer_px: Vec2, viewport: Viewport) -> Option<Vec2> {
    if viewport.is_empty() || !pointer_px.x.is_finite() || !pointer_px.y.is_finite() {
        return None;
    }
    Some(Vec2 {
        x: (pointer_px.x / viewport.width as f32) * 2.0 - 1.0,
        y: -(pointer_px.y / viewport.height as f32) * 2.0 + 1.0,
    })
}

pub fn ndc_to_pointer_px(ndc: Vec2, viewport: Viewport) -> Vec2 {
    Vec2 {
        x: (ndc.x + 1.0) * 0.5 * viewport.width as f32,
        y: (1.0 - ndc.y) * 0.5 * viewport.height as f32,
    }
}

/// Screen pixel plus view depth for a world point, `None` when it is behind
/// the camera.
pub fn world_to_screen_px(
    camera: &Camera3D,
    viewport: Viewport,
    world: Vec3,
) -> Option<(i32, i32, f32)> {
    let projected = camera.project(world, viewport.aspect())?;
    let px = ndc_to_pointer_px(projected.ndc, viewport);
    Some((px.x.round() as i32, px.y.round() as i32, projected.depth))
}
