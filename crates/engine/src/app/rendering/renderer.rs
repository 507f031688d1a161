use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::{Camera3D, Entity, RenderableKind, SceneOverlay, SceneWorld, Vec3};

use super::{world_to_screen_px, Viewport, MARKER_HALF_SIZE_PX};

const CLEAR_COLOR: [u8; 4] = [18, 24, 32, 255];
const GROUND_MINOR_COLOR: [u8; 4] = [38, 56, 44, 255];
const GROUND_MAJOR_COLOR: [u8; 4] = [62, 88, 66, 255];
const GROUND_HALF_EXTENT: i32 = 24;
const GROUND_MAJOR_EVERY: i32 = 5;
const AVATAR_COLOR: [u8; 4] = [90, 170, 255, 255];
const HOVER_HIGHLIGHT_COLOR: [u8; 4] = [255, 210, 70, 255];
const PANEL_BACKGROUND_COLOR: [u8; 4] = [12, 14, 20, 255];
const PANEL_BORDER_COLOR: [u8; 4] = [170, 150, 110, 255];
const PANEL_LINE_COLOR: [u8; 4] = [200, 200, 210, 255];
const PANEL_OPTION_COLOR: [u8; 4] = [230, 190, 90, 255];
const PROMPT_COLOR: [u8; 4] = [240, 240, 240, 255];
const MARKER_REFERENCE_DEPTH: f32 = 10.0;
const MARKER_MIN_HALF_SIZE_PX: i32 = 2;
const MARKER_MAX_HALF_SIZE_PX: i32 = 28;
const HIGHLIGHT_PADDING_PX: i32 = 3;
const PANEL_ROW_HEIGHT_PX: i32 = 14;
const PANEL_PADDING_PX: i32 = 10;

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    draw_list: Vec<DrawItem>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DrawItem {
    entity_index: usize,
    x: i32,
    y: i32,
    depth: f32,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport::from_window_size((size.width, size.height)),
            draw_list: Vec::new(),
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_world(
        &mut self,
        world: &SceneWorld,
        overlay: SceneOverlay,
    ) -> Result<(), Error> {
        if self.viewport.is_empty() {
            return Ok(());
        }
        let viewport = self.viewport;
        let mut target = FrameTarget {
            frame: self.pixels.frame_mut(),
            width: viewport.width as i32,
            height: viewport.height as i32,
        };
        target.clear(CLEAR_COLOR);

        if let Some(camera) = world.camera() {
            draw_ground(&mut target, camera, viewport);
            collect_draw_list(world.entities(), camera, viewport, &mut self.draw_list);
            for item in &self.draw_list {
                draw_entity(&mut target, &world.entities()[item.entity_index], item);
            }
        }
        draw_overlay(&mut target, overlay);

        self.pixels.render()
    }
}

/// Back to front, so nearer markers paint over farther ones.
fn collect_draw_list(
    entities: &[Entity],
    camera: &Camera3D,
    viewport: Viewport,
    out: &mut Vec<DrawItem>,
) {
    out.clear();
    for (entity_index, entity) in entities.iter().enumerate() {
        let Some((x, y, depth)) = world_to_screen_px(camera, viewport, entity.transform.position)
        else {
            continue;
        };
        out.push(DrawItem {
            entity_index,
            x,
            y,
            depth,
        });
    }
    out.sort_by(|a, b| {
        b.depth
            .total_cmp(&a.depth)
            .then(a.entity_index.cmp(&b.entity_index))
    });
}

fn marker_half_size_px(depth: f32) -> i32 {
    if !depth.is_finite() || depth <= 0.0 {
        return MARKER_MAX_HALF_SIZE_PX;
    }
    let scaled = MARKER_HALF_SIZE_PX as f32 * MARKER_REFERENCE_DEPTH / depth;
    (scaled.round() as i32).clamp(MARKER_MIN_HALF_SIZE_PX, MARKER_MAX_HALF_SIZE_PX)
}

fn draw_ground(target: &mut FrameTarget<'_>, camera: &Camera3D, viewport: Viewport) {
    let center_x = camera.target.x.round() as i32;
    let center_z = camera.target.z.round() as i32;
    for ix in (center_x - GROUND_HALF_EXTENT)..=(center_x + GROUND_HALF_EXTENT) {
        for iz in (center_z - GROUND_HALF_EXTENT)..=(center_z + GROUND_HALF_EXTENT) {
            let point = Vec3::new(ix as f32, 0.0, iz as f32);
            let Some((x, y, _)) = world_to_screen_px(camera, viewport, point) else {
                continue;
            };
            let major = ix.rem_euclid(GROUND_MAJOR_EVERY) == 0
                && iz.rem_euclid(GROUND_MAJOR_EVERY) == 0;
            if major {
                target.fill_rect(x - 1, y - 1, 3, 3, GROUND_MAJOR_COLOR);
            } else {
                target.put_pixel(x, y, GROUND_MINOR_COLOR);
            }
        }
    }
}

fn draw_entity(target: &mut FrameTarget<'_>, entity: &Entity, item: &DrawItem) {
    let half = marker_half_size_px(item.depth);
    let color = match entity.renderable {
        RenderableKind::Marker { color } => color,
        RenderableKind::Avatar => AVATAR_COLOR,
    };
    // Markers stand on their feet: the anchor is the bottom center.
    let left = item.x - half;
    let top = item.y - half * 2;
    target.fill_rect(left, top, half * 2 + 1, half * 2 + 1, color);
    if entity.highlighted {
        target.stroke_rect(
            left - HIGHLIGHT_PADDING_PX,
            top - HIGHLIGHT_PADDING_PX,
            half * 2 + 1 + HIGHLIGHT_PADDING_PX * 2,
            half * 2 + 1 + HIGHLIGHT_PADDING_PX * 2,
            HOVER_HIGHLIGHT_COLOR,
        );
    }
}

fn draw_overlay(target: &mut FrameTarget<'_>, overlay: SceneOverlay) {
    if overlay.dialogue_open {
        draw_dialogue_panel(target, overlay);
    } else if overlay.prompt_visible {
        let width = (target.width / 3).max(1);
        let left = (target.width - width) / 2;
        let top = target.height - PANEL_PADDING_PX * 4;
        target.fill_rect(left, top, width, PANEL_ROW_HEIGHT_PX, PANEL_BACKGROUND_COLOR);
        target.stroke_rect(left, top, width, PANEL_ROW_HEIGHT_PX, PROMPT_COLOR);
    }
}

fn draw_dialogue_panel(target: &mut FrameTarget<'_>, overlay: SceneOverlay) {
    let rows = (overlay.dialogue_line_count + overlay.dialogue_option_count).max(1) as i32;
    let panel_height = rows * PANEL_ROW_HEIGHT_PX + PANEL_PADDING_PX * 2;
    let panel_width = (target.width * 2 / 3).max(1);
    let left = (target.width - panel_width) / 2;
    let top = target.height - panel_height - PANEL_PADDING_PX;
    target.fill_rect(left, top, panel_width, panel_height, PANEL_BACKGROUND_COLOR);
    target.stroke_rect(left, top, panel_width, panel_height, PANEL_BORDER_COLOR);

    let text_left = left + PANEL_PADDING_PX;
    let text_width = panel_width - PANEL_PADDING_PX * 2;
    let mut row_top = top + PANEL_PADDING_PX;
    for _ in 0..overlay.dialogue_line_count {
        target.fill_rect(text_left, row_top + 4, text_width, 4, PANEL_LINE_COLOR);
        row_top += PANEL_ROW_HEIGHT_PX;
    }
    for _ in 0..overlay.dialogue_option_count {
        target.fill_rect(text_left, row_top + 4, text_width / 3, 4, PANEL_OPTION_COLOR);
        row_top += PANEL_ROW_HEIGHT_PX;
    }
}

struct FrameTarget<'a> {
    frame: &'a mut [u8],
    width: i32,
    height: i32,
}

impl FrameTarget<'_> {
    fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    fn put_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        if let Some(pixel) = self.frame.get_mut(offset..offset + 4) {
            pixel.copy_from_slice(&color);
        }
    }

    fn fill_rect(&mut self, left: i32, top: i32, width: i32, height: i32, color: [u8; 4]) {
        let x_start = left.max(0);
        let y_start = top.max(0);
        let x_end = left.saturating_add(width).min(self.width);
        let y_end = top.saturating_add(height).min(self.height);
        for y in y_start..y_end {
            for x in x_start..x_end {
                self.put_pixel(x, y, color);
            }
        }
    }

    fn stroke_rect(&mut self, left: i32, top: i32, width: i32, height: i32, color: [u8; 4]) {
        if width <= 0 || height <= 0 {
            return;
        }
        let right = left + width - 1;
        let bottom = top + height - 1;
        for x in left..=right {
            self.put_pixel(x, top, color);
            self.put_pixel(x, bottom, color);
        }
        for y in top..=bottom {
            self.put_pixel(left, y, color);
            self.put_pixel(right, y, color);
        }
    }
}
