mod camera;
mod input;
mod loop_runner;
mod math;
mod metrics;
mod picking;
mod rendering;
mod scene;

pub use camera::{Camera3D, CameraBasis, OrbitRig, ProjectedPoint};
pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use math::{Vec2, Vec3};
pub use metrics::LoopMetricsSnapshot;
pub use picking::{PickingService, Ray, RayHit, RaycastScene, DEFAULT_MAX_PICK_DISTANCE};
pub use rendering::{
    ndc_to_pointer_px, pointer_px_to_ndc, world_to_screen_px, Renderer, Viewport,
    MARKER_HALF_SIZE_PX,
};
pub use scene::{
    Entity, EntityId, InputSnapshot, Interactable, RenderableKind, Scene, SceneCommand,
    SceneOverlay, SceneWorld, Transform, DEFAULT_INTERACTION_RADIUS, DEFAULT_PICK_RADIUS,
};
