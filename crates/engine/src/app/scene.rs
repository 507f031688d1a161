use super::camera::Camera3D;
use super::input::{ActionStates, InputAction};
use super::math::{Vec2, Vec3};
use super::picking::{Ray, RayHit, RaycastScene};

pub const DEFAULT_INTERACTION_RADIUS: f32 = 2.0;
pub const DEFAULT_PICK_RADIUS: f32 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    cursor_position_px: Option<Vec2>,
    left_click_pressed: bool,
    interact_pressed: bool,
    close_pressed: bool,
    option_pressed: Option<u8>,
    save_pressed: bool,
    load_pressed: bool,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        cursor_position_px: Option<Vec2>,
        left_click_pressed: bool,
        interact_pressed: bool,
        close_pressed: bool,
        option_pressed: Option<u8>,
        save_pressed: bool,
        load_pressed: bool,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            cursor_position_px,
            left_click_pressed,
            interact_pressed,
            close_pressed,
            option_pressed,
            save_pressed,
            load_pressed,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_left_click_pressed(mut self, left_click_pressed: bool) -> Self {
        self.left_click_pressed = left_click_pressed;
        self
    }

    pub fn with_interact_pressed(mut self, interact_pressed: bool) -> Self {
        self.interact_pressed = interact_pressed;
        self
    }

    pub fn with_close_pressed(mut self, close_pressed: bool) -> Self {
        self.close_pressed = close_pressed;
        self
    }

    pub fn with_option_pressed(mut self, option_pressed: Option<u8>) -> Self {
        self.option_pressed = option_pressed;
        self
    }

    pub fn with_save_pressed(mut self, save_pressed: bool) -> Self {
        self.save_pressed = save_pressed;
        self
    }

    pub fn with_load_pressed(mut self, load_pressed: bool) -> Self {
        self.load_pressed = load_pressed;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn left_click_pressed(&self) -> bool {
        self.left_click_pressed
    }

    pub fn interact_pressed(&self) -> bool {
        self.interact_pressed
    }

    pub fn close_pressed(&self) -> bool {
        self.close_pressed
    }

    /// Zero-based dialogue option chosen this tick.
    pub fn option_pressed(&self) -> Option<u8> {
        self.option_pressed
    }

    pub fn save_pressed(&self) -> bool {
        self.save_pressed
    }

    pub fn load_pressed(&self) -> bool {
        self.load_pressed
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub yaw_radians: f32,
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            yaw_radians: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderableKind {
    Marker { color: [u8; 4] },
    Avatar,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interactable {
    pub interaction_radius: f32,
}

impl Default for Interactable {
    fn default() -> Self {
        Self {
            interaction_radius: DEFAULT_INTERACTION_RADIUS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub transform: Transform,
    pub renderable: RenderableKind,
    /// Bounding sphere radius for ray picking; `None` is not pickable.
    pub pick_radius: Option<f32>,
    pub interactable: Option<Interactable>,
    pub highlighted: bool,
    applied_spawn_order: u64,
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// What the renderer should draw on top of the world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneOverlay {
    pub prompt_visible: bool,
    pub dialogue_line_count: usize,
    pub dialogue_option_count: usize,
    pub dialogue_open: bool,
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    next_applied_spawn_order: u64,
    camera: Option<Camera3D>,
}

impl SceneWorld {
    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        renderable: RenderableKind,
    ) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            name: name.into(),
            transform,
            renderable,
            pick_radius: None,
            interactable: None,
            highlighted: false,
            applied_spawn_order: 0,
        });
        id
    }

    pub fn spawn_interactable(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        renderable: RenderableKind,
        interactable: Interactable,
    ) -> EntityId {
        let id = self.spawn(name, transform, renderable);
        if let Some(entity) = self.pending_spawns.last_mut() {
            entity.pick_radius = Some(DEFAULT_PICK_RADIUS);
            entity.interactable = Some(interactable);
        }
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_spawns.is_empty() {
            for mut entity in self.pending_spawns.drain(..) {
                entity.applied_spawn_order = self.next_applied_spawn_order;
                self.next_applied_spawn_order = self.next_applied_spawn_order.saturating_add(1);
                self.entities.push(entity);
            }
        }

        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort();
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.pending_despawns.clear();
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.next_applied_spawn_order = 0;
        self.camera = None;
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    /// Interactable entities in the order they entered the world.
    pub fn interactable_ids(&self) -> Vec<EntityId> {
        let mut ids = self
            .entities
            .iter()
            .filter(|entity| entity.interactable.is_some())
            .map(|entity| (entity.applied_spawn_order, entity.id))
            .collect::<Vec<_>>();
        ids.sort_by_key(|(order, _)| *order);
        ids.into_iter().map(|(_, id)| id).collect()
    }

    pub fn highlighted_ids(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|entity| entity.highlighted)
            .map(|entity| entity.id)
            .collect()
    }

    pub fn camera(&self) -> Option<&Camera3D> {
        self.camera.as_ref()
    }

    pub fn set_camera(&mut self, camera: Camera3D) {
        self.camera = Some(camera);
    }
}

impl RaycastScene for SceneWorld {
    fn camera(&self) -> Option<&Camera3D> {
        self.camera.as_ref()
    }

    fn intersect_ray(
        &self,
        ray: &Ray,
        candidates: &[EntityId],
        max_distance: f32,
    ) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for id in candidates {
            let Some(entity) = self.find_entity(*id) else {
                continue;
            };
            let Some(radius) = entity.pick_radius else {
                continue;
            };
            let Some(distance) = ray.intersect_sphere(entity.transform.position, radius) else {
                continue;
            };
            if distance > max_distance {
                continue;
            }
            match best {
                Some(hit) if hit.distance <= distance => {}
                _ => {
                    best = Some(RayHit {
                        entity: *id,
                        distance,
                    })
                }
            }
        }
        best
    }

    fn set_highlighted(&mut self, id: EntityId, highlighted: bool) -> bool {
        match self.find_entity_mut(id) {
            Some(entity) => {
                entity.highlighted = highlighted;
                true
            }
            None => false,
        }
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
    fn overlay(&self) -> SceneOverlay {
        SceneOverlay::default()
    }
}

pub(crate) struct SceneRuntime {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneRuntime {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    pub(crate) fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.world.apply_pending();
        self.is_loaded = true;
    }

    pub(crate) fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if !self.is_loaded {
            return SceneCommand::None;
        }
        let command = self.scene.update(fixed_dt_seconds, input, &mut self.world);
        self.world.apply_pending();
        command
    }

    pub(crate) fn shutdown(&mut self) {
        if !self.is_loaded {
            return;
        }
        self.scene.unload(&mut self.world);
        self.world.clear();
        self.is_loaded = false;
    }

    pub(crate) fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }

    pub(crate) fn overlay(&self) -> SceneOverlay {
        self.scene.overlay()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn marker() -> RenderableKind {
        RenderableKind::Marker {
            color: [200, 200, 200, 255],
        }
    }

    struct CountingScene {
        spawn_count: usize,
        unloads: Rc<Cell<u32>>,
    }

    impl Scene for CountingScene {
        fn load(&mut self, world: &mut SceneWorld) {
            for index in 0..self.spawn_count {
                world.spawn(format!("npc_{index}"), Transform::default(), marker());
            }
        }

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            input: &InputSnapshot,
            world: &mut SceneWorld,
        ) -> SceneCommand {
            if let Some(entity) = world.find_entity_mut(EntityId(0)) {
                entity.transform.position.x += 1.0;
            }
            if input.quit_requested() {
                SceneCommand::Quit
            } else {
                SceneCommand::None
            }
        }

        fn unload(&mut self, _world: &mut SceneWorld) {
            self.unloads.set(self.unloads.get() + 1);
        }
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut allocator = EntityIdAllocator::default();
        let first = allocator.allocate();
        let second = allocator.allocate();
        let third = allocator.allocate();

        assert_eq!(first.0, 0);
        assert_eq!(second.0, 1);
        assert_eq!(third.0, 2);
    }

    #[test]
    fn scene_world_spawn_and_despawn_updates_count() {
        let mut world = SceneWorld::default();
        let id = world.spawn("npc", Transform::default(), marker());
        world.apply_pending();
        assert_eq!(world.entity_count(), 1);

        assert!(world.despawn(id));
        world.apply_pending();
        assert_eq!(world.entity_count(), 0);
        assert!(!world.despawn(id));
    }

    #[test]
    fn duplicate_pending_despawns_are_idempotent() {
        let mut world = SceneWorld::default();
        let doomed = world.spawn("doomed", Transform::default(), marker());
        let survivor = world.spawn(
            "survivor",
            Transform::at(Vec3::new(3.0, 0.0, 1.0)),
            marker(),
        );
        world.apply_pending();

        assert!(world.despawn(doomed));
        assert!(world.despawn(doomed));
        world.apply_pending();

        assert_eq!(world.entity_count(), 1);
        assert!(world.find_entity(doomed).is_none());
        assert!(world.find_entity(survivor).is_some());
    }

    #[test]
    fn spawn_interactable_is_pickable_with_default_radius() {
        let mut world = SceneWorld::default();
        let id = world.spawn_interactable(
            "Village Elder",
            Transform::default(),
            marker(),
            Interactable::default(),
        );
        world.apply_pending();
        let entity = world.find_entity(id).expect("entity");
        assert_eq!(entity.pick_radius, Some(DEFAULT_PICK_RADIUS));
        assert_eq!(
            entity.interactable.map(|i| i.interaction_radius),
            Some(DEFAULT_INTERACTION_RADIUS)
        );
        assert_eq!(world.interactable_ids(), vec![id]);
    }

    #[test]
    fn interactable_ids_follow_spawn_order_and_skip_plain_entities() {
        let mut world = SceneWorld::default();
        let first =
            world.spawn_interactable("a", Transform::default(), marker(), Interactable::default());
        world.spawn("avatar", Transform::default(), RenderableKind::Avatar);
        let second =
            world.spawn_interactable("b", Transform::default(), marker(), Interactable::default());
        world.apply_pending();
        assert_eq!(world.interactable_ids(), vec![first, second]);
    }

    #[test]
    fn intersect_ray_prefers_nearest_then_candidate_order() {
        let mut world = SceneWorld::default();
        let back = world.spawn_interactable(
            "back",
            Transform::at(Vec3::new(0.0, 0.0, -4.0)),
            marker(),
            Interactable::default(),
        );
        let front = world.spawn_interactable(
            "front",
            Transform::at(Vec3::new(0.0, 0.0, 0.0)),
            marker(),
            Interactable::default(),
        );
        let twin = world.spawn_interactable(
            "twin",
            Transform::at(Vec3::new(0.0, 0.0, 0.0)),
            marker(),
            Interactable::default(),
        );
        world.apply_pending();
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 10.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
        };

        let hit = world
            .intersect_ray(&ray, &[back, front, twin], 100.0)
            .expect("hit");
        assert_eq!(hit.entity, front);

        let hit = world
            .intersect_ray(&ray, &[back, twin, front], 100.0)
            .expect("hit");
        assert_eq!(hit.entity, twin);

        assert!(world.intersect_ray(&ray, &[back, front], 5.0).is_none());
    }

    #[test]
    fn intersect_ray_skips_unpickable_and_missing_entities() {
        let mut world = SceneWorld::default();
        let plain = world.spawn("plain", Transform::default(), marker());
        world.apply_pending();
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 10.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
        };
        assert!(world
            .intersect_ray(&ray, &[plain, EntityId(99)], 100.0)
            .is_none());
    }

    #[test]
    fn set_highlighted_reports_missing_entities() {
        let mut world = SceneWorld::default();
        let id = world.spawn("npc", Transform::default(), marker());
        world.apply_pending();
        assert!(world.set_highlighted(id, true));
        assert_eq!(world.highlighted_ids(), vec![id]);
        assert!(!world.set_highlighted(EntityId(42), true));
    }

    #[test]
    fn clear_drops_entities_and_camera() {
        let mut world = SceneWorld::default();
        world.spawn("npc", Transform::default(), marker());
        world.set_camera(Camera3D::default());
        world.apply_pending();
        world.clear();
        assert_eq!(world.entity_count(), 0);
        assert!(RaycastScene::camera(&world).is_none());
    }

    #[test]
    fn runtime_loads_once_and_unloads_on_shutdown() {
        let unloads = Rc::new(Cell::new(0));
        let mut runtime = SceneRuntime::new(Box::new(CountingScene {
            spawn_count: 2,
            unloads: Rc::clone(&unloads),
        }));
        runtime.load();
        runtime.load();
        assert_eq!(runtime.world().entity_count(), 2);

        let command = runtime.update(1.0 / 60.0, &InputSnapshot::empty());
        assert_eq!(command, SceneCommand::None);
        assert_eq!(runtime.world().entities()[0].transform.position.x, 1.0);

        runtime.shutdown();
        runtime.shutdown();
        assert_eq!(unloads.get(), 1);
        assert_eq!(runtime.world().entity_count(), 0);
    }

    #[test]
    fn runtime_does_not_update_before_load() {
        let mut runtime = SceneRuntime::new(Box::new(CountingScene {
            spawn_count: 1,
            unloads: Rc::new(Cell::new(0)),
        }));
        let quit = InputSnapshot::empty();
        assert_eq!(runtime.update(1.0 / 60.0, &quit), SceneCommand::None);
        assert_eq!(runtime.world().entity_count(), 0);
    }
}
