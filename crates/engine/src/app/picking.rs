use tracing::debug;

use super::camera::Camera3D;
use super::math::{Vec2, Vec3};
use super::rendering::{pointer_px_to_ndc, Viewport};
use super::scene::EntityId;

pub const DEFAULT_MAX_PICK_DISTANCE: f32 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Distance along the ray to the first contact with the sphere. An origin
    /// inside the sphere hits at distance 0.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        if !radius.is_finite() || radius <= 0.0 {
            return None;
        }
        let to_origin = self.origin - center;
        let b = to_origin.dot(self.direction);
        let c = to_origin.length_sq() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let far = -b + root;
        if far < 0.0 {
            return None;
        }
        let near = -b - root;
        Some(near.max(0.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: EntityId,
    pub distance: f32,
}

/// Renderer capabilities consumed by picking.
pub trait RaycastScene {
    fn camera(&self) -> Option<&Camera3D>;

    /// Nearest candidate hit within `max_distance`; equal distances resolve to
    /// the earlier candidate in `candidates`.
    fn intersect_ray(
        &self,
        ray: &Ray,
        candidates: &[EntityId],
        max_distance: f32,
    ) -> Option<RayHit>;

    /// Returns false when the entity no longer exists.
    fn set_highlighted(&mut self, id: EntityId, highlighted: bool) -> bool;
}

#[derive(Debug, Clone)]
pub struct PickingService {
    candidates: Vec<EntityId>,
    pointer_ndc: Option<Vec2>,
    aspect: f32,
    max_distance: f32,
    hovered: Option<EntityId>,
}

impl Default for PickingService {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PICK_DISTANCE)
    }
}

impl PickingService {
    pub fn new(max_distance: f32) -> Self {
        let max_distance = if max_distance.is_finite() && max_distance > 0.0 {
            max_distance
        } else {
            DEFAULT_MAX_PICK_DISTANCE
        };
        Self {
            candidates: Vec::new(),
            pointer_ndc: None,
            aspect: 1.0,
            max_distance,
            hovered: None,
        }
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    /// Replaces the candidate set. Registration order is the tie-break order.
    pub fn register_candidates(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.candidates.clear();
        for id in ids {
            if !self.candidates.contains(&id) {
                self.candidates.push(id);
            }
        }
    }

    /// Drops `id` from the candidate set and forgets it as the hover target.
    pub fn unregister(&mut self, id: EntityId) {
        self.candidates.retain(|candidate| *candidate != id);
        if self.hovered == Some(id) {
            self.hovered = None;
        }
    }

    pub fn candidates(&self) -> &[EntityId] {
        &self.candidates
    }

    pub fn set_pointer_px(&mut self, pointer_px: Option<Vec2>, viewport: Viewport) {
        self.pointer_ndc = pointer_px.and_then(|px| pointer_px_to_ndc(px, viewport));
        self.aspect = viewport.aspect();
    }

    pub fn clear_pointer(&mut self) {
        self.pointer_ndc = None;
    }

    pub fn pointer_ndc(&self) -> Option<Vec2> {
        self.pointer_ndc
    }

    pub fn hovered(&self) -> Option<EntityId> {
        self.hovered
    }

    pub fn pick(&self, scene: &impl RaycastScene) -> Option<RayHit> {
        if self.candidates.is_empty() {
            return None;
        }
        let ndc = self.pointer_ndc?;
        let camera = scene.camera()?;
        let ray = camera.ray_through_ndc(ndc, self.aspect);
        scene.intersect_ray(&ray, &self.candidates, self.max_distance)
    }

    /// Picks and moves the highlight so only the hovered entity carries it.
    pub fn update(&mut self, scene: &mut impl RaycastScene) -> Option<EntityId> {
        let next = self.pick(scene).map(|hit| hit.entity);
        if next != self.hovered {
            if let Some(previous) = self.hovered {
                scene.set_highlighted(previous, false);
            }
            if let Some(current) = next {
                if !scene.set_highlighted(current, true) {
                    debug!(entity = current.0, "hover_target_missing");
                }
            }
            debug!(
                previous = ?self.hovered.map(|id| id.0),
                current = ?next.map(|id| id.0),
                "hover_changed"
            );
            self.hovered = next;
        }
        self.hovered
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct FakeScene {
        camera: Option<Camera3D>,
        spheres: Vec<(EntityId, Vec3, f32)>,
        highlighted: HashMap<EntityId, bool>,
    }

    impl FakeScene {
        fn with_spheres(spheres: Vec<(EntityId, Vec3, f32)>) -> Self {
            Self {
                camera: Some(Camera3D::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO)),
                spheres,
                highlighted: HashMap::new(),
            }
        }

        fn highlighted_ids(&self) -> Vec<EntityId> {
            let mut ids = self
                .highlighted
                .iter()
                .filter(|(_, on)| **on)
                .map(|(id, _)| *id)
                .collect::<Vec<_>>();
            ids.sort_by_key(|id| id.0);
            ids
        }
    }

    impl RaycastScene for FakeScene {
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
                let Some((_, center, radius)) = self.spheres.iter().find(|(sid, _, _)| sid == id)
                else {
                    continue;
                };
                let Some(distance) = ray.intersect_sphere(*center, *radius) else {
                    continue;
                };
                if distance > max_distance {
                    continue;
                }
                if best.map_or(true, |hit| distance < hit.distance) {
                    best = Some(RayHit {
                        entity: *id,
                        distance,
                    });
                }
            }
            best
        }

        fn set_highlighted(&mut self, id: EntityId, highlighted: bool) -> bool {
            if !self.spheres.iter().any(|(sid, _, _)| *sid == id) {
                return false;
            }
            self.highlighted.insert(id, highlighted);
            true
        }
    }

    const VIEWPORT: Viewport = Viewport {
        width: 800,
        height: 600,
    };

    fn center_px() -> Option<Vec2> {
        Some(Vec2 { x: 400.0, y: 300.0 })
    }

    #[test]
    fn ray_hits_sphere_front_surface() {
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 10.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
        };
        let distance = ray.intersect_sphere(Vec3::ZERO, 1.0).expect("hit");
        assert!((distance - 9.0).abs() < 0.0001);
    }

    #[test]
    fn ray_misses_sphere_behind_origin() {
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 10.0),
            direction: Vec3::new(0.0, 0.0, 1.0),
        };
        assert!(ray.intersect_sphere(Vec3::ZERO, 1.0).is_none());
    }

    #[test]
    fn ray_origin_inside_sphere_hits_at_zero() {
        let ray = Ray {
            origin: Vec3::ZERO,
            direction: Vec3::new(1.0, 0.0, 0.0),
        };
        assert_eq!(ray.intersect_sphere(Vec3::ZERO, 2.0), Some(0.0));
    }

    #[test]
    fn pick_returns_nearest_candidate() {
        let near = EntityId(1);
        let far = EntityId(2);
        let scene = FakeScene::with_spheres(vec![
            (far, Vec3::new(0.0, 0.0, -2.0), 1.0),
            (near, Vec3::new(0.0, 0.0, 2.0), 1.0),
        ]);
        let mut picking = PickingService::default();
        picking.register_candidates([far, near]);
        picking.set_pointer_px(center_px(), VIEWPORT);

        let hit = picking.pick(&scene).expect("hit");
        assert_eq!(hit.entity, near);
        assert!((hit.distance - 7.0).abs() < 0.0001);
    }

    #[test]
    fn pick_ignores_unregistered_entities() {
        let registered = EntityId(1);
        let stray = EntityId(2);
        let scene = FakeScene::with_spheres(vec![
            (registered, Vec3::new(0.0, 0.0, -2.0), 1.0),
            (stray, Vec3::new(0.0, 0.0, 2.0), 1.0),
        ]);
        let mut picking = PickingService::default();
        picking.register_candidates([registered]);
        picking.set_pointer_px(center_px(), VIEWPORT);

        assert_eq!(picking.pick(&scene).map(|hit| hit.entity), Some(registered));
    }

    #[test]
    fn pick_respects_max_distance() {
        let id = EntityId(1);
        let scene = FakeScene::with_spheres(vec![(id, Vec3::new(0.0, 0.0, -15.0), 1.0)]);
        let mut picking = PickingService::new(18.0);
        picking.register_candidates([id]);
        picking.set_pointer_px(center_px(), VIEWPORT);
        assert!(picking.pick(&scene).is_none());

        let mut far_reaching = PickingService::new(30.0);
        far_reaching.register_candidates([id]);
        far_reaching.set_pointer_px(center_px(), VIEWPORT);
        assert!(far_reaching.pick(&scene).is_some());
    }

    #[test]
    fn no_camera_or_no_candidates_is_no_hit() {
        let id = EntityId(1);
        let mut scene = FakeScene::with_spheres(vec![(id, Vec3::ZERO, 1.0)]);
        let mut picking = PickingService::default();
        picking.set_pointer_px(center_px(), VIEWPORT);
        assert!(picking.pick(&scene).is_none());

        picking.register_candidates([id]);
        scene.camera = None;
        assert!(picking.pick(&scene).is_none());
    }

    #[test]
    fn hover_moves_single_highlight_between_entities() {
        let left = EntityId(1);
        let right = EntityId(2);
        let mut scene = FakeScene::with_spheres(vec![
            (left, Vec3::new(-3.0, 0.0, 0.0), 1.0),
            (right, Vec3::new(3.0, 0.0, 0.0), 1.0),
        ]);
        let camera = scene.camera.expect("camera");
        let left_px = {
            let ndc = camera
                .project(Vec3::new(-3.0, 0.0, 0.0), VIEWPORT.aspect())
                .expect("ndc");
            crate::app::rendering::ndc_to_pointer_px(ndc.ndc, VIEWPORT)
        };
        let right_px = {
            let ndc = camera
                .project(Vec3::new(3.0, 0.0, 0.0), VIEWPORT.aspect())
                .expect("ndc");
            crate::app::rendering::ndc_to_pointer_px(ndc.ndc, VIEWPORT)
        };

        let mut picking = PickingService::default();
        picking.register_candidates([left, right]);

        picking.set_pointer_px(Some(left_px), VIEWPORT);
        assert_eq!(picking.update(&mut scene), Some(left));
        assert_eq!(scene.highlighted_ids(), vec![left]);

        picking.set_pointer_px(Some(right_px), VIEWPORT);
        assert_eq!(picking.update(&mut scene), Some(right));
        assert_eq!(scene.highlighted_ids(), vec![right]);
    }

    #[test]
    fn pointer_off_all_entities_clears_highlight() {
        let id = EntityId(1);
        let mut scene = FakeScene::with_spheres(vec![(id, Vec3::ZERO, 1.0)]);
        let mut picking = PickingService::default();
        picking.register_candidates([id]);
        picking.set_pointer_px(center_px(), VIEWPORT);
        assert_eq!(picking.update(&mut scene), Some(id));

        picking.set_pointer_px(Some(Vec2 { x: 5.0, y: 5.0 }), VIEWPORT);
        assert_eq!(picking.update(&mut scene), None);
        assert!(scene.highlighted_ids().is_empty());

        picking.set_pointer_px(center_px(), VIEWPORT);
        assert_eq!(picking.update(&mut scene), Some(id));
        picking.clear_pointer();
        assert_eq!(picking.update(&mut scene), None);
        assert!(scene.highlighted_ids().is_empty());
    }

    #[test]
    fn register_candidates_dedups_and_unregister_removes() {
        let mut picking = PickingService::default();
        picking.register_candidates([EntityId(3), EntityId(1), EntityId(3)]);
        assert_eq!(picking.candidates(), &[EntityId(3), EntityId(1)]);
        picking.unregister(EntityId(3));
        assert_eq!(picking.candidates(), &[EntityId(1)]);
    }

    #[test]
    fn unregistering_the_hovered_entity_forgets_it() {
        let id = EntityId(1);
        let mut scene = FakeScene::with_spheres(vec![(id, Vec3::ZERO, 1.0)]);
        let mut picking = PickingService::default();
        picking.register_candidates([id]);
        picking.set_pointer_px(center_px(), VIEWPORT);
        assert_eq!(picking.update(&mut scene), Some(id));

        picking.unregister(id);
        assert_eq!(picking.hovered(), None);
        assert_eq!(picking.update(&mut scene), None);
    }

    #[test]
    fn invalid_max_distance_falls_back_to_default() {
        assert_eq!(
            PickingService::new(f32::NAN).max_distance(),
            DEFAULT_MAX_PICK_DISTANCE
        );
        assert_eq!(
            PickingService::new(-1.0).max_distance(),
            DEFAULT_MAX_PICK_DISTANCE
        );
    }
}
