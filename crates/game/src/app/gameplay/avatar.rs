use engine::{InputAction, InputSnapshot, OrbitRig, Transform, Vec3};

pub(crate) const AVATAR_SPEED_UNITS_PER_SECOND: f32 = 5.0;
pub(crate) const ORBIT_SPEED_RADIANS_PER_SECOND: f32 = 1.8;
pub(crate) const AVATAR_SPAWN: Vec3 = Vec3::new(0.0, 1.0, 2.0);

/// Turns the orbit rig from the arrow keys.
pub(crate) fn apply_orbit_input(rig: &mut OrbitRig, input: &InputSnapshot, dt_seconds: f32) {
    let step = ORBIT_SPEED_RADIANS_PER_SECOND * dt_seconds;
    let horizontal = axis(input, InputAction::OrbitLeft, InputAction::OrbitRight);
    let vertical = axis(input, InputAction::OrbitUp, InputAction::OrbitDown);
    if horizontal != 0.0 {
        rig.rotate_left(horizontal * step);
    }
    if vertical != 0.0 {
        rig.rotate_up(vertical * step);
    }
}

/// Camera-relative ground movement. Returns true when the avatar moved.
pub(crate) fn apply_movement_input(
    transform: &mut Transform,
    rig: &OrbitRig,
    input: &InputSnapshot,
    dt_seconds: f32,
) -> bool {
    let forward = rig.ground_forward();
    let right = forward.cross(Vec3::UP);
    let along = axis(input, InputAction::MoveForward, InputAction::MoveBack);
    let across = axis(input, InputAction::MoveRight, InputAction::MoveLeft);

    let Some(direction) = (forward * along + right * across).try_normalize() else {
        return false;
    };
    transform.position += direction * (AVATAR_SPEED_UNITS_PER_SECOND * dt_seconds);
    transform.yaw_radians = direction.x.atan2(direction.z);
    true
}

fn axis(input: &InputSnapshot, positive: InputAction, negative: InputAction) -> f32 {
    match (input.is_down(positive), input.is_down(negative)) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32) {
        assert!((actual - expected).abs() < 0.0001, "{actual} vs {expected}");
    }

    #[test]
    fn forward_moves_away_from_default_camera() {
        let rig = OrbitRig::default();
        let mut transform = Transform::at(Vec3::ZERO);
        let input = InputSnapshot::empty().with_action_down(InputAction::MoveForward, true);

        assert!(apply_movement_input(&mut transform, &rig, &input, 0.5));
        assert_close(transform.position.z, -2.5);
        assert_close(transform.position.x, 0.0);
        assert_close(transform.position.y, 0.0);
    }

    #[test]
    fn diagonal_movement_is_not_faster() {
        let rig = OrbitRig::default();
        let mut transform = Transform::at(Vec3::ZERO);
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::MoveForward, true)
            .with_action_down(InputAction::MoveRight, true);

        apply_movement_input(&mut transform, &rig, &input, 1.0);
        assert_close(transform.position.length(), AVATAR_SPEED_UNITS_PER_SECOND);
        assert!(transform.position.x > 0.0);
    }

    #[test]
    fn opposing_keys_cancel() {
        let rig = OrbitRig::default();
        let mut transform = Transform::at(Vec3::ZERO);
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::MoveLeft, true)
            .with_action_down(InputAction::MoveRight, true);

        assert!(!apply_movement_input(&mut transform, &rig, &input, 1.0));
        assert_eq!(transform, Transform::at(Vec3::ZERO));
    }

    #[test]
    fn facing_follows_movement_direction() {
        let rig = OrbitRig::default();
        let mut transform = Transform::at(Vec3::ZERO);
        let input = InputSnapshot::empty().with_action_down(InputAction::MoveBack, true);

        apply_movement_input(&mut transform, &rig, &input, 0.1);
        assert_close(transform.yaw_radians, 0.0);
    }

    #[test]
    fn orbit_keys_turn_the_rig() {
        let mut rig = OrbitRig::default();
        let input = InputSnapshot::empty().with_action_down(InputAction::OrbitLeft, true);
        apply_orbit_input(&mut rig, &input, 0.5);
        assert_close(rig.azimuth, 0.9);
    }
}
