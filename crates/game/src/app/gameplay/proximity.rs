use engine::{EntityId, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProximityCandidate {
    pub(crate) id: EntityId,
    pub(crate) name: String,
    pub(crate) position: Vec3,
    pub(crate) interaction_radius: f32,
}

/// Strictly inside the radius. Non-finite input is never eligible.
pub(crate) fn is_eligible(avatar: Vec3, position: Vec3, radius: f32) -> bool {
    if !avatar.is_finite() || !position.is_finite() || !radius.is_finite() {
        return false;
    }
    avatar.distance(position) < radius
}

/// Picks the entity the avatar may interact with. A hovered candidate in
/// range wins; otherwise the nearest in range, with ties going to the one
/// registered first.
pub(crate) fn select_candidate<'a>(
    avatar: Vec3,
    candidates: &'a [ProximityCandidate],
    hovered: Option<EntityId>,
) -> Option<&'a ProximityCandidate> {
    let mut in_range = candidates
        .iter()
        .filter(|candidate| is_eligible(avatar, candidate.position, candidate.interaction_radius));

    if let Some(hovered) = hovered {
        if let Some(candidate) = candidates.iter().find(|candidate| {
            candidate.id == hovered
                && is_eligible(avatar, candidate.position, candidate.interaction_radius)
        }) {
            return Some(candidate);
        }
    }

    let first = in_range.next()?;
    let mut best = (first, avatar.distance(first.position));
    for candidate in in_range {
        let distance = avatar.distance(candidate.position);
        if distance < best.1 {
            best = (candidate, distance);
        }
    }
    Some(best.0)
}
