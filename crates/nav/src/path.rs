use glam::Vec3;

/// Distances at or below this leave the direction unnormalized.
const MIN_REMAIN: f32 = 1e-4;

/// Per-tick navigation state for one agent: where it is, where it is going,
/// and how far it has come. Cheap to rebuild every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathQuery {
    destination: Vec3,
    position: Vec3,
    start: Vec3,
    direction: Vec3,
    remain: f32,
    travel: f32,
}

impl PathQuery {
    pub fn new(position: Vec3, destination: Vec3) -> Self {
        let mut query = Self {
            destination,
            position,
            start: position,
            direction: Vec3::ZERO,
            remain: 0.0,
            travel: 0.0,
        };
        query.update_direction();
        query
    }

    fn update_direction(&mut self) {
        let delta = self.destination - self.position;
        self.remain = delta.length();
        self.direction = if self.remain > MIN_REMAIN {
            delta / self.remain
        } else {
            delta
        };
    }

    /// Move to `position`; direction, remaining distance and travel from the
    /// start are recomputed.
    pub fn update(&mut self, position: Vec3) {
        self.position = position;
        self.update_direction();
        self.travel = (self.position - self.start).length();
    }

    /// Position one step of `size` along `dir`, without moving.
    pub fn step(&self, dir: Vec3, size: f32) -> Vec3 {
        self.position + dir * size
    }

    pub fn destination(&self) -> Vec3 {
        self.destination
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn start(&self) -> Vec3 {
        self.start
    }

    /// Unit vector toward the destination, or the raw offset once within
    /// `1e-4` of it.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn remain(&self) -> f32 {
        self.remain
    }

    /// Straight-line distance from the start, not path length.
    pub fn travel(&self) -> f32 {
        self.travel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_query_points_at_destination() {
        let q = PathQuery::new(Vec3::ZERO, Vec3::new(3.0, 0.0, 4.0));
        assert_eq!(q.remain(), 5.0);
        assert!((q.direction() - Vec3::new(0.6, 0.0, 0.8)).length() < 1e-6);
        assert_eq!(q.travel(), 0.0);
        assert_eq!(q.start(), Vec3::ZERO);
    }

    #[test]
    fn update_tracks_travel_from_start() {
        let mut q = PathQuery::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        q.update(Vec3::new(1.0, 0.0, 0.0));
        q.update(Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(q.travel(), 2.0);
        assert_eq!(q.remain(), 8.0);
        assert_eq!(q.start(), Vec3::ZERO);
        assert_eq!(q.position(), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn arrived_query_has_zero_direction() {
        let q = PathQuery::new(Vec3::ONE, Vec3::ONE);
        assert_eq!(q.remain(), 0.0);
        assert_eq!(q.direction(), Vec3::ZERO);
    }

    #[test]
    fn step_does_not_move() {
        let q = PathQuery::new(Vec3::ZERO, Vec3::X);
        assert_eq!(q.step(Vec3::Z, 0.5), Vec3::new(0.0, 0.0, 0.5));
        assert_eq!(q.position(), Vec3::ZERO);
    }
}
