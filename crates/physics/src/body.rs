use blockworld_common::Aabb;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Which broad-phase query a body uses against the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyShape {
    /// 0.9 × 1.9 × 0.9 box, 36-cell candidate query.
    Player,
    /// 0.9 cube, 27-cell candidate query.
    Agent,
}

impl BodyShape {
    pub fn half_extents(self) -> Vec3 {
        match self {
            Self::Player => Vec3::new(0.45, 0.95, 0.45),
            Self::Agent => Vec3::splat(0.45),
        }
    }
}

/// An axis-aligned dynamic body. Bodies never rotate.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub shape: BodyShape,
    mass: f32,
    force: Vec3,
}

impl RigidBody {
    pub fn new(shape: BodyShape, position: Vec3, mass: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            shape,
            mass: mass.max(f32::EPSILON),
            force: Vec3::ZERO,
        }
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.position, self.shape.half_extents())
    }

    /// Accumulate a force for the next substep.
    pub fn add_force(&mut self, force: Vec3) {
        self.force += force;
    }

    pub fn force(&self) -> Vec3 {
        self.force
    }

    /// Integrate one substep and push the body out of every overlapping cell.
    ///
    /// Accumulated force is consumed.
    pub fn solve_static(&mut self, cells: &[Aabb], gravity: Vec3, elasticity: f32, dt: f32, damping: f32) {
        if dt > 0.0 {
            let accel = gravity + self.force / self.mass;
            self.velocity += accel * dt;
            self.velocity *= (1.0 - damping * dt).max(0.0);
            self.position += self.velocity * dt;
        }
        self.force = Vec3::ZERO;

        let half = self.shape.half_extents();
        for cell in cells {
            let body = Aabb::from_center(self.position, half);
            if !body.intersects(cell) {
                continue;
            }
            // push out along the axis of least penetration
            let push_pos = cell.max - body.min;
            let push_neg = body.max - cell.min;
            let mut axis = 0;
            let mut depth = f32::INFINITY;
            let mut sign = 1.0;
            for a in 0..3 {
                let (d, s) = if push_pos[a] < push_neg[a] {
                    (push_pos[a], 1.0)
                } else {
                    (push_neg[a], -1.0)
                };
                if d < depth {
                    depth = d;
                    axis = a;
                    sign = s;
                }
            }
            self.position[axis] += sign * depth;
            if self.velocity[axis] * sign < 0.0 {
                self.velocity[axis] = -self.velocity[axis] * elasticity;
            }
        }
    }
}
