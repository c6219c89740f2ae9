use glam::{Mat3, Vec3};

use crate::{
    collision::{contact::ContactManifold, policy::PairMaterialProperties},
    core::types::{BodyInertia, Pose, Velocity},
    dynamics::spring::Springiness,
    utils::math::{rotate_inverse_inertia, tangent_basis},
};

/// Dense per-body state the solver reads and writes while iterating.
#[derive(Debug, Clone, Copy)]
pub struct SolverBody {
    pub velocity: Velocity,
    pub inverse_mass: f32,
    pub inverse_inertia_world: Mat3,
}

impl SolverBody {
    pub fn new(pose: &Pose, velocity: Velocity, inertia: &BodyInertia) -> Self {
        Self {
            velocity,
            inverse_mass: inertia.inverse_mass,
            inverse_inertia_world: rotate_inverse_inertia(
                inertia.inverse_inertia_tensor,
                pose.orientation,
            ),
        }
    }

    fn point_velocity(&self, offset: Vec3) -> Vec3 {
        self.velocity.linear + self.velocity.angular.cross(offset)
    }

    fn apply_impulse(&mut self, offset: Vec3, impulse: Vec3) {
        self.velocity.linear += impulse * self.inverse_mass;
        self.velocity.angular += self.inverse_inertia_world * offset.cross(impulse);
    }
}

#[derive(Debug, Clone, Copy)]
struct ConstraintPoint {
    offset_a: Vec3,
    offset_b: Vec3,
    depth: f32,
    normal_mass: f32,
    tangent_mass: [f32; 2],
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
}

/// One manifold's worth of contact constraints.
///
/// `None` on either side stands for a static, which never moves.
#[derive(Debug, Clone)]
pub struct ContactConstraint {
    body_a: Option<usize>,
    body_b: Option<usize>,
    normal: Vec3,
    tangents: [Vec3; 2],
    material: PairMaterialProperties,
    springiness: Springiness,
    points: Vec<ConstraintPoint>,
}

impl ContactConstraint {
    /// Contact offsets are fixed from the poses at the start of the step.
    pub fn new(
        body_a: Option<usize>,
        position_a: Vec3,
        body_b: Option<usize>,
        position_b: Vec3,
        manifold: &ContactManifold,
        material: PairMaterialProperties,
    ) -> Self {
        let (t1, t2) = tangent_basis(manifold.normal);
        let points = manifold
            .points
            .iter()
            .map(|point| ConstraintPoint {
                offset_a: point.position - position_a,
                offset_b: point.position - position_b,
                depth: point.depth,
                normal_mass: 0.0,
                tangent_mass: [0.0; 2],
                normal_impulse: 0.0,
                tangent_impulse: [0.0; 2],
            })
            .collect();
        Self {
            body_a,
            body_b,
            normal: manifold.normal,
            tangents: [t1, t2],
            material,
            springiness: material.contact_spring_settings.springiness(1.0),
            points,
        }
    }

    pub fn bodies(&self) -> (Option<usize>, Option<usize>) {
        (self.body_a, self.body_b)
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Sum of accumulated normal impulses from the last solve.
    pub fn total_normal_impulse(&self) -> f32 {
        self.points.iter().map(|point| point.normal_impulse).sum()
    }

    fn body<'a>(bodies: &'a [SolverBody], index: Option<usize>) -> Option<&'a SolverBody> {
        index.and_then(|i| bodies.get(i))
    }

    fn relative_velocity(&self, bodies: &[SolverBody], point: &ConstraintPoint) -> Vec3 {
        let velocity_a = Self::body(bodies, self.body_a)
            .map_or(Vec3::ZERO, |body| body.point_velocity(point.offset_a));
        let velocity_b = Self::body(bodies, self.body_b)
            .map_or(Vec3::ZERO, |body| body.point_velocity(point.offset_b));
        velocity_b - velocity_a
    }

    fn effective_mass(&self, bodies: &[SolverBody], point: &ConstraintPoint, axis: Vec3) -> f32 {
        let mut inverse = 0.0;
        if let Some(body) = Self::body(bodies, self.body_a) {
            let arm = point.offset_a.cross(axis);
            inverse += body.inverse_mass + arm.dot(body.inverse_inertia_world * arm);
        }
        if let Some(body) = Self::body(bodies, self.body_b) {
            let arm = point.offset_b.cross(axis);
            inverse += body.inverse_mass + arm.dot(body.inverse_inertia_world * arm);
        }
        if inverse > 0.0 {
            1.0 / inverse
        } else {
            0.0
        }
    }

    fn apply(&self, bodies: &mut [SolverBody], point: &ConstraintPoint, impulse: Vec3) {
        if let Some(body) = self.body_a.and_then(|i| bodies.get_mut(i)) {
            body.apply_impulse(point.offset_a, -impulse);
        }
        if let Some(body) = self.body_b.and_then(|i| bodies.get_mut(i)) {
            body.apply_impulse(point.offset_b, impulse);
        }
    }

    fn prepare(&mut self, bodies: &[SolverBody], dt: f32) {
        self.springiness = self.material.contact_spring_settings.springiness(dt);
        for index in 0..self.points.len() {
            let point = self.points[index];
            let normal_mass = self.effective_mass(bodies, &point, self.normal);
            let tangent_mass = [
                self.effective_mass(bodies, &point, self.tangents[0]),
                self.effective_mass(bodies, &point, self.tangents[1]),
            ];
            let point = &mut self.points[index];
            point.normal_mass = normal_mass;
            point.tangent_mass = tangent_mass;
        }
    }

    fn warm_start(&self, bodies: &mut [SolverBody]) {
        for point in &self.points {
            let impulse = self.normal * point.normal_impulse
                + self.tangents[0] * point.tangent_impulse[0]
                + self.tangents[1] * point.tangent_impulse[1];
            self.apply(bodies, point, impulse);
        }
    }

    fn solve(&mut self, bodies: &mut [SolverBody], inverse_dt: f32) {
        let springiness = self.springiness;
        let max_recovery = self.material.maximum_recovery_velocity;

        for index in 0..self.points.len() {
            let mut point = self.points[index];

            let separating_velocity = self.relative_velocity(bodies, &point).dot(self.normal);
            let bias = if point.depth > 0.0 {
                (point.depth * springiness.position_error_to_velocity).min(max_recovery)
            } else {
                point.depth * inverse_dt
            };
            let lambda = point.normal_mass
                * springiness.effective_mass_cfm_scale
                * (bias - separating_velocity)
                - point.normal_impulse * springiness.softness_impulse_scale;
            let previous = point.normal_impulse;
            point.normal_impulse = (previous + lambda).max(0.0);
            self.apply(bodies, &point, self.normal * (point.normal_impulse - previous));

            let friction_limit = self.material.friction_coefficient * point.normal_impulse;
            for axis in 0..2 {
                let tangent = self.tangents[axis];
                let sliding = self.relative_velocity(bodies, &point).dot(tangent);
                let previous = point.tangent_impulse[axis];
                point.tangent_impulse[axis] = (previous - sliding * point.tangent_mass[axis])
                    .clamp(-friction_limit, friction_limit);
                self.apply(bodies, &point, tangent * (point.tangent_impulse[axis] - previous));
            }

            self.points[index] = point;
        }
    }

    /// Estimates the new depth from the solved velocities.
    fn update_depths(&mut self, bodies: &[SolverBody], dt: f32) {
        for index in 0..self.points.len() {
            let point = self.points[index];
            let separating_velocity = self.relative_velocity(bodies, &point).dot(self.normal);
            self.points[index].depth -= separating_velocity * dt;
        }
    }
}

/// Sequential impulse solver for soft contacts.
#[derive(Debug, Clone, Copy)]
pub struct ContactSolver {
    pub velocity_iterations: u32,
}

impl ContactSolver {
    pub fn new(velocity_iterations: u32) -> Self {
        Self {
            velocity_iterations: velocity_iterations.max(1),
        }
    }

    /// Runs one substep of `dt`. Accumulated impulses from earlier substeps warm start this one.
    pub fn solve_substep(
        &self,
        constraints: &mut [ContactConstraint],
        bodies: &mut [SolverBody],
        dt: f32,
    ) {
        if constraints.is_empty() || dt <= 0.0 {
            return;
        }
        let inverse_dt = 1.0 / dt;

        for constraint in constraints.iter_mut() {
            constraint.prepare(bodies, dt);
            constraint.warm_start(bodies);
        }
        for _ in 0..self.velocity_iterations {
            for constraint in constraints.iter_mut() {
                constraint.solve(bodies, inverse_dt);
            }
        }
        for constraint in constraints.iter_mut() {
            constraint.update_depths(bodies, dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::contact::ContactManifold;

    fn resting_body(velocity: Vec3) -> SolverBody {
        SolverBody::new(
            &Pose::default(),
            Velocity::new(velocity, Vec3::ZERO),
            &BodyInertia::default(),
        )
    }

    #[test]
    fn approaching_body_is_stopped_by_static() {
        let manifold = ContactManifold::single(Vec3::NEG_Y, Vec3::new(0.0, -0.5, 0.0), 0.0);
        let mut constraints = vec![ContactConstraint::new(
            Some(0),
            Vec3::ZERO,
            None,
            Vec3::new(0.0, -1.0, 0.0),
            &manifold,
            PairMaterialProperties::default(),
        )];
        let mut bodies = vec![resting_body(Vec3::new(0.0, -1.0, 0.0))];

        ContactSolver::new(8).solve_substep(&mut constraints, &mut bodies, 1.0 / 60.0);

        assert!(bodies[0].velocity.linear.y > -0.1);
        assert!(constraints[0].total_normal_impulse() > 0.0);
    }

    #[test]
    fn separating_bodies_are_left_alone() {
        let manifold = ContactManifold::single(Vec3::NEG_Y, Vec3::new(0.0, -0.5, 0.0), -0.05);
        let mut constraints = vec![ContactConstraint::new(
            Some(0),
            Vec3::ZERO,
            None,
            Vec3::new(0.0, -1.0, 0.0),
            &manifold,
            PairMaterialProperties::default(),
        )];
        let mut bodies = vec![resting_body(Vec3::new(0.0, 1.0, 0.0))];

        ContactSolver::new(4).solve_substep(&mut constraints, &mut bodies, 1.0 / 60.0);

        assert_eq!(bodies[0].velocity.linear.y, 1.0);
        assert_eq!(constraints[0].total_normal_impulse(), 0.0);
    }

    #[test]
    fn friction_cannot_exceed_the_normal_bound() {
        let manifold = ContactManifold::single(Vec3::NEG_Y, Vec3::new(0.0, -0.5, 0.0), 0.0);
        let mut material = PairMaterialProperties::default();
        material.friction_coefficient = 0.1;
        let mut constraints = vec![ContactConstraint::new(
            Some(0),
            Vec3::ZERO,
            None,
            Vec3::new(0.0, -1.0, 0.0),
            &manifold,
            material,
        )];
        let mut bodies = vec![resting_body(Vec3::new(5.0, -0.2, 0.0))];

        ContactSolver::new(8).solve_substep(&mut constraints, &mut bodies, 1.0 / 60.0);

        // A 0.2 m/s impact can only remove about 0.02 m/s of sliding at mu = 0.1.
        assert!(bodies[0].velocity.linear.x > 4.9);
    }
}
