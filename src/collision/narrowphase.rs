use glam::{Mat3, Vec3};

use super::{
    clipping::{clip_polygon, rectangle_planes},
    contact::ContactManifold,
};
use crate::core::{shape::Shape, types::Pose};

const AXIS_EPSILON: f32 = 1e-6;
/// Relative tolerance that keeps face axes winning over near-equal alternatives.
const FACE_PREFERENCE_SCALE: f32 = 0.95;
const FACE_PREFERENCE_BIAS: f32 = 0.01;

/// Generates contacts between two posed shapes.
///
/// Returns `None` when the shapes are separated by more than `margin`; otherwise
/// the manifold may include speculative points with negative depth. The normal
/// points from A towards B.
pub fn collide(
    shape_a: &Shape,
    pose_a: &Pose,
    shape_b: &Shape,
    pose_b: &Pose,
    margin: f32,
) -> Option<ContactManifold> {
    match (shape_a, shape_b) {
        (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) => {
            sphere_sphere(*ra, pose_a, *rb, pose_b, margin)
        }
        (Shape::Sphere { radius }, Shape::Box { half_extents }) => {
            sphere_box(*radius, pose_a, *half_extents, pose_b, margin)
        }
        (Shape::Box { half_extents }, Shape::Sphere { radius }) => {
            let mut manifold = sphere_box(*radius, pose_b, *half_extents, pose_a, margin)?;
            manifold.flip();
            Some(manifold)
        }
        (Shape::Box { half_extents: ha }, Shape::Box { half_extents: hb }) => {
            box_box(*ha, pose_a, *hb, pose_b, margin)
        }
    }
}

fn sphere_sphere(
    radius_a: f32,
    pose_a: &Pose,
    radius_b: f32,
    pose_b: &Pose,
    margin: f32,
) -> Option<ContactManifold> {
    let offset = pose_b.position - pose_a.position;
    let distance = offset.length();
    let depth = radius_a + radius_b - distance;
    if depth < -margin {
        return None;
    }
    let normal = if distance > AXIS_EPSILON {
        offset / distance
    } else {
        Vec3::Y
    };
    let surface_a = pose_a.position + normal * radius_a;
    let surface_b = pose_b.position - normal * radius_b;
    Some(ContactManifold::single(
        normal,
        (surface_a + surface_b) * 0.5,
        depth,
    ))
}

/// Sphere is A, box is B.
fn sphere_box(
    radius: f32,
    sphere_pose: &Pose,
    half_extents: Vec3,
    box_pose: &Pose,
    margin: f32,
) -> Option<ContactManifold> {
    let local_center = box_pose.inverse_transform_point(sphere_pose.position);
    let clamped = local_center.clamp(-half_extents, half_extents);
    let delta = local_center - clamped;
    let distance = delta.length();

    let (local_box_to_sphere, local_surface, depth) = if distance > AXIS_EPSILON {
        (delta / distance, clamped, radius - distance)
    } else {
        // Center is inside the box; push out through the nearest face.
        let face_distance = half_extents - local_center.abs();
        let axis = if face_distance.x <= face_distance.y && face_distance.x <= face_distance.z {
            0
        } else if face_distance.y <= face_distance.z {
            1
        } else {
            2
        };
        let mut direction = Vec3::ZERO;
        direction[axis] = if local_center[axis] >= 0.0 { 1.0 } else { -1.0 };
        let mut surface = local_center;
        surface[axis] = direction[axis] * half_extents[axis];
        (direction, surface, radius + face_distance[axis])
    };

    if depth < -margin {
        return None;
    }

    let box_to_sphere = box_pose.orientation * local_box_to_sphere;
    let box_surface = box_pose.transform_point(local_surface);
    let sphere_surface = sphere_pose.position - box_to_sphere * radius;
    Some(ContactManifold::single(
        -box_to_sphere,
        (box_surface + sphere_surface) * 0.5,
        depth,
    ))
}

#[derive(Debug, Clone, Copy)]
struct OrientedBox {
    center: Vec3,
    axes: [Vec3; 3],
    half_extents: Vec3,
}

impl OrientedBox {
    fn new(pose: &Pose, half_extents: Vec3) -> Self {
        let basis = Mat3::from_quat(pose.orientation);
        Self {
            center: pose.position,
            axes: [basis.x_axis, basis.y_axis, basis.z_axis],
            half_extents,
        }
    }

    fn projected_radius(&self, axis: Vec3) -> f32 {
        (0..3)
            .map(|i| self.half_extents[i] * self.axes[i].dot(axis).abs())
            .sum()
    }

    /// Center of the edge parallel to `axis_index` that lies furthest along `direction`.
    fn support_edge(&self, axis_index: usize, direction: Vec3) -> (Vec3, Vec3) {
        let mut center = self.center;
        for k in 0..3 {
            if k != axis_index {
                let sign = if self.axes[k].dot(direction) >= 0.0 { 1.0 } else { -1.0 };
                center += self.axes[k] * self.half_extents[k] * sign;
            }
        }
        let half = self.axes[axis_index] * self.half_extents[axis_index];
        (center - half, center + half)
    }
}

#[derive(Debug, Clone, Copy)]
enum SeparatingAxis {
    FaceA(usize),
    FaceB(usize),
    Edge(usize, usize),
}

#[derive(Debug, Clone, Copy)]
struct AxisCandidate {
    axis: SeparatingAxis,
    /// Oriented from A towards B.
    normal: Vec3,
    depth: f32,
}

fn box_box(
    half_a: Vec3,
    pose_a: &Pose,
    half_b: Vec3,
    pose_b: &Pose,
    margin: f32,
) -> Option<ContactManifold> {
    let a = OrientedBox::new(pose_a, half_a);
    let b = OrientedBox::new(pose_b, half_b);
    let offset = b.center - a.center;

    let test = |axis: SeparatingAxis, direction: Vec3| -> AxisCandidate {
        let separation =
            offset.dot(direction).abs() - a.projected_radius(direction) - b.projected_radius(direction);
        let normal = if offset.dot(direction) < 0.0 {
            -direction
        } else {
            direction
        };
        AxisCandidate {
            axis,
            normal,
            depth: -separation,
        }
    };

    let mut best_face_a: Option<AxisCandidate> = None;
    let mut best_face_b: Option<AxisCandidate> = None;
    let mut best_edge: Option<AxisCandidate> = None;

    let keep_shallowest = |slot: &mut Option<AxisCandidate>, candidate: AxisCandidate| {
        if slot.map_or(true, |current| candidate.depth < current.depth) {
            *slot = Some(candidate);
        }
    };

    for i in 0..3 {
        let candidate = test(SeparatingAxis::FaceA(i), a.axes[i]);
        if candidate.depth < -margin {
            return None;
        }
        keep_shallowest(&mut best_face_a, candidate);
    }
    for i in 0..3 {
        let candidate = test(SeparatingAxis::FaceB(i), b.axes[i]);
        if candidate.depth < -margin {
            return None;
        }
        keep_shallowest(&mut best_face_b, candidate);
    }
    for i in 0..3 {
        for j in 0..3 {
            let cross = a.axes[i].cross(b.axes[j]);
            let length_squared = cross.length_squared();
            if length_squared < AXIS_EPSILON {
                continue;
            }
            let candidate = test(SeparatingAxis::Edge(i, j), cross / length_squared.sqrt());
            if candidate.depth < -margin {
                return None;
            }
            keep_shallowest(&mut best_edge, candidate);
        }
    }

    let prefers = |challenger: &AxisCandidate, incumbent: &AxisCandidate| {
        challenger.depth < incumbent.depth * FACE_PREFERENCE_SCALE - FACE_PREFERENCE_BIAS
    };

    let mut best = best_face_a?;
    if let Some(face_b) = best_face_b {
        if prefers(&face_b, &best) {
            best = face_b;
        }
    }
    if let Some(edge) = best_edge {
        if prefers(&edge, &best) {
            best = edge;
        }
    }

    match best.axis {
        SeparatingAxis::FaceA(index) => face_contact(&a, index, &b, best.normal, margin),
        SeparatingAxis::FaceB(index) => {
            let mut manifold = face_contact(&b, index, &a, -best.normal, margin)?;
            manifold.flip();
            Some(manifold)
        }
        SeparatingAxis::Edge(i, j) => {
            let (a0, a1) = a.support_edge(i, best.normal);
            let (b0, b1) = b.support_edge(j, -best.normal);
            let (on_a, on_b) = closest_points_on_segments(a0, a1, b0, b1);
            Some(ContactManifold::single(
                best.normal,
                (on_a + on_b) * 0.5,
                best.depth,
            ))
        }
    }
}

/// Clips the incident box's most opposed face against the reference face.
///
/// `normal` points from the reference box towards the incident box.
fn face_contact(
    reference: &OrientedBox,
    reference_axis: usize,
    incident: &OrientedBox,
    normal: Vec3,
    margin: f32,
) -> Option<ContactManifold> {
    let face_center = reference.center + normal * reference.half_extents[reference_axis];
    let u_index = (reference_axis + 1) % 3;
    let v_index = (reference_axis + 2) % 3;
    let planes = rectangle_planes(
        face_center,
        reference.axes[u_index],
        reference.axes[v_index],
        reference.half_extents[u_index],
        reference.half_extents[v_index],
    );

    let incident_axis = (0..3)
        .max_by(|&i, &j| {
            incident.axes[i]
                .dot(normal)
                .abs()
                .total_cmp(&incident.axes[j].dot(normal).abs())
        })
        .unwrap_or(0);
    let incident_normal = if incident.axes[incident_axis].dot(normal) > 0.0 {
        -incident.axes[incident_axis]
    } else {
        incident.axes[incident_axis]
    };
    let incident_center =
        incident.center + incident_normal * incident.half_extents[incident_axis];
    let iu = (incident_axis + 1) % 3;
    let iv = (incident_axis + 2) % 3;
    let du = incident.axes[iu] * incident.half_extents[iu];
    let dv = incident.axes[iv] * incident.half_extents[iv];
    let polygon = [
        incident_center + du + dv,
        incident_center - du + dv,
        incident_center - du - dv,
        incident_center + du - dv,
    ];

    let clipped = clip_polygon(&polygon, &planes);
    let mut manifold = ContactManifold::new(normal);
    for point in clipped {
        let separation = (point - face_center).dot(normal);
        if separation > margin {
            continue;
        }
        manifold.push(point - normal * (separation * 0.5), -separation);
    }
    manifold.reduce();

    if manifold.is_empty() {
        None
    } else {
        Some(manifold)
    }
}

fn closest_points_on_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    let (s, t) = if a <= AXIS_EPSILON && e <= AXIS_EPSILON {
        (0.0, 0.0)
    } else if a <= AXIS_EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= AXIS_EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom > AXIS_EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Quat;

    #[test]
    fn overlapping_spheres_report_depth_along_center_axis() {
        let manifold = collide(
            &Shape::sphere(0.5),
            &Pose::from_position(Vec3::ZERO),
            &Shape::sphere(0.5),
            &Pose::from_position(Vec3::new(0.9, 0.0, 0.0)),
            0.0,
        )
        .expect("spheres overlap");

        assert_eq!(manifold.len(), 1);
        assert_relative_eq!(manifold.normal.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(manifold.points[0].depth, 0.1, epsilon = 1e-5);
        assert_relative_eq!(manifold.points[0].position.x, 0.45, epsilon = 1e-5);
    }

    #[test]
    fn distant_spheres_produce_nothing() {
        let manifold = collide(
            &Shape::sphere(0.5),
            &Pose::from_position(Vec3::ZERO),
            &Shape::sphere(0.5),
            &Pose::from_position(Vec3::new(3.0, 0.0, 0.0)),
            0.1,
        );
        assert!(manifold.is_none());
    }

    #[test]
    fn speculative_margin_yields_negative_depth() {
        let manifold = collide(
            &Shape::sphere(0.5),
            &Pose::from_position(Vec3::ZERO),
            &Shape::sphere(0.5),
            &Pose::from_position(Vec3::new(1.05, 0.0, 0.0)),
            0.1,
        )
        .expect("within margin");
        assert!(manifold.points[0].depth < 0.0);
    }

    #[test]
    fn box_and_sphere_normal_points_from_a_to_b() {
        let floor = Shape::cuboid(10.0, 1.0, 10.0);
        let ball = Shape::sphere(0.5);
        let floor_pose = Pose::from_position(Vec3::new(0.0, -0.5, 0.0));
        let ball_pose = Pose::from_position(Vec3::new(0.0, 0.45, 0.0));

        let box_first = collide(&floor, &floor_pose, &ball, &ball_pose, 0.0).expect("touching");
        assert_relative_eq!(box_first.normal.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(box_first.points[0].depth, 0.05, epsilon = 1e-5);

        let sphere_first = collide(&ball, &ball_pose, &floor, &floor_pose, 0.0).expect("touching");
        assert_relative_eq!(sphere_first.normal.y, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn resting_box_gets_four_face_contacts() {
        let floor = Shape::cuboid(200.0, 20.0, 200.0);
        let crate_shape = Shape::cuboid(0.1, 0.1, 0.1);
        let floor_pose = Pose::from_position(Vec3::new(0.0, -10.0, 0.0));
        let crate_pose = Pose::from_position(Vec3::new(0.0, 0.049, 0.0));

        let manifold =
            collide(&floor, &floor_pose, &crate_shape, &crate_pose, 0.1).expect("resting");
        assert_eq!(manifold.len(), 4);
        assert_relative_eq!(manifold.normal.y, 1.0, epsilon = 1e-5);
        for point in &manifold.points {
            assert_relative_eq!(point.depth, 0.001, epsilon = 1e-4);
        }

        let flipped =
            collide(&crate_shape, &crate_pose, &floor, &floor_pose, 0.1).expect("resting");
        assert_eq!(flipped.len(), 4);
        assert_relative_eq!(flipped.normal.y, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn separated_boxes_are_rejected() {
        let shape = Shape::cuboid(1.0, 1.0, 1.0);
        let manifold = collide(
            &shape,
            &Pose::from_position(Vec3::ZERO),
            &shape,
            &Pose::new(
                Vec3::new(2.0, 0.0, 0.0),
                Quat::from_rotation_y(0.3),
            ),
            0.05,
        );
        assert!(manifold.is_none());
    }

    #[test]
    fn crossed_edges_produce_a_single_point() {
        let shape = Shape::cuboid(1.0, 1.0, 1.0);
        let a = Pose::new(Vec3::ZERO, Quat::from_rotation_z(std::f32::consts::FRAC_PI_4));
        let b = Pose::new(
            Vec3::new(0.0, 1.38, 0.0),
            Quat::from_rotation_x(std::f32::consts::FRAC_PI_4),
        );
        let manifold = collide(&shape, &a, &shape, &b, 0.0).expect("edges overlap");
        assert_eq!(manifold.len(), 1);
        assert!(manifold.normal.y > 0.9);
        assert!(manifold.points[0].depth > 0.0);
    }
}
