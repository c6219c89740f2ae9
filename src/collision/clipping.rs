use glam::Vec3;

const EPSILON: f32 = 1e-4;

/// Half-space boundary; points with non-positive signed distance are inside.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    normal: Vec3,
    distance: f32,
}

impl Plane {
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let n = normal.normalize_or_zero();
        Self {
            normal: n,
            distance: n.dot(point),
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.distance
    }
}

/// Sutherland-Hodgman clip of a convex polygon against every plane in turn.
pub fn clip_polygon(vertices: &[Vec3], planes: &[Plane]) -> Vec<Vec3> {
    let mut output = vertices.to_vec();
    for plane in planes {
        output = clip_against_plane(&output, *plane);
        if output.is_empty() {
            break;
        }
    }
    output
}

fn clip_against_plane(vertices: &[Vec3], plane: Plane) -> Vec<Vec3> {
    let mut clipped = Vec::with_capacity(vertices.len() + 1);
    let Some(&last) = vertices.last() else {
        return clipped;
    };

    // Walk every edge (start -> end), emitting what lies inside the half-space.
    let mut start = last;
    let mut start_distance = plane.signed_distance(start);
    for &end in vertices {
        let end_distance = plane.signed_distance(end);
        let start_inside = start_distance <= EPSILON;
        let end_inside = end_distance <= EPSILON;

        if start_inside != end_inside {
            clipped.extend(edge_crossing(start, end, start_distance, end_distance));
        }
        if end_inside {
            clipped.push(end);
        }

        start = end;
        start_distance = end_distance;
    }
    clipped
}

/// Point where the edge crosses the plane, `None` for edges running along it.
fn edge_crossing(start: Vec3, end: Vec3, start_distance: f32, end_distance: f32) -> Option<Vec3> {
    let span = start_distance - end_distance;
    (span.abs() > EPSILON).then(|| start.lerp(end, start_distance / span))
}

/// Side planes of a rectangle given its tangents and half-extents.
pub fn rectangle_planes(
    center: Vec3,
    tangent_u: Vec3,
    tangent_v: Vec3,
    half_u: f32,
    half_v: f32,
) -> [Plane; 4] {
    [
        Plane::from_point_normal(center + tangent_u * half_u, tangent_u),
        Plane::from_point_normal(center - tangent_u * half_u, -tangent_u),
        Plane::from_point_normal(center + tangent_v * half_v, tangent_v),
        Plane::from_point_normal(center - tangent_v * half_v, -tangent_v),
    ]
}
