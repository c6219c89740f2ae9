use glam::Vec3;

/// One point of a manifold, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    pub position: Vec3,
    /// Positive when penetrating, negative for speculative contacts.
    pub depth: f32,
    pub feature_id: u32,
}

/// Contact points and the shared normal describing how two collidables touch.
///
/// The normal points from collidable A towards collidable B.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactManifold {
    pub normal: Vec3,
    pub points: Vec<ContactPoint>,
}

impl ContactManifold {
    pub const MAX_POINTS: usize = 4;

    pub fn new(normal: Vec3) -> Self {
        Self {
            normal,
            points: Vec::with_capacity(Self::MAX_POINTS),
        }
    }

    pub fn single(normal: Vec3, position: Vec3, depth: f32) -> Self {
        let mut manifold = Self::new(normal);
        manifold.push(position, depth);
        manifold
    }

    pub fn push(&mut self, position: Vec3, depth: f32) {
        let feature_id = self.points.len() as u32;
        self.points.push(ContactPoint {
            position,
            depth,
            feature_id,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn deepest(&self) -> Option<&ContactPoint> {
        self.points
            .iter()
            .max_by(|a, b| a.depth.total_cmp(&b.depth))
    }

    /// Swaps the roles of A and B.
    pub fn flip(&mut self) {
        self.normal = -self.normal;
    }

    /// Keeps the deepest point plus the three that span the largest area.
    pub fn reduce(&mut self) {
        if self.points.len() <= Self::MAX_POINTS {
            return;
        }

        let candidates = std::mem::take(&mut self.points);
        let first = candidates
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.depth.total_cmp(&b.depth))
            .map(|(index, _)| index)
            .unwrap_or(0);
        let origin = candidates[first].position;

        let second = Self::argmax(&candidates, |p| (p.position - origin).length_squared());
        let edge = candidates[second].position - origin;
        let signed_area = |p: &ContactPoint| (p.position - origin).cross(edge).dot(self.normal);
        let third = Self::argmax(&candidates, signed_area);
        let fourth = Self::argmax(&candidates, |p| -signed_area(p));

        let mut chosen = vec![first, second, third, fourth];
        chosen.sort_unstable();
        chosen.dedup();
        self.points = chosen.into_iter().map(|index| candidates[index]).collect();
        for (id, point) in self.points.iter_mut().enumerate() {
            point.feature_id = id as u32;
        }
    }

    fn argmax(points: &[ContactPoint], score: impl Fn(&ContactPoint) -> f32) -> usize {
        points
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| score(a).total_cmp(&score(b)))
            .map(|(index, _)| index)
            .unwrap_or(0)
    }
}
