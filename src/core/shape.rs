use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use super::types::{BodyInertia, InertiaTensorExt, Pose};

/// Primitive convex geometry. Immutable once registered with a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
}

/// Shape category handed to renderers so they can pick a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Sphere,
    Box,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }
}

impl Shape {
    pub fn sphere(radius: f32) -> Self {
        Shape::Sphere { radius }
    }

    /// Box from full width (x), height (y) and length (z).
    pub fn cuboid(width: f32, height: f32, length: f32) -> Self {
        Shape::Box {
            half_extents: Vec3::new(width, height, length) * 0.5,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Sphere { .. } => ShapeKind::Sphere,
            Shape::Box { .. } => ShapeKind::Box,
        }
    }

    /// Full extents along each local axis; the scale a unit mesh needs to be drawn at.
    pub fn size(&self) -> Vec3 {
        match self {
            Shape::Sphere { radius } => Vec3::splat(radius * 2.0),
            Shape::Box { half_extents } => *half_extents * 2.0,
        }
    }

    /// Mass and inertia of a solid body of this shape with the given mass.
    pub fn compute_inertia(&self, mass: f32) -> BodyInertia {
        let inertia = match self {
            Shape::Sphere { radius } => Mat3::for_solid_sphere(*radius, mass),
            Shape::Box { half_extents } => Mat3::for_solid_box(*half_extents, mass),
        };
        BodyInertia::from_mass_properties(mass, inertia)
    }

    pub fn bounding_box(&self, pose: &Pose) -> Aabb {
        let extent = match self {
            Shape::Sphere { radius } => Vec3::splat(*radius),
            Shape::Box { half_extents } => {
                let rotation = Mat3::from_quat(pose.orientation);
                let abs = Mat3::from_cols(
                    rotation.x_axis.abs(),
                    rotation.y_axis.abs(),
                    rotation.z_axis.abs(),
                );
                abs * *half_extents
            }
        };
        Aabb::new(pose.position - extent, pose.position + extent)
    }

    /// Rejects degenerate dimensions.
    pub fn is_valid(&self) -> bool {
        match self {
            Shape::Sphere { radius } => radius.is_finite() && *radius > 0.0,
            Shape::Box { half_extents } => {
                half_extents.is_finite() && half_extents.cmpgt(Vec3::ZERO).all()
            }
        }
    }
}
