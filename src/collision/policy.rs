use serde::{Deserialize, Serialize};

use super::contact::ContactManifold;
use crate::{
    config::{
        DEFAULT_CONTACT_SPRING_DAMPING_RATIO, DEFAULT_CONTACT_SPRING_FREQUENCY,
        DEFAULT_FRICTION_COEFFICIENT, DEFAULT_MAXIMUM_RECOVERY_VELOCITY,
    },
    core::collidable::{CollidableMobility, CollidablePair},
    dynamics::spring::SpringSettings,
};

/// Material response of one contacting pair, computed fresh every time a manifold is configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairMaterialProperties {
    pub friction_coefficient: f32,
    pub maximum_recovery_velocity: f32,
    pub contact_spring_settings: SpringSettings,
}

impl PairMaterialProperties {
    pub fn new(
        friction_coefficient: f32,
        maximum_recovery_velocity: f32,
        contact_spring_settings: SpringSettings,
    ) -> Self {
        Self {
            friction_coefficient,
            maximum_recovery_velocity,
            contact_spring_settings,
        }
    }
}

impl Default for PairMaterialProperties {
    fn default() -> Self {
        Self::new(
            DEFAULT_FRICTION_COEFFICIENT,
            DEFAULT_MAXIMUM_RECOVERY_VELOCITY,
            SpringSettings::new(
                DEFAULT_CONTACT_SPRING_FREQUENCY,
                DEFAULT_CONTACT_SPRING_DAMPING_RATIO,
            ),
        )
    }
}

/// Decisions the narrow phase asks for on every candidate pair.
///
/// Called from several workers at once, one pair per call, so implementations
/// must not mutate shared state.
pub trait NarrowPhaseCallbacks: Send + Sync {
    /// Cheap filter that runs before any geometry test.
    fn allow_contact_generation(&self, pair: &CollidablePair) -> bool;

    /// Returns the material to solve the manifold with, or `None` to drop it.
    fn configure_contact_manifold(
        &self,
        pair: &CollidablePair,
        manifold: &ContactManifold,
    ) -> Option<PairMaterialProperties>;
}

/// Only pairs with at least one dynamic member ever generate contacts.
pub fn allow_contact_generation(a: CollidableMobility, b: CollidableMobility) -> bool {
    a == CollidableMobility::Dynamic || b == CollidableMobility::Dynamic
}

/// Uniform material policy: every accepted pair gets the same material.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ContactPolicy {
    pub material: PairMaterialProperties,
}

impl ContactPolicy {
    pub fn new(material: PairMaterialProperties) -> Self {
        Self { material }
    }
}

impl NarrowPhaseCallbacks for ContactPolicy {
    fn allow_contact_generation(&self, pair: &CollidablePair) -> bool {
        allow_contact_generation(pair.a.mobility(), pair.b.mobility())
    }

    fn configure_contact_manifold(
        &self,
        _pair: &CollidablePair,
        _manifold: &ContactManifold,
    ) -> Option<PairMaterialProperties> {
        Some(self.material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use CollidableMobility::*;

    #[test]
    fn needs_a_dynamic_member() {
        assert!(allow_contact_generation(Dynamic, Dynamic));
        assert!(allow_contact_generation(Dynamic, Static));
        assert!(allow_contact_generation(Kinematic, Dynamic));
        assert!(!allow_contact_generation(Static, Static));
        assert!(!allow_contact_generation(Kinematic, Static));
        assert!(!allow_contact_generation(Kinematic, Kinematic));
    }

    #[test]
    fn default_material_matches_configured_constants() {
        let material = PairMaterialProperties::default();
        assert_relative_eq!(material.friction_coefficient, 1.0);
        assert_relative_eq!(material.maximum_recovery_velocity, 2.0);
        assert_relative_eq!(material.contact_spring_settings.frequency(), 30.0, epsilon = 1e-4);
        assert_relative_eq!(material.contact_spring_settings.damping_ratio(), 1.0);
    }
}
