use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Frequency and damping of a soft constraint such as contact penetration recovery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringSettings {
    /// Target number of undamped oscillations per unit of time, scaled by 2 * PI.
    pub angular_frequency: f32,
    /// Twice the ratio of the spring's actual damping to its critical damping.
    pub twice_damping_ratio: f32,
}

/// Per-step coefficients derived from [`SpringSettings`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Springiness {
    pub position_error_to_velocity: f32,
    pub effective_mass_cfm_scale: f32,
    pub softness_impulse_scale: f32,
}

impl SpringSettings {
    /// `damping_ratio` 0 is undamped, 1 critically damped, higher overdamped.
    pub fn new(frequency: f32, damping_ratio: f32) -> Self {
        let settings = Self {
            angular_frequency: frequency * TAU,
            twice_damping_ratio: damping_ratio * 2.0,
        };
        debug_assert!(
            settings.is_valid(),
            "Spring settings must have positive frequency and nonnegative damping ratio."
        );
        settings
    }

    pub fn frequency(&self) -> f32 {
        self.angular_frequency / TAU
    }

    pub fn damping_ratio(&self) -> f32 {
        self.twice_damping_ratio / 2.0
    }

    pub fn is_valid(&self) -> bool {
        self.angular_frequency.is_finite()
            && self.angular_frequency > 0.0
            && self.twice_damping_ratio.is_finite()
            && self.twice_damping_ratio >= 0.0
    }

    pub fn springiness(&self, dt: f32) -> Springiness {
        let angular_frequency_dt = self.angular_frequency * dt;
        let position_error_to_velocity =
            self.angular_frequency / (angular_frequency_dt + self.twice_damping_ratio);
        let extra = 1.0 / (angular_frequency_dt * (angular_frequency_dt + self.twice_damping_ratio));
        let effective_mass_cfm_scale = 1.0 / (1.0 + extra);
        Springiness {
            position_error_to_velocity,
            effective_mass_cfm_scale,
            softness_impulse_scale: extra * effective_mass_cfm_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn accessors_undo_the_scaling() {
        let spring = SpringSettings::new(30.0, 1.0);
        assert_relative_eq!(spring.frequency(), 30.0, epsilon = 1e-4);
        assert_relative_eq!(spring.damping_ratio(), 1.0);
    }

    #[test]
    fn stiffer_springs_recover_faster() {
        let soft = SpringSettings::new(5.0, 1.0).springiness(1.0 / 60.0);
        let stiff = SpringSettings::new(30.0, 1.0).springiness(1.0 / 60.0);
        assert!(stiff.position_error_to_velocity > soft.position_error_to_velocity);
        assert!(stiff.effective_mass_cfm_scale > soft.effective_mass_cfm_scale);
        assert!(stiff.softness_impulse_scale < soft.softness_impulse_scale);
    }
}
