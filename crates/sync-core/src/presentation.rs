//! Per-tick presentation: smooth rendered state toward the latest targets.
//!
//! Position and orientation use exponential decay, `1 - e^(-rate * dt)` of
//! the remaining gap per tick, so motion looks the same at any frame rate
//! and arrival is asymptotic.

use bevy_math::{Quat, Vec3};

use crate::config::PresentationConfig;
use crate::registry::{OrientationSource, TrackedEntity};

/// Fraction of the remaining gap to close over `dt` seconds.
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return 0.0;
    }
    1.0 - (-rate * dt).exp()
}

/// Orientation facing along a planar direction, with +Z as yaw zero.
pub fn look_rotation(direction: Vec3) -> Quat {
    Quat::from_rotation_y(direction.x.atan2(direction.z))
}

/// Number of fixed-length ticks until a gap of `distance` shrinks below
/// `epsilon`, or `None` if it never does.
pub fn ticks_to_converge(distance: f32, epsilon: f32, rate: f32, dt: f32) -> Option<u32> {
    if distance < epsilon {
        return Some(0);
    }
    let remaining = 1.0 - smoothing_factor(rate, dt);
    if !(remaining < 1.0) || epsilon <= 0.0 {
        return None;
    }
    if remaining <= 0.0 {
        return Some(1);
    }
    let ticks = ((epsilon / distance).ln() / remaining.ln()).floor() + 1.0;
    Some(ticks as u32)
}

/// Advances one entity by one presentation tick.
///
/// A new entity is placed at its first reported position when it is
/// created, so every tick here interpolates from the rendered state.
pub fn present_entity(entity: &mut TrackedEntity, config: &PresentationConfig, dt: f32) {
    let alpha = smoothing_factor(config.move_rate, dt);
    entity.rendered_position = entity.rendered_position.lerp(entity.target_position, alpha);

    match entity.orientation {
        OrientationSource::Snapshot => {
            entity.rendered_rotation = entity.target_rotation;
        }
        OrientationSource::Motion => {
            let mut travel = entity.target_position - entity.rendered_position;
            travel.y = 0.0;

            // Hold the current heading while (nearly) stationary
            if travel.length_squared() > config.motion_threshold {
                let facing =
                    look_rotation(travel) * Quat::from_rotation_y(entity.heading_offset);
                let beta = smoothing_factor(config.rotation_rate, dt);
                entity.rendered_rotation = entity.rendered_rotation.slerp(facing, beta);
            }
        }
    }
}
