use crate::config::DriveConfig;
use bevy::prelude::*;

/// Which acceleration constant is currently fed into the wheel velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveMode {
    Accelerating,
    Decelerating,
    #[default]
    Coasting,
}

/// Pointer or key edge on one of the two pedals.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveInput {
    GasPressed,
    GasReleased,
    BrakePressed,
    BrakeReleased,
}

impl DriveMode {
    /// Releasing either pedal always falls back to coasting.
    pub fn after(self, input: DriveInput) -> Self {
        match input {
            DriveInput::GasPressed => Self::Accelerating,
            DriveInput::BrakePressed => Self::Decelerating,
            DriveInput::GasReleased | DriveInput::BrakeReleased => Self::Coasting,
        }
    }

    pub fn acceleration(self, drive: &DriveConfig) -> f32 {
        match self {
            Self::Accelerating => drive.accelerating,
            Self::Decelerating => drive.decelerating,
            Self::Coasting => drive.coasting,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Accelerating => "accelerating",
            Self::Decelerating => "decelerating",
            Self::Coasting => "coasting",
        }
    }
}

/// Scalar wheel velocity shared by both wheels.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleMotion {
    pub velocity: f32,
    pub acceleration: f32,
    pub mode: DriveMode,
}

impl VehicleMotion {
    pub fn at_rest(drive: &DriveConfig) -> Self {
        let mode = DriveMode::default();
        Self {
            velocity: 0.0,
            acceleration: mode.acceleration(drive),
            mode,
        }
    }

    pub fn apply_input(&mut self, input: DriveInput, drive: &DriveConfig) {
        self.mode = self.mode.after(input);
        self.acceleration = self.mode.acceleration(drive);
    }

    /// One tick of integration; the result always lies in `[0, max_velocity]`.
    pub fn advance(&mut self, max_velocity: f32) {
        let ceiling = max_velocity.max(0.0);
        self.velocity = (self.velocity + self.acceleration).clamp(0.0, ceiling);
    }

    /// Rapier angular velocity for both wheels. Negative spins clockwise, which rolls right.
    pub fn wheel_angular_velocity(&self, spin_scale: f32) -> f32 {
        -self.velocity * spin_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn drive() -> DriveConfig {
        sample_config().vehicle.drive
    }

    #[test]
    fn transitions_follow_the_pedals() {
        let mode = DriveMode::Coasting;
        assert_eq!(mode.after(DriveInput::GasPressed), DriveMode::Accelerating);
        assert_eq!(
            DriveMode::Accelerating.after(DriveInput::GasReleased),
            DriveMode::Coasting
        );
        assert_eq!(
            DriveMode::Accelerating.after(DriveInput::BrakePressed),
            DriveMode::Decelerating
        );
        assert_eq!(
            DriveMode::Decelerating.after(DriveInput::BrakeReleased),
            DriveMode::Coasting
        );
    }

    #[test]
    fn each_mode_replaces_acceleration_outright() {
        let drive = drive();
        let mut motion = VehicleMotion::at_rest(&drive);
        assert_eq!(motion.mode, DriveMode::Coasting);
        assert_eq!(motion.acceleration, -0.005);

        motion.apply_input(DriveInput::GasPressed, &drive);
        assert_eq!(motion.acceleration, 0.01);
        motion.apply_input(DriveInput::BrakePressed, &drive);
        assert_eq!(motion.acceleration, -0.1);
        motion.apply_input(DriveInput::BrakeReleased, &drive);
        assert_eq!(motion.acceleration, -0.005);
    }

    #[test]
    fn holding_gas_reaches_and_holds_max_velocity() {
        let drive = drive();
        let mut motion = VehicleMotion::at_rest(&drive);
        motion.apply_input(DriveInput::GasPressed, &drive);

        for _ in 0..100 {
            motion.advance(drive.max_velocity);
        }
        assert!((motion.velocity - 1.0).abs() < 1e-4);

        for _ in 0..500 {
            motion.advance(drive.max_velocity);
        }
        assert_eq!(motion.velocity, drive.max_velocity);
    }

    #[test]
    fn braking_stops_at_zero() {
        let drive = drive();
        let mut motion = VehicleMotion {
            velocity: 0.25,
            ..VehicleMotion::at_rest(&drive)
        };
        motion.apply_input(DriveInput::BrakePressed, &drive);
        motion.advance(drive.max_velocity);
        motion.advance(drive.max_velocity);
        motion.advance(drive.max_velocity);
        assert_eq!(motion.velocity, 0.0);
    }

    #[test]
    fn velocity_stays_in_range_under_random_input() {
        let drive = drive();
        let mut rng = StdRng::seed_from_u64(99);
        let mut motion = VehicleMotion::at_rest(&drive);
        let inputs = [
            DriveInput::GasPressed,
            DriveInput::GasReleased,
            DriveInput::BrakePressed,
            DriveInput::BrakeReleased,
        ];

        for _ in 0..5_000 {
            if rng.gen::<f32>() < 0.05 {
                motion.apply_input(inputs[rng.gen_range(0..inputs.len())], &drive);
            }
            motion.advance(drive.max_velocity);
            assert!((0.0..=drive.max_velocity).contains(&motion.velocity));
        }
    }

    #[test]
    fn wheels_spin_clockwise_when_moving_forward() {
        let motion = VehicleMotion {
            velocity: 2.0,
            acceleration: 0.0,
            mode: DriveMode::Coasting,
        };
        assert_eq!(motion.wheel_angular_velocity(30.0), -60.0);
    }
}
