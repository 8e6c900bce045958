pub mod drive;
mod runtime;
mod scene;

use crate::config::GameConfig;
use crate::gameplay::terrain::TerrainSegment;
use crate::gameplay::{CameraScroll, FrameSet};
use crate::states::GameState;
use bevy::math::primitives::RegularPolygon;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

pub use drive::{DriveInput, DriveMode, VehicleMotion};

const CHASSIS_Z: f32 = 5.0;
const WHEEL_Z: f32 = 6.0;
const WHEEL_SIDES: u32 = 8;

pub struct VehicleGameplayPlugin;

impl Plugin for VehicleGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<DriveInput>()
            .init_resource::<VehicleMotion>()
            .init_resource::<VehicleInputBindings>()
            .init_resource::<VehicleTelemetry>()
            .add_systems(
                OnEnter(GameState::InRun),
                (scene::spawn_vehicle_rig, runtime::reset_vehicle_motion),
            )
            .add_systems(OnExit(GameState::InRun), scene::cleanup_vehicle_rig)
            .add_systems(
                FixedUpdate,
                runtime::advance_drive_velocity
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                Update,
                (
                    runtime::read_drive_keys.in_set(FrameSet::Input),
                    (runtime::apply_drive_inputs, runtime::spin_wheels)
                        .chain()
                        .in_set(FrameSet::Drive),
                    (
                        runtime::sync_rapier_gravity_from_config,
                        runtime::update_vehicle_telemetry,
                        runtime::report_chassis_ground_contact,
                        runtime::camera_follow_vehicle,
                    )
                        .chain()
                        .in_set(FrameSet::Follow),
                )
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}

#[derive(Component)]
pub struct PlayerVehicle;

#[derive(Component)]
pub struct VehicleChassis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelAxle {
    Front,
    Rear,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct VehicleWheel {
    pub axle: WheelAxle,
}

/// Extra joint holder; rapier attaches it to the wheel it is parented to.
#[derive(Component)]
struct WheelJointAnchor;

#[derive(Resource, Debug, Clone)]
struct VehicleInputBindings {
    gas: Vec<KeyCode>,
    brake: Vec<KeyCode>,
}

impl Default for VehicleInputBindings {
    fn default() -> Self {
        Self {
            gas: vec![KeyCode::KeyD, KeyCode::ArrowRight],
            brake: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
        }
    }
}

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleTelemetry {
    pub chassis_x: f32,
    pub chassis_y: f32,
    pub ground_contacts: u32,
    pub touching_ground: bool,
}

impl VehicleTelemetry {
    /// Score shown on the HUD: the chassis x rounded to a whole unit.
    pub fn score(&self) -> i64 {
        self.chassis_x.round() as i64
    }
}
