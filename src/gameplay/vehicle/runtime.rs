use super::*;

pub(super) fn reset_vehicle_motion(
    config: Res<GameConfig>,
    mut motion: ResMut<VehicleMotion>,
    mut telemetry: ResMut<VehicleTelemetry>,
) {
    *motion = VehicleMotion::at_rest(&config.vehicle.drive);
    *telemetry = VehicleTelemetry::default();
}

pub(super) fn read_drive_keys(
    keyboard: Res<ButtonInput<KeyCode>>,
    bindings: Res<VehicleInputBindings>,
    mut drive_inputs: MessageWriter<DriveInput>,
) {
    let edges = [
        (&bindings.gas, DriveInput::GasPressed, DriveInput::GasReleased),
        (
            &bindings.brake,
            DriveInput::BrakePressed,
            DriveInput::BrakeReleased,
        ),
    ];

    for (keys, pressed, released) in edges {
        if keys.iter().any(|key| keyboard.just_pressed(*key)) {
            drive_inputs.write(pressed);
        }
        if keys.iter().any(|key| keyboard.just_released(*key)) {
            drive_inputs.write(released);
        }
    }
}

pub(super) fn apply_drive_inputs(
    config: Res<GameConfig>,
    mut drive_inputs: MessageReader<DriveInput>,
    mut motion: ResMut<VehicleMotion>,
) {
    for input in drive_inputs.read() {
        let previous = motion.mode;
        motion.apply_input(*input, &config.vehicle.drive);
        if motion.mode != previous {
            debug!("Drive mode {} -> {}.", previous.label(), motion.mode.label());
        }
    }
}

pub(super) fn advance_drive_velocity(config: Res<GameConfig>, mut motion: ResMut<VehicleMotion>) {
    motion.advance(config.vehicle.drive.max_velocity);
}

pub(super) fn spin_wheels(
    config: Res<GameConfig>,
    motion: Res<VehicleMotion>,
    mut wheels: Query<&mut Velocity, With<VehicleWheel>>,
) {
    let angvel = motion.wheel_angular_velocity(config.vehicle.drive.wheel_spin_scale);
    for mut velocity in &mut wheels {
        velocity.angvel = angvel;
    }
}

pub(super) fn sync_rapier_gravity_from_config(
    config: Res<GameConfig>,
    mut rapier_config_query: Query<&mut RapierConfiguration, With<DefaultRapierContext>>,
) {
    if !config.is_changed() {
        return;
    }

    if let Ok(mut rapier_config) = rapier_config_query.single_mut() {
        rapier_config.gravity = Vec2::new(0.0, -config.game.physics.gravity.max(0.0));
    }
}

pub(super) fn update_vehicle_telemetry(
    mut telemetry: ResMut<VehicleTelemetry>,
    chassis_query: Query<&Transform, With<VehicleChassis>>,
) {
    let Ok(transform) = chassis_query.single() else {
        return;
    };

    telemetry.chassis_x = transform.translation.x;
    telemetry.chassis_y = transform.translation.y;
}

/// Chassis-on-ground contact is reported and counted, never acted on.
pub(super) fn report_chassis_ground_contact(
    mut collision_events: MessageReader<CollisionEvent>,
    mut telemetry: ResMut<VehicleTelemetry>,
    chassis_query: Query<(), With<VehicleChassis>>,
    ground_query: Query<(), With<TerrainSegment>>,
) {
    for event in collision_events.read() {
        let (first, second, started) = match event {
            CollisionEvent::Started(first, second, _) => (*first, *second, true),
            CollisionEvent::Stopped(first, second, _) => (*first, *second, false),
        };
        let chassis_hits_ground = (chassis_query.contains(first) && ground_query.contains(second))
            || (chassis_query.contains(second) && ground_query.contains(first));
        if !chassis_hits_ground {
            continue;
        }

        if started {
            telemetry.ground_contacts = telemetry.ground_contacts.saturating_add(1);
            telemetry.touching_ground = true;
            info!(
                "game over: chassis touched the ground at x={:.0} (contact #{})",
                telemetry.chassis_x, telemetry.ground_contacts
            );
        } else {
            telemetry.touching_ground = false;
        }
    }
}

/// Keeps the chassis at `follow_fraction` of the viewport width from the left edge.
pub(super) fn camera_follow_vehicle(
    config: Res<GameConfig>,
    telemetry: Res<VehicleTelemetry>,
    mut scroll: ResMut<CameraScroll>,
    mut camera_query: Query<&mut Transform, (With<Camera2d>, Without<PlayerVehicle>)>,
) {
    let app = &config.game.app;
    scroll.x = follow_scroll_x(
        telemetry.chassis_x,
        app.viewport_width,
        config.game.camera.follow_fraction,
    );

    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };
    camera_transform.translation.x = scroll.x + app.viewport_width * 0.5;
    camera_transform.translation.y = -app.viewport_height * 0.5;
}

pub(super) fn follow_scroll_x(chassis_x: f32, viewport_width: f32, follow_fraction: f32) -> f32 {
    chassis_x - viewport_width * follow_fraction
}
