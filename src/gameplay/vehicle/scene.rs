use super::*;

/// Converts a rig offset given in screen orientation (y down) into world orientation.
fn world_offset(offset: [f32; 2]) -> Vec2 {
    Vec2::new(offset[0], -offset[1])
}

/// Convex hull of the wheel polygon, so the collision shape matches the mesh.
fn wheel_collider(shape: RegularPolygon) -> Collider {
    let vertices: Vec<Vec2> = shape.vertices(0.0).into_iter().collect();
    Collider::convex_polyline(vertices).unwrap_or_else(|| {
        warn!("Wheel polygon has no convex hull; falling back to a ball collider.");
        Collider::ball(shape.circumradius())
    })
}

pub(super) fn spawn_vehicle_rig(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    config: Res<GameConfig>,
    existing: Query<Entity, With<PlayerVehicle>>,
) {
    if !existing.is_empty() {
        return;
    }

    let rig = &config.vehicle.vehicle;
    let chassis_size = Vec2::from(rig.chassis_size);
    let spawn = Vec2::new(config.game.app.viewport_width / 8.0, 0.0);

    let chassis = commands
        .spawn((
            Name::new("VehicleChassis"),
            PlayerVehicle,
            VehicleChassis,
            Sprite::from_color(Color::srgb(0.18, 0.18, 0.22), chassis_size),
            Transform::from_xyz(spawn.x, spawn.y, CHASSIS_Z),
            RigidBody::Dynamic,
            Collider::cuboid(chassis_size.x * 0.5, chassis_size.y * 0.5),
            Friction::coefficient(rig.friction),
            Restitution::coefficient(rig.restitution),
            Velocity::zero(),
            ActiveEvents::COLLISION_EVENTS,
            Ccd::enabled(),
        ))
        .id();

    let wheel_shape = RegularPolygon::new(rig.wheel_radius, WHEEL_SIDES);
    let wheel_mesh = meshes.add(wheel_shape);
    let wheel_collider = wheel_collider(wheel_shape);
    let wheel_material = materials.add(ColorMaterial::from(Color::srgb(0.12, 0.12, 0.12)));
    let wheel_offset = world_offset(rig.wheel_offset);

    for (axle, side, anchors) in [
        (WheelAxle::Front, 1.0, &rig.front_anchors),
        (WheelAxle::Rear, -1.0, &rig.rear_anchors),
    ] {
        let position = spawn + Vec2::new(wheel_offset.x * side, wheel_offset.y);
        let joints: Vec<ImpulseJoint> = anchors
            .iter()
            .map(|anchor| {
                let spring = SpringJointBuilder::new(
                    rig.constraint_length,
                    rig.constraint_stiffness,
                    rig.constraint_damping,
                )
                .local_anchor1(world_offset(*anchor))
                .local_anchor2(Vec2::ZERO);
                ImpulseJoint::new(chassis, spring)
            })
            .collect();
        let mut joints = joints.into_iter();

        let mut wheel = commands.spawn((
            Name::new(match axle {
                WheelAxle::Front => "VehicleWheelFront",
                WheelAxle::Rear => "VehicleWheelRear",
            }),
            PlayerVehicle,
            VehicleWheel { axle },
            Mesh2d(wheel_mesh.clone()),
            MeshMaterial2d(wheel_material.clone()),
            Transform::from_xyz(position.x, position.y, WHEEL_Z),
            RigidBody::Dynamic,
            wheel_collider.clone(),
            Friction::coefficient(rig.friction),
            Restitution::coefficient(rig.restitution),
            Velocity::zero(),
        ));
        if let Some(first) = joints.next() {
            wheel.insert(first);
        }
        wheel.with_children(|parent| {
            for joint in joints {
                parent.spawn((Name::new("WheelJointAnchor"), WheelJointAnchor, joint));
            }
        });
    }

    info!(
        "Spawned vehicle at x={:.0} with {} spring constraints.",
        spawn.x,
        rig.front_anchors.len() + rig.rear_anchors.len()
    );
}

pub(super) fn cleanup_vehicle_rig(
    mut commands: Commands,
    vehicle_parts: Query<Entity, With<PlayerVehicle>>,
) {
    for entity in &vehicle_parts {
        commands.entity(entity).try_despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use bevy::ecs::system::RunSystemOnce;

    fn rig_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Mesh>()
            .init_asset::<ColorMaterial>()
            .insert_resource(sample_config())
            .add_systems(Startup, spawn_vehicle_rig);
        app.update();
        app
    }

    #[test]
    fn rig_has_chassis_two_wheels_and_four_joints() {
        let mut app = rig_app();

        let mut chassis = app
            .world_mut()
            .query_filtered::<&Transform, With<VehicleChassis>>();
        let chassis: Vec<Transform> = chassis.iter(app.world()).copied().collect();
        assert_eq!(chassis.len(), 1);
        assert_eq!(chassis[0].translation.x, 160.0);

        let mut wheels = app.world_mut().query::<(&VehicleWheel, &Transform)>();
        let mut wheels: Vec<(WheelAxle, Vec3)> = wheels
            .iter(app.world())
            .map(|(wheel, transform)| (wheel.axle, transform.translation))
            .collect();
        wheels.sort_by(|a, b| a.1.x.total_cmp(&b.1.x));
        assert_eq!(wheels.len(), 2);
        assert_eq!(wheels[0].0, WheelAxle::Rear);
        assert_eq!(wheels[0].1.truncate(), Vec2::new(135.0, -25.0));
        assert_eq!(wheels[1].1.truncate(), Vec2::new(185.0, -25.0));

        let mut joints = app.world_mut().query::<&ImpulseJoint>();
        assert_eq!(joints.iter(app.world()).count(), 4);
    }

    #[test]
    fn wheels_collide_as_octagons_matching_their_mesh() {
        let mut app = rig_app();
        let mut wheels = app
            .world_mut()
            .query_filtered::<&Collider, With<VehicleWheel>>();
        let colliders: Vec<Collider> = wheels.iter(app.world()).cloned().collect();
        assert_eq!(colliders.len(), 2);

        for collider in &colliders {
            let polygon = collider.as_convex_polygon().expect("octagon hull");
            let points: Vec<Vec2> = polygon.points().collect();
            assert_eq!(points.len(), WHEEL_SIDES as usize);
            assert!(points
                .iter()
                .all(|point| (point.length() - 15.0).abs() < 1e-3));
        }
    }

    #[test]
    fn spawning_twice_keeps_a_single_rig() {
        let mut app = rig_app();
        app.world_mut()
            .run_system_once(spawn_vehicle_rig)
            .expect("spawn system should run");

        let mut parts = app
            .world_mut()
            .query_filtered::<Entity, With<VehicleChassis>>();
        assert_eq!(parts.iter(app.world()).count(), 1);
    }
}
