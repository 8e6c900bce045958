use super::*;
use bevy::ecs::query::QueryFilter;

#[derive(Debug, Clone, Copy, Default)]
pub(super) struct SegmentPlacement {
    created: u32,
    reused: u32,
}

pub(super) fn spawn_mountains(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    config: Res<GameConfig>,
    mut pool: ResMut<SegmentPool>,
    mut stats: ResMut<TerrainStats>,
    mut segments: Query<(&mut TerrainSegment, &mut Transform, &mut Collider)>,
) {
    let mut source = match TerrainSource::from_config(&config) {
        Ok(source) => source,
        Err(error) => {
            error!("Terrain generator rejected the configuration: {error}");
            return;
        }
    };

    pool.clear();
    *stats = TerrainStats::default();

    let style = &config.terrain.style;
    let [ground_r, ground_g, ground_b] = style.ground_rgb;
    let [grass_r, grass_g, grass_b] = style.grass_rgb;
    let ground_material = materials.add(ColorMaterial::from(Color::srgb(
        ground_r, ground_g, ground_b,
    )));
    let grass_material = materials.add(ColorMaterial::from(Color::srgb(grass_r, grass_g, grass_b)));
    let viewport_height = config.game.app.viewport_height;

    for index in 0..config.terrain.terrain.mountains_amount {
        let generated = source.next_span();
        let span = TerrainSpan::from(&generated);
        let ground = meshes.add(build_ground_fill_mesh(&span.points, viewport_height));
        let grass = meshes.add(build_grass_strip_mesh(&span.points, style.grass_width));

        let placement = place_span_segments(&mut commands, &mut pool, &mut segments, &span, &config);
        record_span(&mut stats, placement);

        commands
            .spawn((
                Name::new(format!("Mountain{index}")),
                MountainMeshes {
                    ground: ground.clone(),
                    grass: grass.clone(),
                },
                Transform::from_xyz(span.x, 0.0, 0.0),
                Visibility::default(),
                span,
            ))
            .with_children(|parent| {
                parent.spawn((
                    Name::new("MountainGround"),
                    Mesh2d(ground),
                    MeshMaterial2d(ground_material.clone()),
                    Transform::from_xyz(0.0, 0.0, GROUND_FILL_Z),
                ));
                parent.spawn((
                    Name::new("MountainGrass"),
                    Mesh2d(grass),
                    MeshMaterial2d(grass_material.clone()),
                    Transform::from_xyz(0.0, 0.0, GRASS_Z),
                ));
            });
    }

    info!(
        "Spawned {} mountains ({} terrain segments), next span starts at x={:.0}.",
        stats.spans_generated,
        stats.segments_created,
        source.next_start().x
    );
    commands.insert_resource(source);
}

pub(super) fn cleanup_terrain(
    mut commands: Commands,
    mountains: Query<Entity, With<TerrainSpan>>,
    segments: Query<Entity, With<TerrainSegment>>,
    mut pool: ResMut<SegmentPool>,
) {
    for entity in mountains.iter().chain(segments.iter()) {
        commands.entity(entity).try_despawn();
    }
    pool.clear();
    commands.remove_resource::<TerrainSource>();
}

/// Spans generated after a config change (F5 reload, tuning panel) use the new profile.
pub(super) fn sync_terrain_settings_from_config(
    config: Res<GameConfig>,
    mut source: ResMut<TerrainSource>,
) {
    if !config.is_changed() {
        return;
    }
    let settings = config.terrain_settings();
    if source.settings() == &settings {
        return;
    }
    match source.apply_settings(settings) {
        Ok(()) => info!("Terrain generator picked up the reloaded terrain settings."),
        Err(error) => error!("Terrain generator kept its previous settings: {error}"),
    }
}

pub(super) fn pool_segments_behind_camera(
    scroll: Res<CameraScroll>,
    config: Res<GameConfig>,
    mut pool: ResMut<SegmentPool>,
    mut stats: ResMut<TerrainStats>,
    mut segments: Query<(Entity, &Transform, &mut TerrainSegment)>,
) {
    let margin = config.terrain.recycling.body_margin;

    for (entity, transform, mut segment) in &mut segments {
        if segment.state == SegmentState::Pooled {
            continue;
        }
        if !is_behind_camera(transform.translation.x, scroll.x, margin) {
            continue;
        }
        if pool.offer(entity) {
            segment.state = SegmentState::Pooled;
            stats.active_segments = stats.active_segments.saturating_sub(1);
        }
    }
}

#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub(super) fn regenerate_off_screen_mountains(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    scroll: Res<CameraScroll>,
    config: Res<GameConfig>,
    mut source: ResMut<TerrainSource>,
    mut pool: ResMut<SegmentPool>,
    mut stats: ResMut<TerrainStats>,
    mut mountains: Query<
        (&mut TerrainSpan, &MountainMeshes, &mut Transform),
        Without<TerrainSegment>,
    >,
    mut segments: Query<(&mut TerrainSegment, &mut Transform, &mut Collider), Without<TerrainSpan>>,
) {
    let margin = config.terrain.recycling.mountain_margin;
    let viewport_height = config.game.app.viewport_height;
    let grass_width = config.terrain.style.grass_width;

    for (mut span, mountain_meshes, mut transform) in &mut mountains {
        if !span.is_off_screen(scroll.x, margin) {
            continue;
        }

        let generated = source.next_span();
        *span = TerrainSpan::from(&generated);
        transform.translation.x = span.x;

        if let Some(mesh) = meshes.get_mut(&mountain_meshes.ground) {
            *mesh = build_ground_fill_mesh(&span.points, viewport_height);
        }
        if let Some(mesh) = meshes.get_mut(&mountain_meshes.grass) {
            *mesh = build_grass_strip_mesh(&span.points, grass_width);
        }

        let placement = place_span_segments(&mut commands, &mut pool, &mut segments, &span, &config);
        record_span(&mut stats, placement);

        info!(
            "Regenerated mountain at x={:.0} (width {:.0}): {} segments reused, {} created, {} pooled.",
            span.x,
            span.width,
            placement.reused,
            placement.created,
            pool.len()
        );
    }
}

/// Lays one collision rectangle per profile edge, recycling pooled bodies first.
fn place_span_segments<F: QueryFilter>(
    commands: &mut Commands,
    pool: &mut SegmentPool,
    segments: &mut Query<(&mut TerrainSegment, &mut Transform, &mut Collider), F>,
    span: &TerrainSpan,
    config: &GameConfig,
) -> SegmentPlacement {
    let recycling = &config.terrain.recycling;
    let world_points: Vec<Vec2> = span.world_points().collect();
    let mut placement = SegmentPlacement::default();

    for pair in world_points.windows(2) {
        let target = SegmentShape::between(pair[0], pair[1], recycling.segment_thickness);

        let recycled = match pool.take() {
            Some(entity) => match segments.get_mut(entity) {
                Ok(components) => Some(components),
                Err(_) => {
                    warn!("Pooled terrain segment {entity:?} no longer exists; spawning a fresh one.");
                    None
                }
            },
            None => None,
        };

        match recycled {
            Some((mut segment, mut transform, mut collider)) => {
                segment.shape.reshape_to(&target);
                segment.state = SegmentState::Active;
                *transform = segment.shape.transform(SEGMENT_Z);
                *collider = segment.shape.collider();
                placement.reused += 1;
            }
            None => {
                spawn_segment(commands, target, recycling.segment_friction);
                placement.created += 1;
            }
        }
    }

    placement
}

fn spawn_segment(commands: &mut Commands, shape: SegmentShape, friction: f32) {
    commands.spawn((
        Name::new("TerrainSegment"),
        TerrainSegment {
            state: SegmentState::Active,
            shape,
        },
        RigidBody::Fixed,
        shape.collider(),
        Friction::coefficient(friction),
        Restitution::coefficient(0.0),
        shape.transform(SEGMENT_Z),
    ));
}

fn record_span(stats: &mut TerrainStats, placement: SegmentPlacement) {
    stats.spans_generated = stats.spans_generated.saturating_add(1);
    stats.segments_created = stats.segments_created.saturating_add(placement.created);
    stats.segments_reused = stats.segments_reused.saturating_add(placement.reused);
    stats.active_segments = stats
        .active_segments
        .saturating_add(placement.created + placement.reused);
}
