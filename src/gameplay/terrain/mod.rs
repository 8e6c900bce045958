pub mod generator;
mod mesh;
pub mod pool;
mod runtime;
pub mod segment;
pub mod simplify;

use crate::config::GameConfig;
use crate::gameplay::{CameraScroll, FrameSet};
use crate::states::GameState;
use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use mesh::{build_ground_fill_mesh, build_grass_strip_mesh, span_local};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub use generator::{GeneratedSpan, TerrainError, TerrainGenerator, TerrainSettings};
pub use pool::{is_behind_camera, SegmentPool};
pub use segment::SegmentShape;

const GROUND_FILL_Z: f32 = 0.0;
const GRASS_Z: f32 = 0.1;
const SEGMENT_Z: f32 = 0.0;

pub struct TerrainGameplayPlugin;

impl Plugin for TerrainGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SegmentPool>()
            .init_resource::<TerrainStats>()
            .add_systems(OnEnter(GameState::InRun), runtime::spawn_mountains)
            .add_systems(OnExit(GameState::InRun), runtime::cleanup_terrain)
            .add_systems(
                Update,
                (
                    runtime::sync_terrain_settings_from_config,
                    runtime::pool_segments_behind_camera,
                    runtime::regenerate_off_screen_mountains,
                )
                    .chain()
                    .in_set(FrameSet::Recycle)
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>)
                    .run_if(resource_exists::<TerrainSource>),
            );
    }
}

/// One mountain's simplified ground profile and its horizontal placement.
#[derive(Component, Debug, Clone)]
pub struct TerrainSpan {
    pub x: f32,
    pub width: f32,
    /// Span-local x, screen-space y.
    pub points: Vec<Vec2>,
}

impl From<&GeneratedSpan> for TerrainSpan {
    fn from(span: &GeneratedSpan) -> Self {
        Self {
            x: span.start_x,
            width: span.width,
            points: span.points.clone(),
        }
    }
}

impl TerrainSpan {
    pub fn is_off_screen(&self, scroll_x: f32, margin: f32) -> bool {
        scroll_x > self.x + self.width + margin
    }

    /// Profile points in world space.
    pub fn world_points(&self) -> impl Iterator<Item = Vec2> + '_ {
        let offset = Vec2::new(self.x, 0.0);
        self.points.iter().map(move |point| span_local(*point) + offset)
    }
}

#[derive(Component, Debug, Clone)]
struct MountainMeshes {
    ground: Handle<Mesh>,
    grass: Handle<Mesh>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Active,
    Pooled,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct TerrainSegment {
    pub state: SegmentState,
    pub shape: SegmentShape,
}

/// Generator plus the end point the next regenerated span continues from.
#[derive(Resource)]
pub struct TerrainSource {
    generator: TerrainGenerator<StdRng>,
    next_start: Vec2,
}

impl TerrainSource {
    pub fn from_config(config: &GameConfig) -> Result<Self, TerrainError> {
        let rng = match config.terrain.terrain.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            generator: TerrainGenerator::new(config.terrain_settings(), rng)?,
            next_start: Vec2::ZERO,
        })
    }

    pub fn next_span(&mut self) -> GeneratedSpan {
        let span = self.generator.generate(self.next_start);
        self.next_start = span.end;
        span
    }

    pub fn settings(&self) -> &TerrainSettings {
        self.generator.settings()
    }

    pub fn next_start(&self) -> Vec2 {
        self.next_start
    }

    /// Later spans pick up new settings; existing spans keep their shape.
    pub fn apply_settings(&mut self, settings: TerrainSettings) -> Result<(), TerrainError> {
        self.generator.set_settings(settings)
    }
}

#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct TerrainStats {
    pub spans_generated: u32,
    pub segments_created: u32,
    pub segments_reused: u32,
    pub active_segments: u32,
}
