pub mod terrain;
pub mod vehicle;

use bevy::prelude::*;
use terrain::TerrainGameplayPlugin;
use vehicle::VehicleGameplayPlugin;

/// Per-frame ordering of the run scene.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSet {
    /// Pedal buttons and keys become drive messages.
    Input,
    /// Drive state and wheel spin.
    Drive,
    /// Physics read-back and camera follow.
    Follow,
    /// Body recycling, then span regeneration.
    Recycle,
    /// Score label and overlays.
    Present,
}

/// Left edge of the visible world, in world units.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraScroll {
    pub x: f32,
}

pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraScroll>()
            .configure_sets(
                Update,
                (
                    FrameSet::Input,
                    FrameSet::Drive,
                    FrameSet::Follow,
                    FrameSet::Recycle,
                    FrameSet::Present,
                )
                    .chain(),
            )
            .add_plugins(VehicleGameplayPlugin)
            .add_plugins(TerrainGameplayPlugin);
    }
}
