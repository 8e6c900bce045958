mod config;
mod controls;
mod debug;
mod gameplay;
mod states;
mod ui;
mod wallet;

use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_rapier2d::prelude::*;
use config::ConfigPlugin;
use controls::ControlsPlugin;
use debug::DebugOverlayPlugin;
use gameplay::GameplayPlugin;
use states::{GameState, GameStatePlugin};
use ui::GameHudPlugin;
use wallet::WalletPlugin;

fn main() {
    let config = config::load_startup_config();
    let app_config = &config.game.app;
    let resolution = (
        app_config.viewport_width.round() as u32,
        app_config.viewport_height.round() as u32,
    );

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: app_config.title.clone(),
                resolution: resolution.into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(app_config.background_color()))
        .add_plugins(EguiPlugin::default())
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(
            config.game.physics.pixels_per_meter,
        ))
        .add_plugins(RapierDebugRenderPlugin::default().disabled())
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        .insert_resource(config.clone())
        .add_plugins(ConfigPlugin)
        .add_plugins(DebugOverlayPlugin)
        .add_plugins(GameplayPlugin)
        .add_plugins(ControlsPlugin)
        .add_plugins(GameHudPlugin)
        .add_plugins(WalletPlugin)
        .init_state::<GameState>()
        .add_plugins(GameStatePlugin)
        .run();
}
