use bevy::asset::LoadState;
use bevy::prelude::*;

const GAS_ICON_PATH: &str = "sprites/gas.png";
const BRAKE_ICON_PATH: &str = "sprites/brake.png";
const MIN_LOADING_SCREEN_SECONDS: f64 = 0.5;

#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum GameState {
    #[default]
    Boot,
    Loading,
    InRun,
}

pub struct GameStatePlugin;

impl Plugin for GameStatePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_camera)
            .add_systems(OnEnter(GameState::Boot), enter_boot)
            .add_systems(Update, boot_to_loading.run_if(in_state(GameState::Boot)))
            .add_systems(OnEnter(GameState::Loading), enter_loading)
            .add_systems(OnExit(GameState::Loading), cleanup_loading_screen)
            .add_systems(
                Update,
                loading_to_in_run.run_if(in_state(GameState::Loading)),
            )
            .add_systems(OnEnter(GameState::InRun), enter_in_run)
            .add_systems(
                Update,
                restart_run_hotkey.run_if(in_state(GameState::InRun)),
            );
    }
}

/// Gas and brake button images, preloaded before the run starts.
#[derive(Resource, Debug, Clone)]
pub struct ControlIcons {
    pub gas: Handle<Image>,
    pub brake: Handle<Image>,
}

impl ControlIcons {
    fn handles(&self) -> [(&'static str, &Handle<Image>); 2] {
        [(GAS_ICON_PATH, &self.gas), (BRAKE_ICON_PATH, &self.brake)]
    }
}

#[derive(Component)]
struct LoadingScreenText;

#[derive(Resource, Debug, Clone, Copy)]
struct LoadingScreenState {
    entered_at_s: f64,
}

fn setup_camera(mut commands: Commands) {
    commands.spawn((Name::new("GameplayCamera"), Camera2d));
}

fn enter_boot() {
    info!("Entered state: Boot");
}

fn boot_to_loading(mut next_state: ResMut<NextState<GameState>>) {
    next_state.set(GameState::Loading);
}

fn enter_loading(mut commands: Commands, asset_server: Res<AssetServer>, time: Res<Time>) {
    info!("Entered state: Loading");

    commands.insert_resource(ControlIcons {
        gas: asset_server.load(GAS_ICON_PATH),
        brake: asset_server.load(BRAKE_ICON_PATH),
    });
    commands.insert_resource(LoadingScreenState {
        entered_at_s: time.elapsed_secs_f64(),
    });

    commands.spawn((
        Name::new("LoadingText"),
        LoadingScreenText,
        Text::new("Loading..."),
        TextFont {
            font_size: 32.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(24.0),
            bottom: Val::Px(24.0),
            ..default()
        },
    ));
}

fn cleanup_loading_screen(
    mut commands: Commands,
    loading_text_query: Query<Entity, With<LoadingScreenText>>,
) {
    for entity in &loading_text_query {
        commands.entity(entity).try_despawn();
    }
    commands.remove_resource::<LoadingScreenState>();
}

fn loading_to_in_run(
    time: Res<Time>,
    asset_server: Res<AssetServer>,
    loading_state: Option<Res<LoadingScreenState>>,
    icons: Option<Res<ControlIcons>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let (Some(loading_state), Some(icons)) = (loading_state, icons) else {
        return;
    };

    let has_min_time =
        time.elapsed_secs_f64() - loading_state.entered_at_s >= MIN_LOADING_SCREEN_SECONDS;
    if !has_min_time {
        return;
    }

    let mut failed = Vec::new();
    for (path, handle) in icons.handles() {
        let loaded = asset_server.is_loaded_with_dependencies(handle.id());
        let load_failed = matches!(asset_server.load_state(handle.id()), LoadState::Failed(_));
        if !loaded && !load_failed {
            return;
        }
        if load_failed {
            failed.push(path);
        }
    }

    for path in failed {
        warn!("Control icon `{path}` failed to load, buttons fall back to text labels.");
    }

    next_state.set(GameState::InRun);
}

fn enter_in_run() {
    info!("Entered state: InRun");
}

/// Re-enters the run: every `OnExit`/`OnEnter(InRun)` system resets its part of the scene.
fn restart_run_hotkey(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(KeyCode::KeyR) {
        info!("Restarting run.");
        next_state.set(GameState::Loading);
    }
}
