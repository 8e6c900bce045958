use crate::config::{DriveConfig, GameConfig, TerrainConfig, CONFIG_DIR};
use crate::gameplay::terrain::{SegmentPool, TerrainSource, TerrainStats};
use crate::gameplay::vehicle::{VehicleMotion, VehicleTelemetry};
use crate::gameplay::{CameraScroll, FrameSet};
use crate::states::GameState;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use bevy_rapier2d::render::DebugRenderContext;
use std::fs;
use std::path::Path;

pub struct DebugOverlayPlugin;

impl Plugin for DebugOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TuningPanelState>()
            .add_systems(Update, spawn_debug_overlay)
            .add_systems(
                Update,
                (
                    sync_physics_debug_render_from_config,
                    toggle_physics_debug_render,
                    toggle_tuning_panel,
                )
                    .chain()
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                Update,
                update_debug_overlay_text
                    .in_set(FrameSet::Present)
                    .run_if(in_state(GameState::InRun)),
            )
            .add_systems(
                EguiPrimaryContextPass,
                tuning_panel_ui
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}

#[derive(Component)]
struct DebugOverlayText;

/// Terrain and drive constants editable at runtime.
#[derive(Debug, Clone, PartialEq)]
struct TuningParams {
    start_terrain_height: f32,
    amplitude: f32,
    slope_length_min: u32,
    slope_length_max: u32,
    slopes_per_mountain: u32,
    simplify_tolerance: f32,
    accelerating: f32,
    decelerating: f32,
    coasting: f32,
    max_velocity: f32,
    wheel_spin_scale: f32,
}

impl TuningParams {
    fn from_config(config: &GameConfig) -> Self {
        let terrain = &config.terrain.terrain;
        let drive = &config.vehicle.drive;
        Self {
            start_terrain_height: terrain.start_terrain_height,
            amplitude: terrain.amplitude,
            slope_length_min: terrain.slope_length[0],
            slope_length_max: terrain.slope_length[1],
            slopes_per_mountain: terrain.slopes_per_mountain,
            simplify_tolerance: terrain.simplify_tolerance,
            accelerating: drive.accelerating,
            decelerating: drive.decelerating,
            coasting: drive.coasting,
            max_velocity: drive.max_velocity,
            wheel_spin_scale: drive.wheel_spin_scale,
        }
    }

    fn apply_to_terrain(&self, terrain: &mut TerrainConfig) {
        terrain.start_terrain_height = self.start_terrain_height;
        terrain.amplitude = self.amplitude;
        terrain.slope_length = [self.slope_length_min, self.slope_length_max];
        terrain.slopes_per_mountain = self.slopes_per_mountain;
        terrain.simplify_tolerance = self.simplify_tolerance;
    }

    fn apply_to_drive(&self, drive: &mut DriveConfig) {
        drive.accelerating = self.accelerating;
        drive.decelerating = self.decelerating;
        drive.coasting = self.coasting;
        drive.max_velocity = self.max_velocity;
        drive.wheel_spin_scale = self.wheel_spin_scale;
    }

    /// Returns the config these params would produce, or the validation error.
    fn applied_to(&self, config: &GameConfig) -> Result<GameConfig, String> {
        let mut candidate = config.clone();
        self.apply_to_terrain(&mut candidate.terrain.terrain);
        self.apply_to_drive(&mut candidate.vehicle.drive);
        candidate.validate().map_err(|error| error.to_string())?;
        Ok(candidate)
    }
}

#[derive(Resource, Debug, Clone, Default)]
struct TuningPanelState {
    visible: bool,
    params: Option<TuningParams>,
    status: String,
}

fn spawn_debug_overlay(
    mut commands: Commands,
    config: Option<Res<GameConfig>>,
    existing_overlay: Query<Entity, With<DebugOverlayText>>,
) {
    if !existing_overlay.is_empty() {
        return;
    }

    let Some(config) = config else {
        return;
    };

    if !config.game.app.debug_overlay {
        return;
    }

    commands.spawn((
        DebugOverlayText,
        Text::new("debug overlay initializing..."),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        TextColor(Color::srgb(0.10, 0.12, 0.16)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(16.0),
            top: Val::Px(52.0),
            ..default()
        },
        ZIndex(100),
    ));
}

#[allow(clippy::too_many_arguments)]
fn update_debug_overlay_text(
    diagnostics: Res<DiagnosticsStore>,
    scroll: Res<CameraScroll>,
    motion: Res<VehicleMotion>,
    telemetry: Res<VehicleTelemetry>,
    pool: Res<SegmentPool>,
    stats: Res<TerrainStats>,
    source: Option<Res<TerrainSource>>,
    mut overlay_query: Query<&mut Text, With<DebugOverlayText>>,
) {
    let Ok(mut text) = overlay_query.single_mut() else {
        return;
    };

    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|value| value.smoothed())
        .unwrap_or(0.0);
    let next_span_x = source
        .map(|source| source.next_start().x)
        .unwrap_or_default();

    *text = Text::new(format!(
        "FPS: {fps:>5.1}\nScroll X: {scroll:>8.1} | Chassis: ({cx:>7.1}, {cy:>6.1})\nVelocity: {velocity:>4.2} | Accel: {accel:>+6.3} | Mode: {mode}\nPool: {pooled} | Active segments: {active}\nSpans: {spans} | Segments created: {created} | reused: {reused}\nNext span x: {next_span_x:>8.1} | Ground contacts: {contacts}{touching}\nHotkeys: D/Right gas | A/Left brake | R restart | V tune | F3 physics | F5 reload config",
        scroll = scroll.x,
        cx = telemetry.chassis_x,
        cy = telemetry.chassis_y,
        velocity = motion.velocity,
        accel = motion.acceleration,
        mode = motion.mode.label(),
        pooled = pool.len(),
        active = stats.active_segments,
        spans = stats.spans_generated,
        created = stats.segments_created,
        reused = stats.segments_reused,
        contacts = telemetry.ground_contacts,
        touching = ground_contact_suffix(&telemetry),
    ));
}

fn ground_contact_suffix(telemetry: &VehicleTelemetry) -> &'static str {
    if telemetry.touching_ground {
        " (touching)"
    } else {
        ""
    }
}

fn sync_physics_debug_render_from_config(
    config: Res<GameConfig>,
    debug_render: Option<ResMut<DebugRenderContext>>,
) {
    if !config.is_changed() {
        return;
    }
    if let Some(mut debug_render) = debug_render {
        debug_render.enabled = config.game.app.physics_debug_render;
    }
}

fn toggle_physics_debug_render(
    keyboard: Res<ButtonInput<KeyCode>>,
    debug_render: Option<ResMut<DebugRenderContext>>,
) {
    if !keyboard.just_pressed(KeyCode::F3) {
        return;
    }
    let Some(mut debug_render) = debug_render else {
        return;
    };

    debug_render.enabled = !debug_render.enabled;
    info!(
        "Physics debug render {}.",
        if debug_render.enabled { "enabled" } else { "disabled" }
    );
}

fn toggle_tuning_panel(
    keyboard: Res<ButtonInput<KeyCode>>,
    config: Res<GameConfig>,
    mut panel_state: ResMut<TuningPanelState>,
) {
    if !keyboard.just_pressed(KeyCode::KeyV) {
        return;
    }

    panel_state.visible = !panel_state.visible;
    if panel_state.visible {
        panel_state.params = Some(TuningParams::from_config(&config));
        panel_state.status.clear();
        info!("Tuning panel shown.");
    } else {
        info!("Tuning panel hidden.");
    }
}

fn tuning_panel_ui(
    mut egui_contexts: EguiContexts,
    mut panel_state: ResMut<TuningPanelState>,
    mut config: ResMut<GameConfig>,
    source: Option<ResMut<TerrainSource>>,
) {
    if !panel_state.visible {
        return;
    }

    let mut params = panel_state
        .params
        .clone()
        .unwrap_or_else(|| TuningParams::from_config(&config));

    let mut window_open = panel_state.visible;
    let mut apply_clicked = false;
    let mut save_clicked = false;
    let mut reset_clicked = false;
    let status = panel_state.status.clone();

    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };
    egui::Window::new("Terrain + Drive Tuning")
        .open(&mut window_open)
        .resizable(true)
        .default_width(460.0)
        .show(ctx, |ui| {
            ui.label("Terrain changes shape the next regenerated mountain.");
            ui.separator();

            ui.collapsing("Terrain", |ui| {
                tuning_slider_row(
                    ui,
                    "start height",
                    &mut params.start_terrain_height,
                    0.05..=0.95,
                    0.01,
                );
                tuning_slider_row(ui, "amplitude", &mut params.amplitude, 0.0..=400.0, 1.0);
                tuning_count_row(ui, "slope length min", &mut params.slope_length_min, 1..=600);
                tuning_count_row(ui, "slope length max", &mut params.slope_length_max, 1..=600);
                tuning_count_row(ui, "slopes / mountain", &mut params.slopes_per_mountain, 1..=40);
                tuning_slider_row(
                    ui,
                    "simplify tolerance",
                    &mut params.simplify_tolerance,
                    0.1..=20.0,
                    0.1,
                );
            });

            ui.collapsing("Drive", |ui| {
                tuning_slider_row(ui, "accelerating", &mut params.accelerating, 0.0..=0.1, 0.001);
                tuning_slider_row(ui, "decelerating", &mut params.decelerating, -0.5..=0.0, 0.001);
                tuning_slider_row(ui, "coasting", &mut params.coasting, -0.1..=0.0, 0.001);
                tuning_slider_row(ui, "max velocity", &mut params.max_velocity, 0.1..=10.0, 0.05);
                tuning_slider_row(
                    ui,
                    "wheel spin scale",
                    &mut params.wheel_spin_scale,
                    1.0..=120.0,
                    0.5,
                );
            });

            ui.separator();
            ui.horizontal(|ui| {
                apply_clicked = ui.button("Apply").clicked();
                save_clicked = ui.button("Apply + Save").clicked();
                reset_clicked = ui.button("Reset from config").clicked();
            });
            if !status.is_empty() {
                ui.label(status);
            }
        });

    panel_state.visible = window_open;
    panel_state.params = Some(params.clone());

    if reset_clicked {
        panel_state.params = Some(TuningParams::from_config(&config));
        panel_state.status = "Reset to the active config.".to_string();
        return;
    }
    if !apply_clicked && !save_clicked {
        return;
    }

    let candidate = match params.applied_to(&config) {
        Ok(candidate) => candidate,
        Err(error) => {
            panel_state.status = format!("Rejected: {error}");
            return;
        }
    };

    if let Some(mut source) = source {
        if let Err(error) = source.apply_settings(candidate.terrain_settings()) {
            panel_state.status = format!("Rejected by terrain generator: {error}");
            return;
        }
    }
    *config = candidate;
    panel_state.status = "Applied to the running game.".to_string();

    if save_clicked {
        panel_state.status = match persist_tuning(&params) {
            Ok(message) => message,
            Err(error) => error,
        };
    }
}

fn tuning_slider_row(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut f32,
    slider_range: std::ops::RangeInclusive<f32>,
    drag_speed: f32,
) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(egui::Slider::new(value, slider_range).show_value(false));
        ui.add(egui::DragValue::new(value).speed(drag_speed as f64));
    });
}

fn tuning_count_row(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut u32,
    range: std::ops::RangeInclusive<u32>,
) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(egui::Slider::new(value, range));
    });
}

/// Writes the tuned values into `terrain.toml` and `vehicle.toml`, keeping everything else.
fn persist_tuning(params: &TuningParams) -> Result<String, String> {
    let config_dir = Path::new(CONFIG_DIR);
    let terrain_path = config_dir.join("terrain.toml");
    let vehicle_path = config_dir.join("vehicle.toml");

    let mut terrain_root = read_toml_value(&terrain_path)?;
    let section = toml_table_mut(&mut terrain_root, "terrain")?;
    set_toml_float(section, "start_terrain_height", params.start_terrain_height);
    set_toml_float(section, "amplitude", params.amplitude);
    section.insert(
        "slope_length".to_string(),
        toml::Value::Array(vec![
            toml::Value::Integer(i64::from(params.slope_length_min)),
            toml::Value::Integer(i64::from(params.slope_length_max)),
        ]),
    );
    section.insert(
        "slopes_per_mountain".to_string(),
        toml::Value::Integer(i64::from(params.slopes_per_mountain)),
    );
    set_toml_float(section, "simplify_tolerance", params.simplify_tolerance);

    let mut vehicle_root = read_toml_value(&vehicle_path)?;
    let section = toml_table_mut(&mut vehicle_root, "drive")?;
    set_toml_float(section, "accelerating", params.accelerating);
    set_toml_float(section, "decelerating", params.decelerating);
    set_toml_float(section, "coasting", params.coasting);
    set_toml_float(section, "max_velocity", params.max_velocity);
    set_toml_float(section, "wheel_spin_scale", params.wheel_spin_scale);

    write_toml_value(&terrain_path, &terrain_root)?;
    write_toml_value(&vehicle_path, &vehicle_root)?;
    Ok(format!("Applied and saved to {}.", config_dir.display()))
}

fn read_toml_value(path: &Path) -> Result<toml::Value, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("Failed reading `{}`: {error}", path.display()))?;
    toml::from_str(&raw).map_err(|error| format!("Failed parsing `{}`: {error}", path.display()))
}

fn write_toml_value(path: &Path, root: &toml::Value) -> Result<(), String> {
    let raw = toml::to_string_pretty(root)
        .map_err(|error| format!("Failed serializing `{}`: {error}", path.display()))?;
    fs::write(path, raw).map_err(|error| format!("Failed writing `{}`: {error}", path.display()))
}

fn toml_table_mut<'a>(
    root: &'a mut toml::Value,
    section: &str,
) -> Result<&'a mut toml::map::Map<String, toml::Value>, String> {
    root.get_mut(section)
        .and_then(toml::Value::as_table_mut)
        .ok_or_else(|| format!("Missing `[{section}]` table."))
}

fn set_toml_float(table: &mut toml::map::Map<String, toml::Value>, key: &str, value: f32) {
    let rounded = (f64::from(value) * 10_000.0).round() / 10_000.0;
    table.insert(key.to_string(), toml::Value::Float(rounded));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;

    #[test]
    fn overlay_flags_a_chassis_resting_on_the_ground() {
        let mut telemetry = VehicleTelemetry::default();
        assert_eq!(ground_contact_suffix(&telemetry), "");
        telemetry.touching_ground = true;
        assert_eq!(ground_contact_suffix(&telemetry), " (touching)");
    }

    #[test]
    fn params_round_trip_through_config() {
        let config = sample_config();
        let params = TuningParams::from_config(&config);
        let candidate = params.applied_to(&config).expect("unchanged params are valid");
        assert_eq!(TuningParams::from_config(&candidate), params);
    }

    #[test]
    fn invalid_params_leave_config_untouched() {
        let config = sample_config();
        let mut params = TuningParams::from_config(&config);
        params.slope_length_min = 400;
        params.slope_length_max = 100;

        let error = params.applied_to(&config).expect_err("inverted range");
        assert!(error.contains("slope_length"));
        assert_eq!(config.terrain.terrain.slope_length, [150, 250]);
    }

    #[test]
    fn drive_edits_reach_the_candidate() {
        let config = sample_config();
        let mut params = TuningParams::from_config(&config);
        params.max_velocity = 3.5;
        params.accelerating = 0.02;

        let candidate = params.applied_to(&config).expect("valid");
        assert_eq!(candidate.vehicle.drive.max_velocity, 3.5);
        assert_eq!(candidate.vehicle.drive.accelerating, 0.02);
    }

    #[test]
    fn float_keys_are_rounded_when_written() {
        let mut table = toml::map::Map::new();
        set_toml_float(&mut table, "amplitude", 100.123_456);
        assert_eq!(table.get("amplitude"), Some(&toml::Value::Float(100.1235)));
    }
}
