use crate::gameplay::terrain::TerrainSettings;
use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = "config";

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Startup,
            announce_loaded_config.run_if(resource_exists::<GameConfig>),
        )
        .add_systems(
            Update,
            (reload_game_config_hotkey, sync_fixed_timestep_from_config)
                .chain()
                .run_if(resource_exists::<GameConfig>),
        );
    }
}

/// Reads `config/` before the app is built; the window and physics scale depend on it.
pub fn load_startup_config() -> GameConfig {
    GameConfig::load_from_dir(Path::new(CONFIG_DIR)).unwrap_or_else(|error| {
        panic!("failed to load configuration from `{CONFIG_DIR}`: {error}");
    })
}

fn announce_loaded_config(config: Res<GameConfig>) {
    log_config_summary("Loaded", &config);
    info!("Press F5 to hot-reload config files from `{CONFIG_DIR}`.");
}

fn reload_game_config_hotkey(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut current_config: ResMut<GameConfig>,
    mut clear_color: ResMut<ClearColor>,
) {
    if !keyboard.just_pressed(KeyCode::F5) {
        return;
    }

    match GameConfig::load_from_dir(Path::new(CONFIG_DIR)) {
        Ok(new_config) => {
            *current_config = new_config;
            clear_color.0 = current_config.game.app.background_color();
            log_config_summary("Hot-reloaded", &current_config);
        }
        Err(error) => {
            error!("Config hot-reload failed; keeping previous config: {error}");
        }
    }
}

fn sync_fixed_timestep_from_config(config: Res<GameConfig>, mut fixed_time: ResMut<Time<Fixed>>) {
    if !config.is_changed() {
        return;
    }
    fixed_time.set_timestep_hz(f64::from(config.game.app.fixed_timestep_hz));
}

fn log_config_summary(prefix: &str, config: &GameConfig) {
    let terrain = &config.terrain.terrain;
    info!(
        "{prefix} config: {} mountains x {} slopes, slope length {}..={}, amplitude {}, wallet {}.",
        terrain.mountains_amount,
        terrain.slopes_per_mountain,
        terrain.slope_length[0],
        terrain.slope_length[1],
        terrain.amplitude,
        if config.wallet.wallet.enabled {
            config.wallet.wallet.network.as_str()
        } else {
            "disabled"
        }
    );
}

#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    pub game: GameFile,
    pub terrain: TerrainFile,
    pub vehicle: VehicleFile,
    pub wallet: WalletFile,
}

impl GameConfig {
    pub fn load_from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let config = Self {
            game: read_toml(&config_dir.join("game.toml"))?,
            terrain: read_toml(&config_dir.join("terrain.toml"))?,
            vehicle: read_toml(&config_dir.join("vehicle.toml"))?,
            wallet: read_toml(&config_dir.join("wallet.toml"))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Generator inputs derived from `terrain.toml` and the logical viewport.
    pub fn terrain_settings(&self) -> TerrainSettings {
        let terrain = &self.terrain.terrain;
        TerrainSettings {
            viewport_height: self.game.app.viewport_height,
            start_terrain_height: terrain.start_terrain_height,
            amplitude: terrain.amplitude,
            slope_length_min: terrain.slope_length[0],
            slope_length_max: terrain.slope_length[1],
            slopes_per_mountain: terrain.slopes_per_mountain,
            simplify_tolerance: terrain.simplify_tolerance,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let app = &self.game.app;
        if app.viewport_width <= 0.0 || app.viewport_height <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::app viewport_width and viewport_height must be > 0".to_string(),
            ));
        }
        if app.fixed_timestep_hz <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::app.fixed_timestep_hz must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.game.camera.follow_fraction) {
            return Err(ConfigError::Validation(
                "game.toml::camera.follow_fraction must be in [0, 1]".to_string(),
            ));
        }
        if self.game.physics.pixels_per_meter <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::physics.pixels_per_meter must be > 0".to_string(),
            ));
        }

        let terrain = &self.terrain.terrain;
        let [slope_min, slope_max] = terrain.slope_length;
        if slope_min == 0 {
            return Err(ConfigError::Validation(
                "terrain.toml::terrain.slope_length minimum must be >= 1".to_string(),
            ));
        }
        if slope_min > slope_max {
            return Err(ConfigError::Validation(format!(
                "terrain.toml::terrain.slope_length range is invalid ({slope_min} > {slope_max})"
            )));
        }
        if terrain.slopes_per_mountain == 0 {
            return Err(ConfigError::Validation(
                "terrain.toml::terrain.slopes_per_mountain must be >= 1".to_string(),
            ));
        }
        if terrain.mountains_amount == 0 {
            return Err(ConfigError::Validation(
                "terrain.toml::terrain.mountains_amount must be >= 1".to_string(),
            ));
        }
        if terrain.simplify_tolerance <= 0.0 {
            return Err(ConfigError::Validation(
                "terrain.toml::terrain.simplify_tolerance must be > 0".to_string(),
            ));
        }
        if terrain.amplitude < 0.0 {
            return Err(ConfigError::Validation(
                "terrain.toml::terrain.amplitude must be >= 0".to_string(),
            ));
        }

        let recycling = &self.terrain.recycling;
        if recycling.mountain_margin < 0.0 || recycling.body_margin < 0.0 {
            return Err(ConfigError::Validation(
                "terrain.toml::recycling margins must be >= 0".to_string(),
            ));
        }
        if recycling.segment_thickness <= 0.0 {
            return Err(ConfigError::Validation(
                "terrain.toml::recycling.segment_thickness must be > 0".to_string(),
            ));
        }

        let vehicle = &self.vehicle.vehicle;
        if vehicle.chassis_size[0] <= 0.0 || vehicle.chassis_size[1] <= 0.0 {
            return Err(ConfigError::Validation(
                "vehicle.toml::vehicle.chassis_size must be > 0 on both axes".to_string(),
            ));
        }
        if vehicle.wheel_radius <= 0.0 {
            return Err(ConfigError::Validation(
                "vehicle.toml::vehicle.wheel_radius must be > 0".to_string(),
            ));
        }
        if vehicle.constraint_length < 0.0 {
            return Err(ConfigError::Validation(
                "vehicle.toml::vehicle.constraint_length must be >= 0".to_string(),
            ));
        }
        if vehicle.constraint_stiffness <= 0.0 || vehicle.constraint_damping < 0.0 {
            return Err(ConfigError::Validation(
                "vehicle.toml::vehicle constraint stiffness must be > 0 and damping >= 0"
                    .to_string(),
            ));
        }

        if vehicle.front_anchors.is_empty() || vehicle.rear_anchors.is_empty() {
            return Err(ConfigError::Validation(
                "vehicle.toml::vehicle front_anchors and rear_anchors need at least one entry"
                    .to_string(),
            ));
        }

        let drive = &self.vehicle.drive;
        if drive.accelerating <= 0.0 {
            return Err(ConfigError::Validation(
                "vehicle.toml::drive.accelerating must be > 0".to_string(),
            ));
        }
        if drive.decelerating >= 0.0 || drive.coasting > 0.0 {
            return Err(ConfigError::Validation(
                "vehicle.toml::drive.decelerating must be < 0 and coasting <= 0".to_string(),
            ));
        }
        if drive.max_velocity <= 0.0 {
            return Err(ConfigError::Validation(
                "vehicle.toml::drive.max_velocity must be > 0".to_string(),
            ));
        }
        if drive.wheel_spin_scale <= 0.0 {
            return Err(ConfigError::Validation(
                "vehicle.toml::drive.wheel_spin_scale must be > 0".to_string(),
            ));
        }

        let wallet = &self.wallet.wallet;
        if !matches!(wallet.network.as_str(), "mainnet" | "testnet") {
            return Err(ConfigError::Validation(format!(
                "wallet.toml::wallet.network `{}` is unsupported (expected mainnet/testnet)",
                wallet.network
            )));
        }
        if wallet.enabled && wallet.manifest_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "wallet.toml::wallet.manifest_url cannot be empty when the wallet is enabled"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameFile {
    pub app: AppConfig,
    pub camera: CameraConfig,
    pub physics: PhysicsConfig,
    pub hud: HudConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub title: String,
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub fixed_timestep_hz: f32,
    pub background_rgb: [f32; 3],
    pub debug_overlay: bool,
    #[serde(default)]
    pub physics_debug_render: bool,
}

impl AppConfig {
    pub fn background_color(&self) -> Color {
        let [r, g, b] = self.background_rgb;
        Color::srgb(r, g, b)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    /// Horizontal screen fraction kept between the left edge and the chassis.
    pub follow_fraction: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub pixels_per_meter: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HudConfig {
    pub score_font_size: f32,
    pub score_rgb: [f32; 3],
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerrainFile {
    pub terrain: TerrainConfig,
    pub recycling: RecyclingConfig,
    pub style: TerrainStyleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerrainConfig {
    pub start_terrain_height: f32,
    pub amplitude: f32,
    pub slope_length: [u32; 2],
    pub mountains_amount: u32,
    pub slopes_per_mountain: u32,
    #[serde(default = "default_simplify_tolerance")]
    pub simplify_tolerance: f32,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_simplify_tolerance() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecyclingConfig {
    pub mountain_margin: f32,
    pub body_margin: f32,
    pub segment_thickness: f32,
    #[serde(default = "default_segment_friction")]
    pub segment_friction: f32,
}

fn default_segment_friction() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerrainStyleConfig {
    pub ground_rgb: [f32; 3],
    pub grass_rgb: [f32; 3],
    pub grass_width: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleFile {
    pub vehicle: VehicleConfig,
    pub drive: DriveConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleConfig {
    pub chassis_size: [f32; 2],
    pub wheel_radius: f32,
    /// Wheel centers relative to the chassis, screen axes (y grows downwards).
    pub wheel_offset: [f32; 2],
    pub front_anchors: Vec<[f32; 2]>,
    pub rear_anchors: Vec<[f32; 2]>,
    pub constraint_length: f32,
    pub constraint_stiffness: f32,
    pub constraint_damping: f32,
    #[serde(default = "default_body_friction")]
    pub friction: f32,
    #[serde(default)]
    pub restitution: f32,
}

fn default_body_friction() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    pub accelerating: f32,
    pub decelerating: f32,
    pub coasting: f32,
    pub max_velocity: f32,
    /// Wheel angular speed in rad/s per unit of drive velocity.
    pub wheel_spin_scale: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletFile {
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub enabled: bool,
    pub network: String,
    pub manifest_url: String,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_config() -> GameConfig {
        GameConfig {
            game: GameFile {
                app: AppConfig {
                    title: "Hill Drive".to_string(),
                    viewport_width: 1280.0,
                    viewport_height: 720.0,
                    fixed_timestep_hz: 60.0,
                    background_rgb: [0.459, 0.835, 0.890],
                    debug_overlay: false,
                    physics_debug_render: false,
                },
                camera: CameraConfig {
                    follow_fraction: 0.125,
                },
                physics: PhysicsConfig {
                    gravity: 980.0,
                    pixels_per_meter: 50.0,
                },
                hud: HudConfig {
                    score_font_size: 24.0,
                    score_rgb: [0.0, 1.0, 0.0],
                },
            },
            terrain: TerrainFile {
                terrain: TerrainConfig {
                    start_terrain_height: 0.6,
                    amplitude: 100.0,
                    slope_length: [150, 250],
                    mountains_amount: 2,
                    slopes_per_mountain: 10,
                    simplify_tolerance: 1.0,
                    seed: Some(7),
                },
                recycling: RecyclingConfig {
                    mountain_margin: 100.0,
                    body_margin: 200.0,
                    segment_thickness: 10.0,
                    segment_friction: 1.0,
                },
                style: TerrainStyleConfig {
                    ground_rgb: [0.396, 0.294, 0.208],
                    grass_rgb: [0.420, 0.608, 0.118],
                    grass_width: 15.0,
                },
            },
            vehicle: VehicleFile {
                vehicle: VehicleConfig {
                    chassis_size: [100.0, 10.0],
                    wheel_radius: 15.0,
                    wheel_offset: [25.0, 25.0],
                    front_anchors: vec![[25.0, 10.0], [40.0, 10.0]],
                    rear_anchors: vec![[-25.0, 10.0], [-40.0, 10.0]],
                    constraint_length: 20.0,
                    constraint_stiffness: 4000.0,
                    constraint_damping: 40.0,
                    friction: 1.0,
                    restitution: 0.0,
                },
                drive: DriveConfig {
                    accelerating: 0.01,
                    decelerating: -0.1,
                    coasting: -0.005,
                    max_velocity: 2.0,
                    wheel_spin_scale: 30.0,
                },
            },
            wallet: WalletFile {
                wallet: WalletConfig {
                    enabled: true,
                    network: "mainnet".to_string(),
                    manifest_url: "https://example.invalid/tonconnect-manifest.json".to_string(),
                },
            },
        }
    }

    #[test]
    fn sample_config_is_valid() {
        sample_config().validate().expect("sample config should validate");
    }

    #[test]
    fn shipped_config_directory_loads() {
        let config = GameConfig::load_from_dir(Path::new(CONFIG_DIR))
            .expect("config/ should load and validate");
        assert_eq!(config.terrain.terrain.slope_length, [150, 250]);
        assert_eq!(config.terrain.terrain.slopes_per_mountain, 10);
    }

    #[test]
    fn validation_rejects_inverted_slope_range() {
        let mut config = sample_config();
        config.terrain.terrain.slope_length = [300, 250];

        let message = config
            .validate()
            .expect_err("validation should fail")
            .to_string();
        assert!(message.contains("slope_length"));
        assert!(message.contains("300 > 250"));
    }

    #[test]
    fn validation_rejects_zero_slopes_and_zero_length() {
        let mut config = sample_config();
        config.terrain.terrain.slopes_per_mountain = 0;
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.terrain.terrain.slope_length = [0, 10];
        let message = config.validate().expect_err("zero length").to_string();
        assert!(message.contains(">= 1"));
    }

    #[test]
    fn validation_rejects_unknown_wallet_network() {
        let mut config = sample_config();
        config.wallet.wallet.network = "devnet".to_string();

        let message = config.validate().expect_err("bad network").to_string();
        assert!(message.contains("devnet"));
    }

    #[test]
    fn validation_rejects_positive_brake_constant() {
        let mut config = sample_config();
        config.vehicle.drive.decelerating = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_reports_io_error_with_path() {
        let error = GameConfig::load_from_dir(Path::new("does-not-exist"))
            .expect_err("missing directory should fail");
        assert!(matches!(error, ConfigError::Io { .. }));
        assert!(error.to_string().contains("game.toml"));
    }
}
