use crate::config::GameConfig;
use crate::gameplay::vehicle::VehicleTelemetry;
use crate::gameplay::FrameSet;
use crate::states::GameState;
use bevy::prelude::*;

const HUD_Z_INDEX: i32 = 190;
const HUD_MARGIN_PX: f32 = 16.0;

pub struct GameHudPlugin;

impl Plugin for GameHudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::InRun), spawn_game_hud)
            .add_systems(OnExit(GameState::InRun), cleanup_game_hud)
            .add_systems(
                Update,
                update_score_text
                    .in_set(FrameSet::Present)
                    .run_if(in_state(GameState::InRun)),
            );
    }
}

#[derive(Component)]
struct GameHudRoot;

#[derive(Component)]
struct ScoreText;

fn score_label(score: i64) -> String {
    format!("Score: {score}")
}

fn spawn_game_hud(
    mut commands: Commands,
    config: Res<GameConfig>,
    existing_hud: Query<Entity, With<GameHudRoot>>,
) {
    if !existing_hud.is_empty() {
        return;
    }

    let hud = &config.game.hud;
    let [red, green, blue] = hud.score_rgb;

    commands
        .spawn((
            Name::new("GameHudRoot"),
            GameHudRoot,
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(HUD_MARGIN_PX),
                top: Val::Px(HUD_MARGIN_PX),
                ..default()
            },
            ZIndex(HUD_Z_INDEX),
        ))
        .with_children(|root| {
            root.spawn((
                Name::new("ScoreText"),
                ScoreText,
                Text::new(score_label(0)),
                TextFont {
                    font_size: hud.score_font_size,
                    ..default()
                },
                TextColor(Color::srgb(red, green, blue)),
            ));
        });
}

fn cleanup_game_hud(mut commands: Commands, hud_query: Query<Entity, With<GameHudRoot>>) {
    for entity in &hud_query {
        commands.entity(entity).try_despawn();
    }
}

fn update_score_text(
    telemetry: Res<VehicleTelemetry>,
    mut score_query: Query<&mut Text, With<ScoreText>>,
) {
    let label = score_label(telemetry.score());
    for mut text in &mut score_query {
        if text.0 != label {
            text.0.clone_from(&label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_label_matches_hud_format() {
        assert_eq!(score_label(0), "Score: 0");
        assert_eq!(score_label(1234), "Score: 1234");
        assert_eq!(score_label(-3), "Score: -3");
    }

    #[test]
    fn score_text_tracks_rounded_chassis_position() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(VehicleTelemetry {
                chassis_x: 159.6,
                ..VehicleTelemetry::default()
            })
            .add_systems(Update, update_score_text);
        let text = app
            .world_mut()
            .spawn((ScoreText, Text::new(score_label(0))))
            .id();

        app.update();

        let label = app.world().get::<Text>(text).map(|text| text.0.clone());
        assert_eq!(label.as_deref(), Some("Score: 160"));
    }
}
