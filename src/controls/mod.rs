use crate::gameplay::vehicle::DriveInput;
use crate::gameplay::FrameSet;
use crate::states::{ControlIcons, GameState};
use bevy::prelude::*;
#[cfg(target_arch = "wasm32")]
use bevy::window::PrimaryWindow;

const PEDAL_BUTTON_SIZE_PX: f32 = 96.0;
const PEDAL_IDLE_ALPHA: f32 = 0.0;
const PEDAL_ACTIVE_ALPHA: f32 = 0.22;
const CONTROLS_Z_INDEX: i32 = 260;

pub struct ControlsPlugin;

impl Plugin for ControlsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, configure_primary_window_for_web)
            .add_systems(OnEnter(GameState::InRun), spawn_pedal_controls)
            .add_systems(OnExit(GameState::InRun), cleanup_pedal_controls)
            .add_systems(
                Update,
                (read_pedal_buttons, update_pedal_highlight)
                    .chain()
                    .in_set(FrameSet::Input)
                    .run_if(in_state(GameState::InRun)),
            );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pedal {
    Gas,
    Brake,
}

impl Pedal {
    fn edge(self, held: bool) -> DriveInput {
        match (self, held) {
            (Pedal::Gas, true) => DriveInput::GasPressed,
            (Pedal::Gas, false) => DriveInput::GasReleased,
            (Pedal::Brake, true) => DriveInput::BrakePressed,
            (Pedal::Brake, false) => DriveInput::BrakeReleased,
        }
    }
}

#[derive(Component)]
struct PedalControlsRoot;

#[derive(Component, Debug, Clone, Copy)]
struct PedalButton {
    pedal: Pedal,
    held: bool,
}

impl PedalButton {
    /// Pointer-down and pointer-up become one message each; hover changes are ignored.
    fn observe(&mut self, interaction: Interaction) -> Option<DriveInput> {
        let pressed = interaction == Interaction::Pressed;
        if pressed == self.held {
            return None;
        }
        self.held = pressed;
        Some(self.pedal.edge(pressed))
    }
}

#[cfg(target_arch = "wasm32")]
fn configure_primary_window_for_web(mut window_query: Query<&mut Window, With<PrimaryWindow>>) {
    let Ok(mut window) = window_query.single_mut() else {
        return;
    };
    window.fit_canvas_to_parent = true;
    window.prevent_default_event_handling = true;
}

#[cfg(not(target_arch = "wasm32"))]
fn configure_primary_window_for_web() {}

fn spawn_pedal_controls(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    icons: Option<Res<ControlIcons>>,
    existing_query: Query<Entity, With<PedalControlsRoot>>,
) {
    if !existing_query.is_empty() {
        return;
    }

    let icon_for = |pedal: Pedal| {
        let icons = icons.as_ref()?;
        let handle = match pedal {
            Pedal::Gas => &icons.gas,
            Pedal::Brake => &icons.brake,
        };
        asset_server
            .is_loaded_with_dependencies(handle.id())
            .then(|| handle.clone())
    };
    let pedals = [
        (Pedal::Brake, "BRAKE", icon_for(Pedal::Brake)),
        (Pedal::Gas, "GAS", icon_for(Pedal::Gas)),
    ];

    commands
        .spawn((
            Name::new("PedalControlsRoot"),
            PedalControlsRoot,
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(0.0),
                right: Val::Px(0.0),
                bottom: Val::Px(0.0),
                padding: UiRect::all(Val::Px(14.0)),
                justify_content: JustifyContent::SpaceBetween,
                align_items: AlignItems::FlexEnd,
                ..default()
            },
            ZIndex(CONTROLS_Z_INDEX),
        ))
        .with_children(|parent| {
            for (pedal, label, icon) in pedals {
                let mut button = parent.spawn((
                    Name::new(format!("PedalButton{pedal:?}")),
                    PedalButton { pedal, held: false },
                    Button,
                    Node {
                        width: Val::Px(PEDAL_BUTTON_SIZE_PX),
                        height: Val::Px(PEDAL_BUTTON_SIZE_PX),
                        justify_content: JustifyContent::Center,
                        align_items: AlignItems::Center,
                        ..default()
                    },
                    BackgroundColor(Color::srgba(1.0, 1.0, 1.0, PEDAL_IDLE_ALPHA)),
                ));
                match icon {
                    Some(image) => {
                        button.insert(ImageNode::new(image));
                    }
                    None => {
                        button.with_children(|button| {
                            button.spawn((
                                Text::new(label),
                                TextFont {
                                    font_size: 22.0,
                                    ..default()
                                },
                                TextColor(Color::srgba(0.10, 0.10, 0.12, 0.85)),
                            ));
                        });
                    }
                }
            }
        });
}

fn cleanup_pedal_controls(
    mut commands: Commands,
    root_query: Query<Entity, With<PedalControlsRoot>>,
) {
    for entity in &root_query {
        commands.entity(entity).try_despawn();
    }
}

fn read_pedal_buttons(
    mut buttons: Query<(&Interaction, &mut PedalButton), Changed<Interaction>>,
    mut drive_inputs: MessageWriter<DriveInput>,
) {
    for (interaction, mut button) in &mut buttons {
        if let Some(input) = button.observe(*interaction) {
            drive_inputs.write(input);
        }
    }
}

fn update_pedal_highlight(
    mut buttons: Query<(&PedalButton, &mut BackgroundColor), Changed<PedalButton>>,
) {
    for (button, mut background) in &mut buttons {
        let alpha = if button.held {
            PEDAL_ACTIVE_ALPHA
        } else {
            PEDAL_IDLE_ALPHA
        };
        background.0 = Color::srgba(1.0, 1.0, 1.0, alpha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_emit_one_message_each() {
        let mut gas = PedalButton {
            pedal: Pedal::Gas,
            held: false,
        };

        assert_eq!(gas.observe(Interaction::Hovered), None);
        assert_eq!(gas.observe(Interaction::Pressed), Some(DriveInput::GasPressed));
        assert_eq!(gas.observe(Interaction::Pressed), None);
        assert_eq!(gas.observe(Interaction::Hovered), Some(DriveInput::GasReleased));
        assert_eq!(gas.observe(Interaction::None), None);
    }

    #[test]
    fn dragging_off_the_brake_releases_it() {
        let mut brake = PedalButton {
            pedal: Pedal::Brake,
            held: false,
        };

        assert_eq!(
            brake.observe(Interaction::Pressed),
            Some(DriveInput::BrakePressed)
        );
        assert_eq!(
            brake.observe(Interaction::None),
            Some(DriveInput::BrakeReleased)
        );
    }

    #[test]
    fn button_interaction_writes_drive_messages() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_message::<DriveInput>()
            .add_systems(Update, read_pedal_buttons);

        let button = app
            .world_mut()
            .spawn((
                Interaction::None,
                PedalButton {
                    pedal: Pedal::Gas,
                    held: false,
                },
            ))
            .id();
        app.update();

        app.world_mut()
            .entity_mut(button)
            .insert(Interaction::Pressed);
        app.update();

        let messages = app.world().resource::<Messages<DriveInput>>();
        let mut cursor = messages.get_cursor();
        let written: Vec<DriveInput> = cursor.read(messages).copied().collect();
        assert_eq!(written, vec![DriveInput::GasPressed]);
    }
}
