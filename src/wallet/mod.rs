use crate::config::{GameConfig, WalletConfig};
use crate::states::GameState;
use bevy::prelude::*;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

const WALLET_BUTTON_Z_INDEX: i32 = 270;
const CONNECT_LABEL: &str = "Connect Wallet";

pub struct WalletPlugin;

impl Plugin for WalletPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<WalletChanged>()
            .insert_resource(WalletSession::new(UnavailableWalletConnector))
            .add_systems(OnEnter(GameState::InRun), spawn_wallet_button)
            .add_systems(OnExit(GameState::InRun), cleanup_wallet_button)
            .add_systems(
                Update,
                (
                    handle_wallet_button,
                    poll_wallet_changes,
                    log_wallet_changes,
                    update_wallet_button_label,
                )
                    .chain()
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}

/// The connected account as reported by the wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletAccount {
    pub address: String,
    pub chain: String,
}

/// Emitted whenever the provider reports a connect or a disconnect.
#[derive(Message, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletChanged {
    pub wallet: Option<WalletAccount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    Unavailable { network: String },
    Rejected(String),
}

impl Display for WalletError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable { network } => {
                write!(f, "no wallet provider is available for network `{network}`")
            }
            Self::Rejected(reason) => write!(f, "wallet request rejected: {reason}"),
        }
    }
}

impl Error for WalletError {}

/// Capability surface of a wallet-connection provider.
pub trait WalletConnector: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Starts a connection; the result arrives later through `poll_change`.
    fn connect(&mut self, config: &WalletConfig) -> Result<(), WalletError>;

    fn disconnect(&mut self) -> Result<(), WalletError>;

    /// `Some(change)` once per provider-side wallet change.
    fn poll_change(&mut self) -> Option<Option<WalletAccount>>;
}

/// Used on builds that ship no wallet provider.
#[derive(Debug, Default)]
pub struct UnavailableWalletConnector;

impl WalletConnector for UnavailableWalletConnector {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn connect(&mut self, config: &WalletConfig) -> Result<(), WalletError> {
        Err(WalletError::Unavailable {
            network: config.network.clone(),
        })
    }

    fn disconnect(&mut self) -> Result<(), WalletError> {
        Ok(())
    }

    fn poll_change(&mut self) -> Option<Option<WalletAccount>> {
        None
    }
}

#[derive(Resource)]
pub struct WalletSession {
    connector: Box<dyn WalletConnector>,
    current: Option<WalletAccount>,
}

impl WalletSession {
    pub fn new(connector: impl WalletConnector) -> Self {
        Self {
            connector: Box::new(connector),
            current: None,
        }
    }

    pub fn current(&self) -> Option<&WalletAccount> {
        self.current.as_ref()
    }

    pub fn connector_name(&self) -> &str {
        self.connector.name()
    }

    /// Connects when no wallet is attached, disconnects otherwise.
    pub fn toggle(&mut self, config: &WalletConfig) -> Result<(), WalletError> {
        if self.current.is_some() {
            self.connector.disconnect()
        } else {
            self.connector.connect(config)
        }
    }

    /// Drains provider changes, keeping the latest as the current wallet.
    pub fn drain_changes(&mut self) -> Vec<WalletChanged> {
        let mut changes = Vec::new();
        while let Some(wallet) = self.connector.poll_change() {
            self.current.clone_from(&wallet);
            changes.push(WalletChanged { wallet });
        }
        changes
    }
}

fn button_label(current: Option<&WalletAccount>) -> String {
    match current {
        Some(account) => {
            let prefix: String = account.address.chars().take(6).collect();
            format!("Disconnect {prefix}...")
        }
        None => CONNECT_LABEL.to_string(),
    }
}

#[derive(Component)]
struct WalletButton;

#[derive(Component)]
struct WalletButtonLabel;

fn spawn_wallet_button(
    mut commands: Commands,
    config: Res<GameConfig>,
    session: Res<WalletSession>,
    existing_query: Query<Entity, With<WalletButton>>,
) {
    if !config.wallet.wallet.enabled || !existing_query.is_empty() {
        return;
    }

    commands
        .spawn((
            Name::new("WalletConnectButton"),
            WalletButton,
            Button,
            Node {
                position_type: PositionType::Absolute,
                right: Val::Px(16.0),
                top: Val::Px(16.0),
                padding: UiRect::axes(Val::Px(14.0), Val::Px(8.0)),
                border: UiRect::all(Val::Px(1.0)),
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.53, 0.80, 0.92)),
            BorderColor::all(Color::srgba(0.85, 0.94, 1.0, 0.9)),
            ZIndex(WALLET_BUTTON_Z_INDEX),
        ))
        .with_children(|button| {
            button.spawn((
                WalletButtonLabel,
                Text::new(button_label(session.current())),
                TextFont {
                    font_size: 18.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));
        });
}

fn cleanup_wallet_button(mut commands: Commands, button_query: Query<Entity, With<WalletButton>>) {
    for entity in &button_query {
        commands.entity(entity).try_despawn();
    }
}

fn handle_wallet_button(
    config: Res<GameConfig>,
    mut session: ResMut<WalletSession>,
    button_query: Query<&Interaction, (Changed<Interaction>, With<WalletButton>)>,
) {
    for interaction in &button_query {
        if *interaction != Interaction::Pressed {
            continue;
        }
        if let Err(error) = session.toggle(&config.wallet.wallet) {
            warn!(
                "Wallet connector `{}` failed: {error}",
                session.connector_name()
            );
        }
    }
}

fn poll_wallet_changes(
    mut session: ResMut<WalletSession>,
    mut wallet_changes: MessageWriter<WalletChanged>,
) {
    let changes = session.bypass_change_detection().drain_changes();
    if changes.is_empty() {
        return;
    }
    session.set_changed();
    for change in changes {
        wallet_changes.write(change);
    }
}

fn log_wallet_changes(mut wallet_changes: MessageReader<WalletChanged>) {
    for change in wallet_changes.read() {
        match serde_json::to_string(change) {
            Ok(json) => info!("Wallet changed: {json}"),
            Err(error) => warn!("Wallet change could not be serialized: {error}"),
        }
    }
}

fn update_wallet_button_label(
    session: Res<WalletSession>,
    mut label_query: Query<&mut Text, With<WalletButtonLabel>>,
) {
    if !session.is_changed() {
        return;
    }
    let label = button_label(session.current());
    for mut text in &mut label_query {
        text.0.clone_from(&label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct ScriptedConnector {
        pending: Arc<Mutex<VecDeque<Option<WalletAccount>>>>,
        connects: Arc<Mutex<u32>>,
    }

    impl WalletConnector for ScriptedConnector {
        fn name(&self) -> &str {
            "scripted"
        }

        fn connect(&mut self, _config: &WalletConfig) -> Result<(), WalletError> {
            *self.connects.lock().expect("lock") += 1;
            self.pending.lock().expect("lock").push_back(Some(account()));
            Ok(())
        }

        fn disconnect(&mut self) -> Result<(), WalletError> {
            self.pending.lock().expect("lock").push_back(None);
            Ok(())
        }

        fn poll_change(&mut self) -> Option<Option<WalletAccount>> {
            self.pending.lock().expect("lock").pop_front()
        }
    }

    fn account() -> WalletAccount {
        WalletAccount {
            address: "EQBvW8Z5huBkMJYdnfAEM5JqTNkuWX3diqYENkWsIL0XggGG".to_string(),
            chain: "-239".to_string(),
        }
    }

    #[test]
    fn unavailable_connector_reports_the_network() {
        let config = sample_config();
        let mut session = WalletSession::new(UnavailableWalletConnector);

        let error = session
            .toggle(&config.wallet.wallet)
            .expect_err("no provider");
        assert_eq!(error.to_string(), "no wallet provider is available for network `mainnet`");
        assert!(session.drain_changes().is_empty());
        assert!(session.current().is_none());
    }

    #[test]
    fn toggle_connects_then_disconnects() {
        let config = sample_config();
        let connector = ScriptedConnector::default();
        let connects = Arc::clone(&connector.connects);
        let mut session = WalletSession::new(connector);

        session.toggle(&config.wallet.wallet).expect("connect");
        let changes = session.drain_changes();
        assert_eq!(changes, vec![WalletChanged { wallet: Some(account()) }]);
        assert_eq!(session.current(), Some(&account()));

        session.toggle(&config.wallet.wallet).expect("disconnect");
        assert_eq!(session.drain_changes(), vec![WalletChanged { wallet: None }]);
        assert!(session.current().is_none());
        assert_eq!(*connects.lock().expect("lock"), 1);
    }

    #[test]
    fn wallet_change_serializes_to_json() {
        let json = serde_json::to_string(&WalletChanged {
            wallet: Some(account()),
        })
        .expect("serialize");
        assert!(json.starts_with("{\"wallet\":{\"address\":\"EQBvW8"));
        assert!(json.contains("\"chain\":\"-239\""));

        let json = serde_json::to_string(&WalletChanged { wallet: None }).expect("serialize");
        assert_eq!(json, "{\"wallet\":null}");
    }

    #[test]
    fn button_label_shortens_the_address() {
        assert_eq!(button_label(None), "Connect Wallet");
        assert_eq!(button_label(Some(&account())), "Disconnect EQBvW8...");
    }

    #[test]
    fn polled_changes_become_messages() {
        let connector = ScriptedConnector::default();
        connector
            .pending
            .lock()
            .expect("lock")
            .push_back(Some(account()));

        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_message::<WalletChanged>()
            .insert_resource(WalletSession::new(connector))
            .add_systems(Update, poll_wallet_changes);
        app.update();

        let messages = app.world().resource::<Messages<WalletChanged>>();
        let mut cursor = messages.get_cursor();
        let written: Vec<WalletChanged> = cursor.read(messages).cloned().collect();
        assert_eq!(written, vec![WalletChanged { wallet: Some(account()) }]);
        assert_eq!(
            app.world().resource::<WalletSession>().current(),
            Some(&account())
        );
    }

    #[test]
    fn button_label_is_rewritten_only_when_the_wallet_changes() {
        let connector = ScriptedConnector::default();
        let pending = Arc::clone(&connector.pending);

        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_message::<WalletChanged>()
            .insert_resource(WalletSession::new(connector))
            .add_systems(Update, (poll_wallet_changes, update_wallet_button_label).chain());
        let label = app
            .world_mut()
            .spawn((WalletButtonLabel, Text::new(String::new())))
            .id();
        let text_of = |app: &App| app.world().get::<Text>(label).map(|text| text.0.clone());

        app.update();
        assert_eq!(text_of(&app).as_deref(), Some(CONNECT_LABEL));

        app.world_mut()
            .get_mut::<Text>(label)
            .expect("label")
            .0 = "untouched".to_string();
        app.update();
        app.update();
        assert_eq!(text_of(&app).as_deref(), Some("untouched"));

        pending.lock().expect("lock").push_back(Some(account()));
        app.update();
        assert_eq!(text_of(&app).as_deref(), Some("Disconnect EQBvW8..."));
    }
}
