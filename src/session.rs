//! Session and mode state machine
//!
//! The session owns all mutable game state. The frame loop calls `update`
//! once per frame; UI events call the mode transitions directly.
//!
//! ```text
//! ChooseSave -> Playing <-> Shop
//!               Playing <-> Leaderboard
//!               Playing  -> GameOverPrompt -> Playing
//! ```

use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::economy::{self, Purchase, PurchaseError, ShopOffer, UpgradeId};
use crate::leaderboard::{LeaderboardClient, LeaderboardRequest, LeaderboardView};
use crate::persistence::{ProgressRecord, ProgressStore};
use crate::platform::{HostChannel, InboundMessage, KeyValueStore, LaunchParams, parse_inbound};
use crate::settings::{JumpTrigger, Settings};
use crate::sim::{GameEvent, LevelState, Player, TickInput, generate_level, tick};

/// Errors that stop a session from starting or reject a transition
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("user id is missing; restart the game from the chat")]
    MissingUserId,
    #[error("user id {0:?} is not a number")]
    InvalidUserId(String),
    #[error("cannot {action} from {from:?}")]
    InvalidTransition { from: ModeKind, action: &'static str },
}

/// Game keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Jump,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value
    pub fn from_dom_key(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" | "a" | "A" => Some(Key::Left),
            "ArrowRight" | "d" | "D" => Some(Key::Right),
            "ArrowUp" | " " | "w" | "W" => Some(Key::Jump),
            _ => None,
        }
    }
}

/// Key state collected between ticks
#[derive(Debug, Clone, Copy, Default)]
struct InputState {
    left: bool,
    right: bool,
    jump_held: bool,
    /// Jump went down since the last tick
    jump_pressed: bool,
}

impl InputState {
    fn key_down(&mut self, key: Key) {
        match key {
            Key::Left => self.left = true,
            Key::Right => self.right = true,
            Key::Jump => {
                if !self.jump_held {
                    self.jump_pressed = true;
                }
                self.jump_held = true;
            }
        }
    }

    fn key_up(&mut self, key: Key) {
        match key {
            Key::Left => self.left = false,
            Key::Right => self.right = false,
            Key::Jump => self.jump_held = false,
        }
    }

    /// Input for the next tick; clears the press latch
    fn take_tick_input(&mut self, trigger: JumpTrigger) -> TickInput {
        let jump = match trigger {
            JumpTrigger::Level => self.jump_held || self.jump_pressed,
            JumpTrigger::Edge => self.jump_pressed,
        };
        self.jump_pressed = false;
        TickInput {
            left: self.left,
            right: self.right,
            jump,
        }
    }
}

/// Which save to start from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveChoice {
    Resume,
    NewGame,
}

/// Current mode
#[derive(Debug)]
pub enum Mode {
    /// Waiting for resume / new game
    ChooseSave { local: Option<ProgressRecord> },
    Playing,
    Shop,
    Leaderboard {
        /// Outstanding request, if not yet resolved
        request: Option<LeaderboardRequest>,
        view: LeaderboardView,
    },
    /// hp hit zero; waiting for "restart level"
    GameOverPrompt,
}

/// Mode without payload, for display and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    ChooseSave,
    Playing,
    Shop,
    Leaderboard,
    GameOverPrompt,
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::ChooseSave { .. } => ModeKind::ChooseSave,
            Mode::Playing => ModeKind::Playing,
            Mode::Shop => ModeKind::Shop,
            Mode::Leaderboard { .. } => ModeKind::Leaderboard,
            Mode::GameOverPrompt => ModeKind::GameOverPrompt,
        }
    }
}

/// HUD numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hud {
    pub hp: u32,
    pub max_hp: u32,
    pub coins: u64,
    pub level: u32,
}

/// What the save chooser shows about the local save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveSummary {
    pub level: u32,
    pub coins: u64,
}

/// Read-only view handed to the renderer each frame
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub mode: ModeKind,
    pub hud: Hud,
    pub player: &'a Player,
    pub level: &'a LevelState,
    pub shop: Option<Vec<ShopOffer>>,
    pub leaderboard: Option<&'a LeaderboardView>,
    pub local_save: Option<SaveSummary>,
}

/// A running game for one user
pub struct Session {
    params: LaunchParams,
    settings: Settings,
    store: ProgressStore,
    leaderboard: LeaderboardClient,
    rng: Pcg32,
    mode: Mode,
    progress: ProgressRecord,
    player: Player,
    level: LevelState,
    input: InputState,
    /// HUD numbers changed since the renderer last asked
    hud_dirty: bool,
}

impl Session {
    /// Start a session in `ChooseSave`, looking up any local save
    pub fn new(
        params: LaunchParams,
        settings: Settings,
        storage: Box<dyn KeyValueStore>,
        host: Rc<dyn HostChannel>,
        seed: u64,
    ) -> Self {
        let store = ProgressStore::new(storage, host.clone(), params.user_id)
            .with_interval(settings.autosave_interval_ms);
        let leaderboard =
            LeaderboardClient::new(host).with_timeout(settings.leaderboard_timeout_ms);
        let local = store.load();
        let progress = ProgressRecord::new_game();

        log::info!(
            "Session started for user {} ({}), seed {}",
            params.user_id,
            params.display_name,
            seed
        );

        Self {
            params,
            settings,
            store,
            leaderboard,
            rng: Pcg32::seed_from_u64(seed),
            mode: Mode::ChooseSave { local },
            player: Player::from_upgrades(&progress.upgrades),
            progress,
            level: LevelState::empty(1),
            input: InputState::default(),
            hud_dirty: true,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn progress(&self) -> &ProgressRecord {
        &self.progress
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn level(&self) -> &LevelState {
        &self.level
    }

    pub fn params(&self) -> &LaunchParams {
        &self.params
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// True once after HUD values change
    pub fn take_hud_dirty(&mut self) -> bool {
        std::mem::take(&mut self.hud_dirty)
    }

    /// Leaderboard listeners still registered
    pub fn pending_leaderboard_requests(&self) -> usize {
        self.leaderboard.pending()
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            from: self.mode.kind(),
            action,
        }
    }

    /// Leave `ChooseSave`. A new game overwrites the local save.
    pub fn choose_save(&mut self, choice: SaveChoice, now_ms: f64) -> Result<(), SessionError> {
        let Mode::ChooseSave { local } = &self.mode else {
            return Err(self.invalid("choose a save"));
        };
        let local = *local;

        let (record, overwrite) = match (choice, local) {
            (SaveChoice::Resume, Some(record)) => (record, false),
            (SaveChoice::Resume, None) => {
                log::warn!("No local save to resume, starting a new game");
                (ProgressRecord::new_game(), true)
            }
            (SaveChoice::NewGame, _) => (ProgressRecord::new_game(), true),
        };

        self.progress = record;
        self.player = Player::from_upgrades(&record.upgrades);
        self.level = generate_level(record.level_reached, &mut self.rng);
        self.input = InputState::default();
        self.mode = Mode::Playing;
        self.hud_dirty = true;

        if overwrite {
            self.store.autosave(&self.progress, now_ms);
        }
        log::info!(
            "Playing level {} with {} coins",
            record.level_reached,
            record.currency
        );
        Ok(())
    }

    /// Switch how the jump key is sampled. Takes effect on the next tick.
    pub fn set_jump_trigger(&mut self, trigger: JumpTrigger) {
        if self.settings.jump_trigger != trigger {
            log::info!("Jump trigger set to {}", trigger.as_str());
            self.settings.jump_trigger = trigger;
            self.input.jump_pressed = false;
        }
    }

    pub fn key_down(&mut self, key: Key) {
        self.input.key_down(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.input.key_up(key);
    }

    /// Per-frame entry point. Ticks the simulation only while `Playing`.
    pub fn update(&mut self, now_ms: f64) -> Vec<GameEvent> {
        self.leaderboard.expire(now_ms);
        self.refresh_leaderboard_view();

        if !matches!(self.mode, Mode::Playing) {
            return Vec::new();
        }

        let input = self.input.take_tick_input(self.settings.jump_trigger);
        let events = tick(&mut self.player, &mut self.level, &input, &mut self.rng);

        let mut wants_save = false;
        for event in &events {
            match *event {
                GameEvent::CoinsCollected { count } => {
                    self.progress.currency += count as u64;
                    self.hud_dirty = true;
                    wants_save = true;
                }
                GameEvent::PlayerHit { .. } => self.hud_dirty = true,
                GameEvent::PlayerDefeated => {}
                GameEvent::LevelCompleted { level } => {
                    self.progress.level_reached = level;
                    self.hud_dirty = true;
                    wants_save = true;
                }
            }
        }
        if wants_save {
            self.store.autosave(&self.progress, now_ms);
        }

        if self.player.is_dead() {
            log::info!("Game over on level {}", self.level.level);
            self.input = InputState::default();
            self.mode = Mode::GameOverPrompt;
        }

        events
    }

    /// GameOverPrompt -> Playing, back at spawn with full hp
    pub fn restart_level(&mut self) -> Result<(), SessionError> {
        if !matches!(self.mode, Mode::GameOverPrompt) {
            return Err(self.invalid("restart the level"));
        }
        self.player.respawn();
        self.mode = Mode::Playing;
        self.hud_dirty = true;
        log::info!("Restarting level {}", self.level.level);
        Ok(())
    }

    pub fn open_shop(&mut self) -> Result<(), SessionError> {
        if !matches!(self.mode, Mode::Playing) {
            return Err(self.invalid("open the shop"));
        }
        self.input = InputState::default();
        self.mode = Mode::Shop;
        Ok(())
    }

    /// Current shop offers, recomputed every call
    pub fn shop_offers(&self) -> Vec<ShopOffer> {
        economy::shop_offers(&self.progress)
    }

    /// Buy an upgrade while the shop is open
    pub fn purchase(&mut self, id: UpgradeId, now_ms: f64) -> Result<Purchase, PurchaseError> {
        if !matches!(self.mode, Mode::Shop) {
            return Err(PurchaseError::ShopClosed);
        }

        let bought = economy::purchase(&mut self.progress, id)?;
        self.player.apply_upgrades(&self.progress.upgrades);
        if id == UpgradeId::Hp {
            self.player.hp = self.player.max_hp;
        }
        self.hud_dirty = true;
        self.store.autosave(&self.progress, now_ms);
        Ok(bought)
    }

    /// Playing -> Leaderboard, sending the host request
    pub fn open_leaderboard(&mut self, now_ms: f64) -> Result<(), SessionError> {
        if !matches!(self.mode, Mode::Playing) {
            return Err(self.invalid("open the leaderboard"));
        }
        let request = self.leaderboard.request(now_ms);
        self.input = InputState::default();
        self.mode = Mode::Leaderboard {
            request: Some(request),
            view: LeaderboardView::Loading,
        };
        // A failed send is already resolved
        self.refresh_leaderboard_view();
        Ok(())
    }

    /// Close whichever overlay is open
    pub fn close_overlay(&mut self) -> Result<(), SessionError> {
        match &self.mode {
            Mode::Shop => {}
            Mode::Leaderboard { request, .. } => {
                if let Some(request) = request {
                    self.leaderboard.cancel(request.id());
                }
            }
            _ => return Err(self.invalid("close an overlay")),
        }
        self.input = InputState::default();
        self.mode = Mode::Playing;
        Ok(())
    }

    /// Feed a raw inbound host message. Returns true if it was consumed.
    pub fn handle_host_message(&mut self, raw: &str) -> bool {
        let handled = match parse_inbound(raw) {
            Some(InboundMessage::LeaderboardResp { id, data }) => self
                .leaderboard
                .handle_response(id, data.unwrap_or_default()),
            None => false,
        };
        self.refresh_leaderboard_view();
        handled
    }

    /// Poll the outstanding request; the frame loop stands in for an executor
    fn refresh_leaderboard_view(&mut self) {
        if let Mode::Leaderboard { request, view } = &mut self.mode {
            let Some(pending) = request.as_mut() else {
                return;
            };
            let mut cx = Context::from_waker(Waker::noop());
            if let Poll::Ready(outcome) = Pin::new(pending).poll(&mut cx) {
                *view = LeaderboardView::from_outcome(outcome, self.params.user_id);
                *request = None;
            }
        }
    }

    pub fn hud(&self) -> Hud {
        Hud {
            hp: self.player.hp,
            max_hp: self.player.max_hp,
            coins: self.progress.currency,
            level: self.level.level,
        }
    }

    /// Read-only state for the renderer
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            mode: self.mode.kind(),
            hud: self.hud(),
            player: &self.player,
            level: &self.level,
            shop: matches!(self.mode, Mode::Shop).then(|| self.shop_offers()),
            leaderboard: match &self.mode {
                Mode::Leaderboard { view, .. } => Some(view),
                _ => None,
            },
            local_save: match &self.mode {
                Mode::ChooseSave { local } => local.as_ref().map(|r| SaveSummary {
                    level: r.level_reached,
                    coins: r.currency,
                }),
                _ => None,
            },
        }
    }
}
