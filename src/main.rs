//! Coin Dash entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Element, KeyboardEvent, MessageEvent, MouseEvent};

    use coin_dash::platform::LaunchParams;
    use coin_dash::platform::host::telegram::{self, TelegramChannel};
    use coin_dash::platform::storage::LocalStorage;
    use coin_dash::session::{Key, SaveChoice};
    use coin_dash::{JumpTrigger, Session, Settings, UpgradeId};

    // The page owns drawing; we hand it a JSON snapshot every frame
    #[wasm_bindgen(inline_js = "
        export function render_snapshot(json) {
            if (typeof window.coinDashRender === 'function') {
                window.coinDashRender(JSON.parse(json));
            }
        }

        export function show_fatal(message) {
            const el = document.getElementById('game-container');
            if (el) {
                el.textContent = message;
            }
        }
    ")]
    extern "C" {
        fn render_snapshot(json: &str);
        fn show_fatal(message: &str);
    }

    /// Game instance holding the session
    struct Game {
        session: Session,
        /// Handle for writing settings
        storage: LocalStorage,
    }

    impl Game {
        fn update(&mut self) {
            let now = js_sys::Date::now();
            self.session.update(now);
        }

        fn render(&mut self) {
            match serde_json::to_string(&self.session.snapshot()) {
                Ok(json) => render_snapshot(&json),
                Err(e) => log::warn!("Snapshot encode failed: {}", e),
            }
            if self.session.take_hud_dirty() {
                let hud = self.session.hud();
                log::debug!(
                    "HUD: hp {}/{}, coins {}, level {}",
                    hud.hp,
                    hud.max_hp,
                    hud.coins,
                    hud.level
                );
            }
        }

        /// Button actions from `data-action` attributes
        fn handle_action(&mut self, action: &str, target: &Element) {
            let now = js_sys::Date::now();
            let result = match action {
                "resume" => self.session.choose_save(SaveChoice::Resume, now),
                "new_game" => self.session.choose_save(SaveChoice::NewGame, now),
                "shop" => self.session.open_shop(),
                "leaderboard" => self.session.open_leaderboard(now),
                "close" => self.session.close_overlay(),
                "restart" => self.session.restart_level(),
                "buy" => {
                    let id = target
                        .get_attribute("data-upgrade")
                        .and_then(|id| UpgradeId::from_str(&id));
                    if let Some(id) = id {
                        if let Err(e) = self.session.purchase(id, now) {
                            log::info!("Purchase refused: {}", e);
                        }
                    }
                    Ok(())
                }
                "jump_trigger" => {
                    let trigger = target
                        .get_attribute("data-value")
                        .and_then(|value| JumpTrigger::from_str(&value));
                    if let Some(trigger) = trigger {
                        self.set_jump_trigger(trigger);
                    }
                    Ok(())
                }
                other => {
                    log::debug!("Unknown action {}", other);
                    Ok(())
                }
            };
            if let Err(e) = result {
                log::debug!("Ignored action {}: {}", action, e);
            }
        }

        /// Apply and persist the jump trigger preference
        fn set_jump_trigger(&mut self, trigger: JumpTrigger) {
            self.session.set_jump_trigger(trigger);
            if let Err(e) = self.session.settings().save(&mut self.storage) {
                log::warn!("Could not save settings: {}", e);
            }
        }
    }

    /// Read `user_id` / `first_name` from the page URL
    fn launch_params(settings: &Settings) -> Result<LaunchParams, coin_dash::SessionError> {
        let search = web_sys::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default();
        let query = web_sys::UrlSearchParams::new_with_str(&search).ok();
        let user_id = query.as_ref().and_then(|q| q.get("user_id"));
        let first_name = query.as_ref().and_then(|q| q.get("first_name"));

        match LaunchParams::parse(user_id.as_deref(), first_name.as_deref()) {
            Ok(params) => Ok(params),
            Err(e) if settings.offline_fallback_id => {
                log::warn!("{}; using an offline id", e);
                Ok(LaunchParams::offline(js_sys::Date::now(), first_name.as_deref()))
            }
            Err(e) => Err(e),
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Coin Dash starting...");
        telegram::expand();

        let storage = match LocalStorage::open() {
            Ok(storage) => storage,
            Err(e) => {
                log::error!("{}", e);
                show_fatal("Storage is unavailable. Restart the game.");
                return;
            }
        };
        let settings = Settings::load(&storage);

        let params = match launch_params(&settings) {
            Ok(params) => params,
            Err(e) => {
                log::error!("Cannot start: {}", e);
                show_fatal("Initialization failed. Restart the bot.");
                return;
            }
        };

        let seed = js_sys::Date::now() as u64 ^ (js_sys::Math::random() * u32::MAX as f64) as u64;
        let session = Session::new(
            params,
            settings,
            Box::new(storage.clone()),
            Rc::new(TelegramChannel),
            seed,
        );
        let game = Rc::new(RefCell::new(Game { session, storage }));

        setup_input_handlers(game.clone());
        setup_action_handlers(game.clone());
        setup_host_listener(game.clone());

        request_animation_frame(game);

        log::info!("Coin Dash running!");
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if let Some(key) = Key::from_dom_key(&event.key()) {
                    game.borrow_mut().session.key_down(key);
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if let Some(key) = Key::from_dom_key(&event.key()) {
                    game.borrow_mut().session.key_up(key);
                }
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_action_handlers(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
            let target = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .and_then(|el| el.closest("[data-action]").ok().flatten());
            if let Some(target) = target {
                if let Some(action) = target.get_attribute("data-action") {
                    game.borrow_mut().handle_action(&action, &target);
                }
            }
        });
        let _ =
            document.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_host_listener(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        let closure = Closure::<dyn FnMut(_)>::new(move |event: MessageEvent| {
            let data = event.data();
            let raw = match data.as_string() {
                Some(raw) => Some(raw),
                None => js_sys::JSON::stringify(&data)
                    .ok()
                    .and_then(|s| s.as_string()),
            };
            if let Some(raw) = raw {
                game.borrow_mut().session.handle_host_message(&raw);
            }
        });
        let _ = window.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |_time: f64| {
            game_loop(game);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>) {
        {
            let mut g = game.borrow_mut();
            g.update();
            g.render();
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Coin Dash (native) starting...");
    log::info!("The web build is the real game - run with `trunk serve`");

    let args: Vec<String> = std::env::args().collect();
    let params = match coin_dash::platform::LaunchParams::parse(
        args.get(1).map(String::as_str),
        args.get(2).map(String::as_str),
    ) {
        Ok(params) => params,
        Err(e) => {
            log::error!("Cannot start: {}", e);
            eprintln!("usage: coin-dash <user_id> [first_name]");
            std::process::exit(1);
        }
    };

    headless_run(params);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Play a few seconds with scripted input against in-memory storage
#[cfg(not(target_arch = "wasm32"))]
fn headless_run(params: coin_dash::platform::LaunchParams) {
    use std::rc::Rc;

    use coin_dash::platform::{MemoryStorage, RecordingChannel};
    use coin_dash::session::{Key, SaveChoice};
    use coin_dash::sim::GameEvent;
    use coin_dash::{JumpTrigger, Session, Settings};

    const FRAME_MS: f64 = 1000.0 / 60.0;

    // COIN_DASH_JUMP=edge|level picks the jump trigger
    let mut settings = Settings::default();
    if let Ok(value) = std::env::var("COIN_DASH_JUMP") {
        match JumpTrigger::from_str(&value) {
            Some(trigger) => settings.jump_trigger = trigger,
            None => log::warn!("Unknown jump trigger {:?}, keeping default", value),
        }
    }
    log::info!("Jump trigger: {}", settings.jump_trigger.as_str());

    let host = Rc::new(RecordingChannel::new());
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mut session = Session::new(
        params,
        settings,
        Box::new(MemoryStorage::new()),
        host.clone(),
        seed,
    );

    if let Err(e) = session.choose_save(SaveChoice::NewGame, 0.0) {
        log::error!("{}", e);
        return;
    }

    let mut coins = 0;
    let mut now = 0.0;
    for frame in 0..1800u32 {
        // Run right, hop every half second
        session.key_down(Key::Right);
        if frame % 30 == 0 {
            session.key_down(Key::Jump);
        } else {
            session.key_up(Key::Jump);
        }

        for event in session.update(now) {
            match event {
                GameEvent::CoinsCollected { count } => coins += count,
                GameEvent::LevelCompleted { level } => println!("Reached level {}", level),
                GameEvent::PlayerDefeated => {
                    println!("Defeated at frame {}", frame);
                    let _ = session.restart_level();
                }
                GameEvent::PlayerHit { .. } => {}
            }
        }
        now += FRAME_MS;
    }

    let hud = session.hud();
    println!(
        "Collected {} coins, level {}, hp {}/{}, {} host messages",
        coins,
        hud.level,
        hud.hp,
        hud.max_hp,
        host.sent().len()
    );
}
