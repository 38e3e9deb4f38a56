//! Typefall entry point
//!
//! The browser build drives a `Session` from `requestAnimationFrame` and
//! mirrors its snapshot into the page. The native build runs a headless
//! session with a scripted typist.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlSelectElement};

    use typefall::sim::GameEvent;
    use typefall::{Command, GameMode, GamePhase, Session, Settings, Snapshot, Viewport};

    /// Game instance holding the session and the DOM nodes it drives
    struct Game {
        session: Session,
        /// One absolutely positioned div per falling definition
        nodes: HashMap<u32, HtmlElement>,
        last_phase: GamePhase,
    }

    impl Game {
        fn new(settings: Settings, seed: u64) -> Self {
            Self {
                session: Session::new(settings, seed),
                nodes: HashMap::new(),
                last_phase: GamePhase::Idle,
            }
        }

        fn command(&mut self, command: Command) {
            if let Err(err) = self.session.handle(command, now()) {
                log::warn!("Command rejected: {}", err);
                set_text("status", &err.to_string());
            }
        }

        fn update(&mut self, time: f64) {
            let events = self.session.update(time);
            if events
                .iter()
                .any(|e| matches!(e, GameEvent::PhaseChanged { .. }))
            {
                self.sync_input();
            }
        }

        /// Copy the (possibly cleared) input buffer back into the text field
        fn sync_input(&self) {
            if let Some(input) = element_as::<HtmlInputElement>("answer") {
                input.set_value(&self.session.state().input);
                input.set_disabled(self.session.phase() != GamePhase::Running);
                if self.session.phase() == GamePhase::Running {
                    let _ = input.focus();
                }
            }
        }

        fn render(&mut self, time: f64) {
            let Some(document) = document() else {
                return;
            };
            let snapshot = self.session.snapshot(time);
            self.sync_words(&document, &snapshot);
            update_hud(&document, &snapshot);

            if snapshot.phase != self.last_phase {
                show_screens(&document, snapshot.phase);
                self.last_phase = snapshot.phase;
            }
        }

        fn sync_words(&mut self, document: &Document, snapshot: &Snapshot) {
            self.nodes.retain(|id, node| {
                let alive = snapshot.words.iter().any(|w| w.id == *id);
                if !alive {
                    node.remove();
                }
                alive
            });

            let Some(field) = document.get_element_by_id("field") else {
                return;
            };
            for word in &snapshot.words {
                if !self.nodes.contains_key(&word.id) {
                    let Some(node) = document
                        .create_element("div")
                        .ok()
                        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
                    else {
                        continue;
                    };
                    node.set_class_name("falling-word");
                    node.set_text_content(Some(&word.definition));
                    let _ = field.append_child(&node);
                    self.nodes.insert(word.id, node);
                }
                if let Some(node) = self.nodes.get(&word.id) {
                    let style = node.style();
                    let _ = style.set_property("left", &format!("{:.1}px", word.x));
                    let _ = style.set_property("top", &format!("{:.1}px", word.y));
                }
            }
        }

        fn field_viewport(&self) -> Option<Viewport> {
            let field = element_as::<HtmlElement>("field")?;
            let width = field.client_width() as f32;
            let height = field.client_height() as f32;
            if width <= 0.0 || height <= 0.0 {
                return None;
            }
            Some(Viewport {
                width,
                height,
                ..self.session.settings().viewport
            })
        }
    }

    fn update_hud(document: &Document, snapshot: &Snapshot) {
        if let Some(el) = document.query_selector("#hud-score .hud-value").ok().flatten() {
            el.set_text_content(Some(&snapshot.score_label));
        }

        if let Some(el) = document.get_element_by_id("hud-lives") {
            match snapshot.lives {
                Some(lives) => {
                    let _ = el.set_attribute("class", "hud-item");
                    if let Some(val) = document.query_selector("#hud-lives .hud-value").ok().flatten()
                    {
                        val.set_text_content(Some(&lives.to_string()));
                    }
                }
                None => {
                    let _ = el.set_attribute("class", "hud-item hidden");
                }
            }
        }

        if let Some(el) = document.get_element_by_id("hud-time") {
            match snapshot.time_remaining {
                Some(secs) => {
                    let _ = el.set_attribute("class", "hud-item");
                    if let Some(val) = document.query_selector("#hud-time .hud-value").ok().flatten()
                    {
                        val.set_text_content(Some(&secs.to_string()));
                    }
                }
                None => {
                    let _ = el.set_attribute("class", "hud-item hidden");
                }
            }
        }

        if let Some(el) = document
            .get_element_by_id("feedback")
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        {
            match &snapshot.feedback {
                Some(feedback) => {
                    el.set_text_content(Some(&feedback.text));
                    el.set_class_name(&format!("feedback {}", feedback.class));
                    let _ = el
                        .style()
                        .set_property("opacity", &format!("{:.2}", feedback.opacity));
                }
                None => {
                    el.set_text_content(None);
                    el.set_class_name("feedback hidden");
                }
            }
        }

        if let Some(el) = document.get_element_by_id("library-size") {
            el.set_text_content(Some(&snapshot.library_size.to_string()));
        }

        if snapshot.phase == GamePhase::Over {
            if let Some(el) = document.get_element_by_id("final-score") {
                el.set_text_content(Some(&snapshot.score_label));
            }
        }
    }

    /// Show exactly the overlays that belong to `phase`
    fn show_screens(document: &Document, phase: GamePhase) {
        let visible = |id: &str, show: bool| {
            if let Some(el) = document.get_element_by_id(id) {
                let _ = el.class_list().toggle_with_force("hidden", !show);
            }
        };
        visible("menu", phase == GamePhase::Idle);
        visible("hud", phase != GamePhase::Idle);
        visible("pause-menu", phase == GamePhase::Paused);
        visible("game-over", phase == GamePhase::Over);
    }

    fn now() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or_default()
    }

    fn document() -> Option<Document> {
        web_sys::window()?.document()
    }

    fn element(id: &str) -> Option<Element> {
        document()?.get_element_by_id(id)
    }

    fn element_as<T: JsCast>(id: &str) -> Option<T> {
        element(id)?.dyn_into::<T>().ok()
    }

    fn set_text(id: &str, text: &str) {
        if let Some(el) = element(id) {
            el.set_text_content(Some(text));
        }
    }

    /// Attach a click handler to the element with `id`, if present
    fn on_click(id: &str, mut handler: impl FnMut() + 'static) {
        if let Some(btn) = element(id) {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| handler());
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if let Err(err) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("Failed to init logger: {}", err).into());
        }

        log::info!("Typefall starting...");

        let Some(document) = document() else {
            log::error!("No document available");
            return;
        };

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let settings = Settings::load();
        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(settings, seed)));

        {
            let mut g = game.borrow_mut();
            if let Some(viewport) = g.field_viewport() {
                // Rejected sizes are logged and the previous viewport kept
                let _ = g.session.resize(viewport);
            }
            show_screens(&document, GamePhase::Idle);
            g.sync_input();
        }

        setup_menu(game.clone());
        setup_answer_input(game.clone());
        setup_pause_menu(game.clone());
        setup_game_over(game.clone());
        setup_upload(game.clone(), "file-input", "status");
        setup_upload(game.clone(), "over-file-input", "over-status");
        setup_auto_pause(game.clone());
        setup_resize(game.clone());

        request_animation_frame(game);

        log::info!("Typefall running!");
    }

    fn setup_menu(game: Rc<RefCell<Game>>) {
        if let Some(select) = element_as::<HtmlSelectElement>("mode-select") {
            select.set_value(game.borrow().session.selected_mode().key());
        }

        on_click("start-btn", move || {
            let mode = element_as::<HtmlSelectElement>("mode-select")
                .and_then(|select| GameMode::from_str(&select.value()))
                .unwrap_or_else(|| game.borrow().session.selected_mode());
            let mut g = game.borrow_mut();
            if mode != g.session.settings().default_mode {
                g.command(Command::SelectMode(mode));
                g.session.settings().save();
            }
            g.command(Command::Start(mode));
            g.sync_input();
            log::info!("Started {} session", mode.as_str());
        });
    }

    fn setup_answer_input(game: Rc<RefCell<Game>>) {
        let Some(input) = element_as::<HtmlInputElement>("answer") else {
            log::warn!("No answer field found");
            return;
        };

        // Mirror the field into the session's input buffer
        {
            let game = game.clone();
            let field = input.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                game.borrow_mut().session.set_input(&field.value());
            });
            let _ = input.add_event_listener_with_callback("input", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard
        {
            let window = web_sys::window();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    "Enter" => {
                        event.prevent_default();
                        if g.session.phase() == GamePhase::Running {
                            g.session.submit_buffer(now());
                            g.sync_input();
                        }
                    }
                    "Escape" => {
                        g.command(Command::TogglePause);
                        g.sync_input();
                    }
                    _ => {}
                }
            });
            if let Some(window) = window {
                let _ = window
                    .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            }
            closure.forget();
        }
    }

    fn setup_pause_menu(game: Rc<RefCell<Game>>) {
        {
            let game = game.clone();
            on_click("pause-btn", move || {
                let mut g = game.borrow_mut();
                g.command(Command::TogglePause);
                g.sync_input();
            });
        }

        {
            let game = game.clone();
            on_click("resume-btn", move || {
                let mut g = game.borrow_mut();
                if g.session.phase() == GamePhase::Paused {
                    g.command(Command::TogglePause);
                }
                g.sync_input();
            });
        }

        on_click("quit-btn", move || {
            let was_running = game.borrow_mut().session.pause(now());
            // The dialog blocks; no borrow may be held across it
            let confirmed = web_sys::window()
                .and_then(|w| {
                    w.confirm_with_message("Quit to menu? This session's progress will be lost.")
                        .ok()
                })
                .unwrap_or(false);
            let mut g = game.borrow_mut();
            if confirmed {
                g.command(Command::QuitToMenu);
                log::info!("Returned to menu");
            } else if was_running {
                g.session.resume(now());
            }
            g.sync_input();
        });
    }

    fn setup_game_over(game: Rc<RefCell<Game>>) {
        {
            let game = game.clone();
            on_click("restart-btn", move || {
                let mut g = game.borrow_mut();
                g.command(Command::Restart);
                g.sync_input();
            });
        }

        on_click("menu-btn", move || {
            let mut g = game.borrow_mut();
            g.command(Command::QuitToMenu);
            g.sync_input();
        });
    }

    /// Read a `.txt` word list picked in `input_id` and hand it to the
    /// session, reporting the result in `status_id`
    fn setup_upload(game: Rc<RefCell<Game>>, input_id: &'static str, status_id: &'static str) {
        let Some(input) = element_as::<HtmlInputElement>(input_id) else {
            return;
        };

        let picker = input.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let Some(file) = picker.files().and_then(|files| files.get(0)) else {
                return;
            };
            let reader = match web_sys::FileReader::new() {
                Ok(reader) => reader,
                Err(err) => {
                    log::warn!("FileReader unavailable: {:?}", err);
                    return;
                }
            };

            let name = file.name();
            let game = game.clone();
            let source = reader.clone();
            let onload = Closure::once(move |_event: web_sys::Event| {
                let Some(text) = source.result().ok().and_then(|v| v.as_string()) else {
                    log::warn!("Could not read {} as text", name);
                    return;
                };
                let mut g = game.borrow_mut();
                match g.session.load_word_list(&text, now()) {
                    Ok(started) => {
                        let count = g.session.library().len();
                        set_text(status_id, &format!("Loaded {} words from {}", count, name));
                        if started {
                            g.sync_input();
                        }
                    }
                    Err(err) => set_text(status_id, &format!("{}: {}", name, err)),
                }
            });
            reader.set_onload(Some(onload.as_ref().unchecked_ref()));
            onload.forget();

            if let Err(err) = reader.read_as_text(&file) {
                log::warn!("Failed to read upload: {:?}", err);
            }
            picker.set_value("");
        });
        let _ = input.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_auto_pause(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut g = game.borrow_mut();
                    if g.session.pause(now()) {
                        log::info!("Auto-paused (tab hidden)");
                        g.sync_input();
                    }
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur (click outside)
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                if g.session.pause(now()) {
                    log::info!("Auto-paused (window blur)");
                    g.sync_input();
                }
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_resize(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let mut g = game.borrow_mut();
            if let Some(viewport) = g.field_viewport() {
                // Rejected sizes are logged and the previous viewport kept
                let _ = g.session.resize(viewport);
            }
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();
            g.update(time);
            g.render(time);
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
    log::info!("Typefall (native) starting...");
    log::info!("Native mode runs a headless session - use `trunk serve` for the web version");

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(2024);

    println!("\nRunning headless sessions (seed {})...", seed);
    for mode in typefall::GameMode::ALL {
        headless::run(mode, seed);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Scripted typist: answers the lowest definition once it has been on
/// screen for a while, and fumbles every fifth attempt.
#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use typefall::consts::TICK_MS;
    use typefall::sim::{GameEvent, SubmitOutcome};
    use typefall::{GameMode, GamePhase, Session, Settings};

    const REACTION_MS: f64 = 2200.0;
    const LIMIT_MS: f64 = 10.0 * 60_000.0;

    pub fn run(mode: GameMode, seed: u64) {
        let settings = Settings {
            seed: Some(seed),
            auto_start_on_upload: false,
            ..Settings::default()
        };
        let mut session = Session::new(settings, seed);
        if let Err(err) = session.start(mode, 0.0) {
            log::error!("Could not start {}: {}", mode.as_str(), err);
            return;
        }

        let mut t = 0.0;
        let mut next_attempt = REACTION_MS;
        let mut attempts = 0u32;
        let mut misses = 0u32;
        while session.phase() == GamePhase::Running && t < LIMIT_MS {
            t += TICK_MS;
            misses += session
                .update(t)
                .iter()
                .filter(|e| matches!(e, GameEvent::Missed { .. }))
                .count() as u32;

            if t < next_attempt {
                continue;
            }
            let target = session
                .state()
                .words
                .iter()
                .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
                .map(|w| w.term.clone());
            if let Some(term) = target {
                attempts += 1;
                let typed = if attempts % 5 == 0 {
                    format!("{}x", term)
                } else {
                    term.to_uppercase()
                };
                if let SubmitOutcome::Incorrect { expected } = session.submit(&typed, t) {
                    log::debug!("Typist fumbled (expected {:?})", expected);
                }
                next_attempt = t + REACTION_MS;
            }
        }

        let state = session.state();
        println!(
            "  {:<14} score {:<6} spawned {:<4} misses {:<3} wrong {:<3} ended at {:>6.1}s",
            mode.as_str(),
            session.snapshot(t).score_label,
            state.stats.spawned,
            misses,
            state.stats.wrong_submissions,
            t / 1000.0
        );
    }
}
