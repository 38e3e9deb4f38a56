//! Session controller
//!
//! Owns the state, the active timers, the RNG and the configured word
//! library. The presentation layer sends `Command`s, calls `update` with its
//! clock every frame and draws from `snapshot`.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::consts::{COUNTDOWN_MS, MAX_CALLBACKS_PER_UPDATE, TICK_MS};
use crate::error::GameError;
use crate::scheduler::{Firing, Scheduler, TimerKind};
use crate::settings::{Settings, Viewport};
use crate::sim::{self, GameEvent, GameMode, GamePhase, GameState, SpawnOutcome, SubmitOutcome};
use crate::words::{self, WordEntry};

/// Semantic control events from the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start a session in the given mode
    Start(GameMode),
    /// Start again with the last mode
    Restart,
    /// Choose the mode for the next start
    SelectMode(GameMode),
    /// Evaluate typed text
    Submit(String),
    TogglePause,
    /// Leave the session (confirmation already given)
    QuitToMenu,
    /// Replace the word list with uploaded text
    UploadWords(String),
    Resize(Viewport),
}

/// One falling definition as drawn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordView {
    pub id: u32,
    pub definition: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackView {
    pub text: String,
    pub class: &'static str,
    pub opacity: f32,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub mode: GameMode,
    pub score: u32,
    pub score_label: String,
    /// Lives-based modes only
    pub lives: Option<u8>,
    /// Timed mode only
    pub time_remaining: Option<u32>,
    pub fall_speed: f32,
    pub words: Vec<WordView>,
    pub feedback: Option<FeedbackView>,
    pub input: String,
    pub library_size: usize,
}

pub struct Session {
    settings: Settings,
    library: Vec<WordEntry>,
    mode: GameMode,
    state: GameState,
    scheduler: Scheduler,
    rng: Pcg32,
    seed: u64,
}

impl Session {
    /// `seed` is used unless the settings pin one
    pub fn new(settings: Settings, seed: u64) -> Self {
        let seed = settings.seed.unwrap_or(seed);
        log::info!("Session controller created with seed: {}", seed);
        Self {
            mode: settings.default_mode,
            state: GameState::new(&settings),
            library: words::default_words(),
            scheduler: Scheduler::new(),
            rng: Pcg32::seed_from_u64(seed),
            settings,
            seed,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn library(&self) -> &[WordEntry] {
        &self.library
    }

    pub fn selected_mode(&self) -> GameMode {
        self.mode
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    /// Also becomes the menu's preselected mode
    pub fn select_mode(&mut self, mode: GameMode) {
        self.mode = mode;
        self.settings.default_mode = mode;
    }

    /// Start a session with the current library
    pub fn start(&mut self, mode: GameMode, now_ms: f64) -> Result<(), GameError> {
        sim::start(
            &mut self.state,
            self.library.clone(),
            mode,
            &mut self.rng,
            now_ms,
        )?;
        self.mode = mode;
        self.arm_session_timers(now_ms);
        Ok(())
    }

    /// Start again in the last selected mode
    pub fn restart(&mut self, now_ms: f64) -> Result<(), GameError> {
        self.start(self.mode, now_ms)
    }

    fn arm_session_timers(&mut self, now_ms: f64) {
        let tuning = self.state.mode.tuning();
        self.scheduler.cancel_all();
        self.scheduler.arm_repeating(TimerKind::Fall, now_ms, TICK_MS);
        self.scheduler.arm_once(TimerKind::Spawn, now_ms, 0.0);
        if self.state.mode == GameMode::Timed {
            self.scheduler
                .arm_repeating(TimerKind::Countdown, now_ms, COUNTDOWN_MS);
        }
        if let Some(ramp) = tuning.ramp {
            self.scheduler
                .arm_repeating(TimerKind::SpeedRamp, now_ms, ramp.interval_ms);
        }
    }

    /// Replace the library with a new list. Returns true if a session was
    /// auto-started.
    pub fn replace_words(
        &mut self,
        entries: Vec<WordEntry>,
        now_ms: f64,
    ) -> Result<bool, GameError> {
        if entries.is_empty() {
            return Err(GameError::EmptyWordList);
        }
        log::info!("Word list replaced: {} entries", entries.len());
        self.library = entries;

        let idle = matches!(self.state.phase, GamePhase::Idle | GamePhase::Over);
        if self.settings.auto_start_on_upload && idle {
            self.start(self.mode, now_ms)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Parse uploaded text and replace the library. On error the current
    /// library is kept.
    pub fn load_word_list(&mut self, text: &str, now_ms: f64) -> Result<bool, GameError> {
        let entries = words::parse_word_list(text).inspect_err(|err| {
            log::warn!("Rejected word list: {}", err);
        })?;
        self.replace_words(entries, now_ms)
    }

    pub fn submit(&mut self, raw: &str, now_ms: f64) -> SubmitOutcome {
        let outcome = sim::submit(&mut self.state, raw, now_ms);
        self.after_resolution(now_ms);
        outcome
    }

    pub fn submit_buffer(&mut self, now_ms: f64) -> SubmitOutcome {
        let outcome = sim::submit_buffer(&mut self.state, now_ms);
        self.after_resolution(now_ms);
        outcome
    }

    pub fn push_char(&mut self, ch: char) {
        sim::push_char(&mut self.state, ch);
    }

    pub fn backspace(&mut self) {
        sim::backspace(&mut self.state);
    }

    pub fn set_input(&mut self, text: &str) {
        sim::set_input(&mut self.state, text);
    }

    pub fn pause(&mut self, now_ms: f64) -> bool {
        if sim::pause(&mut self.state, now_ms) {
            self.scheduler.freeze(now_ms);
            return true;
        }
        false
    }

    pub fn resume(&mut self, now_ms: f64) -> bool {
        if sim::resume(&mut self.state, now_ms) {
            self.scheduler.thaw(now_ms);
            return true;
        }
        false
    }

    pub fn toggle_pause(&mut self, now_ms: f64) -> bool {
        match self.state.phase {
            GamePhase::Running => self.pause(now_ms),
            GamePhase::Paused => self.resume(now_ms),
            _ => false,
        }
    }

    /// Force game over and cancel every timer
    pub fn end(&mut self) {
        sim::end(&mut self.state);
        self.scheduler.cancel_all();
    }

    pub fn return_to_menu(&mut self) {
        sim::return_to_menu(&mut self.state);
        self.scheduler.cancel_all();
    }

    /// Adopt a new playfield size. A viewport too short for the miss line is
    /// rejected and the previous one kept.
    pub fn resize(&mut self, viewport: Viewport) -> Result<(), GameError> {
        viewport
            .check(self.settings.miss_margin)
            .inspect_err(|err| log::warn!("Ignoring resize: {}", err))?;
        self.settings.viewport = viewport;
        self.state.viewport = viewport;
        Ok(())
    }

    pub fn handle(&mut self, command: Command, now_ms: f64) -> Result<(), GameError> {
        match command {
            Command::Start(mode) => self.start(mode, now_ms)?,
            Command::Restart => self.restart(now_ms)?,
            Command::SelectMode(mode) => self.select_mode(mode),
            Command::Submit(text) => {
                self.submit(&text, now_ms);
            }
            Command::TogglePause => {
                self.toggle_pause(now_ms);
            }
            Command::QuitToMenu => self.return_to_menu(),
            Command::UploadWords(text) => {
                self.load_word_list(&text, now_ms)?;
            }
            Command::Resize(viewport) => self.resize(viewport)?,
        }
        Ok(())
    }

    /// Run every timer due by `now_ms` and return what happened
    ///
    /// After a long stall the fall backlog is skipped once the callback budget
    /// runs out; the countdown, ramp and spawn schedules still catch up in
    /// full, so a stall never adds time to a Timed session.
    pub fn update(&mut self, now_ms: f64) -> Vec<GameEvent> {
        let mut processed = 0;
        let mut skipped_falls = false;
        while self.state.is_running() {
            if processed >= MAX_CALLBACKS_PER_UPDATE {
                if skipped_falls {
                    log::warn!("Timer backlog at t={:.0}, resyncing", now_ms);
                    self.scheduler.resync(now_ms);
                    break;
                }
                log::warn!("Fall backlog at t={:.0}, skipping ahead", now_ms);
                self.scheduler.skip_backlog(TimerKind::Fall, now_ms);
                skipped_falls = true;
                processed = 0;
            }
            let Some(firing) = self.scheduler.pop_due(now_ms) else {
                break;
            };
            self.dispatch(firing);
            processed += 1;
        }
        self.cancel_if_finished();

        if self
            .state
            .feedback
            .as_ref()
            .is_some_and(|f| f.expired(now_ms))
        {
            self.state.feedback = None;
        }

        self.drain_events()
    }

    fn dispatch(&mut self, firing: Firing) {
        let at = firing.at_ms;
        match firing.kind {
            TimerKind::Fall => {
                sim::tick(&mut self.state, TICK_MS);
                self.pull_spawn_forward(at);
            }
            TimerKind::Spawn => match sim::spawn(&mut self.state, &mut self.rng, at) {
                SpawnOutcome::Spawned { .. } => {
                    let delay = sim::roll_spawn_interval(self.state.mode, &mut self.rng);
                    self.scheduler.arm_once(TimerKind::Spawn, at, delay);
                }
                SpawnOutcome::CoolingDown { retry_in_ms } => {
                    self.scheduler.arm_once(TimerKind::Spawn, at, retry_in_ms);
                }
                SpawnOutcome::Exhausted | SpawnOutcome::Inactive => {}
            },
            TimerKind::Countdown => sim::advance_timer(&mut self.state),
            TimerKind::SpeedRamp => sim::ramp_speed(&mut self.state),
        }
    }

    fn after_resolution(&mut self, now_ms: f64) {
        self.pull_spawn_forward(now_ms);
        self.cancel_if_finished();
    }

    /// An empty field waits only for the cooldown, not the full interval
    fn pull_spawn_forward(&mut self, now_ms: f64) {
        if !self.state.is_running() || !self.state.words.is_empty() || !self.state.can_spawn_more()
        {
            return;
        }
        let wait = sim::cooldown_remaining(&self.state, now_ms);
        let pending = self.scheduler.due_in(TimerKind::Spawn, now_ms);
        if pending.is_none_or(|due| due > wait) {
            self.scheduler.arm_once(TimerKind::Spawn, now_ms, wait);
        }
    }

    fn cancel_if_finished(&mut self) {
        if matches!(self.state.phase, GamePhase::Over | GamePhase::Idle) && !self.scheduler.is_empty()
        {
            self.scheduler.cancel_all();
        }
    }

    fn drain_events(&mut self) -> Vec<GameEvent> {
        let events = std::mem::take(&mut self.state.events);
        for event in &events {
            match event {
                GameEvent::PhaseChanged { from, to } => {
                    log::info!("Phase {:?} -> {:?}", from, to)
                }
                GameEvent::Spawned { id, term } => log::debug!("Spawned #{} '{}'", id, term),
                GameEvent::Matched { id, term } => log::debug!("Matched #{} '{}'", id, term),
                GameEvent::Missed { id, term } => log::debug!("Missed #{} '{}'", id, term),
                GameEvent::Incorrect { expected } => {
                    log::debug!("Incorrect answer (expected {:?})", expected)
                }
                GameEvent::TimeTick { .. } => {}
                GameEvent::SpeedChanged { speed } => log::debug!("Fall speed {:.2}", speed),
            }
        }
        events
    }

    pub fn snapshot(&self, now_ms: f64) -> Snapshot {
        let state = &self.state;
        let uses_lives = state.mode.uses_lives();
        Snapshot {
            phase: state.phase,
            mode: state.mode,
            score: state.score,
            score_label: state.score_label(),
            lives: uses_lives.then_some(state.lives),
            time_remaining: (!uses_lives).then_some(state.time_remaining),
            fall_speed: state.fall_speed,
            words: state
                .words
                .iter()
                .map(|w| WordView {
                    id: w.id,
                    definition: w.definition.clone(),
                    x: w.pos.x,
                    y: w.pos.y,
                })
                .collect(),
            feedback: state
                .feedback
                .as_ref()
                .filter(|f| !f.expired(now_ms))
                .map(|f| FeedbackView {
                    text: f.text.clone(),
                    class: f.kind.class(),
                    opacity: f.opacity(now_ms),
                }),
            input: state.input.clone(),
            library_size: self.library.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let settings = Settings {
            seed: Some(99),
            ..Settings::default()
        };
        Session::new(settings, 0)
    }

    #[test]
    fn test_first_spawn_at_start_time() {
        let mut s = session();
        s.start(GameMode::Classic, 1000.0).unwrap();
        s.update(1000.0);
        assert_eq!(s.state().words.len(), 1);
        assert!(s.scheduler().is_armed(TimerKind::Spawn));
    }

    #[test]
    fn test_replace_with_nothing_is_rejected() {
        let mut s = session();
        assert!(s.replace_words(Vec::new(), 0.0).is_err());
        assert_eq!(s.phase(), GamePhase::Idle);
        assert!(!s.library().is_empty());
    }

    #[test]
    fn test_upload_rejects_empty_and_keeps_library() {
        let mut s = session();
        let before = s.library().to_vec();
        assert_eq!(s.load_word_list("\n\n", 0.0), Err(GameError::EmptyWordList));
        assert_eq!(s.library(), before.as_slice());
        assert_eq!(s.phase(), GamePhase::Idle);
    }

    #[test]
    fn test_upload_auto_starts_from_menu_only() {
        let mut s = session();
        assert_eq!(s.load_word_list("a: x\nb: y", 0.0), Ok(true));
        assert_eq!(s.phase(), GamePhase::Running);
        assert_eq!(s.load_word_list("c: z", 10.0), Ok(false));
        assert_eq!(s.state().pool.len(), 2);
        assert_eq!(s.library().len(), 1);

        let mut manual = Session::new(
            Settings {
                auto_start_on_upload: false,
                ..Settings::default()
            },
            1,
        );
        assert_eq!(manual.load_word_list("a: x", 0.0), Ok(false));
        assert_eq!(manual.phase(), GamePhase::Idle);
    }

    #[test]
    fn test_game_over_cancels_timers() {
        let mut s = session();
        s.start(GameMode::Timed, 0.0).unwrap();
        s.update(0.0);
        s.end();
        assert!(s.scheduler().is_empty());
        let events = s.update(100_000.0);
        assert!(events.iter().all(|e| !matches!(e, GameEvent::Spawned { .. })));
        assert_eq!(s.phase(), GamePhase::Over);
    }

    #[test]
    fn test_pause_freezes_everything() {
        let mut s = session();
        s.start(GameMode::Timed, 0.0).unwrap();
        s.update(2500.0);
        let snap = s.snapshot(2500.0);
        assert!(s.toggle_pause(2500.0));
        s.update(60_000.0);
        assert_eq!(s.snapshot(60_000.0).words, snap.words);
        assert_eq!(s.state().time_remaining, snap.time_remaining.unwrap());

        assert!(s.toggle_pause(60_000.0));
        s.update(60_500.0);
        assert_eq!(s.state().time_remaining, 57);
    }

    #[test]
    fn test_quit_to_menu_clears_field() {
        let mut s = session();
        s.handle(Command::Start(GameMode::ClassicHard), 0.0).unwrap();
        s.update(100.0);
        s.handle(Command::QuitToMenu, 100.0).unwrap();
        assert_eq!(s.phase(), GamePhase::Idle);
        assert!(s.state().words.is_empty());
        assert!(s.scheduler().is_empty());
    }

    #[test]
    fn test_empty_field_spawns_after_cooldown() {
        let mut s = session();
        s.start(GameMode::Classic, 0.0).unwrap();
        s.update(0.0);
        let term = s.state().words[0].term.clone();
        assert!(matches!(s.submit(&term, 1000.0), SubmitOutcome::Matched { .. }));
        assert_eq!(s.scheduler().due_in(TimerKind::Spawn, 1000.0), Some(500.0));
        s.update(1500.0);
        assert_eq!(s.state().words.len(), 1);
    }

    #[test]
    fn test_snapshot_mode_fields() {
        let mut s = session();
        s.start(GameMode::Timed, 0.0).unwrap();
        let snap = s.snapshot(0.0);
        assert_eq!(snap.lives, None);
        assert_eq!(snap.time_remaining, Some(60));
        s.end();
        s.start(GameMode::Classic, 0.0).unwrap();
        let snap = s.snapshot(0.0);
        assert_eq!(snap.lives, Some(3));
        assert_eq!(snap.time_remaining, None);
        assert_eq!(snap.score_label, format!("0/{}", s.library().len()));
    }

    #[test]
    fn test_resize_rejects_viewport_above_miss_line() {
        let mut s = session();
        s.start(GameMode::Classic, 0.0).unwrap();
        s.update(0.0);
        let short = Viewport {
            height: 100.0,
            entity_height: 64.0,
            ..Viewport::default()
        };
        assert!(matches!(
            s.handle(Command::Resize(short), 0.0),
            Err(GameError::InvalidSettings(_))
        ));
        assert_eq!(s.state().viewport, Viewport::default());

        s.update(16.0);
        assert_eq!(s.state().lives, 3);
        assert_eq!(s.state().stats.missed, 0);
        assert_eq!(s.phase(), GamePhase::Running);
    }

    #[test]
    fn test_resize_applies_to_running_session() {
        let mut s = session();
        s.start(GameMode::Classic, 0.0).unwrap();
        let narrow = Viewport {
            width: 400.0,
            height: 500.0,
            ..Viewport::default()
        };
        s.handle(Command::Resize(narrow), 0.0).unwrap();
        assert_eq!(s.settings().viewport, narrow);
        s.update(0.0);
        let word = &s.state().words[0];
        assert!(word.pos.x <= narrow.max_x());
    }

    #[test]
    fn test_upload_from_game_over_starts_new_list() {
        let mut s = session();
        s.load_word_list("solo: one", 0.0).unwrap();
        s.update(0.0);
        s.submit("solo", 100.0);
        assert_eq!(s.phase(), GamePhase::Over);

        assert_eq!(s.load_word_list("a: x\nb: y\nc: z", 200.0), Ok(true));
        assert_eq!(s.phase(), GamePhase::Running);
        assert_eq!(s.state().pool.len(), 3);
        assert_eq!(s.state().score, 0);
        assert_eq!(s.snapshot(200.0).score_label, "0/3");
    }

    #[test]
    fn test_stall_still_counts_down() {
        let mut s = session();
        s.start(GameMode::Timed, 0.0).unwrap();
        s.update(0.0);
        s.update(20_000.0);
        assert_eq!(s.phase(), GamePhase::Running);
        assert_eq!(s.state().time_remaining, 40);
        assert_eq!(s.scheduler().due_in(TimerKind::Fall, 20_000.0), Some(TICK_MS));

        s.update(60_000.0);
        assert_eq!(s.phase(), GamePhase::Over);
        assert_eq!(s.state().time_remaining, 0);
    }

    #[test]
    fn test_select_mode_then_restart() {
        let mut s = session();
        s.handle(Command::SelectMode(GameMode::Timed), 0.0).unwrap();
        assert_eq!(s.settings().default_mode, GameMode::Timed);
        assert_eq!(s.phase(), GamePhase::Idle);
        s.handle(Command::Restart, 0.0).unwrap();
        assert_eq!(s.state().mode, GameMode::Timed);
        assert!(s.scheduler().is_armed(TimerKind::Countdown));
    }

    #[test]
    fn test_feedback_cleared_after_lifetime() {
        let mut s = session();
        s.start(GameMode::Classic, 0.0).unwrap();
        s.submit("definitely-not-a-term", 100.0);
        let fb = s.snapshot(100.0).feedback.unwrap();
        assert_eq!(fb.class, "incorrect");
        assert!(fb.opacity > 0.99);
        s.update(5100.0);
        assert!(s.snapshot(5100.0).feedback.is_none());
        assert!(s.state().feedback.is_none());
    }
}
