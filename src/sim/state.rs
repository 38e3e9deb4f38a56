//! Session state and core simulation types
//!
//! Everything the presentation layer needs to draw lives here.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{FEEDBACK_CLEAR_MS, FEEDBACK_FADE_MS};
use crate::settings::{Settings, Viewport};
use crate::tuning::ModeTuning;
use crate::words::WordEntry;

/// Game mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameMode {
    /// Fixed pool, lives-based
    #[default]
    Classic,
    /// Classic with a shorter spawn interval and a fall speed ramp
    ClassicHard,
    /// Countdown-based, no lives, pool reused cyclically
    Timed,
}

impl GameMode {
    pub const ALL: [GameMode; 3] = [GameMode::Classic, GameMode::ClassicHard, GameMode::Timed];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Classic => "Classic",
            GameMode::ClassicHard => "Classic (Hard)",
            GameMode::Timed => "Timed",
        }
    }

    /// Stable lowercase identifier, accepted by `from_str`
    pub fn key(&self) -> &'static str {
        match self {
            GameMode::Classic => "classic",
            GameMode::ClassicHard => "classic-hard",
            GameMode::Timed => "timed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "classic" => Some(GameMode::Classic),
            "classic-hard" | "classichard" | "hard" => Some(GameMode::ClassicHard),
            "timed" | "time" => Some(GameMode::Timed),
            _ => None,
        }
    }

    pub fn tuning(&self) -> &'static ModeTuning {
        ModeTuning::for_mode(*self)
    }

    pub fn uses_lives(&self) -> bool {
        self.tuning().uses_lives
    }
}

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Menu, no session
    Idle,
    /// Definitions falling, input accepted
    Running,
    /// Everything frozen
    Paused,
    /// Session ended (out of lives, out of time, or list cleared)
    Over,
}

/// A definition currently falling, bound to its target term
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallingWord {
    pub id: u32,
    pub term: String,
    pub definition: String,
    /// x = horizontal offset, y = vertical offset of the top edge
    pub pos: Vec2,
    /// Pixels per nominal tick
    pub fall_speed: f32,
}

impl FallingWord {
    /// Advance by `scale` nominal ticks
    pub fn fall(&mut self, scale: f32) {
        self.pos.y += self.fall_speed * scale;
    }

    /// Whether the bottom edge reached the miss boundary
    pub fn crossed(&self, viewport: &Viewport, miss_margin: f32) -> bool {
        self.pos.y + viewport.entity_height >= viewport.height - miss_margin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Correct,
    Incorrect,
}

impl FeedbackKind {
    /// CSS class used by the presentation layer
    pub fn class(&self) -> &'static str {
        match self {
            FeedbackKind::Correct => "correct",
            FeedbackKind::Incorrect => "incorrect",
        }
    }
}

/// Result message of the last submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub text: String,
    pub kind: FeedbackKind,
    pub shown_at_ms: f64,
}

impl Feedback {
    pub fn new(text: impl Into<String>, kind: FeedbackKind, now_ms: f64) -> Self {
        Self {
            text: text.into(),
            kind,
            shown_at_ms: now_ms,
        }
    }

    /// 1.0 until the fade starts, linear down to 0.0 at clear time
    pub fn opacity(&self, now_ms: f64) -> f32 {
        let age = now_ms - self.shown_at_ms;
        if age <= FEEDBACK_FADE_MS {
            1.0
        } else if age >= FEEDBACK_CLEAR_MS {
            0.0
        } else {
            (1.0 - (age - FEEDBACK_FADE_MS) / (FEEDBACK_CLEAR_MS - FEEDBACK_FADE_MS)) as f32
        }
    }

    pub fn expired(&self, now_ms: f64) -> bool {
        now_ms - self.shown_at_ms >= FEEDBACK_CLEAR_MS
    }
}

/// Things that happened during a transition, drained by the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PhaseChanged { from: GamePhase, to: GamePhase },
    Spawned { id: u32, term: String },
    Matched { id: u32, term: String },
    Missed { id: u32, term: String },
    Incorrect { expected: Option<String> },
    TimeTick { remaining: u32 },
    SpeedChanged { speed: f32 },
}

/// Per-session counters (not gameplay-affecting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub matched: u32,
    pub missed: u32,
    pub wrong_submissions: u32,
    pub spawned: u32,
}

/// Complete session state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub mode: GameMode,
    pub phase: GamePhase,
    pub score: u32,
    /// Only meaningful in lives-based modes
    pub lives: u8,
    /// Only meaningful in Timed mode (seconds)
    pub time_remaining: u32,
    /// Global fall speed given to new spawns
    pub fall_speed: f32,
    /// Number of ramp steps applied this session
    pub ramp_steps: u32,
    /// Active definitions in spawn order
    pub words: Vec<FallingWord>,
    /// Session copy of the word pool (shuffled at start)
    pub pool: Vec<WordEntry>,
    /// Index of the next pool entry to spawn
    pub spawn_cursor: usize,
    /// Wall clock of the last accepted answer (or resume)
    pub last_answer_ms: Option<f64>,
    /// Wall clock of the last spawn (re-based across pauses)
    pub last_spawn_ms: Option<f64>,
    /// Wall clock when the current pause began
    pub paused_at_ms: Option<f64>,
    pub viewport: Viewport,
    pub miss_margin: f32,
    pub start_lives: u8,
    pub timed_budget_secs: u32,
    /// Text typed but not yet submitted
    pub input: String,
    pub feedback: Option<Feedback>,
    pub stats: SessionStats,
    /// Pending events (drained by the session)
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Idle state configured from settings
    pub fn new(settings: &Settings) -> Self {
        let mode = settings.default_mode;
        Self {
            mode,
            phase: GamePhase::Idle,
            score: 0,
            lives: settings.start_lives,
            time_remaining: settings.timed_budget_secs,
            fall_speed: mode.tuning().initial_fall_speed,
            ramp_steps: 0,
            words: Vec::new(),
            pool: Vec::new(),
            spawn_cursor: 0,
            last_answer_ms: None,
            last_spawn_ms: None,
            paused_at_ms: None,
            viewport: settings.viewport,
            miss_margin: settings.miss_margin,
            start_lives: settings.start_lives,
            timed_budget_secs: settings.timed_budget_secs,
            input: String::new(),
            feedback: None,
            stats: SessionStats::default(),
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Change phase, recording the transition
    pub fn set_phase(&mut self, to: GamePhase) {
        let from = self.phase;
        if from != to {
            self.phase = to;
            self.events.push(GameEvent::PhaseChanged { from, to });
        }
    }

    /// Remove an active word by identity.
    ///
    /// Both matching and miss detection go through here, so a word is
    /// resolved at most once.
    pub fn take_word(&mut self, id: u32) -> Option<FallingWord> {
        let index = self.words.iter().position(|w| w.id == id)?;
        Some(self.words.remove(index))
    }

    /// Whether the spawn cursor can still produce a word
    pub fn can_spawn_more(&self) -> bool {
        if self.pool.is_empty() {
            return false;
        }
        self.mode.tuning().cyclic_pool || self.spawn_cursor < self.pool.len()
    }

    /// Score as displayed: `score/pool` in fixed-pool modes
    pub fn score_label(&self) -> String {
        if self.mode.tuning().cyclic_pool {
            self.score.to_string()
        } else {
            format!("{}/{}", self.score, self.pool.len())
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == GamePhase::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_word_is_identity_based() {
        let mut state = GameState::new(&Settings::default());
        for term in ["a", "b"] {
            let id = state.next_entity_id();
            state.words.push(FallingWord {
                id,
                term: term.to_string(),
                definition: String::new(),
                pos: Vec2::ZERO,
                fall_speed: 1.0,
            });
        }
        let first = state.take_word(1).map(|w| w.term);
        assert_eq!(first.as_deref(), Some("a"));
        assert!(state.take_word(1).is_none());
        assert_eq!(state.words.len(), 1);
        assert_eq!(state.words[0].id, 2);
    }

    #[test]
    fn test_feedback_fades_then_expires() {
        let fb = Feedback::new("Correct!", FeedbackKind::Correct, 1000.0);
        assert_eq!(fb.opacity(1000.0), 1.0);
        assert_eq!(fb.opacity(5500.0), 1.0);
        let mid = fb.opacity(5750.0);
        assert!((mid - 0.5).abs() < 1e-4);
        assert!(!fb.expired(5999.0));
        assert!(fb.expired(6000.0));
        assert_eq!(fb.opacity(6000.0), 0.0);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(GameMode::from_str("Timed"), Some(GameMode::Timed));
        assert_eq!(GameMode::from_str("classic-hard"), Some(GameMode::ClassicHard));
        assert_eq!(GameMode::from_str("zen"), None);
        for mode in GameMode::ALL {
            assert_eq!(mode.uses_lives(), mode != GameMode::Timed);
            assert_eq!(GameMode::from_str(mode.key()), Some(mode));
        }
    }

    #[test]
    fn test_crossed_uses_bottom_edge() {
        let viewport = Viewport {
            width: 800.0,
            height: 600.0,
            entity_width: 200.0,
            entity_height: 40.0,
        };
        let mut word = FallingWord {
            id: 1,
            term: "t".into(),
            definition: "d".into(),
            pos: Vec2::new(0.0, 499.0),
            fall_speed: 1.0,
        };
        assert!(!word.crossed(&viewport, 60.0));
        word.fall(1.0);
        assert!(word.crossed(&viewport, 60.0));
    }
}
