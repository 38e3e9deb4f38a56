//! Typefall - a falling-definitions typing study game
//!
//! Core modules:
//! - `sim`: Deterministic session rules (spawn, fall, match, countdown, ramp)
//! - `scheduler`: The active-timers set driven by the host clock
//! - `session`: Glue between state, timers, RNG and the word library
//! - `words`: Default word pool and uploaded word-list ingestion
//! - `settings`: Player/host configuration
//! - `tuning`: Data-driven per-mode balance

pub mod error;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod sim;
pub mod tuning;
pub mod words;

pub use error::GameError;
pub use session::{Command, Session, Snapshot};
pub use settings::{Settings, Viewport};
pub use sim::{GameMode, GamePhase};
pub use words::WordEntry;

/// Game configuration constants
pub mod consts {
    /// Nominal fall tick period (ms). Fall speeds are expressed per tick.
    pub const TICK_MS: f64 = 16.0;

    /// Distance above the viewport bottom where a definition counts as missed
    pub const MISS_MARGIN: f32 = 60.0;

    /// Lives at the start of a Classic/ClassicHard session
    pub const START_LIVES: u8 = 3;
    /// Countdown budget of a Timed session (seconds)
    pub const TIMED_BUDGET_SECS: u32 = 60;
    /// Countdown period (ms)
    pub const COUNTDOWN_MS: f64 = 1000.0;

    /// Minimum gap after an accepted answer (or a spawn) before the next spawn
    pub const SPAWN_COOLDOWN_MS: f64 = 500.0;

    /// Feedback stays fully visible this long, then fades
    pub const FEEDBACK_FADE_MS: f64 = 4500.0;
    /// Feedback is cleared after this long
    pub const FEEDBACK_CLEAR_MS: f64 = 5000.0;

    /// Maximum timer callbacks processed per host update (prevents spiral of death)
    pub const MAX_CALLBACKS_PER_UPDATE: usize = 512;
}
