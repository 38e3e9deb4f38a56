//! Deterministic session rules
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time comes in as arguments, never from a clock
//! - Randomness only through a caller-supplied `Rng`
//! - Stable iteration order (spawn order)
//! - No rendering or platform dependencies

pub mod input;
pub mod spawn;
pub mod state;
pub mod tick;

pub use input::{SubmitOutcome, backspace, push_char, set_input, submit, submit_buffer};
pub use spawn::{SpawnOutcome, cooldown_remaining, roll_spawn_interval, spawn};
pub use state::{
    FallingWord, Feedback, FeedbackKind, GameEvent, GameMode, GamePhase, GameState, SessionStats,
};
pub use tick::{
    advance_timer, check_completion, end, pause, ramp_speed, resume, return_to_menu, start, tick,
};
