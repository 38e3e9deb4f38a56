//! Session transitions
//!
//! One function per schedule (fall tick, countdown, speed ramp) plus the
//! lifecycle transitions. Each is a no-op outside the phase it applies to.

use rand::Rng;
use rand::seq::SliceRandom;

use super::state::{GameEvent, GameMode, GamePhase, GameState};
use crate::consts::TICK_MS;
use crate::error::GameError;
use crate::words::WordEntry;

/// Begin a new session (also used for restart from Over)
pub fn start<R: Rng + ?Sized>(
    state: &mut GameState,
    mut pool: Vec<WordEntry>,
    mode: GameMode,
    rng: &mut R,
    now_ms: f64,
) -> Result<(), GameError> {
    if pool.is_empty() {
        return Err(GameError::EmptyPool);
    }
    if matches!(state.phase, GamePhase::Running | GamePhase::Paused) {
        return Err(GameError::SessionActive);
    }

    pool.shuffle(rng);

    if state.phase == GamePhase::Over {
        state.set_phase(GamePhase::Idle);
    }
    state.mode = mode;
    state.pool = pool;
    state.spawn_cursor = 0;
    state.words.clear();
    state.score = 0;
    state.lives = state.start_lives;
    state.time_remaining = state.timed_budget_secs;
    state.fall_speed = mode.tuning().initial_fall_speed;
    state.ramp_steps = 0;
    state.last_answer_ms = None;
    state.last_spawn_ms = None;
    state.paused_at_ms = None;
    state.input.clear();
    state.feedback = None;
    state.stats = Default::default();

    log::info!(
        "Session started: mode={}, words={}, t={:.0}",
        mode.as_str(),
        state.pool.len(),
        now_ms
    );
    state.set_phase(GamePhase::Running);
    Ok(())
}

/// Advance all falling words by `delta_ms` and resolve misses
pub fn tick(state: &mut GameState, delta_ms: f64) {
    if !state.is_running() {
        return;
    }

    let scale = (delta_ms.max(0.0) / TICK_MS) as f32;
    for word in &mut state.words {
        word.fall(scale);
    }

    let missed: Vec<u32> = state
        .words
        .iter()
        .filter(|w| w.crossed(&state.viewport, state.miss_margin))
        .map(|w| w.id)
        .collect();

    let uses_lives = state.mode.uses_lives();
    for id in missed {
        let Some(word) = state.take_word(id) else {
            continue;
        };
        state.stats.missed += 1;
        if uses_lives {
            state.lives = state.lives.saturating_sub(1);
        }
        log::debug!("Missed '{}' (lives {})", word.term, state.lives);
        state.events.push(GameEvent::Missed {
            id: word.id,
            term: word.term,
        });
    }

    // Lives first; completion is only considered for a session still running
    if uses_lives && state.lives == 0 {
        finish(state);
        return;
    }
    check_completion(state);
}

/// Timed mode countdown, once per second
pub fn advance_timer(state: &mut GameState) {
    if !state.is_running() || state.mode != GameMode::Timed {
        return;
    }
    state.time_remaining = state.time_remaining.saturating_sub(1);
    state.events.push(GameEvent::TimeTick {
        remaining: state.time_remaining,
    });
    if state.time_remaining == 0 {
        finish(state);
    }
}

/// ClassicHard speed ramp. Already falling words keep their position and
/// take the new speed.
pub fn ramp_speed(state: &mut GameState) {
    if !state.is_running() {
        return;
    }
    let tuning = state.mode.tuning();
    let Some(ramp) = tuning.ramp else {
        return;
    };
    if state.fall_speed >= ramp.max_speed {
        return;
    }

    state.ramp_steps += 1;
    let speed = (tuning.initial_fall_speed + ramp.increment * state.ramp_steps as f32)
        .min(ramp.max_speed);
    state.fall_speed = speed;
    for word in &mut state.words {
        word.fall_speed = speed;
    }
    state.events.push(GameEvent::SpeedChanged { speed });
}

/// Running -> Paused. Returns true if the phase changed.
pub fn pause(state: &mut GameState, now_ms: f64) -> bool {
    if state.phase != GamePhase::Running {
        return false;
    }
    state.paused_at_ms = Some(now_ms);
    state.set_phase(GamePhase::Paused);
    true
}

/// Paused -> Running. Returns true if the phase changed.
///
/// The spawn timestamp is shifted by the paused duration and the answer
/// cooldown restarts at `now_ms`.
pub fn resume(state: &mut GameState, now_ms: f64) -> bool {
    if state.phase != GamePhase::Paused {
        return false;
    }
    let paused_for = state
        .paused_at_ms
        .take()
        .map(|t| (now_ms - t).max(0.0))
        .unwrap_or(0.0);
    state.last_spawn_ms = state.last_spawn_ms.map(|t| t + paused_for);
    state.last_answer_ms = Some(now_ms);
    state.set_phase(GamePhase::Running);
    true
}

/// End a fixed-pool session once every word has been resolved.
/// Returns true if the session ended.
pub fn check_completion(state: &mut GameState) -> bool {
    if !state.is_running() || state.mode.tuning().cyclic_pool {
        return false;
    }
    if state.spawn_cursor >= state.pool.len() && state.words.is_empty() {
        log::info!("Word list cleared: {}", state.score_label());
        finish(state);
        return true;
    }
    false
}

/// Force the session to Over. Returns true if it was running or paused.
pub fn end(state: &mut GameState) -> bool {
    if !matches!(state.phase, GamePhase::Running | GamePhase::Paused) {
        return false;
    }
    finish(state);
    true
}

/// Back to the menu from any phase
pub fn return_to_menu(state: &mut GameState) {
    state.words.clear();
    state.input.clear();
    state.feedback = None;
    state.paused_at_ms = None;
    state.set_phase(GamePhase::Idle);
}

fn finish(state: &mut GameState) {
    state.paused_at_ms = None;
    log::info!(
        "Session over: mode={}, score={}, lives={}, time={}s",
        state.mode.as_str(),
        state.score_label(),
        state.lives,
        state.time_remaining
    );
    state.set_phase(GamePhase::Over);
}
