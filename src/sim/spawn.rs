//! Spawning definitions from the pool

use glam::Vec2;
use rand::Rng;

use super::state::{FallingWord, GameEvent, GameState};
use crate::consts::SPAWN_COOLDOWN_MS;
use crate::sim::GameMode;

/// What a spawn attempt did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnOutcome {
    /// A new word entered the field
    Spawned { id: u32 },
    /// Too soon after an answer or the previous spawn; try again later
    CoolingDown { retry_in_ms: f64 },
    /// Fixed pool used up
    Exhausted,
    /// Session not running
    Inactive,
}

/// Time left (ms) before the spawn gate opens
pub fn cooldown_remaining(state: &GameState, now_ms: f64) -> f64 {
    [state.last_answer_ms, state.last_spawn_ms]
        .into_iter()
        .flatten()
        .map(|t| t + SPAWN_COOLDOWN_MS - now_ms)
        .fold(0.0, f64::max)
}

/// Roll the delay until the next scheduled spawn
pub fn roll_spawn_interval<R: Rng + ?Sized>(mode: GameMode, rng: &mut R) -> f64 {
    let (lo, hi) = mode.tuning().spawn_interval_ms;
    rng.random_range(lo..=hi)
}

/// Try to put the next pool entry into play
pub fn spawn<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R, now_ms: f64) -> SpawnOutcome {
    if !state.is_running() {
        return SpawnOutcome::Inactive;
    }
    if !state.can_spawn_more() {
        return SpawnOutcome::Exhausted;
    }

    let wait = cooldown_remaining(state, now_ms);
    if wait > 0.0 {
        return SpawnOutcome::CoolingDown { retry_in_ms: wait };
    }

    let entry = state.pool[state.spawn_cursor].clone();
    state.spawn_cursor = if state.mode.tuning().cyclic_pool {
        (state.spawn_cursor + 1) % state.pool.len()
    } else {
        state.spawn_cursor + 1
    };

    let max_x = state.viewport.max_x();
    let x = if max_x > 0.0 {
        rng.random_range(0.0..=max_x)
    } else {
        0.0
    };

    let id = state.next_entity_id();
    state.words.push(FallingWord {
        id,
        term: entry.term.clone(),
        definition: entry.definition,
        pos: Vec2::new(x, 0.0),
        fall_speed: state.fall_speed,
    });
    state.last_spawn_ms = Some(now_ms);
    state.stats.spawned += 1;
    state.events.push(GameEvent::Spawned {
        id,
        term: entry.term,
    });

    SpawnOutcome::Spawned { id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::{GamePhase, start};
    use crate::words::WordEntry;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn running(mode: GameMode, terms: &[&str]) -> (GameState, Pcg32) {
        let mut rng = Pcg32::seed_from_u64(42);
        let mut state = GameState::new(&Settings::default());
        let pool = terms.iter().map(|t| WordEntry::new(*t, "def")).collect();
        start(&mut state, pool, mode, &mut rng, 0.0).unwrap();
        (state, rng)
    }

    #[test]
    fn test_spawn_places_word_inside_viewport() {
        let (mut state, mut rng) = running(GameMode::Classic, &["a", "b", "c"]);
        for i in 0..3 {
            let outcome = spawn(&mut state, &mut rng, i as f64 * 1000.0);
            assert!(matches!(outcome, SpawnOutcome::Spawned { .. }));
        }
        for word in &state.words {
            assert_eq!(word.pos.y, 0.0);
            assert!(word.pos.x >= 0.0 && word.pos.x <= state.viewport.max_x());
            assert_eq!(word.fall_speed, state.fall_speed);
        }
        assert_eq!(state.spawn_cursor, 3);
    }

    #[test]
    fn test_spawn_respects_cooldowns() {
        let (mut state, mut rng) = running(GameMode::Classic, &["a", "b"]);
        assert!(matches!(spawn(&mut state, &mut rng, 0.0), SpawnOutcome::Spawned { .. }));
        match spawn(&mut state, &mut rng, 200.0) {
            SpawnOutcome::CoolingDown { retry_in_ms } => assert!((retry_in_ms - 300.0).abs() < 1e-9),
            other => panic!("expected cooldown, got {:?}", other),
        }

        state.last_answer_ms = Some(900.0);
        assert!(matches!(
            spawn(&mut state, &mut rng, 1000.0),
            SpawnOutcome::CoolingDown { .. }
        ));
        assert!(matches!(spawn(&mut state, &mut rng, 1400.0), SpawnOutcome::Spawned { .. }));
    }

    #[test]
    fn test_classic_pool_exhausts() {
        let (mut state, mut rng) = running(GameMode::Classic, &["only"]);
        assert!(matches!(spawn(&mut state, &mut rng, 0.0), SpawnOutcome::Spawned { .. }));
        assert_eq!(spawn(&mut state, &mut rng, 10_000.0), SpawnOutcome::Exhausted);
        assert_eq!(state.words.len(), 1);
    }

    #[test]
    fn test_timed_pool_wraps() {
        let (mut state, mut rng) = running(GameMode::Timed, &["a", "b"]);
        for i in 0..5 {
            assert!(matches!(
                spawn(&mut state, &mut rng, i as f64 * 1000.0),
                SpawnOutcome::Spawned { .. }
            ));
            assert!(state.spawn_cursor < state.pool.len());
        }
        assert_eq!(state.words.len(), 5);
    }

    #[test]
    fn test_spawn_inactive_when_not_running() {
        let (mut state, mut rng) = running(GameMode::Classic, &["a"]);
        state.phase = GamePhase::Paused;
        assert_eq!(spawn(&mut state, &mut rng, 0.0), SpawnOutcome::Inactive);
        assert!(state.words.is_empty());
    }

    #[test]
    fn test_spawn_interval_ranges() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..200 {
            let classic = roll_spawn_interval(GameMode::Classic, &mut rng);
            assert!((5000.0..=8000.0).contains(&classic));
            let hard = roll_spawn_interval(GameMode::ClassicHard, &mut rng);
            assert!((2500.0..=4500.0).contains(&hard));
        }
    }
}
