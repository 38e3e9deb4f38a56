//! Data-driven game balance
//!
//! One table per mode. Fall speeds are pixels per nominal 16 ms tick.

use crate::sim::GameMode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeTuning {
    /// Fall speed at session start
    pub initial_fall_speed: f32,
    /// Spawn interval range (ms, inclusive)
    pub spawn_interval_ms: (f64, f64),
    /// Speed ramp (ClassicHard only)
    pub ramp: Option<SpeedRamp>,
    /// Whether misses cost a life
    pub uses_lives: bool,
    /// Whether the pool is reused cyclically
    pub cyclic_pool: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedRamp {
    pub interval_ms: f64,
    pub increment: f32,
    pub max_speed: f32,
}

const CLASSIC: ModeTuning = ModeTuning {
    initial_fall_speed: 0.5,
    spawn_interval_ms: (5000.0, 8000.0),
    ramp: None,
    uses_lives: true,
    cyclic_pool: false,
};

const CLASSIC_HARD: ModeTuning = ModeTuning {
    initial_fall_speed: 0.45,
    spawn_interval_ms: (2500.0, 4500.0),
    ramp: Some(SpeedRamp {
        interval_ms: 5000.0,
        increment: 0.15,
        max_speed: 2.3,
    }),
    uses_lives: true,
    cyclic_pool: false,
};

const TIMED: ModeTuning = ModeTuning {
    initial_fall_speed: 0.5,
    spawn_interval_ms: (5000.0, 8000.0),
    ramp: None,
    uses_lives: false,
    cyclic_pool: true,
};

impl ModeTuning {
    pub fn for_mode(mode: GameMode) -> &'static ModeTuning {
        match mode {
            GameMode::Classic => &CLASSIC,
            GameMode::ClassicHard => &CLASSIC_HARD,
            GameMode::Timed => &TIMED,
        }
    }
}
