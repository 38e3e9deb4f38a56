//! Matching typed answers against falling definitions

use super::state::{Feedback, FeedbackKind, GameEvent, GameState};
use super::tick::check_completion;

/// Result of evaluating one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The session wasn't accepting input
    Ignored,
    /// A falling word was answered and removed
    Matched { id: u32 },
    /// Nothing matched; `expected` names the most urgent term, if any
    Incorrect { expected: Option<String> },
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Evaluate `raw` against the active words. Outside a running session this
/// is a no-op; otherwise the input buffer is cleared whatever the outcome.
pub fn submit(state: &mut GameState, raw: &str, now_ms: f64) -> SubmitOutcome {
    if !state.is_running() {
        return SubmitOutcome::Ignored;
    }
    state.input.clear();

    let answer = normalize(raw);
    let hit = state
        .words
        .iter()
        .find(|w| normalize(&w.term) == answer)
        .map(|w| w.id);

    if let Some(word) = hit.and_then(|id| state.take_word(id)) {
        state.score += 1;
        state.stats.matched += 1;
        state.last_answer_ms = Some(now_ms);
        state.feedback = Some(Feedback::new("Correct!", FeedbackKind::Correct, now_ms));
        state.events.push(GameEvent::Matched {
            id: word.id,
            term: word.term,
        });
        check_completion(state);
        return SubmitOutcome::Matched { id: word.id };
    }

    let expected = state
        .words
        .iter()
        .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
        .map(|w| w.term.clone());
    let text = match &expected {
        Some(term) => format!("Incorrect! Answer: {}", term),
        None => "Incorrect!".to_string(),
    };
    state.stats.wrong_submissions += 1;
    state.feedback = Some(Feedback::new(text, FeedbackKind::Incorrect, now_ms));
    state.events.push(GameEvent::Incorrect {
        expected: expected.clone(),
    });
    SubmitOutcome::Incorrect { expected }
}

/// Append a typed character to the input buffer
pub fn push_char(state: &mut GameState, ch: char) {
    if state.is_running() && !ch.is_control() {
        state.input.push(ch);
    }
}

pub fn backspace(state: &mut GameState) {
    if state.is_running() {
        state.input.pop();
    }
}

/// Replace the input buffer (hosts that own a text field)
pub fn set_input(state: &mut GameState, text: &str) {
    if state.is_running() {
        state.input.clear();
        state.input.push_str(text);
    }
}

/// Submit whatever is in the input buffer
pub fn submit_buffer(state: &mut GameState, now_ms: f64) -> SubmitOutcome {
    if !state.is_running() {
        return SubmitOutcome::Ignored;
    }
    let raw = std::mem::take(&mut state.input);
    submit(state, &raw, now_ms)
}
