//! Position evaluators used by the search.
//!
//! An [`Evaluator`] maps a position to a prior over every action index and a
//! value in `[-1, 1]` from Black's perspective. Finished positions never reach
//! a model: they evaluate to an empty policy and the exact result.
//!
//! [`ScoreEvaluator`] is a model-free baseline. [`BatchingEvaluator`] groups
//! concurrent requests from many search threads into batches for a
//! [`BatchModel`].

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::board::Color;
use crate::constants::{ACTION_SPACE, CELLS};
use crate::game::GameState;

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Prior per action index (`ACTION_SPACE` entries), empty for finished games.
    pub policy: Vec<f32>,
    /// Expected outcome from Black's perspective.
    pub value: f32,
}

impl Evaluation {
    /// Exact result of a finished game. Draws count as a White win.
    pub fn terminal(state: &GameState) -> Self {
        let value = if state.winner() == Some(Color::Black) { 1.0 } else { -1.0 };
        Self {
            policy: Vec::new(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("model failure: {0}")]
    Model(String),
    #[error("model returned {got} evaluations for a batch of {expected}")]
    BadBatch { expected: usize, got: usize },
    #[error("evaluator lock poisoned")]
    Poisoned,
    #[error("batch size must be at least 1")]
    ZeroBatch,
}

pub trait Evaluator: Send + Sync {
    fn evaluate(&self, state: &GameState) -> Result<Evaluation, EvalError>;
}

// =============================================================================
// Score baseline
// =============================================================================

/// Uniform policy and the normalised area score as value.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScoreEvaluator;

impl ScoreEvaluator {
    fn evaluate_live(state: &GameState) -> Evaluation {
        let max_score = CELLS as f32 + state.komi().abs();
        Evaluation {
            policy: vec![1.0 / ACTION_SPACE as f32; ACTION_SPACE],
            value: (state.score() / max_score).clamp(-1.0, 1.0),
        }
    }
}

impl Evaluator for ScoreEvaluator {
    fn evaluate(&self, state: &GameState) -> Result<Evaluation, EvalError> {
        if state.is_done() {
            return Ok(Evaluation::terminal(state));
        }
        Ok(Self::evaluate_live(state))
    }
}

impl BatchModel for ScoreEvaluator {
    fn evaluate_batch(&self, states: &[GameState]) -> Result<Vec<Evaluation>, EvalError> {
        Ok(states.iter().map(Self::evaluate_live).collect())
    }
}

// =============================================================================
// Batching
// =============================================================================

/// A model that evaluates many live positions in one call.
pub trait BatchModel: Send + Sync {
    fn evaluate_batch(&self, states: &[GameState]) -> Result<Vec<Evaluation>, EvalError>;
}

#[derive(Default)]
struct Queue {
    next_ticket: u64,
    pending: Vec<(u64, GameState)>,
    finished: FxHashMap<u64, Result<Evaluation, EvalError>>,
}

/// Collects requests until `batch_size` are waiting, then runs them together.
///
/// A caller whose request has been pending for `timeout` flushes the partial
/// batch itself, so a lone search thread never stalls. The queue lock is
/// released while the model runs.
pub struct BatchingEvaluator<M> {
    model: M,
    batch_size: usize,
    timeout: Duration,
    queue: Mutex<Queue>,
    ready: Condvar,
}

impl<M: BatchModel> BatchingEvaluator<M> {
    pub fn new(model: M, batch_size: usize, timeout: Duration) -> Result<Self, EvalError> {
        if batch_size == 0 {
            return Err(EvalError::ZeroBatch);
        }
        Ok(Self {
            model,
            batch_size,
            timeout,
            queue: Mutex::new(Queue::default()),
            ready: Condvar::new(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Queue>, EvalError> {
        self.queue.lock().map_err(|_| EvalError::Poisoned)
    }

    /// Run one batch and publish a result for every ticket in it.
    fn flush(&self, batch: Vec<(u64, GameState)>) -> Result<(), EvalError> {
        let (tickets, states): (Vec<u64>, Vec<GameState>) = batch.into_iter().unzip();
        debug!("evaluating batch of {}", states.len());

        let results: Vec<Result<Evaluation, EvalError>> = match self.model.evaluate_batch(&states)
        {
            Ok(evals) if evals.len() == tickets.len() => evals.into_iter().map(Ok).collect(),
            Ok(evals) => {
                let err = EvalError::BadBatch {
                    expected: tickets.len(),
                    got: evals.len(),
                };
                vec![Err(err); tickets.len()]
            }
            Err(e) => vec![Err(e); tickets.len()],
        };

        let mut queue = self.lock()?;
        queue.finished.extend(tickets.into_iter().zip(results));
        drop(queue);
        self.ready.notify_all();
        Ok(())
    }
}

impl<M: BatchModel> Evaluator for BatchingEvaluator<M> {
    fn evaluate(&self, state: &GameState) -> Result<Evaluation, EvalError> {
        if state.is_done() {
            return Ok(Evaluation::terminal(state));
        }

        let mut queue = self.lock()?;
        let ticket = queue.next_ticket;
        queue.next_ticket += 1;
        queue.pending.push((ticket, state.clone()));

        loop {
            if let Some(result) = queue.finished.remove(&ticket) {
                return result;
            }
            let waiting = queue.pending.iter().any(|&(t, _)| t == ticket);
            if waiting && queue.pending.len() >= self.batch_size {
                let batch = std::mem::take(&mut queue.pending);
                drop(queue);
                self.flush(batch)?;
                queue = self.lock()?;
                continue;
            }

            let (guard, wait) = self
                .ready
                .wait_timeout(queue, self.timeout)
                .map_err(|_| EvalError::Poisoned)?;
            queue = guard;
            if wait.timed_out() && queue.pending.iter().any(|&(t, _)| t == ticket) {
                warn!(
                    "flushing partial batch of {}/{} after {:?}",
                    queue.pending.len(),
                    self.batch_size,
                    self.timeout
                );
                let batch = std::mem::take(&mut queue.pending);
                drop(queue);
                self.flush(batch)?;
                queue = self.lock()?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingModel {
        calls: AtomicUsize,
        largest: AtomicUsize,
    }

    impl BatchModel for CountingModel {
        fn evaluate_batch(&self, states: &[GameState]) -> Result<Vec<Evaluation>, EvalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.largest.fetch_max(states.len(), Ordering::SeqCst);
            ScoreEvaluator.evaluate_batch(states)
        }
    }

    struct FailingModel;

    impl BatchModel for FailingModel {
        fn evaluate_batch(&self, _states: &[GameState]) -> Result<Vec<Evaluation>, EvalError> {
            Err(EvalError::Model("weights missing".into()))
        }
    }

    struct ShortModel;

    impl BatchModel for ShortModel {
        fn evaluate_batch(&self, _states: &[GameState]) -> Result<Vec<Evaluation>, EvalError> {
            Ok(Vec::new())
        }
    }

    fn finished_game() -> GameState {
        let mut state = GameState::new(7.5);
        state.play_move(Action::pass(Color::Black)).unwrap();
        state.play_move(Action::pass(Color::White)).unwrap();
        state
    }

    #[test]
    fn test_score_evaluator_empty_board() {
        let state = GameState::new(7.5);
        let eval = ScoreEvaluator.evaluate(&state).unwrap();
        assert_eq!(eval.policy.len(), ACTION_SPACE);
        let sum: f32 = eval.policy.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4, "policy sums to {sum}");
        let expected = -7.5 / (CELLS as f32 + 7.5);
        assert!((eval.value - expected).abs() < 1e-6);
    }

    #[test]
    fn test_terminal_shortcut() {
        let state = finished_game();
        let eval = ScoreEvaluator.evaluate(&state).unwrap();
        assert!(eval.policy.is_empty());
        assert_eq!(eval.value, -1.0);

        let batching =
            BatchingEvaluator::new(FailingModel, 4, Duration::from_millis(1)).unwrap();
        assert_eq!(batching.evaluate(&state).unwrap().value, -1.0);
    }

    #[test]
    fn test_zero_batch_rejected() {
        assert!(matches!(
            BatchingEvaluator::new(ScoreEvaluator, 0, Duration::from_millis(1)),
            Err(EvalError::ZeroBatch)
        ));
    }

    #[test]
    fn test_full_batch_runs_once() {
        let evaluator =
            BatchingEvaluator::new(CountingModel::default(), 4, Duration::from_secs(30)).unwrap();
        let state = GameState::new(7.5);
        let (evaluator_ref, state_ref) = (&evaluator, &state);
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(move || evaluator_ref.evaluate(state_ref)))
                .collect();
            for h in handles {
                let eval = h.join().unwrap().unwrap();
                assert_eq!(eval.policy.len(), ACTION_SPACE);
            }
        });
        assert_eq!(evaluator.model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(evaluator.model.largest.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_partial_batch_flushes_after_timeout() {
        let evaluator =
            BatchingEvaluator::new(CountingModel::default(), 8, Duration::from_millis(5)).unwrap();
        let eval = evaluator.evaluate(&GameState::new(7.5)).unwrap();
        assert_eq!(eval.policy.len(), ACTION_SPACE);
        assert_eq!(evaluator.model.largest.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_model_error_reaches_every_caller() {
        let evaluator = BatchingEvaluator::new(FailingModel, 2, Duration::from_secs(30)).unwrap();
        let state = GameState::new(7.5);
        std::thread::scope(|s| {
            let a = s.spawn(|| evaluator.evaluate(&state));
            let b = s.spawn(|| evaluator.evaluate(&state));
            for r in [a.join().unwrap(), b.join().unwrap()] {
                assert!(matches!(r, Err(EvalError::Model(_))));
            }
        });
    }

    #[test]
    fn test_short_batch_is_reported() {
        let evaluator = BatchingEvaluator::new(ShortModel, 1, Duration::from_millis(5)).unwrap();
        let err = evaluator.evaluate(&GameState::new(7.5)).unwrap_err();
        assert_eq!(err, EvalError::BadBatch { expected: 1, got: 0 });
    }
}
