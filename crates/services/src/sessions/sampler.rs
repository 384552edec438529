use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use tutor_core::model::{PracticeSettings, Question};

use super::history::HistoryIndex;

/// Guards `ceil` against products like `0.7 * 10` landing a hair above an integer.
const SHARE_EPSILON: f64 = 1e-9;

/// Ordered question list for a session, with selection counts.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePlan {
    pub questions: Vec<Question>,
    pub unanswered_selected: usize,
    pub weighted_selected: usize,
}

impl SamplePlan {
    /// Total number of questions in this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Picks a session's questions from a candidate pool.
///
/// Unseen questions fill most slots; the rest are drawn from previously
/// answered questions with a weight that grows as accuracy drops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmartSampler {
    unanswered_share: f64,
    weight_base: f64,
    weight_slope: f64,
}

impl Default for SmartSampler {
    fn default() -> Self {
        Self::from_settings(&PracticeSettings::default())
    }
}

impl SmartSampler {
    #[must_use]
    pub fn from_settings(settings: &PracticeSettings) -> Self {
        Self {
            unanswered_share: settings.unanswered_share(),
            weight_base: settings.weight_base(),
            weight_slope: settings.weight_slope(),
        }
    }

    /// Selection weight for a question answered with `accuracy` in `[0, 1]`.
    ///
    /// With the default constants this runs from 3.0 at 0% to 0.5 at 100%.
    #[must_use]
    pub fn weight(&self, accuracy: f64) -> f64 {
        self.weight_base - accuracy.clamp(0.0, 1.0) * self.weight_slope
    }

    /// Number of slots reserved for unseen questions in a session of `target`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn unanswered_slots(&self, target: usize) -> usize {
        let slots = (target as f64 * self.unanswered_share - SHARE_EPSILON).ceil();
        if slots <= 0.0 { 0 } else { slots as usize }
    }

    /// Build the ordered session list from `pool`.
    ///
    /// - A pool no larger than `target` is returned whole, shuffled.
    /// - Otherwise unseen questions take up to `ceil(target * share)` slots.
    /// - Remaining slots are drawn without replacement from answered questions,
    ///   weighted toward low accuracy.
    /// - If answered questions run out, leftover unseen questions fill the gap.
    /// - The combined list is shuffled so unseen items are not clustered.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        pool: Vec<Question>,
        history: &HistoryIndex,
        target: usize,
        rng: &mut R,
    ) -> SamplePlan {
        if pool.len() <= target {
            let unanswered = pool
                .iter()
                .filter(|q| history.is_unanswered(q.id()))
                .count();
            let plan = SamplePlan {
                weighted_selected: 0,
                unanswered_selected: unanswered,
                questions: self.shuffle_all(pool, rng),
            };
            debug!(total = plan.total(), "pool fits target; taking everything");
            return plan;
        }

        let (mut unanswered, answered): (Vec<Question>, Vec<Question>) = pool
            .into_iter()
            .partition(|q| history.is_unanswered(q.id()));

        unanswered.shuffle(rng);
        let unanswered_take = self.unanswered_slots(target).min(unanswered.len());
        let mut leftover = unanswered.split_off(unanswered_take);
        let mut selected = unanswered;
        let unanswered_selected = selected.len();

        let remaining = target.saturating_sub(selected.len());
        let weighted = self.draw_weighted(answered, history, remaining, rng);
        let weighted_selected = weighted.len();
        selected.extend(weighted);

        let shortfall = target.saturating_sub(selected.len());
        let top_up = shortfall.min(leftover.len());
        selected.extend(leftover.drain(..top_up));

        selected.shuffle(rng);
        debug!(
            total = selected.len(),
            unanswered = unanswered_selected + top_up,
            weighted = weighted_selected,
            "session sampled"
        );

        SamplePlan {
            questions: selected,
            unanswered_selected: unanswered_selected + top_up,
            weighted_selected,
        }
    }

    /// Random order of the whole pool, no weighting.
    pub fn shuffle_all<R: Rng + ?Sized>(&self, mut pool: Vec<Question>, rng: &mut R) -> Vec<Question> {
        pool.shuffle(rng);
        pool
    }

    /// Roulette-wheel selection without replacement.
    fn draw_weighted<R: Rng + ?Sized>(
        &self,
        answered: Vec<Question>,
        history: &HistoryIndex,
        count: usize,
        rng: &mut R,
    ) -> Vec<Question> {
        let mut candidates: Vec<(Question, f64)> = answered
            .into_iter()
            .map(|q| {
                let accuracy = history.accuracy(q.id()).unwrap_or(0.0);
                let weight = self.weight(accuracy);
                (q, weight)
            })
            .collect();

        let mut picked = Vec::with_capacity(count.min(candidates.len()));
        while picked.len() < count && !candidates.is_empty() {
            let total: f64 = candidates.iter().map(|(_, w)| w).sum();
            let index = if total.is_finite() && total > 0.0 {
                let roll = rng.random_range(0.0..total);
                let mut cumulative = 0.0;
                candidates
                    .iter()
                    .position(|(_, weight)| {
                        cumulative += weight;
                        cumulative > roll
                    })
                    .unwrap_or(candidates.len() - 1)
            } else {
                rng.random_range(0..candidates.len())
            };
            let (question, _) = candidates.remove(index);
            picked.push(question);
        }
        picked
    }
}
