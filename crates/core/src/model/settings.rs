use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("session size must be > 0")]
    InvalidSessionSize,

    #[error("unanswered share must be in [0, 1], got {0}")]
    InvalidUnansweredShare(f64),

    #[error("sampling weights must stay positive (base {base}, slope {slope})")]
    InvalidWeights { base: f64, slope: f64 },

    #[error("weak accuracy threshold must be in (0, 1], got {0}")]
    InvalidWeakThreshold(f64),

    #[error("default tolerance must be finite and >= 0, got {0}")]
    InvalidTolerance(f64),

    #[error("fetch page size must be > 0")]
    InvalidPageSize,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Tuning knobs for session assembly and answer checking.
///
/// The defaults are product-tuned values:
/// - 20 questions per session
/// - 70% of slots reserved for unseen questions
/// - weight `3.0 - accuracy * 2.5` for previously answered questions
/// - a topic is weak with at least 3 attempts below 60% accuracy
/// - numeric answers accepted within 0.001 unless the question says otherwise
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeSettings {
    session_size: usize,
    unanswered_share: f64,
    weight_base: f64,
    weight_slope: f64,
    weak_min_attempts: u32,
    weak_accuracy_threshold: f64,
    default_tolerance: f64,
    fetch_page_size: usize,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            session_size: 20,
            unanswered_share: 0.7,
            weight_base: 3.0,
            weight_slope: 2.5,
            weak_min_attempts: 3,
            weak_accuracy_threshold: 0.6,
            default_tolerance: 0.001,
            fetch_page_size: 100,
        }
    }
}

impl PracticeSettings {
    /// Creates custom settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when a value is out of range, including weight
    /// pairs that would give a fully mastered question a non-positive weight.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_size: usize,
        unanswered_share: f64,
        weight_base: f64,
        weight_slope: f64,
        weak_min_attempts: u32,
        weak_accuracy_threshold: f64,
        default_tolerance: f64,
        fetch_page_size: usize,
    ) -> Result<Self, SettingsError> {
        if session_size == 0 {
            return Err(SettingsError::InvalidSessionSize);
        }
        if !unanswered_share.is_finite() || !(0.0..=1.0).contains(&unanswered_share) {
            return Err(SettingsError::InvalidUnansweredShare(unanswered_share));
        }
        if !weight_base.is_finite()
            || !weight_slope.is_finite()
            || weight_slope < 0.0
            || weight_base - weight_slope <= 0.0
        {
            return Err(SettingsError::InvalidWeights {
                base: weight_base,
                slope: weight_slope,
            });
        }
        if !weak_accuracy_threshold.is_finite()
            || weak_accuracy_threshold <= 0.0
            || weak_accuracy_threshold > 1.0
        {
            return Err(SettingsError::InvalidWeakThreshold(weak_accuracy_threshold));
        }
        if !default_tolerance.is_finite() || default_tolerance < 0.0 {
            return Err(SettingsError::InvalidTolerance(default_tolerance));
        }
        if fetch_page_size == 0 {
            return Err(SettingsError::InvalidPageSize);
        }

        Ok(Self {
            session_size,
            unanswered_share,
            weight_base,
            weight_slope,
            weak_min_attempts,
            weak_accuracy_threshold,
            default_tolerance,
            fetch_page_size,
        })
    }

    #[must_use]
    pub fn session_size(&self) -> usize {
        self.session_size
    }

    #[must_use]
    pub fn unanswered_share(&self) -> f64 {
        self.unanswered_share
    }

    #[must_use]
    pub fn weight_base(&self) -> f64 {
        self.weight_base
    }

    #[must_use]
    pub fn weight_slope(&self) -> f64 {
        self.weight_slope
    }

    #[must_use]
    pub fn weak_min_attempts(&self) -> u32 {
        self.weak_min_attempts
    }

    #[must_use]
    pub fn weak_accuracy_threshold(&self) -> f64 {
        self.weak_accuracy_threshold
    }

    #[must_use]
    pub fn default_tolerance(&self) -> f64 {
        self.default_tolerance
    }

    #[must_use]
    pub fn fetch_page_size(&self) -> usize {
        self.fetch_page_size
    }
}

/// Partially specified settings, as read from a config file or environment.
///
/// Missing fields fall back to [`PracticeSettings::default`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsDraft {
    pub session_size: Option<usize>,
    pub unanswered_share: Option<f64>,
    pub weight_base: Option<f64>,
    pub weight_slope: Option<f64>,
    pub weak_min_attempts: Option<u32>,
    pub weak_accuracy_threshold: Option<f64>,
    pub default_tolerance: Option<f64>,
    pub fetch_page_size: Option<usize>,
}

impl SettingsDraft {
    /// Overlays `other` on top of `self`; fields set in `other` win.
    #[must_use]
    pub fn merge(self, other: SettingsDraft) -> Self {
        Self {
            session_size: other.session_size.or(self.session_size),
            unanswered_share: other.unanswered_share.or(self.unanswered_share),
            weight_base: other.weight_base.or(self.weight_base),
            weight_slope: other.weight_slope.or(self.weight_slope),
            weak_min_attempts: other.weak_min_attempts.or(self.weak_min_attempts),
            weak_accuracy_threshold: other
                .weak_accuracy_threshold
                .or(self.weak_accuracy_threshold),
            default_tolerance: other.default_tolerance.or(self.default_tolerance),
            fetch_page_size: other.fetch_page_size.or(self.fetch_page_size),
        }
    }

    /// Fills gaps from the defaults and validates the result.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the combined values are invalid.
    pub fn validate(self) -> Result<PracticeSettings, SettingsError> {
        let defaults = PracticeSettings::default();
        PracticeSettings::new(
            self.session_size.unwrap_or(defaults.session_size),
            self.unanswered_share.unwrap_or(defaults.unanswered_share),
            self.weight_base.unwrap_or(defaults.weight_base),
            self.weight_slope.unwrap_or(defaults.weight_slope),
            self.weak_min_attempts.unwrap_or(defaults.weak_min_attempts),
            self.weak_accuracy_threshold
                .unwrap_or(defaults.weak_accuracy_threshold),
            self.default_tolerance.unwrap_or(defaults.default_tolerance),
            self.fetch_page_size.unwrap_or(defaults.fetch_page_size),
        )
    }
}
