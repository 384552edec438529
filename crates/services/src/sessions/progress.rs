/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub correct: u32,
    pub streak: u32,
    pub is_complete: bool,
}

impl SessionProgress {
    /// One-based position of the question on screen, capped at `total`.
    #[must_use]
    pub fn position(&self) -> usize {
        (self.answered + 1).min(self.total)
    }
}
