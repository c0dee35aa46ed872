//! The shared, depleting time budget of one video request.

/// Seconds spent so far against an optional global ceiling.
///
/// `spent` only ever grows. The assembler works on a copy per chapter and
/// writes it back only when the chapter is kept, so a chapter that comes out
/// empty leaves the committed state untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetState {
    spent: f64,
    ceiling: Option<f64>,
}

impl BudgetState {
    /// Fresh budget; `None` means unbounded.
    pub fn new(max_total_duration: Option<f64>) -> Self {
        Self {
            spent: 0.0,
            ceiling: max_total_duration,
        }
    }

    pub fn spent(&self) -> f64 {
        self.spent
    }

    pub fn ceiling(&self) -> Option<f64> {
        self.ceiling
    }

    /// Seconds left before the ceiling, or `None` when unbounded.
    pub fn remaining(&self) -> Option<f64> {
        self.ceiling.map(|max| max - self.spent)
    }

    /// True once a bounded budget has nothing left.
    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_some_and(|r| r <= 0.0)
    }

    /// Whether `seconds` more still fits under the ceiling.
    pub fn fits(&self, seconds: f64) -> bool {
        self.ceiling.is_none_or(|max| self.spent + seconds <= max)
    }

    /// Record `seconds` of output. Negative amounts are ignored.
    pub fn charge(&mut self, seconds: f64) {
        if seconds > 0.0 {
            self.spent += seconds;
        }
    }

    /// Mark the budget as fully used, after a segment trimmed to the slack.
    pub fn fill_to_ceiling(&mut self) {
        if let Some(max) = self.ceiling {
            self.spent = self.spent.max(max);
        }
    }
}
