//! Per-visitor state threaded through every pipeline stage.

use grove_protocol::{Assignment, Rgb, Stage};
use rand::rngs::StdRng;

/// How many marks a visitor may still settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkBudget {
    cap: usize,
    used: usize,
}

impl MarkBudget {
    pub fn new(cap: usize) -> Self {
        Self { cap, used: 0 }
    }

    /// Take one mark from the budget. Returns `false` once the cap is
    /// reached; the check and the increment are one step.
    pub fn try_claim(&mut self) -> bool {
        if self.used < self.cap {
            self.used += 1;
            true
        } else {
            false
        }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn remaining(&self) -> usize {
        self.cap - self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.cap
    }
}

/// Identity, stage, budget and randomness of one visitor.
#[derive(Debug)]
pub struct SessionContext {
    identity: Option<Assignment>,
    pub stage: Stage,
    pub budget: MarkBudget,
    pub rng: StdRng,
}

impl SessionContext {
    pub fn new(mark_cap: usize, rng: StdRng) -> Self {
        Self {
            identity: None,
            stage: Stage::default(),
            budget: MarkBudget::new(mark_cap),
            rng,
        }
    }

    /// Adopt the identity handed out by the relay. Later assignments are
    /// ignored; the first one is authoritative.
    pub fn assign(&mut self, assignment: Assignment) -> bool {
        if self.identity.is_some() {
            return false;
        }
        self.identity = Some(assignment);
        true
    }

    pub fn session_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|a| a.session_id.as_str())
    }

    pub fn color(&self) -> Option<Rgb> {
        self.identity.as_ref().map(|a| a.color)
    }

    pub fn is_assigned(&self) -> bool {
        self.identity.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn budget_stops_at_cap() {
        let mut budget = MarkBudget::new(3);
        assert!(budget.try_claim());
        assert!(budget.try_claim());
        assert!(budget.try_claim());
        assert!(!budget.try_claim());
        assert_eq!(budget.used(), 3);
        assert_eq!(budget.remaining(), 0);
        assert!(budget.is_exhausted());
    }

    #[test]
    fn zero_cap_never_claims() {
        let mut budget = MarkBudget::new(0);
        assert!(budget.is_exhausted());
        assert!(!budget.try_claim());
    }

    #[test]
    fn first_assignment_wins() {
        let mut ctx = SessionContext::new(10, StdRng::seed_from_u64(0));
        assert!(!ctx.is_assigned());
        assert!(ctx.assign(Assignment {
            session_id: "s-0-aa".into(),
            color: Rgb(1, 1, 1),
        }));
        assert!(!ctx.assign(Assignment {
            session_id: "s-1-bb".into(),
            color: Rgb(2, 2, 2),
        }));
        assert_eq!(ctx.session_id(), Some("s-0-aa"));
        assert_eq!(ctx.color(), Some(Rgb(1, 1, 1)));
    }
}
