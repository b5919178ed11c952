use super::error::EngineError;
use std::time::{Duration, Instant};

/// Wall-clock budget for a run; checked between phases and inside long loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    pub fn none() -> Self {
        Self { expires_at: None }
    }

    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now().checked_add(budget),
        }
    }

    pub fn from_budget(budget: Option<Duration>) -> Self {
        budget.map_or_else(Self::none, Self::after)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    #[inline]
    pub fn check(&self, phase: &'static str) -> Result<(), EngineError> {
        if self.is_expired() {
            Err(EngineError::DeadlineExceeded { phase })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_deadline_never_expires() {
        assert!(Deadline::none().check("sampling").is_ok());
        assert!(Deadline::from_budget(None).check("sampling").is_ok());
    }

    #[test]
    fn zero_budget_expires_immediately() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(matches!(
            deadline.check("demand"),
            Err(EngineError::DeadlineExceeded { phase: "demand" })
        ));
    }

    #[test]
    fn generous_budget_is_not_expired() {
        assert!(!Deadline::after(Duration::from_secs(3600)).is_expired());
    }
}
