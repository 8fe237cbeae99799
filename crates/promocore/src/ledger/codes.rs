//! Referral and withdrawal code generation

use std::collections::HashSet;

use rand::Rng;
use strum::{Display, IntoStaticStr};

use super::LedgerError;

/// Number of digits in every code
pub const CODE_DIGITS: usize = 7;

const CODE_SPACE: u32 = 10_000_000;

/// Which code namespace a draw is for. Uniqueness is enforced per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CodeKind {
    Referral,
    Withdrawal,
}

/// Source of candidate codes. Candidates may collide; the ledger retries.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, kind: CodeKind) -> String;
}

/// Uniform 7-digit zero-padded codes from the thread RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, _kind: CodeKind) -> String {
        let n = rand::rng().random_range(0..CODE_SPACE);
        format!("{:0width$}", n, width = CODE_DIGITS)
    }
}

/// Draws until a candidate outside `taken` comes up.
///
/// # Errors
/// [`LedgerError::ExhaustedCodeSpace`] after `max_attempts` collisions.
pub fn draw_unique(
    generator: &dyn CodeGenerator,
    kind: CodeKind,
    taken: &HashSet<&str>,
    max_attempts: u32,
) -> Result<String, LedgerError> {
    for attempt in 1..=max_attempts {
        let candidate = generator.generate(kind);
        if !taken.contains(candidate.as_str()) {
            if attempt > 1 {
                log::debug!("{} code found after {} draws", kind, attempt);
            }
            return Ok(candidate);
        }
    }
    log::error!("{} code space exhausted after {} draws", kind, max_attempts);
    Err(LedgerError::ExhaustedCodeSpace {
        kind,
        attempts: max_attempts,
    })
}
