//! Period label sequencer
//!
//! Labels are `prefix + 3-digit suffix`. The suffix rolls over from 999 to
//! 000 and is re-derived from the newest persisted round at startup so a
//! restart continues the sequence instead of starting over.

const COUNTER_MODULUS: u16 = 1000;

/// Single-writer period label source owned by the round engine
#[derive(Debug, Clone)]
pub struct PeriodSequencer {
    prefix: String,
    /// Suffix the next call to `next` hands out
    upcoming: u16,
}

impl PeriodSequencer {
    /// Start at `seed`; the first label issued carries that suffix
    pub fn new(prefix: impl Into<String>, seed: u16) -> Self {
        Self {
            prefix: prefix.into(),
            upcoming: seed % COUNTER_MODULUS,
        }
    }

    /// Continue after the most recent persisted label, falling back to
    /// `default` when there is no history or the label has no numeric suffix.
    pub fn resume(prefix: impl Into<String>, last_label: Option<&str>, default: u16) -> Self {
        let seed = match last_label.and_then(parse_suffix) {
            Some(last) => (last + 1) % COUNTER_MODULUS,
            None => default,
        };
        Self::new(prefix, seed)
    }

    pub fn next(&mut self) -> String {
        let label = format!("{}{:03}", self.prefix, self.upcoming);
        self.upcoming = (self.upcoming + 1) % COUNTER_MODULUS;
        label
    }

    pub fn upcoming(&self) -> u16 {
        self.upcoming
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Trailing three digits of a label
fn parse_suffix(label: &str) -> Option<u16> {
    let start = label.len().checked_sub(3)?;
    let suffix = label.get(start..)?;
    if !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}
