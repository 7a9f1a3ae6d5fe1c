//! # Sequence Gate
//!
//! In-flight gateway calls cannot be cancelled, so a slow response may arrive after a newer
//! one has already been applied. Every dispatched call is stamped with a number from
//! [`SequenceGate::issue`]; a response is applied only if [`SequenceGate::admit`] accepts its
//! number, i.e. it is higher than every number admitted so far.

/// Monotonic per-resource sequence numbers.
#[derive(Debug, Default, Clone)]
pub struct SequenceGate {
    issued: u64,
    admitted: u64,
}

impl SequenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps a new dispatch.
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Accepts `seq` if it is newer than anything admitted so far.
    ///
    /// Numbers that were never issued are refused.
    pub fn admit(&mut self, seq: u64) -> bool {
        if seq > self.admitted && seq <= self.issued {
            self.admitted = seq;
            true
        } else {
            false
        }
    }

    /// Makes every number issued so far stale.
    pub fn invalidate(&mut self) {
        self.admitted = self.issued;
    }

    /// Issues and admits in one step, for writes that are authoritative by construction.
    pub fn stamp(&mut self) -> u64 {
        let seq = self.issue();
        self.admitted = seq;
        seq
    }

    pub fn highest_admitted(&self) -> u64 {
        self.admitted
    }
}
