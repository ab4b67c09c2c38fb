//! Latest-wins sequencing for fetched snapshots.
//!
//! Every fetch is issued a [`SequenceToken`] before the request goes out.
//! When the response arrives it is offered to the [`SnapshotSequencer`],
//! which keeps it only if no newer fetch has already been applied. A
//! response that loses the race is discarded and the newest applied
//! snapshot is returned in its place, so a slow round trip can never roll
//! the displayed state backwards.

/// Position of a fetch in issue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceToken(u64);

impl SequenceToken {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// What happened to an offered snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The snapshot was the newest seen and is now current.
    Applied,
    /// A newer snapshot was already applied; this one was dropped.
    Discarded,
}

/// The snapshot to display after offering a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub snapshot: T,
    pub outcome: ApplyOutcome,
}

/// Tracks issued and applied tokens for one stream of snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotSequencer<T> {
    issued: u64,
    applied: Option<(SequenceToken, T)>,
}

impl<T> Default for SnapshotSequencer<T> {
    fn default() -> Self {
        Self {
            issued: 0,
            applied: None,
        }
    }
}

impl<T: Clone> SnapshotSequencer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the token for a fetch that is about to be sent.
    pub fn issue(&mut self) -> SequenceToken {
        self.issued += 1;
        SequenceToken(self.issued)
    }

    /// Offer the response of the fetch that was issued `token`.
    pub fn apply(&mut self, token: SequenceToken, snapshot: T) -> Resolved<T> {
        match &self.applied {
            Some((latest, current)) if *latest > token => Resolved {
                snapshot: current.clone(),
                outcome: ApplyOutcome::Discarded,
            },
            _ => {
                self.applied = Some((token, snapshot.clone()));
                Resolved {
                    snapshot,
                    outcome: ApplyOutcome::Applied,
                }
            }
        }
    }

    /// The newest applied snapshot, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.applied.as_ref().map(|(_, snapshot)| snapshot)
    }

    /// Token of the newest applied snapshot.
    #[must_use]
    pub fn applied_token(&self) -> Option<SequenceToken> {
        self.applied.as_ref().map(|(token, _)| *token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_increase() {
        let mut sequencer = SnapshotSequencer::<u32>::new();
        let first = sequencer.issue();
        let second = sequencer.issue();
        assert!(second > first);
        assert_eq!(first.value(), 1);
    }

    #[test]
    fn test_in_order_responses_apply() {
        let mut sequencer = SnapshotSequencer::new();
        let first = sequencer.issue();
        assert_eq!(sequencer.apply(first, "a").outcome, ApplyOutcome::Applied);
        let second = sequencer.issue();
        let resolved = sequencer.apply(second, "b");
        assert_eq!(resolved.outcome, ApplyOutcome::Applied);
        assert_eq!(resolved.snapshot, "b");
        assert_eq!(sequencer.latest(), Some(&"b"));
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut sequencer = SnapshotSequencer::new();
        let slow = sequencer.issue();
        let fast = sequencer.issue();

        assert_eq!(sequencer.apply(fast, "new").outcome, ApplyOutcome::Applied);

        let resolved = sequencer.apply(slow, "old");
        assert_eq!(resolved.outcome, ApplyOutcome::Discarded);
        assert_eq!(resolved.snapshot, "new");
        assert_eq!(sequencer.latest(), Some(&"new"));
        assert_eq!(sequencer.applied_token(), Some(fast));
    }

    #[test]
    fn test_late_but_newest_response_applies() {
        let mut sequencer = SnapshotSequencer::new();
        let first = sequencer.issue();
        let second = sequencer.issue();
        assert_eq!(sequencer.apply(first, 1).outcome, ApplyOutcome::Applied);
        assert_eq!(sequencer.apply(second, 2).outcome, ApplyOutcome::Applied);
        assert_eq!(sequencer.latest(), Some(&2));
    }
}
