//! Assignment records and the derived lifecycle state machine.

use pocx_consensus::AccountId;
use tracing::trace;

/// Derived forging state of a plot at some height. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ForgingState {
    Unassigned,
    /// Assignment confirmed but not yet effective.
    Assigning,
    Assigned,
    /// Revocation confirmed but not yet effective.
    Revoking,
    Revoked,
}

impl ForgingState {
    /// Upper-case wire name used by the RPC surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            ForgingState::Unassigned => "UNASSIGNED",
            ForgingState::Assigning => "ASSIGNING",
            ForgingState::Assigned => "ASSIGNED",
            ForgingState::Revoking => "REVOKING",
            ForgingState::Revoked => "REVOKED",
        }
    }
}

/// Per-plot assignment record, owned by the chain state.
///
/// Heights are monotone: `assignment_height <= assignment_effective_height`
/// and likewise for the revocation pair. Deletion only happens through the
/// undo of the creating block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgingAssignment {
    pub plot_address: AccountId,
    pub forging_address: AccountId,
    pub assignment_txid: [u8; 32],
    pub assignment_height: i32,
    pub assignment_effective_height: i32,
    pub revoked: bool,
    pub revocation_txid: [u8; 32],
    pub revocation_height: i32,
    pub revocation_effective_height: i32,
}

impl ForgingAssignment {
    /// Fresh record for a just-confirmed assignment.
    pub fn new(
        plot_address: AccountId,
        forging_address: AccountId,
        assignment_txid: [u8; 32],
        assignment_height: i32,
        activation_delay: i32,
    ) -> Self {
        Self {
            plot_address,
            forging_address,
            assignment_txid,
            assignment_height,
            assignment_effective_height: assignment_height + activation_delay,
            revoked: false,
            revocation_txid: [0u8; 32],
            revocation_height: 0,
            revocation_effective_height: 0,
        }
    }

    /// Lifecycle state at `height`.
    pub fn state_at_height(&self, height: i32) -> ForgingState {
        if self.revoked {
            if height < self.revocation_effective_height {
                ForgingState::Revoking
            } else {
                ForgingState::Revoked
            }
        } else if height < self.assignment_effective_height {
            ForgingState::Assigning
        } else {
            ForgingState::Assigned
        }
    }

    /// Whether the assignee holds signing rights at `height`. Covers the
    /// whole committed window: ASSIGNING, ASSIGNED and REVOKING.
    pub fn is_active_at_height(&self, height: i32) -> bool {
        matches!(
            self.state_at_height(height),
            ForgingState::Assigning | ForgingState::Assigned | ForgingState::Revoking
        )
    }
}

/// Read access to stored assignments (the coin view's assignment table).
pub trait AssignmentView: Send + Sync {
    /// Current record for a plot, if any.
    fn assignment(&self, plot: &AccountId) -> Option<ForgingAssignment>;
}

/// Derived state for a plot at `height`, UNASSIGNED when no record exists.
pub fn assignment_state(
    plot: &AccountId,
    height: i32,
    view: &dyn AssignmentView,
) -> ForgingState {
    match view.assignment(plot) {
        Some(record) => record.state_at_height(height),
        None => ForgingState::Unassigned,
    }
}

/// The address currently authorised to sign blocks for `plot`.
///
/// Consensus-critical: changing which states delegate the signer is a hard
/// fork.
pub fn effective_signer(plot: &AccountId, height: i32, view: &dyn AssignmentView) -> AccountId {
    if let Some(record) = view.assignment(plot) {
        if record.is_active_at_height(height) {
            trace!(
                plot = %plot,
                signer = %record.forging_address,
                height,
                "active assignment delegates signer"
            );
            return record.forging_address;
        }
    }
    *plot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ForgingAssignment {
        let mut a = ForgingAssignment::new(
            AccountId([0xAA; 20]),
            AccountId([0xBB; 20]),
            [1; 32],
            100,
            360,
        );
        a.revoked = false;
        a
    }

    fn revoked_record() -> ForgingAssignment {
        let mut a = record();
        a.revoked = true;
        a.revocation_txid = [2; 32];
        a.revocation_height = 700;
        a.revocation_effective_height = 1060;
        a
    }

    #[test]
    fn state_before_and_after_activation() {
        let a = record();
        assert_eq!(a.state_at_height(100), ForgingState::Assigning);
        assert_eq!(a.state_at_height(459), ForgingState::Assigning);
        assert_eq!(a.state_at_height(460), ForgingState::Assigned);
        assert_eq!(a.state_at_height(10_000), ForgingState::Assigned);
    }

    #[test]
    fn state_after_revocation() {
        let a = revoked_record();
        assert_eq!(a.state_at_height(700), ForgingState::Revoking);
        assert_eq!(a.state_at_height(1059), ForgingState::Revoking);
        assert_eq!(a.state_at_height(1060), ForgingState::Revoked);
    }

    #[test]
    fn state_is_monotone_in_height() {
        // The derived state never moves backwards in the lifecycle
        // ordering as the height grows.
        for a in [record(), revoked_record()] {
            let mut last = a.state_at_height(0);
            for h in 0..2_000 {
                let s = a.state_at_height(h);
                assert!(s >= last, "state regressed at height {}", h);
                last = s;
            }
        }
    }

    struct OneRecord(Option<ForgingAssignment>);

    impl AssignmentView for OneRecord {
        fn assignment(&self, plot: &AccountId) -> Option<ForgingAssignment> {
            self.0.clone().filter(|a| a.plot_address == *plot)
        }
    }

    #[test]
    fn signer_delegation_window() {
        let plot = AccountId([0xAA; 20]);
        let forge = AccountId([0xBB; 20]);

        let view = OneRecord(Some(record()));
        // ASSIGNING and ASSIGNED both delegate.
        assert_eq!(effective_signer(&plot, 100, &view), forge);
        assert_eq!(effective_signer(&plot, 500, &view), forge);

        let view = OneRecord(Some(revoked_record()));
        // REVOKING still delegates; REVOKED returns rights to the plot.
        assert_eq!(effective_signer(&plot, 800, &view), forge);
        assert_eq!(effective_signer(&plot, 1060, &view), plot);
    }

    #[test]
    fn unassigned_plot_signs_for_itself() {
        let plot = AccountId([0xCC; 20]);
        let view = OneRecord(None);
        assert_eq!(effective_signer(&plot, 1, &view), plot);
        assert_eq!(assignment_state(&plot, 1, &view), ForgingState::Unassigned);
    }
}
