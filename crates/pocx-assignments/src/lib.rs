//! # pocx-assignments
//!
//! Forging assignments: delegation of block-signing rights from a plot
//! address to a forging address.
//!
//! Assignments and revocations travel as OP_RETURN outputs with fixed
//! markers (`POCX` to assign, `XCOP` to revoke), proven by an ordinary
//! input spend from the plot address. Chain state keeps one record per
//! plot; the derived lifecycle state at a height is a pure function of
//! that record:
//!
//! ```text
//! UNASSIGNED -> ASSIGNING -> ASSIGNED -> REVOKING -> REVOKED
//! ```
//!
//! Both ASSIGNING and REVOKING keep the assignee as effective signer: the
//! delegation is committed at confirmation and only released once the
//! revocation reaches its effective height.

mod error;
pub mod opcodes;
pub mod state;
pub mod store;
pub mod transactions;

pub use error::{AssignmentError, AssignmentResult};
pub use opcodes::{
    create_assignment_op_return, create_p2wpkh_script, create_revocation_op_return,
    extract_p2wpkh, is_assignment_op_return, is_revocation_op_return, parse_assignment_op_return,
    parse_revocation_op_return, verify_plot_ownership, ASSIGNMENT_MARKER, REVOCATION_MARKER,
};
pub use state::{
    assignment_state, effective_signer, AssignmentView, ForgingAssignment, ForgingState,
};
pub use store::{
    connect_block_assignments, disconnect_block_assignments, AssignmentStore, ForgingUndo,
    UndoType,
};
pub use transactions::{
    build_assignment_transaction, build_revocation_transaction, CoinSource, CoinView, OutPoint,
    Transaction, TxIn, TxOut,
};
