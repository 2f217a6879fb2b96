//! Stored assignments with block connect/disconnect and undo records.

use crate::opcodes::{
    parse_assignment_op_return, parse_revocation_op_return, verify_plot_ownership,
};
use crate::state::{AssignmentView, ForgingAssignment};
use crate::transactions::{CoinView, Transaction};
use crate::{AssignmentError, AssignmentResult};
use pocx_consensus::AccountId;
use std::collections::HashMap;
use tracing::{debug, info};

/// What a connect changed, for exact reversal on disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoType {
    /// Assignment was added; delete on undo.
    Added = 0,
    /// Assignment overwrote an existing record; restore it on undo.
    Modified = 1,
    /// Assignment was revoked; restore the pre-revocation record on undo.
    Revoked = 2,
}

/// Per-change undo record, serialised after ordinary transaction undo
/// data in the block undo file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgingUndo {
    pub undo_type: UndoType,
    /// Full assignment state before the change (for `Added`, the inserted
    /// record itself, so undo knows which key to delete).
    pub assignment: ForgingAssignment,
}

const ASSIGNMENT_SER_LEN: usize = 20 + 20 + 32 + 4 + 4 + 1 + 32 + 4 + 4;

fn serialize_assignment(a: &ForgingAssignment, out: &mut Vec<u8>) {
    out.extend_from_slice(a.plot_address.as_bytes());
    out.extend_from_slice(a.forging_address.as_bytes());
    out.extend_from_slice(&a.assignment_txid);
    out.extend_from_slice(&a.assignment_height.to_le_bytes());
    out.extend_from_slice(&a.assignment_effective_height.to_le_bytes());
    out.push(a.revoked as u8);
    out.extend_from_slice(&a.revocation_txid);
    out.extend_from_slice(&a.revocation_height.to_le_bytes());
    out.extend_from_slice(&a.revocation_effective_height.to_le_bytes());
}

fn deserialize_assignment(bytes: &[u8]) -> AssignmentResult<ForgingAssignment> {
    if bytes.len() < ASSIGNMENT_SER_LEN {
        return Err(AssignmentError::InvalidUndo(format!(
            "assignment record too short: {} bytes",
            bytes.len()
        )));
    }
    let mut plot = [0u8; 20];
    plot.copy_from_slice(&bytes[0..20]);
    let mut forge = [0u8; 20];
    forge.copy_from_slice(&bytes[20..40]);
    let mut atxid = [0u8; 32];
    atxid.copy_from_slice(&bytes[40..72]);
    let assignment_height = i32::from_le_bytes(bytes[72..76].try_into().unwrap());
    let assignment_effective_height = i32::from_le_bytes(bytes[76..80].try_into().unwrap());
    let revoked = match bytes[80] {
        0 => false,
        1 => true,
        other => {
            return Err(AssignmentError::InvalidUndo(format!(
                "invalid revoked flag {}",
                other
            )))
        }
    };
    let mut rtxid = [0u8; 32];
    rtxid.copy_from_slice(&bytes[81..113]);
    let revocation_height = i32::from_le_bytes(bytes[113..117].try_into().unwrap());
    let revocation_effective_height = i32::from_le_bytes(bytes[117..121].try_into().unwrap());

    Ok(ForgingAssignment {
        plot_address: AccountId(plot),
        forging_address: AccountId(forge),
        assignment_txid: atxid,
        assignment_height,
        assignment_effective_height,
        revoked,
        revocation_txid: rtxid,
        revocation_height,
        revocation_effective_height,
    })
}

impl ForgingUndo {
    /// Serialized size in bytes.
    pub const SERIALIZED_LEN: usize = 1 + ASSIGNMENT_SER_LEN;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SERIALIZED_LEN);
        out.push(self.undo_type as u8);
        serialize_assignment(&self.assignment, &mut out);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> AssignmentResult<Self> {
        let (&type_byte, rest) = bytes
            .split_first()
            .ok_or_else(|| AssignmentError::InvalidUndo("empty undo record".to_string()))?;
        let undo_type = match type_byte {
            0 => UndoType::Added,
            1 => UndoType::Modified,
            2 => UndoType::Revoked,
            other => {
                return Err(AssignmentError::InvalidUndo(format!(
                    "unknown undo type {}",
                    other
                )))
            }
        };
        Ok(Self {
            undo_type,
            assignment: deserialize_assignment(rest)?,
        })
    }
}

/// In-memory assignment table, keyed by plot address.
#[derive(Debug, Default)]
pub struct AssignmentStore {
    records: HashMap<AccountId, ForgingAssignment>,
}

impl AssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert or overwrite the record for a confirmed assignment.
    pub fn apply_assignment(
        &mut self,
        plot: AccountId,
        forge: AccountId,
        txid: [u8; 32],
        height: i32,
        activation_delay: i32,
    ) -> ForgingUndo {
        let record = ForgingAssignment::new(plot, forge, txid, height, activation_delay);
        match self.records.insert(plot, record.clone()) {
            Some(previous) => {
                debug!(plot = %plot, forge = %forge, height, "assignment overwritten");
                ForgingUndo {
                    undo_type: UndoType::Modified,
                    assignment: previous,
                }
            }
            None => {
                debug!(plot = %plot, forge = %forge, height, "assignment added");
                ForgingUndo {
                    undo_type: UndoType::Added,
                    assignment: record,
                }
            }
        }
    }

    /// Stamp the revocation fields of an existing record.
    pub fn apply_revocation(
        &mut self,
        plot: &AccountId,
        txid: [u8; 32],
        height: i32,
        activation_delay: i32,
    ) -> AssignmentResult<ForgingUndo> {
        let record = self
            .records
            .get_mut(plot)
            .ok_or_else(|| AssignmentError::NotAssigned(plot.to_hex()))?;

        let previous = record.clone();
        record.revoked = true;
        record.revocation_txid = txid;
        record.revocation_height = height;
        record.revocation_effective_height = height + activation_delay;

        debug!(plot = %plot, height, "assignment revoked");
        Ok(ForgingUndo {
            undo_type: UndoType::Revoked,
            assignment: previous,
        })
    }

    /// Reverse one recorded change.
    pub fn undo(&mut self, undo: &ForgingUndo) {
        match undo.undo_type {
            UndoType::Added => {
                self.records.remove(&undo.assignment.plot_address);
            }
            UndoType::Modified | UndoType::Revoked => {
                self.records
                    .insert(undo.assignment.plot_address, undo.assignment.clone());
            }
        }
    }
}

impl AssignmentView for AssignmentStore {
    fn assignment(&self, plot: &AccountId) -> Option<ForgingAssignment> {
        self.records.get(plot).cloned()
    }
}

/// Apply every assignment and revocation payload of a connecting block.
///
/// A structurally valid payload whose transaction does not prove plot
/// ownership, or a revocation without a stored assignment, makes the block
/// invalid. Malformed payloads are ordinary data carriers and are skipped.
pub fn connect_block_assignments(
    store: &mut AssignmentStore,
    transactions: &[Transaction],
    height: i32,
    coin_view: &dyn CoinView,
    activation_delay: i32,
) -> AssignmentResult<Vec<ForgingUndo>> {
    let mut undos = Vec::new();

    for tx in transactions {
        for output in &tx.outputs {
            if let Some((plot, forge)) = parse_assignment_op_return(&output.script_pubkey) {
                if !verify_plot_ownership(tx, &plot, coin_view) {
                    // Roll back partial changes before failing the block.
                    disconnect_block_assignments(store, &undos);
                    return Err(AssignmentError::OwnershipNotProven(plot.to_hex()));
                }
                undos.push(store.apply_assignment(
                    plot,
                    forge,
                    tx.txid(),
                    height,
                    activation_delay,
                ));
            } else if let Some(plot) = parse_revocation_op_return(&output.script_pubkey) {
                if !verify_plot_ownership(tx, &plot, coin_view) {
                    disconnect_block_assignments(store, &undos);
                    return Err(AssignmentError::OwnershipNotProven(plot.to_hex()));
                }
                match store.apply_revocation(&plot, tx.txid(), height, activation_delay) {
                    Ok(undo) => undos.push(undo),
                    Err(e) => {
                        disconnect_block_assignments(store, &undos);
                        return Err(e);
                    }
                }
            }
        }
    }

    if !undos.is_empty() {
        info!(height, changes = undos.len(), "assignment changes connected");
    }
    Ok(undos)
}

/// Reverse a block's assignment changes, newest first.
pub fn disconnect_block_assignments(store: &mut AssignmentStore, undos: &[ForgingUndo]) {
    for undo in undos.iter().rev() {
        store.undo(undo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::{
        create_assignment_op_return, create_p2wpkh_script, create_revocation_op_return,
    };
    use crate::transactions::{OutPoint, TxIn, TxOut};

    fn plot() -> AccountId {
        AccountId([0xAA; 20])
    }

    fn forge() -> AccountId {
        AccountId([0xBB; 20])
    }

    struct AllCoinsOwnedBy(AccountId);

    impl CoinView for AllCoinsOwnedBy {
        fn coin(&self, _outpoint: &OutPoint) -> Option<TxOut> {
            Some(TxOut {
                value: 1_000,
                script_pubkey: create_p2wpkh_script(&self.0),
            })
        }
    }

    fn marked_tx(script: Vec<u8>, input_byte: u8) -> Transaction {
        Transaction {
            inputs: vec![TxIn {
                prevout: OutPoint {
                    txid: [input_byte; 32],
                    vout: 0,
                },
            }],
            outputs: vec![TxOut {
                value: 0,
                script_pubkey: script,
            }],
        }
    }

    #[test]
    fn add_then_undo_removes_record() {
        let mut store = AssignmentStore::new();
        let undo = store.apply_assignment(plot(), forge(), [1; 32], 100, 360);
        assert_eq!(undo.undo_type, UndoType::Added);
        assert!(store.assignment(&plot()).is_some());

        store.undo(&undo);
        assert!(store.assignment(&plot()).is_none());
    }

    #[test]
    fn overwrite_then_undo_restores_previous() {
        let mut store = AssignmentStore::new();
        store.apply_assignment(plot(), forge(), [1; 32], 100, 360);

        let new_forge = AccountId([0xCC; 20]);
        let undo = store.apply_assignment(plot(), new_forge, [2; 32], 200, 360);
        assert_eq!(undo.undo_type, UndoType::Modified);
        assert_eq!(
            store.assignment(&plot()).unwrap().forging_address,
            new_forge
        );

        store.undo(&undo);
        assert_eq!(store.assignment(&plot()).unwrap().forging_address, forge());
    }

    #[test]
    fn revoke_then_undo_clears_revocation() {
        let mut store = AssignmentStore::new();
        store.apply_assignment(plot(), forge(), [1; 32], 100, 360);

        let undo = store.apply_revocation(&plot(), [2; 32], 500, 360).unwrap();
        assert_eq!(undo.undo_type, UndoType::Revoked);
        let record = store.assignment(&plot()).unwrap();
        assert!(record.revoked);
        assert_eq!(record.revocation_effective_height, 860);

        store.undo(&undo);
        assert!(!store.assignment(&plot()).unwrap().revoked);
    }

    #[test]
    fn revoking_unassigned_plot_fails() {
        let mut store = AssignmentStore::new();
        assert!(matches!(
            store.apply_revocation(&plot(), [2; 32], 500, 360),
            Err(AssignmentError::NotAssigned(_))
        ));
    }

    #[test]
    fn undo_roundtrips_through_bytes() {
        let mut store = AssignmentStore::new();
        store.apply_assignment(plot(), forge(), [1; 32], 100, 360);
        let undo = store.apply_revocation(&plot(), [2; 32], 500, 360).unwrap();

        let bytes = undo.to_bytes();
        assert_eq!(bytes.len(), ForgingUndo::SERIALIZED_LEN);
        assert_eq!(ForgingUndo::from_bytes(&bytes).unwrap(), undo);
    }

    #[test]
    fn undo_rejects_garbage() {
        assert!(ForgingUndo::from_bytes(&[]).is_err());
        assert!(ForgingUndo::from_bytes(&[9; 10]).is_err());

        let mut store = AssignmentStore::new();
        let undo = store.apply_assignment(plot(), forge(), [1; 32], 100, 360);
        let mut bytes = undo.to_bytes();
        bytes[0] = 7;
        assert!(ForgingUndo::from_bytes(&bytes).is_err());
    }

    #[test]
    fn connect_applies_and_disconnect_reverses() {
        let mut store = AssignmentStore::new();
        let view = AllCoinsOwnedBy(plot());

        let txs = vec![marked_tx(create_assignment_op_return(&plot(), &forge()), 1)];
        let undos = connect_block_assignments(&mut store, &txs, 100, &view, 360).unwrap();
        assert_eq!(undos.len(), 1);
        assert!(store.assignment(&plot()).is_some());

        let txs2 = vec![marked_tx(create_revocation_op_return(&plot()), 2)];
        let undos2 = connect_block_assignments(&mut store, &txs2, 150, &view, 360).unwrap();
        assert!(store.assignment(&plot()).unwrap().revoked);

        disconnect_block_assignments(&mut store, &undos2);
        assert!(!store.assignment(&plot()).unwrap().revoked);
        disconnect_block_assignments(&mut store, &undos);
        assert!(store.assignment(&plot()).is_none());
    }

    #[test]
    fn connect_rejects_unowned_assignment() {
        let mut store = AssignmentStore::new();
        // Every input coin belongs to the forge address, not the plot.
        let view = AllCoinsOwnedBy(forge());

        let txs = vec![marked_tx(create_assignment_op_return(&plot(), &forge()), 1)];
        let err = connect_block_assignments(&mut store, &txs, 100, &view, 360);
        assert!(matches!(err, Err(AssignmentError::OwnershipNotProven(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn connect_ignores_foreign_op_returns() {
        let mut store = AssignmentStore::new();
        let view = AllCoinsOwnedBy(plot());

        let mut script = vec![0x6A, 4];
        script.extend_from_slice(b"memo");
        let txs = vec![marked_tx(script, 1)];
        let undos = connect_block_assignments(&mut store, &txs, 100, &view, 360).unwrap();
        assert!(undos.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn failed_connect_rolls_back_earlier_changes() {
        let mut store = AssignmentStore::new();
        let view = AllCoinsOwnedBy(plot());

        // First tx assigns the plot, second revokes a plot that was never
        // assigned. The whole block must fail and leave no trace.
        let other = AccountId([0xDD; 20]);
        let txs = vec![
            marked_tx(create_assignment_op_return(&plot(), &forge()), 1),
            marked_tx(create_revocation_op_return(&other), 2),
        ];
        let err = connect_block_assignments(&mut store, &txs, 100, &view, 360);
        assert!(err.is_err());
        assert!(store.is_empty());
    }
}
