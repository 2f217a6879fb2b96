//! OP_RETURN marker scripts and ownership proof.
//!
//! Payloads are bit-exact:
//! - Assignment: `OP_RETURN push(44) { "POCX" || plot_20 || forge_20 }`
//! - Revocation: `OP_RETURN push(24) { "XCOP" || plot_20 }`
//!
//! Parsing verifies the leading opcode, a single data push of exactly the
//! expected length, the marker, and that nothing follows. Any deviation
//! makes the output an ordinary data carrier, not an assignment.

use crate::transactions::{CoinView, Transaction};
use pocx_consensus::AccountId;

/// Bitcoin OP_RETURN opcode.
pub const OP_RETURN: u8 = 0x6A;

/// Assignment marker: ASCII "POCX".
pub const ASSIGNMENT_MARKER: [u8; 4] = *b"POCX";

/// Revocation marker: ASCII "XCOP".
pub const REVOCATION_MARKER: [u8; 4] = *b"XCOP";

const ASSIGNMENT_PAYLOAD_LEN: usize = 44;
const REVOCATION_PAYLOAD_LEN: usize = 24;

/// Build the assignment OP_RETURN script.
pub fn create_assignment_op_return(plot: &AccountId, forge: &AccountId) -> Vec<u8> {
    let mut script = Vec::with_capacity(2 + ASSIGNMENT_PAYLOAD_LEN);
    script.push(OP_RETURN);
    script.push(ASSIGNMENT_PAYLOAD_LEN as u8);
    script.extend_from_slice(&ASSIGNMENT_MARKER);
    script.extend_from_slice(plot.as_bytes());
    script.extend_from_slice(forge.as_bytes());
    script
}

/// Build the revocation OP_RETURN script.
pub fn create_revocation_op_return(plot: &AccountId) -> Vec<u8> {
    let mut script = Vec::with_capacity(2 + REVOCATION_PAYLOAD_LEN);
    script.push(OP_RETURN);
    script.push(REVOCATION_PAYLOAD_LEN as u8);
    script.extend_from_slice(&REVOCATION_MARKER);
    script.extend_from_slice(plot.as_bytes());
    script
}

/// Read one data push at the start of `script`, returning the data and the
/// remaining bytes. Supports direct pushes and OP_PUSHDATA1/2/4.
fn read_push(script: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&opcode, rest) = script.split_first()?;
    let (len, rest) = match opcode {
        1..=75 => (opcode as usize, rest),
        0x4C => {
            let (&n, rest) = rest.split_first()?;
            (n as usize, rest)
        }
        0x4D => {
            if rest.len() < 2 {
                return None;
            }
            let n = u16::from_le_bytes([rest[0], rest[1]]) as usize;
            (n, &rest[2..])
        }
        0x4E => {
            if rest.len() < 4 {
                return None;
            }
            let n = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
            (n, &rest[4..])
        }
        _ => return None,
    };
    if rest.len() < len {
        return None;
    }
    Some(rest.split_at(len))
}

fn parse_marked_payload(script: &[u8], marker: &[u8; 4], payload_len: usize) -> Option<Vec<u8>> {
    let (&first, rest) = script.split_first()?;
    if first != OP_RETURN {
        return None;
    }
    let (data, tail) = read_push(rest)?;
    if data.len() != payload_len || !tail.is_empty() || data[..4] != marker[..] {
        return None;
    }
    Some(data.to_vec())
}

/// Does this script carry a well-formed assignment payload.
pub fn is_assignment_op_return(script: &[u8]) -> bool {
    parse_marked_payload(script, &ASSIGNMENT_MARKER, ASSIGNMENT_PAYLOAD_LEN).is_some()
}

/// Does this script carry a well-formed revocation payload.
pub fn is_revocation_op_return(script: &[u8]) -> bool {
    parse_marked_payload(script, &REVOCATION_MARKER, REVOCATION_PAYLOAD_LEN).is_some()
}

/// Parse an assignment script into `(plot, forge)`.
pub fn parse_assignment_op_return(script: &[u8]) -> Option<(AccountId, AccountId)> {
    let data = parse_marked_payload(script, &ASSIGNMENT_MARKER, ASSIGNMENT_PAYLOAD_LEN)?;
    let mut plot = [0u8; 20];
    plot.copy_from_slice(&data[4..24]);
    let mut forge = [0u8; 20];
    forge.copy_from_slice(&data[24..44]);
    Some((AccountId(plot), AccountId(forge)))
}

/// Parse a revocation script into the plot address.
pub fn parse_revocation_op_return(script: &[u8]) -> Option<AccountId> {
    let data = parse_marked_payload(script, &REVOCATION_MARKER, REVOCATION_PAYLOAD_LEN)?;
    let mut plot = [0u8; 20];
    plot.copy_from_slice(&data[4..24]);
    Some(AccountId(plot))
}

/// P2WPKH script for an account: `OP_0 push(20) keyhash`.
pub fn create_p2wpkh_script(account: &AccountId) -> Vec<u8> {
    let mut script = Vec::with_capacity(22);
    script.push(0x00);
    script.push(0x14);
    script.extend_from_slice(account.as_bytes());
    script
}

/// Extract the keyhash from a P2WPKH script, if it is one.
pub fn extract_p2wpkh(script: &[u8]) -> Option<AccountId> {
    if script.len() == 22 && script[0] == 0x00 && script[1] == 0x14 {
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&script[2..22]);
        Some(AccountId(hash))
    } else {
        None
    }
}

/// Ownership proof: at least one input of `tx` spends a coin whose
/// destination is a P2WPKH to the plot address. The spend's signature was
/// already checked by ordinary script validation.
pub fn verify_plot_ownership(tx: &Transaction, plot: &AccountId, view: &dyn CoinView) -> bool {
    for input in &tx.inputs {
        let Some(coin) = view.coin(&input.prevout) else {
            continue;
        };
        if extract_p2wpkh(&coin.script_pubkey).as_ref() == Some(plot) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transactions::{OutPoint, TxIn, TxOut};
    use std::collections::HashMap;

    fn plot() -> AccountId {
        AccountId([0xAA; 20])
    }

    fn forge() -> AccountId {
        AccountId([0xBB; 20])
    }

    #[test]
    fn assignment_roundtrip() {
        let script = create_assignment_op_return(&plot(), &forge());
        assert!(is_assignment_op_return(&script));
        assert_eq!(parse_assignment_op_return(&script), Some((plot(), forge())));
    }

    #[test]
    fn revocation_roundtrip() {
        let script = create_revocation_op_return(&plot());
        assert!(is_revocation_op_return(&script));
        assert_eq!(parse_revocation_op_return(&script), Some(plot()));
    }

    #[test]
    fn assignment_wire_layout() {
        let script = create_assignment_op_return(&plot(), &forge());
        assert_eq!(script.len(), 46);
        assert_eq!(script[0], OP_RETURN);
        assert_eq!(script[1], 44);
        assert_eq!(&script[2..6], b"POCX");
        assert_eq!(&script[6..26], plot().as_bytes());
        assert_eq!(&script[26..46], forge().as_bytes());
    }

    #[test]
    fn rejects_wrong_marker() {
        let mut script = create_assignment_op_return(&plot(), &forge());
        script[2] = b'Q';
        assert!(parse_assignment_op_return(&script).is_none());

        // Markers are not interchangeable between the two payloads.
        let revocation = create_revocation_op_return(&plot());
        assert!(parse_assignment_op_return(&revocation).is_none());
    }

    #[test]
    fn rejects_missing_op_return() {
        let mut script = create_assignment_op_return(&plot(), &forge());
        script[0] = 0x51; // OP_1
        assert!(parse_assignment_op_return(&script).is_none());
    }

    #[test]
    fn rejects_wrong_push_length() {
        let mut script = Vec::new();
        script.push(OP_RETURN);
        script.push(45);
        script.extend_from_slice(&ASSIGNMENT_MARKER);
        script.extend_from_slice(&[0u8; 41]);
        assert!(parse_assignment_op_return(&script).is_none());
    }

    #[test]
    fn rejects_trailing_opcode() {
        let mut script = create_assignment_op_return(&plot(), &forge());
        script.push(0x51);
        assert!(parse_assignment_op_return(&script).is_none());
    }

    #[test]
    fn rejects_truncated_push() {
        let script = create_assignment_op_return(&plot(), &forge());
        assert!(parse_assignment_op_return(&script[..script.len() - 1]).is_none());
    }

    #[test]
    fn pushdata1_with_exact_payload_is_accepted() {
        // Same payload via OP_PUSHDATA1 still parses: push encoding is not
        // part of the payload contract.
        let mut script = Vec::new();
        script.push(OP_RETURN);
        script.push(0x4C);
        script.push(44);
        script.extend_from_slice(&ASSIGNMENT_MARKER);
        script.extend_from_slice(plot().as_bytes());
        script.extend_from_slice(forge().as_bytes());
        assert_eq!(parse_assignment_op_return(&script), Some((plot(), forge())));
    }

    #[test]
    fn p2wpkh_roundtrip() {
        let script = create_p2wpkh_script(&plot());
        assert_eq!(extract_p2wpkh(&script), Some(plot()));
        assert_eq!(extract_p2wpkh(&script[..21]), None);
    }

    struct MapView(HashMap<OutPoint, TxOut>);

    impl CoinView for MapView {
        fn coin(&self, outpoint: &OutPoint) -> Option<TxOut> {
            self.0.get(outpoint).cloned()
        }
    }

    #[test]
    fn ownership_requires_plot_input() {
        let plot_coin = OutPoint {
            txid: [1; 32],
            vout: 0,
        };
        let other_coin = OutPoint {
            txid: [2; 32],
            vout: 1,
        };

        let mut coins = HashMap::new();
        coins.insert(
            plot_coin,
            TxOut {
                value: 5_000,
                script_pubkey: create_p2wpkh_script(&plot()),
            },
        );
        coins.insert(
            other_coin,
            TxOut {
                value: 9_000,
                script_pubkey: create_p2wpkh_script(&forge()),
            },
        );
        let view = MapView(coins);

        let owned = Transaction {
            inputs: vec![TxIn { prevout: plot_coin }],
            outputs: vec![],
        };
        assert!(verify_plot_ownership(&owned, &plot(), &view));

        let unowned = Transaction {
            inputs: vec![TxIn {
                prevout: other_coin,
            }],
            outputs: vec![],
        };
        assert!(!verify_plot_ownership(&unowned, &plot(), &view));
    }
}
