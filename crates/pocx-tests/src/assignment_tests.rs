//! Assignment lifecycle tests spanning wallet, chain and consensus.

use crate::harness::TestChain;
use pocx_assignments::{
    assignment_state, build_assignment_transaction, build_revocation_transaction, AssignmentView,
    CoinSource, ForgingState, OutPoint, TxOut,
};
use pocx_chain::ChainManager;
use pocx_consensus::AccountId;
use std::sync::Arc;

struct ChainCoins {
    chain: Arc<ChainManager>,
    owner: AccountId,
}

impl CoinSource for ChainCoins {
    fn available_coins(&self) -> Vec<(OutPoint, TxOut)> {
        self.chain.coins_of(&self.owner)
    }
}

fn wallet_for(t: &TestChain, owner: AccountId) -> ChainCoins {
    ChainCoins {
        chain: t.chain.clone(),
        owner,
    }
}

#[test]
fn assignment_lifecycle_controls_the_signer() {
    let t = TestChain::regtest();
    let plot = t.account;
    let forge = t.keystore.generate_key();

    t.chain.fund(&plot, 1_000_000);

    // Block 1 confirms the delegation; regtest activates it two blocks
    // later, at height 3.
    let assign_tx = build_assignment_transaction(&wallet_for(&t, plot), &plot, &forge, 2).unwrap();
    t.forge_block(10, vec![assign_tx]).unwrap();

    let record = t.chain.assignment(&plot).unwrap();
    assert_eq!(record.forging_address, forge);
    assert_eq!(record.assignment_height, 1);
    assert_eq!(record.assignment_effective_height, 3);
    assert_eq!(assignment_state(&plot, 1, t.chain.as_ref()), ForgingState::Assigning);

    // ASSIGNING already delegates: block 2 must carry the forge key, and a
    // plot-key signature is a consensus failure.
    assert!(t.forge_block_as(11, vec![], Some(plot)).is_err());
    let block2 = t.forge_block(11, vec![]).unwrap();
    assert_eq!(
        AccountId::from_pubkey(&block2.header.pubkey),
        forge,
        "block 2 must be signed by the assignee"
    );

    // Height 3 onwards the state reads ASSIGNED.
    let block3 = t.forge_block(12, vec![]).unwrap();
    assert_eq!(assignment_state(&plot, 3, t.chain.as_ref()), ForgingState::Assigned);
    assert_eq!(AccountId::from_pubkey(&block3.header.pubkey), forge);

    // Block 4 confirms the revocation, effective at height 6.
    let revoke_tx = build_revocation_transaction(&wallet_for(&t, plot), &plot, 2).unwrap();
    t.forge_block(13, vec![revoke_tx]).unwrap();

    let record = t.chain.assignment(&plot).unwrap();
    assert!(record.revoked);
    assert_eq!(record.revocation_effective_height, 6);
    assert_eq!(assignment_state(&plot, 5, t.chain.as_ref()), ForgingState::Revoking);

    // REVOKING still keeps the assignee in charge for block 5.
    let block5 = t.forge_block(14, vec![]).unwrap();
    assert_eq!(AccountId::from_pubkey(&block5.header.pubkey), forge);

    // From height 6 the plot signs for itself again.
    assert_eq!(assignment_state(&plot, 6, t.chain.as_ref()), ForgingState::Revoked);
    assert!(t.forge_block_as(15, vec![], Some(forge)).is_err());
    let block6 = t.forge_block(15, vec![]).unwrap();
    assert_eq!(AccountId::from_pubkey(&block6.header.pubkey), plot);
}

#[test]
fn disconnect_rolls_assignment_back() {
    let t = TestChain::regtest();
    let plot = t.account;
    let forge = t.keystore.generate_key();

    t.chain.fund(&plot, 1_000_000);

    let assign_tx = build_assignment_transaction(&wallet_for(&t, plot), &plot, &forge, 2).unwrap();
    t.forge_block(10, vec![assign_tx]).unwrap();
    assert!(t.chain.assignment(&plot).is_some());

    t.chain.disconnect_tip().unwrap();
    assert!(t.chain.assignment(&plot).is_none(), "undo must erase the record");
    assert_eq!(t.chain.height(), 0);

    // The spent plot coin is restored by the disconnect.
    let coins = t.chain.coins_of(&plot);
    assert_eq!(coins.len(), 1);
    assert_eq!(coins[0].1.value, 1_000_000);
}

#[test]
fn foreign_signed_assignment_invalidates_the_block() {
    let t = TestChain::regtest();
    let plot = t.account;
    let forge = t.keystore.generate_key();
    let outsider = t.keystore.generate_key();

    // The transaction spends an outsider coin, so it cannot prove plot
    // ownership even though the payload parses.
    t.chain.fund(&outsider, 1_000_000);
    let bogus_tx = {
        let wallet = wallet_for(&t, outsider);
        // Build a well-formed assignment payload over the outsider's coin.
        let coins = wallet.available_coins();
        let (outpoint, coin) = coins.first().cloned().unwrap();
        pocx_assignments::Transaction {
            inputs: vec![pocx_assignments::TxIn { prevout: outpoint }],
            outputs: vec![
                pocx_assignments::TxOut {
                    value: 0,
                    script_pubkey: pocx_assignments::create_assignment_op_return(&plot, &forge),
                },
                pocx_assignments::TxOut {
                    value: coin.value - 500,
                    script_pubkey: coin.script_pubkey,
                },
            ],
        }
    };

    assert!(t.forge_block(10, vec![bogus_tx]).is_err());
    assert_eq!(t.chain.height(), 0, "invalid block must not connect");
    assert!(t.chain.assignment(&plot).is_none());
}
