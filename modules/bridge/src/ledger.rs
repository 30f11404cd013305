//! Bridge ledger: per-denom balances, chain era and exchange rate
//!
//! Keys:
//! - `balance:<len><denom><address>` -> `u128`
//! - `era:<denom>` -> `u32`
//! - `rate:<denom>` -> `u128`
//! - `processed:<len><denom><source_tx>` -> `()`

use relayvote_core::{Address, RelayVoteError, RelayVoteResult, StateMutator, StateProvider};
use relayvote_state::{compose_key, decode_value, get_typed, set_typed, StateStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const BALANCE_PREFIX: &[u8] = b"balance:";
const ERA_PREFIX: &[u8] = b"era:";
const RATE_PREFIX: &[u8] = b"rate:";
const PROCESSED_PREFIX: &[u8] = b"processed:";
const EMPTY: &[u8] = &[];

pub fn balance_key(denom: &str, address: &Address) -> Vec<u8> {
    compose_key(BALANCE_PREFIX, &[denom.as_bytes(), address.as_bytes()])
}

pub fn era_key(denom: &str) -> Vec<u8> {
    compose_key(ERA_PREFIX, &[denom.as_bytes()])
}

pub fn rate_key(denom: &str) -> Vec<u8> {
    compose_key(RATE_PREFIX, &[denom.as_bytes()])
}

pub fn processed_key(denom: &str, source_tx: &str) -> Vec<u8> {
    compose_key(PROCESSED_PREFIX, &[denom.as_bytes(), source_tx.as_bytes()])
}

pub fn balance(
    state: &(impl StateProvider + ?Sized),
    denom: &str,
    address: &Address,
) -> RelayVoteResult<u128> {
    Ok(get_typed(state, &balance_key(denom, address))?.unwrap_or(0))
}

/// Add `amount` to a balance, failing on overflow
pub fn credit(
    state: &(impl StateMutator + ?Sized),
    denom: &str,
    address: &Address,
    amount: u128,
) -> RelayVoteResult<u128> {
    let updated = balance(state, denom, address)?
        .checked_add(amount)
        .ok_or_else(|| RelayVoteError::InvalidAction(format!("{} balance overflow", denom)))?;
    set_typed(state, &balance_key(denom, address), &updated)?;
    Ok(updated)
}

pub fn chain_era(state: &(impl StateProvider + ?Sized), denom: &str) -> RelayVoteResult<Option<u32>> {
    get_typed(state, &era_key(denom))
}

pub fn set_chain_era(
    state: &(impl StateMutator + ?Sized),
    denom: &str,
    era: u32,
) -> RelayVoteResult<()> {
    set_typed(state, &era_key(denom), &era)
}

pub fn exchange_rate(
    state: &(impl StateProvider + ?Sized),
    denom: &str,
) -> RelayVoteResult<Option<u128>> {
    get_typed(state, &rate_key(denom))
}

pub fn set_exchange_rate(
    state: &(impl StateMutator + ?Sized),
    denom: &str,
    rate: u128,
) -> RelayVoteResult<()> {
    set_typed(state, &rate_key(denom), &rate)
}

pub fn is_processed(
    state: &(impl StateProvider + ?Sized),
    denom: &str,
    source_tx: &str,
) -> RelayVoteResult<bool> {
    state.exists(&processed_key(denom, source_tx))
}

pub fn mark_processed(
    state: &(impl StateMutator + ?Sized),
    denom: &str,
    source_tx: &str,
) -> RelayVoteResult<()> {
    set_typed(state, &processed_key(denom, source_tx), &())
}

/// Balance of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub address: Address,
    pub amount: u128,
}

/// Read-only view of the bridge ledger
pub struct BridgeLedger<S: StateStore> {
    state: Arc<S>,
}

impl<S: StateStore> BridgeLedger<S> {
    pub fn new(state: Arc<S>) -> Self {
        Self { state }
    }

    pub fn balance(&self, denom: &str, address: &Address) -> RelayVoteResult<u128> {
        balance(self.state.as_ref(), denom, address)
    }

    pub fn chain_era(&self, denom: &str) -> RelayVoteResult<Option<u32>> {
        chain_era(self.state.as_ref(), denom)
    }

    pub fn exchange_rate(&self, denom: &str) -> RelayVoteResult<Option<u128>> {
        exchange_rate(self.state.as_ref(), denom)
    }

    /// All non-zero balances of `denom`, in address order
    pub fn balances(&self, denom: &str) -> RelayVoteResult<Vec<BalanceEntry>> {
        let prefix = compose_key(BALANCE_PREFIX, &[denom.as_bytes(), EMPTY]);
        self.state
            .scan_prefix(&prefix)?
            .into_iter()
            .map(|(key, value)| {
                let raw: [u8; 32] = key[prefix.len()..].try_into().map_err(|_| {
                    RelayVoteError::DeserializationError("malformed balance key".into())
                })?;
                Ok(BalanceEntry {
                    address: Address::from_bytes(raw),
                    amount: decode_value(&value)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayvote_state::MemoryStateStore;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 32])
    }

    #[test]
    fn test_credit_accumulates() {
        let state = MemoryStateStore::new();
        assert_eq!(balance(&state, "usdx", &addr(1)).unwrap(), 0);

        credit(&state, "usdx", &addr(1), 40).unwrap();
        assert_eq!(credit(&state, "usdx", &addr(1), 2).unwrap(), 42);
        assert_eq!(balance(&state, "uatom", &addr(1)).unwrap(), 0);
    }

    #[test]
    fn test_credit_overflow() {
        let state = MemoryStateStore::new();
        credit(&state, "usdx", &addr(1), u128::MAX).unwrap();

        let err = credit(&state, "usdx", &addr(1), 1).unwrap_err();
        assert_eq!(err.code(), "invalid_action");
        assert_eq!(balance(&state, "usdx", &addr(1)).unwrap(), u128::MAX);
    }

    #[test]
    fn test_ledger_listing() {
        let state = Arc::new(MemoryStateStore::new());
        credit(state.as_ref(), "usdx", &addr(2), 5).unwrap();
        credit(state.as_ref(), "usdx", &addr(1), 3).unwrap();
        credit(state.as_ref(), "usdxx", &addr(1), 9).unwrap();
        set_chain_era(state.as_ref(), "usdx", 4).unwrap();

        let ledger = BridgeLedger::new(state);
        let balances = ledger.balances("usdx").unwrap();
        assert_eq!(
            balances,
            vec![
                BalanceEntry { address: addr(1), amount: 3 },
                BalanceEntry { address: addr(2), amount: 5 },
            ]
        );
        assert_eq!(ledger.chain_era("usdx").unwrap(), Some(4));
        assert_eq!(ledger.exchange_rate("usdx").unwrap(), None);
    }
}
