//! Store-backed relayer and admin registries
//!
//! Keys:
//! - `admin:<address>` -> `()`
//! - `relayer:<len><denom><address>` -> `()`
//! - `threshold:<denom>` -> `u32`

use relayvote_core::{
    Address, AdminRegistry, RelayVoteError, RelayVoteResult, RelayerRegistry, StateMutator,
    StateProvider,
};
use relayvote_state::{compose_key, get_typed, set_typed, StateStore};
use std::sync::Arc;
use tracing::info;

use crate::events::{Event, TxContext, EVENT_REGISTRY_UPDATE};

const ADMIN_PREFIX: &[u8] = b"admin:";
const RELAYER_PREFIX: &[u8] = b"relayer:";
const THRESHOLD_PREFIX: &[u8] = b"threshold:";
const EMPTY: &[u8] = &[];

fn admin_key(address: &Address) -> Vec<u8> {
    compose_key(ADMIN_PREFIX, &[address.as_bytes()])
}

fn relayer_prefix(denom: &str) -> Vec<u8> {
    // Trailing empty segment length-prefixes the denom
    compose_key(RELAYER_PREFIX, &[denom.as_bytes(), EMPTY])
}

fn relayer_key(denom: &str, address: &Address) -> Vec<u8> {
    compose_key(RELAYER_PREFIX, &[denom.as_bytes(), address.as_bytes()])
}

fn threshold_key(denom: &str) -> Vec<u8> {
    compose_key(THRESHOLD_PREFIX, &[denom.as_bytes()])
}

fn decode_address(bytes: &[u8]) -> RelayVoteResult<Address> {
    let raw: [u8; 32] = bytes
        .try_into()
        .map_err(|_| RelayVoteError::DeserializationError("malformed address key".into()))?;
    Ok(Address::from_bytes(raw))
}

/// Write an admin entry without authorization; genesis only
pub fn put_admin(state: &(impl StateMutator + ?Sized), address: &Address) -> RelayVoteResult<()> {
    set_typed(state, &admin_key(address), &())
}

/// Write a relayer entry without authorization; genesis only
pub fn put_relayer(
    state: &(impl StateMutator + ?Sized),
    denom: &str,
    address: &Address,
) -> RelayVoteResult<()> {
    set_typed(state, &relayer_key(denom, address), &())
}

/// Write a threshold without authorization; genesis only
pub fn put_threshold(
    state: &(impl StateMutator + ?Sized),
    denom: &str,
    value: u32,
) -> RelayVoteResult<()> {
    if value == 0 {
        return Err(RelayVoteError::InvalidParam(format!(
            "threshold for {} must be positive",
            denom
        )));
    }
    set_typed(state, &threshold_key(denom), &value)
}

/// All admins in key order
pub fn list_admins(state: &(impl StateProvider + ?Sized)) -> RelayVoteResult<Vec<Address>> {
    state
        .scan_prefix(ADMIN_PREFIX)?
        .into_iter()
        .map(|(key, _)| decode_address(&key[ADMIN_PREFIX.len()..]))
        .collect()
}

/// Relayers registered for `denom`, in address order
pub fn list_relayers(
    state: &(impl StateProvider + ?Sized),
    denom: &str,
) -> RelayVoteResult<Vec<Address>> {
    let prefix = relayer_prefix(denom);
    state
        .scan_prefix(&prefix)?
        .into_iter()
        .map(|(key, _)| decode_address(&key[prefix.len()..]))
        .collect()
}

/// Every `(denom, relayers)` group, sorted by denom
pub fn list_all_relayers(
    state: &(impl StateProvider + ?Sized),
) -> RelayVoteResult<Vec<(String, Vec<Address>)>> {
    let mut groups: Vec<(String, Vec<Address>)> = Vec::new();

    for (key, _) in state.scan_prefix(RELAYER_PREFIX)? {
        let rest = &key[RELAYER_PREFIX.len()..];
        if rest.len() < 4 {
            return Err(RelayVoteError::DeserializationError("malformed relayer key".into()));
        }
        let (len_bytes, rest) = rest.split_at(4);
        let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
            as usize;
        if rest.len() < len {
            return Err(RelayVoteError::DeserializationError("malformed relayer key".into()));
        }
        let (denom, address) = rest.split_at(len);
        let denom = String::from_utf8(denom.to_vec())
            .map_err(|e| RelayVoteError::DeserializationError(e.to_string()))?;
        let address = decode_address(address)?;

        match groups.last_mut() {
            Some((last, addresses)) if *last == denom => addresses.push(address),
            _ => groups.push((denom, vec![address])),
        }
    }

    groups.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(groups)
}

/// Every `(denom, threshold)` pair, in denom order
pub fn list_thresholds(
    state: &(impl StateProvider + ?Sized),
) -> RelayVoteResult<Vec<(String, u32)>> {
    state
        .scan_prefix(THRESHOLD_PREFIX)?
        .into_iter()
        .map(|(key, value)| {
            let denom = String::from_utf8(key[THRESHOLD_PREFIX.len()..].to_vec())
                .map_err(|e| RelayVoteError::DeserializationError(e.to_string()))?;
            Ok((denom, relayvote_state::decode_value(&value)?))
        })
        .collect()
}

/// Relayer sets, thresholds and admins kept in the replicated store
pub struct RegistryStore<S: StateStore> {
    state: Arc<S>,
}

impl<S: StateStore> RegistryStore<S> {
    pub fn new(state: Arc<S>) -> Self {
        Self { state }
    }

    fn ensure_admin(&self, caller: &Address) -> RelayVoteResult<()> {
        if self.is_admin(caller)? {
            Ok(())
        } else {
            Err(RelayVoteError::NotAuthorized)
        }
    }

    pub fn add_admin(
        &self,
        ctx: &mut TxContext,
        caller: &Address,
        address: &Address,
    ) -> RelayVoteResult<()> {
        self.ensure_admin(caller)?;
        put_admin(self.state.as_ref(), address)?;

        info!("Admin {} added by {}", address, caller);
        ctx.emit(
            Event::new(EVENT_REGISTRY_UPDATE)
                .attr("op", "add_admin")
                .attr("address", address),
        );
        Ok(())
    }

    pub fn add_relayer(
        &self,
        ctx: &mut TxContext,
        caller: &Address,
        denom: &str,
        address: &Address,
    ) -> RelayVoteResult<()> {
        self.ensure_admin(caller)?;
        put_relayer(self.state.as_ref(), denom, address)?;

        info!("Relayer {} added for {}", address, denom);
        ctx.emit(
            Event::new(EVENT_REGISTRY_UPDATE)
                .attr("op", "add_relayer")
                .attr("denom", denom)
                .attr("address", address),
        );
        Ok(())
    }

    pub fn remove_relayer(
        &self,
        ctx: &mut TxContext,
        caller: &Address,
        denom: &str,
        address: &Address,
    ) -> RelayVoteResult<()> {
        self.ensure_admin(caller)?;
        self.state.delete(&relayer_key(denom, address))?;

        info!("Relayer {} removed for {}", address, denom);
        ctx.emit(
            Event::new(EVENT_REGISTRY_UPDATE)
                .attr("op", "remove_relayer")
                .attr("denom", denom)
                .attr("address", address),
        );
        Ok(())
    }

    pub fn set_threshold(
        &self,
        ctx: &mut TxContext,
        caller: &Address,
        denom: &str,
        value: u32,
    ) -> RelayVoteResult<()> {
        self.ensure_admin(caller)?;
        put_threshold(self.state.as_ref(), denom, value)?;

        info!("Threshold for {} set to {}", denom, value);
        ctx.emit(
            Event::new(EVENT_REGISTRY_UPDATE)
                .attr("op", "set_threshold")
                .attr("denom", denom)
                .attr("value", value),
        );
        Ok(())
    }

    pub fn relayers(&self, denom: &str) -> RelayVoteResult<Vec<Address>> {
        list_relayers(self.state.as_ref(), denom)
    }

    pub fn admins(&self) -> RelayVoteResult<Vec<Address>> {
        list_admins(self.state.as_ref())
    }
}

impl<S: StateStore> AdminRegistry for RegistryStore<S> {
    fn is_admin(&self, address: &Address) -> RelayVoteResult<bool> {
        self.state.exists(&admin_key(address))
    }
}

impl<S: StateStore> RelayerRegistry for RegistryStore<S> {
    fn is_relayer(&self, denom: &str, address: &Address) -> RelayVoteResult<bool> {
        self.state.exists(&relayer_key(denom, address))
    }

    fn threshold(&self, denom: &str) -> RelayVoteResult<Option<u32>> {
        get_typed(self.state.as_ref(), &threshold_key(denom))
    }
}
