//! Handlers applying approved bridge actions

use relayvote_core::{Action, ActionRoute, RelayVoteError, RelayVoteResult};
use relayvote_voting::{ActionHandler, Event, ExecutionScope, Router};
use std::sync::Arc;
use tracing::info;

use crate::ledger;

pub const EVENT_DEPOSIT: &str = "deposit";
pub const EVENT_SET_CHAIN_ERA: &str = "set_chain_era";
pub const EVENT_SET_EXCHANGE_RATE: &str = "set_exchange_rate";

fn wrong_action(route: ActionRoute, action: &Action) -> RelayVoteError {
    RelayVoteError::InvalidAction(format!(
        "{} handler received {} action",
        route,
        action.route()
    ))
}

/// Credits the recipient once per source transaction
pub struct DepositHandler;

impl ActionHandler for DepositHandler {
    fn route(&self) -> ActionRoute {
        ActionRoute::Deposit
    }

    fn handle(
        &self,
        scope: &mut ExecutionScope<'_>,
        denom: &str,
        action: &Action,
    ) -> RelayVoteResult<()> {
        let Action::Deposit {
            recipient,
            amount,
            source_tx,
        } = action
        else {
            return Err(wrong_action(self.route(), action));
        };

        if *amount == 0 {
            return Err(RelayVoteError::InvalidAction("deposit amount is zero".into()));
        }
        if ledger::is_processed(&scope.store, denom, source_tx)? {
            return Err(RelayVoteError::InvalidAction(format!(
                "source tx {} already processed",
                source_tx
            )));
        }

        let balance = ledger::credit(&scope.store, denom, recipient, *amount)?;
        ledger::mark_processed(&scope.store, denom, source_tx)?;

        info!("Deposit of {} {} to {} ({})", amount, denom, recipient, source_tx);
        scope.emit(
            Event::new(EVENT_DEPOSIT)
                .attr("denom", denom)
                .attr("recipient", recipient)
                .attr("amount", amount)
                .attr("balance", balance)
                .attr("source_tx", source_tx),
        );
        Ok(())
    }
}

/// Records the external chain's era; eras only move forward
pub struct ChainEraHandler;

impl ActionHandler for ChainEraHandler {
    fn route(&self) -> ActionRoute {
        ActionRoute::ChainEra
    }

    fn handle(
        &self,
        scope: &mut ExecutionScope<'_>,
        denom: &str,
        action: &Action,
    ) -> RelayVoteResult<()> {
        let Action::SetChainEra { era } = action else {
            return Err(wrong_action(self.route(), action));
        };

        if let Some(current) = ledger::chain_era(&scope.store, denom)? {
            if *era <= current {
                return Err(RelayVoteError::InvalidAction(format!(
                    "era {} is not after current era {} of {}",
                    era, current, denom
                )));
            }
        }
        ledger::set_chain_era(&scope.store, denom, *era)?;

        info!("Chain era of {} advanced to {}", denom, era);
        scope.emit(
            Event::new(EVENT_SET_CHAIN_ERA)
                .attr("denom", denom)
                .attr("era", era),
        );
        Ok(())
    }
}

/// Records the observed exchange rate
pub struct ExchangeRateHandler;

impl ActionHandler for ExchangeRateHandler {
    fn route(&self) -> ActionRoute {
        ActionRoute::ExchangeRate
    }

    fn handle(
        &self,
        scope: &mut ExecutionScope<'_>,
        denom: &str,
        action: &Action,
    ) -> RelayVoteResult<()> {
        let Action::SetExchangeRate { rate } = action else {
            return Err(wrong_action(self.route(), action));
        };

        if *rate == 0 {
            return Err(RelayVoteError::InvalidAction("exchange rate is zero".into()));
        }
        ledger::set_exchange_rate(&scope.store, denom, *rate)?;

        info!("Exchange rate of {} set to {}", denom, rate);
        scope.emit(
            Event::new(EVENT_SET_EXCHANGE_RATE)
                .attr("denom", denom)
                .attr("rate", rate),
        );
        Ok(())
    }
}

/// Router with every bridge handler registered
pub fn bridge_router() -> Router {
    Router::new()
        .with_handler(Arc::new(DepositHandler))
        .with_handler(Arc::new(ChainEraHandler))
        .with_handler(Arc::new(ExchangeRateHandler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayvote_core::{Address, Height, ProposalContent};
    use relayvote_state::{CacheStore, MemoryStateStore};
    use relayvote_voting::dispatch;

    fn deposit(amount: u128, source_tx: &str) -> ProposalContent {
        ProposalContent::new(
            "usdx",
            Action::Deposit {
                recipient: Address::from_bytes([7u8; 32]),
                amount,
                source_tx: source_tx.into(),
            },
        )
    }

    fn run(state: &MemoryStateStore, content: &ProposalContent) -> RelayVoteResult<()> {
        let execution = dispatch(&bridge_router(), state, Height::new(1), content)?;
        relayvote_core::StateMutator::apply_batch(state, execution.changes)?;
        Ok(())
    }

    #[test]
    fn test_router_covers_every_route() {
        let router = bridge_router();
        for route in ActionRoute::ALL {
            assert!(router.has_route(route), "missing {}", route);
        }
    }

    #[test]
    fn test_deposit_credits_once() {
        let state = MemoryStateStore::new();
        let recipient = Address::from_bytes([7u8; 32]);

        run(&state, &deposit(100, "0xaa")).unwrap();
        run(&state, &deposit(50, "0xbb")).unwrap();
        assert_eq!(ledger::balance(&state, "usdx", &recipient).unwrap(), 150);

        let err = run(&state, &deposit(100, "0xaa")).unwrap_err();
        assert_eq!(err.code(), "execution_failed");
        assert_eq!(ledger::balance(&state, "usdx", &recipient).unwrap(), 150);
    }

    #[test]
    fn test_zero_deposit_rejected() {
        let state = MemoryStateStore::new();
        assert!(run(&state, &deposit(0, "0xcc")).is_err());
        assert!(!ledger::is_processed(&state, "usdx", "0xcc").unwrap());
    }

    #[test]
    fn test_era_strictly_increases() {
        let state = MemoryStateStore::new();
        let era = |era| ProposalContent::new("usdx", Action::SetChainEra { era });

        run(&state, &era(1)).unwrap();
        run(&state, &era(3)).unwrap();
        assert!(run(&state, &era(3)).is_err());
        assert!(run(&state, &era(2)).is_err());
        assert_eq!(ledger::chain_era(&state, "usdx").unwrap(), Some(3));
    }

    #[test]
    fn test_exchange_rate() {
        let state = MemoryStateStore::new();
        let rate = |rate| ProposalContent::new("usdx", Action::SetExchangeRate { rate });

        assert!(run(&state, &rate(0)).is_err());
        run(&state, &rate(1_050_000_000_000_000_000)).unwrap();
        assert_eq!(
            ledger::exchange_rate(&state, "usdx").unwrap(),
            Some(1_050_000_000_000_000_000)
        );
    }

    #[test]
    fn test_handler_rejects_foreign_action() {
        let state = MemoryStateStore::new();
        let mut scope = ExecutionScope::new(CacheStore::new(&state), Height::new(1));

        let err = DepositHandler
            .handle(&mut scope, "usdx", &Action::SetChainEra { era: 1 })
            .unwrap_err();
        assert_eq!(err.code(), "invalid_action");
        assert!(scope.store.is_empty());
    }

    #[test]
    fn test_events_emitted() {
        let state = MemoryStateStore::new();
        let execution = dispatch(&bridge_router(), &state, Height::new(1), &deposit(5, "0x01"))
            .unwrap();

        let event = &execution.events.events()[0];
        assert_eq!(event.kind, EVENT_DEPOSIT);
        assert_eq!(event.get("amount"), Some("5"));
    }
}
