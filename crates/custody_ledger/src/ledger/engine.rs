//! The ledger: positions, registry, custody, and the realize-then-mutate operations.
//!
//! Every mutating operation computes its new position first, then moves the asset, and
//! commits only if the transfer succeeded. `&mut self` serializes calls; a failed call
//! leaves positions, registry, custody and the event log untouched.

use crate::asset::{normalize_account, AccountId, Amount, AssetId};
use crate::clock::Clock;
use crate::custody::{AssetTransfer, InMemoryCustody};
use crate::error::LedgerError;
use crate::events::{EventKind, LedgerEvent, Receipt};
use crate::ledger::position::{Position, PositionRecord};
use crate::registry::AssetRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use time::OffsetDateTime;

type PositionKey = (AssetId, AccountId);

/// Serializable ledger state, excluding custody and clock.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub registry: AssetRegistry,
    pub positions: Vec<PositionRecord>,
    pub events: Vec<LedgerEvent>,
}

pub struct Ledger<T: AssetTransfer = InMemoryCustody> {
    registry: AssetRegistry,
    positions: BTreeMap<PositionKey, Position>,
    custody: T,
    clock: Arc<dyn Clock>,
    events: Vec<LedgerEvent>,
}

impl<T: AssetTransfer> Ledger<T> {
    /// Empty ledger administered by `owner`.
    pub fn new(owner: AccountId, custody: T, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: AssetRegistry::new(owner),
            positions: BTreeMap::new(),
            custody,
            clock,
            events: Vec::new(),
        }
    }

    pub fn restore(snapshot: LedgerSnapshot, custody: T, clock: Arc<dyn Clock>) -> Self {
        let positions = snapshot
            .positions
            .into_iter()
            .map(|r| ((r.asset, r.account), r.position))
            .collect();
        Self {
            registry: snapshot.registry,
            positions,
            custody,
            clock,
            events: snapshot.events,
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            registry: self.registry.clone(),
            positions: self.position_records().collect(),
            events: self.events.clone(),
        }
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn owner(&self) -> &AccountId {
        self.registry.owner()
    }

    pub fn is_supported(&self, asset: &AssetId) -> bool {
        self.registry.is_supported(asset)
    }

    pub fn custody(&self) -> &T {
        &self.custody
    }

    /// Direct access to the custodian, e.g. to fund wallets or reserves.
    pub fn custody_mut(&mut self) -> &mut T {
        &mut self.custody
    }

    /// Units of `asset` held in custody.
    pub fn custody_balance(&self, asset: &AssetId) -> Amount {
        self.custody.held(asset)
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Stored (unrealized) position.
    pub fn position(&self, asset: &AssetId, account: &AccountId) -> Option<&Position> {
        self.positions.get(&(asset.clone(), normalize_account(account)))
    }

    pub fn position_records(&self) -> impl Iterator<Item = PositionRecord> + '_ {
        self.positions
            .iter()
            .map(|((asset, account), position)| PositionRecord {
                asset: asset.clone(),
                account: account.clone(),
                position: *position,
            })
    }

    /// Effective balance at the clock's current time. Never mutates.
    pub fn get_balance(
        &self,
        asset: &AssetId,
        account: &AccountId,
    ) -> Result<Amount, LedgerError> {
        let now_ts = self.clock.now().unix_timestamp();
        match self.position(asset, account) {
            Some(p) => p.effective_balance(now_ts),
            None => Ok(0),
        }
    }

    pub fn add_supported_asset(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
    ) -> Result<(), LedgerError> {
        self.registry.add_supported_asset(caller, asset)?;
        self.record(
            self.clock.now(),
            EventKind::AssetSupported {
                asset: asset.clone(),
            },
        );
        Ok(())
    }

    pub fn remove_supported_asset(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
    ) -> Result<(), LedgerError> {
        self.registry.remove_supported_asset(caller, asset)?;
        self.record(
            self.clock.now(),
            EventKind::AssetUnsupported {
                asset: asset.clone(),
            },
        );
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        caller: &AccountId,
        new_owner: AccountId,
    ) -> Result<(), LedgerError> {
        let previous = self.registry.owner().clone();
        self.registry.transfer_ownership(caller, new_owner)?;
        self.record(
            self.clock.now(),
            EventKind::OwnershipTransferred {
                previous,
                new_owner: self.registry.owner().clone(),
            },
        );
        Ok(())
    }

    /// Credit `amount` of the native currency, escrowed by `account` with the custodian.
    pub fn deposit_native(
        &mut self,
        account: &AccountId,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        self.credit(AssetId::Native, account, amount)
    }

    /// Pull `amount` of a supported token from `account` and credit it.
    pub fn deposit_token(
        &mut self,
        asset: &AssetId,
        account: &AccountId,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if asset.is_native() || !self.registry.is_supported(asset) {
            return Err(LedgerError::UnsupportedAsset {
                asset: asset.clone(),
            });
        }
        self.credit(asset.clone(), account, amount)
    }

    /// Withdraw native currency from the caller's own position.
    pub fn withdraw(
        &mut self,
        account: &AccountId,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        self.debit(AssetId::Native, account, amount)
    }

    /// Withdraw a token from the caller's own position. Eligibility is not re-checked.
    pub fn withdraw_token(
        &mut self,
        asset: &AssetId,
        account: &AccountId,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        self.debit(asset.clone(), account, amount)
    }

    fn credit(
        &mut self,
        asset: AssetId,
        account: &AccountId,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let now = self.clock.now();
        let account = &normalize_account(account);
        let key = (asset, account.clone());
        let current = self.positions.get(&key).copied().unwrap_or_default();
        let (mut next, interest) = current.realize(now.unix_timestamp())?;
        next.principal = next
            .principal
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.custody.transfer_in(&key.0, account, amount)?;

        let receipt = Receipt {
            asset: key.0.clone(),
            account: account.clone(),
            amount,
            interest_realized: interest,
            principal_after: next.principal,
            timestamp: now,
        };
        self.positions.insert(key, next);
        self.record(now, receipt.deposited());
        Ok(receipt)
    }

    fn debit(
        &mut self,
        asset: AssetId,
        account: &AccountId,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let now = self.clock.now();
        let account = &normalize_account(account);
        let key = (asset, account.clone());
        let current = self.positions.get(&key).copied().unwrap_or_default();
        let (mut next, interest) = current.realize(now.unix_timestamp())?;
        if next.principal < amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: next.principal,
            });
        }
        next.principal -= amount;

        self.custody.transfer_out(&key.0, account, amount)?;

        let receipt = Receipt {
            asset: key.0.clone(),
            account: account.clone(),
            amount,
            interest_realized: interest,
            principal_after: next.principal,
            timestamp: now,
        };
        self.positions.insert(key, next);
        self.record(now, receipt.withdrawn());
        Ok(receipt)
    }

    fn record(&mut self, timestamp: OffsetDateTime, kind: EventKind) {
        let seq = self.events.len() as u64 + 1;
        self.events.push(LedgerEvent {
            seq,
            timestamp,
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::custody::TransferError;
    use crate::ledger::interest::SECONDS_PER_YEAR;

    const ETHER: Amount = 1_000_000_000_000_000_000;
    const T0: i64 = 1_700_000_000;

    fn owner() -> AccountId {
        "0x0wner".into()
    }

    fn alice() -> AccountId {
        "0xa11ce".into()
    }

    fn sm_token() -> AssetId {
        AssetId::token("0x5fbdb2315678afecb367f032d93f642f64180aa3").unwrap()
    }

    fn setup() -> (Ledger, ManualClock) {
        let clock = ManualClock::at(T0);
        let mut ledger = Ledger::new(owner(), InMemoryCustody::new(), Arc::new(clock.clone()));
        ledger.add_supported_asset(&owner(), &sm_token()).unwrap();
        let custody = ledger.custody_mut();
        custody.mint(&AssetId::Native, &alice(), 1_000 * ETHER);
        custody.mint(&sm_token(), &alice(), 1_000 * ETHER);
        (ledger, clock)
    }

    #[test]
    fn deposit_then_withdraw_native() {
        let (mut ledger, _) = setup();
        let receipt = ledger.deposit_native(&alice(), ETHER).unwrap();
        assert_eq!(receipt.principal_after, ETHER);
        assert_eq!(ledger.get_balance(&AssetId::Native, &alice()).unwrap(), ETHER);
        assert_eq!(ledger.custody_balance(&AssetId::Native), ETHER);

        ledger.withdraw(&alice(), ETHER).unwrap();
        assert_eq!(ledger.get_balance(&AssetId::Native, &alice()).unwrap(), 0);
        assert_eq!(ledger.custody_balance(&AssetId::Native), 0);
        assert_eq!(
            ledger.custody().wallet_balance(&AssetId::Native, &alice()),
            1_000 * ETHER
        );
    }

    #[test]
    fn one_year_native_interest() {
        let (mut ledger, clock) = setup();
        ledger.deposit_native(&alice(), 100 * ETHER).unwrap();
        clock.advance(SECONDS_PER_YEAR as i64);
        let expected = 100 * ETHER + (100 * ETHER * 500) / 10_000;
        assert_eq!(
            ledger.get_balance(&AssetId::Native, &alice()).unwrap(),
            expected
        );
    }

    #[test]
    fn deposit_realizes_before_crediting() {
        let (mut ledger, clock) = setup();
        ledger.deposit_native(&alice(), 100).unwrap();
        clock.advance(SECONDS_PER_YEAR as i64);
        let before = ledger.get_balance(&AssetId::Native, &alice()).unwrap();
        let receipt = ledger.deposit_native(&alice(), 10).unwrap();
        assert_eq!(receipt.interest_realized, 5);
        assert_eq!(
            ledger.get_balance(&AssetId::Native, &alice()).unwrap(),
            before + 10
        );
        let pos = ledger.position(&AssetId::Native, &alice()).unwrap();
        assert_eq!(pos.principal, 115);
        assert_eq!(pos.last_update_ts, T0 + SECONDS_PER_YEAR as i64);
    }

    #[test]
    fn get_balance_does_not_realize() {
        let (mut ledger, clock) = setup();
        ledger.deposit_native(&alice(), 100).unwrap();
        clock.advance(SECONDS_PER_YEAR as i64);
        assert_eq!(ledger.get_balance(&AssetId::Native, &alice()).unwrap(), 105);
        assert_eq!(ledger.get_balance(&AssetId::Native, &alice()).unwrap(), 105);
        let pos = ledger.position(&AssetId::Native, &alice()).unwrap();
        assert_eq!(pos.principal, 100);
        assert_eq!(pos.last_update_ts, T0);
    }

    #[test]
    fn zero_amounts_rejected() {
        let (mut ledger, _) = setup();
        assert_eq!(
            ledger.deposit_native(&alice(), 0),
            Err(LedgerError::InvalidAmount)
        );
        assert_eq!(
            ledger.deposit_token(&sm_token(), &alice(), 0),
            Err(LedgerError::InvalidAmount)
        );
        assert_eq!(ledger.withdraw(&alice(), 0), Err(LedgerError::InvalidAmount));
        assert_eq!(
            ledger.withdraw_token(&sm_token(), &alice(), 0),
            Err(LedgerError::InvalidAmount)
        );
        assert!(ledger.events().iter().all(|e| matches!(
            e.kind,
            EventKind::AssetSupported { .. }
        )));
    }

    #[test]
    fn insufficient_balance_leaves_state() {
        let (mut ledger, clock) = setup();
        ledger.deposit_native(&alice(), 100).unwrap();
        clock.advance(SECONDS_PER_YEAR as i64);
        let err = ledger.withdraw(&alice(), 106).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                requested: 106,
                available: 105
            }
        );
        let pos = ledger.position(&AssetId::Native, &alice()).unwrap();
        assert_eq!(pos.principal, 100);
        assert_eq!(pos.last_update_ts, T0);
        assert_eq!(ledger.custody_balance(&AssetId::Native), 100);
    }

    #[test]
    fn withdraw_with_no_position_is_insufficient() {
        let (mut ledger, _) = setup();
        assert_eq!(
            ledger.withdraw(&alice(), 1),
            Err(LedgerError::InsufficientBalance {
                requested: 1,
                available: 0
            })
        );
        assert!(ledger.position(&AssetId::Native, &alice()).is_none());
    }

    #[test]
    fn deposit_token_requires_allowance() {
        let (mut ledger, _) = setup();
        let err = ledger.deposit_token(&sm_token(), &alice(), ETHER).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::TransferFailed(TransferError::InsufficientAllowance { .. })
        ));
        assert!(ledger.position(&sm_token(), &alice()).is_none());

        ledger.custody_mut().approve(&sm_token(), &alice(), ETHER);
        ledger.deposit_token(&sm_token(), &alice(), ETHER).unwrap();
        assert_eq!(ledger.get_balance(&sm_token(), &alice()).unwrap(), ETHER);
    }

    #[test]
    fn deposit_token_rejects_native_and_unlisted() {
        let (mut ledger, _) = setup();
        let fake = AssetId::token("0x1234567890123456789012345678901234567890").unwrap();
        assert_eq!(
            ledger.deposit_token(&fake, &alice(), 1),
            Err(LedgerError::UnsupportedAsset {
                asset: fake.clone()
            })
        );
        assert_eq!(
            ledger.deposit_token(&AssetId::Native, &alice(), 1),
            Err(LedgerError::UnsupportedAsset {
                asset: AssetId::Native
            })
        );
    }

    #[test]
    fn failed_push_rolls_back_withdrawal() {
        let (mut ledger, clock) = setup();
        ledger.deposit_native(&alice(), 100).unwrap();
        clock.advance(SECONDS_PER_YEAR as i64);

        // interest is owed but the vault only holds the principal
        let err = ledger.withdraw(&alice(), 105).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::TransferFailed(TransferError::CustodyShortfall { .. })
        ));

        ledger.custody_mut().reject_transfers_to(&alice());
        let err = ledger.withdraw(&alice(), 50).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::TransferFailed(TransferError::RecipientRejected(_))
        ));

        let pos = ledger.position(&AssetId::Native, &alice()).unwrap();
        assert_eq!(pos.principal, 100);
        assert_eq!(pos.last_update_ts, T0);
        assert_eq!(ledger.custody_balance(&AssetId::Native), 100);
        assert_eq!(ledger.events().len(), 2);
    }

    #[test]
    fn withdraw_interest_from_funded_reserve() {
        let (mut ledger, clock) = setup();
        ledger.deposit_native(&alice(), 100).unwrap();
        ledger.custody_mut().fund_reserve(&AssetId::Native, 5);
        clock.advance(SECONDS_PER_YEAR as i64);
        let receipt = ledger.withdraw(&alice(), 105).unwrap();
        assert_eq!(receipt.interest_realized, 5);
        assert_eq!(receipt.principal_after, 0);
        assert_eq!(ledger.get_balance(&AssetId::Native, &alice()).unwrap(), 0);
        assert_eq!(ledger.custody_balance(&AssetId::Native), 0);
    }

    #[test]
    fn zero_address_never_becomes_a_token() {
        let (mut ledger, _) = setup();
        let zero = AssetId::token(crate::asset::NATIVE_ADDRESS).unwrap();
        assert_eq!(zero, AssetId::Native);
        assert_eq!(
            ledger.add_supported_asset(&owner(), &zero),
            Err(LedgerError::InvalidAsset)
        );
        assert_eq!(
            ledger.deposit_token(&zero, &alice(), 1),
            Err(LedgerError::UnsupportedAsset {
                asset: AssetId::Native
            })
        );
        assert!(ledger.registry().entries().all(|(a, _)| !a.is_native()));
    }

    #[test]
    fn token_address_case_shares_one_position() {
        let (mut ledger, _) = setup();
        let upper = AssetId::token("0x5FBDB2315678AFECB367F032D93F642F64180AA3").unwrap();
        assert_eq!(upper, sm_token());
        ledger.custody_mut().approve(&upper, &alice(), 10);
        ledger.deposit_token(&upper, &alice(), 4).unwrap();
        ledger.deposit_token(&sm_token(), &alice(), 6).unwrap();
        assert_eq!(ledger.position_records().count(), 1);
        assert_eq!(ledger.get_balance(&sm_token(), &alice()).unwrap(), 10);
    }

    #[test]
    fn account_case_is_ignored() {
        let clock = ManualClock::at(T0);
        let mut ledger = Ledger::new(
            "0xAbCd".to_string(),
            InMemoryCustody::new(),
            Arc::new(clock),
        );
        assert_eq!(ledger.owner(), "0xabcd");
        ledger
            .add_supported_asset(&"0xABCD".to_string(), &sm_token())
            .unwrap();

        let mixed = "0xA11CE".to_string();
        ledger.custody_mut().mint(&AssetId::Native, &mixed, 100);
        ledger.deposit_native(&mixed, 60).unwrap();
        ledger.deposit_native(&alice(), 40).unwrap();
        assert_eq!(ledger.position_records().count(), 1);
        assert_eq!(ledger.get_balance(&AssetId::Native, &mixed).unwrap(), 100);
        assert_eq!(ledger.position(&AssetId::Native, &alice()).unwrap().principal, 100);

        ledger
            .transfer_ownership(&"0xabcd".to_string(), "0xNeW".to_string())
            .unwrap();
        assert_eq!(ledger.owner(), "0xnew");
        ledger
            .remove_supported_asset(&"0xNEW".to_string(), &sm_token())
            .unwrap();
        assert!(matches!(
            ledger.events().last().map(|e| &e.kind),
            Some(EventKind::AssetUnsupported { .. })
        ));
    }

    #[test]
    fn overflowing_interest_is_rejected_without_change() {
        let (mut ledger, clock) = setup();
        let huge = u128::MAX / 1_000;
        ledger.custody_mut().mint(&AssetId::Native, &alice(), huge);
        ledger.deposit_native(&alice(), huge).unwrap();
        clock.advance(SECONDS_PER_YEAR as i64);

        let before = ledger.snapshot();
        let held = ledger.custody_balance(&AssetId::Native);
        assert_eq!(
            ledger.get_balance(&AssetId::Native, &alice()),
            Err(LedgerError::Overflow)
        );
        assert_eq!(
            ledger.deposit_native(&alice(), 1),
            Err(LedgerError::Overflow)
        );
        assert_eq!(ledger.withdraw(&alice(), 1), Err(LedgerError::Overflow));
        assert_eq!(ledger.snapshot(), before);
        assert_eq!(ledger.custody_balance(&AssetId::Native), held);
    }

    #[test]
    fn snapshot_restore_preserves_balances() {
        let (mut ledger, clock) = setup();
        ledger.deposit_native(&alice(), 100).unwrap();
        let snap = ledger.snapshot();
        let custody = ledger.custody().clone();
        let restored = Ledger::restore(snap.clone(), custody, Arc::new(clock.clone()));
        clock.advance(SECONDS_PER_YEAR as i64);
        assert_eq!(
            restored.get_balance(&AssetId::Native, &alice()).unwrap(),
            105
        );
        assert_eq!(restored.snapshot(), snap);
    }
}
