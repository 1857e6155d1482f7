use feeflow_burner::{DutchAuctionBurner, ExchangeTransfer};
use feeflow_fees::FeeSchedule;
use feeflow_hooks::{CallDispatcher, Hook, HookCall, HookInput, Hooker};
use feeflow_ledger::{Ledger, MemoryLedger};
use feeflow_types::{
    AccountId, Amount, Authority, CallContext, CoinId, Epoch, EpochFlags, EpochSchedule, FeeflowError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::FeeCollectorConfig;
use crate::error::Result;
use crate::state::CollectorStatus;

/// Call made on the keeper's behalf before a COLLECT payout, typically an
/// executor that pulls fees out of their sources into the collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callback {
    pub to: AccountId,
    #[serde(default)]
    pub data: Vec<u8>,
}

impl Callback {
    pub fn new(to: AccountId, data: impl Into<Vec<u8>>) -> Self {
        Callback {
            to,
            data: data.into(),
        }
    }
}

/// Accumulates protocol fees and drives them through the weekly cycle:
/// COLLECT pays keepers for bringing fees in, EXCHANGE sells them through
/// the burner, FORWARD sends the target coin to the hooker.
///
/// The collector owns the ledger, the hooker and the burner. Every entry
/// point either applies completely or leaves all three untouched.
#[derive(Debug)]
pub struct FeeCollector<L = MemoryLedger> {
    account: AccountId,
    target: CoinId,
    wrapped_native: CoinId,
    authority: Authority,
    clock: EpochSchedule,
    fees: FeeSchedule,
    killed: BTreeMap<CoinId, EpochFlags>,
    hooker: Hooker,
    burner: DutchAuctionBurner,
    ledger: L,
}

impl<L: Ledger> FeeCollector<L> {
    pub fn new(config: FeeCollectorConfig, ledger: L) -> Result<Self> {
        config.validate()?;
        let authority = Authority::new(config.owner.clone(), config.emergency_owner.clone());

        let hooker = Hooker::new(
            config.hooker_account.clone(),
            config.account.clone(),
            config.target.clone(),
            authority.clone(),
            config.epochs,
            config.hooker,
        )?;
        let burner = DutchAuctionBurner::new(
            config.burner_account.clone(),
            config.account.clone(),
            config.target.clone(),
            authority.clone(),
            config.epochs,
            config.burner,
        )?;

        let mut collector = FeeCollector {
            account: config.account,
            target: config.target,
            wrapped_native: config.wrapped_native,
            authority,
            clock: config.epochs,
            fees: FeeSchedule::new(config.fees)?,
            killed: BTreeMap::new(),
            hooker,
            burner,
            ledger,
        };
        collector.approve_hooker()?;

        tracing::info!(
            "Fee collector {} created: target {}, {} hooks",
            collector.account,
            collector.target,
            collector.hooker.hooks().len()
        );
        Ok(collector)
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn target(&self) -> &CoinId {
        &self.target
    }

    pub fn wrapped_native(&self) -> &CoinId {
        &self.wrapped_native
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn clock(&self) -> &EpochSchedule {
        &self.clock
    }

    pub fn hooker(&self) -> &Hooker {
        &self.hooker
    }

    pub fn burner(&self) -> &DutchAuctionBurner {
        &self.burner
    }

    /// For the burner's own administration (records, price parameters)
    pub fn burner_mut(&mut self) -> &mut DutchAuctionBurner {
        &mut self.burner
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    // ---- fee intake ----

    /// Takes `amount` of `coin` from the caller. The native coin comes out
    /// of the attached value and is wrapped; anything else is pulled
    /// through the allowance the caller gave this collector.
    pub fn burn(&mut self, ctx: &CallContext, coin: &CoinId, amount: Amount) -> Result<()> {
        self.atomic(|collector| {
            if coin.is_native() {
                if ctx.value < amount {
                    return Err(FeeflowError::InsufficientValue {
                        attached: ctx.value.raw(),
                        required: amount.raw(),
                    }
                    .into());
                }
                collector
                    .ledger
                    .transfer(&ctx.caller, &collector.account, coin, amount)?;
                collector.wrap_native()?;
            } else {
                collector.ledger.transfer_from(
                    &collector.account,
                    &ctx.caller,
                    &collector.account,
                    coin,
                    amount,
                )?;
            }
            tracing::info!("Burn: {} {} received from {}", amount, coin, ctx.caller);
            Ok(())
        })
    }

    // ---- COLLECT ----

    /// Runs the optional callback, wraps native value, then pays `receiver`
    /// the COLLECT keeper fee on what each coin's balance grew by.
    ///
    /// `coins` must be strictly increasing and none of them killed for
    /// COLLECT. Returns the payout per coin.
    pub fn collect<D: CallDispatcher>(
        &mut self,
        dispatcher: &mut D,
        ctx: &CallContext,
        coins: &[CoinId],
        callback: Option<&Callback>,
        receiver: &AccountId,
    ) -> Result<Vec<Amount>> {
        self.clock.ensure_epoch(Epoch::Collect, ctx.ts)?;
        ensure_sorted(coins)?;
        for coin in coins {
            self.ensure_alive(coin, Epoch::Collect)?;
        }

        self.atomic(|collector| {
            collector
                .ledger
                .transfer(&ctx.caller, &collector.account, &CoinId::native(), ctx.value)?;

            if let Some(callback) = callback.filter(|cb| !cb.to.is_zero()) {
                let call = HookCall {
                    from: collector.account.clone(),
                    target: callback.to.clone(),
                    value: Amount::ZERO,
                    calldata: callback.data.clone(),
                };
                tracing::debug!("Collect callback: {}", call);
                dispatcher
                    .dispatch(&mut collector.ledger, &call)
                    .map_err(|err| FeeflowError::HookCallFailed {
                        target: call.target.to_string(),
                        reason: err.to_string(),
                    })?;
            }
            collector.wrap_native()?;

            let inner = ctx.forwarded(collector.account.clone(), Amount::ZERO);
            let payouts = collector.burner.burn(
                &mut collector.ledger,
                &collector.fees,
                &inner,
                coins,
                receiver,
                false,
            )?;
            tracing::info!(
                "Collect by {}: {} coins, receiver {}",
                ctx.caller,
                coins.len(),
                receiver
            );
            Ok(payouts)
        })
    }

    // ---- EXCHANGE ----

    /// Whether `exchange` would accept these coins at `ts`
    pub fn can_exchange(&self, coins: &[CoinId], ts: u64) -> bool {
        self.clock.epoch(ts) == Epoch::Exchange
            && coins.iter().all(|coin| !self.is_killed(coin, Epoch::Exchange))
    }

    /// Sells coins from this collector's holdings through the burner.
    /// Returns the target charged.
    pub fn exchange(&mut self, ctx: &CallContext, transfers: &[ExchangeTransfer]) -> Result<Amount> {
        self.clock.ensure_epoch(Epoch::Exchange, ctx.ts)?;
        for transfer in transfers {
            self.ensure_alive(&transfer.coin, Epoch::Exchange)?;
        }
        let charged = self.burner.exchange(&mut self.ledger, ctx, transfers)?;
        Ok(charged)
    }

    /// Sweeps target coin sitting at the burner into this collector
    pub fn push_target(&mut self) -> Result<Amount> {
        Ok(self.burner.push_target(&mut self.ledger)?)
    }

    // ---- FORWARD ----

    /// Hands the whole target balance over to the hooker, less the keeper
    /// fee and the compensation for `inputs` which go to `receiver`. The
    /// hooker then runs its duties with this collector as caller.
    ///
    /// Returns what `receiver` was paid.
    pub fn forward<D: CallDispatcher>(
        &mut self,
        dispatcher: &mut D,
        ctx: &CallContext,
        inputs: &[HookInput],
        receiver: &AccountId,
    ) -> Result<Amount> {
        self.clock.ensure_epoch(Epoch::Forward, ctx.ts)?;
        self.ensure_alive(&self.target.clone(), Epoch::Forward)?;
        self.hooker
            .registry()
            .validate_inputs(inputs, true, FeeflowError::NotAllDuties)?;

        self.atomic(|collector| {
            let total = collector.ledger.balance_of(&collector.account, &collector.target);
            let fee = collector
                .fees
                .apply(&collector.clock, total, Epoch::Forward, ctx.ts)?;
            let compensation = collector.hooker.calc_compensation(inputs, false, ctx.ts)?;
            let payout = fee.checked_add(compensation)?.min(total);
            let rest = total.checked_sub(payout)?;

            collector
                .ledger
                .transfer(&collector.account, receiver, &collector.target, payout)?;
            collector.ledger.transfer(
                &collector.account,
                collector.hooker.account(),
                &collector.target,
                rest,
            )?;

            collector
                .ledger
                .transfer(&ctx.caller, &collector.account, &CoinId::native(), ctx.value)?;
            let inner = ctx.forwarded(collector.account.clone(), ctx.value);
            let credited = collector.hooker.duty_act(
                &mut collector.ledger,
                dispatcher,
                &inner,
                inputs,
                Some(receiver),
            )?;
            collector.approve_hooker()?;

            tracing::info!(
                "Forward by {}: {} {} total, {} to {} (fee {}, hooks {}), {} to hooker",
                ctx.caller,
                total,
                collector.target,
                payout,
                receiver,
                fee,
                credited,
                rest
            );
            Ok(payout)
        })
    }

    /// Keeper-facing hook run outside FORWARD, paid from this collector
    /// through the hooker's allowance
    pub fn act<D: CallDispatcher>(
        &mut self,
        dispatcher: &mut D,
        ctx: &CallContext,
        inputs: &[HookInput],
        receiver: Option<&AccountId>,
    ) -> Result<Amount> {
        Ok(self
            .hooker
            .act(&mut self.ledger, dispatcher, ctx, inputs, receiver)?)
    }

    pub fn one_time_hooks<D: CallDispatcher>(
        &mut self,
        dispatcher: &mut D,
        ctx: &CallContext,
        hooks: &[Hook],
        inputs: &[HookInput],
    ) -> Result<()> {
        Ok(self
            .hooker
            .one_time_hooks(&mut self.ledger, dispatcher, ctx, hooks, inputs)?)
    }

    // ---- admin ----

    pub fn set_max_fee(&mut self, caller: &AccountId, flags: impl Into<EpochFlags>, max_fee: u128) -> Result<()> {
        self.authority.ensure_owner(caller)?;
        self.fees.set_max_fee(flags, max_fee)?;
        Ok(())
    }

    /// Sets the kill flags of each coin, replacing what it had.
    /// [`CoinId::all`] applies to every coin.
    pub fn set_killed(&mut self, caller: &AccountId, killed: Vec<(CoinId, EpochFlags)>) -> Result<()> {
        self.authority.ensure_admin(caller)?;
        for (coin, flags) in killed {
            tracing::info!("Kill flags of {} set to {:#06b}", coin, flags.bits());
            if flags.is_empty() {
                self.killed.remove(&coin);
            } else {
                self.killed.insert(coin, flags);
            }
        }
        Ok(())
    }

    pub fn set_owner(&mut self, caller: &AccountId, owner: AccountId) -> Result<()> {
        self.authority.set_owner(caller, owner)?;
        tracing::info!("Owner set to {}", self.authority.owner());
        self.sync_authority();
        Ok(())
    }

    pub fn set_emergency_owner(&mut self, caller: &AccountId, emergency_owner: AccountId) -> Result<()> {
        self.authority.set_emergency_owner(caller, emergency_owner)?;
        tracing::info!("Emergency owner set to {}", self.authority.emergency_owner());
        self.sync_authority();
        Ok(())
    }

    /// Replaces the hook list and re-approves the hooker for its new buffer
    pub fn set_hooks(&mut self, caller: &AccountId, hooks: Vec<Hook>) -> Result<()> {
        self.atomic(|collector| {
            collector.hooker.set_hooks(caller, hooks)?;
            collector.approve_hooker()
        })
    }

    /// Installs another hooker. The old one loses its allowance.
    pub fn set_hooker(&mut self, caller: &AccountId, hooker: Hooker) -> Result<()> {
        self.authority.ensure_owner(caller)?;
        if hooker.payer() != &self.account || hooker.coin() != &self.target {
            return Err(FeeflowError::BadParameter("hooker pays from elsewhere".to_string()).into());
        }
        self.ledger
            .approve(&self.account, self.hooker.account(), &self.target, Amount::ZERO)?;
        tracing::info!("Hooker {} replaced by {}", self.hooker.account(), hooker.account());
        self.hooker = hooker;
        self.sync_authority();
        self.approve_hooker()
    }

    /// Installs another burner
    pub fn set_burner(&mut self, caller: &AccountId, burner: DutchAuctionBurner) -> Result<()> {
        self.authority.ensure_owner(caller)?;
        if burner.fee_collector() != &self.account || burner.target() != &self.target {
            return Err(FeeflowError::BadParameter("burner serves elsewhere".to_string()).into());
        }
        tracing::info!("Burner {} replaced by {}", self.burner.account(), burner.account());
        self.burner = burner;
        self.sync_authority();
        Ok(())
    }

    /// Sends coins held by this collector to `receiver`. An amount of
    /// [`Amount::MAX`] means the whole balance.
    pub fn recover(&mut self, caller: &AccountId, coins: Vec<(CoinId, Amount)>, receiver: &AccountId) -> Result<()> {
        self.authority.ensure_admin(caller)?;
        self.atomic(|collector| {
            for (coin, amount) in &coins {
                let amount = if *amount == Amount::MAX {
                    collector.ledger.balance_of(&collector.account, coin)
                } else {
                    *amount
                };
                collector
                    .ledger
                    .transfer(&collector.account, receiver, coin, amount)?;
                tracing::info!("Recovered {} {} to {}", amount, coin, receiver);
            }
            Ok(())
        })
    }

    // ---- views ----

    pub fn epoch(&self, ts: u64) -> Epoch {
        self.clock.epoch(ts)
    }

    pub fn epoch_time_frame(&self, flags: impl Into<EpochFlags>, ts: u64) -> Result<(u64, u64)> {
        Ok(self.clock.epoch_time_frame(flags, ts)?)
    }

    /// Keeper fee fraction of a single epoch at `ts`
    pub fn fee(&self, flags: impl Into<EpochFlags>, ts: u64) -> Result<u128> {
        let epoch = flags.into().single()?;
        Ok(self.fees.fee(&self.clock, epoch, ts))
    }

    pub fn max_fee(&self, flags: impl Into<EpochFlags>) -> Result<u128> {
        let epoch = flags.into().single()?;
        Ok(self.fees.max_fee(epoch))
    }

    /// Killed either on its own or through [`CoinId::all`]
    pub fn is_killed(&self, coin: &CoinId, epoch: Epoch) -> bool {
        let flags = |c: &CoinId| self.killed.get(c).copied().unwrap_or_default();
        flags(coin).contains(epoch) || flags(&CoinId::all()).contains(epoch)
    }

    pub fn killed(&self) -> &BTreeMap<CoinId, EpochFlags> {
        &self.killed
    }

    pub fn status(&self, ts: u64) -> CollectorStatus {
        let epoch = self.clock.epoch(ts);
        let (epoch_start, epoch_end) = self.clock.frame(epoch, ts);
        CollectorStatus {
            ts,
            epoch,
            week: self.clock.week_number(ts),
            epoch_start,
            epoch_end,
            target: self.target.clone(),
            target_balance: self.ledger.balance_of(&self.account, &self.target),
            max_fees: *self.fees.config(),
            current_fee: self.fees.fee(&self.clock, epoch, ts),
            killed: self.killed.clone(),
            hooks: self.hooker.hooks().len(),
            hooks_version: self.hooker.registry().version(),
            duty_counter: self.hooker.duty_counter(),
            hooker_allowance: self
                .ledger
                .allowance(&self.account, self.hooker.account(), &self.target),
        }
    }

    // ---- internals ----

    fn ensure_alive(&self, coin: &CoinId, epoch: Epoch) -> Result<()> {
        if self.is_killed(coin, epoch) {
            tracing::warn!("{} is killed for {}", coin, epoch);
            return Err(FeeflowError::Killed {
                coin: coin.to_string(),
                epoch,
            }
            .into());
        }
        Ok(())
    }

    fn wrap_native(&mut self) -> Result<()> {
        let native = CoinId::native();
        let balance = self.ledger.balance_of(&self.account, &native);
        if !balance.is_zero() {
            self.ledger.withdraw(&self.account, &native, balance)?;
            self.ledger
                .deposit(&self.account, &self.wrapped_native, balance)?;
            tracing::debug!("Wrapped {} native into {}", balance, self.wrapped_native);
        }
        Ok(())
    }

    fn approve_hooker(&mut self) -> Result<()> {
        let buffer = self.hooker.buffer_amount()?;
        self.ledger
            .approve(&self.account, self.hooker.account(), &self.target, buffer)?;
        Ok(())
    }

    fn sync_authority(&mut self) {
        self.hooker.set_authority(self.authority.clone());
        self.burner.set_authority(self.authority.clone());
    }

    /// Runs `f`, restoring the ledger, the hooker and the burner if it fails
    fn atomic<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let snapshot = self.ledger.snapshot();
        let saved = (self.hooker.clone(), self.burner.clone());
        match f(&mut *self) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!("Fee collector call reverted: {}", err);
                self.ledger.restore(&snapshot)?;
                self.hooker = saved.0;
                self.burner = saved.1;
                Err(err)
            }
        }
    }
}

fn ensure_sorted(coins: &[CoinId]) -> Result<()> {
    if coins.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(FeeflowError::CoinsNotSorted.into());
    }
    Ok(())
}
