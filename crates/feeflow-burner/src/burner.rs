use feeflow_fees::{FeeCurve, FeeSchedule};
use feeflow_ledger::Ledger;
use feeflow_types::{
    mul_div, AccountId, Amount, Authority, CallContext, CoinId, Epoch, EpochSchedule, FeeflowError, Result,
    WAD,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::params::PriceParameters;
use crate::record::Record;

/// Sell `amount` of `coin` from the fee collector's holdings to `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeTransfer {
    pub coin: CoinId,
    pub to: AccountId,
    pub amount: Amount,
}

impl ExchangeTransfer {
    pub fn new(coin: CoinId, to: AccountId, amount: Amount) -> Self {
        ExchangeTransfer { coin, to, amount }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BurnerConfig {
    #[serde(default)]
    pub params: PriceParameters,
    /// Seed history, e.g. migrated from a previous deployment
    #[serde(default)]
    pub records: BTreeMap<CoinId, Record>,
}

/// Sells collected coins for the target coin at a price decaying over the
/// EXCHANGE epoch.
///
/// Coins never leave the fee collector until someone buys them; the burner
/// only keeps the per-coin [`Record`] history and the balances it last paid
/// the COLLECT keeper fee on.
#[derive(Debug, Clone)]
pub struct DutchAuctionBurner {
    account: AccountId,
    fee_collector: AccountId,
    target: CoinId,
    authority: Authority,
    clock: EpochSchedule,
    params: PriceParameters,
    records: BTreeMap<CoinId, Record>,
    balances: BTreeMap<CoinId, Amount>,
}

impl DutchAuctionBurner {
    pub fn new(
        account: AccountId,
        fee_collector: AccountId,
        target: CoinId,
        authority: Authority,
        clock: EpochSchedule,
        config: BurnerConfig,
    ) -> Result<Self> {
        config.params.validate()?;
        Ok(DutchAuctionBurner {
            account,
            fee_collector,
            target,
            authority,
            clock,
            params: config.params,
            records: config.records,
            balances: BTreeMap::new(),
        })
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn fee_collector(&self) -> &AccountId {
        &self.fee_collector
    }

    pub fn target(&self) -> &CoinId {
        &self.target
    }

    pub fn params(&self) -> &PriceParameters {
        &self.params
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn set_authority(&mut self, authority: Authority) {
        self.authority = authority;
    }

    /// Stored record, not rolled to the current week
    pub fn record(&self, coin: &CoinId) -> Record {
        self.records.get(coin).copied().unwrap_or_default()
    }

    pub fn records(&self) -> &BTreeMap<CoinId, Record> {
        &self.records
    }

    /// Fee collector balance of `coin` as of the last burn
    pub fn burned_balance(&self, coin: &CoinId) -> Amount {
        self.balances.get(coin).copied().unwrap_or(Amount::ZERO)
    }

    /// Target paid per unit of `coin` at `ts`, scaled by 10^18.
    ///
    /// Starts at `price_ceiling` times the reference rate when EXCHANGE opens
    /// and decays towards `price_floor` times it. Outside EXCHANGE there is
    /// no price.
    pub fn price(&self, coin: &CoinId, ts: u64) -> Result<u128> {
        let (start, end) = self.clock.frame(Epoch::Exchange, ts);
        if ts < start || ts >= end {
            return Err(FeeflowError::BadTime);
        }

        let week = self.clock.week_number(ts);
        let reference = self
            .record(coin)
            .rolled(week, self.params.smoothing_factor)?
            .rate()?
            .unwrap_or(self.params.default_rate);

        let ceiling = mul_div(reference, self.params.price_ceiling, WAD)?;
        let floor = mul_div(reference, self.params.price_floor, WAD)?;
        let amplifier = self.params.time_amplifier(end - ts, end - start)?;
        let spread = mul_div(ceiling - floor, amplifier, WAD)?;
        floor
            .checked_add(spread)
            .ok_or_else(|| FeeflowError::Overflow("price".to_string()))
    }

    /// Pays the COLLECT keeper fee on what each coin's fee collector balance
    /// grew by since the last burn. The coins stay with the fee collector.
    ///
    /// `only_revise` skips the payout and just re-baselines; anyone may ask
    /// for that. Returns the payout per coin.
    pub fn burn<L: Ledger, C: FeeCurve>(
        &mut self,
        ledger: &mut L,
        fees: &FeeSchedule<C>,
        ctx: &CallContext,
        coins: &[CoinId],
        receiver: &AccountId,
        only_revise: bool,
    ) -> Result<Vec<Amount>> {
        if !only_revise && ctx.caller != self.fee_collector {
            return Err(FeeflowError::OnlyFeeCollector);
        }
        let fee = if only_revise {
            0
        } else {
            fees.fee(&self.clock, Epoch::Collect, ctx.ts)
        };

        self.atomic(ledger, |burner, ledger| {
            let mut payouts = Vec::with_capacity(coins.len());
            for coin in coins {
                let balance = ledger.balance_of(&burner.fee_collector, coin);
                let growth = balance.saturating_sub(burner.burned_balance(coin));
                let paid = growth.mul_wad(fee)?;
                ledger.transfer(&burner.fee_collector, receiver, coin, paid)?;
                burner.balances.insert(coin.clone(), balance.checked_sub(paid)?);
                tracing::debug!("Burn {}: grew {}, paid {}", coin, growth, paid);
                payouts.push(paid);
            }
            Ok(payouts)
        })
    }

    /// Sells every transfer at the current price and returns the target
    /// charged. The target is taken from what was pushed to the burner
    /// first, the rest from the caller's allowance; everything ends up with
    /// the fee collector.
    pub fn exchange<L: Ledger>(
        &mut self,
        ledger: &mut L,
        ctx: &CallContext,
        transfers: &[ExchangeTransfer],
    ) -> Result<Amount> {
        self.atomic(ledger, |burner, ledger| burner.settle(ledger, ctx, transfers))
    }

    /// Sends the burner's whole target balance to the fee collector
    pub fn push_target<L: Ledger>(&self, ledger: &mut L) -> Result<Amount> {
        let balance = ledger.balance_of(&self.account, &self.target);
        ledger.transfer(&self.account, &self.fee_collector, &self.target, balance)?;
        Ok(balance)
    }

    /// Seeds or overwrites history; owner or emergency owner
    pub fn set_records(&mut self, caller: &AccountId, records: Vec<(CoinId, Record)>) -> Result<()> {
        self.authority.ensure_admin(caller)?;
        for (coin, record) in records {
            tracing::info!("Record for {} set at week {}", coin, record.week);
            self.records.insert(coin, record);
        }
        Ok(())
    }

    pub fn set_records_smoothing(&mut self, caller: &AccountId, smoothing_factor: u128) -> Result<()> {
        self.authority.ensure_owner(caller)?;
        self.update_params(PriceParameters {
            smoothing_factor,
            ..self.params
        })
    }

    pub fn set_price_parameters(&mut self, caller: &AccountId, params: PriceParameters) -> Result<()> {
        self.authority.ensure_owner(caller)?;
        self.update_params(params)
    }

    /// `log_base` must be the natural logarithm of `base`, both scaled by 10^18
    pub fn set_time_amplifier_base(&mut self, caller: &AccountId, base: u128, log_base: u128) -> Result<()> {
        self.authority.ensure_owner(caller)?;
        self.update_params(PriceParameters {
            amplifier_base: base,
            log_amplifier_base: log_base,
            ..self.params
        })
    }

    /// Sends the burner's balances of `coins` to the fee collector
    pub fn recover<L: Ledger>(&mut self, ledger: &mut L, caller: &AccountId, coins: &[CoinId]) -> Result<()> {
        self.authority.ensure_admin(caller)?;
        self.atomic(ledger, |burner, ledger| {
            for coin in coins {
                let balance = ledger.balance_of(&burner.account, coin);
                ledger.transfer(&burner.account, &burner.fee_collector, coin, balance)?;
                tracing::info!("Recovered {} {} to {}", balance, coin, burner.fee_collector);
            }
            Ok(())
        })
    }

    fn update_params(&mut self, params: PriceParameters) -> Result<()> {
        params.validate()?;
        self.params = params;
        tracing::info!("Price parameters updated: {:?}", self.params);
        Ok(())
    }

    fn settle<L: Ledger>(&mut self, ledger: &mut L, ctx: &CallContext, transfers: &[ExchangeTransfer]) -> Result<Amount> {
        let week = self.clock.week_number(ctx.ts);
        let mut charged = Amount::ZERO;

        for transfer in transfers {
            let price = self.price(&transfer.coin, ctx.ts)?;
            let owed = transfer.amount.mul_wad(price)?;
            if owed.is_zero() || owed < self.params.min_exchange_amount {
                return Err(FeeflowError::TooSmall(transfer.coin.to_string()));
            }
            ledger.transfer(&self.fee_collector, &transfer.to, &transfer.coin, transfer.amount)?;

            let mut record = self
                .record(&transfer.coin)
                .rolled(week, self.params.smoothing_factor)?;
            record.add(transfer.amount, owed)?;
            self.records.insert(transfer.coin.clone(), record);

            // sold coins must not count as growth at the next burn
            if let Some(seen) = self.balances.get_mut(&transfer.coin) {
                *seen = seen.saturating_sub(transfer.amount);
            }
            charged = charged.checked_add(owed)?;
            tracing::debug!(
                "Sold {} {} to {} at {} for {}",
                transfer.amount,
                transfer.coin,
                transfer.to,
                price,
                owed
            );
        }

        let pushed = ledger.balance_of(&self.account, &self.target);
        if pushed < charged {
            let missing = charged.checked_sub(pushed)?;
            ledger.transfer_from(&self.account, &ctx.caller, &self.account, &self.target, missing)?;
        }
        let swept = self.push_target(ledger)?;
        tracing::info!(
            "Exchange by {}: {} transfers for {} {}, swept {}",
            ctx.caller,
            transfers.len(),
            charged,
            self.target,
            swept
        );
        Ok(charged)
    }

    /// Runs `f`, restoring both the ledger and this burner if it fails
    fn atomic<L: Ledger, T>(
        &mut self,
        ledger: &mut L,
        f: impl FnOnce(&mut Self, &mut L) -> Result<T>,
    ) -> Result<T> {
        let snapshot = ledger.snapshot();
        let saved = (self.records.clone(), self.balances.clone());
        match f(&mut *self, &mut *ledger) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!("Burner call reverted: {}", err);
                ledger.restore(&snapshot)?;
                self.records = saved.0;
                self.balances = saved.1;
                Err(err)
            }
        }
    }
}
