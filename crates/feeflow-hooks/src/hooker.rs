use feeflow_ledger::Ledger;
use feeflow_types::{
    AccountId, Amount, Authority, CallContext, CoinId, EpochSchedule, FeeflowError, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::registry::{Hook, HookInput, HookRegistry};

/// One outgoing hook invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookCall {
    pub from: AccountId,
    pub target: AccountId,
    pub value: Amount,
    #[serde(with = "crate::calldata")]
    pub calldata: Vec<u8>,
}

impl fmt::Display for HookCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} value={} data=0x{}",
            self.from,
            self.target,
            self.value,
            hex::encode(&self.calldata)
        )
    }
}

/// Performs hook calls. The payload is opaque; only success or failure
/// matters. The ledger is handed over so a target can move the coins it
/// was approved for.
pub trait CallDispatcher {
    fn dispatch(&mut self, ledger: &mut dyn Ledger, call: &HookCall) -> Result<()>;
}

/// Accepts every call and keeps it, for dry runs
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    pub calls: Vec<HookCall>,
}

impl CallDispatcher for RecordingDispatcher {
    fn dispatch(&mut self, _ledger: &mut dyn Ledger, call: &HookCall) -> Result<()> {
        self.calls.push(call.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookerConfig {
    pub hooks: Vec<Hook>,
}

/// Executes hook batches and pays keepers for them.
///
/// Compensation is drawn from the payer's balance through the allowance
/// the payer granted this hooker. When the payer itself runs a batch the
/// amount is only reported back.
#[derive(Debug, Clone)]
pub struct Hooker {
    account: AccountId,
    payer: AccountId,
    coin: CoinId,
    authority: Authority,
    clock: EpochSchedule,
    registry: HookRegistry,
    duty_counter: u64,
}

impl Hooker {
    pub fn new(
        account: AccountId,
        payer: AccountId,
        coin: CoinId,
        authority: Authority,
        clock: EpochSchedule,
        config: HookerConfig,
    ) -> Result<Self> {
        Ok(Hooker {
            account,
            payer,
            coin,
            authority,
            clock,
            registry: HookRegistry::new(config.hooks)?,
            duty_counter: 0,
        })
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn payer(&self) -> &AccountId {
        &self.payer
    }

    /// The coin compensation is paid in
    pub fn coin(&self) -> &CoinId {
        &self.coin
    }

    pub fn hooks(&self) -> &[Hook] {
        self.registry.hooks()
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Week number of the last credited duty run
    pub fn duty_counter(&self) -> u64 {
        self.duty_counter
    }

    pub fn buffer_amount(&self) -> Result<Amount> {
        self.registry.buffer_amount().map(Amount::from_raw)
    }

    pub fn set_authority(&mut self, authority: Authority) {
        self.authority = authority;
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn calc_compensation(&self, inputs: &[HookInput], require_mandatory: bool, ts: u64) -> Result<Amount> {
        self.registry
            .calc_compensation(&self.clock, inputs, require_mandatory, ts)
            .map(Amount::from_raw)
    }

    /// Runs `inputs` and pays their compensation to `receiver` (the caller
    /// when `None`)
    pub fn act<L: Ledger, D: CallDispatcher>(
        &mut self,
        ledger: &mut L,
        dispatcher: &mut D,
        ctx: &CallContext,
        inputs: &[HookInput],
        receiver: Option<&AccountId>,
    ) -> Result<Amount> {
        self.atomic(ledger, |hooker, ledger| {
            hooker.execute(ledger, dispatcher, ctx, inputs, receiver, false)
        })
    }

    /// [`Hooker::act`] with every mandatory hook required. A run by the
    /// payer advances the duty counter, at most once per week.
    pub fn duty_act<L: Ledger, D: CallDispatcher>(
        &mut self,
        ledger: &mut L,
        dispatcher: &mut D,
        ctx: &CallContext,
        inputs: &[HookInput],
        receiver: Option<&AccountId>,
    ) -> Result<Amount> {
        self.atomic(ledger, |hooker, ledger| {
            hooker.execute(ledger, dispatcher, ctx, inputs, receiver, true)
        })
    }

    /// Owner-only ad hoc run of `hooks`, with no compensation and no change
    /// to the registry
    pub fn one_time_hooks<L: Ledger, D: CallDispatcher>(
        &mut self,
        ledger: &mut L,
        dispatcher: &mut D,
        ctx: &CallContext,
        hooks: &[Hook],
        inputs: &[HookInput],
    ) -> Result<()> {
        self.authority.ensure_owner(&ctx.caller)?;
        let adhoc = HookRegistry::new(hooks.to_vec())?;
        adhoc.validate_inputs(inputs, false, FeeflowError::NotAllMandatoryHooks)?;

        self.atomic(ledger, |hooker, ledger| {
            hooker.run_calls(ledger, dispatcher, ctx, adhoc.hooks(), inputs)
        })?;
        tracing::info!("Ran {} one-time hook inputs", inputs.len());
        Ok(())
    }

    /// Owner-only wholesale replacement of the hook list
    pub fn set_hooks(&mut self, caller: &AccountId, hooks: Vec<Hook>) -> Result<()> {
        self.authority.ensure_owner(caller)?;
        self.registry.replace(hooks)?;
        tracing::info!(
            "Hook list replaced: {} hooks, version {}",
            self.registry.len(),
            self.registry.version()
        );
        Ok(())
    }

    /// Sends this hooker's balances of `coins` to the payer
    pub fn recover<L: Ledger>(&mut self, ledger: &mut L, caller: &AccountId, coins: &[CoinId]) -> Result<()> {
        self.authority.ensure_admin(caller)?;
        self.atomic(ledger, |hooker, ledger| {
            for coin in coins {
                let balance = ledger.balance_of(&hooker.account, coin);
                ledger.transfer(&hooker.account, &hooker.payer, coin, balance)?;
                tracing::info!("Recovered {} {} to {}", balance, coin, hooker.payer);
            }
            Ok(())
        })
    }

    /// Runs `f`, restoring both the ledger and this hooker if it fails
    fn atomic<L: Ledger, T>(
        &mut self,
        ledger: &mut L,
        f: impl FnOnce(&mut Self, &mut L) -> Result<T>,
    ) -> Result<T> {
        let snapshot = ledger.snapshot();
        let saved = (self.registry.clone(), self.duty_counter);
        match f(&mut *self, &mut *ledger) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!("Hook run reverted: {}", err);
                ledger.restore(&snapshot)?;
                self.registry = saved.0;
                self.duty_counter = saved.1;
                Err(err)
            }
        }
    }

    fn execute<L: Ledger, D: CallDispatcher>(
        &mut self,
        ledger: &mut L,
        dispatcher: &mut D,
        ctx: &CallContext,
        inputs: &[HookInput],
        receiver: Option<&AccountId>,
        duty: bool,
    ) -> Result<Amount> {
        let missing = if duty {
            FeeflowError::NotAllDuties
        } else {
            FeeflowError::NotAllMandatoryHooks
        };
        self.registry.validate_inputs(inputs, duty, missing)?;

        // cooldowns are consumed before any call goes out
        let compensation = Amount::from_raw(self.registry.consume(&self.clock, inputs, ctx.ts)?);

        if duty && ctx.caller == self.payer {
            let week = self.clock.week_number(ctx.ts);
            if self.duty_counter < week {
                self.duty_counter = week;
                tracing::info!("Duties credited for week {}", week);
            }
        }

        self.run_calls(ledger, dispatcher, ctx, self.registry.hooks(), inputs)?;

        if !compensation.is_zero() && ctx.caller != self.payer {
            let receiver = receiver.unwrap_or(&ctx.caller);
            ledger.transfer_from(&self.account, &self.payer, receiver, &self.coin, compensation)?;
            tracing::info!("Paid {} {} compensation to {}", compensation, self.coin, receiver);
        }
        Ok(compensation)
    }

    /// Takes the attached value, approves every called target for the whole
    /// coin balance, then makes the calls in order
    fn run_calls<L: Ledger, D: CallDispatcher>(
        &self,
        ledger: &mut L,
        dispatcher: &mut D,
        ctx: &CallContext,
        hooks: &[Hook],
        inputs: &[HookInput],
    ) -> Result<()> {
        let required = inputs
            .iter()
            .try_fold(Amount::ZERO, |acc, input| acc.checked_add(input.value))?;
        if ctx.value < required {
            return Err(FeeflowError::InsufficientValue {
                attached: ctx.value.raw(),
                required: required.raw(),
            });
        }
        let native = CoinId::native();
        ledger.transfer(&ctx.caller, &self.account, &native, ctx.value)?;

        let balance = ledger.balance_of(&self.account, &self.coin);
        for input in inputs {
            let hook = hooks
                .get(input.hook_id)
                .ok_or(FeeflowError::UnknownHook(input.hook_id))?;
            if hook.target.is_zero() {
                continue;
            }
            ledger.approve(&self.account, &hook.target, &self.coin, balance)?;
        }

        for input in inputs {
            let hook = hooks
                .get(input.hook_id)
                .ok_or(FeeflowError::UnknownHook(input.hook_id))?;
            if hook.target.is_zero() {
                continue;
            }
            ledger.transfer(&self.account, &hook.target, &native, input.value)?;

            let mut calldata = hook.call_prefix.clone();
            calldata.extend_from_slice(&input.data);
            let call = HookCall {
                from: self.account.clone(),
                target: hook.target.clone(),
                value: input.value,
                calldata,
            };
            tracing::debug!("Hook {}: {}", input.hook_id, call);
            dispatcher
                .dispatch(&mut *ledger, &call)
                .map_err(|err| FeeflowError::HookCallFailed {
                    target: call.target.to_string(),
                    reason: err.to_string(),
                })?;
        }
        Ok(())
    }
}
