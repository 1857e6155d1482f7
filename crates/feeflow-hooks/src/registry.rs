use feeflow_types::{AccountId, Amount, EpochSchedule, FeeflowError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::compensation::{CompensationStrategy, Cooldown};

/// Configured action, addressed by its position in the list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    /// Call target; the zero address means "no call"
    pub target: AccountId,
    /// Leading calldata, the method selector plus any fixed arguments
    #[serde(with = "crate::calldata", default)]
    pub call_prefix: Vec<u8>,
    pub compensation: CompensationStrategy,
    pub mandatory: bool,
}

impl Hook {
    pub fn new(target: AccountId, call_prefix: Vec<u8>, compensation: CompensationStrategy, mandatory: bool) -> Self {
        Hook {
            target,
            call_prefix,
            compensation,
            mandatory,
        }
    }
}

/// Caller-supplied argument for one hook execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookInput {
    pub hook_id: usize,
    #[serde(default)]
    pub value: Amount,
    #[serde(with = "crate::calldata", default)]
    pub data: Vec<u8>,
}

impl HookInput {
    pub fn new(hook_id: usize) -> Self {
        HookInput {
            hook_id,
            value: Amount::ZERO,
            data: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }
}

/// The active hook list plus the cooldown state of each entry.
///
/// Cooldowns are keyed by `(version, hook_id)`; replacing the list bumps the
/// version and drops every entry of the old one.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Hook>,
    version: u64,
    cooldowns: BTreeMap<(u64, usize), Cooldown>,
}

impl HookRegistry {
    pub fn new(hooks: Vec<Hook>) -> Result<Self> {
        let mut registry = HookRegistry::default();
        registry.replace(hooks)?;
        Ok(registry)
    }

    pub fn replace(&mut self, hooks: Vec<Hook>) -> Result<()> {
        for hook in &hooks {
            hook.compensation.validate()?;
        }
        buffer_of(&hooks)?;
        self.hooks = hooks;
        self.version += 1;
        self.cooldowns.clear();
        Ok(())
    }

    pub fn hooks(&self) -> &[Hook] {
        &self.hooks
    }

    pub fn hook(&self, hook_id: usize) -> Result<&Hook> {
        self.hooks
            .get(hook_id)
            .ok_or(FeeflowError::UnknownHook(hook_id))
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Live cooldown of a hook, falling back to its configured initial state
    pub fn cooldown(&self, hook_id: usize) -> Result<Cooldown> {
        let hook = self.hook(hook_id)?;
        Ok(self
            .cooldowns
            .get(&(self.version, hook_id))
            .copied()
            .unwrap_or(hook.compensation.cooldown))
    }

    /// Worst-case total over the whole list: sum of `amount * limit`
    pub fn buffer_amount(&self) -> Result<u128> {
        buffer_of(&self.hooks)
    }

    /// Batches are ordered by `hook_id`; a repeated id counts as another
    /// execution of the same hook. `missing` is reported when a mandatory
    /// hook is absent and `require_mandatory` is set.
    pub fn validate_inputs(&self, inputs: &[HookInput], require_mandatory: bool, missing: FeeflowError) -> Result<()> {
        if inputs.windows(2).any(|pair| pair[0].hook_id > pair[1].hook_id) {
            return Err(FeeflowError::HooksNotSorted);
        }
        if let Some(input) = inputs.iter().find(|input| input.hook_id >= self.hooks.len()) {
            return Err(FeeflowError::UnknownHook(input.hook_id));
        }
        if require_mandatory {
            let all_present = self
                .hooks
                .iter()
                .enumerate()
                .filter(|(_, hook)| hook.mandatory)
                .all(|(id, _)| inputs.binary_search_by_key(&id, |input| input.hook_id).is_ok());
            if !all_present {
                return Err(missing);
            }
        }
        Ok(())
    }

    /// Compensation for `inputs` at `ts` without consuming cooldowns
    pub fn calc_compensation(
        &self,
        clock: &EpochSchedule,
        inputs: &[HookInput],
        require_mandatory: bool,
        ts: u64,
    ) -> Result<u128> {
        self.validate_inputs(inputs, require_mandatory, FeeflowError::NotAllMandatoryHooks)?;
        let mut scratch = self.cooldowns.clone();
        self.settle(clock, inputs, ts, &mut scratch)
    }

    /// Like [`HookRegistry::calc_compensation`] but keeps the cooldown
    /// updates. Inputs must already be validated.
    pub fn consume(&mut self, clock: &EpochSchedule, inputs: &[HookInput], ts: u64) -> Result<u128> {
        let mut state = self.cooldowns.clone();
        let total = self.settle(clock, inputs, ts, &mut state)?;
        self.cooldowns = state;
        Ok(total)
    }

    fn settle(
        &self,
        clock: &EpochSchedule,
        inputs: &[HookInput],
        ts: u64,
        state: &mut BTreeMap<(u64, usize), Cooldown>,
    ) -> Result<u128> {
        let mut total = 0u128;
        for input in inputs {
            let hook = self.hook(input.hook_id)?;
            let cooldown = state
                .entry((self.version, input.hook_id))
                .or_insert(hook.compensation.cooldown);
            let paid = hook.compensation.payout(cooldown, clock, ts)?;
            total = total
                .checked_add(paid)
                .ok_or_else(|| FeeflowError::Overflow("compensation".to_string()))?;
        }
        Ok(total)
    }
}


/// Most a list can pay out within one cooldown period
fn buffer_of(hooks: &[Hook]) -> Result<u128> {
    hooks.iter().try_fold(0u128, |acc, hook| {
        let max = hook.compensation.max_per_period()?;
        acc.checked_add(max)
            .ok_or_else(|| FeeflowError::Overflow("buffer amount".to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compensation::{Schedule, Window};
    use feeflow_types::{DEFAULT_ANCHOR, WEEK};

    fn registry() -> HookRegistry {
        HookRegistry::new(vec![
            Hook::new(AccountId::zero(), vec![], CompensationStrategy::duty(), true),
            Hook::new(AccountId::zero(), vec![], CompensationStrategy::always(100, 1), false),
            Hook::new(AccountId::zero(), vec![], CompensationStrategy::always(1, 3), false),
        ])
        .unwrap()
    }

    #[test]
    fn test_replace_resets_cooldowns() {
        let clock = EpochSchedule::default();
        let mut registry = registry();
        let inputs = [HookInput::new(1)];
        let ts = DEFAULT_ANCHOR + WEEK;

        assert_eq!(registry.consume(&clock, &inputs, ts).unwrap(), 100);
        assert_eq!(registry.consume(&clock, &inputs, ts).unwrap(), 0);
        assert_eq!(registry.cooldown(1).unwrap().used, 1);

        let version = registry.version();
        let hooks = registry.hooks().to_vec();
        registry.replace(hooks).unwrap();
        assert_eq!(registry.version(), version + 1);
        assert_eq!(registry.cooldown(1).unwrap().used, 0);
        assert_eq!(registry.consume(&clock, &inputs, ts).unwrap(), 100);
    }

    #[test]
    fn test_rejects_bad_windows() {
        let mut registry = registry();
        let bad = CompensationStrategy {
            amount: 0,
            cooldown: Cooldown::default(),
            schedule: Schedule::Window(Window { start: WEEK, end: 0 }),
        };
        let result = registry.replace(vec![Hook::new(AccountId::zero(), vec![], bad, false)]);
        assert_eq!(result, Err(FeeflowError::BadStartTime));
        // untouched on failure
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_validate_inputs() {
        let registry = registry();
        let missing = FeeflowError::NotAllMandatoryHooks;

        assert_eq!(
            registry.validate_inputs(&[HookInput::new(2), HookInput::new(1)], false, missing.clone()),
            Err(FeeflowError::HooksNotSorted)
        );
        assert_eq!(
            registry.validate_inputs(&[HookInput::new(7)], false, missing.clone()),
            Err(FeeflowError::UnknownHook(7))
        );
        assert_eq!(
            registry.validate_inputs(&[HookInput::new(1)], true, FeeflowError::NotAllDuties),
            Err(FeeflowError::NotAllDuties)
        );
        assert!(registry
            .validate_inputs(&[HookInput::new(0), HookInput::new(2), HookInput::new(2)], true, missing)
            .is_ok());
    }

    #[test]
    fn test_view_does_not_consume() {
        let clock = EpochSchedule::default();
        let registry = registry();
        let inputs = vec![HookInput::new(2); 5];

        for _ in 0..3 {
            assert_eq!(registry.calc_compensation(&clock, &inputs, false, DEFAULT_ANCHOR).unwrap(), 3);
        }
        assert_eq!(registry.buffer_amount().unwrap(), 103);
    }
}
