// Keeper fee behaviour across epoch windows

#[cfg(test)]
mod tests {
    use crate::*;
    use feeflow_types::*;
    use proptest::prelude::*;

    fn in_week(offset: u64) -> u64 {
        DEFAULT_ANCHOR + 100 * WEEK + offset
    }

    #[test]
    fn test_fee_rises_across_window() {
        let clock = EpochSchedule::default();
        let mut schedule = FeeSchedule::with_defaults();

        for (epoch, max_fee) in [
            (Epoch::Collect, 2 * 10u128.pow(16)),
            (Epoch::Exchange, 3 * 10u128.pow(16)),
            (Epoch::Forward, 4 * 10u128.pow(16)),
        ] {
            schedule.set_max_fee(epoch, max_fee).unwrap();
            let (start, end) = clock.frame(epoch, in_week(0));

            let mut prev = schedule.fee(&clock, epoch, start);
            assert!(prev <= max_fee / 10);
            for ts in (start + 1..end).step_by(((end - start) / 12) as usize) {
                let fee = schedule.fee(&clock, epoch, ts);
                assert!(prev <= fee);
                prev = fee;
            }
            let last = schedule.fee(&clock, epoch, end - 1);
            assert!(max_fee * 9 / 10 <= last && last <= max_fee);
        }
    }

    #[test]
    fn test_fee_outside_window() {
        let clock = EpochSchedule::default();
        let schedule = FeeSchedule::with_defaults();
        let (start, end) = clock.frame(Epoch::Collect, in_week(0));

        assert_eq!(schedule.fee(&clock, Epoch::Collect, start - 1), 0);
        assert_eq!(
            schedule.fee(&clock, Epoch::Collect, end),
            schedule.max_fee(Epoch::Collect)
        );
    }

    #[test]
    fn test_set_max_fee_validation() {
        let mut schedule = FeeSchedule::with_defaults();

        assert_eq!(
            schedule.set_max_fee(Epoch::Collect | Epoch::Forward, 10u128.pow(16)),
            Err(FeeflowError::BadEpoch)
        );
        assert_eq!(
            schedule.set_max_fee(Epoch::Collect, WAD + 1),
            Err(FeeflowError::BadMaxFee)
        );
        schedule.set_max_fee(Epoch::Collect, WAD).unwrap();
        assert_eq!(schedule.max_fee(Epoch::Collect), WAD);
    }

    #[test]
    fn test_apply_half_window() {
        let clock = EpochSchedule::default();
        let schedule = FeeSchedule::with_defaults();
        let (start, end) = clock.frame(Epoch::Collect, in_week(0));
        let amount = Amount::from_units(10, 18).unwrap();

        let share = schedule
            .apply(&clock, amount, Epoch::Collect, (start + end) / 2)
            .unwrap();
        // 1% of 10 at the middle of a 2% window
        assert_eq!(share, Amount::from_units(1, 17).unwrap());
    }

    #[test]
    fn test_config_from_json() {
        let config: FeeConfig = serde_json::from_str(
            r#"{"sleep":0,"collect":50000000000000000,"exchange":0,"forward":10000000000000000}"#,
        )
        .unwrap();
        let schedule = FeeSchedule::new(config).unwrap();
        assert_eq!(schedule.max_fee(Epoch::Collect), 5 * 10u128.pow(16));

        let bad = FeeConfig {
            forward: WAD + 1,
            ..FeeConfig::default()
        };
        assert!(FeeSchedule::new(bad).is_err());
    }

    proptest! {
        #[test]
        fn prop_fee_monotonic_and_capped(a in 0u64..WEEK, b in 0u64..WEEK, max_fee in 0u128..=WAD) {
            let clock = EpochSchedule::default();
            let mut schedule = FeeSchedule::with_defaults();
            schedule.set_max_fee(Epoch::Forward, max_fee).unwrap();

            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let fee_lo = schedule.fee(&clock, Epoch::Forward, in_week(lo));
            let fee_hi = schedule.fee(&clock, Epoch::Forward, in_week(hi));
            prop_assert!(fee_lo <= fee_hi);
            prop_assert!(fee_hi <= max_fee);
        }
    }
}
