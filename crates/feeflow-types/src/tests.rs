// Property tests for the clock and fixed-point helpers

#[cfg(test)]
mod tests {
    use crate::*;
    use proptest::prelude::*;

    #[test]
    fn test_roundtrip_schedule_json() {
        let schedule = EpochSchedule::default();
        let json = serde_json::to_string(&schedule).unwrap();
        let decoded: EpochSchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(schedule, decoded);
    }

    #[test]
    fn test_flags_serialize_as_bits() {
        let flags = Epoch::Collect | Epoch::Exchange;
        assert_eq!(serde_json::to_string(&flags).unwrap(), "6");
        assert!(flags.contains(Epoch::Collect));
        assert!(!flags.contains(Epoch::Forward));
        assert_eq!(flags.single(), Err(FeeflowError::BadEpoch));
        assert_eq!(EpochFlags::from(Epoch::Forward).single(), Ok(Epoch::Forward));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(FeeflowError::BadEpoch.to_string(), "Bad Epoch");
        assert_eq!(FeeflowError::HooksNotSorted.to_string(), "Hooks not sorted");
        assert_eq!(
            FeeflowError::NotAllMandatoryHooks.to_string(),
            "Not all mandatory hooks"
        );
        assert_eq!(FeeflowError::OnlyOwner.to_string(), "Only owner");
    }

    proptest! {
        #[test]
        fn prop_exactly_one_epoch_window_contains_ts(ts in 0u64..4_000_000_000) {
            let schedule = EpochSchedule::default();
            let containing: Vec<Epoch> = Epoch::ALL
                .into_iter()
                .filter(|epoch| {
                    let (start, end) = schedule.frame(*epoch, ts);
                    start <= ts && ts < end
                })
                .collect();

            prop_assert_eq!(containing.len(), 1);
            prop_assert_eq!(containing[0], schedule.epoch(ts));
        }

        #[test]
        fn prop_week_is_partitioned(ts in DEFAULT_ANCHOR..4_000_000_000) {
            let schedule = EpochSchedule::default();
            let (first, _) = schedule.frame(Epoch::Sleep, ts);
            let mut cursor = first;
            for epoch in Epoch::ALL {
                let (start, end) = schedule.frame(epoch, ts);
                prop_assert_eq!(start, cursor);
                cursor = end;
            }
            prop_assert_eq!(cursor - first, WEEK);
        }

        #[test]
        fn prop_time_amplifier_matches_closed_form(
            lasted in 0u64..365 * DAY,
            remaining in 1u64..365 * DAY,
            base_milli in 1_001u64..1_000_000_000,
        ) {
            let whole = lasted + remaining;
            let base = base_milli as f64 / 1000.0;
            let base_wad = base_milli as u128 * (WAD / 1000);
            let log_base = (base.ln() * 1e18) as u128;

            let amp = time_amplifier(remaining, whole, base_wad, log_base).unwrap() as f64 / 1e18;
            let expected = (base.powf(remaining as f64 / whole as f64) - 1.0) / (base - 1.0);
            prop_assert!((amp - expected).abs() < 1e-6, "amp {} expected {}", amp, expected);
        }
    }
}
