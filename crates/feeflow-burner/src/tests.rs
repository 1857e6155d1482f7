// Dutch auction burner: pricing, exchange bookkeeping, keeper payouts, admin

#[cfg(test)]
mod tests {
    use crate::*;
    use feeflow_fees::FeeSchedule;
    use feeflow_ledger::{Ledger, MemoryLedger};
    use feeflow_types::*;
    use proptest::prelude::*;

    struct Fixture {
        ledger: MemoryLedger,
        burner: DutchAuctionBurner,
        fees: FeeSchedule,
        clock: EpochSchedule,
        fee_collector: AccountId,
        admin: AccountId,
        emergency: AccountId,
        arve: AccountId,
        burle: AccountId,
        target: CoinId,
        coins: Vec<(CoinId, u32)>,
        /// A Thursday far enough from the anchor for every time travel
        week: u64,
    }

    fn setup() -> Fixture {
        let fee_collector = AccountId::new("fee_collector");
        let admin = AccountId::new("admin");
        let emergency = AccountId::new("emergency_admin");
        let target = CoinId::new("crvUSD");
        let clock = EpochSchedule::default();

        let burner = DutchAuctionBurner::new(
            AccountId::new("burner"),
            fee_collector.clone(),
            target.clone(),
            Authority::new(admin.clone(), emergency.clone()),
            clock,
            BurnerConfig::default(),
        )
        .unwrap();

        let mut coins = vec![
            (CoinId::new("CRV"), 18),
            (CoinId::new("BTC"), 8),
            (CoinId::new("CNY"), 2),
            (CoinId::new("WETH"), 18),
        ];
        coins.sort();

        Fixture {
            ledger: MemoryLedger::new(),
            burner,
            fees: FeeSchedule::with_defaults(),
            clock,
            fee_collector,
            admin,
            emergency,
            arve: AccountId::new("arve"),
            burle: AccountId::new("burle"),
            target,
            coins,
            week: DEFAULT_ANCHOR + 100 * WEEK,
        }
    }

    impl Fixture {
        fn amounts(&self) -> Vec<Amount> {
            self.coins
                .iter()
                .map(|(_, decimals)| Amount::from_units(10, *decimals).unwrap())
                .collect()
        }

        fn fund_collector(&mut self) -> Vec<Amount> {
            let amounts = self.amounts();
            for ((coin, _), amount) in self.coins.iter().zip(&amounts) {
                self.ledger.deposit(&self.fee_collector, coin, *amount).unwrap();
            }
            amounts
        }

        fn middle_of(&self, epoch: Epoch) -> u64 {
            let (start, end) = self.clock.frame(epoch, self.week);
            (start + end) / 2
        }

        fn coin_ids(&self) -> Vec<CoinId> {
            self.coins.iter().map(|(coin, _)| coin.clone()).collect()
        }
    }

    #[test]
    fn test_price() {
        let mut f = setup();
        f.fund_collector();
        let (start, end) = f.clock.frame(Epoch::Exchange, f.week);

        for coin in f.coin_ids() {
            let mut price = u128::MAX;
            for ts in (start..end).step_by(((end - start) / 100) as usize) {
                let new_price = f.burner.price(&coin, ts).unwrap();
                assert!(price > new_price, "price of {} does not decrease at {}", coin, ts);
                price = new_price;
            }
            assert_eq!(f.burner.price(&coin, start - 1), Err(FeeflowError::BadTime));
            assert_eq!(f.burner.price(&coin, end), Err(FeeflowError::BadTime));
        }
    }

    #[test]
    fn test_price_bounds_follow_reference() {
        let f = setup();
        let coin = CoinId::new("CRV");
        let (start, end) = f.clock.frame(Epoch::Exchange, f.week);
        let params = f.burner.params();

        let opening = f.burner.price(&coin, start).unwrap();
        let closing = f.burner.price(&coin, end - 1).unwrap();
        assert!(opening <= params.price_ceiling && opening > params.price_ceiling * 99 / 100);
        assert!(closing >= params.price_floor && closing < params.price_floor * 101 / 100);
    }

    #[test]
    fn test_exchange() {
        let mut f = setup();
        let amounts = f.fund_collector();
        let ts = f.middle_of(Epoch::Exchange);
        let current_week = ts / WEEK;
        let burner = f.burner.account().clone();

        let transfers: Vec<ExchangeTransfer> = f
            .coins
            .iter()
            .zip(&amounts)
            .map(|((coin, _), amount)| {
                ExchangeTransfer::new(coin.clone(), f.burle.clone(), Amount::from_raw(amount.raw() / 10))
            })
            .collect();
        let owed = |f: &Fixture, ts: u64| -> Vec<Amount> {
            transfers
                .iter()
                .map(|t| t.amount.mul_wad(f.burner.price(&t.coin, ts).unwrap()).unwrap())
                .collect()
        };

        // target pushed to the burner beforehand
        let targets0 = owed(&f, ts);
        let total0: Amount = targets0.iter().copied().sum();
        f.ledger.deposit(&burner, &f.target, total0).unwrap();
        let ctx = CallContext::new(f.arve.clone(), ts);
        assert_eq!(f.burner.exchange(&mut f.ledger, &ctx, &transfers).unwrap(), total0);

        for (((coin, _), amount), target) in f.coins.iter().zip(&amounts).zip(&targets0) {
            assert_eq!(f.ledger.balance_of(&f.burle, coin).raw(), amount.raw() / 10, "bad coin transfer");
            let record = f.burner.record(coin);
            assert_eq!(record.current, Trade::new(Amount::from_raw(amount.raw() / 10), *target));
            assert_eq!(record.week, current_week);
        }
        assert_eq!(f.ledger.balance_of(&f.fee_collector, &f.target), total0);

        // target approved by the caller
        let targets1 = owed(&f, ts);
        let total1: Amount = targets1.iter().copied().sum();
        f.ledger.deposit(&f.arve, &f.target, total1).unwrap();
        f.ledger.approve(&f.arve, &burner, &f.target, total1).unwrap();
        f.burner.exchange(&mut f.ledger, &ctx, &transfers).unwrap();

        assert_eq!(f.ledger.balance_of(&f.arve, &f.target), Amount::ZERO);
        for (i, ((coin, _), amount)) in f.coins.iter().zip(&amounts).enumerate() {
            assert_eq!(f.ledger.balance_of(&f.burle, coin).raw(), 2 * (amount.raw() / 10));
            let record = f.burner.record(coin);
            assert_eq!(record.current.coin_amount.raw(), 2 * (amount.raw() / 10));
            assert_eq!(record.current.target_amount, targets0[i] + targets1[i]);
            assert_eq!(record.week, current_week);
        }

        // next week: history is smoothed once, with a little extra target pushed
        let ts = ts + WEEK;
        let targets2 = owed(&f, ts);
        let total2: Amount = targets2.iter().copied().sum();
        f.ledger.deposit(&burner, &f.target, total2 + Amount::from_raw(3)).unwrap();
        let ctx = CallContext::new(f.arve.clone(), ts);
        f.burner.exchange(&mut f.ledger, &ctx, &transfers).unwrap();

        for (i, ((coin, _), amount)) in f.coins.iter().zip(&amounts).enumerate() {
            assert_eq!(f.ledger.balance_of(&f.burle, coin).raw(), 3 * (amount.raw() / 10));
            let record = f.burner.record(coin);
            assert_eq!(record.previous.coin_amount.raw(), amount.raw() / 10);
            assert_eq!(
                record.previous.target_amount.raw(),
                (targets0[i] + targets1[i]).raw() / 2
            );
            assert_eq!(record.current, Trade::new(Amount::from_raw(amount.raw() / 10), targets2[i]));
            assert_eq!(record.week, current_week + 1);
        }
        assert_eq!(f.ledger.balance_of(&burner, &f.target), Amount::ZERO, "target not fully swept");
    }

    #[test]
    fn test_exchange_reverts_whole_batch() {
        let mut f = setup();
        let amounts = f.fund_collector();
        let ts = f.middle_of(Epoch::Exchange);
        let (coin, _) = f.coins[0].clone();
        let transfers = vec![ExchangeTransfer::new(coin.clone(), f.burle.clone(), amounts[0])];
        let before = f.ledger.snapshot();
        let ctx = CallContext::new(f.arve.clone(), ts);

        // nothing pushed, nothing approved
        assert!(matches!(
            f.burner.exchange(&mut f.ledger, &ctx, &transfers),
            Err(FeeflowError::InsufficientAllowance(..))
        ));
        assert_eq!(f.ledger.snapshot(), before);
        assert_eq!(f.burner.record(&coin), Record::default());

        let outside = CallContext::new(f.arve.clone(), f.middle_of(Epoch::Forward));
        assert_eq!(
            f.burner.exchange(&mut f.ledger, &outside, &transfers),
            Err(FeeflowError::BadTime)
        );
    }

    #[test]
    fn test_exchange_too_small() {
        let mut f = setup();
        f.fund_collector();
        let admin = f.admin.clone();
        let params = PriceParameters {
            min_exchange_amount: Amount::from_raw(WAD),
            ..*f.burner.params()
        };
        f.burner.set_price_parameters(&admin, params).unwrap();

        let cny = CoinId::new("CNY");
        let transfers = vec![ExchangeTransfer::new(cny.clone(), f.burle.clone(), Amount::from_raw(100))];
        let ctx = CallContext::new(f.arve.clone(), f.middle_of(Epoch::Exchange));
        assert_eq!(
            f.burner.exchange(&mut f.ledger, &ctx, &transfers),
            Err(FeeflowError::TooSmall(cny.to_string()))
        );
    }

    #[test]
    fn test_dust_exchange_cannot_zero_the_price() {
        let mut f = setup();
        let crv = CoinId::new("CRV");
        let held = Amount::from_raw(1000 * WAD);
        f.ledger.deposit(&f.fee_collector, &crv, held).unwrap();
        let (start, end) = f.clock.frame(Epoch::Exchange, f.week);
        let ts = start + (end - start) * 7 / 10;
        let price = f.burner.price(&crv, ts).unwrap();
        assert!(price < WAD);

        // one raw unit is worth less than one raw unit of target
        let ctx = CallContext::new(f.arve.clone(), ts);
        let dust = vec![ExchangeTransfer::new(crv.clone(), f.burle.clone(), Amount::from_raw(1))];
        assert_eq!(
            f.burner.exchange(&mut f.ledger, &ctx, &dust),
            Err(FeeflowError::TooSmall(crv.to_string()))
        );
        assert_eq!(f.burner.record(&crv), Record::default());
        assert_eq!(f.burner.price(&crv, ts).unwrap(), price);

        // a free trade already on record falls back to the default rate
        let admin = f.admin.clone();
        let free = Record {
            previous: Trade::default(),
            current: Trade::new(Amount::from_raw(1), Amount::ZERO),
            week: ts / WEEK,
        };
        f.burner.set_records(&admin, vec![(crv.clone(), free)]).unwrap();
        assert_eq!(f.burner.price(&crv, ts).unwrap(), price);

        let whole = vec![ExchangeTransfer::new(crv.clone(), f.burle.clone(), held)];
        assert!(f.burner.exchange(&mut f.ledger, &ctx, &whole).is_err());
        assert_eq!(f.ledger.balance_of(&f.fee_collector, &crv), held);
    }

    #[test]
    fn test_burn_remained() {
        let mut f = setup();
        let coins = f.coin_ids();
        let ts = f.middle_of(Epoch::Collect);
        let max_fee = f.fees.max_fee(Epoch::Collect);
        let collector = CallContext::new(f.fee_collector.clone(), ts);
        let burle = f.burle.clone();

        let amounts = f.fund_collector();
        let payouts = f
            .burner
            .burn(&mut f.ledger, &f.fees, &collector, &coins, &burle, false)
            .unwrap();
        for ((coin, amount), payout) in coins.iter().zip(&amounts).zip(&payouts) {
            assert_eq!(f.ledger.balance_of(&burle, coin), *payout);
            assert!(amount.raw() * max_fee / (2 * WAD) <= payout.raw());
            assert!(payout.raw() <= amount.raw() * max_fee / WAD);
            assert_eq!(*payout + f.ledger.balance_of(&f.fee_collector, coin), *amount);
        }

        // double spend
        let again = f
            .burner
            .burn(&mut f.ledger, &f.fees, &collector, &coins, &burle, false)
            .unwrap();
        assert!(again.iter().all(Amount::is_zero));

        // new fees arrive
        f.fund_collector();
        f.burner
            .burn(&mut f.ledger, &f.fees, &collector, &coins, &burle, false)
            .unwrap();
        let sums: Vec<Amount> = coins.iter().map(|coin| f.ledger.balance_of(&burle, coin)).collect();
        for ((coin, amount), (payout, sum)) in coins.iter().zip(&amounts).zip(payouts.iter().zip(&sums)) {
            assert!(sum.raw() >= 2 * payout.raw());
            assert!(sum.raw() <= 2 * amount.raw() * max_fee / WAD);
            assert_eq!(*sum + f.ledger.balance_of(&f.fee_collector, coin), *amount + *amount);
        }

        // only_revise: anyone may re-baseline, and nothing is paid afterwards
        f.ledger.deposit(&f.fee_collector, &coins[0], amounts[0]).unwrap();
        f.ledger
            .transfer(&f.fee_collector, &f.arve, &coins[1], amounts[1])
            .unwrap();
        let anyone = CallContext::new(f.arve.clone(), ts);
        f.burner
            .burn(&mut f.ledger, &f.fees, &anyone, &coins, &burle, true)
            .unwrap();
        f.burner
            .burn(&mut f.ledger, &f.fees, &collector, &coins, &burle, false)
            .unwrap();
        for (coin, sum) in coins.iter().zip(&sums) {
            assert_eq!(f.ledger.balance_of(&burle, coin), *sum, "no new coins");
        }

        assert_eq!(
            f.burner.burn(&mut f.ledger, &f.fees, &anyone, &[], &burle, false),
            Err(FeeflowError::OnlyFeeCollector)
        );
    }

    #[test]
    fn test_burn_fee_grows_over_collect() {
        let mut f = setup();
        let coin = CoinId::new("CRV");
        let (start, end) = f.clock.frame(Epoch::Collect, f.week);
        let burle = f.burle.clone();
        let amount = Amount::from_raw(10 * WAD);

        let payout_at = |f: &mut Fixture, ts: u64| {
            f.ledger.deposit(&f.fee_collector, &coin, amount).unwrap();
            let ctx = CallContext::new(f.fee_collector.clone(), ts);
            f.burner
                .burn(&mut f.ledger, &f.fees, &ctx, &[coin.clone()], &burle, false)
                .unwrap()[0]
        };

        let early = payout_at(&mut f, start);
        let late = payout_at(&mut f, end - 1);
        assert_eq!(early, Amount::ZERO);
        assert!(late.raw() >= amount.raw() * f.fees.max_fee(Epoch::Collect) * 9 / (10 * WAD));
    }

    #[test]
    fn test_push_target() {
        let mut f = setup();
        let burner = f.burner.account().clone();
        f.ledger.deposit(&burner, &f.target, Amount::from_raw(WAD)).unwrap();

        assert_eq!(f.burner.push_target(&mut f.ledger).unwrap().raw(), WAD);
        assert_eq!(f.ledger.balance_of(&burner, &f.target), Amount::ZERO);
        assert_eq!(f.ledger.balance_of(&f.arve, &f.target), Amount::ZERO);
        assert_eq!(f.ledger.balance_of(&f.fee_collector, &f.target).raw(), WAD);
    }

    #[test]
    fn test_admin() {
        let mut f = setup();
        let (admin, emergency, arve) = (f.admin.clone(), f.emergency.clone(), f.arve.clone());
        let cheap = PriceParameters {
            price_floor: 0,
            price_ceiling: WAD,
            ..*f.burner.params()
        };

        // both admins
        for caller in [&admin, &emergency] {
            f.burner.recover(&mut f.ledger, caller, &[]).unwrap();
            f.burner.set_records(caller, vec![]).unwrap();
        }

        // only ownership admin
        f.burner.set_records_smoothing(&admin, 0).unwrap();
        f.burner.set_price_parameters(&admin, cheap).unwrap();
        f.burner.set_time_amplifier_base(&admin, 2 * WAD, LN2_WAD).unwrap();
        assert_eq!(f.burner.params().amplifier_base, 2 * WAD);
        assert_eq!(f.burner.set_records_smoothing(&emergency, 0), Err(FeeflowError::OnlyOwner));
        assert_eq!(f.burner.set_price_parameters(&emergency, cheap), Err(FeeflowError::OnlyOwner));
        assert_eq!(
            f.burner.set_time_amplifier_base(&emergency, 2 * WAD, LN2_WAD),
            Err(FeeflowError::OnlyOwner)
        );

        // third wheel
        assert_eq!(f.burner.recover(&mut f.ledger, &arve, &[]), Err(FeeflowError::OnlyOwner));
        assert_eq!(f.burner.set_records(&arve, vec![]), Err(FeeflowError::OnlyOwner));
        assert_eq!(f.burner.set_records_smoothing(&arve, 0), Err(FeeflowError::OnlyOwner));
        assert_eq!(f.burner.set_price_parameters(&arve, cheap), Err(FeeflowError::OnlyOwner));
        assert_eq!(
            f.burner.set_time_amplifier_base(&arve, 2 * WAD, LN2_WAD),
            Err(FeeflowError::OnlyOwner)
        );

        // validation
        assert!(f.burner.set_time_amplifier_base(&admin, WAD, 0).is_err());
        assert!(f.burner.set_records_smoothing(&admin, WAD + 1).is_err());
    }

    #[test]
    fn test_set_records_moves_reference() {
        let mut f = setup();
        let coin = CoinId::new("BTC");
        let ts = f.middle_of(Epoch::Exchange);
        let before = f.burner.price(&coin, ts).unwrap();

        let admin = f.admin.clone();
        let record = Record {
            previous: Trade::new(Amount::from_raw(1), Amount::from_raw(3)),
            current: Trade::default(),
            week: ts / WEEK,
        };
        f.burner.set_records(&admin, vec![(coin.clone(), record)]).unwrap();
        assert_eq!(f.burner.record(&coin), record);

        let after = f.burner.price(&coin, ts).unwrap();
        assert!(after >= 3 * before - 3 && after <= 3 * before + 3);
    }

    #[test]
    fn test_recover_balance() {
        let mut f = setup();
        let burner = f.burner.account().clone();
        let native = CoinId::native();
        let mut coins = f.coin_ids();
        for coin in &coins {
            f.ledger.deposit(&burner, coin, Amount::from_raw(WAD)).unwrap();
        }
        f.ledger.deposit(&burner, &native, Amount::from_raw(WAD)).unwrap();
        coins.push(native);

        let admin = f.admin.clone();
        f.burner.recover(&mut f.ledger, &admin, &coins).unwrap();
        for coin in &coins {
            assert_eq!(f.ledger.balance_of(&burner, coin), Amount::ZERO);
            assert_eq!(f.ledger.balance_of(&f.fee_collector, coin).raw(), WAD);
        }
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "params": {
                "amplifier_base": 2000000000000000000,
                "log_amplifier_base": 693147180559945309,
                "smoothing_factor": 500000000000000000,
                "min_exchange_amount": 1000,
                "price_ceiling": 3000000000000000000,
                "price_floor": 1000000000000000000,
                "default_rate": 1000000000000000000
            },
            "records": {
                "CRV": {
                    "previous": {"coin_amount": 10, "target_amount": 5},
                    "current": {"coin_amount": 0, "target_amount": 0},
                    "week": 2700
                }
            }
        }"#;
        let config: BurnerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.params.price_ceiling, 3 * WAD);
        assert_eq!(config.params.min_exchange_amount.raw(), 1000);
        assert_eq!(config.records[&CoinId::new("CRV")].previous.target_amount.raw(), 5);

        let empty: BurnerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.params, PriceParameters::default());
    }

    proptest! {
        #[test]
        fn prop_time_amplifier_closed_form(
            lasted in 0u64..365 * DAY,
            remaining in 1u64..365 * DAY,
            base in (WAD + WAD / 1000)..1_000_000 * WAD,
        ) {
            let whole = lasted + remaining;
            let b = base as f64 / 1e18;
            let params = PriceParameters {
                amplifier_base: base,
                log_amplifier_base: (b.ln() * 1e18) as u128,
                ..PriceParameters::default()
            };

            let amp = params.time_amplifier(remaining, whole).unwrap() as f64 / 1e18;
            let expected = (b.powf(remaining as f64 / whole as f64) - 1.0) / (b - 1.0);
            prop_assert!(
                (amp - expected).abs() <= 1e-9 + expected * 1e-9,
                "amp {} expected {}",
                amp,
                expected
            );
        }
    }
}
