//! Integration tests.
//!
//! Tests cover:
//! - Ledger ordering (stable date sort) and ref allocation across removes
//! - Fee schedule first-match-wins over overlapping bands
//! - Sell clamping against the position store, including undo asymmetry
//! - Aggregation totals: empty ledger, taxable clamp, tax threshold
//!   boundary, year gating
//! - Operation persistence round-trip through the delimited codec
//! - Registry pipeline on disk: load, replay, evaluate, rename, remove

mod common;

use approx::assert_relative_eq;
use common::*;
use foliotrack::adapters::delimited_adapter::DelimitedFileAdapter;
use foliotrack::adapters::memory_position_adapter::MemoryPositionStore;
use foliotrack::domain::error::FolioError;
use foliotrack::domain::fees::FeeSchedule;
use foliotrack::domain::ledger::OperationLedger;
use foliotrack::domain::portfolio::{BookScope, Portfolio, TaxRules, DEFAULT_VAT};
use foliotrack::domain::registry::PortfolioRegistry;
use foliotrack::ports::position_port::{Book, PositionStore};
use foliotrack::ports::record_port::RecordPort;
use proptest::prelude::*;

mod ledger_ordering {
    use super::*;

    #[test]
    fn list_is_sorted_with_stable_ties() {
        let mut store = sample_store();
        let resolver = sample_store();
        let mut ledger = OperationLedger::new();

        let entries = [
            ("2024-05-01", "second of may"),
            ("2024-01-01", "january"),
            ("2024-05-01", "third of may"),
            ("2023-11-30", "november"),
        ];
        // "second of may" was inserted before "third of may": the tie on
        // 2024-05-01 must preserve that order.
        for (date, label) in entries {
            ledger
                .add(&raw_op(date, "C", label, "1", "0", "0"), DEFAULT_VAT, false, &resolver, &mut store)
                .unwrap();
        }

        let listed: Vec<&str> = ledger.list().iter().map(|op| op.label()).collect();
        assert_eq!(
            listed,
            vec!["november", "january", "second of may", "third of may"]
        );
    }

    #[test]
    fn refs_strictly_increase_and_survive_removal() {
        let mut store = sample_store();
        let resolver = sample_store();
        let mut ledger = OperationLedger::new();

        let mut refs = Vec::new();
        for day in 1..=5 {
            let date = format!("2024-01-{day:02}");
            refs.push(
                ledger
                    .add(&raw_op(&date, "C", "x", "1", "0", "0"), DEFAULT_VAT, false, &resolver, &mut store)
                    .unwrap(),
            );
        }
        assert_eq!(refs, vec![0, 1, 2, 3, 4]);

        ledger.remove(2, false, &mut store).unwrap();
        ledger.remove(4, false, &mut store).unwrap();
        let next = ledger
            .add(&raw_op("2024-02-01", "C", "x", "1", "0", "0"), DEFAULT_VAT, false, &resolver, &mut store)
            .unwrap();
        assert_eq!(next, 5);
    }

    proptest! {
        #[test]
        fn list_is_always_non_decreasing(days in proptest::collection::vec(1u32..=28, 1..40)) {
            let mut store = sample_store();
            let resolver = sample_store();
            let mut ledger = OperationLedger::new();
            for day in days {
                let date = format!("2024-{:02}-{:02}", (day % 12) + 1, day);
                ledger
                    .add(&raw_op(&date, "C", "x", "1", "0", "0"), DEFAULT_VAT, false, &resolver, &mut store)
                    .unwrap();
            }
            let listed = ledger.list();
            for pair in listed.windows(2) {
                prop_assert!(pair[0].date() <= pair[1].date());
                if pair[0].date() == pair[1].date() {
                    prop_assert!(pair[0].op_ref() < pair[1].op_ref());
                }
            }
        }
    }
}

mod fee_lookup {
    use super::*;

    #[test]
    fn earliest_added_matching_rule_wins() {
        let mut fees = FeeSchedule::new();
        fees.add_rule("7", "0", "100").unwrap();
        fees.add_rule("12", "50", "200").unwrap();

        assert_eq!(fees.lookup(75.0), Some(7.0));
        assert_eq!(fees.lookup(150.0), Some(12.0));
        assert_eq!(fees.lookup(300.0), None);
    }

    proptest! {
        #[test]
        fn lookup_inside_first_band_never_reaches_later_rules(value in 0.0f64..=100.0) {
            let mut fees = FeeSchedule::new();
            fees.add_rule("7", "0", "100").unwrap();
            fees.add_rule("12", "0", "1000").unwrap();
            prop_assert_eq!(fees.lookup(value), Some(7.0));
        }
    }
}

mod sell_clamping {
    use super::*;

    #[test]
    fn oversell_clamps_to_holding_and_stores_clamped_count() {
        let mut store = sample_store();
        let resolver = sample_store();
        let mut portfolio =
            Portfolio::new("t", "T", "1", "EURONEXT", "EUR", DEFAULT_VAT);

        portfolio
            .add_operation(&raw_op("2024-01-10", "B", "ACME", "1000", "0", "10"), &resolver, &mut store)
            .unwrap();
        let sell_ref = portfolio
            .add_operation(&raw_op("2024-02-10", "S", "ACME", "150", "0", "15"), &resolver, &mut store)
            .unwrap();

        assert_eq!(store.holding(ACME_ISIN, Book::Cash), 0);
        assert_eq!(portfolio.get_operation(sell_ref).unwrap().count(), 10);
    }

    #[test]
    fn undo_after_clamp_uses_stored_count() {
        let mut store = sample_store();
        let resolver = sample_store();
        let mut portfolio =
            Portfolio::new("t", "T", "1", "EURONEXT", "EUR", DEFAULT_VAT);

        portfolio
            .add_operation(&raw_op("2024-01-10", "B", "ACME", "1000", "0", "10"), &resolver, &mut store)
            .unwrap();
        let sell_ref = portfolio
            .add_operation(&raw_op("2024-02-10", "S", "ACME", "150", "0", "15"), &resolver, &mut store)
            .unwrap();

        // Undo restores the 10 clamped shares, not the requested 15.
        portfolio.del_operation(sell_ref, &mut store).unwrap();
        assert_eq!(store.holding(ACME_ISIN, Book::Cash), 10);
    }
}

mod aggregation {
    use super::*;

    #[test]
    fn empty_ledger_is_all_zeros() {
        let portfolio = Portfolio::new("t", "T", "1", "EURONEXT", "EUR", DEFAULT_VAT);
        let store = MemoryPositionStore::new();
        let totals = portfolio.compute_operations(2024, &store).unwrap();

        assert_eq!(totals.cash, 0.0);
        assert_eq!(totals.credit, 0.0);
        assert_eq!(totals.invest, 0.0);
        assert_eq!(totals.expenses, 0.0);
        assert_eq!(totals.transfer, 0.0);
        assert_eq!(totals.taxable(), 0.0);
        assert_eq!(totals.appreciation, 0.0);
    }

    #[test]
    fn loss_making_sell_never_yields_negative_taxable() {
        let mut store = sample_store();
        let resolver = sample_store();
        let mut portfolio =
            Portfolio::new("t", "T", "1", "EURONEXT", "EUR", DEFAULT_VAT);

        portfolio
            .add_operation(&raw_op("2024-01-10", "B", "ACME", "2000", "0", "10"), &resolver, &mut store)
            .unwrap();
        portfolio
            .add_operation(&raw_op("2024-03-10", "S", "ACME", "500", "0", "5"), &resolver, &mut store)
            .unwrap();

        let totals = portfolio.compute_operations(2024, &store).unwrap();
        assert_relative_eq!(totals.taxable_gain, 500.0 - 5.0 * 200.0);
        assert_eq!(totals.taxable(), 0.0);
    }

    #[test]
    fn taxes_trigger_only_strictly_above_threshold() {
        let rules = TaxRules {
            transfer_threshold: 15000.0,
            rate: 0.27,
        };
        let mut store = sample_store();
        let resolver = sample_store();
        let mut portfolio =
            Portfolio::new("t", "T", "1", "EURONEXT", "EUR", DEFAULT_VAT);
        portfolio.set_tax_rules(rules);

        portfolio
            .add_operation(&raw_op("2024-01-10", "B", "ACME", "10000", "0", "100"), &resolver, &mut store)
            .unwrap();
        // Proceeds 15000 with zero expenses: transfers land exactly on the
        // threshold, which must not trigger taxation.
        portfolio
            .add_operation(&raw_op("2024-02-10", "S", "ACME", "15000", "0", "100"), &resolver, &mut store)
            .unwrap();

        let totals = portfolio.compute_operations(2024, &store).unwrap();
        assert_relative_eq!(totals.transfer, 15000.0);
        assert_relative_eq!(totals.taxable(), 5000.0);
        assert_eq!(totals.taxes(&rules), 0.0);

        // One cent of extra proceeds crosses the threshold.
        let mut store = sample_store();
        let mut portfolio2 =
            Portfolio::new("t", "T", "1", "EURONEXT", "EUR", DEFAULT_VAT);
        portfolio2.set_tax_rules(rules);
        portfolio2
            .add_operation(&raw_op("2024-01-10", "B", "ACME", "10000", "0", "100"), &resolver, &mut store)
            .unwrap();
        portfolio2
            .add_operation(&raw_op("2024-02-10", "S", "ACME", "15000.01", "0", "100"), &resolver, &mut store)
            .unwrap();

        let totals = portfolio2.compute_operations(2024, &store).unwrap();
        assert_relative_eq!(totals.taxes(&rules), totals.taxable() * 0.27);
        assert!(totals.taxes(&rules) > 0.0);
    }

    #[test]
    fn prior_year_contributes_to_lifetime_but_not_year_figures() {
        let mut store = sample_store();
        let resolver = sample_store();
        let mut portfolio =
            Portfolio::new("t", "T", "1", "EURONEXT", "EUR", DEFAULT_VAT);

        portfolio
            .add_operation(&raw_op("2023-05-10", "C", "old", "1000", "9", "0"), &resolver, &mut store)
            .unwrap();
        portfolio
            .add_operation(&raw_op("2023-06-10", "B", "ACME", "500", "4", "5"), &resolver, &mut store)
            .unwrap();
        portfolio
            .add_operation(&raw_op("2023-07-10", "S", "ACME", "600", "2", "5"), &resolver, &mut store)
            .unwrap();

        let totals = portfolio.compute_operations(2024, &store).unwrap();
        assert_relative_eq!(totals.cash, 1000.0 - 500.0 + 600.0);
        assert_relative_eq!(totals.invest, 1000.0);
        assert_eq!(totals.expenses, 0.0);
        assert_eq!(totals.transfer, 0.0);
        assert_eq!(totals.taxable(), 0.0);
    }

    #[test]
    fn unknown_kind_aborts_aggregation() {
        let mut store = sample_store();
        let resolver = sample_store();
        let mut portfolio =
            Portfolio::new("t", "T", "1", "EURONEXT", "EUR", DEFAULT_VAT);

        portfolio
            .add_operation(&raw_op("2024-01-10", "C", "fine", "100", "0", "0"), &resolver, &mut store)
            .unwrap();
        portfolio
            .add_operation(&raw_op("2024-01-11", "G", "corrupt", "100", "0", "0"), &resolver, &mut store)
            .unwrap();

        assert!(matches!(
            portfolio.compute_operations(2024, &store),
            Err(FolioError::UnknownOperationKind { .. })
        ));
    }
}

mod persistence_round_trip {
    use super::*;

    #[test]
    fn operations_survive_write_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ops.txt");
        let records = DelimitedFileAdapter::new();

        let mut store = sample_store();
        let resolver = sample_store();
        let mut portfolio =
            Portfolio::new("t", "T", "1", "EURONEXT", "EUR", DEFAULT_VAT);

        for raw in [
            raw_op("2024-01-05", "C", "deposit", "5000", "0", "0"),
            raw_op("20240110", "B", "ACME", "1000", "8", "10"),
            raw_op("2024-02-01", "Z", "GLBX", "45.5", "0", "0"),
            raw_op("2024-03-01", "S", "ACME", "550", "4", "5"),
        ] {
            portfolio.add_operation(&raw, &resolver, &mut store).unwrap();
        }

        records.write_rows(&path, &portfolio.operations_rows()).unwrap();

        let mut reload_store = sample_store();
        let reload_resolver = sample_store();
        let mut reloaded = Portfolio::new("t", "T", "1", "EURONEXT", "EUR", DEFAULT_VAT);
        let loaded = reloaded.load_operations(
            &records.read_rows(&path).unwrap(),
            &reload_resolver,
            &mut reload_store,
        );
        assert_eq!(loaded, 4);

        let original: Vec<_> = portfolio.ledger().list();
        let restored: Vec<_> = reloaded.ledger().list();
        assert_eq!(original.len(), restored.len());
        for (a, b) in original.iter().zip(&restored) {
            assert_eq!(a.date(), b.date());
            assert_eq!(a.kind(), b.kind());
            assert_eq!(a.value(), b.value());
            assert_eq!(a.expenses(), b.expenses());
            assert_eq!(a.count(), b.count());
            assert_eq!(a.op_ref(), b.op_ref());
        }
    }

    #[test]
    fn fee_rules_survive_write_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fees.txt");
        let records = DelimitedFileAdapter::new();

        let mut fees = FeeSchedule::new();
        fees.add_rule("5", "0", "1000").unwrap();
        fees.add_rule("0.9%", "1000", "100000").unwrap();
        records.write_rows(&path, &fees.to_rows()).unwrap();

        let mut reloaded = FeeSchedule::new();
        reloaded.load_rows(&records.read_rows(&path).unwrap());
        assert_eq!(reloaded.lookup(100.0), Some(5.0));
        assert_eq!(reloaded.lookup(10000.0), Some(90.0));
    }
}

mod registry_pipeline {
    use super::*;

    #[test]
    fn load_replay_evaluate_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let records = DelimitedFileAdapter::new();

        records
            .write_rows(
                &dir.path().join("portfolio.txt"),
                &rows(&[&["mine", "My Portfolio", "111", "EURONEXT", "EUR", "1.196"]]),
            )
            .unwrap();
        records
            .write_rows(
                &dir.path().join("mine.operations.txt"),
                &rows(&[
                    &["2024-01-05", "C", "deposit", "5000", "0", "0"],
                    &["2024-01-10", "B", "ACME", "1000", "8", "10"],
                    &["not-a-date", "B", "ACME", "1", "0", "1"],
                ]),
            )
            .unwrap();
        records
            .write_rows(
                &dir.path().join("mine.fees.txt"),
                &rows(&[&["5", "0", "1000"]]),
            )
            .unwrap();

        let mut registry = PortfolioRegistry::new(dir.path());
        registry.load(&records).unwrap();

        let resolver = sample_store();
        let mut store = sample_store();
        let portfolio = registry
            .load_portfolio("mine", &records, &resolver, &mut store)
            .unwrap();

        // The malformed row was skipped, the rest replayed.
        assert_eq!(portfolio.ledger().len(), 2);
        assert_eq!(store.holding(ACME_ISIN, Book::Cash), 10);
        assert_eq!(portfolio.trading_fee(500.0), 5.0);

        store.set_price(ACME_ISIN, 110.0);
        let snapshot = portfolio.evaluate(2024, &store).unwrap();
        assert_relative_eq!(snapshot.totals.cash, 4000.0);
        assert_relative_eq!(snapshot.value.scoped(BookScope::Cash), 1100.0);
        assert_relative_eq!(snapshot.total_value(), 5100.0);

        assert_eq!(registry.default_key(&records).unwrap(), Some("mine".into()));
    }

    #[test]
    fn rename_then_remove_cleans_artifacts() {
        let dir = tempfile::TempDir::new().unwrap();
        let records = DelimitedFileAdapter::new();
        let mut registry = PortfolioRegistry::new(dir.path());
        registry
            .add("mine", "My Portfolio", "111", "EURONEXT", "EUR", DEFAULT_VAT)
            .unwrap();

        records
            .write_rows(
                &dir.path().join("mine.operations.txt"),
                &rows(&[&["2024-01-05", "C", "deposit", "5000", "0", "0"]]),
            )
            .unwrap();

        registry.rename("mine", "ours").unwrap();
        assert!(dir.path().join("ours.operations.txt").exists());
        assert!(!dir.path().join("mine.operations.txt").exists());
        assert_eq!(registry.get("ours").unwrap().file_key(), "ours");

        assert!(registry.remove("ours"));
        assert!(!dir.path().join("ours.operations.txt").exists());
        assert!(registry.is_empty());
    }
}
