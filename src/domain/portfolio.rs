//! Portfolio: one operation ledger, one fee schedule, and the aggregation
//! passes producing cash, credit, performance, and taxable-gain figures.
//!
//! Aggregation is a pure function of (ledger, position store, reference
//! year) returning an immutable snapshot; nothing is incrementally patched,
//! so a pass can never leave stale partial figures behind.

use chrono::NaiveDate;

use super::error::FolioError;
use super::fees::FeeSchedule;
use super::kind::OperationKind;
use super::ledger::OperationLedger;
use super::operation::{Operation, RawOperation};
use crate::ports::position_port::{Book, PositionStore};
use crate::ports::resolver_port::SecurityResolver;

pub const DEFAULT_CURRENCY: &str = "EUR";
pub const DEFAULT_VAT: f64 = 1.196;

/// Tax parameters: sells are taxed only once the year's cumulative
/// transfers exceed the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxRules {
    pub transfer_threshold: f64,
    pub rate: f64,
}

impl Default for TaxRules {
    fn default() -> Self {
        TaxRules {
            transfer_threshold: 15000.0,
            rate: 0.27,
        }
    }
}

/// Book selection for valuation queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookScope {
    Cash,
    Margin,
    Both,
}

/// Lifetime and current-year accumulators from one ledger fold.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LedgerTotals {
    /// Running cash balance (lifetime).
    pub cash: f64,
    /// Running margin-credit balance (lifetime).
    pub credit: f64,
    /// Cumulative cash investment (lifetime).
    pub invest: f64,
    /// Expenses, current-year scope.
    pub expenses: f64,
    /// Transfers (sell proceeds plus expenses), current-year scope.
    pub transfer: f64,
    /// Raw taxable gain, current-year scope; may be negative.
    pub taxable_gain: f64,
    /// Appreciation, current-year scope.
    pub appreciation: f64,
}

impl LedgerTotals {
    /// Taxable amount, clamped to zero minimum (never negative).
    pub fn taxable(&self) -> f64 {
        self.taxable_gain.max(0.0)
    }

    /// Zero until cumulative transfers exceed the threshold (the threshold
    /// value itself does not trigger), then `taxable × rate`.
    pub fn taxes(&self, rules: &TaxRules) -> f64 {
        if self.transfer <= rules.transfer_threshold {
            0.0
        } else {
            self.taxable() * rules.rate
        }
    }
}

/// Per-book market values or cost bases.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BookValues {
    pub cash: f64,
    pub margin: f64,
}

impl BookValues {
    pub fn scoped(&self, scope: BookScope) -> f64 {
        match scope {
            BookScope::Cash => self.cash,
            BookScope::Margin => self.margin,
            BookScope::Both => self.cash + self.margin,
        }
    }
}

/// Immutable result of one full valuation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuationSnapshot {
    pub totals: LedgerTotals,
    /// Market value of holdings per book.
    pub value: BookValues,
    /// Cost basis of holdings per book.
    pub buy: BookValues,
}

impl ValuationSnapshot {
    /// Net performance: market value minus cost basis.
    pub fn performance(&self, scope: BookScope) -> f64 {
        self.value.scoped(scope) - self.buy.scoped(scope)
    }

    pub fn performance_percent(&self, scope: BookScope) -> f64 {
        let value = self.value.scoped(scope);
        let buy = self.buy.scoped(scope);
        if value == 0.0 || buy == 0.0 {
            return 0.0;
        }
        (value * 100.0) / buy - 100.0
    }

    /// Securities plus cash, minus the margin-credit balance.
    pub fn total_value(&self) -> f64 {
        self.value.scoped(BookScope::Both) + self.totals.cash - self.totals.credit
    }

    pub fn total_performance(&self) -> f64 {
        self.total_value() - self.totals.invest
    }

    pub fn total_performance_percent(&self) -> f64 {
        let total = self.total_value();
        let invest = self.totals.invest;
        if total == 0.0 || invest == 0.0 {
            return 0.0;
        }
        (total * 100.0) / invest - 100.0
    }

    /// Share of the portfolio held as cash, in percent.
    pub fn percent_cash(&self, scope: BookScope) -> f64 {
        let total = self.value.scoped(scope) + self.totals.cash;
        if total == 0.0 {
            return 0.0;
        }
        (total - self.value.scoped(scope)) / total * 100.0
    }

    /// Share of the portfolio held as securities, in percent.
    pub fn percent_securities(&self, scope: BookScope) -> f64 {
        let total = self.value.scoped(scope) + self.totals.cash;
        if total == 0.0 {
            return 0.0;
        }
        (total - self.totals.cash) / total * 100.0
    }
}

/// One investor portfolio: identity, ledger, fee schedule, tax rules.
#[derive(Debug)]
pub struct Portfolio {
    file_key: String,
    display_name: String,
    account_ref: String,
    market: String,
    currency: String,
    vat: f64,
    ledger: OperationLedger,
    fees: FeeSchedule,
    tax_rules: TaxRules,
}

impl Portfolio {
    pub fn new(
        file_key: impl Into<String>,
        display_name: impl Into<String>,
        account_ref: impl Into<String>,
        market: impl Into<String>,
        currency: impl Into<String>,
        vat: f64,
    ) -> Self {
        Portfolio {
            file_key: file_key.into(),
            display_name: display_name.into(),
            account_ref: account_ref.into(),
            market: market.into(),
            currency: currency.into(),
            vat,
            ledger: OperationLedger::new(),
            fees: FeeSchedule::new(),
            tax_rules: TaxRules::default(),
        }
    }

    pub fn file_key(&self) -> &str {
        &self.file_key
    }

    // The registry rekeys the map and the portfolio's storage key together.
    pub(crate) fn set_file_key(&mut self, key: impl Into<String>) {
        self.file_key = key.into();
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn account_ref(&self) -> &str {
        &self.account_ref
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn vat(&self) -> f64 {
        self.vat
    }

    pub fn ledger(&self) -> &OperationLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut OperationLedger {
        &mut self.ledger
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    pub fn fees_mut(&mut self) -> &mut FeeSchedule {
        &mut self.fees
    }

    pub fn tax_rules(&self) -> &TaxRules {
        &self.tax_rules
    }

    pub fn set_tax_rules(&mut self, rules: TaxRules) {
        self.tax_rules = rules;
    }

    // --- operations API ---

    /// Add an operation and apply its effect immediately.
    pub fn add_operation(
        &mut self,
        raw: &RawOperation,
        resolver: &dyn SecurityResolver,
        store: &mut dyn PositionStore,
    ) -> Result<u64, FolioError> {
        self.ledger.add(raw, self.vat, true, resolver, store)
    }

    /// Remove an operation, undoing its effect first.
    pub fn del_operation(
        &mut self,
        op_ref: u64,
        store: &mut dyn PositionStore,
    ) -> Result<Operation, FolioError> {
        self.ledger.remove(op_ref, true, store)
    }

    pub fn get_operation(&self, op_ref: u64) -> Option<&Operation> {
        self.ledger.get(op_ref)
    }

    /// Replay all loaded operations against the position store.
    pub fn apply_operations(&mut self, store: &mut dyn PositionStore, cutoff: Option<NaiveDate>) {
        self.ledger.apply_all(store, cutoff);
    }

    // --- fee API ---

    /// Trading fee for a trade value: the first matching band, or zero
    /// when no rule applies.
    pub fn trading_fee(&self, value: f64) -> f64 {
        self.fees.lookup(value).unwrap_or(0.0)
    }

    // --- aggregation passes ---

    /// Fold the date-ordered ledger once into lifetime and current-year
    /// totals. Only operations dated in `reference_year` contribute to the
    /// current-year figures; all operations contribute to the running
    /// cash/credit/investment totals.
    ///
    /// An operation with an unrecognized kind is fatal here: skipping it
    /// would silently corrupt the running balances.
    pub fn compute_operations(
        &self,
        reference_year: i32,
        store: &dyn PositionStore,
    ) -> Result<LedgerTotals, FolioError> {
        use OperationKind::*;

        let mut t = LedgerTotals::default();
        for op in self.ledger.list() {
            let same_year = op.year() == reference_year;
            let v = op.value();
            let e = op.expenses();
            match op.kind() {
                Credit => {
                    t.cash += v;
                    t.invest += v;
                    if same_year {
                        t.expenses += e;
                    }
                }
                Debit => {
                    t.cash -= v;
                    if same_year {
                        t.expenses += e;
                    }
                }
                Buy => {
                    t.cash -= v;
                    if same_year {
                        t.expenses += e;
                    }
                }
                BuyMargin => {
                    t.credit += v;
                    if same_year {
                        t.expenses += e;
                    }
                }
                Sell => {
                    t.cash += v;
                    if same_year {
                        t.expenses += e;
                        t.transfer += v + e;
                        let profit = op.profit_on_sale(store);
                        t.taxable_gain += profit;
                        t.appreciation += profit;
                    }
                }
                SellMargin => {
                    t.credit -= v;
                    if same_year {
                        t.expenses += e;
                        t.transfer += v + e;
                    }
                }
                Fee => {
                    t.cash -= v;
                    if same_year {
                        t.expenses += e;
                    }
                }
                Interest => {
                    t.cash += v;
                    if same_year {
                        t.expenses += e;
                        t.appreciation += v;
                    }
                }
                CouponDetach => {
                    t.cash += v;
                    if same_year {
                        t.expenses += e;
                        t.appreciation += v;
                    }
                }
                DividendCash => {
                    t.cash += v;
                    if same_year {
                        t.expenses += e;
                        t.taxable_gain += v;
                        t.appreciation += v;
                    }
                }
                MarginLiquidation => {
                    t.cash += v;
                    t.credit += v + e;
                    if same_year {
                        t.expenses += e;
                        // Settled margin shares realize at their average
                        // cost on top of the liquidation value.
                        let mut gain = v;
                        if let Ok(Some(sec)) = op.security() {
                            gain += op.count() as f64
                                * store.average_cost(&sec.isin, Book::Margin);
                        }
                        t.taxable_gain += gain;
                        t.appreciation += gain;
                    }
                }
                RegisterShares => {
                    t.invest += v;
                }
                DividendShares | Split => {}
                Unknown(code) => {
                    return Err(FolioError::UnknownOperationKind {
                        code: code.clone(),
                        op_ref: op.op_ref(),
                    });
                }
            }
        }
        Ok(t)
    }

    /// Sum the current market value of every traded security per book.
    /// Recomputed on every call; the store may have changed underneath.
    pub fn compute_value(&self, store: &dyn PositionStore) -> BookValues {
        let mut values = BookValues::default();
        for isin in store.traded() {
            values.cash += store.market_value(&isin, &self.currency, Book::Cash);
            values.margin += store.market_value(&isin, &self.currency, Book::Margin);
        }
        values
    }

    /// Sum the cost basis of every traded security per book.
    pub fn compute_buy(&self, store: &dyn PositionStore) -> BookValues {
        let mut buys = BookValues::default();
        for isin in store.traded() {
            buys.cash += store.cost_basis(&isin, Book::Cash);
            buys.margin += store.cost_basis(&isin, Book::Margin);
        }
        buys
    }

    /// Run all three passes and return one immutable snapshot.
    pub fn evaluate(
        &self,
        reference_year: i32,
        store: &dyn PositionStore,
    ) -> Result<ValuationSnapshot, FolioError> {
        Ok(ValuationSnapshot {
            totals: self.compute_operations(reference_year, store)?,
            value: self.compute_value(store),
            buy: self.compute_buy(store),
        })
    }

    // --- persistence rows ---

    /// Registry row: `fileKey;name;accountRef;market;currency;vat`.
    pub fn properties_row(&self) -> Vec<String> {
        vec![
            self.file_key.clone(),
            self.display_name.clone(),
            self.account_ref.clone(),
            self.market.clone(),
            self.currency.clone(),
            self.vat.to_string(),
        ]
    }

    /// Load persisted operation rows (malformed rows are skipped).
    pub fn load_operations(
        &mut self,
        rows: &[Vec<String>],
        resolver: &dyn SecurityResolver,
        store: &mut dyn PositionStore,
    ) -> usize {
        self.ledger.load_rows(rows, self.vat, resolver, store)
    }

    pub fn operations_rows(&self) -> Vec<Vec<String>> {
        self.ledger.to_rows()
    }

    /// Load persisted fee rule rows (malformed rows are skipped).
    pub fn load_fee_rules(&mut self, rows: &[Vec<String>]) -> usize {
        self.fees.load_rows(rows)
    }

    pub fn fee_rows(&self) -> Vec<Vec<String>> {
        self.fees.to_rows()
    }
}
