//! A single ledger entry and its position-store effect.
//!
//! Operations are constructed from the raw fields of a persisted row plus a
//! ledger-assigned ref. The security label resolves once at construction
//! (ticker, then ISIN, then kept as a raw label) and is never re-attempted.
//! Apply/undo dispatch goes through one table of function pairs keyed by
//! kind.

use chrono::{Datelike, NaiveDate};
use std::fmt;
use tracing::{debug, info};

use super::error::FolioError;
use super::kind::{OperationKind, Sign};
use crate::ports::position_port::{Book, PositionStore};
use crate::ports::resolver_port::{Security, SecurityResolver};

/// Raw string fields of a persisted operation row:
/// `date;kind;label;value;expenses;count[;vat]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOperation {
    pub date: String,
    pub kind: String,
    pub label: String,
    pub value: String,
    pub expenses: String,
    pub count: String,
    pub vat: Option<String>,
}

impl RawOperation {
    /// Split a delimited row into raw fields. `None` when the row has
    /// fewer than the six mandatory fields.
    pub fn from_fields(fields: &[String]) -> Option<Self> {
        if fields.len() < 6 {
            return None;
        }
        Some(RawOperation {
            date: fields[0].clone(),
            kind: fields[1].clone(),
            label: fields[2].clone(),
            value: fields[3].clone(),
            expenses: fields[4].clone(),
            count: fields[5].clone(),
            vat: fields.get(6).cloned(),
        })
    }
}

/// Parse a persisted date. Two accepted layouts, distinguished by whether
/// the fifth character is a separator: `YYYY-MM-DD` or the legacy compact
/// `YYYYMMDD` digit run.
pub fn parse_record_date(s: &str) -> Result<NaiveDate, FolioError> {
    let malformed = || FolioError::MalformedRecord {
        reason: format!("unparseable date '{s}'"),
    };
    if s.as_bytes().get(4) == Some(&b'-') {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| malformed())
    } else {
        if s.len() < 8 || !s.as_bytes()[..8].iter().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let year: i32 = s[0..4].parse().map_err(|_| malformed())?;
        let month: u32 = s[4..6].parse().map_err(|_| malformed())?;
        let day: u32 = s[6..8].parse().map_err(|_| malformed())?;
        NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)
    }
}

fn parse_f64(s: &str, field: &str) -> Result<f64, FolioError> {
    s.trim().parse().map_err(|_| FolioError::MalformedRecord {
        reason: format!("invalid {field} '{s}'"),
    })
}

fn parse_i64(s: &str, field: &str) -> Result<i64, FolioError> {
    s.trim().parse().map_err(|_| FolioError::MalformedRecord {
        reason: format!("invalid {field} '{s}'"),
    })
}

/// One immutable(ish) ledger entry.
///
/// The only permitted post-construction mutations are [`set_kind`] and
/// [`set_date`], reserved for correcting misclassified legacy rows, and
/// the sell-clamp writeback performed by [`apply`].
///
/// [`set_kind`]: Operation::set_kind
/// [`set_date`]: Operation::set_date
/// [`apply`]: Operation::apply
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    date: NaiveDate,
    kind: OperationKind,
    security: Option<Security>,
    label: String,
    value: f64,
    expenses: f64,
    count: i64,
    vat: f64,
    op_ref: u64,
}

impl Operation {
    /// Build an operation from raw persisted fields. The VAT rate falls
    /// back to `default_vat` when the row has no seventh field.
    pub fn new(
        raw: &RawOperation,
        default_vat: f64,
        op_ref: u64,
        resolver: &dyn SecurityResolver,
    ) -> Result<Self, FolioError> {
        let date = parse_record_date(&raw.date)?;
        let kind = OperationKind::from_code(&raw.kind);
        let value = parse_f64(&raw.value, "value")?;
        let expenses = parse_f64(&raw.expenses, "expenses")?;
        let count = parse_i64(&raw.count, "share count")?;
        let vat = match &raw.vat {
            Some(v) => parse_f64(v, "vat rate")?,
            None => default_vat,
        };

        // Fallback chain: ticker, then ISIN, then keep the raw label.
        let (security, label) = if kind.references_security() {
            match resolver
                .lookup_by_ticker(&raw.label)
                .or_else(|| resolver.lookup_by_isin(&raw.label))
            {
                Some(sec) => {
                    let name = sec.name.clone();
                    (Some(sec), name)
                }
                None => (None, raw.label.clone()),
            }
        } else {
            (None, raw.label.clone())
        };

        Ok(Operation {
            date,
            kind,
            security,
            label,
            value,
            expenses,
            count,
            vat,
            op_ref,
        })
    }

    pub fn op_ref(&self) -> u64 {
        self.op_ref
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    /// Correct a misclassified legacy row.
    pub fn set_kind(&mut self, kind: OperationKind) {
        self.kind = kind;
    }

    /// Correct a misdated legacy row.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    /// Display name: the resolved security name, or the raw label.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn expenses(&self) -> f64 {
        self.expenses
    }

    pub fn vat(&self) -> f64 {
        self.vat
    }

    pub fn sign(&self) -> Sign {
        self.kind.sign()
    }

    /// Share count, zero for kinds that carry none.
    pub fn count(&self) -> i64 {
        if self.kind.has_share_count() {
            self.count
        } else {
            0
        }
    }

    /// The resolved security handle.
    ///
    /// Errors with [`FolioError::NotASecurityOperation`] on cash-only
    /// kinds; `Ok(None)` for a security kind whose label never resolved.
    pub fn security(&self) -> Result<Option<&Security>, FolioError> {
        if self.kind.references_security() {
            Ok(self.security.as_ref())
        } else {
            Err(FolioError::NotASecurityOperation {
                kind: self.kind.code().to_string(),
            })
        }
    }

    /// `label (isin)` for resolved securities, the bare label otherwise.
    pub fn description(&self) -> String {
        match &self.security {
            Some(sec) => format!("{} ({})", self.label, sec.isin),
            None => self.label.clone(),
        }
    }

    /// Realized gain against the average cost of the traded book.
    /// Defined only for sells; zero for every other kind.
    pub fn profit_on_sale(&self, store: &dyn PositionStore) -> f64 {
        let book = match self.kind {
            OperationKind::Sell => Book::Cash,
            OperationKind::SellMargin => Book::Margin,
            _ => return 0.0,
        };
        match &self.security {
            Some(sec) => self.value - store.average_cost(&sec.isin, book) * self.count as f64,
            None => 0.0,
        }
    }

    /// Replay this operation's effect against the position store.
    /// A no-op for bookkeeping kinds and for unresolved securities.
    pub fn apply(&mut self, store: &mut dyn PositionStore) {
        if let Some((apply, _)) = position_effect(&self.kind) {
            debug!(op_ref = self.op_ref, kind = %self.kind, "apply");
            apply(self, store);
        }
    }

    /// Reverse this operation's effect. After a clamped sell the stored
    /// (clamped) count is used, not the originally requested one, so the
    /// pair is not a perfect inverse.
    pub fn undo(&self, store: &mut dyn PositionStore) {
        if let Some((_, undo)) = position_effect(&self.kind) {
            debug!(op_ref = self.op_ref, kind = %self.kind, "undo");
            undo(self, store);
        }
    }

    /// Persisted row: `date;kind;isin-or-label;value;expenses;count[;vat]`.
    pub fn to_row(&self) -> Vec<String> {
        let label = match &self.security {
            Some(sec) => sec.isin.clone(),
            None => self.label.clone(),
        };
        vec![
            self.date.format("%Y-%m-%d").to_string(),
            self.kind.code().to_string(),
            label,
            self.value.to_string(),
            self.expenses.to_string(),
            self.count.to_string(),
            self.vat.to_string(),
        ]
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_row().join(";"))
    }
}

type ApplyFn = fn(&mut Operation, &mut dyn PositionStore);
type UndoFn = fn(&Operation, &mut dyn PositionStore);

/// The position-store mutation pair for a kind, or `None` for pure
/// cash/ledger bookkeeping kinds.
fn position_effect(kind: &OperationKind) -> Option<(ApplyFn, UndoFn)> {
    use OperationKind::*;
    match kind {
        Buy => Some((apply_buy, undo_buy)),
        Sell => Some((apply_sell, undo_sell)),
        BuyMargin => Some((apply_buy_margin, undo_buy_margin)),
        SellMargin => Some((apply_sell_margin, undo_sell_margin)),
        DividendShares => Some((apply_dividend_shares, undo_share_grant)),
        RegisterShares => Some((apply_register_shares, undo_share_grant)),
        CouponDetach => Some((apply_detach, undo_detach)),
        MarginLiquidation => Some((apply_liquidation, undo_liquidation)),
        Credit | Debit | Fee | Interest | Split | DividendCash | Unknown(_) => None,
    }
}

/// Clamp the requested count to the available holding, write the clamped
/// count back into the operation, then sell. Selling more than held sells
/// everything.
fn clamped_sell(op: &mut Operation, store: &mut dyn PositionStore, book: Book) {
    let Some(sec) = op.security.clone() else {
        return;
    };
    let held = store.holding(&sec.isin, book);
    if op.count > held {
        info!(
            security = %sec.isin,
            requested = op.count,
            available = held,
            "sell clamped to available holding"
        );
        op.count = held;
    }
    store.sell(&sec.isin, op.count, book);
}

fn apply_buy(op: &mut Operation, store: &mut dyn PositionStore) {
    if let Some(sec) = &op.security {
        store.buy(&sec.isin, op.count, op.value, Book::Cash);
    }
}

fn undo_buy(op: &Operation, store: &mut dyn PositionStore) {
    if let Some(sec) = &op.security {
        store.sell(&sec.isin, op.count, Book::Cash);
    }
}

fn apply_sell(op: &mut Operation, store: &mut dyn PositionStore) {
    clamped_sell(op, store, Book::Cash);
}

fn undo_sell(op: &Operation, store: &mut dyn PositionStore) {
    if let Some(sec) = &op.security {
        store.buy(&sec.isin, op.count, op.value, Book::Cash);
    }
}

fn apply_buy_margin(op: &mut Operation, store: &mut dyn PositionStore) {
    if let Some(sec) = &op.security {
        store.buy(&sec.isin, op.count, op.value, Book::Margin);
    }
}

fn undo_buy_margin(op: &Operation, store: &mut dyn PositionStore) {
    if let Some(sec) = &op.security {
        store.sell(&sec.isin, op.count, Book::Margin);
    }
}

fn apply_sell_margin(op: &mut Operation, store: &mut dyn PositionStore) {
    clamped_sell(op, store, Book::Margin);
}

fn undo_sell_margin(op: &Operation, store: &mut dyn PositionStore) {
    if let Some(sec) = &op.security {
        store.buy(&sec.isin, op.count, op.value, Book::Margin);
    }
}

fn apply_dividend_shares(op: &mut Operation, store: &mut dyn PositionStore) {
    if let Some(sec) = &op.security {
        store.buy(&sec.isin, op.count, 0.0, Book::Cash);
    }
}

fn apply_register_shares(op: &mut Operation, store: &mut dyn PositionStore) {
    if let Some(sec) = &op.security {
        store.buy(&sec.isin, op.count, op.value, Book::Cash);
    }
}

fn undo_share_grant(op: &Operation, store: &mut dyn PositionStore) {
    if let Some(sec) = &op.security {
        store.sell(&sec.isin, op.count, Book::Cash);
    }
}

fn apply_detach(op: &mut Operation, store: &mut dyn PositionStore) {
    if let Some(sec) = &op.security {
        store.buy(&sec.isin, 0, -op.value, Book::Cash);
    }
}

fn undo_detach(op: &Operation, store: &mut dyn PositionStore) {
    if let Some(sec) = &op.security {
        store.buy(&sec.isin, 0, op.value, Book::Cash);
    }
}

fn apply_liquidation(op: &mut Operation, store: &mut dyn PositionStore) {
    if let Some(sec) = &op.security {
        store.transfer_to(&sec.isin, op.count, op.expenses, Book::Cash);
    }
}

fn undo_liquidation(op: &Operation, store: &mut dyn PositionStore) {
    if let Some(sec) = &op.security {
        store.transfer_to(&sec.isin, op.count, op.expenses, Book::Margin);
    }
}
