//! Position store port.
//!
//! The quote/position store owns per-security holdings and average cost for
//! two books per security. The ledger's apply/undo path is the only mutator;
//! callers sharing one store across ledgers must serialize access.

/// Position sub-account per security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Book {
    /// Cash-settled holdings.
    Cash,
    /// Margin/credit-settled holdings.
    Margin,
}

/// External store of per-security positions, keyed by ISIN.
pub trait PositionStore {
    /// Add `count` shares bought for a total of `amount` to a book.
    /// `count` may be zero with a negative `amount` for pure cost-basis
    /// adjustments (coupon detachment).
    fn buy(&mut self, isin: &str, count: i64, amount: f64, book: Book);

    /// Remove up to `count` shares from a book; returns the count actually
    /// sold (never more than held).
    fn sell(&mut self, isin: &str, count: i64, book: Book) -> i64;

    /// Settle `count` shares into `book` from the opposite book, adding
    /// `expenses` to the destination cost basis (margin liquidation).
    fn transfer_to(&mut self, isin: &str, count: i64, expenses: f64, book: Book);

    /// Shares currently held in a book.
    fn holding(&self, isin: &str, book: Book) -> i64;

    /// Average cost per share in a book (0.0 when nothing is held).
    fn average_cost(&self, isin: &str, book: Book) -> f64;

    /// Total amount paid for the holding in a book.
    fn cost_basis(&self, isin: &str, book: Book) -> f64;

    /// Current market value of the holding in a book, in `currency`.
    fn market_value(&self, isin: &str, currency: &str, book: Book) -> f64;

    /// ISINs of every security with activity in either book.
    fn traded(&self) -> Vec<String>;
}
