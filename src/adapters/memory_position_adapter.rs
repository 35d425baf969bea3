//! In-memory position store and security resolver.
//!
//! Stand-in for the external quote/position store: per-security holdings
//! and cost basis for the cash and margin books, plus a last-known price
//! for market valuation. Used by replay, the CLI, and tests.

use std::collections::HashMap;
use tracing::info;

use crate::ports::position_port::{Book, PositionStore};
use crate::ports::resolver_port::{Security, SecurityResolver};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BookPosition {
    count: i64,
    paid: f64,
}

impl BookPosition {
    fn average_cost(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.paid / self.count as f64
        }
    }
}

#[derive(Debug)]
struct Entry {
    security: Security,
    cash: BookPosition,
    margin: BookPosition,
    price: f64,
}

/// Position store keyed by ISIN. Prices are single-currency; the currency
/// argument of `market_value` is accepted and ignored (conversion is an
/// external concern).
#[derive(Debug, Default)]
pub struct MemoryPositionStore {
    entries: HashMap<String, Entry>,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a security so label resolution can find it.
    pub fn insert_security(&mut self, security: Security) {
        self.entries.insert(
            security.isin.clone(),
            Entry {
                security,
                cash: BookPosition::default(),
                margin: BookPosition::default(),
                price: 0.0,
            },
        );
    }

    pub fn set_price(&mut self, isin: &str, price: f64) {
        if let Some(entry) = self.entries.get_mut(isin) {
            entry.price = price;
        }
    }

    fn entry_or_create(&mut self, isin: &str) -> &mut Entry {
        self.entries.entry(isin.to_string()).or_insert_with(|| Entry {
            security: Security {
                ticker: String::new(),
                isin: isin.to_string(),
                name: isin.to_string(),
            },
            cash: BookPosition::default(),
            margin: BookPosition::default(),
            price: 0.0,
        })
    }

    fn book(entry: &Entry, book: Book) -> &BookPosition {
        match book {
            Book::Cash => &entry.cash,
            Book::Margin => &entry.margin,
        }
    }

    fn book_mut(entry: &mut Entry, book: Book) -> &mut BookPosition {
        match book {
            Book::Cash => &mut entry.cash,
            Book::Margin => &mut entry.margin,
        }
    }
}

impl PositionStore for MemoryPositionStore {
    fn buy(&mut self, isin: &str, count: i64, amount: f64, book: Book) {
        let entry = self.entry_or_create(isin);
        let position = Self::book_mut(entry, book);
        position.count += count;
        position.paid += amount;
    }

    fn sell(&mut self, isin: &str, count: i64, book: Book) -> i64 {
        let entry = self.entry_or_create(isin);
        let position = Self::book_mut(entry, book);
        let actual = count.min(position.count).max(0);
        position.paid -= position.average_cost() * actual as f64;
        position.count -= actual;
        actual
    }

    fn transfer_to(&mut self, isin: &str, count: i64, expenses: f64, book: Book) {
        let source_book = match book {
            Book::Cash => Book::Margin,
            Book::Margin => Book::Cash,
        };
        let entry = self.entry_or_create(isin);

        let source = Self::book_mut(entry, source_book);
        let actual = count.min(source.count).max(0);
        if actual < count {
            info!(isin, requested = count, available = actual, "transfer clamped");
        }
        let moved_cost = source.average_cost() * actual as f64;
        source.count -= actual;
        source.paid -= moved_cost;

        let target = Self::book_mut(entry, book);
        target.count += actual;
        target.paid += moved_cost + expenses;
    }

    fn holding(&self, isin: &str, book: Book) -> i64 {
        self.entries
            .get(isin)
            .map(|entry| Self::book(entry, book).count)
            .unwrap_or(0)
    }

    fn average_cost(&self, isin: &str, book: Book) -> f64 {
        self.entries
            .get(isin)
            .map(|entry| Self::book(entry, book).average_cost())
            .unwrap_or(0.0)
    }

    fn cost_basis(&self, isin: &str, book: Book) -> f64 {
        self.entries
            .get(isin)
            .map(|entry| Self::book(entry, book).paid)
            .unwrap_or(0.0)
    }

    fn market_value(&self, isin: &str, _currency: &str, book: Book) -> f64 {
        self.entries
            .get(isin)
            .map(|entry| Self::book(entry, book).count as f64 * entry.price)
            .unwrap_or(0.0)
    }

    fn traded(&self) -> Vec<String> {
        let mut isins: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                entry.cash != BookPosition::default() || entry.margin != BookPosition::default()
            })
            .map(|(isin, _)| isin.clone())
            .collect();
        isins.sort();
        isins
    }
}

impl SecurityResolver for MemoryPositionStore {
    fn lookup_by_ticker(&self, label: &str) -> Option<Security> {
        self.entries
            .values()
            .find(|entry| !entry.security.ticker.is_empty() && entry.security.ticker == label)
            .map(|entry| entry.security.clone())
    }

    fn lookup_by_isin(&self, label: &str) -> Option<Security> {
        self.entries.get(label).map(|entry| entry.security.clone())
    }
}
