#![allow(dead_code)]

use chrono::NaiveDate;
use foliotrack::adapters::memory_position_adapter::MemoryPositionStore;
use foliotrack::domain::operation::RawOperation;
use foliotrack::ports::resolver_port::Security;

pub const ACME_ISIN: &str = "FR0000000001";
pub const GLOBEX_ISIN: &str = "FR0000000002";

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn acme() -> Security {
    Security {
        ticker: "ACME".into(),
        isin: ACME_ISIN.into(),
        name: "Acme Industries".into(),
    }
}

pub fn globex() -> Security {
    Security {
        ticker: "GLBX".into(),
        isin: GLOBEX_ISIN.into(),
        name: "Globex Corporation".into(),
    }
}

/// A position store knowing both sample securities.
pub fn sample_store() -> MemoryPositionStore {
    let mut store = MemoryPositionStore::new();
    store.insert_security(acme());
    store.insert_security(globex());
    store
}

pub fn raw_op(
    date: &str,
    kind: &str,
    label: &str,
    value: &str,
    expenses: &str,
    count: &str,
) -> RawOperation {
    RawOperation {
        date: date.to_string(),
        kind: kind.to_string(),
        label: label.to_string(),
        value: value.to_string(),
        expenses: expenses.to_string(),
        count: count.to_string(),
        vat: None,
    }
}

pub fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
    raw.iter()
        .map(|row| row.iter().map(|s| s.to_string()).collect())
        .collect()
}
