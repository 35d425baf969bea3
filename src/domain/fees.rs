//! Banded fee rules for trading-cost lookup.
//!
//! A schedule is an ordered sequence of rules; lookup is first-match-wins
//! over inclusive bands; a later rule overlapping an earlier one is never
//! consulted for the overlap.

use tracing::warn;

use super::error::FolioError;

/// One fee band: a flat amount or a percentage over an inclusive
/// `[band_min, band_max]` range of trade values.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeRule {
    fee: f64,
    band_min: f64,
    band_max: f64,
    percent: bool,
    rule_ref: u64,
}

impl FeeRule {
    pub fn rule_ref(&self) -> u64 {
        self.rule_ref
    }

    pub fn is_percent(&self) -> bool {
        self.percent
    }

    pub fn band(&self) -> (f64, f64) {
        (self.band_min, self.band_max)
    }

    /// The fee for a trade value, or `None` when the value falls outside
    /// the band. A matching percentage rule can legitimately compute 0.0;
    /// that is still `Some`, distinct from "no rule applies".
    pub fn fee_for(&self, value: f64) -> Option<f64> {
        if value >= self.band_min && value <= self.band_max {
            if self.percent {
                Some(value * self.fee / 100.0)
            } else {
                Some(self.fee)
            }
        } else {
            None
        }
    }

    /// Persisted row: `fee[%];min;max`.
    pub fn to_row(&self) -> Vec<String> {
        let fee = if self.percent {
            format!("{}%", self.fee)
        } else {
            self.fee.to_string()
        };
        vec![fee, self.band_min.to_string(), self.band_max.to_string()]
    }
}

/// Ordered fee rules for one portfolio.
#[derive(Debug, Default)]
pub struct FeeSchedule {
    rules: Vec<FeeRule>,
    next_ref: u64,
}

impl FeeSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and append a rule. The fee field is a bare number (flat) or
    /// a number followed by `%` (percentage). Returns the rule's ref.
    pub fn add_rule(&mut self, fee: &str, band_min: &str, band_max: &str) -> Result<u64, FolioError> {
        let fee = fee.trim();
        let (fee_text, percent) = match fee.strip_suffix('%') {
            Some(stripped) => (stripped, true),
            None => (fee, false),
        };
        let parse = |s: &str, field: &str| -> Result<f64, FolioError> {
            s.trim().parse().map_err(|_| FolioError::MalformedRecord {
                reason: format!("invalid fee rule {field} '{s}'"),
            })
        };
        let rule = FeeRule {
            fee: parse(fee_text, "fee")?,
            band_min: parse(band_min, "band minimum")?,
            band_max: parse(band_max, "band maximum")?,
            percent,
            rule_ref: self.next_ref,
        };
        self.rules.push(rule);
        self.next_ref += 1;
        Ok(self.next_ref - 1)
    }

    /// Remove a rule by ref; refs are never renumbered. Returns whether a
    /// rule was removed.
    pub fn remove_rule(&mut self, rule_ref: u64) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.rule_ref != rule_ref);
        self.rules.len() != before
    }

    pub fn rule(&self, rule_ref: u64) -> Option<&FeeRule> {
        self.rules.iter().find(|r| r.rule_ref == rule_ref)
    }

    pub fn rules(&self) -> &[FeeRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The fee for a trade value from the first rule whose band contains
    /// it (first-match-wins, not best-match), or `None` when no band
    /// matches. `Some(0.0)` means a rule matched and computed zero.
    pub fn lookup(&self, value: f64) -> Option<f64> {
        self.rules.iter().find_map(|rule| rule.fee_for(value))
    }

    /// Load persisted rows, skipping malformed ones.
    pub fn load_rows(&mut self, rows: &[Vec<String>]) -> usize {
        let mut loaded = 0;
        for row in rows {
            if row.len() < 3 {
                warn!(fields = row.len(), "skipping short fee rule row");
                continue;
            }
            match self.add_rule(&row[0], &row[1], &row[2]) {
                Ok(_) => loaded += 1,
                Err(err) => warn!(%err, "skipping malformed fee rule row"),
            }
        }
        loaded
    }

    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.rules.iter().map(FeeRule::to_row).collect()
    }
}
