//! Keyed collection of portfolios: lifecycle, on-disk artifact set, and
//! default-selection bookkeeping.
//!
//! Each portfolio owns five artifact files in the user-data directory,
//! named `<fileKey>.<kind>.txt`. Remove and rename touch each artifact
//! independently and best-effort: a missing file is not an error, so both
//! operations are idempotent.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::error::FolioError;
use super::portfolio::{Portfolio, TaxRules, DEFAULT_CURRENCY, DEFAULT_VAT};
use crate::ports::position_port::PositionStore;
use crate::ports::record_port::RecordPort;
use crate::ports::resolver_port::SecurityResolver;

/// Artifact kinds persisted per portfolio.
pub const ARTIFACT_KINDS: [&str; 5] = ["properties", "operations", "matrix", "fees", "stops"];

/// Registry file: one row per portfolio.
pub const REGISTRY_FILE: &str = "portfolio.txt";

/// Default-portfolio selection file: a single one-field row.
pub const DEFAULT_SELECTION_FILE: &str = "default.txt";

pub const DEFAULT_FILE_KEY: &str = "default";
pub const DEFAULT_MARKET: &str = "EURONEXT";

#[derive(Debug)]
pub struct PortfolioRegistry {
    portfolios: HashMap<String, Portfolio>,
    user_data_dir: PathBuf,
    tax_rules: TaxRules,
}

impl PortfolioRegistry {
    pub fn new(user_data_dir: impl Into<PathBuf>) -> Self {
        Self::with_tax_rules(user_data_dir, TaxRules::default())
    }

    /// Tax rules are stamped onto every portfolio this registry creates.
    pub fn with_tax_rules(user_data_dir: impl Into<PathBuf>, tax_rules: TaxRules) -> Self {
        PortfolioRegistry {
            portfolios: HashMap::new(),
            user_data_dir: user_data_dir.into(),
            tax_rules,
        }
    }

    pub fn user_data_dir(&self) -> &Path {
        &self.user_data_dir
    }

    pub fn artifact_path(&self, file_key: &str, kind: &str) -> PathBuf {
        self.user_data_dir.join(format!("{file_key}.{kind}.txt"))
    }

    pub fn contains(&self, file_key: &str) -> bool {
        self.portfolios.contains_key(file_key)
    }

    pub fn get(&self, file_key: &str) -> Option<&Portfolio> {
        self.portfolios.get(file_key)
    }

    pub fn get_mut(&mut self, file_key: &str) -> Option<&mut Portfolio> {
        self.portfolios.get_mut(file_key)
    }

    /// All portfolios, ordered by file key for deterministic output.
    pub fn list(&self) -> Vec<&Portfolio> {
        let mut all: Vec<&Portfolio> = self.portfolios.values().collect();
        all.sort_by_key(|p| p.file_key().to_string());
        all
    }

    pub fn len(&self) -> usize {
        self.portfolios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty()
    }

    /// Create a portfolio under a new key.
    pub fn add(
        &mut self,
        file_key: &str,
        display_name: &str,
        account_ref: &str,
        market: &str,
        currency: &str,
        vat: f64,
    ) -> Result<&mut Portfolio, FolioError> {
        if self.portfolios.contains_key(file_key) {
            return Err(FolioError::PortfolioExists(file_key.to_string()));
        }
        let mut portfolio =
            Portfolio::new(file_key, display_name, account_ref, market, currency, vat);
        portfolio.set_tax_rules(self.tax_rules);
        Ok(self
            .portfolios
            .entry(file_key.to_string())
            .or_insert(portfolio))
    }

    /// Replace a portfolio's identity in place. The ledger and fee
    /// schedule start fresh, as on first creation.
    pub fn edit(
        &mut self,
        file_key: &str,
        display_name: &str,
        account_ref: &str,
        market: &str,
        currency: &str,
        vat: f64,
    ) -> Result<&mut Portfolio, FolioError> {
        if !self.portfolios.contains_key(file_key) {
            return Err(FolioError::PortfolioNotFound(file_key.to_string()));
        }
        let mut portfolio =
            Portfolio::new(file_key, display_name, account_ref, market, currency, vat);
        portfolio.set_tax_rules(self.tax_rules);
        self.portfolios.insert(file_key.to_string(), portfolio);
        Ok(self.portfolios.get_mut(file_key).expect("just inserted"))
    }

    /// Remove a portfolio and delete its artifact files, each deletion
    /// independently best-effort. Returns whether the key existed.
    pub fn remove(&mut self, file_key: &str) -> bool {
        if self.portfolios.remove(file_key).is_none() {
            return false;
        }
        for kind in ARTIFACT_KINDS {
            let path = self.artifact_path(file_key, kind);
            if let Err(err) = fs::remove_file(&path) {
                debug!(path = %path.display(), %err, "artifact not deleted");
            }
        }
        true
    }

    /// Rename a portfolio: move every artifact file (best-effort, missing
    /// files tolerated), then swap the registry key and the portfolio's
    /// own storage key together.
    pub fn rename(&mut self, file_key: &str, new_key: &str) -> Result<(), FolioError> {
        if !self.portfolios.contains_key(file_key) {
            return Err(FolioError::PortfolioNotFound(file_key.to_string()));
        }
        if self.portfolios.contains_key(new_key) {
            return Err(FolioError::PortfolioExists(new_key.to_string()));
        }
        for kind in ARTIFACT_KINDS {
            let from = self.artifact_path(file_key, kind);
            let to = self.artifact_path(new_key, kind);
            if let Err(err) = fs::rename(&from, &to) {
                debug!(from = %from.display(), %err, "artifact not renamed");
            }
        }
        let mut portfolio = self.portfolios.remove(file_key).expect("checked above");
        portfolio.set_file_key(new_key);
        self.portfolios.insert(new_key.to_string(), portfolio);
        Ok(())
    }

    // --- registry persistence ---

    /// Load the registry file. Legacy rows may omit currency and VAT;
    /// short or duplicate rows are skipped with a warning.
    pub fn load(&mut self, records: &dyn RecordPort) -> Result<(), FolioError> {
        let path = self.user_data_dir.join(REGISTRY_FILE);
        for row in records.read_rows(&path)? {
            if row.len() < 4 {
                warn!(fields = row.len(), "skipping short registry row");
                continue;
            }
            let currency = row.get(4).map(String::as_str).unwrap_or(DEFAULT_CURRENCY);
            let vat = match row.get(5) {
                Some(raw) => match raw.trim().parse() {
                    Ok(vat) => vat,
                    Err(_) => {
                        warn!(raw, "skipping registry row with bad VAT rate");
                        continue;
                    }
                },
                None => DEFAULT_VAT,
            };
            if let Err(err) = self.add(&row[0], &row[1], &row[2], &row[3], currency, vat) {
                warn!(%err, "skipping registry row");
            }
        }
        Ok(())
    }

    pub fn save(&self, records: &dyn RecordPort) -> Result<(), FolioError> {
        let path = self.user_data_dir.join(REGISTRY_FILE);
        let rows: Vec<Vec<String>> = self.list().iter().map(|p| p.properties_row()).collect();
        records.write_rows(&path, &rows)
    }

    // --- default-selection bookkeeping ---

    /// The persisted default portfolio key, if any.
    pub fn default_key(&self, records: &dyn RecordPort) -> Result<Option<String>, FolioError> {
        let path = self.user_data_dir.join(DEFAULT_SELECTION_FILE);
        let rows = records.read_rows(&path)?;
        Ok(rows
            .first()
            .and_then(|row| row.first())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty()))
    }

    pub fn set_default_key(&self, records: &dyn RecordPort, key: &str) -> Result<(), FolioError> {
        let path = self.user_data_dir.join(DEFAULT_SELECTION_FILE);
        records.write_rows(&path, &[vec![key.to_string()]])
    }

    // --- portfolio orchestration ---

    /// Load a portfolio's persisted state and replay it: operations are
    /// loaded (malformed rows skipped), applied against the position
    /// store, then fee rules are loaded. A missing key is created with
    /// defaults, and the key is recorded as the new default selection.
    pub fn load_portfolio(
        &mut self,
        file_key: &str,
        records: &dyn RecordPort,
        resolver: &dyn SecurityResolver,
        store: &mut dyn PositionStore,
    ) -> Result<&Portfolio, FolioError> {
        if !self.contains(file_key) {
            debug!(file_key, "portfolio does not exist, creating it");
            self.add(
                file_key,
                file_key,
                "",
                DEFAULT_MARKET,
                DEFAULT_CURRENCY,
                DEFAULT_VAT,
            )?;
        }

        let operations = records.read_rows(&self.artifact_path(file_key, "operations"))?;
        let fees = records.read_rows(&self.artifact_path(file_key, "fees"))?;

        let portfolio = self.portfolios.get_mut(file_key).expect("created above");
        portfolio.load_operations(&operations, resolver, store);
        portfolio.apply_operations(store, None);
        portfolio.load_fee_rules(&fees);

        self.set_default_key(records, file_key)?;
        Ok(self.portfolios.get(file_key).expect("created above"))
    }

    /// Persist a portfolio's operations and fee rules.
    pub fn save_portfolio(
        &self,
        file_key: &str,
        records: &dyn RecordPort,
    ) -> Result<(), FolioError> {
        let portfolio = self
            .get(file_key)
            .ok_or_else(|| FolioError::PortfolioNotFound(file_key.to_string()))?;
        records.write_rows(
            &self.artifact_path(file_key, "operations"),
            &portfolio.operations_rows(),
        )?;
        records.write_rows(&self.artifact_path(file_key, "fees"), &portfolio.fee_rows())
    }
}
