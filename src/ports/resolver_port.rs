//! Security label resolution port.

/// Resolved security handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Security {
    pub ticker: String,
    pub isin: String,
    pub name: String,
}

/// Resolves the free-form security label of a persisted row. Operations
/// try the ticker first, then the ISIN, then keep the raw label unresolved.
pub trait SecurityResolver {
    fn lookup_by_ticker(&self, label: &str) -> Option<Security>;
    fn lookup_by_isin(&self, label: &str) -> Option<Security>;
}
