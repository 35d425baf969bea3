//! Domain error types.

/// Top-level error type for foliotrack.
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    /// A persisted row could not be parsed. Loaders skip the offending row
    /// and keep loading; this only propagates when a single record is
    /// parsed directly.
    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },

    /// An operation whose kind is outside the closed set reached the
    /// aggregation pass. Fatal: skipping it would silently corrupt the
    /// running balances.
    #[error("unknown operation kind '{code}' (operation ref {op_ref})")]
    UnknownOperationKind { code: String, op_ref: u64 },

    /// A security-only accessor was called on a cash-only operation.
    /// A programming-contract violation, not a data error.
    #[error("operation kind '{kind}' does not reference a security")]
    NotASecurityOperation { kind: String },

    #[error("no operation with ref {0}")]
    NoSuchOperation(u64),

    #[error("portfolio '{0}' not found")]
    PortfolioNotFound(String),

    #[error("portfolio '{0}' already exists")]
    PortfolioExists(String),

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("record codec error in {file}: {reason}")]
    Codec { file: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&FolioError> for std::process::ExitCode {
    fn from(err: &FolioError) -> Self {
        let code: u8 = match err {
            FolioError::Io(_) => 1,
            FolioError::ConfigParse { .. } => 2,
            FolioError::MalformedRecord { .. } | FolioError::Codec { .. } => 3,
            FolioError::UnknownOperationKind { .. }
            | FolioError::NotASecurityOperation { .. }
            | FolioError::NoSuchOperation(_) => 4,
            FolioError::PortfolioNotFound(_) | FolioError::PortfolioExists(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
