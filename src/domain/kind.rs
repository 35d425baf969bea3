//! Operation kind classification.
//!
//! Each kind carries a fixed attribute record (cash movement, security
//! reference, share count, taxable inclusion, position effect, margin
//! account, display sign). The persisted format uses one-character codes
//! inherited from the legacy data files; a code outside the closed set
//! loads as [`OperationKind::Unknown`] with safe defaults so one corrupt
//! row cannot abort loading a whole ledger.

use std::fmt;

/// Display sign of an operation amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Money in (+).
    Credit,
    /// Money out (-).
    Debit,
    /// No cash direction (split, dividend paid in shares).
    Neutral,
    /// Share registration (~).
    Register,
    /// Unrecognized kind (?).
    Unknown,
}

impl Sign {
    pub fn as_char(self) -> char {
        match self {
            Sign::Credit => '+',
            Sign::Debit => '-',
            Sign::Neutral => ' ',
            Sign::Register => '~',
            Sign::Unknown => '?',
        }
    }
}

/// Fixed per-kind attribute record, invariant for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindTraits {
    /// Pure cash deposit/withdrawal (credit, debit).
    pub cash_movement: bool,
    /// The operation references a security and resolves its label.
    pub references_security: bool,
    /// The share count field is meaningful for this kind.
    pub has_share_count: bool,
    /// Included in the taxable base.
    pub taxable: bool,
    /// Replay mutates the position store for this kind.
    pub applies_to_position: bool,
    /// Trades against the margin (credit-settled) book.
    pub margin_account: bool,
    pub sign: Sign,
}

const UNKNOWN_TRAITS: KindTraits = KindTraits {
    cash_movement: false,
    references_security: false,
    has_share_count: false,
    taxable: false,
    applies_to_position: false,
    margin_account: false,
    sign: Sign::Unknown,
};

/// Kind of a ledger operation. Closed set plus an [`Unknown`] carrier for
/// codes found in corrupt persisted rows.
///
/// [`Unknown`]: OperationKind::Unknown
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Buy,
    BuyMargin,
    Sell,
    SellMargin,
    Credit,
    Debit,
    Fee,
    Interest,
    Split,
    CouponDetach,
    DividendCash,
    MarginLiquidation,
    DividendShares,
    RegisterShares,
    /// Unrecognized persisted code, kept verbatim for round-tripping.
    Unknown(String),
}

impl OperationKind {
    /// Parse a persisted one-character code. Never fails: unrecognized
    /// codes become [`OperationKind::Unknown`].
    pub fn from_code(code: &str) -> Self {
        match code {
            "B" => OperationKind::Buy,
            "A" => OperationKind::BuyMargin,
            "S" => OperationKind::Sell,
            "R" => OperationKind::SellMargin,
            "C" => OperationKind::Credit,
            "D" => OperationKind::Debit,
            "F" => OperationKind::Fee,
            "I" => OperationKind::Interest,
            "X" => OperationKind::Split,
            "Y" => OperationKind::CouponDetach,
            "Z" => OperationKind::DividendCash,
            "L" => OperationKind::MarginLiquidation,
            "Q" => OperationKind::DividendShares,
            "W" => OperationKind::RegisterShares,
            other => OperationKind::Unknown(other.to_string()),
        }
    }

    /// The persisted code for this kind.
    pub fn code(&self) -> &str {
        match self {
            OperationKind::Buy => "B",
            OperationKind::BuyMargin => "A",
            OperationKind::Sell => "S",
            OperationKind::SellMargin => "R",
            OperationKind::Credit => "C",
            OperationKind::Debit => "D",
            OperationKind::Fee => "F",
            OperationKind::Interest => "I",
            OperationKind::Split => "X",
            OperationKind::CouponDetach => "Y",
            OperationKind::DividendCash => "Z",
            OperationKind::MarginLiquidation => "L",
            OperationKind::DividendShares => "Q",
            OperationKind::RegisterShares => "W",
            OperationKind::Unknown(raw) => raw,
        }
    }

    /// The fixed attribute record for this kind.
    pub fn traits(&self) -> KindTraits {
        use OperationKind::*;
        use Sign::*;

        // One exhaustive table; the compiler checks the closed set.
        let (cash, security, count, taxable, applies, margin, sign) = match self {
            Buy => (false, true, true, true, true, false, Sign::Debit),
            BuyMargin => (false, true, true, true, true, true, Sign::Debit),
            Sell => (false, true, true, true, true, false, Sign::Credit),
            SellMargin => (false, true, true, true, true, true, Sign::Credit),
            OperationKind::Credit => (true, false, false, true, false, false, Sign::Credit),
            OperationKind::Debit => (true, false, false, true, false, false, Sign::Debit),
            Fee => (false, false, false, true, false, false, Sign::Debit),
            Interest => (false, false, false, true, false, false, Sign::Credit),
            Split => (false, true, false, true, false, false, Neutral),
            CouponDetach => (false, true, false, true, true, false, Sign::Credit),
            DividendCash => (false, true, false, true, false, false, Sign::Credit),
            MarginLiquidation => (false, true, true, false, true, true, Sign::Credit),
            DividendShares => (false, true, true, true, true, false, Neutral),
            RegisterShares => (false, true, true, false, true, false, Register),
            OperationKind::Unknown(_) => return UNKNOWN_TRAITS,
        };
        KindTraits {
            cash_movement: cash,
            references_security: security,
            has_share_count: count,
            taxable,
            applies_to_position: applies,
            margin_account: margin,
            sign,
        }
    }

    pub fn is_cash_movement(&self) -> bool {
        self.traits().cash_movement
    }

    pub fn references_security(&self) -> bool {
        self.traits().references_security
    }

    pub fn has_share_count(&self) -> bool {
        self.traits().has_share_count
    }

    pub fn is_taxable(&self) -> bool {
        self.traits().taxable
    }

    pub fn applies_to_position(&self) -> bool {
        self.traits().applies_to_position
    }

    pub fn is_margin(&self) -> bool {
        self.traits().margin_account
    }

    pub fn sign(&self) -> Sign {
        self.traits().sign
    }

    /// Human-readable description for reports.
    pub fn describe(&self) -> String {
        match self {
            OperationKind::Buy => "buy".into(),
            OperationKind::BuyMargin => "buy (margin)".into(),
            OperationKind::Sell => "sell".into(),
            OperationKind::SellMargin => "sell (margin)".into(),
            OperationKind::Credit => "credit".into(),
            OperationKind::Debit => "debit".into(),
            OperationKind::Fee => "fee".into(),
            OperationKind::Interest => "interest".into(),
            OperationKind::Split => "split".into(),
            OperationKind::CouponDetach => "coupon detachment".into(),
            OperationKind::DividendCash => "dividend".into(),
            OperationKind::MarginLiquidation => "margin liquidation".into(),
            OperationKind::DividendShares => "dividend in shares".into(),
            OperationKind::RegisterShares => "register shares".into(),
            OperationKind::Unknown(raw) => format!("? ({raw})"),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
