//! Vendor parsers (spec §4.3): each implementation turns OCR text into a
//! [`NormalizedReceipt`]. Parsers assume they were chosen correctly —
//! vendor detection belongs to [`crate::vendor::VendorIdentifier`], not
//! here (Design Note §9).

pub mod text_cleanup;

mod atlantic_superstore;
mod costco;
mod generic;
mod gfs;
mod grosnor;
mod pepsi;
mod pharmasave;
mod walmart;

pub use atlantic_superstore::AtlanticSuperstoreParser;
pub use costco::CostcoParser;
pub use generic::GenericParser;
pub use gfs::GfsParser;
pub use grosnor::GrosnorParser;
pub use pepsi::PepsiParser;
pub use pharmasave::PharmasaveParser;
pub use walmart::WalmartParser;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use crate::entity::Entity;
use crate::error::{ValidationWarning, WarningKind};
use crate::model::{LineType, NormalizedReceipt, ParsedLine};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no lines could be recovered from the receipt text")]
    NoLines,
}

/// `parse` is the dispatch contract; `detect_format` is an optional sanity
/// check (mismatch only produces a warning, never changes dispatch — spec
/// §4.3).
pub trait VendorParser: Send + Sync {
    fn vendor_key(&self) -> &'static str;

    fn parse(&self, text: &str, entity: Entity) -> Result<NormalizedReceipt, ParseError>;

    fn detect_format(&self, _text: &str) -> bool {
        true
    }
}

/// Returns a `subtotal_mismatch` warning when
/// `Sigma(item+fee) - |Sigma discount|` differs from the parsed subtotal by
/// more than $0.10 (spec §4.3 "Subtotal-mismatch policy"). Never inserts a
/// placeholder/balancing line (Testable Property 3).
pub fn check_subtotal_mismatch(lines: &[ParsedLine], parsed_subtotal: Decimal) -> Option<ValidationWarning> {
    let items_and_fees: Decimal = lines
        .iter()
        .filter(|l| matches!(l.line_type, LineType::Item | LineType::Fee))
        .map(|l| l.line_total)
        .sum();
    let discounts: Decimal = lines
        .iter()
        .filter(|l| matches!(l.line_type, LineType::Discount))
        .map(|l| l.line_total)
        .sum();

    let found_total = items_and_fees - discounts.abs();
    let difference = (found_total - parsed_subtotal).abs();

    if difference > dec!(0.10) {
        Some(ValidationWarning::new(
            WarningKind::SubtotalMismatch,
            "sum of item/fee lines less discounts does not match parsed subtotal",
            json!({
                "found_total": found_total,
                "expected_total": parsed_subtotal,
                "difference": difference,
            }),
        ))
    } else {
        None
    }
}

/// Re-densifies `line_index` in place to `0..n` in current order, the
/// invariant every parser must leave its output in (spec §3 Invariant 3).
pub fn reindex_lines(lines: &mut [ParsedLine]) {
    for (i, line) in lines.iter_mut().enumerate() {
        line.line_index = i as u32;
    }
}
