//! Generic best-effort fallback parser, used whenever
//! [`crate::vendor::VendorIdentifier`] returns `None` (spec §4.3, §7
//! "vendor identifier returned null"). Always "matches", and everything it
//! produces is flagged for review.

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use crate::entity::Entity;
use crate::error::{ValidationWarning, WarningKind};
use crate::money::normalize_price;
use crate::model::{LineType, NormalizedReceipt, ParsedLine, TaxFlag};

use super::text_cleanup::{clean_description, parse_date_any};
use super::{check_subtotal_mismatch, reindex_lines, ParseError, VendorParser};

pub struct GenericParser {
    item_line: Regex,
    subtotal_line: Regex,
    tax_line: Regex,
    total_line: Regex,
    date_line: Regex,
}

impl GenericParser {
    pub fn new() -> Self {
        Self {
            item_line: Regex::new(r"^(.{3,60}?)\s+\$?([\d,]+\.\d{2})\s*$").unwrap(),
            subtotal_line: Regex::new(r"(?i)sub-?total\s*:?\s*\$?([\d,]+\.\d{2})").unwrap(),
            tax_line: Regex::new(r"(?i)(?:gst|hst|tax|vat)\s*:?\s*\$?([\d,]+\.\d{2})").unwrap(),
            total_line: Regex::new(r"(?i)^(?:grand\s*)?total\s*:?\s*\$?([\d,]+\.\d{2})").unwrap(),
            date_line: Regex::new(r"\b(\d{4}-\d{2}-\d{2}|\d{2}/\d{2}/\d{2,4})\b").unwrap(),
        }
    }
}

impl Default for GenericParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorParser for GenericParser {
    fn vendor_key(&self) -> &'static str {
        "generic"
    }

    fn detect_format(&self, _text: &str) -> bool {
        // Always matches, by contract: this is the fallback of last resort.
        true
    }

    fn parse(&self, text: &str, _entity: Entity) -> Result<NormalizedReceipt, ParseError> {
        let mut lines = Vec::new();
        let mut warnings = vec![ValidationWarning::new(
            WarningKind::VendorUnknown,
            "no vendor matched; used best-effort generic extraction",
            json!({}),
        )];
        let mut subtotal = None;
        let mut tax_total = None;
        let mut total = None;
        let mut purchase_date = None;

        let vendor_guess = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("Unknown Vendor")
            .to_string();

        for raw_line in text.lines().skip(1) {
            let raw_line = raw_line.trim();
            if raw_line.is_empty() {
                continue;
            }
            if purchase_date.is_none() {
                if let Some(caps) = self.date_line.captures(raw_line) {
                    purchase_date = parse_date_any(&caps[1], &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"]);
                }
            }
            if let Some(caps) = self.subtotal_line.captures(raw_line) {
                subtotal = normalize_price(&caps[1]).ok();
                continue;
            }
            if let Some(caps) = self.total_line.captures(raw_line) {
                total = normalize_price(&caps[1]).ok();
                continue;
            }
            if let Some(caps) = self.tax_line.captures(raw_line) {
                tax_total = normalize_price(&caps[1]).ok();
                continue;
            }
            if let Some(caps) = self.item_line.captures(raw_line) {
                let desc = clean_description(&caps[1]);
                match normalize_price(&caps[2]) {
                    Ok(amount) => lines.push(ParsedLine {
                        line_index: 0,
                        line_type: LineType::Item,
                        sku: None,
                        upc: None,
                        raw_text: desc,
                        quantity: None,
                        unit_price: None,
                        line_total: amount,
                        tax_flag: TaxFlag::N,
                        tax_amount: None,
                    }),
                    Err(_) => warnings.push(ValidationWarning::new(
                        WarningKind::PriceParseFailed,
                        "could not parse a candidate price line",
                        json!({ "raw": raw_line }),
                    )),
                }
            }
        }

        if lines.is_empty() {
            return Err(ParseError::NoLines);
        }

        reindex_lines(&mut lines);

        if purchase_date.is_none() {
            warnings.push(ValidationWarning::new(
                WarningKind::DateParseFailed,
                "no purchase date recognized by generic extraction",
                json!({}),
            ));
        }

        let subtotal = subtotal.unwrap_or(Decimal::ZERO);
        let tax_total = tax_total.unwrap_or(Decimal::ZERO);
        let total = total.unwrap_or(subtotal + tax_total);

        if (subtotal + tax_total - total).abs() > dec!(0.02) {
            warnings.push(ValidationWarning::new(
                WarningKind::TotalMismatch,
                "subtotal + tax does not equal total within tolerance",
                json!({ "subtotal": subtotal, "tax_total": tax_total, "total": total }),
            ));
        }

        if let Some(warning) = check_subtotal_mismatch(&lines, subtotal) {
            warnings.push(warning);
        }

        Ok(NormalizedReceipt {
            vendor_guess,
            purchase_date,
            invoice_number: None,
            currency: "CAD".to_string(),
            subtotal,
            tax_total,
            total,
            is_bill: false,
            payment_terms: None,
            lines,
            validation_warnings: warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_matches_and_flags_vendor_unknown() {
        let text = "Some Random Shop\nWidget  9.99\nTotal  9.99\n";
        let parser = GenericParser::new();
        let receipt = parser.parse(text, Entity::Corp).unwrap();
        assert!(receipt
            .validation_warnings
            .iter()
            .any(|w| matches!(w.kind, WarningKind::VendorUnknown)));
    }
}
