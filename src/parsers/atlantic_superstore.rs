//! Atlantic Superstore (Loblaws banner) grocery receipt parser. Shares
//! Walmart's per-line tax-letter convention but uses PC Optimum markers and
//! prints discounts as `LESS` lines with a leading minus sign.

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

pub struct AtlanticSuperstoreParser {
    item_line: Regex,
    discount_line: Regex,
    subtotal_line: Regex,
    tax_line: Regex,
    total_line: Regex,
    date_line: Regex,
}

impl AtlanticSuperstoreParser {
    pub fn new() -> Self {
        Self {
            item_line: Regex::new(r"(?i)^(.{3,40}?)\s+([\d,]+\.\d{2})\s*([HGZE])?\s*$").unwrap(),
            discount_line: Regex::new(r"(?i)^less\s+(.{3,40}?)\s+-?([\d,]+\.\d{2})\s*$").unwrap(),
            subtotal_line: Regex::new(r"(?i)subtotal\s+\$?([\d,]+\.\d{2})").unwrap(),
            tax_line: Regex::new(r"(?i)(?:gst|hst|tax)\s+\$?([\d,]+\.\d{2})").unwrap(),
            total_line: Regex::new(r"(?i)^total\s+\$?([\d,]+\.\d{2})").unwrap(),
            date_line: Regex::new(r"\b(\d{2}/\d{2}/\d{2,4})\b").unwrap(),
        }
    }
}

impl Default for AtlanticSuperstoreParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorParser for AtlanticSuperstoreParser {
    fn vendor_key(&self) -> &'static str {
        "atlantic_superstore"
    }

    fn detect_format(&self, text: &str) -> bool {
        text.to_lowercase().contains("atlantic superstore")
    }

    fn parse(&self, text: &str, _entity: Entity) -> Result<NormalizedReceipt, ParseError> {
        let mut lines = Vec::new();
        let mut warnings = Vec::new();
        let mut subtotal = None;
        let mut tax_total = None;
        let mut total = None;
        let mut purchase_date = None;

        for raw_line in text.lines() {
            let raw_line = raw_line.trim();
            if raw_line.is_empty() {
                continue;
            }
            if purchase_date.is_none() {
                if let Some(caps) = self.date_line.captures(raw_line) {
                    purchase_date = parse_date_any(&caps[1], &["%m/%d/%y", "%m/%d/%Y"]);
                }
            }
            if let Some(caps) = self.discount_line.captures(raw_line) {
                let desc = clean_description(&caps[1]);
                match normalize_price(&caps[2]) {
                    Ok(amount) => lines.push(ParsedLine {
                        line_index: 0,
                        line_type: LineType::Discount,
                        sku: None,
                        upc: None,
                        raw_text: desc,
                        quantity: None,
                        unit_price: None,
                        line_total: -amount.abs(),
                        tax_flag: TaxFlag::N,
                        tax_amount: None,
                    }),
                    Err(_) => warnings.push(ValidationWarning::new(
                        WarningKind::PriceParseFailed,
                        "could not parse discount amount",
                        json!({ "raw": raw_line }),
                    )),
                }
                continue;
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
                let tax_code = caps.get(3).map(|m| m.as_str());
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
                        tax_flag: match tax_code {
                            Some("H") | Some("G") => TaxFlag::Y,
                            Some("Z") => TaxFlag::Z,
                            _ => TaxFlag::N,
                        },
                        tax_amount: None,
                    }),
                    Err(_) => warnings.push(ValidationWarning::new(
                        WarningKind::PriceParseFailed,
                        "could not parse item price",
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
                "no purchase date recognized on atlantic superstore receipt",
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
            vendor_guess: "Atlantic Superstore".to_string(),
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
    fn discount_lines_are_negative_and_typed_discount() {
        let text = "ATLANTIC SUPERSTORE\nBREAD WHITE  3.49 H\nLESS BREAD WHITE  1.00\nSUBTOTAL  2.49\nHST  0.32\nTOTAL  2.81\n";
        let parser = AtlanticSuperstoreParser::new();
        let receipt = parser.parse(text, Entity::Corp).unwrap();

        let discount = receipt
            .lines
            .iter()
            .find(|l| matches!(l.line_type, LineType::Discount))
            .unwrap();
        assert_eq!(discount.line_total, dec!(-1.00));
    }
}
