//! Costco warehouse receipt parser.
//!
//! Costco item lines are `SKU DESCRIPTION PRICE <tax-code>` (code `Y`/`N`
//! rather than the letter-per-type scheme Walmart uses); membership
//! deposits/fees print as their own lines with keyword `DEPOSIT` or `FEE`.

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use crate::entity::Entity;
use crate::error::{ValidationWarning, WarningKind};
use crate::money::normalize_price;
use crate::model::{LineType, NormalizedReceipt, ParsedLine, TaxFlag};

use super::text_cleanup::clean_description;
use super::{check_subtotal_mismatch, reindex_lines, ParseError, VendorParser};

pub struct CostcoParser {
    item_line: Regex,
    subtotal_line: Regex,
    tax_line: Regex,
    total_line: Regex,
    fee_line: Regex,
}

impl CostcoParser {
    pub fn new() -> Self {
        Self {
            item_line: Regex::new(r"^(\d{4,7})\s+(.{3,40}?)\s+([\d,]+\.\d{2})\s*([YN])?\s*$").unwrap(),
            subtotal_line: Regex::new(r"(?i)subtotal\s+\$?([\d,]+\.\d{2})").unwrap(),
            tax_line: Regex::new(r"(?i)tax\s+\$?([\d,]+\.\d{2})").unwrap(),
            total_line: Regex::new(r"(?i)^\*{0,2}\s*total\s+\$?([\d,]+\.\d{2})").unwrap(),
            fee_line: Regex::new(r"(?i)(deposit|eco\s*fee|env\.?\s*fee)\s+([\d,]+\.\d{2})").unwrap(),
        }
    }
}

impl Default for CostcoParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorParser for CostcoParser {
    fn vendor_key(&self) -> &'static str {
        "costco"
    }

    fn detect_format(&self, text: &str) -> bool {
        text.to_lowercase().contains("costco")
    }

    fn parse(&self, text: &str, _entity: Entity) -> Result<NormalizedReceipt, ParseError> {
        let mut lines = Vec::new();
        let mut warnings = Vec::new();
        let mut subtotal = None;
        let mut tax_total = None;
        let mut total = None;

        for raw_line in text.lines() {
            let raw_line = raw_line.trim();
            if raw_line.is_empty() {
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
            if let Some(caps) = self.fee_line.captures(raw_line) {
                match normalize_price(&caps[2]) {
                    Ok(amount) => lines.push(ParsedLine {
                        line_index: 0,
                        line_type: LineType::Fee,
                        sku: None,
                        upc: None,
                        raw_text: raw_line.to_string(),
                        quantity: None,
                        unit_price: None,
                        line_total: amount,
                        tax_flag: TaxFlag::N,
                        tax_amount: None,
                    }),
                    Err(_) => warnings.push(ValidationWarning::new(
                        WarningKind::PriceParseFailed,
                        "could not parse fee/deposit amount",
                        json!({ "raw": raw_line }),
                    )),
                }
                continue;
            }
            if let Some(caps) = self.item_line.captures(raw_line) {
                let sku = caps[1].to_string();
                let desc = clean_description(&caps[2]);
                let tax_code = caps.get(4).map(|m| m.as_str());
                match normalize_price(&caps[3]) {
                    Ok(amount) => lines.push(ParsedLine {
                        line_index: 0,
                        line_type: LineType::Item,
                        sku: Some(sku),
                        upc: None,
                        raw_text: desc,
                        quantity: None,
                        unit_price: None,
                        line_total: amount,
                        tax_flag: if tax_code == Some("Y") { TaxFlag::Y } else { TaxFlag::N },
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

        warnings.push(ValidationWarning::new(
            WarningKind::DateParseFailed,
            "costco receipt date not recognized by this parser revision",
            json!({}),
        ));

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
            vendor_guess: "Costco".to_string(),
            purchase_date: None,
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
    fn cold_cache_line_carries_sku_for_stage_one() {
        // Scenario B input line (spec §8): vendor Costco, sku 54491.
        let text = "COSTCO WHOLESALE\n54491  HOT ROD 40CT  14.99 Y\nSUBTOTAL  14.99\nTAX  1.95\nTOTAL  16.94\n";
        let parser = CostcoParser::new();
        let receipt = parser.parse(text, Entity::Corp).unwrap();

        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.lines[0].sku.as_deref(), Some("54491"));
        assert_eq!(receipt.lines[0].raw_text, "HOT ROD 40CT");
    }

    #[test]
    fn equipment_line_total_preserved_for_capitalization_check() {
        // Scenario F (spec §8): a high-value single line, category
        // inference happens downstream in the recognizer/mapper.
        let text = "COSTCO WHOLESALE\n778899  COMMERCIAL MIXER  3499.99 Y\nSUBTOTAL  3499.99\nTAX  454.99\nTOTAL  3954.98\n";
        let parser = CostcoParser::new();
        let receipt = parser.parse(text, Entity::Corp).unwrap();
        assert_eq!(receipt.lines[0].line_total, dec!(3499.99));
    }
}
