//! Grosnor Distribution (greeting cards / gift wholesaler) invoice parser.

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

pub struct GrosnorParser {
    item_line: Regex,
    subtotal_line: Regex,
    tax_line: Regex,
    total_line: Regex,
    date_line: Regex,
}

impl GrosnorParser {
    pub fn new() -> Self {
        Self {
            item_line: Regex::new(r"^([A-Z0-9]{4,12})\s+(.{3,40}?)\s+([\d,]+\.\d{2})\s*$").unwrap(),
            subtotal_line: Regex::new(r"(?i)subtotal\s+\$?([\d,]+\.\d{2})").unwrap(),
            tax_line: Regex::new(r"(?i)gst#?\s*[\d ]*\s+\$?([\d,]+\.\d{2})").unwrap(),
            total_line: Regex::new(r"(?i)^total\s+\$?([\d,]+\.\d{2})").unwrap(),
            date_line: Regex::new(r"(?i)invoice date[:\s]*(\d{2}/\d{2}/\d{2,4})|\b(\d{2}/\d{2}/\d{2,4})\b").unwrap(),
        }
    }
}

impl Default for GrosnorParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorParser for GrosnorParser {
    fn vendor_key(&self) -> &'static str {
        "grosnor"
    }

    fn detect_format(&self, text: &str) -> bool {
        text.to_lowercase().contains("grosnor")
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
                    let candidate = caps.get(1).or_else(|| caps.get(2)).unwrap().as_str();
                    purchase_date = parse_date_any(candidate, &["%m/%d/%y", "%m/%d/%Y"]);
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
                let sku = caps[1].to_string();
                let desc = clean_description(&caps[2]);
                match normalize_price(&caps[3]) {
                    Ok(line_total) => lines.push(ParsedLine {
                        line_index: 0,
                        line_type: LineType::Item,
                        sku: Some(sku),
                        upc: None,
                        raw_text: desc,
                        quantity: None,
                        unit_price: None,
                        line_total,
                        tax_flag: TaxFlag::Y,
                        tax_amount: None,
                    }),
                    Err(_) => warnings.push(ValidationWarning::new(
                        WarningKind::PriceParseFailed,
                        "could not parse grosnor line total",
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
                "no invoice date recognized on Grosnor invoice",
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
            vendor_guess: "Grosnor Distribution".to_string(),
            purchase_date,
            invoice_number: None,
            currency: "CAD".to_string(),
            subtotal,
            tax_total,
            total,
            is_bill: true,
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
    fn parses_item_lines_with_alnum_skus() {
        let text = "GROSNOR DISTRIBUTION\nGC1029  BIRTHDAY CARD ASSORTMENT  24.00\nSUBTOTAL  24.00\nGST  1.20\nTOTAL  25.20\n";
        let parser = GrosnorParser::new();
        let receipt = parser.parse(text, Entity::Corp).unwrap();
        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.lines[0].sku.as_deref(), Some("GC1029"));
    }
}
