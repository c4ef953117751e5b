//! Walmart receipt parser.
//!
//! Walmart dot-matrix receipts list item lines as `DESCRIPTION  PRICE
//! <tax-code>` where the tax code is a single trailing letter (`H`=HST
//! taxable, `G`=GST only, `Z`=zero-rated, `E`=exempt). Deposits print as
//! their own line and are kept as line type `fee` so the item-sum check in
//! spec §4.3 excludes them, per §9 Open Question (b); this parser resolves
//! deposits as NOT part of subtotal.

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

pub struct WalmartParser {
    item_line: Regex,
    subtotal_line: Regex,
    tax_line: Regex,
    total_line: Regex,
    deposit_line: Regex,
    date_line: Regex,
}

impl WalmartParser {
    pub fn new() -> Self {
        Self {
            item_line: Regex::new(r"(?i)^(.{3,40}?)\s+([\d,]+\.\d{2})\s*([HGZE])?\s*$").unwrap(),
            subtotal_line: Regex::new(r"(?i)subtotal\s+\$?([\d,]+\.\d{2})").unwrap(),
            tax_line: Regex::new(r"(?i)(?:gst|hst|tax)\s+\$?([\d,]+\.\d{2})").unwrap(),
            total_line: Regex::new(r"(?i)^total\s+\$?([\d,]+\.\d{2})").unwrap(),
            deposit_line: Regex::new(r"(?i)(?:dep|deposit|bottle\s*dep)\s+\$?([\d,]+\.\d{2})").unwrap(),
            date_line: Regex::new(r"\b(\d{2}/\d{2}/\d{2,4})\b").unwrap(),
        }
    }

    fn tax_flag(code: Option<&str>) -> TaxFlag {
        match code {
            Some("H") => TaxFlag::Y,
            Some("G") => TaxFlag::Y,
            Some("Z") => TaxFlag::Z,
            Some("E") => TaxFlag::N,
            _ => TaxFlag::N,
        }
    }
}

impl Default for WalmartParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorParser for WalmartParser {
    fn vendor_key(&self) -> &'static str {
        "walmart"
    }

    fn detect_format(&self, text: &str) -> bool {
        text.to_lowercase().contains("walmart")
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
                    let candidate = caps.get(1).unwrap().as_str();
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
            if let Some(caps) = self.deposit_line.captures(raw_line) {
                match normalize_price(&caps[1]) {
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
                        "could not parse deposit amount",
                        json!({ "raw": raw_line }),
                    )),
                }
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
                        tax_flag: Self::tax_flag(tax_code),
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
                "no purchase date recognized on receipt",
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
            vendor_guess: "Walmart".to_string(),
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
    fn faded_subtotal_produces_mismatch_warning_not_a_synthetic_line() {
        // Scenario A (spec §8): 40 item lines summing to 177.80, subtotal
        // line misread as 191.03, tax 13.00, total 204.03. Expects exactly
        // one subtotal_mismatch warning with data={found_total:177.80,
        // expected_total:191.03, difference:13.23}.
        let mut text = String::from("WALMART SUPERCENTRE\n01/15/24\n");
        for i in 0..39 {
            text.push_str(&format!("ITEM {i:02}                4.44 H\n"));
        }
        text.push_str("ITEM 39                4.64 H\n");
        text.push_str("SUBTOTAL      191.03\nGST/HST  13.00\nTOTAL    204.03\n");

        let parser = WalmartParser::new();
        let receipt = parser.parse(&text, Entity::Corp).unwrap();

        assert_eq!(receipt.lines.len(), 40);
        assert!(receipt
            .lines
            .iter()
            .enumerate()
            .all(|(i, l)| l.line_index == i as u32));

        let item_sum: Decimal = receipt.lines.iter().map(|l| l.line_total).sum();
        assert_eq!(item_sum, dec!(177.80));

        let mismatches: Vec<_> = receipt
            .validation_warnings
            .iter()
            .filter(|w| matches!(w.kind, WarningKind::SubtotalMismatch))
            .collect();
        assert_eq!(mismatches.len(), 1);

        let data = &mismatches[0].data;
        assert_eq!(data["found_total"], json!("177.80"));
        assert_eq!(data["expected_total"], json!("191.03"));
        assert_eq!(data["difference"], json!("13.23"));
    }

    #[test]
    fn deposits_are_fee_lines_not_items() {
        let text = "WALMART SUPERCENTRE\n01/15/24\nPOP CAN 12PK  5.99 H\nBOTTLE DEP  1.20\nSUBTOTAL  7.19\nGST/HST  0.36\nTOTAL  7.55\n";
        let parser = WalmartParser::new();
        let receipt = parser.parse(text, Entity::Corp).unwrap();

        let fee_count = receipt.lines.iter().filter(|l| matches!(l.line_type, LineType::Fee)).count();
        assert_eq!(fee_count, 1);
    }
}
