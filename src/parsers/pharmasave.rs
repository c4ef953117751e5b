//! Pharmasave pharmacy/retail receipt parser. Prescription lines are
//! zero-rated (`Z`) regardless of their printed tax code, since
//! prescriptions are never taxed in Canada; front-of-store retail lines
//! use the usual letter code.

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

pub struct PharmasaveParser {
    rx_line: Regex,
    item_line: Regex,
    subtotal_line: Regex,
    tax_line: Regex,
    total_line: Regex,
    date_line: Regex,
}

impl PharmasaveParser {
    pub fn new() -> Self {
        Self {
            rx_line: Regex::new(r"(?i)^rx#\s*(\d+)\s+(.{3,40}?)\s+([\d,]+\.\d{2})\s*$").unwrap(),
            item_line: Regex::new(r"(?i)^(.{3,40}?)\s+([\d,]+\.\d{2})\s*([HGZE])?\s*$").unwrap(),
            subtotal_line: Regex::new(r"(?i)subtotal\s+\$?([\d,]+\.\d{2})").unwrap(),
            tax_line: Regex::new(r"(?i)(?:gst|hst|tax)\s+\$?([\d,]+\.\d{2})").unwrap(),
            total_line: Regex::new(r"(?i)^total\s+\$?([\d,]+\.\d{2})").unwrap(),
            date_line: Regex::new(r"\b(\d{2}/\d{2}/\d{2,4})\b").unwrap(),
        }
    }
}

impl Default for PharmasaveParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorParser for PharmasaveParser {
    fn vendor_key(&self) -> &'static str {
        "pharmasave"
    }

    fn detect_format(&self, text: &str) -> bool {
        text.to_lowercase().contains("pharmasave")
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
            if let Some(caps) = self.rx_line.captures(raw_line) {
                let desc = clean_description(&caps[2]);
                match normalize_price(&caps[3]) {
                    Ok(amount) => lines.push(ParsedLine {
                        line_index: 0,
                        line_type: LineType::Item,
                        sku: Some(format!("RX{}", &caps[1])),
                        upc: None,
                        raw_text: desc,
                        quantity: None,
                        unit_price: None,
                        line_total: amount,
                        tax_flag: TaxFlag::Z,
                        tax_amount: None,
                    }),
                    Err(_) => warnings.push(ValidationWarning::new(
                        WarningKind::PriceParseFailed,
                        "could not parse prescription line total",
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
                "no purchase date recognized on pharmasave receipt",
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
            vendor_guess: "Pharmasave".to_string(),
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
    fn prescriptions_are_always_zero_rated() {
        let text = "PHARMASAVE\nRX# 778812 AMOXICILLIN 500MG  24.99\nSUBTOTAL  24.99\nTAX  0.00\nTOTAL  24.99\n";
        let parser = PharmasaveParser::new();
        let receipt = parser.parse(text, Entity::Corp).unwrap();
        assert!(matches!(receipt.lines[0].tax_flag, TaxFlag::Z));
        assert!(receipt.lines[0].sku.as_deref().unwrap().starts_with("RX"));
    }
}
