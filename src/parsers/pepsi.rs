//! PepsiCo direct-store-delivery invoice parser.
//!
//! Pepsi invoices are keyed on UPCs with the PepsiCo GS1 prefix `69000`,
//! but per spec §4.3 "Anti-false-positive inside parsers", this alone is
//! never sufficient — a Walmart receipt can legitimately contain Pepsi
//! UPCs. `parse` is only ever invoked once [`crate::vendor::VendorIdentifier`]
//! has already selected `pepsi` from company/invoice-context markers, but
//! `detect_format` re-checks that context as a sanity warning, not a
//! dispatch decision.

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

pub struct PepsiParser {
    item_line: Regex,
    invoice_number: Regex,
    subtotal_line: Regex,
    tax_line: Regex,
    total_line: Regex,
    date_line: Regex,
}

impl PepsiParser {
    pub fn new() -> Self {
        Self {
            item_line: Regex::new(r"^(69000\d{7})\s+(.{3,40}?)\s+([\d,]+\.\d{2})\s*$").unwrap(),
            invoice_number: Regex::new(r"(?i)invoice details[:\s#]*(\w[\w-]*)|route\s*#\s*(\w[\w-]*)").unwrap(),
            subtotal_line: Regex::new(r"(?i)subtotal\s+\$?([\d,]+\.\d{2})").unwrap(),
            tax_line: Regex::new(r"(?i)gst/hst#?\s*[\d ]*\s+\$?([\d,]+\.\d{2})").unwrap(),
            total_line: Regex::new(r"(?i)^total\s+\$?([\d,]+\.\d{2})").unwrap(),
            date_line: Regex::new(r"(?i)delivery date[:\s]*(\d{2}/\d{2}/\d{2,4})|\b(\d{2}/\d{2}/\d{2,4})\b").unwrap(),
        }
    }
}

impl Default for PepsiParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorParser for PepsiParser {
    fn vendor_key(&self) -> &'static str {
        "pepsi"
    }

    fn detect_format(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        let has_context = lower.contains("pepsico") || lower.contains("invoice details");
        let has_upc_prefix = self.item_line.is_match(text);
        // Require context, never the bare UPC prefix alone.
        has_context && has_upc_prefix
    }

    fn parse(&self, text: &str, _entity: Entity) -> Result<NormalizedReceipt, ParseError> {
        let mut lines = Vec::new();
        let mut warnings = Vec::new();
        let mut subtotal = None;
        let mut tax_total = None;
        let mut total = None;
        let mut invoice_number = None;
        let mut purchase_date = None;

        if !self.detect_format(text) {
            warnings.push(ValidationWarning::new(
                WarningKind::VendorUnknown,
                "pepsi parser invoked without corroborating company/invoice context",
                json!({}),
            ));
        }

        for raw_line in text.lines() {
            let raw_line = raw_line.trim();
            if raw_line.is_empty() {
                continue;
            }

            if invoice_number.is_none() {
                if let Some(caps) = self.invoice_number.captures(raw_line) {
                    invoice_number = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string());
                    continue;
                }
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
                let upc = caps[1].to_string();
                let desc = clean_description(&caps[2]);
                match normalize_price(&caps[3]) {
                    Ok(line_total) => lines.push(ParsedLine {
                        line_index: 0,
                        line_type: LineType::Item,
                        sku: None,
                        upc: Some(upc),
                        raw_text: desc,
                        quantity: None,
                        unit_price: None,
                        line_total,
                        tax_flag: TaxFlag::Y,
                        tax_amount: None,
                    }),
                    Err(_) => warnings.push(ValidationWarning::new(
                        WarningKind::PriceParseFailed,
                        "could not parse pepsi line total",
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
                "no delivery date recognized on pepsi invoice",
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
            vendor_guess: "PepsiCo Beverages Canada".to_string(),
            purchase_date,
            invoice_number,
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
    fn bare_upc_prefix_without_context_fails_detect_format() {
        let parser = PepsiParser::new();
        let text = "690001234567  SOME PRODUCT  5.99\n";
        assert!(!parser.detect_format(text));
    }

    #[test]
    fn upc_prefix_with_pepsico_context_passes_detect_format() {
        let parser = PepsiParser::new();
        let text = "PEPSICO BEVERAGES CANADA\nINVOICE DETAILS: INV-500\n690001234567  PEPSI 24PK  12.99\n";
        assert!(parser.detect_format(text));
    }
}
