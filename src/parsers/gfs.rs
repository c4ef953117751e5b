//! Gordon Food Service invoice parser.
//!
//! GFS invoices (this is a bill, `is_bill=true`) print one line per item as
//! `SKU  QTY  DESCRIPTION  UNIT_PRICE  LINE_TOTAL` and carry an explicit
//! invoice number and payment terms, unlike retail receipts.

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

pub struct GfsParser {
    item_line: Regex,
    invoice_number: Regex,
    subtotal_line: Regex,
    tax_line: Regex,
    total_line: Regex,
    terms_line: Regex,
    date_line: Regex,
}

impl GfsParser {
    pub fn new() -> Self {
        Self {
            item_line: Regex::new(
                r"^(\d{5,8})\s+(\d+(?:\.\d+)?)\s+(.{3,40}?)\s+([\d,]+\.\d{2,4})\s+([\d,]+\.\d{2})\s*$",
            )
            .unwrap(),
            invoice_number: Regex::new(r"(?i)invoice number[:\s]*(\w[\w-]*)").unwrap(),
            subtotal_line: Regex::new(r"(?i)subtotal\s+\$?([\d,]+\.\d{2})").unwrap(),
            tax_line: Regex::new(r"(?i)gst/hst#?\s*[\d ]*\s+\$?([\d,]+\.\d{2})").unwrap(),
            total_line: Regex::new(r"(?i)^(?:invoice\s*)?total\s+\$?([\d,]+\.\d{2})").unwrap(),
            terms_line: Regex::new(r"(?i)(net\s*\d+|due on receipt)").unwrap(),
            date_line: Regex::new(r"(?i)invoice date[:\s]*(\d{2}/\d{2}/\d{2,4})|\b(\d{2}/\d{2}/\d{2,4})\b").unwrap(),
        }
    }
}

impl Default for GfsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorParser for GfsParser {
    fn vendor_key(&self) -> &'static str {
        "gfs"
    }

    fn detect_format(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        lower.contains("gordon food service") || lower.contains("gfs canada")
    }

    fn parse(&self, text: &str, _entity: Entity) -> Result<NormalizedReceipt, ParseError> {
        let mut lines = Vec::new();
        let mut warnings = Vec::new();
        let mut subtotal = None;
        let mut tax_total = None;
        let mut total = None;
        let mut invoice_number = None;
        let mut payment_terms = None;
        let mut purchase_date = None;

        for raw_line in text.lines() {
            let raw_line = raw_line.trim();
            if raw_line.is_empty() {
                continue;
            }

            if invoice_number.is_none() {
                if let Some(caps) = self.invoice_number.captures(raw_line) {
                    invoice_number = Some(caps[1].to_string());
                    continue;
                }
            }
            if purchase_date.is_none() {
                if let Some(caps) = self.date_line.captures(raw_line) {
                    let candidate = caps.get(1).or_else(|| caps.get(2)).unwrap().as_str();
                    purchase_date = parse_date_any(candidate, &["%m/%d/%y", "%m/%d/%Y"]);
                }
            }
            if payment_terms.is_none() {
                if let Some(caps) = self.terms_line.captures(raw_line) {
                    payment_terms = Some(caps[1].to_uppercase());
                    continue;
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
                let qty = caps[2].parse::<Decimal>().ok();
                let desc = clean_description(&caps[3]);
                let unit_price = normalize_price(&caps[4]).ok();
                match normalize_price(&caps[5]) {
                    Ok(line_total) => lines.push(ParsedLine {
                        line_index: 0,
                        line_type: LineType::Item,
                        sku: Some(sku),
                        upc: None,
                        raw_text: desc,
                        quantity: qty,
                        unit_price,
                        line_total,
                        tax_flag: TaxFlag::Y,
                        tax_amount: None,
                    }),
                    Err(_) => warnings.push(ValidationWarning::new(
                        WarningKind::PriceParseFailed,
                        "could not parse GFS line total",
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
                "no invoice date recognized on GFS invoice",
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
            vendor_guess: "Gordon Food Service".to_string(),
            purchase_date,
            invoice_number,
            currency: "CAD".to_string(),
            subtotal,
            tax_total,
            total,
            is_bill: true,
            payment_terms,
            lines,
            validation_warnings: warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_invoice_number_and_terms() {
        let text = "GORDON FOOD SERVICE CANADA\nInvoice Number: INV-88210\nNet 30\n\
                    10023  2  CASE CHICKEN BREAST  45.5000  91.00\n\
                    SUBTOTAL  91.00\nGST/HST#123456789  4.55\nInvoice Total  95.55\n";
        let parser = GfsParser::new();
        let receipt = parser.parse(text, Entity::Corp).unwrap();

        assert_eq!(receipt.invoice_number.as_deref(), Some("INV-88210"));
        assert_eq!(receipt.payment_terms.as_deref(), Some("NET 30"));
        assert!(receipt.is_bill);
        assert_eq!(receipt.lines[0].sku.as_deref(), Some("10023"));
        assert_eq!(receipt.lines[0].quantity, Some(dec!(2)));
    }
}
