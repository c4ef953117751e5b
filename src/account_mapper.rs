//! Account mapper (Stage 2, spec §4.5): deterministic, no I/O, no AI.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::PipelineConfig;
use crate::recognizer::ProductCategory;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMapping {
    pub account_code: String,
    pub account_name: String,
    pub confidence: f64,
    pub requires_review: bool,
}

/// Illustrative GL account table; a real chart of accounts is configured
/// per business and is outside this crate's scope (spec §9 open question).
fn static_mapping(category: ProductCategory) -> (&'static str, &'static str) {
    use ProductCategory::*;
    match category {
        FoodHotdog | FoodSandwich | FoodPizza | FoodFrozen | FoodBakery | FoodDairy | FoodMeat
        | FoodProduce | FoodCondiment | FoodPantry | FoodOther | FoodOil => {
            ("5010", "Cost of Goods Sold — Food")
        }
        BeverageSoda | BeverageWater | BeverageEnergy | BeverageSports | BeverageJuice
        | BeverageCoffee | BeverageTea | BeverageMilk | BeverageOther => {
            ("5020", "Cost of Goods Sold — Beverage")
        }
        BeverageAlcohol => ("5025", "Cost of Goods Sold — Alcohol"),
        SupplementProtein | SupplementVitamin | SupplementPreworkout | SupplementRecovery
        | SupplementSportsNutrition | SupplementOther => ("5030", "Cost of Goods Sold — Supplements"),
        RetailSnack | RetailCandy | RetailHealth | RetailAccessory | RetailApparel | RetailOther => {
            ("5031", "Cost of Goods Sold — Retail")
        }
        Freight => ("5040", "Cost of Goods Sold — Freight"),
        PackagingContainer | PackagingBag | PackagingUtensil => ("5050", "Cost of Goods Sold — Packaging"),
        SupplyCleaning | SupplyPaper | SupplyKitchen | SupplyOther => ("6100", "Operating Supplies"),
        OfficeSupply => ("6200", "Office Supplies"),
        RepairEquipment | RepairBuilding | Maintenance | Equipment => ("6300", "Repairs & Maintenance"),
        Deposit => ("2200", "Bottle Deposits Payable"),
        License => ("6400", "Licenses & Permits"),
        Unknown => ("9100", "Pending Receipt — No ITC"),
    }
}

pub struct AccountMapper {
    capitalization_threshold: Decimal,
}

impl AccountMapper {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            capitalization_threshold: config.capitalization_threshold,
        }
    }

    pub fn map(&self, product_category: ProductCategory, line_total: Decimal) -> AccountMapping {
        if product_category == ProductCategory::Unknown {
            let (code, name) = static_mapping(product_category);
            return AccountMapping {
                account_code: code.to_string(),
                account_name: name.to_string(),
                confidence: 1.0,
                requires_review: true,
            };
        }

        if product_category == ProductCategory::Equipment && line_total.abs() >= self.capitalization_threshold {
            return AccountMapping {
                account_code: "1500".to_string(),
                account_name: "Fixed Asset — Equipment".to_string(),
                confidence: 1.0,
                requires_review: true,
            };
        }

        let (code, name) = static_mapping(product_category);
        AccountMapping {
            account_code: code.to_string(),
            account_name: name.to_string(),
            confidence: 1.0,
            requires_review: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn mapper() -> AccountMapper {
        AccountMapper::new(&PipelineConfig::default())
    }

    #[test]
    fn equipment_over_threshold_is_capitalized_and_flagged() {
        let mapping = mapper().map(ProductCategory::Equipment, dec!(2999.00));
        assert_eq!(mapping.account_code, "1500");
        assert!(mapping.requires_review);
    }

    #[test]
    fn equipment_under_threshold_is_repairs_and_not_flagged() {
        let mapping = mapper().map(ProductCategory::Equipment, dec!(120.00));
        assert_eq!(mapping.account_code, "6300");
        assert!(!mapping.requires_review);
    }

    #[test]
    fn equipment_at_exact_threshold_is_capitalized() {
        let mapping = mapper().map(ProductCategory::Equipment, dec!(2500.00));
        assert_eq!(mapping.account_code, "1500");
    }

    #[test]
    fn unknown_maps_to_pending_receipt_and_flagged() {
        let mapping = mapper().map(ProductCategory::Unknown, dec!(10.00));
        assert_eq!(mapping.account_code, "9100");
        assert!(mapping.requires_review);
    }
}
