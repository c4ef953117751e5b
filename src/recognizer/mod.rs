//! Item recognizer (Stage 1, spec §4.4): cache-first category/description
//! expansion with an LLM fallback.

mod llm_client;

pub use llm_client::{ClassifyRequest, ClassifyResponse, LlmClient, PriceTable, ReqwestLlmClient};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::{CategorizationCache, NewProductMapping};
use crate::config::PipelineConfig;

/// The stable, closed product-category vocabulary. Stage 2 keys on these
/// identifiers, so reimplementers must preserve them exactly (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    FoodHotdog,
    FoodSandwich,
    FoodPizza,
    FoodFrozen,
    FoodBakery,
    FoodDairy,
    FoodMeat,
    FoodProduce,
    FoodCondiment,
    FoodPantry,
    FoodOther,
    FoodOil,
    BeverageSoda,
    BeverageWater,
    BeverageEnergy,
    BeverageSports,
    BeverageJuice,
    BeverageCoffee,
    BeverageTea,
    BeverageMilk,
    BeverageAlcohol,
    BeverageOther,
    SupplementProtein,
    SupplementVitamin,
    SupplementPreworkout,
    SupplementRecovery,
    SupplementSportsNutrition,
    SupplementOther,
    RetailSnack,
    RetailCandy,
    RetailHealth,
    RetailAccessory,
    RetailApparel,
    RetailOther,
    Freight,
    PackagingContainer,
    PackagingBag,
    PackagingUtensil,
    SupplyCleaning,
    SupplyPaper,
    SupplyKitchen,
    SupplyOther,
    OfficeSupply,
    RepairEquipment,
    RepairBuilding,
    Maintenance,
    Equipment,
    Deposit,
    License,
    Unknown,
}

impl ProductCategory {
    /// One-line description included in the classification prompt.
    pub fn description(&self) -> &'static str {
        use ProductCategory::*;
        match self {
            FoodHotdog => "Hot dogs and hot dog related food products",
            FoodSandwich => "Sandwiches and wraps",
            FoodPizza => "Pizza and pizza ingredients",
            FoodFrozen => "Frozen food items",
            FoodBakery => "Bakery items: bread, pastries, baked goods",
            FoodDairy => "Dairy: milk, cheese, yogurt, eggs",
            FoodMeat => "Raw or prepared meat and poultry",
            FoodProduce => "Fresh fruit and vegetables",
            FoodCondiment => "Condiments, sauces, dressings",
            FoodPantry => "Shelf-stable pantry staples",
            FoodOther => "Food items not covered by a more specific category",
            FoodOil => "Cooking oils and fats",
            BeverageSoda => "Carbonated soft drinks",
            BeverageWater => "Bottled or sparkling water",
            BeverageEnergy => "Energy drinks",
            BeverageSports => "Sports/electrolyte drinks",
            BeverageJuice => "Fruit and vegetable juices",
            BeverageCoffee => "Coffee, ground or brewed",
            BeverageTea => "Tea, loose or bagged",
            BeverageMilk => "Milk-based beverages not classed as dairy",
            BeverageAlcohol => "Beer, wine, and spirits",
            BeverageOther => "Beverages not covered by a more specific category",
            SupplementProtein => "Protein powders and bars",
            SupplementVitamin => "Vitamins and minerals",
            SupplementPreworkout => "Pre-workout supplements",
            SupplementRecovery => "Recovery/post-workout supplements",
            SupplementSportsNutrition => "General sports nutrition products",
            SupplementOther => "Supplements not covered by a more specific category",
            RetailSnack => "Packaged snack foods",
            RetailCandy => "Candy and confectionery",
            RetailHealth => "Health and personal care retail items",
            RetailAccessory => "Retail accessories (bags, bottles, gear)",
            RetailApparel => "Clothing and apparel",
            RetailOther => "Retail goods not covered by a more specific category",
            Freight => "Freight and shipping charges",
            PackagingContainer => "Food containers/clamshells",
            PackagingBag => "Bags and pouches",
            PackagingUtensil => "Disposable utensils",
            SupplyCleaning => "Cleaning supplies",
            SupplyPaper => "Paper goods (napkins, towels)",
            SupplyKitchen => "General kitchen supplies",
            SupplyOther => "Supplies not covered by a more specific category",
            OfficeSupply => "Office supplies",
            RepairEquipment => "Equipment repair parts/service",
            RepairBuilding => "Building repair materials/service",
            Maintenance => "General maintenance items/service",
            Equipment => "Equipment purchases",
            Deposit => "Container/bottle deposits",
            License => "Licenses and permits",
            Unknown => "Could not be confidently classified",
        }
    }

    /// Lowercase snake_case wire identifier, e.g. `"beverage_soda"`.
    pub fn as_code(&self) -> String {
        category_snake(self)
    }

    pub fn from_code(code: &str) -> Option<Self> {
        parse_category(code)
    }

    pub fn all() -> &'static [ProductCategory] {
        use ProductCategory::*;
        &[
            FoodHotdog, FoodSandwich, FoodPizza, FoodFrozen, FoodBakery, FoodDairy, FoodMeat,
            FoodProduce, FoodCondiment, FoodPantry, FoodOther, FoodOil, BeverageSoda,
            BeverageWater, BeverageEnergy, BeverageSports, BeverageJuice, BeverageCoffee,
            BeverageTea, BeverageMilk, BeverageAlcohol, BeverageOther, SupplementProtein,
            SupplementVitamin, SupplementPreworkout, SupplementRecovery,
            SupplementSportsNutrition, SupplementOther, RetailSnack, RetailCandy, RetailHealth,
            RetailAccessory, RetailApparel, RetailOther, Freight, PackagingContainer,
            PackagingBag, PackagingUtensil, SupplyCleaning, SupplyPaper, SupplyKitchen,
            SupplyOther, OfficeSupply, RepairEquipment, RepairBuilding, Maintenance, Equipment,
            Deposit, License, Unknown,
        ]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecognizerError {
    #[error("llm call timed out after {0}s")]
    Timeout(u64),
    #[error("llm call failed: {0}")]
    CallFailed(String),
    #[error("cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),
}

#[derive(Debug, Clone)]
pub struct RecognizedItem {
    pub normalized_description: String,
    pub product_category: ProductCategory,
    pub brand: Option<String>,
    pub confidence: f64,
    pub ai_cost_usd: Decimal,
    pub source: RecognitionSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionSource {
    Cache,
    Llm,
    /// The LLM call exceeded `llm_call_timeout_s` (spec §7, `recognizer_timeout`).
    DegradedTimeout,
    /// The model returned malformed JSON or a category outside the closed
    /// vocabulary (spec §7, `recognizer_output_invalid`).
    DegradedInvalid,
}

impl RecognitionSource {
    pub fn is_degraded(self) -> bool {
        matches!(self, RecognitionSource::DegradedTimeout | RecognitionSource::DegradedInvalid)
    }
}

/// Stage 1: `recognize(vendor, sku, raw_description, line_total)` (spec
/// §4.4). `line_total` is accepted for symmetry with the spec's operation
/// signature even though the current algorithm does not use it directly —
/// it is available to a future web-lookup corroboration step.
pub struct ItemRecognizer<C: CategorizationCache, L: LlmClient> {
    cache: C,
    llm: L,
    cache_write_threshold: f64,
}

impl<C: CategorizationCache, L: LlmClient> ItemRecognizer<C, L> {
    pub fn new(cache: C, llm: L, config: &PipelineConfig) -> Self {
        Self {
            cache,
            llm,
            cache_write_threshold: config.categorization_cache_write_threshold,
        }
    }

    pub async fn recognize(
        &self,
        vendor_canonical: &str,
        sku: Option<&str>,
        raw_description: &str,
        _line_total: Decimal,
    ) -> Result<RecognizedItem, RecognizerError> {
        if let Some(sku) = sku {
            if let Some(entry) = self.cache.get(vendor_canonical, sku).await? {
                return Ok(RecognizedItem {
                    normalized_description: entry.normalized_description,
                    product_category: entry.product_category,
                    brand: entry.brand,
                    confidence: entry.user_confidence,
                    ai_cost_usd: Decimal::ZERO,
                    source: RecognitionSource::Cache,
                });
            }
        }

        let request = ClassifyRequest {
            vendor: vendor_canonical.to_string(),
            raw_description: raw_description.to_string(),
            categories: ProductCategory::all()
                .iter()
                .map(|c| (c.as_code(), c.description()))
                .collect(),
        };

        let response = match self.llm.classify_item(request).await {
            Ok(response) => response,
            Err(RecognizerError::Timeout(secs)) => {
                warn!(secs, "recognizer LLM call timed out, degrading to unknown");
                return Ok(degraded(RecognitionSource::DegradedTimeout));
            }
            Err(e) => return Err(e),
        };

        let item = match parse_category(&response.product_category) {
            Some(category) => RecognizedItem {
                normalized_description: response.normalized_description,
                product_category: category,
                brand: response.brand,
                confidence: response.confidence,
                ai_cost_usd: response.ai_cost_usd,
                source: RecognitionSource::Llm,
            },
            None => {
                warn!(
                    category = %response.product_category,
                    "recognizer returned a category outside the closed vocabulary"
                );
                degraded(RecognitionSource::DegradedInvalid)
            }
        };

        if let Some(sku) = sku {
            if item.product_category != ProductCategory::Unknown
                && item.confidence >= self.cache_write_threshold
            {
                self.cache
                    .put(
                        vendor_canonical,
                        sku,
                        NewProductMapping {
                            normalized_description: item.normalized_description.clone(),
                            product_category: item.product_category,
                            brand: item.brand.clone(),
                            account_code: None,
                            user_confidence: item.confidence,
                        },
                    )
                    .await?;
            }
        }

        Ok(item)
    }
}

pub(crate) fn degraded(source: RecognitionSource) -> RecognizedItem {
    RecognizedItem {
        normalized_description: String::new(),
        product_category: ProductCategory::Unknown,
        brand: None,
        confidence: 0.0,
        ai_cost_usd: Decimal::ZERO,
        source,
    }
}

fn parse_category(raw: &str) -> Option<ProductCategory> {
    ProductCategory::all()
        .iter()
        .find(|c| format!("{c:?}").eq_ignore_ascii_case(raw) || category_snake(c) == raw.to_lowercase())
        .copied()
}

fn category_snake(category: &ProductCategory) -> String {
    serde_json::to_value(category)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_vocabulary_is_stable_length() {
        // Guards against accidental additions/removals to the closed set.
        assert_eq!(ProductCategory::all().len(), 50);
    }

    #[test]
    fn parses_snake_case_llm_output() {
        assert_eq!(parse_category("beverage_soda"), Some(ProductCategory::BeverageSoda));
        assert_eq!(parse_category("not_a_real_category"), None);
    }
}
