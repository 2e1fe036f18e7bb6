//! Buyer and seller profiles, weight configuration and the request payload.

use crate::error::{NegotiationError, Result};
use crate::offer::QualityLevel;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Buyer preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerProfile {
    #[serde(alias = "priceRange")]
    pub price_target: f64,
    pub quality_preference: QualityLevel,
    #[serde(alias = "deliveryTimeline", alias = "deliveryTime")]
    pub delivery_target: f64,
}

impl BuyerProfile {
    pub fn new(price_target: f64, quality_preference: QualityLevel, delivery_target: f64) -> Self {
        BuyerProfile {
            price_target,
            quality_preference,
            delivery_target,
        }
    }

    /// Check the normalization denominators used by the fitness model.
    pub fn validate(&self) -> Result<()> {
        positive("buyer.priceTarget", self.price_target)?;
        positive("buyer.deliveryTarget", self.delivery_target)
    }
}

/// The seller's opening offer, which also caps price and delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialOffer {
    pub price: f64,
    pub quality: QualityLevel,
    pub delivery: u32,
}

/// Seller constraints and capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfile {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub initial_offer: InitialOffer,
    pub min_price: f64,
    pub min_delivery: u32,
    #[serde(alias = "qualities")]
    pub quality_levels: Vec<QualityLevel>,
    pub max_quality_cost: f64,
    pub delivery_capacity: f64,
}

impl SellerProfile {
    /// Check the normalization denominators and the quality cost bound.
    ///
    /// Bound pairs are checked by [`OfferSpace::from_seller`](crate::offer::OfferSpace::from_seller).
    pub fn validate(&self) -> Result<()> {
        let prefix = format!("sellers[{}]", self.id);
        positive(&format!("{prefix}.minPrice"), self.min_price)?;
        positive(&format!("{prefix}.deliveryCapacity"), self.delivery_capacity)?;
        if !(0.0..=1.0).contains(&self.max_quality_cost) {
            return Err(NegotiationError::configuration(
                format!("{prefix}.maxQualityCost"),
                format!("must lie in [0, 1], got {}", self.max_quality_cost),
            ));
        }
        if self.quality_levels.is_empty() {
            return Err(NegotiationError::configuration(
                format!("{prefix}.qualityLevels"),
                "at least one quality level is required",
            ));
        }
        Ok(())
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// Linear-combination weights of buyer and seller satisfaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightConfig {
    #[serde(alias = "user")]
    pub buyer_weight: f64,
    #[serde(alias = "manufacturer")]
    pub seller_weight: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        WeightConfig {
            buyer_weight: 0.5,
            seller_weight: 0.5,
        }
    }
}

impl WeightConfig {
    pub fn new(buyer_weight: f64, seller_weight: f64) -> Self {
        WeightConfig {
            buyer_weight,
            seller_weight,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, weight) in [
            ("weights.buyerWeight", self.buyer_weight),
            ("weights.sellerWeight", self.seller_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(NegotiationError::input(
                    field,
                    format!("weights must be finite and non-negative, got {weight}"),
                ));
            }
        }
        Ok(())
    }
}

/// One negotiation request: a buyer, the candidate sellers and the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationRequest {
    #[serde(alias = "user")]
    pub buyer: BuyerProfile,
    #[serde(alias = "manufacturers")]
    pub sellers: Vec<SellerProfile>,
    #[serde(default)]
    pub weights: WeightConfig,
}

impl NegotiationRequest {
    pub fn new(buyer: BuyerProfile, sellers: Vec<SellerProfile>, weights: WeightConfig) -> Self {
        NegotiationRequest {
            buyer,
            sellers,
            weights,
        }
    }

    /// Parse a JSON payload, reporting missing or malformed fields.
    pub fn from_json(payload: &str) -> Result<Self> {
        let request: NegotiationRequest = serde_json::from_str(payload).map_err(|e| {
            NegotiationError::input(
                "request",
                format!("line {}, column {}: {}", e.line(), e.column(), e),
            )
        })?;
        Ok(request)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let payload = fs::read_to_string(path)?;
        Self::from_json(&payload)
    }

    /// Validate everything that can be checked before an optimizer runs.
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.buyer.validate()?;

        if self.sellers.is_empty() {
            return Err(NegotiationError::input(
                "sellers",
                "at least one seller profile is required",
            ));
        }

        let mut seen = HashSet::new();
        for seller in &self.sellers {
            if !seen.insert(seller.id.as_str()) {
                return Err(NegotiationError::input(
                    "sellers",
                    format!("duplicate seller id '{}'", seller.id),
                ));
            }
            seller.validate()?;
        }
        Ok(())
    }
}

fn positive(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(NegotiationError::configuration(
            field,
            format!("must be a positive number, got {value}"),
        ))
    }
}
