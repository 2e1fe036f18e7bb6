//! Offer representation and the bounded offer space shared by all optimizers.

use crate::error::{NegotiationError, Result};
use crate::profile::SellerProfile;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest numeric quality any offer may carry.
pub const QUALITY_MIN: f64 = 0.3;
/// Highest numeric quality any offer may carry.
pub const QUALITY_MAX: f64 = 1.0;

const LABEL_TOLERANCE: f64 = 1e-9;

/// Categorical quality level with its fixed numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QualityLevel {
    Economy,
    Standard,
    Premium,
}

impl QualityLevel {
    pub const ALL: [QualityLevel; 3] = [
        QualityLevel::Economy,
        QualityLevel::Standard,
        QualityLevel::Premium,
    ];

    /// Numeric value of the level: Economy 0.3, Standard 0.6, Premium 1.0.
    pub fn value(self) -> f64 {
        match self {
            QualityLevel::Economy => 0.3,
            QualityLevel::Standard => 0.6,
            QualityLevel::Premium => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityLevel::Economy => "Economy",
            QualityLevel::Standard => "Standard",
            QualityLevel::Premium => "Premium",
        }
    }

    /// Parse a label, returning `None` for anything unknown.
    pub fn parse(label: &str) -> Option<QualityLevel> {
        QualityLevel::ALL
            .into_iter()
            .find(|level| level.label().eq_ignore_ascii_case(label.trim()))
    }

    /// Parse a label, mapping unknown labels to `Standard`.
    pub fn from_label(label: &str) -> QualityLevel {
        QualityLevel::parse(label).unwrap_or(QualityLevel::Standard)
    }

    /// Match a value rounded to one decimal against the fixed map.
    ///
    /// Only 0.3, 0.6 and 1.0 match; 0.8 for instance does not.
    pub fn from_rounded(value: f64) -> Option<QualityLevel> {
        let rounded = (value * 10.0).round() / 10.0;
        QualityLevel::ALL
            .into_iter()
            .find(|level| (level.value() - rounded).abs() < LABEL_TOLERANCE)
    }

    /// Level whose value is closest to `value` (ties favour the lower level).
    pub fn nearest(value: f64) -> QualityLevel {
        let mut best = QualityLevel::Economy;
        let mut best_distance = f64::INFINITY;
        for level in QualityLevel::ALL {
            let distance = (level.value() - value).abs();
            if distance < best_distance {
                best = level;
                best_distance = distance;
            }
        }
        best
    }
}

impl From<String> for QualityLevel {
    fn from(label: String) -> Self {
        QualityLevel::from_label(&label)
    }
}

impl From<QualityLevel> for String {
    fn from(level: QualityLevel) -> Self {
        level.label().to_string()
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Quality carried by an offer: a numeric magnitude plus its nearest label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "QualityRepr")]
pub struct Quality {
    pub value: f64,
    pub label: QualityLevel,
}

/// Accepted wire forms: `"Premium"`, `0.8` or `{"value": 0.8, ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum QualityRepr {
    Label(String),
    Value(f64),
    Full { value: f64 },
}

impl From<QualityRepr> for Quality {
    fn from(repr: QualityRepr) -> Self {
        match repr {
            QualityRepr::Label(label) => Quality::from_level(QualityLevel::from_label(&label)),
            QualityRepr::Value(value) | QualityRepr::Full { value } => Quality::from_value(value),
        }
    }
}

impl Quality {
    pub fn from_level(level: QualityLevel) -> Self {
        Quality {
            value: level.value(),
            label: level,
        }
    }

    pub fn from_value(value: f64) -> Self {
        Quality {
            value,
            label: QualityLevel::nearest(value),
        }
    }

    /// Build from a percentage (80 → 0.8).
    pub fn from_percent(percent: f64) -> Self {
        Quality::from_value(percent / 100.0)
    }

    pub fn percent(&self) -> f64 {
        self.value * 100.0
    }

    /// Snap to a canonical level by one-decimal rounding, defaulting to `Standard`.
    pub fn snapped(&self) -> Self {
        Quality::from_level(QualityLevel::from_rounded(self.value).unwrap_or(QualityLevel::Standard))
    }
}

impl From<QualityLevel> for Quality {
    fn from(level: QualityLevel) -> Self {
        Quality::from_level(level)
    }
}

/// A commercial offer: price, delivery time and quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub price: f64,
    pub delivery: u32,
    pub quality: Quality,
}

impl Offer {
    pub fn new(price: f64, delivery: u32, quality: impl Into<Quality>) -> Self {
        Offer {
            price,
            delivery,
            quality: quality.into(),
        }
    }
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "price {:.2}, delivery {}, quality {:.2} ({})",
            self.price, self.delivery, self.quality.value, self.quality.label
        )
    }
}

/// Search bounds for one seller.
///
/// Price lies in `[minPrice, initialOffer.price]`, delivery in
/// `[minDelivery, initialOffer.delivery]`, quality in a sub-range of
/// `[0.3, 1.0]` spanned by the seller's quality levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferSpace {
    pub price: (f64, f64),
    pub delivery: (u32, u32),
    pub quality: (f64, f64),
    pub levels: Vec<QualityLevel>,
}

impl OfferSpace {
    /// Derive the search bounds from a seller profile.
    pub fn from_seller(seller: &SellerProfile) -> Result<Self> {
        let prefix = format!("sellers[{}]", seller.id);

        if !seller.min_price.is_finite() || seller.min_price <= 0.0 {
            return Err(NegotiationError::configuration(
                format!("{prefix}.minPrice"),
                format!("must be a positive number, got {}", seller.min_price),
            ));
        }
        if !seller.initial_offer.price.is_finite() || seller.min_price > seller.initial_offer.price {
            return Err(NegotiationError::configuration(
                format!("{prefix}.initialOffer.price"),
                format!(
                    "must be at least minPrice ({}), got {}",
                    seller.min_price, seller.initial_offer.price
                ),
            ));
        }
        if seller.min_delivery > seller.initial_offer.delivery {
            return Err(NegotiationError::configuration(
                format!("{prefix}.initialOffer.delivery"),
                format!(
                    "must be at least minDelivery ({}), got {}",
                    seller.min_delivery, seller.initial_offer.delivery
                ),
            ));
        }
        if seller.quality_levels.is_empty() {
            return Err(NegotiationError::configuration(
                format!("{prefix}.qualityLevels"),
                "at least one quality level is required",
            ));
        }

        let mut levels = seller.quality_levels.clone();
        levels.sort();
        levels.dedup();
        let low = levels[0].value();
        let high = levels[levels.len() - 1].value();

        Ok(OfferSpace {
            price: (seller.min_price, seller.initial_offer.price),
            delivery: (seller.min_delivery, seller.initial_offer.delivery),
            quality: (low, high),
            levels,
        })
    }

    /// Replace the quality range with explicit percentage bounds.
    pub fn with_quality_percent(mut self, low: f64, high: f64) -> Result<Self> {
        let (low, high) = (low / 100.0, high / 100.0);
        if !(low.is_finite() && high.is_finite()) || low > high {
            return Err(NegotiationError::configuration(
                "qualityPercent",
                format!("lower bound {} exceeds upper bound {}", low * 100.0, high * 100.0),
            ));
        }
        if low < QUALITY_MIN - LABEL_TOLERANCE || high > QUALITY_MAX + LABEL_TOLERANCE {
            return Err(NegotiationError::configuration(
                "qualityPercent",
                format!(
                    "bounds must lie within [{}, {}]",
                    QUALITY_MIN * 100.0,
                    QUALITY_MAX * 100.0
                ),
            ));
        }
        self.quality = (low, high);
        Ok(self)
    }

    /// Quality bounds as whole percentages.
    pub fn quality_percent(&self) -> (f64, f64) {
        (
            (self.quality.0 * 100.0).round(),
            (self.quality.1 * 100.0).round(),
        )
    }

    pub fn clamp_price(&self, price: f64) -> f64 {
        price.max(self.price.0).min(self.price.1)
    }

    /// Round to the nearest whole day and clamp.
    pub fn clamp_delivery(&self, delivery: f64) -> u32 {
        let rounded = delivery.round();
        rounded.max(self.delivery.0 as f64).min(self.delivery.1 as f64) as u32
    }

    pub fn clamp_quality(&self, quality: f64) -> f64 {
        quality.max(QUALITY_MIN).min(QUALITY_MAX)
    }

    pub fn contains(&self, offer: &Offer) -> bool {
        offer.price >= self.price.0
            && offer.price <= self.price.1
            && offer.delivery >= self.delivery.0
            && offer.delivery <= self.delivery.1
            && offer.quality.value >= QUALITY_MIN - LABEL_TOLERANCE
            && offer.quality.value <= QUALITY_MAX + LABEL_TOLERANCE
    }

    /// Draw a uniformly random offer whose quality is one of the seller's levels.
    pub fn random_offer<R: Rng + ?Sized>(&self, rng: &mut R) -> Offer {
        let price = rng.gen_range(self.price.0..=self.price.1);
        let delivery = rng.gen_range(self.delivery.0..=self.delivery.1);
        let level = *self
            .levels
            .choose(rng)
            .unwrap_or(&QualityLevel::Standard);
        Offer::new(price, delivery, level)
    }
}
