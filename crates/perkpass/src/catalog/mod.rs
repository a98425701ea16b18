//! Static registry of vendors, their benefits, and eligibility conditions.
//!
//! The catalog is immutable after construction and injected into the
//! redemption service, so tests run against synthetic catalogs while the
//! server loads the collective's real table.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::geo::{Geofence, GeofenceSet};

/// Identifier wrapper for vendors (shops) in the collective.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VendorKey(pub String);

impl VendorKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl std::fmt::Display for VendorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for a redeemable benefit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BenefitKey(pub String);

impl BenefitKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl std::fmt::Display for BenefitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of the per-pass monthly-remaining counter a benefit maps to, as it
/// appears among the external pass attributes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CounterName(pub String);

impl CounterName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for CounterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Purchase categories a benefit can be scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseScope {
    Cafe,
    Retail,
    Service,
}

/// Eligibility predicate attached to a benefit. Each variant is evaluated by
/// a dedicated check in the redemption engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BenefitCondition {
    /// The discount never applies to orders containing bottle purchases.
    ExcludeBottlePurchases,
    /// Redemption must be declared for the given purchase category.
    PurchaseScope(PurchaseScope),
    /// The cart must contain at least one paid unit of the named item.
    RequiresPaidItem(String),
    /// Redemption is only valid on the given day of the week.
    Weekday(Weekday),
}

impl BenefitCondition {
    /// Short label used in logs and denial summaries.
    pub fn label(&self) -> String {
        match self {
            BenefitCondition::ExcludeBottlePurchases => "excludes bottle purchases".to_string(),
            BenefitCondition::PurchaseScope(scope) => format!("limited to {scope:?} purchases"),
            BenefitCondition::RequiresPaidItem(item) => format!("requires a paid {item}"),
            BenefitCondition::Weekday(day) => format!("only valid on {day}"),
        }
    }
}

/// Static catalog entry for one shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub key: VendorKey,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A redeemable perk tied to one vendor with a monthly usage cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benefit {
    pub key: BenefitKey,
    pub vendor: VendorKey,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub max_per_month: u32,
    pub counter: CounterName,
    #[serde(default)]
    pub conditions: Vec<BenefitCondition>,
}

/// Read-only registry of vendors and benefits, preserving insertion order so
/// counter snapshots and tie-breaks stay deterministic.
#[derive(Debug, Clone, Default)]
pub struct BenefitCatalog {
    vendors: Vec<Vendor>,
    benefits: Vec<Benefit>,
}

impl BenefitCatalog {
    pub fn new(vendors: Vec<Vendor>, benefits: Vec<Benefit>) -> Self {
        Self { vendors, benefits }
    }

    pub fn vendors(&self) -> impl Iterator<Item = &Vendor> {
        self.vendors.iter()
    }

    pub fn vendor(&self, key: &VendorKey) -> Option<&Vendor> {
        self.vendors.iter().find(|vendor| &vendor.key == key)
    }

    pub fn lookup(&self, vendor: &VendorKey, benefit: &BenefitKey) -> Option<&Benefit> {
        self.benefits
            .iter()
            .find(|entry| &entry.vendor == vendor && &entry.key == benefit)
    }

    pub fn benefits_for<'a>(
        &'a self,
        vendor: &'a VendorKey,
    ) -> impl Iterator<Item = &'a Benefit> + 'a {
        self.benefits
            .iter()
            .filter(move |entry| &entry.vendor == vendor)
    }

    /// The vendor's single benefit, used when the caller does not
    /// disambiguate. Vendors offering several benefits get no default; the
    /// caller must name one explicitly.
    pub fn default_benefit(&self, vendor: &VendorKey) -> Option<&Benefit> {
        let mut candidates = self.benefits.iter().filter(|entry| &entry.vendor == vendor);
        let first = candidates.next()?;
        match candidates.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    /// Every counter with its monthly cap, in catalog order.
    pub fn counters(&self) -> impl Iterator<Item = (&CounterName, u32)> {
        self.benefits
            .iter()
            .map(|benefit| (&benefit.counter, benefit.max_per_month))
    }

    /// The collective's production table: seven shops around the square.
    pub fn collective() -> Self {
        fn vendor(key: &str, label: &str) -> Vendor {
            Vendor {
                key: VendorKey::new(key),
                label: label.to_string(),
                description: None,
            }
        }

        fn benefit(
            vendor: &str,
            key: &str,
            label: &str,
            counter: &str,
            conditions: Vec<BenefitCondition>,
        ) -> Benefit {
            Benefit {
                key: BenefitKey::new(key),
                vendor: VendorKey::new(vendor),
                label: label.to_string(),
                description: None,
                max_per_month: 1,
                counter: CounterName::new(counter),
                conditions,
            }
        }

        let vendors = vec![
            vendor("SONOMA", "Sonoma"),
            vendor("LITTLE_SISTER", "Little Sister"),
            vendor("FAT_CAT", "Fat Cat Creamery"),
            vendor("POLISH_BAR", "Polish Bar"),
            vendor("THREADFARE", "Threadfare"),
            vendor("KIDS_CREATE", "Kids Create"),
            vendor("TULUM", "Tulum Spa"),
        ];

        let benefits = vec![
            benefit(
                "SONOMA",
                "PERCENT_10",
                "10% Off Purchase",
                "sonoma_remaining",
                vec![BenefitCondition::ExcludeBottlePurchases],
            ),
            benefit(
                "LITTLE_SISTER",
                "CAFE_PERCENT_10",
                "10% Off Café",
                "littlesister_remaining",
                vec![BenefitCondition::PurchaseScope(PurchaseScope::Cafe)],
            ),
            benefit(
                "FAT_CAT",
                "BOGO_SCOOP",
                "Buy 1 Get 1 Scoop",
                "fatcat_remaining",
                vec![BenefitCondition::RequiresPaidItem("scoop".to_string())],
            ),
            benefit(
                "POLISH_BAR",
                "DAZZLE_DRY_UPGRADE",
                "Free Dazzle Dry Upgrade",
                "polishbar_remaining",
                Vec::new(),
            ),
            benefit(
                "THREADFARE",
                "PERCENT_10_1X",
                "10% Off (Once)",
                "threadfare_remaining",
                Vec::new(),
            ),
            benefit(
                "KIDS_CREATE",
                "FRIDAY_WORKSHOP",
                "Friday Workshop",
                "kidscreate_workshop_remaining",
                vec![BenefitCondition::Weekday(Weekday::Fri)],
            ),
            benefit(
                "KIDS_CREATE",
                "RETAIL_15_1X",
                "15% Off Retail",
                "kidscreate_retail_remaining",
                Vec::new(),
            ),
            benefit(
                "TULUM",
                "PERCENT_10",
                "10% Off Service/Retail",
                "tulum_remaining",
                Vec::new(),
            ),
        ];

        Self::new(vendors, benefits)
    }
}

/// The collective's production geofences. Every shop sits on the same block,
/// hence the tight 7 m radii.
pub fn collective_geofences() -> GeofenceSet {
    fn fence(vendor: &str, lat: f64, lng: f64) -> Geofence {
        Geofence {
            vendor: VendorKey::new(vendor),
            lat,
            lng,
            radius_meters: 7.0,
        }
    }

    GeofenceSet::new(vec![
        fence("SONOMA", 29.817091641171505, -95.4221111615325),
        fence("LITTLE_SISTER", 29.81713966152203, -95.42093737744574),
        fence("FAT_CAT", 29.81685471204442, -95.42190629708813),
        fence("POLISH_BAR", 29.816692217268653, -95.42183155692648),
        fence("THREADFARE", 29.816975016979047, -95.4209333541323),
        fence("KIDS_CREATE", 29.816755283414313, -95.42137848171349),
        fence("TULUM", 29.817021307396466, -95.42145858820318),
    ])
}
