//! # Fuel Module
//!
//! Road categories, per-100km fuel rates and the liters computation used for
//! every trip. All functions here are pure.

use serde::{Deserialize, Serialize};

/// Added before rounding so that values like `x.xx5` land on the upper side
/// instead of being pulled down by their binary representation.
pub const ROUNDING_EPSILON: f64 = 1e-9;

/// Road-type category a part of the trip belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoadCategory {
    City,
    District,
    Highway,
}

impl RoadCategory {
    /// All categories in ledger column order
    pub const ALL: [RoadCategory; 3] = [
        RoadCategory::City,
        RoadCategory::District,
        RoadCategory::Highway,
    ];

    /// Localization key used when the category is shown to the user
    pub fn label_key(self) -> &'static str {
        match self {
            RoadCategory::City => "category-city",
            RoadCategory::District => "category-district",
            RoadCategory::Highway => "category-highway",
        }
    }
}

/// Liters per 100 km for each road category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelRates {
    pub city: f64,
    pub district: f64,
    pub highway: f64,
}

impl Default for FuelRates {
    fn default() -> Self {
        Self {
            city: 12.0,
            district: 9.0,
            highway: 7.0,
        }
    }
}

impl FuelRates {
    /// Rate for a single category
    pub fn rate(&self, category: RoadCategory) -> f64 {
        match category {
            RoadCategory::City => self.city,
            RoadCategory::District => self.district,
            RoadCategory::Highway => self.highway,
        }
    }
}

/// Exact liters for `km` kilometers at `rate_per_100km`
pub fn exact_liters(km: u32, rate_per_100km: f64) -> f64 {
    km as f64 * rate_per_100km / 100.0
}

/// Standard 2-decimal rounding. Idempotent on already rounded values.
pub fn round2(value: f64) -> f64 {
    ((value + ROUNDING_EPSILON) * 100.0).round() / 100.0
}

/// Exact and rounded liters for one category or for the whole trip
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Liters {
    pub exact: f64,
    pub rounded: f64,
}

impl Liters {
    pub fn from_exact(exact: f64) -> Self {
        Self {
            exact,
            rounded: round2(exact),
        }
    }
}

/// Kilometers per road category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub city: u32,
    pub district: u32,
    pub highway: u32,
}

impl Distribution {
    pub fn new(city: u32, district: u32, highway: u32) -> Self {
        Self {
            city,
            district,
            highway,
        }
    }

    pub fn km(&self, category: RoadCategory) -> u32 {
        match category {
            RoadCategory::City => self.city,
            RoadCategory::District => self.district,
            RoadCategory::Highway => self.highway,
        }
    }

    /// Sum of the three categories
    pub fn total(&self) -> u64 {
        self.city as u64 + self.district as u64 + self.highway as u64
    }

    /// Example split shown in the distribution prompt: two equal thirds and
    /// the remainder on the highway.
    pub fn example_for(diff: u32) -> Self {
        let eq = diff / 3;
        Self::new(eq, eq, diff - 2 * eq)
    }
}

/// Fuel consumption of a trip, per category and in total
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Consumption {
    pub city: Liters,
    pub district: Liters,
    pub highway: Liters,
    pub total: Liters,
}

impl Consumption {
    /// Compute exact liters per category, then round each figure independently.
    /// The total is the sum of the exact values, rounded on its own.
    pub fn compute(distribution: &Distribution, rates: &FuelRates) -> Self {
        let city = exact_liters(distribution.city, rates.city);
        let district = exact_liters(distribution.district, rates.district);
        let highway = exact_liters(distribution.highway, rates.highway);

        Self {
            city: Liters::from_exact(city),
            district: Liters::from_exact(district),
            highway: Liters::from_exact(highway),
            total: Liters::from_exact(city + district + highway),
        }
    }

    pub fn for_category(&self, category: RoadCategory) -> Liters {
        match category {
            RoadCategory::City => self.city,
            RoadCategory::District => self.district,
            RoadCategory::Highway => self.highway,
        }
    }
}
