//! A fully computed trip, ready to be confirmed and written to the ledger.

use serde::{Deserialize, Serialize};

use crate::fuel::{Consumption, Distribution, FuelRates};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    /// Odometer reading at the end of the trip
    pub odometer: u32,
    /// Kilometers since the previous ledger row
    pub diff: u32,
    pub distribution: Distribution,
    pub consumption: Consumption,
}

impl Trip {
    /// Build a trip from an already validated distribution
    pub fn compute(
        odometer: u32,
        diff: u32,
        distribution: Distribution,
        rates: &FuelRates,
    ) -> Self {
        Self {
            odometer,
            diff,
            distribution,
            consumption: Consumption::compute(&distribution, rates),
        }
    }
}
