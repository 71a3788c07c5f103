//! Cars as reported by the car service.

use common::CarUid;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Result of a successful reservation: the car and its daily price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservedCar {
    pub car_uid: CarUid,
    /// Daily price in the smallest currency unit.
    pub price: Money,
}

/// A car record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub car_uid: CarUid,
    pub brand: String,
    pub model: String,
    pub registration_number: String,
    #[serde(default)]
    pub power: u32,
    pub price: Money,
    #[serde(rename = "type", default)]
    pub car_type: String,
    #[serde(default)]
    pub available: bool,
}

impl Car {
    /// The subset of car details shown inside a rental view.
    pub fn summary(&self) -> CarSummary {
        CarSummary {
            car_uid: self.car_uid,
            brand: self.brand.clone(),
            model: self.model.clone(),
            registration_number: self.registration_number.clone(),
        }
    }
}

/// Car details embedded in an aggregated rental view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarSummary {
    pub car_uid: CarUid,
    pub brand: String,
    pub model: String,
    pub registration_number: String,
}

/// One page of the car listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarsPage {
    pub page: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub items: Vec<Car>,
}

/// Paging and filter parameters for the car listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CarsQuery {
    pub page: u32,
    pub size: u32,
    /// Include cars that are currently reserved.
    pub show_all: bool,
}

impl Default for CarsQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: 10,
            show_all: false,
        }
    }
}
