// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Plant records and the fixture catalog served by the fake plant service.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::Result;

const FIXTURE_PLANTS: &str = include_str!("../data/plants.json");
const FIXTURE_SORT_ORDER: &str = include_str!("../data/sort_order.json");

/// Days between waterings for records that do not specify an interval.
pub const DEFAULT_WATERING_INTERVAL: u32 = 7;

/// Stable identifier of a plant, for example `"solanum-lycopersicum"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlantId(String);

impl PlantId {
    /// Creates an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PlantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A USDA hardiness zone, used to filter the catalog.
///
/// [`GrowZone::NONE`] stands for "no zone selected" and disables filtering where a zone
/// selection is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrowZone(i32);

impl GrowZone {
    /// No zone selected.
    pub const NONE: Self = Self(-1);

    /// Creates a zone from its number.
    #[must_use]
    pub const fn new(number: i32) -> Self {
        Self(number)
    }

    /// Returns the zone number.
    #[must_use]
    pub const fn number(self) -> i32 {
        self.0
    }

    /// Returns `true` for [`GrowZone::NONE`].
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }
}

impl Default for GrowZone {
    fn default() -> Self {
        Self::NONE
    }
}

impl Display for GrowZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("no zone")
        } else {
            write!(f, "zone {}", self.0)
        }
    }
}

/// A plant record as stored locally and served by the plant service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    /// Stable identifier.
    pub plant_id: PlantId,
    /// Display name; the tie-breaker when sorting by a custom order.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Hardiness zone the plant grows in.
    pub grow_zone_number: GrowZone,
    /// Days between waterings.
    #[serde(default = "default_watering_interval")]
    pub watering_interval: u32,
    /// Picture of the plant.
    #[serde(default)]
    pub image_url: String,
}

fn default_watering_interval() -> u32 {
    DEFAULT_WATERING_INTERVAL
}

impl Plant {
    /// Creates a plant with an empty description and image and the default watering interval.
    #[must_use]
    pub fn new(plant_id: impl Into<PlantId>, name: impl Into<String>, grow_zone: GrowZone) -> Self {
        Self {
            plant_id: plant_id.into(),
            name: name.into(),
            description: String::new(),
            grow_zone_number: grow_zone,
            watering_interval: DEFAULT_WATERING_INTERVAL,
            image_url: String::new(),
        }
    }

    /// Returns `true` if the plant grows in `zone`.
    #[must_use]
    pub fn grows_in(&self, zone: GrowZone) -> bool {
        self.grow_zone_number == zone
    }
}

/// Decodes the built-in plant catalog.
///
/// # Errors
///
/// Returns [`Error::Decode`](crate::Error::Decode) if the embedded document is malformed.
pub fn fixture_plants() -> Result<Vec<Plant>> {
    Ok(serde_json::from_str(FIXTURE_PLANTS)?)
}

/// Decodes the built-in custom sort order.
///
/// # Errors
///
/// Returns [`Error::Decode`](crate::Error::Decode) if the embedded document is malformed.
pub fn fixture_sort_order() -> Result<Vec<PlantId>> {
    Ok(serde_json::from_str(FIXTURE_SORT_ORDER)?)
}
