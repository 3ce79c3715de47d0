// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A reactive plant catalog.
//!
//! [`PlantRepository`] observes a local [`PlantStore`] and emits every snapshot as a plant list
//! sorted by a custom order fetched from a [`PlantService`]. The custom order is memoized in a
//! [`slotflight::SingleSlot`], so it is requested at most once no matter how many feeds are
//! open, and a failed request degrades to plain name order instead of failing the feeds.
//!
//! - Feeds follow the store with latest-wins semantics: a snapshot that is replaced while its
//!   list is still being sorted is skipped.
//! - Large lists are sorted on tokio's blocking thread pool, see
//!   [`RepositoryOptions::with_offload_threshold`].
//! - [`InMemoryPlantStore`] and [`FakePlantService`] are ready-made implementations for demos
//!   and tests.
//!
//! # Example
//!
//! ```
//! use futures_util::StreamExt;
//! use greenhouse::{FakePlantService, FakeServiceOptions, GrowZone, InMemoryPlantStore, PlantRepository};
//!
//! # async fn example() -> greenhouse::Result<()> {
//! let service = FakePlantService::new(&FakeServiceOptions::default())?;
//! let repository = PlantRepository::builder(InMemoryPlantStore::new(), service).build()?;
//! repository.try_update_recent_plants_cache().await?;
//!
//! let mut zone_nine = repository.plants_with_grow_zone(GrowZone::new(9));
//! while let Some(plants) = zone_nine.next().await {
//!     for plant in plants? {
//!         println!("{}", plant.name);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod feed;
mod model;
mod network;
mod options;
mod repository;
mod sort;
mod store;

pub use error::{Error, Result};
pub use model::{DEFAULT_WATERING_INTERVAL, GrowZone, Plant, PlantId, fixture_plants, fixture_sort_order};
pub use network::{FakePlantService, FakeServiceOptions, PlantService, ServiceRequests};
pub use options::RepositoryOptions;
pub use repository::{PlantFeed, PlantRepository, PlantRepositoryBuilder};
pub use slotflight::SlotStats;
pub use sort::{CustomOrdered, apply_sort, sort_in_background};
pub use store::{InMemoryPlantStore, PlantQuery, PlantStore, PlantTable};
