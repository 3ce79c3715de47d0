// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Local plant storage with observable queries.

use std::{collections::BTreeMap, sync::Arc};

use tokio::sync::watch;

use crate::{Error, GrowZone, Plant, PlantId, Result};

/// All rows of a plant store, keyed by plant id.
pub type PlantTable = BTreeMap<PlantId, Plant>;

/// Local storage for plant records.
///
/// Queries are observable: a [`PlantQuery`] yields the current result and can wait for the
/// store to publish a newer one.
pub trait PlantStore: Send + Sync + 'static {
    /// Starts observing every plant, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the store cannot serve queries.
    fn observe_all(&self) -> Result<PlantQuery>;

    /// Starts observing the plants that grow in `zone`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the store cannot serve queries.
    fn observe_by_zone(&self, zone: GrowZone) -> Result<PlantQuery>;

    /// Inserts `plants`, replacing stored rows with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the write cannot be applied.
    fn upsert_all(&self, plants: Vec<Plant>) -> impl Future<Output = Result<()>> + Send;
}

/// A live query over a plant store.
#[derive(Debug, Clone)]
pub struct PlantQuery {
    rows: watch::Receiver<Arc<PlantTable>>,
    zone: Option<GrowZone>,
}

impl PlantQuery {
    /// Creates a query over the snapshots published on `rows`, optionally limited to `zone`.
    #[must_use]
    pub fn new(rows: watch::Receiver<Arc<PlantTable>>, zone: Option<GrowZone>) -> Self {
        Self { rows, zone }
    }

    /// Returns the zone this query is limited to, if any.
    #[must_use]
    pub fn zone(&self) -> Option<GrowZone> {
        self.zone
    }

    /// Returns the result for the latest snapshot and marks that snapshot as seen.
    pub fn current(&mut self) -> Vec<Plant> {
        let table = Arc::clone(&self.rows.borrow_and_update());
        self.select(&table)
    }

    /// Waits until the store publishes a snapshot newer than the last one seen.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] once the store is gone and no newer snapshot can arrive.
    pub async fn changed(&mut self) -> Result<()> {
        self.rows.changed().await.map_err(|error| Error::Storage(error.to_string()))
    }

    fn select(&self, table: &PlantTable) -> Vec<Plant> {
        let mut plants: Vec<Plant> = table
            .values()
            .filter(|plant| self.zone.is_none_or(|zone| plant.grows_in(zone)))
            .cloned()
            .collect();
        plants.sort_by(|left, right| left.name.cmp(&right.name).then_with(|| left.plant_id.cmp(&right.plant_id)));
        plants
    }
}

/// A [`PlantStore`] that keeps every row in memory.
///
/// Every call to [`upsert_all`](PlantStore::upsert_all) publishes exactly one new snapshot to
/// all open queries. Clones share the same rows.
#[derive(Debug, Clone)]
pub struct InMemoryPlantStore {
    rows: Arc<watch::Sender<Arc<PlantTable>>>,
}

impl InMemoryPlantStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (rows, _) = watch::channel(Arc::new(PlantTable::new()));
        Self { rows: Arc::new(rows) }
    }

    /// Creates a store holding `plants`.
    #[must_use]
    pub fn with_plants(plants: impl IntoIterator<Item = Plant>) -> Self {
        let table = plants.into_iter().map(|plant| (plant.plant_id.clone(), plant)).collect();
        let (rows, _) = watch::channel(Arc::new(table));
        Self { rows: Arc::new(rows) }
    }

    /// Returns the number of stored plants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    /// Returns `true` if no plants are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    /// Returns the stored plant with `id`.
    #[must_use]
    pub fn get(&self, id: &PlantId) -> Option<Plant> {
        self.rows.borrow().get(id).cloned()
    }
}

impl Default for InMemoryPlantStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlantStore for InMemoryPlantStore {
    fn observe_all(&self) -> Result<PlantQuery> {
        Ok(PlantQuery::new(self.rows.subscribe(), None))
    }

    fn observe_by_zone(&self, zone: GrowZone) -> Result<PlantQuery> {
        Ok(PlantQuery::new(self.rows.subscribe(), Some(zone)))
    }

    async fn upsert_all(&self, plants: Vec<Plant>) -> Result<()> {
        let count = plants.len();
        self.rows.send_modify(|table| {
            let table = Arc::make_mut(table);
            for plant in plants {
                table.insert(plant.plant_id.clone(), plant);
            }
        });
        tracing::debug!(count, "upserted plants");
        Ok(())
    }
}
