// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{fmt, sync::Arc};

use futures_util::{StreamExt, stream::BoxStream};
use slotflight::{SingleSlot, SlotStats};
use tokio::sync::watch;

use crate::{GrowZone, Plant, PlantId, PlantService, PlantStore, RepositoryOptions, Result, feed};

/// A stream of custom-sorted plant lists, one per store snapshot.
pub type PlantFeed = BoxStream<'static, Result<Vec<Plant>>>;

/// Serves plant lists from a local store, sorted by a custom order fetched once from a plant
/// service.
///
/// The custom order is memoized: the first feed that needs it fetches it, concurrent feeds wait
/// for that one request, and later feeds reuse the result. If the request fails, lists are
/// sorted by name until a later emission retries and succeeds.
///
/// Clones share the store, the service and the memoized order.
///
/// # Examples
///
/// ```
/// use futures_util::StreamExt;
/// use greenhouse::{FakePlantService, FakeServiceOptions, InMemoryPlantStore, PlantRepository};
///
/// # async fn example() -> greenhouse::Result<()> {
/// let service = FakePlantService::new(&FakeServiceOptions::default())?;
/// let repository = PlantRepository::builder(InMemoryPlantStore::new(), service).build()?;
///
/// repository.try_update_recent_plants_cache().await?;
///
/// let mut plants = repository.plants();
/// if let Some(Ok(sorted)) = plants.next().await {
///     println!("{} plants", sorted.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct PlantRepository<S, N> {
    store: Arc<S>,
    service: Arc<N>,
    sort_order: SingleSlot<Vec<PlantId>>,
    options: RepositoryOptions,
}

impl<S, N> PlantRepository<S, N>
where
    S: PlantStore,
    N: PlantService,
{
    /// Starts building a repository over `store` and `service`.
    #[must_use]
    pub fn builder(store: S, service: N) -> PlantRepositoryBuilder<S, N> {
        PlantRepositoryBuilder {
            store,
            service,
            options: RepositoryOptions::default(),
        }
    }

    /// Returns the options this repository was built with.
    #[must_use]
    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    /// Observes every stored plant, custom-sorted.
    ///
    /// The first item reflects the store as it is now; a new item follows every store update.
    /// If the store cannot be observed, the stream yields that error and ends.
    #[must_use]
    pub fn plants(&self) -> PlantFeed {
        feed::sorted(self.store.observe_all(), self.sort_order.clone(), self.options.offload_threshold()).boxed()
    }

    /// Observes the stored plants that grow in `zone`, custom-sorted.
    ///
    /// Behaves like [`plants`](Self::plants) otherwise.
    #[must_use]
    pub fn plants_with_grow_zone(&self, zone: GrowZone) -> PlantFeed {
        feed::sorted(
            self.store.observe_by_zone(zone),
            self.sort_order.clone(),
            self.options.offload_threshold(),
        )
        .boxed()
    }

    /// Observes the plants of whichever zone is currently selected on `zones`.
    ///
    /// [`GrowZone::NONE`] selects every plant. Each selection change drops the feed of the
    /// previous zone, including any sort still running for it. Once `zones` is closed, the feed
    /// of the last selected zone keeps running. The stream ends when that feed ends.
    #[must_use]
    pub fn plants_for_zone_selection(&self, mut zones: watch::Receiver<GrowZone>) -> PlantFeed {
        let zone = *zones.borrow_and_update();
        let switch = ZoneSwitch {
            inner: self.plants_for_zone(zone),
            repository: self.clone(),
            zones,
            zones_closed: false,
        };

        futures_util::stream::unfold(switch, |mut switch| async move {
            loop {
                if switch.zones_closed {
                    let item = switch.inner.next().await;
                    return item.map(|item| (item, switch));
                }

                tokio::select! {
                    biased;

                    changed = switch.zones.changed() => match changed {
                        Ok(()) => {
                            let zone = *switch.zones.borrow_and_update();
                            tracing::debug!(%zone, "grow zone selection changed");
                            switch.inner = switch.repository.plants_for_zone(zone);
                        }
                        Err(_) => switch.zones_closed = true,
                    },
                    item = switch.inner.next() => return item.map(|item| (item, switch)),
                }
            }
        })
        .boxed()
    }

    /// Returns the custom sort order, fetching it if it is not cached yet.
    ///
    /// Returns an empty order if the fetch fails.
    pub async fn custom_sort_order(&self) -> Vec<PlantId> {
        self.sort_order.get_or_await().await
    }

    /// Returns the activity counters of the memoized sort order.
    #[must_use]
    pub fn sort_order_stats(&self) -> SlotStats {
        self.sort_order.stats()
    }

    /// Fetches every plant from the service and stores it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`](crate::Error::Network) if the fetch fails and
    /// [`Error::Storage`](crate::Error::Storage) if the write fails. Nothing is stored on error.
    pub async fn try_update_recent_plants_cache(&self) -> Result<()> {
        let fetched = self.service.all_plants().await;
        self.store_refreshed(fetched, GrowZone::NONE).await
    }

    /// Fetches the plants that grow in `zone` from the service and stores them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`](crate::Error::Network) if the fetch fails and
    /// [`Error::Storage`](crate::Error::Storage) if the write fails. Nothing is stored on error.
    pub async fn try_update_recent_plants_for_grow_zone_cache(&self, zone: GrowZone) -> Result<()> {
        let fetched = self.service.plants_by_grow_zone(zone).await;
        self.store_refreshed(fetched, zone).await
    }

    fn plants_for_zone(&self, zone: GrowZone) -> PlantFeed {
        if zone.is_none() {
            self.plants()
        } else {
            self.plants_with_grow_zone(zone)
        }
    }

    async fn store_refreshed(&self, fetched: Result<Vec<Plant>>, zone: GrowZone) -> Result<()> {
        let stored = match fetched {
            Ok(plants) => {
                let count = plants.len();
                self.store.upsert_all(plants).await.map(|()| count)
            }
            Err(error) => Err(error),
        };

        match stored {
            Ok(count) => {
                tracing::info!(count, %zone, "refreshed plant cache");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, %zone, "plant cache refresh failed");
                Err(error)
            }
        }
    }
}

impl<S, N> Clone for PlantRepository<S, N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            service: Arc::clone(&self.service),
            sort_order: self.sort_order.clone(),
            options: self.options.clone(),
        }
    }
}

impl<S, N> fmt::Debug for PlantRepository<S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlantRepository")
            .field("options", &self.options)
            .field("sort_order", &self.sort_order)
            .finish_non_exhaustive()
    }
}

struct ZoneSwitch<S, N> {
    repository: PlantRepository<S, N>,
    zones: watch::Receiver<GrowZone>,
    inner: PlantFeed,
    zones_closed: bool,
}

/// Builder for [`PlantRepository`].
#[derive(Debug)]
pub struct PlantRepositoryBuilder<S, N> {
    store: S,
    service: N,
    options: RepositoryOptions,
}

impl<S, N> PlantRepositoryBuilder<S, N>
where
    S: PlantStore,
    N: PlantService,
{
    /// Replaces all options.
    #[must_use]
    pub fn options(mut self, options: RepositoryOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the list length from which sorting is moved to the blocking thread pool.
    #[must_use]
    pub fn offload_threshold(mut self, threshold: usize) -> Self {
        self.options = self.options.with_offload_threshold(threshold);
        self
    }

    /// Builds the repository.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the options are out of
    /// range.
    pub fn build(self) -> Result<PlantRepository<S, N>> {
        self.options.validate()?;

        let service = Arc::new(self.service);
        let fetcher = Arc::clone(&service);
        let sort_order = SingleSlot::new(
            move || {
                let service = Arc::clone(&fetcher);
                async move { service.custom_plant_sort_order().await }
            },
            Vec::new,
        );

        Ok(PlantRepository {
            store: Arc::new(self.store),
            service,
            sort_order,
            options: self.options,
        })
    }
}
