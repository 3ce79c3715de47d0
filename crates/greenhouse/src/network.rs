// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The remote plant service and a simulated implementation of it.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, AtomicU64, Ordering},
    },
    time::Duration,
};

use serde::Deserialize;

use crate::{Error, GrowZone, Plant, PlantId, Result, fixture_plants, fixture_sort_order};

/// A remote source of plant records.
pub trait PlantService: Send + Sync + 'static {
    /// Fetches every plant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the request fails.
    fn all_plants(&self) -> impl Future<Output = Result<Vec<Plant>>> + Send;

    /// Fetches the plants that grow in `zone`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the request fails.
    fn plants_by_grow_zone(&self, zone: GrowZone) -> impl Future<Output = Result<Vec<Plant>>> + Send;

    /// Fetches the custom order in which plants should be listed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the request fails.
    fn custom_plant_sort_order(&self) -> impl Future<Output = Result<Vec<PlantId>>> + Send;
}

/// Configuration of a [`FakePlantService`].
///
/// Deserializes from JSON; missing fields take their default values.
///
/// ```
/// use std::time::Duration;
///
/// use greenhouse::FakeServiceOptions;
///
/// let options: FakeServiceOptions = serde_json::from_str(r#"{ "latency_ms": 250 }"#).unwrap();
/// assert_eq!(options.latency(), Duration::from_millis(250));
/// assert_eq!(options.failing_requests(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FakeServiceOptions {
    latency_ms: u64,
    failing_requests: u32,
}

impl FakeServiceOptions {
    /// Simulated round-trip time of every request.
    #[must_use]
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    /// Number of requests, counted from start-up, that fail before the service recovers.
    #[must_use]
    pub fn failing_requests(&self) -> u32 {
        self.failing_requests
    }

    /// Sets the simulated round-trip time. Sub-millisecond precision is dropped.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the number of requests that fail before the service recovers.
    #[must_use]
    pub fn with_failing_requests(mut self, requests: u32) -> Self {
        self.failing_requests = requests;
        self
    }
}

impl Default for FakeServiceOptions {
    fn default() -> Self {
        Self {
            latency_ms: 500,
            failing_requests: 0,
        }
    }
}

/// Number of requests a [`FakePlantService`] has received, per endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ServiceRequests {
    /// Calls to [`PlantService::all_plants`].
    pub all_plants: u64,
    /// Calls to [`PlantService::plants_by_grow_zone`].
    pub plants_by_grow_zone: u64,
    /// Calls to [`PlantService::custom_plant_sort_order`].
    pub custom_plant_sort_order: u64,
}

/// A [`PlantService`] that answers from fixed data after a simulated delay.
///
/// Failures can be injected with [`fail_next`](Self::fail_next). Clones share the same data,
/// failure budget and request counters.
#[derive(Debug, Clone)]
pub struct FakePlantService {
    inner: Arc<FakeInner>,
}

#[derive(Debug)]
struct FakeInner {
    plants: Vec<Plant>,
    sort_order: Vec<PlantId>,
    latency: Duration,
    failures_left: AtomicU32,
    all_plants: AtomicU64,
    plants_by_grow_zone: AtomicU64,
    custom_plant_sort_order: AtomicU64,
}

impl FakePlantService {
    /// Creates a service serving the built-in fixture catalog and sort order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the fixture data is malformed.
    pub fn new(options: &FakeServiceOptions) -> Result<Self> {
        Ok(Self::with_data(fixture_plants()?, fixture_sort_order()?, options))
    }

    /// Creates a service serving `plants` and `sort_order`.
    #[must_use]
    pub fn with_data(plants: Vec<Plant>, sort_order: Vec<PlantId>, options: &FakeServiceOptions) -> Self {
        Self {
            inner: Arc::new(FakeInner {
                plants,
                sort_order,
                latency: options.latency(),
                failures_left: AtomicU32::new(options.failing_requests()),
                all_plants: AtomicU64::new(0),
                plants_by_grow_zone: AtomicU64::new(0),
                custom_plant_sort_order: AtomicU64::new(0),
            }),
        }
    }

    /// Makes the next `requests` requests fail, whatever their endpoint.
    pub fn fail_next(&self, requests: u32) {
        self.inner.failures_left.store(requests, Ordering::SeqCst);
    }

    /// Returns how many requests each endpoint has received so far.
    #[must_use]
    pub fn requests(&self) -> ServiceRequests {
        ServiceRequests {
            all_plants: self.inner.all_plants.load(Ordering::SeqCst),
            plants_by_grow_zone: self.inner.plants_by_grow_zone.load(Ordering::SeqCst),
            custom_plant_sort_order: self.inner.custom_plant_sort_order.load(Ordering::SeqCst),
        }
    }

    async fn respond<T>(&self, endpoint: &'static str, counter: &AtomicU64, answer: impl FnOnce(&FakeInner) -> T) -> Result<T> {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.inner.latency).await;

        let failed = self
            .inner
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            tracing::debug!(endpoint, "simulating a failed request");
            return Err(Error::Network(format!("{endpoint}: service unavailable")));
        }

        Ok(answer(&self.inner))
    }
}

impl PlantService for FakePlantService {
    async fn all_plants(&self) -> Result<Vec<Plant>> {
        self.respond("all_plants", &self.inner.all_plants, |inner| inner.plants.clone())
            .await
    }

    async fn plants_by_grow_zone(&self, zone: GrowZone) -> Result<Vec<Plant>> {
        self.respond("plants_by_grow_zone", &self.inner.plants_by_grow_zone, |inner| {
            inner.plants.iter().filter(|plant| plant.grows_in(zone)).cloned().collect()
        })
        .await
    }

    async fn custom_plant_sort_order(&self) -> Result<Vec<PlantId>> {
        self.respond("custom_plant_sort_order", &self.inner.custom_plant_sort_order, |inner| {
            inner.sort_order.clone()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant() -> FakeServiceOptions {
        FakeServiceOptions::default().with_latency(Duration::ZERO)
    }

    #[tokio::test]
    async fn serves_fixture_catalog() {
        let service = FakePlantService::new(&instant()).expect("fixtures must decode");

        let plants = service.all_plants().await.expect("no failures injected");
        let order = service.custom_plant_sort_order().await.expect("no failures injected");

        assert_eq!(plants.len(), 12);
        assert!(!order.is_empty());
    }

    #[tokio::test]
    async fn filters_by_grow_zone() {
        let service = FakePlantService::new(&instant()).expect("fixtures must decode");

        let plants = service.plants_by_grow_zone(GrowZone::new(9)).await.expect("no failures injected");

        assert!(!plants.is_empty());
        assert!(plants.iter().all(|plant| plant.grows_in(GrowZone::new(9))));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let service = FakePlantService::with_data(vec![Plant::new("a", "Apple", GrowZone::new(3))], Vec::new(), &instant());
        service.fail_next(2);

        assert!(matches!(service.all_plants().await, Err(Error::Network(_))));
        assert!(matches!(service.custom_plant_sort_order().await, Err(Error::Network(_))));
        assert_eq!(service.all_plants().await.expect("failure budget is spent").len(), 1);
    }

    #[tokio::test]
    async fn failing_requests_option_fails_first_requests() {
        let options = instant().with_failing_requests(1);
        let service = FakePlantService::with_data(Vec::new(), Vec::new(), &options);

        assert!(service.all_plants().await.is_err());
        assert!(service.all_plants().await.is_ok());
    }

    #[tokio::test]
    async fn counts_requests_per_endpoint() {
        let service = FakePlantService::with_data(Vec::new(), Vec::new(), &instant());
        let clone = service.clone();

        let _ = service.all_plants().await;
        let _ = clone.plants_by_grow_zone(GrowZone::new(1)).await;
        let _ = clone.plants_by_grow_zone(GrowZone::new(2)).await;

        assert_eq!(
            service.requests(),
            ServiceRequests {
                all_plants: 1,
                plants_by_grow_zone: 2,
                custom_plant_sort_order: 0,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn responses_take_the_configured_latency() {
        let options = FakeServiceOptions::default().with_latency(Duration::from_millis(300));
        let service = FakePlantService::with_data(Vec::new(), Vec::new(), &options);

        let started = tokio::time::Instant::now();
        let _ = service.all_plants().await;

        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn options_reject_unknown_fields() {
        let result = serde_json::from_str::<FakeServiceOptions>(r#"{ "latency": 5 }"#);
        assert!(result.is_err());
    }
}
