// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Walks through a plant catalog backed by a flaky remote service.
//!
//! The sort order request fails once, so the first list comes out in name order. A refresh then
//! triggers a new emission, which retries the sort order and shows the custom order. Finally a
//! zone selection switches the feed to a single grow zone.

use std::time::Duration;

use futures_util::StreamExt;
use greenhouse::{FakePlantService, FakeServiceOptions, GrowZone, InMemoryPlantStore, Plant, PlantRepository};
use tokio::sync::watch;

fn print_plants(title: &str, plants: &[Plant]) {
    println!("{title}");
    for plant in plants {
        println!("  {:<16} {}", plant.name, plant.grow_zone_number);
    }
}

#[tokio::main]
async fn main() -> greenhouse::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let options = FakeServiceOptions::default()
        .with_latency(Duration::from_millis(200))
        .with_failing_requests(1);
    let service = FakePlantService::new(&options)?;
    let store = InMemoryPlantStore::with_plants(greenhouse::fixture_plants()?.into_iter().take(6));
    let repository = PlantRepository::builder(store, service.clone()).build()?;

    let mut plants = repository.plants();
    if let Some(first) = plants.next().await {
        print_plants("Sort order unavailable, sorted by name:", &first?);
    }

    repository.try_update_recent_plants_cache().await?;
    if let Some(refreshed) = plants.next().await {
        print_plants("\nAfter refresh, custom order:", &refreshed?);
    }

    let (zones, selection) = watch::channel(GrowZone::NONE);
    let mut selected = repository.plants_for_zone_selection(selection);
    if let Some(all) = selected.next().await {
        println!("\nNo zone selected: {} plants", all?.len());
    }

    let _ = zones.send(GrowZone::new(9));
    if let Some(zone_nine) = selected.next().await {
        print_plants("\nZone 9 selected:", &zone_nine?);
    }

    println!("\nService requests: {:?}", service.requests());
    println!("Sort order cache: {:?}", repository.sort_order_stats());
    Ok(())
}
