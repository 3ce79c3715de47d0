// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Demonstrates using `SingleSlot` to memoize a remote lookup that sometimes fails.
//!
//! The "remote service" fails on its first call. Five concurrent readers share that failed
//! attempt and each receive the fallback; the next reader starts a fresh attempt, which
//! succeeds and is cached for everyone after it.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use slotflight::SingleSlot;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let requests = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&requests);

    let sort_order = SingleSlot::new(
        move || {
            let request = counter.fetch_add(1, Ordering::AcqRel) + 1;
            async move {
                println!("  [remote] request #{request}");
                tokio::time::sleep(Duration::from_millis(200)).await;
                if request == 1 {
                    Err("service unavailable")
                } else {
                    Ok(vec!["tomato".to_string(), "basil".to_string(), "mint".to_string()])
                }
            }
        },
        Vec::new,
    );

    println!("Five concurrent readers while the service is down...");
    let handles: Vec<_> = (1..=5)
        .map(|reader| {
            let sort_order = sort_order.clone();
            tokio::spawn(async move {
                let order = sort_order.get_or_await().await;
                println!("  [reader {reader}] got {order:?}");
            })
        })
        .collect();
    for handle in handles {
        handle.await.expect("Task panicked");
    }

    println!("\nA later reader retries...");
    println!("  got {:?}", sort_order.get_or_await().await);

    println!("\nAnd is now served from the cache...");
    println!("  got {:?}", sort_order.get_or_await().await);

    println!(
        "\nRemote requests: {}, stats: {:?}",
        requests.load(Ordering::Acquire),
        sort_order.stats()
    );
}
