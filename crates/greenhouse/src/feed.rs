// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Turns an observable store query into a stream of custom-sorted plant lists.

use std::pin::Pin;

use futures_util::{Stream, stream};
use slotflight::SingleSlot;

use crate::{Plant, PlantId, PlantQuery, Result, sort_in_background};

enum FeedState {
    /// Emit the current snapshot without waiting for a change.
    Subscribe(Result<PlantQuery>),
    /// Wait for the next snapshot, then emit it.
    Next(PlantQuery),
    Done,
}

/// Emits one sorted list per store snapshot.
///
/// A snapshot that is superseded while its list is still being sorted is dropped together with
/// its sort, so the stream always converges on the latest snapshot. A pending fetch of the custom
/// order is kept across snapshots. A failed subscription is emitted as a single error item. The
/// stream ends once the store is gone.
pub(crate) fn sorted(
    query: Result<PlantQuery>,
    sort_order: SingleSlot<Vec<PlantId>>,
    offload_threshold: usize,
) -> impl Stream<Item = Result<Vec<Plant>>> + Send + 'static {
    stream::unfold(FeedState::Subscribe(query), move |state| {
        let sort_order = sort_order.clone();
        async move {
            match state {
                FeedState::Subscribe(Ok(query)) => next_batch(query, sort_order, offload_threshold, false).await,
                FeedState::Subscribe(Err(error)) => {
                    tracing::warn!(%error, "cannot observe plant store");
                    Some((Err(error), FeedState::Done))
                }
                FeedState::Next(query) => next_batch(query, sort_order, offload_threshold, true).await,
                FeedState::Done => None,
            }
        }
    })
}

async fn next_batch(
    mut query: PlantQuery,
    sort_order: SingleSlot<Vec<PlantId>>,
    offload_threshold: usize,
    wait_for_change: bool,
) -> Option<(Result<Vec<Plant>>, FeedState)> {
    if wait_for_change && query.changed().await.is_err() {
        tracing::debug!("plant store closed, ending feed");
        return None;
    }

    // Only the sort restarts on a newer snapshot; the wait for the custom order carries over.
    let order = sort_order.get_or_await();
    tokio::pin!(order);
    let mut resolved = None;

    loop {
        let sorting = sort_plants(query.current(), order.as_mut(), &mut resolved, offload_threshold);
        tokio::pin!(sorting);

        tokio::select! {
            biased;

            changed = query.changed() => {
                if changed.is_err() {
                    // No newer snapshot can arrive; the pending one is final.
                    return Some((sorting.await, FeedState::Done));
                }
                tracing::debug!(zone = ?query.zone(), "newer snapshot arrived, dropping stale sort");
            }
            sorted = &mut sorting => return Some((sorted, FeedState::Next(query))),
        }
    }
}

/// Sorts `plants` by the custom order, awaiting `order` only until it has resolved once.
async fn sort_plants<F>(
    plants: Vec<Plant>,
    order: Pin<&mut F>,
    resolved: &mut Option<Vec<PlantId>>,
    offload_threshold: usize,
) -> Result<Vec<Plant>>
where
    F: Future<Output = Vec<PlantId>>,
{
    let custom = match resolved.clone() {
        Some(custom) => custom,
        None => {
            let custom = order.await;
            *resolved = Some(custom.clone());
            custom
        }
    };
    sort_in_background(plants, custom, offload_threshold).await
}
