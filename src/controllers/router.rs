// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Routes watch notifications onto the work queue.

use crate::queue::WorkQueue;
use crate::types::ObjectKey;
use futures::{Stream, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::watcher;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Forward add/update notifications as queue keys. Whether any action is
/// actually needed is the policy's call, so every event enqueues. Deletes
/// carry no work: the controller owns a sub-field of the deployment, not
/// its lifecycle.
pub async fn route_events<S>(stream: S, queue: Arc<WorkQueue>)
where
    S: Stream<Item = Result<watcher::Event<Deployment>, watcher::Error>>,
{
    futures::pin_mut!(stream);

    while let Some(event) = stream.next().await {
        match event {
            Ok(watcher::Event::Apply(deployment))
            | Ok(watcher::Event::InitApply(deployment)) => {
                match ObjectKey::from_resource(&deployment) {
                    Ok(key) => {
                        debug!("queueing {}", key);
                        queue.add(key);
                    }
                    Err(e) => warn!("dropping notification without usable key: {}", e),
                }
            }
            Ok(watcher::Event::Delete(deployment)) => {
                debug!("ignoring delete of {}", deployment.name_any());
            }
            // Init/InitDone mark list boundaries and carry no object
            Ok(_) => {}
            Err(e) => warn!("watch stream error: {}, stream will retry", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;

    type WatchItem = Result<watcher::Event<Deployment>, watcher::Error>;

    fn make_deployment(namespace: Option<&str>, name: &str) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: namespace.map(String::from),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn route(events: Vec<WatchItem>) -> Arc<WorkQueue> {
        let queue = Arc::new(WorkQueue::new());
        route_events(futures::stream::iter(events), queue.clone()).await;
        queue
    }

    #[tokio::test]
    async fn test_apply_and_init_apply_enqueue_keys() {
        let queue = route(vec![
            Ok(watcher::Event::Init),
            Ok(watcher::Event::InitApply(make_deployment(Some("default"), "web"))),
            Ok(watcher::Event::InitDone),
            Ok(watcher::Event::Apply(make_deployment(Some("default"), "api"))),
        ])
        .await;

        assert_eq!(queue.get().await, Some(ObjectKey::new("default", "web")));
        assert_eq!(queue.get().await, Some(ObjectKey::new("default", "api")));
    }

    #[tokio::test]
    async fn test_events_for_the_same_key_coalesce() {
        let queue = route(vec![
            Ok(watcher::Event::Apply(make_deployment(Some("default"), "web"))),
            Ok(watcher::Event::Apply(make_deployment(Some("default"), "web"))),
            Ok(watcher::Event::Apply(make_deployment(Some("default"), "web"))),
        ])
        .await;

        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_deletes_are_ignored() {
        let queue = route(vec![Ok(watcher::Event::Delete(make_deployment(
            Some("default"),
            "web",
        )))])
        .await;

        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_unkeyable_objects_are_dropped() {
        let queue = route(vec![Ok(watcher::Event::Apply(make_deployment(None, "web")))]).await;

        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_stream_errors_do_not_stop_routing() {
        let queue = route(vec![
            Err(watcher::Error::NoResourceVersion),
            Ok(watcher::Event::Apply(make_deployment(Some("default"), "web"))),
        ])
        .await;

        assert_eq!(queue.len(), 1);
    }
}
