// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Shell sidecar controller - watch wiring, worker pool, and the per-key
//! sync handler.

use crate::cache::DeploymentCache;
use crate::config::Config;
use crate::controllers::{router, Context};
use crate::error::Result;
use crate::queue::WorkQueue;
use crate::reconcilers::sidecar;
use crate::types::ObjectKey;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::PostParams;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct ShellController {
    client: Client,
    config: Config,
}

impl ShellController {
    pub fn new(client: Client, config: Config) -> Self {
        Self { client, config }
    }

    /// Run until the shutdown future resolves. Workers only start once the
    /// deployment cache has seen a complete initial list; reconciling
    /// against a partial view could miss objects or act on stale state.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let api: Api<Deployment> = match &self.config.watch_namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };

        let (cache, writer) = DeploymentCache::new();
        let queue = Arc::new(WorkQueue::new());

        let events = watcher(api, watcher::Config::default())
            .default_backoff()
            .reflect(writer);
        let watch_task = tokio::spawn(router::route_events(events, queue.clone()));

        info!("Waiting for deployment cache to sync");
        tokio::pin!(shutdown);
        tokio::select! {
            res = cache.wait_until_synced() => {
                if let Err(e) = res {
                    watch_task.abort();
                    return Err(e);
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown before cache sync completed");
                watch_task.abort();
                return Ok(());
            }
        }
        info!("Deployment cache synced, starting {} workers", self.config.workers);

        let ctx = Arc::new(Context {
            client: self.client.clone(),
            cache,
            queue: queue.clone(),
        });

        let workers: Vec<_> = (0..self.config.workers)
            .map(|id| tokio::spawn(run_worker(id, ctx.clone())))
            .collect();

        shutdown.await;
        info!("Shutting down, draining workers");
        queue.shut_down();
        watch_task.abort();
        for worker in workers {
            let _ = worker.await;
        }

        Ok(())
    }
}

/// Pull keys until the queue shuts down. Failures go back through the
/// rate limiter; successes clear the key's backoff history.
async fn run_worker(id: usize, ctx: Arc<Context>) {
    while let Some(key) = ctx.queue.get().await {
        debug!("worker {} syncing {}", id, key);
        match sync_deployment(&ctx, &key).await {
            Ok(()) => {
                ctx.queue.forget(&key);
                debug!("successfully synced {}", key);
            }
            Err(e) => {
                warn!("error syncing {}: {}, requeueing", key, e);
                ctx.queue.add_rate_limited(key.clone());
            }
        }
        ctx.queue.done(&key);
    }
    debug!("worker {} exiting", id);
}

/// Reconcile one deployment against the sidecar policy. Reads the current
/// state from the cache rather than the triggering event, so a stale queue
/// entry converges on whatever the mirror holds now.
#[instrument(skip(ctx), fields(deployment = %key))]
async fn sync_deployment(ctx: &Context, key: &ObjectKey) -> Result<()> {
    let Some(deployment) = ctx.cache.get(key) else {
        // Never existed and deleted-after-enqueue look the same here;
        // neither leaves anything to correct.
        debug!("not in cache, nothing to reconcile");
        return Ok(());
    };

    let Some(desired) = sidecar::desired_deployment(&deployment) else {
        debug!("already in desired state");
        return Ok(());
    };

    // The cached resourceVersion rides along, so a concurrent writer turns
    // this into a conflict error and the key comes back with backoff.
    let api: Api<Deployment> = Api::namespaced(ctx.client.clone(), &key.namespace);
    api.replace(&key.name, &PostParams::default(), &desired)
        .await?;
    info!("applied sidecar update");

    Ok(())
}
