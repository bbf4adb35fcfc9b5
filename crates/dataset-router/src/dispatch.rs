//! Fan-out of one inbound request to every target.
//!
//! Each target gets its own tokio task. Successful results land on an mpsc
//! channel sized to the number of targets, so no task ever waits on a send.
//! Failures are logged per target and never escalated.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::response::ForwardResult;
use crate::stats::RouterStats;
use crate::target::Target;

/// Forwards requests to all configured targets concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    targets: Arc<[Arc<Target>]>,
    stats: RouterStats,
}

impl Dispatcher {
    pub fn new(client: reqwest::Client, targets: Vec<Target>, stats: RouterStats) -> Self {
        let targets: Arc<[Arc<Target>]> = targets.into_iter().map(Arc::new).collect();
        Self {
            client,
            targets,
            stats,
        }
    }

    pub fn targets(&self) -> &[Arc<Target>] {
        &self.targets
    }

    /// Send `request` to every target and wait until all of them finished.
    ///
    /// The returned receiver holds one result per target that answered 200
    /// and is already closed, so draining it terminates. Results are in
    /// completion order.
    ///
    /// The forward tasks are owned by this future: if it is dropped (the
    /// inbound connection went away), every in-flight forward is aborted.
    pub async fn dispatch(
        &self,
        request: &serde_json::Value,
    ) -> Result<mpsc::Receiver<ForwardResult>, serde_json::Error> {
        let body = Bytes::from(serde_json::to_vec(request)?);
        let (tx, rx) = mpsc::channel(self.targets.len().max(1));
        let mut tasks = JoinSet::new();

        for target in self.targets.iter() {
            let target = Arc::clone(target);
            let client = self.client.clone();
            let stats = self.stats.clone();
            let body = body.clone();
            let tx = tx.clone();

            tracing::debug!(target = %target.name(), "Forwarding request to target");

            tasks.spawn(async move {
                match target.forward(&client, body).await {
                    Ok(result) => {
                        stats.inc_forward_succeeded();
                        if let Err(e) = tx.try_send(result) {
                            tracing::error!(target = %target.name(), error = %e, "Result channel rejected response");
                        }
                    }
                    Err(e) => {
                        stats.inc_forward_failed();
                        tracing::warn!(target = %target.name(), error = %e, "Failed to forward request to target");
                    }
                }
            });
        }

        // The channel closes once the last task drops its sender.
        drop(tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Forward task did not complete");
            }
        }

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::CommonConfig;
    use crate::testing::{MockTarget, Script};

    async fn drain(mut rx: mpsc::Receiver<ForwardResult>) -> Vec<ForwardResult> {
        let mut out = Vec::new();
        while let Some(result) = rx.recv().await {
            out.push(result);
        }
        out
    }

    #[tokio::test]
    async fn test_only_successful_targets_produce_results() {
        let ok = MockTarget::start(Script::new().dataset(200, r#"{"dataSet":"{}"}"#)).await;
        let failing = MockTarget::start(Script::new().dataset_always(502, "bad gateway")).await;
        let retrying = MockTarget::start(Script::new().dataset_always(400, "bad")).await;

        let common = Arc::new(CommonConfig::default());
        let targets = vec![
            Target::new(&ok.config("ok"), common.clone()),
            Target::new(&failing.config("failing"), common.clone()),
            Target::new(&retrying.config("retrying"), common),
        ];
        let stats = RouterStats::new();
        let dispatcher = Dispatcher::new(reqwest::Client::new(), targets, stats.clone());

        let request = json!({"restrictedText": "X", "dataSet": "{}"});
        let results = drain(dispatcher.dispatch(&request).await.unwrap()).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].target, "ok");

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.forwards_succeeded, 1);
        assert_eq!(snapshot.forwards_failed, 2);

        // Every target saw the same serialized body.
        let sent: serde_json::Value =
            serde_json::from_slice(&failing.dataset_calls()[0].body).unwrap();
        assert_eq!(sent, request);
    }

    #[tokio::test]
    async fn test_all_targets_answer() {
        let mut mocks = Vec::new();
        for _ in 0..4 {
            mocks.push(MockTarget::start(Script::new().dataset(200, r#"{"dataSet":"{}"}"#)).await);
        }
        let common = Arc::new(CommonConfig::default());
        let targets = mocks
            .iter()
            .enumerate()
            .map(|(i, m)| Target::new(&m.config(&format!("t{i}")), common.clone()))
            .collect();
        let dispatcher = Dispatcher::new(reqwest::Client::new(), targets, RouterStats::new());

        let results = drain(dispatcher.dispatch(&json!({})).await.unwrap()).await;

        let mut names: Vec<_> = results.into_iter().map(|r| r.target).collect();
        names.sort();
        assert_eq!(names, vec!["t0", "t1", "t2", "t3"]);
    }

    #[tokio::test]
    async fn test_no_targets_yields_closed_empty_channel() {
        let dispatcher = Dispatcher::new(reqwest::Client::new(), Vec::new(), RouterStats::new());
        let results = drain(dispatcher.dispatch(&json!({})).await.unwrap()).await;
        assert!(results.is_empty());
    }
}
