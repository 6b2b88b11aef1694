//! Drives the pipeline from change-feed batches for the lifetime of one page.

use crate::config::{ConfigError, VeilConfig};
use crate::dispatch::{Dispatcher, Suppressor};
use crate::feed::{ChangeBatch, NodeTable};
use crate::hash::DigestService;
use crate::pipeline::{CategoryPipeline, Outcome};
use crate::resolve::DigestResolver;
use crate::types::NodeHandle;
use std::sync::Arc;
use tokio::task::JoinSet;

pub struct Session {
    table: Arc<NodeTable>,
    pipeline: Arc<CategoryPipeline>,
    in_flight: JoinSet<(NodeHandle, Outcome)>,
    closed: bool,
}

impl Session {
    pub fn new(
        config: &VeilConfig,
        service: Arc<dyn DigestService>,
        suppressor: Arc<dyn Suppressor>,
    ) -> Result<Self, ConfigError> {
        let catalog = Arc::new(config.catalog()?);
        let table = Arc::new(NodeTable::new(config.props_prefix.clone()));
        let resolver = DigestResolver::new(catalog, service);
        let dispatcher = Dispatcher::new(config.hide_list(), suppressor);
        let pipeline = Arc::new(CategoryPipeline::new(table.clone(), resolver, dispatcher));
        Ok(Self {
            table,
            pipeline,
            in_flight: JoinSet::new(),
            closed: false,
        })
    }

    pub fn pipeline(&self) -> &CategoryPipeline {
        &self.pipeline
    }

    /// Apply one batch: forget removed nodes, then submit every added node and
    /// its descendants. Returns the number of submitted candidates.
    pub fn apply(&mut self, batch: ChangeBatch) -> usize {
        if self.closed {
            tracing::debug!("session closed, ignoring change batch");
            return 0;
        }
        for handle in &batch.removed {
            self.table.remove(handle);
            self.pipeline.processed().forget(handle);
        }
        let mut submitted = 0;
        for (handle, props) in batch.expand() {
            let generation = self.table.insert(handle.clone(), props);
            let pipeline = Arc::clone(&self.pipeline);
            let table = Arc::clone(&self.table);
            self.in_flight.spawn(async move {
                let outcome = pipeline.process(&handle).await;
                // A later report of the node carries its own props.
                table.release(&handle, generation);
                (handle, outcome)
            });
            submitted += 1;
        }
        submitted
    }

    /// Stop accepting batches. In-flight passes keep running.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Wait for every in-flight pass, in completion order.
    pub async fn drain(&mut self) -> Vec<(NodeHandle, Outcome)> {
        let mut done = Vec::new();
        while let Some(res) = self.in_flight.join_next().await {
            match res {
                Ok(pair) => done.push(pair),
                Err(e) => tracing::warn!(error = %e, "pipeline task failed"),
            }
        }
        done
    }
}
