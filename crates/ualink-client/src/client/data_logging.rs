// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Periodic polling of a registered node set.
//!
//! [`DataLogger::start_logging`] registers the requested nodes once, then
//! reads them on a fixed interval until the request's token is cancelled,
//! handing every read batch to a [`LogSink`]. Cancellation is the normal way
//! to stop; it is checked before each read, raced against the read itself,
//! and raced against the interval wait.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::access::read_data_values;
use super::channel::Channel;
use super::connection::ConnectionManager;
use super::wrapper::ClientStats;
use crate::error::{ConfigurationError, Outcome, UaResult};
use crate::types::{DataValue, NodeId};

// =============================================================================
// Sinks
// =============================================================================

/// One read of the whole node set.
#[derive(Debug, Clone, PartialEq)]
pub struct DataLogBatch {
    /// 1-based iteration number.
    pub sequence: u64,
    /// When the read completed.
    pub timestamp: DateTime<Utc>,
    /// Values in request order, good or not.
    pub values: Vec<DataValue>,
}

/// Receives logging batches.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Called once per successful read.
    async fn on_batch(&self, batch: DataLogBatch);
}

/// Forwards batches into a bounded mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<DataLogBatch>,
}

impl ChannelSink {
    /// Creates a sink that sends into `sender`.
    pub fn new(sender: mpsc::Sender<DataLogBatch>) -> Self {
        Self { sender }
    }

    /// Creates a sink together with its receiver.
    pub fn with_channel(capacity: usize) -> (Self, mpsc::Receiver<DataLogBatch>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl LogSink for ChannelSink {
    async fn on_batch(&self, batch: DataLogBatch) {
        if self.sender.send(batch).await.is_err() {
            tracing::trace!("Logging receiver dropped");
        }
    }
}

/// Adapts a synchronous closure.
pub struct FnSink<F> {
    f: F,
}

impl<F> FnSink<F>
where
    F: Fn(DataLogBatch) + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> LogSink for FnSink<F>
where
    F: Fn(DataLogBatch) + Send + Sync,
{
    async fn on_batch(&self, batch: DataLogBatch) {
        (self.f)(batch)
    }
}

// =============================================================================
// Request / Report
// =============================================================================

/// A polling job.
#[derive(Clone)]
pub struct DataLoggingRequest {
    /// Nodes to read, in batch order.
    pub node_ids: Vec<NodeId>,
    /// Wait between reads.
    pub interval: Duration,
    /// Stops the job.
    pub token: CancellationToken,
    /// Receives every batch.
    pub sink: Arc<dyn LogSink>,
}

impl DataLoggingRequest {
    /// Creates a request with a fresh token.
    pub fn new(node_ids: Vec<NodeId>, interval: Duration, sink: Arc<dyn LogSink>) -> Self {
        Self {
            node_ids,
            interval,
            token: CancellationToken::new(),
            sink,
        }
    }

    /// Uses `token` to stop the job.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Creates a request from an interval in milliseconds.
    pub fn from_millis(node_ids: Vec<NodeId>, interval_ms: u64, sink: Arc<dyn LogSink>) -> Self {
        Self::new(node_ids, Duration::from_millis(interval_ms), sink)
    }

    /// Validates the request.
    pub fn validate(&self) -> UaResult<()> {
        if self.interval.is_zero() {
            return Err(ConfigurationError::invalid_value("interval", "must be greater than zero").into());
        }
        Ok(())
    }
}

impl fmt::Debug for DataLoggingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLoggingRequest")
            .field("node_ids", &self.node_ids)
            .field("interval", &self.interval)
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Summary of a finished logging job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggingReport {
    /// Reads issued.
    pub iterations: u64,
    /// Batches handed to the sink.
    pub batches_delivered: u64,
    /// Reads that failed.
    pub failed_reads: u64,
}

// =============================================================================
// DataLogger
// =============================================================================

/// Runs polling jobs on the current channel.
#[derive(Debug, Clone)]
pub struct DataLogger {
    connection: Arc<ConnectionManager>,
    stats: Arc<ClientStats>,
}

impl DataLogger {
    /// Creates a logger over `connection`.
    pub fn new(connection: Arc<ConnectionManager>, stats: Arc<ClientStats>) -> Self {
        Self { connection, stats }
    }

    /// Runs the job until its token is cancelled.
    ///
    /// # Errors
    ///
    /// A disconnected client, an invalid interval, and an empty node set
    /// (requested or registered) are returned as errors. A failed
    /// registration is [`Outcome::Failed`]. Individual read failures are
    /// logged and counted in the report.
    pub async fn start_logging(&self, request: DataLoggingRequest) -> UaResult<Outcome<LoggingReport>> {
        request.validate()?;
        let lease = self.connection.require_connected()?;

        if request.node_ids.is_empty() {
            return Err(ConfigurationError::NoRegisteredNodes { requested: 0 }.into());
        }

        let channel = lease.channel;
        let registered = match channel.register_nodes(&request.node_ids).await {
            Ok(registered) => registered,
            Err(error) => {
                self.stats.record_transport_failure();
                return Ok(Outcome::absorb(Err(error), "DataLogger::register_nodes"));
            }
        };

        if registered.is_empty() {
            return Err(ConfigurationError::NoRegisteredNodes {
                requested: request.node_ids.len(),
            }
            .into());
        }

        tracing::info!(
            node_count = registered.len(),
            interval = ?request.interval,
            "Data logging started"
        );

        let report = self.poll(channel.as_ref(), &registered, &request).await;

        if let Err(error) = channel.unregister_nodes(&registered).await {
            error.log("DataLogger::unregister_nodes");
        }

        tracing::info!(
            iterations = report.iterations,
            batches = report.batches_delivered,
            failed_reads = report.failed_reads,
            "Data logging stopped"
        );

        Ok(Outcome::Completed(report))
    }

    async fn poll(&self, channel: &dyn Channel, registered: &[NodeId], request: &DataLoggingRequest) -> LoggingReport {
        let token = &request.token;
        let mut report = LoggingReport::default();

        while !token.is_cancelled() {
            report.iterations += 1;
            self.stats.record_logging_iteration();

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                result = read_data_values(channel, registered) => result,
            };

            match result {
                Ok(values) => {
                    if token.is_cancelled() {
                        break;
                    }
                    let batch = DataLogBatch {
                        sequence: report.iterations,
                        timestamp: Utc::now(),
                        values,
                    };
                    request.sink.on_batch(batch).await;
                    report.batches_delivered += 1;
                }
                Err(error) => {
                    report.failed_reads += 1;
                    self.stats.record_transport_failure();
                    error.log("DataLogger::read");
                }
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(request.interval) => {}
            }
        }

        report
    }
}
