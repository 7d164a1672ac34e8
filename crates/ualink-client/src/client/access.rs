// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Batch read and write of node values.

use std::sync::Arc;

use super::channel::{Channel, ReadValueId, WriteValue};
use super::connection::ConnectionManager;
use super::wrapper::ClientStats;
use crate::error::{Outcome, TransportError, UaResult};
use crate::types::{AttributeId, DataValue, NodeId, StatusCode, Variant};

/// Reads and writes the Value attribute of nodes over the current channel.
#[derive(Debug, Clone)]
pub struct NodeAccess {
    connection: Arc<ConnectionManager>,
    stats: Arc<ClientStats>,
}

impl NodeAccess {
    /// Creates a facade over `connection`.
    pub fn new(connection: Arc<ConnectionManager>, stats: Arc<ClientStats>) -> Self {
        Self { connection, stats }
    }

    /// Reads the current value of each node, in one request.
    ///
    /// The result has one entry per input id, in input order: the value when
    /// the server reported a good status, otherwise `None`.
    ///
    /// # Errors
    ///
    /// Returns a precondition error, without touching the channel, when the
    /// client is not connected. Transport failures are logged and returned as
    /// [`Outcome::Failed`].
    pub async fn read_values(&self, node_ids: &[NodeId]) -> UaResult<Outcome<Vec<Option<Variant>>>> {
        let lease = self.connection.require_connected()?;

        if node_ids.is_empty() {
            return Ok(Outcome::Completed(Vec::new()));
        }

        let result = read_data_values(lease.channel.as_ref(), node_ids).await;
        self.stats.record_read(node_ids.len(), result.is_ok());

        let values = result.map(|values| {
            values
                .into_iter()
                .zip(node_ids)
                .map(|(value, node_id)| {
                    if !value.status.is_good() {
                        tracing::debug!(node_id = %node_id, status = %value.status, "Read returned non-good status");
                    }
                    value.into_good_value()
                })
                .collect()
        });

        Ok(Outcome::absorb(values, "NodeAccess::read_values"))
    }

    /// Writes each value to its node, in one request.
    ///
    /// Returns the per-item status codes in input order.
    ///
    /// # Errors
    ///
    /// Same precondition and transport handling as [`NodeAccess::read_values`].
    pub async fn write_values(&self, writes: &[(NodeId, Variant)]) -> UaResult<Outcome<Vec<StatusCode>>> {
        let lease = self.connection.require_connected()?;

        if writes.is_empty() {
            return Ok(Outcome::Completed(Vec::new()));
        }

        let request: Vec<WriteValue> = writes
            .iter()
            .map(|(node_id, value)| WriteValue {
                node_id: node_id.clone(),
                attribute_id: AttributeId::Value,
                value: DataValue {
                    value: Some(value.clone()),
                    ..DataValue::default()
                },
            })
            .collect();

        let result = lease.channel.write(&request).await.and_then(|statuses| {
            if statuses.len() != request.len() {
                return Err(TransportError::response_mismatch("Write", request.len(), statuses.len()).into());
            }
            Ok(statuses)
        });

        self.stats.record_write(writes.len(), result.is_ok());

        if let Ok(statuses) = &result {
            let rejected = statuses.iter().filter(|s| !s.is_good()).count();
            tracing::debug!(count = writes.len(), rejected, "Write completed");
        }

        Ok(Outcome::absorb(result, "NodeAccess::write_values"))
    }
}

/// Reads the Value attribute of `node_ids`, checking the response length.
pub(crate) async fn read_data_values(
    channel: &dyn Channel,
    node_ids: &[NodeId],
) -> UaResult<Vec<DataValue>> {
    let request: Vec<ReadValueId> = node_ids.iter().cloned().map(ReadValueId::value).collect();
    let values = channel.read(&request).await?;

    if values.len() != request.len() {
        return Err(TransportError::response_mismatch("Read", request.len(), values.len()).into());
    }

    tracing::trace!(count = values.len(), "Read completed");
    Ok(values)
}
