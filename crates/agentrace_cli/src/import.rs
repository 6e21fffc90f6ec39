//! Load recorded traces from JSON files.

use agentrace_core::{AgentRecord, SpanRecord, TraceId};
use agentrace_store::{StateStore, StoreResult};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Agents and spans of one or more traces
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TraceBundle {
    pub agents: Vec<AgentRecord>,
    pub spans: Vec<SpanRecord>,
}

impl TraceBundle {
    /// Traces referenced by the bundle
    pub fn trace_ids(&self) -> BTreeSet<TraceId> {
        self.agents
            .iter()
            .map(|a| a.trace_id)
            .chain(self.spans.iter().map(|s| s.trace_id))
            .collect()
    }

    /// Write every record; existing records with the same id are replaced
    pub async fn ingest(self, store: &dyn StateStore) -> StoreResult<()> {
        debug!(agents = self.agents.len(), spans = self.spans.len(), "ingesting trace bundle");
        for agent in self.agents {
            store.put_agent(agent).await?;
        }
        for span in self.spans {
            store.put_span(span).await?;
        }
        Ok(())
    }
}
