//! Trace data as the replay engine sees it.
//!
//! Spans and agents are written by the ingestion pipeline; the engine only
//! reads them, so these are plain records without behavior of their own.

use crate::id::{AgentId, SpanId, TraceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Kind of recorded operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SpanKind {
    /// Call to a language model
    LlmCall,
    /// Call to a tool
    ToolCall,
    /// Message exchanged between agents
    AgentMessage,
    /// Explicit checkpoint marker
    Checkpoint,
    /// Transfer of control between agents
    Handoff,
    /// Any kind this version does not know about, preserved verbatim
    Other(String),
}

impl SpanKind {
    /// Wire name of the kind
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::LlmCall => "llm_call",
            Self::ToolCall => "tool_call",
            Self::AgentMessage => "agent_message",
            Self::Checkpoint => "checkpoint",
            Self::Handoff => "handoff",
            Self::Other(kind) => kind,
        }
    }

    /// Whether automatic checkpointing captures spans of this kind
    #[must_use]
    pub const fn is_checkpointable(&self) -> bool {
        matches!(self, Self::Handoff | Self::ToolCall | Self::LlmCall)
    }
}

impl From<&str> for SpanKind {
    fn from(kind: &str) -> Self {
        match kind {
            "llm_call" => Self::LlmCall,
            "tool_call" => Self::ToolCall,
            "agent_message" => Self::AgentMessage,
            "checkpoint" => Self::Checkpoint,
            "handoff" => Self::Handoff,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for SpanKind {
    fn from(kind: String) -> Self {
        Self::from(kind.as_str())
    }
}

impl From<SpanKind> for String {
    fn from(kind: SpanKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_status() -> String {
    "ok".to_string()
}

/// One recorded operation within a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
    /// Span identifier
    pub span_id: SpanId,
    /// Owning trace
    pub trace_id: TraceId,
    /// Parent span, if any
    #[serde(default)]
    pub parent_span_id: Option<SpanId>,
    /// Agent that performed the operation
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    /// Operation name (e.g. `search`, `graph:planner`)
    pub name: String,
    /// Operation kind
    pub kind: SpanKind,
    /// When the operation started
    pub start_time: DateTime<Utc>,
    /// When the operation finished
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Completion status
    #[serde(default = "default_status")]
    pub status: String,
    /// Recorded input
    #[serde(default)]
    pub input: Value,
    /// Recorded output
    #[serde(default)]
    pub output: Value,
}

/// Agent configuration as resolved at ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent name
    pub name: String,
    /// Role within the system
    #[serde(default)]
    pub role: Option<String>,
    /// Model the agent runs on
    #[serde(default)]
    pub model: Option<String>,
    /// Authoring framework (e.g. `langgraph`)
    #[serde(default)]
    pub framework: Option<String>,
    /// Framework-specific settings
    #[serde(default = "empty_object")]
    pub config: Value,
}

fn empty_object() -> Value {
    json!({})
}

impl AgentConfig {
    /// Create a config carrying only a name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
            model: None,
            framework: None,
            config: empty_object(),
        }
    }

    /// Set the framework
    #[must_use]
    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.framework = Some(framework.into());
        self
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the role
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// The form embedded in checkpoint state
    #[must_use]
    pub fn to_state_value(&self) -> Value {
        json!({
            "name": self.name,
            "role": self.role,
            "model": self.model,
            "framework": self.framework,
            "config": self.config,
        })
    }
}

/// An agent participating in a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Agent identifier
    pub agent_id: AgentId,
    /// Owning trace
    pub trace_id: TraceId,
    /// Resolved configuration
    #[serde(flatten)]
    pub config: AgentConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_kind_wire_names() {
        for name in ["llm_call", "tool_call", "agent_message", "checkpoint", "handoff"] {
            assert_eq!(SpanKind::from(name).as_str(), name);
        }
        assert_eq!(SpanKind::from("retrieval"), SpanKind::Other("retrieval".to_string()));
        assert_eq!(SpanKind::from("retrieval").to_string(), "retrieval");
    }

    #[test]
    fn test_checkpointable_kinds() {
        assert!(SpanKind::Handoff.is_checkpointable());
        assert!(SpanKind::ToolCall.is_checkpointable());
        assert!(SpanKind::LlmCall.is_checkpointable());
        assert!(!SpanKind::AgentMessage.is_checkpointable());
        assert!(!SpanKind::Checkpoint.is_checkpointable());
        assert!(!SpanKind::Other("x".into()).is_checkpointable());
    }

    #[test]
    fn test_span_defaults() {
        let raw = json!({
            "span_id": SpanId::new(),
            "trace_id": TraceId::new(),
            "name": "search",
            "kind": "tool_call",
            "start_time": "2024-01-01T00:00:00Z",
        });
        let span: SpanRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(span.status, "ok");
        assert_eq!(span.kind, SpanKind::ToolCall);
        assert!(span.input.is_null());
        assert!(span.agent_id.is_none());
    }

    #[test]
    fn test_agent_config_state_value() {
        let config = AgentConfig::named("planner")
            .with_framework("langgraph")
            .with_model("gpt-4");
        let value = config.to_state_value();
        assert_eq!(value["name"], "planner");
        assert_eq!(value["framework"], "langgraph");
        assert_eq!(value["model"], "gpt-4");
        assert!(value["role"].is_null());
        assert_eq!(value["config"], json!({}));
    }

    #[test]
    fn test_agent_record_flattens_config() {
        let record = AgentRecord {
            agent_id: AgentId::new(),
            trace_id: TraceId::new(),
            config: AgentConfig::named("writer").with_role("author"),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["name"], "writer");
        assert_eq!(value["role"], "author");
        let back: AgentRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
