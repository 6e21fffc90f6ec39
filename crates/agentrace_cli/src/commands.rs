//! Subcommand implementations.
//!
//! Each command renders its output to a string so the binary only prints.

use crate::import::TraceBundle;
use agentrace_core::{CheckpointId, ReplayId, SpanId, TraceId};
use agentrace_replay::{Overrides, ReplayService, format_diff_for_display};
use agentrace_store::StateStore;
use clap::Subcommand;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use console::style;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Command {
    /// Import agents and spans from a JSON file
    Import {
        /// File holding `{"agents": [...], "spans": [...]}`
        file: PathBuf,
    },
    /// Checkpoint a trace, or a single span with --span
    Checkpoint {
        /// Trace ID
        trace_id: TraceId,
        /// Checkpoint only this span
        #[arg(long)]
        span: Option<SpanId>,
        /// Checkpoint name (single span only)
        #[arg(long, requires = "span")]
        name: Option<String>,
    },
    /// List checkpoints of a trace
    Checkpoints {
        /// Trace ID
        trace_id: TraceId,
    },
    /// Show a checkpoint with its state
    Show {
        /// Checkpoint ID
        checkpoint_id: CheckpointId,
    },
    /// Replay from a checkpoint
    Replay {
        /// Checkpoint ID
        checkpoint_id: CheckpointId,
        /// Replacement input as JSON
        #[arg(long, value_parser = parse_json)]
        input: Option<Value>,
        /// Agent config overrides as a JSON object
        #[arg(long, value_parser = parse_overrides)]
        overrides: Option<Overrides>,
        /// Deadline in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Use the mock executor
        #[arg(long)]
        dry_run: bool,
    },
    /// List replays of a trace, newest first
    Replays {
        /// Trace ID
        trace_id: TraceId,
    },
    /// Show the diff of a replay
    Diff {
        /// Replay ID
        replay_id: ReplayId,
    },
    /// Delete a checkpoint
    Delete {
        /// Checkpoint ID
        checkpoint_id: CheckpointId,
    },
}

fn parse_json(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(raw)
}

fn parse_overrides(raw: &str) -> Result<Overrides, serde_json::Error> {
    serde_json::from_str(raw)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

impl Command {
    /// Run against `service`, returning what to print
    pub async fn run(self, service: &ReplayService, store: &dyn StateStore) -> Result<String> {
        let mut out = String::new();
        match self {
            Self::Import { file } => {
                let raw = std::fs::read_to_string(&file)
                    .wrap_err_with(|| format!("reading {}", file.display()))?;
                let bundle: TraceBundle = serde_json::from_str(&raw)
                    .wrap_err_with(|| format!("parsing {}", file.display()))?;
                let traces = bundle.trace_ids();
                let (agents, spans) = (bundle.agents.len(), bundle.spans.len());
                bundle.ingest(store).await?;
                writeln!(out, "Imported {agents} agents and {spans} spans")?;
                for trace in traces {
                    writeln!(out, "  trace {trace}")?;
                }
            }
            Self::Checkpoint {
                trace_id,
                span: Some(span_id),
                name,
            } => {
                let id = service.create_checkpoint(span_id, name).await?;
                if id.trace_id() != trace_id {
                    let note = style("note:").yellow();
                    writeln!(out, "{note} span belongs to trace {}", id.trace_id())?;
                }
                writeln!(out, "{id}")?;
            }
            Self::Checkpoint { trace_id, span: None, .. } => {
                let ids = service.create_checkpoints(trace_id, true).await?;
                writeln!(out, "Created {} checkpoints", ids.len())?;
                for id in ids {
                    writeln!(out, "  {id}")?;
                }
            }
            Self::Checkpoints { trace_id } => {
                for c in service.list_checkpoints(trace_id).await? {
                    writeln!(
                        out,
                        "{}  {}  {} ({})  replays={}",
                        style(&c.checkpoint_id).cyan(),
                        c.timestamp.to_rfc3339(),
                        c.name,
                        c.agent_name,
                        c.replay_count
                    )?;
                }
            }
            Self::Show { checkpoint_id } => {
                let detail = service.get_checkpoint(&checkpoint_id).await?;
                writeln!(out, "{}", pretty(&serde_json::to_value(&detail)?))?;
            }
            Self::Replay {
                checkpoint_id,
                input,
                overrides,
                timeout,
                dry_run,
            } => {
                let mut config = service.config().replay_config();
                config.modified_input = input;
                config.agent_overrides = overrides;
                config.dry_run = dry_run;
                if let Some(seconds) = timeout {
                    config.timeout_seconds = seconds;
                }

                let result = service.execute_replay(&checkpoint_id, config).await?;
                let status = if result.success {
                    style("succeeded").green()
                } else {
                    style("failed").red()
                };
                writeln!(out, "{} {status} in {} ms", result.replay_id, result.duration_ms)?;
                if let Some(error) = &result.error {
                    writeln!(out, "error: {error}")?;
                }
                writeln!(out, "{}", pretty(&result.replay_output))?;
                write!(out, "{}", format_diff_for_display(&result.diff))?;
            }
            Self::Replays { trace_id } => {
                for r in service.list_replays(trace_id).await? {
                    let status =
                        if r.success { style("ok").green() } else { style("failed").red() };
                    writeln!(
                        out,
                        "{}  {}  {status}  {} ms  from {}",
                        r.replay_id,
                        r.created_at.to_rfc3339(),
                        r.duration_ms,
                        r.checkpoint_id
                    )?;
                }
            }
            Self::Diff { replay_id } => {
                let diff = service.get_replay_diff(replay_id).await?;
                write!(out, "{}", format_diff_for_display(&diff))?;
            }
            Self::Delete { checkpoint_id } => {
                service.delete_checkpoint(&checkpoint_id).await?;
                writeln!(out, "Deleted {checkpoint_id}")?;
            }
        }
        Ok(out)
    }
}
