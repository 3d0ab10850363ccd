//! Analysis execution pipeline.
//!
//! One invocation moves through
//!
//! ```text
//! Idle → Built → Dispatched → Computing → Completed
//!                    │             │
//!                    └─────────────┴────→ Failed
//! ```
//!
//! `Built` slices every role the analysis declares. `Dispatched` hands the
//! JSON request to the compute pool; the caller gets a [`PendingAnalysis`]
//! back and may dispatch more work. `Computing` is the wait for the reply.
//! `Completed` maps the reply into result tables and writes the whole audit
//! chain in one transaction. Any failure ends in `Failed` with nothing
//! persisted.

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use statgrid_compute::{Canceller, ComputePool, ModuleRegistry, PoolConfig, Ticket, TransportError};
use statgrid_engine::Dataset;
use statgrid_io::{AuditChain, AuditStore, ChainIds, StatisticDraft};
use statgrid_protocol::{AnalysisRole, CancelMessage, RequestId, RoleData, TaskPayload};

use crate::error::AnalysisError;
use crate::table::ResultTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Built,
    Dispatched,
    Computing,
    Completed,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Built => "built",
            Self::Dispatched => "dispatched",
            Self::Computing => "computing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One result table plus the variables it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticOutput {
    pub table: ResultTable,
    pub components: Vec<String>,
}

impl StatisticOutput {
    pub fn new(table: ResultTable, components: Vec<String>) -> Self {
        Self { table, components }
    }
}

/// Everything an analysis produced, ready to be recorded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalyticOutput {
    pub statistics: Vec<StatisticOutput>,
}

impl AnalyticOutput {
    pub fn tables(&self) -> impl Iterator<Item = &ResultTable> {
        self.statistics.iter().map(|s| &s.table)
    }
}

/// A statistical procedure as the pipeline sees it: which variables it
/// needs in which role, which compute action runs it, and how its raw
/// result becomes tables.
pub trait Analysis: Send {
    /// Compute action, e.g. `"frequencies"`.
    fn action(&self) -> &'static str;

    /// Analytic title in the audit trail.
    fn title(&self) -> String;

    /// Command text recorded as the log entry.
    fn log_text(&self) -> String;

    fn note(&self) -> Option<String> {
        None
    }

    /// Variable names per role, in selection order.
    fn selections(&self) -> Vec<(AnalysisRole, Vec<String>)>;

    /// Procedure options forwarded to the module verbatim.
    fn options(&self) -> Value {
        Value::Null
    }

    fn map_result(&self, raw: Value) -> Result<AnalyticOutput, AnalysisError>;
}

/// Outcome of a completed analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub request_id: RequestId,
    pub title: String,
    pub output: AnalyticOutput,
    pub chain: ChainIds,
}

pub struct Pipeline {
    pool: ComputePool,
    timeout: Option<Duration>,
}

impl Pipeline {
    /// Start a pool with the bundled compute modules.
    pub fn start(config: PoolConfig, timeout: Option<Duration>) -> std::io::Result<Self> {
        let pool = ComputePool::start(config, ModuleRegistry::with_defaults())?;
        Ok(Self::with_pool(pool, timeout))
    }

    pub fn with_pool(pool: ComputePool, timeout: Option<Duration>) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &ComputePool {
        &self.pool
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Slice the analysis's roles from `dataset` and send the request.
    /// Returns as soon as the request is queued.
    pub fn dispatch(&self, dataset: &mut Dataset, analysis: Box<dyn Analysis>) -> Result<PendingAnalysis, AnalysisError> {
        let mut state = PipelineState::Idle;
        let action = analysis.action();

        let payload = build_payload(dataset, analysis.as_ref());
        transition(&mut state, PipelineState::Built, action, None);

        let ticket = match self.pool.submit(action, &payload) {
            Ok(ticket) => ticket,
            Err(e) => {
                transition(&mut state, PipelineState::Failed, action, None);
                log::warn!("Analysis '{}' could not be dispatched: {}", action, e);
                return Err(e.into());
            }
        };
        transition(&mut state, PipelineState::Dispatched, action, Some(ticket.id()));

        Ok(PendingAnalysis {
            id: ticket.id(),
            canceller: ticket.canceller(),
            ticket: Some(ticket),
            analysis,
            state,
            timeout: self.timeout,
        })
    }

    /// Dispatch, wait and record in one call.
    pub fn run(
        &self,
        dataset: &mut Dataset,
        analysis: Box<dyn Analysis>,
        audit: &mut AuditStore,
    ) -> Result<AnalysisReport, AnalysisError> {
        self.dispatch(dataset, analysis)?.complete(audit)
    }
}

fn build_payload(dataset: &mut Dataset, analysis: &dyn Analysis) -> TaskPayload {
    let roles = analysis
        .selections()
        .into_iter()
        .map(|(role, names)| {
            let slice = dataset.slice(&names);
            let labels = dataset.registry().value_labels();
            let value_labels = slice
                .variables
                .iter()
                .flat_map(|v| labels.for_variable(&v.name).cloned())
                .collect();
            RoleData {
                role,
                data: slice.rows,
                variables: slice.variables,
                value_labels,
            }
        })
        .collect();

    TaskPayload {
        roles,
        options: analysis.options(),
    }
}

fn transition(state: &mut PipelineState, to: PipelineState, action: &str, id: Option<RequestId>) {
    match id {
        Some(id) => log::debug!("Analysis '{}' (request {}): {} -> {}", action, id, state, to),
        None => log::debug!("Analysis '{}': {} -> {}", action, state, to),
    }
    *state = to;
}

/// A dispatched analysis awaiting its result.
pub struct PendingAnalysis {
    id: RequestId,
    ticket: Option<Ticket>,
    canceller: Canceller,
    analysis: Box<dyn Analysis>,
    state: PipelineState,
    timeout: Option<Duration>,
}

impl PendingAnalysis {
    pub fn request_id(&self) -> RequestId {
        self.id
    }

    pub fn action(&self) -> &'static str {
        self.analysis.action()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Ask the compute module to stop. The waiter then fails with a
    /// cancellation error. Returns false once the module has finished.
    pub fn cancel(&self) -> bool {
        self.canceller.send(CancelMessage { id: self.id })
    }

    /// Handle for cancelling from another thread while this one waits.
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// Wait for the module and map its reply, without recording anything.
    pub fn wait(mut self) -> Result<AnalyticOutput, AnalysisError> {
        let output = self.compute()?;
        transition(&mut self.state, PipelineState::Completed, self.analysis.action(), Some(self.id));
        Ok(output)
    }

    /// Wait, map, and write the log → analytic → statistic chain atomically.
    pub fn complete(mut self, audit: &mut AuditStore) -> Result<AnalysisReport, AnalysisError> {
        let output = self.compute()?;

        let chain = match audit_chain(self.analysis.as_ref(), &output) {
            Ok(chain) => chain,
            Err(e) => return Err(self.fail(e)),
        };
        let ids = match audit.record_chain(&chain) {
            Ok(ids) => ids,
            Err(e) => return Err(self.fail(e.into())),
        };

        transition(&mut self.state, PipelineState::Completed, self.analysis.action(), Some(self.id));
        Ok(AnalysisReport {
            request_id: self.id,
            title: chain.title,
            output,
            chain: ids,
        })
    }

    /// Block on the reply and map it. Leaves the state at Computing on
    /// success; the caller decides when the run is Completed.
    fn compute(&mut self) -> Result<AnalyticOutput, AnalysisError> {
        transition(&mut self.state, PipelineState::Computing, self.analysis.action(), Some(self.id));

        let Some(ticket) = self.ticket.take() else {
            return Err(self.fail(TransportError::ChannelClosed.into()));
        };
        let raw = match ticket.wait(self.timeout) {
            Ok(raw) => raw,
            Err(e) => return Err(self.fail(e.into())),
        };

        self.analysis.map_result(raw).map_err(|e| self.fail(e))
    }

    fn fail(&mut self, error: AnalysisError) -> AnalysisError {
        log::warn!("Analysis '{}' (request {}) failed: {}", self.analysis.action(), self.id, error);
        transition(&mut self.state, PipelineState::Failed, self.analysis.action(), Some(self.id));
        error
    }
}

fn audit_chain(analysis: &dyn Analysis, output: &AnalyticOutput) -> Result<AuditChain, AnalysisError> {
    let mut statistics = Vec::with_capacity(output.statistics.len());
    for stat in &output.statistics {
        stat.table.validate().map_err(AnalysisError::Mapping)?;
        let components = if stat.components.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&stat.components)?)
        };
        statistics.push(StatisticDraft {
            title: stat.table.title.clone(),
            output_data: serde_json::to_string(&stat.table)?,
            components,
        });
    }
    Ok(AuditChain {
        log_text: analysis.log_text(),
        title: analysis.title(),
        note: analysis.note(),
        statistics,
    })
}
