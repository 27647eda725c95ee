//! Module runner: one full reconciliation of one resource.
//!
//! Control flow: collect facts, reconcile, translate, then (outside check
//! mode) re-check the snapshot, apply the requests and re-read the device to
//! report the after tree.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::device::{FactCollector, RequestExecutor, RequestSender, RequestTranslator, RestRequest};
use crate::error::{ReconcileError, Result, SonicError};
use crate::reconciler::{DesiredState, Operation, StateReconciler};
use crate::schema::ResourceDescriptor;
use crate::tree::TreeHasher;

/// Runs reconciliations against one device.
pub struct ModuleRunner<'a> {
    /// Source of have trees.
    collector: &'a dyn FactCollector,
    /// Operation to request mapping.
    translator: &'a dyn RequestTranslator,
    /// Transport for writes; `None` allows check mode only.
    sender: Option<&'a dyn RequestSender>,
    /// Snapshot fingerprinting.
    hasher: TreeHasher,
}

/// Outcome of one run, as reported to the user.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleResult {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// When the run started.
    pub timestamp: DateTime<Utc>,
    /// Resource name.
    pub resource: String,
    /// Reconciliation mode.
    pub state: DesiredState,
    /// Whether the device was (or would be) changed.
    pub changed: bool,
    /// Whether the run was a dry run.
    pub check_mode: bool,
    /// Device tree before the run.
    pub before: Value,
    /// Device tree after the run; the prediction in check mode.
    pub after: Value,
    /// Operations in execution order.
    pub operations: Vec<Operation>,
    /// Requests sent (or that would be sent).
    pub requests: Vec<RestRequest>,
    /// Non-fatal findings.
    pub warnings: Vec<String>,
}

impl<'a> ModuleRunner<'a> {
    /// Creates a runner that can only plan.
    #[must_use]
    pub const fn new(collector: &'a dyn FactCollector, translator: &'a dyn RequestTranslator) -> Self {
        Self {
            collector,
            translator,
            sender: None,
            hasher: TreeHasher::new(),
        }
    }

    /// Enables applying through `sender`.
    #[must_use]
    pub const fn with_sender(mut self, sender: &'a dyn RequestSender) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Reconciles `resource` towards `want` under `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if facts cannot be collected, the trees violate the
    /// schema, the device changed since planning, or a request fails.
    pub async fn run(
        &self,
        resource: &ResourceDescriptor,
        want: &Value,
        state: DesiredState,
        check_mode: bool,
    ) -> Result<ModuleResult> {
        let run_id = Uuid::new_v4();
        let timestamp = Utc::now();
        info!("Run {run_id}: {} ({state}){}", resource.name, if check_mode { " [check]" } else { "" });

        let before = self.collector.collect(resource).await?;
        let snapshot = self.hasher.fingerprint(&before);

        let plan = StateReconciler::new(resource)
            .with_ordering(self.translator.ordering())
            .reconcile(want, &before, state)?;
        let mut warnings = plan.warnings.clone();

        let requests = if plan.is_empty() {
            Vec::new()
        } else if check_mode && resource.rest.is_none() {
            warnings.push(format!(
                "Resource '{}' has no REST binding; requests not rendered",
                resource.name
            ));
            Vec::new()
        } else {
            self.translator.translate(resource, &plan.operations)?
        };

        let changed = !plan.is_empty();
        let after = if check_mode || !changed {
            plan.after.clone()
        } else {
            self.apply(resource, &snapshot, &requests).await?;
            let observed = self.collector.collect(resource).await?;
            if observed != plan.after {
                warn!("{}: device state differs from the prediction", resource.name);
                warnings.push(String::from("Device state after apply differs from the prediction"));
            }
            observed
        };

        info!(
            "Run {run_id}: {} {}",
            resource.name,
            match (changed, check_mode) {
                (false, _) => "unchanged",
                (true, true) => "would change",
                (true, false) => "changed",
            }
        );

        Ok(ModuleResult {
            run_id,
            timestamp,
            resource: resource.name.clone(),
            state,
            changed,
            check_mode,
            before: plan.before,
            after,
            operations: plan.operations,
            requests,
            warnings,
        })
    }

    /// Re-reads the device, refuses to write over a changed snapshot, then
    /// sends the requests.
    async fn apply(&self, resource: &ResourceDescriptor, snapshot: &str, requests: &[RestRequest]) -> Result<()> {
        let sender = self
            .sender
            .ok_or_else(|| SonicError::internal("no request sender configured; use check mode"))?;

        let current = self.hasher.fingerprint(&self.collector.collect(resource).await?);
        if !TreeHasher::fingerprints_match(snapshot, &current) {
            return Err(ReconcileError::StaleSnapshot {
                resource: resource.name.clone(),
                expected: self.hasher.short(snapshot),
                found: self.hasher.short(&current),
            }
            .into());
        }

        let result = RequestExecutor::new(sender).execute(&resource.name, requests).await;
        match result.failure() {
            Some(failure) => Err(ReconcileError::ApplyFailed {
                resource: resource.name.clone(),
                index: failure.index,
                reason: failure.error.clone().unwrap_or_default(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ModuleRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRunner")
            .field("can_apply", &self.sender.is_some())
            .finish_non_exhaustive()
    }
}
