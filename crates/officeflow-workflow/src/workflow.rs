//! Approval workflow state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::WorkflowError;

/// Where a document is in its approval cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Being edited, not yet sent out
    Draft,
    /// Waiting on the current signer
    InReview,
    /// Every signer approved
    Completed,
    /// A signer rejected it
    Rejected,
}

impl WorkflowStatus {
    /// No signer can act on it. A rejected workflow stays closed until revised.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::InReview => "in review",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A signer's decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

/// One signer in the approval chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerStep {
    pub signer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

impl SignerStep {
    fn new(signer: String) -> Self {
        Self {
            signer,
            decision: None,
            comment: None,
            decided_at: None,
        }
    }

    fn clear(&mut self) {
        self.decision = None;
        self.comment = None;
        self.decided_at = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowAction {
    Created,
    Submitted,
    Approved,
    Rejected,
    Revised,
    Completed,
}

/// History entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub action: WorkflowAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

/// Approval workflow for a single document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub document_id: String,
    pub title: String,
    status: WorkflowStatus,
    steps: Vec<SignerStep>,
    /// Index into `steps` of the signer being waited on
    current: usize,
    history: Vec<WorkflowEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Create a draft with signers in the order they must approve
    pub fn new<I, S>(
        document_id: impl Into<String>,
        title: impl Into<String>,
        signers: I,
    ) -> Result<Self, WorkflowError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let steps: Vec<SignerStep> = signers
            .into_iter()
            .map(|signer| SignerStep::new(signer.into().trim().to_string()))
            .collect();
        check_signers(&steps)?;

        let now = Utc::now();
        let mut workflow = Self {
            id: Uuid::new_v4(),
            document_id: document_id.into(),
            title: title.into(),
            status: WorkflowStatus::Draft,
            steps,
            current: 0,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        workflow.record(WorkflowAction::Created, None, None);
        Ok(workflow)
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    pub fn steps(&self) -> &[SignerStep] {
        &self.steps
    }

    pub fn history(&self) -> &[WorkflowEvent] {
        &self.history
    }

    /// Signer whose decision is awaited, only while in review
    pub fn current_signer(&self) -> Option<&str> {
        match self.status {
            WorkflowStatus::InReview => self.steps.get(self.current).map(|s| s.signer.as_str()),
            _ => None,
        }
    }

    /// Signers who have not approved yet, in order
    pub fn pending_signers(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.decision != Some(Decision::Approved))
            .map(|s| s.signer.as_str())
            .collect()
    }

    /// (approved, total)
    pub fn progress(&self) -> (usize, usize) {
        let approved = self
            .steps
            .iter()
            .filter(|s| s.decision == Some(Decision::Approved))
            .count();
        (approved, self.steps.len())
    }

    /// Draft → InReview
    pub fn submit(&mut self) -> Result<WorkflowStatus, WorkflowError> {
        self.expect_status("submit", WorkflowStatus::Draft)?;
        self.status = WorkflowStatus::InReview;
        self.current = 0;
        self.record(WorkflowAction::Submitted, None, None);
        info!(
            document_id = %self.document_id,
            signer = %self.steps[0].signer,
            "Workflow submitted for review"
        );
        Ok(self.status)
    }

    /// Current signer approves; the last approval completes the workflow
    pub fn approve(
        &mut self,
        signer: &str,
        comment: Option<String>,
    ) -> Result<WorkflowStatus, WorkflowError> {
        self.expect_status("approve", WorkflowStatus::InReview)?;
        let signer = signer.trim();
        self.expect_signer(signer)?;

        let step = &mut self.steps[self.current];
        step.decision = Some(Decision::Approved);
        step.comment = comment.clone();
        step.decided_at = Some(Utc::now());
        self.record(WorkflowAction::Approved, Some(signer.to_string()), comment);

        if self.current + 1 < self.steps.len() {
            self.current += 1;
            debug!(
                document_id = %self.document_id,
                next = %self.steps[self.current].signer,
                "Approval recorded"
            );
        } else {
            self.status = WorkflowStatus::Completed;
            self.record(WorkflowAction::Completed, None, None);
            info!(document_id = %self.document_id, "Workflow completed");
        }
        Ok(self.status)
    }

    /// Current signer rejects; the workflow stops until revised
    pub fn reject(&mut self, signer: &str, reason: &str) -> Result<WorkflowStatus, WorkflowError> {
        self.expect_status("reject", WorkflowStatus::InReview)?;
        let signer = signer.trim();
        self.expect_signer(signer)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::MissingReason);
        }

        let step = &mut self.steps[self.current];
        step.decision = Some(Decision::Rejected);
        step.comment = Some(reason.to_string());
        step.decided_at = Some(Utc::now());
        self.status = WorkflowStatus::Rejected;
        self.record(
            WorkflowAction::Rejected,
            Some(signer.to_string()),
            Some(reason.to_string()),
        );
        info!(document_id = %self.document_id, signer = %signer, "Workflow rejected");
        Ok(self.status)
    }

    /// Rejected → Draft, clearing every decision so the chain starts over
    pub fn revise(&mut self) -> Result<WorkflowStatus, WorkflowError> {
        self.expect_status("revise", WorkflowStatus::Rejected)?;
        for step in &mut self.steps {
            step.clear();
        }
        self.current = 0;
        self.status = WorkflowStatus::Draft;
        self.record(WorkflowAction::Revised, None, None);
        Ok(self.status)
    }

    pub fn to_json(&self) -> Result<String, WorkflowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a stored workflow, refusing files whose state `new` and the
    /// transitions could never have produced
    pub fn from_json(json: &str) -> Result<Self, WorkflowError> {
        let workflow: Self = serde_json::from_str(json)?;
        check_signers(&workflow.steps)?;
        if workflow.current >= workflow.steps.len() {
            return Err(WorkflowError::Inconsistent(format!(
                "signer position {} out of range",
                workflow.current
            )));
        }
        workflow.check_decisions()?;
        Ok(workflow)
    }

    /// Decisions must match the status: approvals before the current
    /// signer, nothing decided after it
    fn check_decisions(&self) -> Result<(), WorkflowError> {
        if self.status == WorkflowStatus::Draft && self.current != 0 {
            return Err(WorkflowError::Inconsistent(
                "draft must start at the first signer".to_string(),
            ));
        }
        for (index, step) in self.steps.iter().enumerate() {
            let expected = match self.status {
                WorkflowStatus::Draft => None,
                WorkflowStatus::Completed => Some(Decision::Approved),
                WorkflowStatus::InReview if index < self.current => Some(Decision::Approved),
                WorkflowStatus::InReview => None,
                WorkflowStatus::Rejected if index < self.current => Some(Decision::Approved),
                WorkflowStatus::Rejected if index == self.current => Some(Decision::Rejected),
                WorkflowStatus::Rejected => None,
            };
            if step.decision != expected {
                return Err(WorkflowError::Inconsistent(format!(
                    "{} has decision {:?} in a workflow that is {}",
                    step.signer, step.decision, self.status
                )));
            }
        }
        Ok(())
    }

    fn expect_status(
        &self,
        action: &'static str,
        expected: WorkflowStatus,
    ) -> Result<(), WorkflowError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                action,
                status: self.status,
            })
        }
    }

    fn expect_signer(&self, signer: &str) -> Result<(), WorkflowError> {
        let expected = &self.steps[self.current].signer;
        if expected == signer.trim() {
            Ok(())
        } else {
            Err(WorkflowError::NotCurrentSigner {
                expected: expected.clone(),
                actual: signer.to_string(),
            })
        }
    }

    fn record(&mut self, action: WorkflowAction, actor: Option<String>, note: Option<String>) {
        let at = Utc::now();
        self.updated_at = at;
        self.history.push(WorkflowEvent {
            action,
            actor,
            note,
            at,
        });
    }
}

fn check_signers(steps: &[SignerStep]) -> Result<(), WorkflowError> {
    if steps.is_empty() {
        return Err(WorkflowError::NoSigners);
    }
    let mut seen = HashSet::new();
    for step in steps {
        let signer = step.signer.trim();
        if signer.is_empty() {
            return Err(WorkflowError::EmptySigner);
        }
        if !seen.insert(signer) {
            return Err(WorkflowError::DuplicateSigner(signer.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memo() -> Workflow {
        Workflow::new("memo-17", "Budget memo", ["alice", "bob"]).unwrap()
    }

    #[test]
    fn test_new_workflow_is_draft() {
        let wf = memo();
        assert_eq!(wf.status(), WorkflowStatus::Draft);
        assert_eq!(wf.current_signer(), None);
        assert_eq!(wf.progress(), (0, 2));
        assert_eq!(wf.history()[0].action, WorkflowAction::Created);
    }

    #[test]
    fn test_signer_validation() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(
            Workflow::new("d", "t", empty).unwrap_err(),
            WorkflowError::NoSigners
        );
        assert_eq!(
            Workflow::new("d", "t", ["alice", " alice "]).unwrap_err(),
            WorkflowError::DuplicateSigner("alice".to_string())
        );
        assert_eq!(
            Workflow::new("d", "t", ["  "]).unwrap_err(),
            WorkflowError::EmptySigner
        );
    }

    #[test]
    fn test_cannot_approve_draft() {
        let mut wf = memo();
        let err = wf.approve("alice", None).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                action: "approve",
                status: WorkflowStatus::Draft
            }
        );
        assert_eq!(wf.history().len(), 1);
    }

    #[test]
    fn test_display_status() {
        assert_eq!(WorkflowStatus::InReview.to_string(), "in review");
        assert!(WorkflowStatus::Rejected.is_closed());
        assert!(WorkflowStatus::Completed.is_closed());
        assert!(!WorkflowStatus::Draft.is_closed());
    }

    #[test]
    fn test_history_records_trimmed_signer() {
        let mut wf = memo();
        wf.submit().unwrap();
        wf.approve("  alice ", None).unwrap();
        wf.reject("bob\n", "numbers are off").unwrap();

        let actors: Vec<_> = wf.history().iter().filter_map(|e| e.actor.as_deref()).collect();
        assert_eq!(actors, ["alice", "bob"]);
    }

    fn edited(wf: &Workflow, edit: impl FnOnce(&mut serde_json::Value)) -> String {
        let mut value = serde_json::to_value(wf).unwrap();
        edit(&mut value);
        value.to_string()
    }

    #[test]
    fn test_load_rejects_bad_signer_lists() {
        let wf = memo();

        let json = edited(&wf, |v| v["steps"][1]["signer"] = "alice".into());
        assert_eq!(
            Workflow::from_json(&json).unwrap_err(),
            WorkflowError::DuplicateSigner("alice".to_string())
        );

        let json = edited(&wf, |v| v["steps"][0]["signer"] = " ".into());
        assert_eq!(Workflow::from_json(&json).unwrap_err(), WorkflowError::EmptySigner);

        let json = edited(&wf, |v| v["steps"] = serde_json::json!([]));
        assert_eq!(Workflow::from_json(&json).unwrap_err(), WorkflowError::NoSigners);
    }

    #[test]
    fn test_load_rejects_decisions_that_contradict_status() {
        let mut wf = memo();
        wf.submit().unwrap();
        wf.approve("alice", None).unwrap();
        wf.approve("bob", None).unwrap();

        let json = edited(&wf, |v| v["status"] = "in_review".into());
        assert!(matches!(
            Workflow::from_json(&json),
            Err(WorkflowError::Inconsistent(_))
        ));

        let json = edited(&wf, |v| v["status"] = "draft".into());
        assert!(matches!(
            Workflow::from_json(&json),
            Err(WorkflowError::Inconsistent(_))
        ));

        assert_eq!(Workflow::from_json(&wf.to_json().unwrap()).unwrap(), wf);
    }
}
