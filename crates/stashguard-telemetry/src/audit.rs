//! Hash-chained audit trail of decisions and ledger commits

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stashguard_core::{AgentId, Result, StashId};
use stashguard_policy::{Decision, LedgerEntry};
use std::path::Path;
use std::time::SystemTime;

/// Audit trail with hash-chained events for tamper detection
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AuditTrail {
    events: Vec<AuditEvent>,
    chain_hash: Option<String>,
}

impl AuditTrail {
    /// Create a new audit trail
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, chaining it to the previous one
    pub fn add_event(&mut self, mut event: AuditEvent) {
        event.sequence = self.events.len() as u64;
        event.previous_hash = self.chain_hash.clone();

        let hash = compute_hash(&event);
        event.hash = Some(hash.clone());

        self.chain_hash = Some(hash);
        self.events.push(event);
    }

    /// Record the verdict on a proposed action
    pub fn record_decision(&mut self, stash: &StashId, agent: &AgentId, decision: &Decision) {
        let kind = if decision.permitted {
            AuditKind::Permitted
        } else {
            AuditKind::Denied
        };
        self.add_event(
            AuditEvent::new(kind)
                .with_stash(stash.clone())
                .with_agent(agent.clone())
                .with_data(decision),
        );
    }

    /// Record an evaluation that failed with an error
    pub fn record_failure(&mut self, stash: &StashId, agent: &AgentId, error: &stashguard_core::Error) {
        self.add_event(
            AuditEvent::new(AuditKind::Failed)
                .with_stash(stash.clone())
                .with_agent(agent.clone())
                .with_data(serde_json::json!({"error": error.label(), "message": error.to_string()})),
        );
    }

    /// Record a ledger entry committed to `stash`
    pub fn record_commit(&mut self, stash: &StashId, entry: &LedgerEntry) {
        self.add_event(
            AuditEvent::new(AuditKind::Recorded)
                .with_stash(stash.clone())
                .with_agent(entry.agent.clone())
                .with_data(entry),
        );
    }

    /// Verify the integrity of the audit trail
    pub fn verify(&self) -> bool {
        let mut prev_hash: Option<String> = None;

        for (index, event) in self.events.iter().enumerate() {
            if event.sequence != index as u64 || event.previous_hash != prev_hash {
                return false;
            }

            let computed_hash = compute_hash(event);
            if event.hash.as_ref() != Some(&computed_hash) {
                return false;
            }

            prev_hash = event.hash.clone();
        }

        // The head must point at the last event, otherwise events were dropped
        prev_hash == self.chain_hash
    }

    /// Get all events
    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    /// Hash of the most recent event
    pub fn head(&self) -> Option<&str> {
        self.chain_hash.as_deref()
    }

    /// Write the trail as pretty JSON
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a trail written by [`AuditTrail::write_json`]
    pub fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn compute_hash(event: &AuditEvent) -> String {
    let mut hasher = Sha256::new();

    // Everything except the hash field itself
    hasher.update(event.sequence.to_be_bytes());
    hasher.update(event.kind.as_str().as_bytes());
    if let Some(ref stash) = event.stash {
        hasher.update(stash.as_str().as_bytes());
    }
    if let Some(ref agent) = event.agent {
        hasher.update(agent.as_str().as_bytes());
    }
    if let Some(ref data) = event.data {
        hasher.update(data.as_bytes());
    }
    hasher.update(format!("{:?}", event.timestamp).as_bytes());
    if let Some(ref prev) = event.previous_hash {
        hasher.update(prev.as_bytes());
    }

    format!("{:x}", hasher.finalize())
}

/// A single audit event in the trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the trail
    pub sequence: u64,

    pub kind: AuditKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stash: Option<StashId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentId>,

    /// Event data (JSON serialized)
    pub data: Option<String>,

    pub timestamp: SystemTime,

    /// Hash of this event
    pub hash: Option<String>,

    /// Hash of previous event (for chaining)
    pub previous_hash: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event
    pub fn new(kind: AuditKind) -> Self {
        Self {
            sequence: 0,
            kind,
            stash: None,
            agent: None,
            data: None,
            timestamp: SystemTime::now(),
            hash: None,
            previous_hash: None,
        }
    }

    /// Set event data
    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_string(&data).ok();
        self
    }

    pub fn with_stash(mut self, stash: StashId) -> Self {
        self.stash = Some(stash);
        self
    }

    pub fn with_agent(mut self, agent: AgentId) -> Self {
        self.agent = Some(agent);
        self
    }
}

/// What an audit event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditKind {
    Permitted,
    Denied,
    Failed,
    Recorded,
}

impl AuditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permitted => "permitted",
            Self::Denied => "denied",
            Self::Failed => "failed",
            Self::Recorded => "recorded",
        }
    }
}
