use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::classify;

/// Work/personal classification of a call. Unset until the type step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    #[default]
    Unset,
    Work,
    Personal,
}

impl Category {
    /// Human-readable label, `None` while unset.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Category::Unset => None,
            Category::Work => Some("Work"),
            Category::Personal => Some("Personal"),
        }
    }
}

/// Urgency classification of a work call. Unset until the urgency step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Urgency {
    #[default]
    Unset,
    Immediate,
    CanWait,
}

impl Urgency {
    pub fn label(self) -> Option<&'static str> {
        match self {
            Urgency::Unset => None,
            Urgency::Immediate => Some("IMMEDIATE"),
            Urgency::CanWait => Some("CAN_WAIT"),
        }
    }
}

/// Everything captured about one call, from the incoming webhook to hangup.
///
/// Every field has an explicit empty default so summary rendering never has
/// to deal with missing values.
#[derive(Debug, Clone, Default)]
pub struct CallRecord {
    pub call_sid: String,
    /// Caller number as reported by Twilio; may be empty or a placeholder.
    pub from: String,
    /// Derived once at call start from `from`.
    pub from_hidden: bool,
    pub name: String,
    /// Number the caller dictated, asked for only when `from_hidden`.
    pub callback_number: String,
    pub category: Category,
    /// Captured only on the Work branch.
    pub topic: String,
    /// The caller's literal words when asked about urgency.
    pub urgency_raw: String,
    pub urgency: Urgency,
    /// Captured only when urgency is CanWait.
    pub callback_time_raw: String,
    /// Set exactly once at finalization; non-empty marks the call terminal.
    pub final_action: String,
}

impl CallRecord {
    pub fn is_terminal(&self) -> bool {
        !self.final_action.is_empty()
    }
}

/// In-memory store of call records, keyed by Twilio CallSid.
///
/// Records live for the process lifetime; each call's steps arrive strictly
/// one at a time, so per-record access never races with itself. Different
/// calls only ever touch their own entry.
#[derive(Clone)]
pub struct CallStore {
    inner: Arc<Mutex<HashMap<String, CallRecord>>>,
}

impl Default for CallStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a record for a new call, computing `from_hidden` up front.
    ///
    /// A duplicate incoming-call event for the same CallSid overwrites the
    /// old record: re-arming the dialogue from the top is the safe default
    /// for a one-shot intake flow.
    pub async fn create(&self, call_sid: &str, from: &str) -> CallRecord {
        let record = CallRecord {
            call_sid: call_sid.to_string(),
            from: from.to_string(),
            from_hidden: classify::is_hidden_number(from),
            ..CallRecord::default()
        };
        self.inner
            .lock()
            .await
            .insert(call_sid.to_string(), record.clone());
        record
    }

    /// Look up the record for a call, if the incoming webhook ever created one.
    pub async fn get(&self, call_sid: &str) -> Option<CallRecord> {
        self.inner.lock().await.get(call_sid).cloned()
    }

    /// Apply a mutation to an existing record and return the updated copy.
    ///
    /// Returns `None` when no record exists; step handlers treat that as
    /// unrecoverable for the request and close the call politely.
    pub async fn update(
        &self,
        call_sid: &str,
        mutate: impl FnOnce(&mut CallRecord),
    ) -> Option<CallRecord> {
        let mut map = self.inner.lock().await;
        let record = map.get_mut(call_sid)?;
        mutate(record);
        Some(record.clone())
    }
}
