//! Certificate export surface.
//!
//! Produces the verified-history bundle consumed by report and certificate
//! renderers. Rendering is the consumer's job; this module guarantees the
//! bundle carries a verification verdict computed at export time, so no
//! consumer can present an unverified history as proven.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::event::Event;
use crate::store::LedgerStore;
use crate::verify::{self, VerificationResult};

/// A subject's ordered history plus the verdict computed when it was
/// exported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryBundle {
    pub subject_id: Uuid,
    pub exported_at: DateTime<Utc>,
    pub verification: VerificationResult,
    pub events: Vec<Event>,
}

impl HistoryBundle {
    /// Whether a renderer may present this history as verified.
    pub fn is_certifiable(&self) -> bool {
        self.verification.is_valid()
    }
}

/// Export a subject's history together with a fresh verification verdict.
///
/// A broken chain still exports: the verdict travels with the bundle, and
/// `events` then holds only the intact prefix before the break.
pub async fn export_history(
    store: &LedgerStore,
    subject_id: Uuid,
) -> Result<HistoryBundle, LedgerError> {
    let verification = verify::verify_chain(store, subject_id).await?;

    let events = match verification {
        VerificationResult::Valid { .. } => store.list_events(subject_id, None, None).await?,
        VerificationResult::Broken { at_sequence, .. } => {
            warn!(
                "Exporting subject {} with a broken chain: {}",
                subject_id,
                verification.summary()
            );
            if at_sequence > 1 {
                store
                    .list_events(subject_id, Some(1), Some(at_sequence - 1))
                    .await?
            } else {
                Vec::new()
            }
        }
    };

    Ok(HistoryBundle {
        subject_id,
        exported_at: Utc::now(),
        verification,
        events,
    })
}
