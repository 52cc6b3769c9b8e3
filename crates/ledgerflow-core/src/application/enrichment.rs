//! Post-run receipt enrichment.
//!
//! Steps that submit transactions nominally succeed before the ledger has
//! settled them. After the main pass, the engine looks up a settlement
//! receipt for every recorded transaction hash. The lookups run
//! concurrently, each failure is downgraded to a warning, and nothing here
//! can change the run's terminal status.

use crate::domain::StepId;
use crate::executor::ReceiptFetcher;
use crate::observer::ObservationSink;
use crate::types::LogLevel;
use futures::future::join_all;
use std::sync::Arc;

/// One queued receipt lookup
#[derive(Debug, Clone)]
pub(crate) struct EnrichmentItem {
    /// The step that produced the transaction
    pub step_id: StepId,

    /// The submitted transaction hash
    pub tx_hash: String,
}

/// Drain the queued lookups concurrently.
///
/// On success the step's recorded outcome is re-emitted with the receipt
/// attached; on failure a warning is logged and the outcome is left as-is.
pub(crate) async fn drain(
    items: Vec<EnrichmentItem>,
    receipts: Arc<dyn ReceiptFetcher>,
    sink: Arc<dyn ObservationSink>,
) {
    if items.is_empty() {
        return;
    }

    tracing::debug!(count = items.len(), "Draining receipt lookups");

    let lookups = items.into_iter().map(|item| {
        let receipts = receipts.clone();
        let sink = sink.clone();

        async move {
            match receipts.fetch_receipt(&item.tx_hash).await {
                Ok(receipt) => {
                    if let Some(outcome) = sink.last_outcome(&item.step_id) {
                        sink.step_status_changed(&item.step_id, &outcome.with_receipt(receipt));
                    }
                    sink.log(
                        LogLevel::Debug,
                        Some(&item.step_id),
                        &format!("Receipt recorded for {}", item.tx_hash),
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        step_id = %item.step_id,
                        tx_hash = %item.tx_hash,
                        error = %err,
                        "Receipt lookup failed"
                    );
                    sink.log(
                        LogLevel::Warn,
                        Some(&item.step_id),
                        &format!("Receipt lookup failed for {}: {}", item.tx_hash, err),
                    );
                }
            }
        }
    });

    join_all(lookups).await;
}
