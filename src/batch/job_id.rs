//! Collision-resistant job identifiers

use crate::workload::JobFamily;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Upper bound the batch service places on job ids.
pub const MAX_JOB_ID_LEN: usize = 64;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate `<prefix>-<UTC timestamp>-<suffix>`.
///
/// The suffix mixes a process-wide sequence number with random bits, so two
/// ids generated in the same second (or from different threads) differ.
pub fn next_job_id(family: JobFamily) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{:04x}{}",
        family.prefix(),
        Utc::now().format("%Y%m%d%H%M%S"),
        seq & 0xffff,
        &random[..8]
    )
}
