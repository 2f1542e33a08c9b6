//! Publishing job row changes to the event bus.
//!
//! Every handler that writes a `jobs` row calls [`publish_job_change`] so the
//! realtime feed sees the same sequence of changes the database went through.

use genflow_core::job_events::ChangeKind;
use genflow_db::models::job::Job;
use genflow_events::{EventBus, PlatformEvent};

fn row_image(job: Option<&Job>) -> serde_json::Value {
    job.map(|j| serde_json::to_value(j).unwrap_or_default())
        .unwrap_or_default()
}

/// Publish a change of `kind` with the row images after (`new`) and before
/// (`old`) the write. Nothing is published if both are `None`.
pub fn publish_job_change(bus: &EventBus, kind: ChangeKind, new: Option<&Job>, old: Option<&Job>) {
    let Some(subject) = new.or(old) else {
        return;
    };

    tracing::debug!(
        job_id = %subject.id,
        change = kind.as_str(),
        status = %subject.status,
        "Publishing job change",
    );

    bus.publish(PlatformEvent::job_change(
        kind,
        subject.id,
        subject.user_id,
        row_image(new),
        row_image(old),
    ));
}
