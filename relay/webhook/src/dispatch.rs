use hookrelay_common_api::EventRecord;
use hookrelay_sink_common::Sink;
use log::*;
use std::sync::Arc;

/// Outcome of a dispatch decision. `Forwarded` means the delivery task was
/// detached, not that ingestion succeeded: delivery is fire-and-forget and
/// its result is only ever consumed by the logger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchOutcome {
    Forwarded,
    Skipped,
}

/// Decides forward-or-skip for each EventRecord and hands complete records
/// over to the ingestion sink.
pub struct DispatchGate<S: Sink> {
    sink: Arc<S>,
}

impl<S: Sink> Clone for DispatchGate<S> {
    fn clone(&self) -> Self {
        DispatchGate { sink: self.sink.clone() }
    }
}

impl<S: Sink + 'static> DispatchGate<S> {
    pub fn new(sink: Arc<S>) -> DispatchGate<S> {
        DispatchGate { sink }
    }

    /// Applies the completeness gate and, for complete records, detaches the
    /// delivery task. The caller does not await delivery; a sink failure is
    /// logged and dropped, never retried and never surfaced to the request.
    pub fn dispatch(&self, record: EventRecord) -> DispatchOutcome {
        if !record.complete() {
            warn!("DispatchGate - skip: missing event data");
            return DispatchOutcome::Skipped;
        }

        let (name, data, _user) = record.into_parts();
        let name = match name {
            Some(name) => name,
            None => {
                warn!("DispatchGate - skip: missing event name");
                return DispatchOutcome::Skipped;
            }
        };

        let sink = self.sink.clone();
        actix_web::rt::spawn(async move {
            if let Err(err) = sink.track(&name, &data).await {
                error!(
                    "DispatchGate - the sink failed to deliver event [{}]. Err: {:?}",
                    name, err
                );
            }
        });

        DispatchOutcome::Forwarded
    }
}
