use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lopdf::Document;
use pdf_planner::{PlannerError, TransformJob};

use crate::backend::TransformBackend;
use crate::error::Result;

/// Runs compiled jobs one at a time.
///
/// A second run requested while one is outstanding is rejected with
/// `AlreadyInProgress`; the outstanding run is left alone.
pub struct Runner<B> {
    backend: B,
    in_flight: Arc<AtomicBool>,
}

/// Proof that the caller holds the single run slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct RunTicket {
    in_flight: Arc<AtomicBool>,
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

impl<B: TransformBackend> Runner<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the run slot without starting anything yet
    pub fn try_begin(&self) -> Result<RunTicket> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                log::warn!("Rejected transform request: another run is still in flight");
                PlannerError::AlreadyInProgress
            })?;
        Ok(RunTicket {
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub async fn run(&self, sources: Vec<Document>, job: TransformJob) -> Result<Vec<Document>> {
        let ticket = self.try_begin()?;
        self.execute(&ticket, sources, job).await
    }

    /// Run `job` under a ticket obtained from this runner's `try_begin`.
    ///
    /// The slot stays claimed until the ticket is dropped. A ticket issued by
    /// another runner does not hold this runner's slot and is rejected.
    pub async fn execute(
        &self,
        ticket: &RunTicket,
        sources: Vec<Document>,
        job: TransformJob,
    ) -> Result<Vec<Document>> {
        if !Arc::ptr_eq(&ticket.in_flight, &self.in_flight) {
            log::warn!("Rejected transform request: ticket belongs to another runner");
            return Err(PlannerError::AlreadyInProgress.into());
        }

        let expected_outputs = match &job {
            TransformJob::Ranges(ranges) => ranges.output_count(),
            _ => 1,
        };
        log::info!(
            "Running transform over {} source document(s), expecting {} output(s)",
            sources.len(),
            expected_outputs
        );

        match self.backend.apply(sources, job).await {
            Ok(outputs) => {
                log::info!("Transform complete: {} output document(s)", outputs.len());
                Ok(outputs)
            }
            Err(err) => {
                log::error!("Transform failed: {}", err);
                Err(err.into())
            }
        }
    }
}
