//! Background work.
//!
//! Backfills are accepted by a request handler but run here, on a single worker fed by an mpsc channel. Jobs are
//! processed strictly one after the other so that every backfill draws from the same provider rate budget.
mod backfill_worker;

pub use backfill_worker::{BackfillQueue, BackfillWorker, JobHandler};
