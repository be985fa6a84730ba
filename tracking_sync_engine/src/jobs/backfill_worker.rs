use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::sync::mpsc;

use crate::db_types::BackfillJob;

pub type JobHandler = Arc<dyn Fn(BackfillJob) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct BackfillWorker {
    listener: mpsc::Receiver<BackfillJob>,
    sender: mpsc::Sender<BackfillJob>,
    handler: JobHandler,
}

impl BackfillWorker {
    pub fn new(buffer_size: usize, handler: JobHandler) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { listener: receiver, sender, handler }
    }

    pub fn queue(&self) -> BackfillQueue {
        BackfillQueue::new(self.sender.clone())
    }

    /// Runs jobs until every [`BackfillQueue`] has been dropped. Each job finishes before the next one starts.
    pub async fn start(mut self) {
        debug!("📬️ Starting backfill worker");
        // Without this, the channel would never close and the worker would never stop.
        drop(self.sender);
        while let Some(job) = self.listener.recv().await {
            debug!("📬️ Running backfill job #{} for {}", job.id, job.merchant_id);
            (self.handler)(job).await;
        }
        debug!("📬️ Backfill worker has shut down");
    }
}

#[derive(Clone)]
pub struct BackfillQueue {
    sender: mpsc::Sender<BackfillJob>,
}

impl BackfillQueue {
    pub fn new(sender: mpsc::Sender<BackfillJob>) -> Self {
        Self { sender }
    }

    /// Hands a job to the worker. Returns false if the worker is gone.
    pub async fn enqueue(&self, job: BackfillJob) -> bool {
        let id = job.id;
        match self.sender.send(job).await {
            Ok(()) => {
                trace!("📬️ Backfill job #{id} queued");
                true
            },
            Err(e) => {
                error!("📬️ Could not queue backfill job #{id}: {e}");
                false
            },
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use chrono::Utc;

    use super::*;

    fn job(id: i64) -> BackfillJob {
        BackfillJob { id, merchant_id: format!("shop-{id}"), order_count: 0, created_at: Utc::now(), completed_at: None }
    }

    #[tokio::test]
    async fn jobs_run_one_at_a_time_in_order() {
        let _ = env_logger::try_init();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicUsize::new(0));
        let (s, r, o) = (seen.clone(), running.clone(), overlap.clone());
        let handler: JobHandler = Arc::new(move |job: BackfillJob| {
            let (seen, running, overlap) = (s.clone(), r.clone(), o.clone());
            Box::pin(async move {
                if running.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlap.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
                seen.lock().unwrap().push(job.id);
                running.fetch_sub(1, Ordering::SeqCst);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let worker = BackfillWorker::new(2, handler);
        let queue = worker.queue();
        let handle = tokio::spawn(worker.start());
        for id in 1..=5 {
            assert!(queue.enqueue(job(id)).await);
        }
        drop(queue);
        handle.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(overlap.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn enqueue_fails_when_the_worker_is_gone() {
        let handler: JobHandler =
            Arc::new(|_: BackfillJob| Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>);
        let worker = BackfillWorker::new(1, handler);
        let queue = worker.queue();
        drop(worker);
        assert!(!queue.enqueue(job(1)).await);
    }
}
