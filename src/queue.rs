use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::job::{
    CubemapFaceGenerateJob, CubemapFaceLoadJob, ModelGenerateJob, ModelLoadJob, TextureGenerateJob,
    TextureLoadJob,
};

// len and is_empty are scheduling hints; they may be stale by the time the
// caller acts on them.
pub(crate) struct JobQueue<T> {
    entries: Mutex<VecDeque<T>>,
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, job: T) {
        self.entries
            .lock()
            .expect("job queue lock poisoned")
            .push_back(job);
    }

    pub fn try_pop(&self) -> Option<T> {
        self.entries
            .lock()
            .expect("job queue lock poisoned")
            .pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .expect("job queue lock poisoned")
            .is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("job queue lock poisoned").len()
    }
}

// One condition variable covers all three load queues, so a sleeping worker
// wakes no matter which kind of job arrives.
struct WorkGate {
    active: Mutex<bool>,
    wake: Condvar,
}

pub(crate) struct LoadQueues {
    pub textures: JobQueue<TextureLoadJob>,
    pub cubemap_faces: JobQueue<CubemapFaceLoadJob>,
    pub models: JobQueue<ModelLoadJob>,
    gate: WorkGate,
}

impl LoadQueues {
    pub fn new() -> Self {
        Self {
            textures: JobQueue::new(),
            cubemap_faces: JobQueue::new(),
            models: JobQueue::new(),
            gate: WorkGate {
                active: Mutex::new(true),
                wake: Condvar::new(),
            },
        }
    }

    pub fn push_texture(&self, job: TextureLoadJob) {
        self.textures.push(job);
        self.notify();
    }

    pub fn push_cubemap_face(&self, job: CubemapFaceLoadJob) {
        self.cubemap_faces.push(job);
        self.notify();
    }

    pub fn push_model(&self, job: ModelLoadJob) {
        self.models.push(job);
        self.notify();
    }

    // The gate lock is held while notifying so a worker between its empty
    // check and its wait cannot miss the signal.
    fn notify(&self) {
        let _gate = self.gate.active.lock().expect("work gate lock poisoned");
        self.gate.wake.notify_one();
    }

    // Returns false on shutdown. A true return is a hint only; another worker
    // may win the pop, so callers must tolerate empty pops.
    pub fn wait_for_work(&self) -> bool {
        let mut active = self.gate.active.lock().expect("work gate lock poisoned");
        loop {
            if !*active {
                return false;
            }
            if !self.textures.is_empty()
                || !self.cubemap_faces.is_empty()
                || !self.models.is_empty()
            {
                return true;
            }
            active = self
                .gate
                .wake
                .wait(active)
                .expect("work gate lock poisoned");
        }
    }

    // Queued jobs stay queued; workers finish the job in hand and exit on
    // their next wait.
    pub fn shutdown(&self) {
        let mut active = self.gate.active.lock().expect("work gate lock poisoned");
        *active = false;
        self.gate.wake.notify_all();
    }
}

// Decoded results waiting for GPU finalization on the streamer's thread.
pub(crate) struct GenerateQueues {
    pub textures: JobQueue<TextureGenerateJob>,
    pub cubemap_faces: JobQueue<CubemapFaceGenerateJob>,
    pub models: JobQueue<ModelGenerateJob>,
}

impl GenerateQueues {
    pub fn new() -> Self {
        Self {
            textures: JobQueue::new(),
            cubemap_faces: JobQueue::new(),
            models: JobQueue::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobIdSource;
    use std::collections::HashSet;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn texture_job(ids: &mut JobIdSource, path: &str) -> TextureLoadJob {
        TextureLoadJob {
            id: ids.next_id(),
            path: path.to_string(),
        }
    }

    #[test]
    fn queue_pops_in_push_order() {
        let queue = JobQueue::new();
        let mut ids = JobIdSource::new();
        queue.push(texture_job(&mut ids, "a.png"));
        queue.push(texture_job(&mut ids, "b.png"));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop().expect("first").path, "a.png");
        assert_eq!(queue.try_pop().expect("second").path, "b.png");
        assert!(queue.try_pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn queue_survives_concurrent_producers_and_consumers() {
        let queue = Arc::new(JobQueue::new());
        let mut producers = Vec::new();
        for worker in 0..4 {
            let queue = Arc::clone(&queue);
            producers.push(thread::spawn(move || {
                let mut ids = JobIdSource::new();
                for index in 0..50 {
                    queue.push(TextureLoadJob {
                        id: ids.next_id(),
                        path: format!("{worker}-{index}.png"),
                    });
                }
            }));
        }
        for producer in producers {
            producer.join().expect("producer finished");
        }

        let (sender, receiver) = mpsc::channel();
        let mut consumers = Vec::new();
        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            let sender = sender.clone();
            consumers.push(thread::spawn(move || {
                while let Some(job) = queue.try_pop() {
                    sender.send(job.path).expect("send popped path");
                }
            }));
        }
        drop(sender);
        for consumer in consumers {
            consumer.join().expect("consumer finished");
        }

        let popped: HashSet<String> = receiver.iter().collect();
        assert_eq!(popped.len(), 4 * 50);
        assert!(queue.is_empty());
    }

    #[test]
    fn wait_for_work_sees_already_queued_job() {
        let queues = LoadQueues::new();
        let mut ids = JobIdSource::new();
        queues.push_texture(texture_job(&mut ids, "a.png"));
        assert!(queues.wait_for_work());
    }

    #[test]
    fn wait_for_work_wakes_blocked_worker() {
        let queues = Arc::new(LoadQueues::new());
        let (sender, receiver) = mpsc::channel();
        let waiter = {
            let queues = Arc::clone(&queues);
            thread::spawn(move || {
                while queues.wait_for_work() {
                    if let Some(job) = queues.textures.try_pop() {
                        sender.send(job.path).expect("send woken path");
                    }
                }
            })
        };

        // Give the worker time to block on the gate.
        thread::sleep(Duration::from_millis(20));
        let mut ids = JobIdSource::new();
        queues.push_texture(texture_job(&mut ids, "woken.png"));

        let path = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("worker never woke");
        assert_eq!(path, "woken.png");

        queues.shutdown();
        waiter.join().expect("waiter exits after shutdown");
    }

    #[test]
    fn shutdown_unblocks_waiters_and_leaves_jobs_queued() {
        let queues = Arc::new(LoadQueues::new());
        let waiter = {
            let queues = Arc::clone(&queues);
            thread::spawn(move || queues.wait_for_work())
        };
        thread::sleep(Duration::from_millis(20));
        queues.shutdown();
        assert!(!waiter.join().expect("waiter result"));

        let mut ids = JobIdSource::new();
        queues.textures.push(texture_job(&mut ids, "left.png"));
        assert!(!queues.wait_for_work());
        assert_eq!(queues.textures.len(), 1);
    }
}
