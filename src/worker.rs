use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::decode::{AssetDecoder, DecodeError};
use crate::job::{CubemapFaceGenerateJob, ModelGenerateJob, TextureGenerateJob};
use crate::logging;
use crate::queue::{GenerateQueues, LoadQueues};

pub(crate) struct WorkerPool {
    load: Arc<LoadQueues>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        count: usize,
        load: Arc<LoadQueues>,
        generate: Arc<GenerateQueues>,
        decoder: Arc<dyn AssetDecoder>,
    ) -> Self {
        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            let load = Arc::clone(&load);
            let generate = Arc::clone(&generate);
            let decoder = Arc::clone(&decoder);
            let worker = thread::Builder::new()
                .name(format!("asset-worker-{index}"))
                .spawn(move || worker_loop(&load, &generate, decoder.as_ref()))
                .expect("spawn asset worker thread");
            workers.push(worker);
        }
        Self { load, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.load.shutdown();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                logging::error("asset worker exited by panic");
            }
        }
    }
}

// One pop per kind per wake cycle in a fixed order, so a run of model
// decodes cannot starve texture results.
fn worker_loop(load: &LoadQueues, generate: &GenerateQueues, decoder: &dyn AssetDecoder) {
    while load.wait_for_work() {
        if let Some(job) = load.textures.try_pop() {
            let pixels = run_decode("texture", &job.path, || decoder.decode_texture(&job.path));
            generate.textures.push(TextureGenerateJob {
                id: job.id,
                path: job.path,
                pixels,
            });
        }
        if let Some(job) = load.cubemap_faces.try_pop() {
            let pixels =
                run_decode("cubemap face", &job.path, || decoder.decode_texture(&job.path));
            generate.cubemap_faces.push(CubemapFaceGenerateJob {
                id: job.id,
                path: job.path,
                face: job.face,
                pixels,
            });
        }
        if let Some(job) = load.models.try_pop() {
            let data = run_decode("model", &job.path, || decoder.decode_model(&job.path));
            generate.models.push(ModelGenerateJob {
                id: job.id,
                path: job.path,
                data,
            });
        }
    }
}

// Decode runs outside every lock. A panic in a decoder is contained here
// and becomes an empty payload, the same terminal state as a failed decode.
fn run_decode<T>(
    kind: &str,
    path: &str,
    decode: impl FnOnce() -> Result<T, DecodeError>,
) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(decode)) {
        Ok(Ok(payload)) => Some(payload),
        Ok(Err(err)) => {
            logging::warn(format!("{kind} decode failed for '{path}': {err}"));
            None
        }
        Err(payload) => {
            logging::error(format!(
                "{kind} decode panicked for '{path}': {}",
                panic_message(payload.as_ref())
            ));
            None
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
