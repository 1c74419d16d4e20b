use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;

use crate::cache::AssetCache;
use crate::decode::AssetDecoder;
use crate::gpu::GpuContext;
use crate::handle::{
    Cubemap, CubemapCallback, CubemapFace, Model, ModelCallback, Texture, TextureCallback,
    TextureSettings,
};
use crate::job::{CubemapFaceLoadJob, JobId, JobIdSource, ModelLoadJob, TextureLoadJob};
use crate::logging;
use crate::queue::{GenerateQueues, LoadQueues};
use crate::worker::WorkerPool;

const MIN_WORKERS: usize = 2;

fn default_worker_count() -> usize {
    let parallelism = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(MIN_WORKERS * 2);
    (parallelism / 2).max(MIN_WORKERS)
}

/// Upper bound on finalizations per kind per update call. Jobs beyond the
/// bound stay queued for later frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinalizeQuota {
    pub textures: usize,
    pub cubemap_faces: usize,
    pub models: usize,
}

impl Default for FinalizeQuota {
    fn default() -> Self {
        Self {
            textures: 2,
            cubemap_faces: 2,
            models: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamerConfig {
    /// `None` spawns half the available cores, at least two. `Some(0)` is
    /// allowed and queues decode work without ever running it.
    pub worker_threads: Option<usize>,
    pub quota: FinalizeQuota,
}

impl StreamerConfig {
    pub fn with_workers(count: usize) -> Self {
        Self {
            worker_threads: Some(count),
            ..Self::default()
        }
    }
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            quota: FinalizeQuota::default(),
        }
    }
}

// Depths are sampled one queue at a time, so a snapshot taken while workers
// run is approximate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamerTelemetry {
    pub texture_load_depth: usize,
    pub cubemap_face_load_depth: usize,
    pub model_load_depth: usize,
    pub texture_generate_depth: usize,
    pub cubemap_face_generate_depth: usize,
    pub model_generate_depth: usize,
    pub in_flight: usize,
    pub workers: usize,
}

// The streamer and every handle it returns are Rc-based and stay on the
// thread that created them. Worker threads only ever see job descriptors.
pub struct AssetStreamer<G: GpuContext> {
    textures: AssetCache<Texture<G>>,
    cubemaps: AssetCache<Cubemap<G>>,
    models: AssetCache<Model<G>>,
    pending_textures: HashMap<JobId, Rc<Texture<G>>>,
    pending_faces: HashMap<JobId, Rc<Cubemap<G>>>,
    pending_models: HashMap<JobId, Rc<Model<G>>>,
    load: Arc<LoadQueues>,
    generate: Arc<GenerateQueues>,
    workers: WorkerPool,
    decoder: Arc<dyn AssetDecoder>,
    job_ids: JobIdSource,
    quota: FinalizeQuota,
    // Touched only on the streamer's thread. Must become atomic if enqueue
    // or finalize ever moves off it.
    in_flight: usize,
}

impl<G: GpuContext> AssetStreamer<G> {
    pub fn new(config: StreamerConfig, decoder: Arc<dyn AssetDecoder>) -> Self {
        let load = Arc::new(LoadQueues::new());
        let generate = Arc::new(GenerateQueues::new());
        let worker_count = config.worker_threads.unwrap_or_else(default_worker_count);
        let workers = WorkerPool::spawn(
            worker_count,
            Arc::clone(&load),
            Arc::clone(&generate),
            Arc::clone(&decoder),
        );
        Self {
            textures: AssetCache::new(),
            cubemaps: AssetCache::new(),
            models: AssetCache::new(),
            pending_textures: HashMap::new(),
            pending_faces: HashMap::new(),
            pending_models: HashMap::new(),
            load,
            generate,
            workers,
            decoder,
            job_ids: JobIdSource::new(),
            quota: config.quota,
            in_flight: 0,
        }
    }

    // Blocking load on the calling thread. A cache hit returns the cached
    // handle as-is, even one still loading from an earlier async request.
    // Failures return None and cache nothing. Never touches the in-flight
    // counter.
    pub fn load_2d_texture(
        &mut self,
        gpu: &mut G,
        path: &str,
        settings: TextureSettings,
    ) -> Option<Rc<Texture<G>>> {
        if let Some(handle) = self.textures.get(path) {
            return Some(handle);
        }
        let pixels = match self.decoder.decode_texture(path) {
            Ok(pixels) if !pixels.is_empty() => pixels,
            Ok(_) => {
                logging::warn(format!("texture decoded empty: '{path}'"));
                return None;
            }
            Err(err) => {
                logging::warn(format!("texture load failed for '{path}': {err}"));
                return None;
            }
        };
        let handle = Rc::new(Texture::new(path.to_string(), settings));
        handle.finalize(gpu.generate_texture(&pixels, &settings));
        self.textures.insert(path.to_string(), Rc::clone(&handle));
        Some(handle)
    }

    // Queues a load and returns its handle immediately. The callback fires
    // once, from a later update call, and only on success; a failed load
    // erases the cache entry instead, so callers watching for failure poll
    // the handle state.
    pub fn load_2d_texture_async(
        &mut self,
        path: &str,
        settings: TextureSettings,
        callback: Option<TextureCallback<G>>,
    ) -> Rc<Texture<G>> {
        if let Some(handle) = self.textures.get(path) {
            return handle;
        }
        let handle = Rc::new(Texture::new(path.to_string(), settings));
        if let Some(callback) = callback {
            handle.set_callback(callback);
        }
        self.textures.insert(path.to_string(), Rc::clone(&handle));
        let id = self.job_ids.next_id();
        self.pending_textures.insert(id, Rc::clone(&handle));
        self.load.push_texture(TextureLoadJob {
            id,
            path: path.to_string(),
        });
        self.in_flight += 1;
        handle
    }

    // All six faces must decode or the whole load fails with None and
    // nothing is cached.
    pub fn load_cubemap(
        &mut self,
        gpu: &mut G,
        faces: [&str; CubemapFace::COUNT],
        settings: TextureSettings,
    ) -> Option<Rc<Cubemap<G>>> {
        let key = cubemap_key(&faces);
        if let Some(handle) = self.cubemaps.get(&key) {
            return Some(handle);
        }
        let mut decoded = Vec::with_capacity(CubemapFace::COUNT);
        for (face, path) in CubemapFace::ALL.iter().zip(faces.iter()) {
            match self.decoder.decode_texture(path) {
                Ok(pixels) if !pixels.is_empty() => decoded.push(pixels),
                Ok(_) => {
                    logging::warn(format!("cubemap face decoded empty: '{path}'"));
                    return None;
                }
                Err(err) => {
                    logging::warn(format!(
                        "cubemap {} face load failed for '{path}': {err}",
                        face.as_str()
                    ));
                    return None;
                }
            }
        }
        let handle = Rc::new(Cubemap::new(
            key.clone(),
            faces.map(|face| face.to_string()),
            settings,
        ));
        let mut data = gpu.create_cubemap(&settings);
        for (face, pixels) in CubemapFace::ALL.iter().zip(decoded.iter()) {
            gpu.upload_cubemap_face(&mut data, *face, pixels);
            handle.record_face_loaded();
        }
        *handle.gpu_slot() = Some(data);
        handle.mark_ready();
        self.cubemaps.insert(key, Rc::clone(&handle));
        Some(handle)
    }

    // Queues six face loads and returns the cubemap handle immediately. The
    // callback fires when the last face finalizes. One failed face fails the
    // whole cubemap.
    pub fn load_cubemap_async(
        &mut self,
        faces: [&str; CubemapFace::COUNT],
        settings: TextureSettings,
        callback: Option<CubemapCallback<G>>,
    ) -> Rc<Cubemap<G>> {
        let key = cubemap_key(&faces);
        if let Some(handle) = self.cubemaps.get(&key) {
            return handle;
        }
        let handle = Rc::new(Cubemap::new(
            key.clone(),
            faces.map(|face| face.to_string()),
            settings,
        ));
        if let Some(callback) = callback {
            handle.set_callback(callback);
        }
        self.cubemaps.insert(key, Rc::clone(&handle));
        for face in CubemapFace::ALL {
            let id = self.job_ids.next_id();
            self.pending_faces.insert(id, Rc::clone(&handle));
            self.load.push_cubemap_face(CubemapFaceLoadJob {
                id,
                path: handle.face_path(face).to_string(),
                face,
            });
            self.in_flight += 1;
        }
        handle
    }

    pub fn load_model(&mut self, gpu: &mut G, path: &str) -> Option<Rc<Model<G>>> {
        if let Some(handle) = self.models.get(path) {
            return Some(handle);
        }
        let data = match self.decoder.decode_model(path) {
            Ok(data) if !data.is_empty() => data,
            Ok(_) => {
                logging::warn(format!("model decoded empty: '{path}'"));
                return None;
            }
            Err(err) => {
                logging::warn(format!("model load failed for '{path}': {err}"));
                return None;
            }
        };
        let handle = Rc::new(Model::new(path.to_string()));
        handle.finalize(gpu.generate_model(&data));
        self.models.insert(path.to_string(), Rc::clone(&handle));
        Some(handle)
    }

    pub fn load_model_async(
        &mut self,
        path: &str,
        callback: Option<ModelCallback<G>>,
    ) -> Rc<Model<G>> {
        if let Some(handle) = self.models.get(path) {
            return handle;
        }
        let handle = Rc::new(Model::new(path.to_string()));
        if let Some(callback) = callback {
            handle.set_callback(callback);
        }
        self.models.insert(path.to_string(), Rc::clone(&handle));
        let id = self.job_ids.next_id();
        self.pending_models.insert(id, Rc::clone(&handle));
        self.load.push_model(ModelLoadJob {
            id,
            path: path.to_string(),
        });
        self.in_flight += 1;
        handle
    }

    // Drains decoded results into GPU objects. Call once per frame on the
    // thread that owns the streamer. Never blocks; each kind finalizes at
    // most its quota per call so a burst of results cannot stall a frame.
    pub fn update(&mut self, gpu: &mut G) {
        self.finalize_textures(gpu);
        self.finalize_cubemap_faces(gpu);
        self.finalize_models(gpu);
    }

    // True while any queued load has not reached a terminal state.
    pub fn is_assets_in_flight(&self) -> bool {
        self.in_flight > 0
    }

    pub fn assets_in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn telemetry(&self) -> StreamerTelemetry {
        StreamerTelemetry {
            texture_load_depth: self.load.textures.len(),
            cubemap_face_load_depth: self.load.cubemap_faces.len(),
            model_load_depth: self.load.models.len(),
            texture_generate_depth: self.generate.textures.len(),
            cubemap_face_generate_depth: self.generate.cubemap_faces.len(),
            model_generate_depth: self.generate.models.len(),
            in_flight: self.in_flight,
            workers: self.workers.worker_count(),
        }
    }

    pub fn cached_texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn cached_cubemap_count(&self) -> usize {
        self.cubemaps.len()
    }

    pub fn cached_model_count(&self) -> usize {
        self.models.len()
    }

    pub fn texture_is_cached(&self, path: &str) -> bool {
        self.textures.contains(path)
    }

    pub fn cubemap_is_cached(&self, faces: [&str; CubemapFace::COUNT]) -> bool {
        self.cubemaps.contains(&cubemap_key(&faces))
    }

    pub fn model_is_cached(&self, path: &str) -> bool {
        self.models.contains(path)
    }

    fn finalize_textures(&mut self, gpu: &mut G) {
        for _ in 0..self.quota.textures {
            let job = match self.generate.textures.try_pop() {
                Some(job) => job,
                None => break,
            };
            let handle = match self.pending_textures.remove(&job.id) {
                Some(handle) => handle,
                None => {
                    logging::error(format!(
                        "texture result without a pending handle: '{}'",
                        job.path
                    ));
                    continue;
                }
            };
            self.in_flight = self.in_flight.saturating_sub(1);
            match job.pixels {
                Some(pixels) if !pixels.is_empty() => {
                    handle.finalize(gpu.generate_texture(&pixels, &handle.settings()));
                    if let Some(callback) = handle.take_callback() {
                        callback(Rc::clone(&handle));
                    }
                }
                _ => {
                    self.textures.remove_if_same(&job.path, &handle);
                    handle.fail();
                    logging::warn(format!("texture load failed: '{}'", job.path));
                    break;
                }
            }
        }
    }

    fn finalize_cubemap_faces(&mut self, gpu: &mut G) {
        for _ in 0..self.quota.cubemap_faces {
            let job = match self.generate.cubemap_faces.try_pop() {
                Some(job) => job,
                None => break,
            };
            let handle = match self.pending_faces.remove(&job.id) {
                Some(handle) => handle,
                None => {
                    logging::error(format!(
                        "cubemap face result without a pending handle: '{}'",
                        job.path
                    ));
                    continue;
                }
            };
            self.in_flight = self.in_flight.saturating_sub(1);
            // A face whose sibling already failed drains through the failure
            // arm too; its decrement above is the only effect left.
            let pixels = match job.pixels {
                Some(pixels) if !pixels.is_empty() && !handle.is_failed() => pixels,
                _ => {
                    self.cubemaps.remove_if_same(handle.key(), &handle);
                    handle.fail();
                    logging::warn(format!(
                        "cubemap {} face load failed: '{}'",
                        job.face.as_str(),
                        job.path
                    ));
                    break;
                }
            };
            {
                let mut slot = handle.gpu_slot();
                let data = slot.get_or_insert_with(|| gpu.create_cubemap(&handle.settings()));
                gpu.upload_cubemap_face(data, job.face, &pixels);
            }
            if handle.record_face_loaded() == CubemapFace::COUNT {
                handle.mark_ready();
                if let Some(callback) = handle.take_callback() {
                    callback(Rc::clone(&handle));
                }
            }
        }
    }

    fn finalize_models(&mut self, gpu: &mut G) {
        for _ in 0..self.quota.models {
            let job = match self.generate.models.try_pop() {
                Some(job) => job,
                None => break,
            };
            let handle = match self.pending_models.remove(&job.id) {
                Some(handle) => handle,
                None => {
                    logging::error(format!(
                        "model result without a pending handle: '{}'",
                        job.path
                    ));
                    continue;
                }
            };
            self.in_flight = self.in_flight.saturating_sub(1);
            match job.data {
                Some(data) if !data.is_empty() => {
                    handle.finalize(gpu.generate_model(&data));
                    if let Some(callback) = handle.take_callback() {
                        callback(Rc::clone(&handle));
                    }
                }
                _ => {
                    self.models.remove_if_same(&job.path, &handle);
                    handle.fail();
                    logging::warn(format!("model load failed: '{}'", job.path));
                    break;
                }
            }
        }
    }
}

fn cubemap_key(faces: &[&str; CubemapFace::COUNT]) -> String {
    faces.join("|")
}
