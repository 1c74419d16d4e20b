use crate::decode::{ModelData, TexturePixels};
use crate::handle::CubemapFace;

// Ticket pairing a queued job with its pending handle. A result whose id has
// no pending entry is stale and gets discarded, so a failed-and-retried path
// can never resolve against the wrong handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct JobId(u64);

pub(crate) struct JobIdSource {
    next: u64,
}

impl JobIdSource {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn next_id(&mut self) -> JobId {
        self.next += 1;
        JobId(self.next)
    }
}

pub(crate) struct TextureLoadJob {
    pub id: JobId,
    pub path: String,
}

pub(crate) struct CubemapFaceLoadJob {
    pub id: JobId,
    pub path: String,
    pub face: CubemapFace,
}

pub(crate) struct ModelLoadJob {
    pub id: JobId,
    pub path: String,
}

// pixels / data are None when the decode failed.
pub(crate) struct TextureGenerateJob {
    pub id: JobId,
    pub path: String,
    pub pixels: Option<TexturePixels>,
}

pub(crate) struct CubemapFaceGenerateJob {
    pub id: JobId,
    pub path: String,
    pub face: CubemapFace,
    pub pixels: Option<TexturePixels>,
}

pub(crate) struct ModelGenerateJob {
    pub id: JobId,
    pub path: String,
    pub data: Option<ModelData>,
}
