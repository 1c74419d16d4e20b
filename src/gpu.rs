use crate::decode::{ModelData, TexturePixels};
use crate::handle::{CubemapFace, TextureSettings};

// GPU side of asset finalization. Every method runs on the thread that drives
// the streamer's update call, never on a worker.
pub trait GpuContext {
    type TextureData;
    type CubemapData;
    type ModelData;

    fn generate_texture(
        &mut self,
        pixels: &TexturePixels,
        settings: &TextureSettings,
    ) -> Self::TextureData;

    fn create_cubemap(&mut self, settings: &TextureSettings) -> Self::CubemapData;

    fn upload_cubemap_face(
        &mut self,
        cubemap: &mut Self::CubemapData,
        face: CubemapFace,
        pixels: &TexturePixels,
    );

    fn generate_model(&mut self, data: &ModelData) -> Self::ModelData;
}
