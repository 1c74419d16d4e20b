use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};

// Tightly packed RGBA8, row-major.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TexturePixels {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TexturePixels {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.rgba.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModelMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct ModelData {
    pub meshes: Vec<ModelMesh>,
}

impl ModelData {
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[derive(Debug)]
pub enum DecodeError {
    Io(std::io::Error),
    Corrupt(String),
    Unsupported(String),
    Empty(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Io(err) => write!(f, "io error: {err}"),
            DecodeError::Corrupt(detail) => write!(f, "corrupt asset: {detail}"),
            DecodeError::Unsupported(detail) => write!(f, "unsupported format: {detail}"),
            DecodeError::Empty(detail) => write!(f, "empty asset: {detail}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::Io(err)
    }
}

// Called from worker threads for streamed loads and from the caller's thread
// for blocking loads, so implementations must not assume a particular thread.
pub trait AssetDecoder: Send + Sync {
    fn decode_texture(&self, path: &str) -> Result<TexturePixels, DecodeError>;
    fn decode_model(&self, path: &str) -> Result<ModelData, DecodeError>;
}

// Reads PNG images and Wavefront OBJ models straight from disk.
pub struct DiskDecoder;

impl AssetDecoder for DiskDecoder {
    fn decode_texture(&self, path: &str) -> Result<TexturePixels, DecodeError> {
        let file = File::open(path)?;
        decode_png(BufReader::new(file))
    }

    fn decode_model(&self, path: &str) -> Result<ModelData, DecodeError> {
        // Probe the path first so a missing file surfaces as an io error
        // instead of tobj's generic load failure.
        File::open(path)?;
        decode_obj(path)
    }
}

fn decode_png<R: Read>(input: R) -> Result<TexturePixels, DecodeError> {
    let decoder = png::Decoder::new(input);
    let mut reader = decoder
        .read_info()
        .map_err(|err| DecodeError::Corrupt(err.to_string()))?;
    let bit_depth = reader.info().bit_depth;
    if bit_depth != png::BitDepth::Eight {
        return Err(DecodeError::Unsupported(format!("png bit depth {bit_depth:?}")));
    }
    let mut buffer = vec![0u8; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buffer)
        .map_err(|err| DecodeError::Corrupt(err.to_string()))?;
    if frame.width == 0 || frame.height == 0 {
        return Err(DecodeError::Empty("png has zero extent".to_string()));
    }
    buffer.truncate(frame.buffer_size());
    let rgba = match frame.color_type {
        png::ColorType::Rgba => buffer,
        png::ColorType::Rgb => expand_rgb(&buffer),
        png::ColorType::Grayscale => expand_gray(&buffer),
        png::ColorType::GrayscaleAlpha => expand_gray_alpha(&buffer),
        other => {
            return Err(DecodeError::Unsupported(format!("png color type {other:?}")));
        }
    };
    Ok(TexturePixels {
        width: frame.width,
        height: frame.height,
        rgba,
    })
}

fn expand_rgb(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for pixel in rgb.chunks_exact(3) {
        rgba.extend_from_slice(pixel);
        rgba.push(u8::MAX);
    }
    rgba
}

fn expand_gray(gray: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(gray.len() * 4);
    for &value in gray {
        rgba.extend_from_slice(&[value, value, value, u8::MAX]);
    }
    rgba
}

fn expand_gray_alpha(pairs: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(pairs.len() * 2);
    for pair in pairs.chunks_exact(2) {
        rgba.extend_from_slice(&[pair[0], pair[0], pair[0], pair[1]]);
    }
    rgba
}

fn decode_obj(path: &str) -> Result<ModelData, DecodeError> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, _) =
        tobj::load_obj(path, &options).map_err(|err| DecodeError::Corrupt(err.to_string()))?;
    let mut meshes = Vec::with_capacity(models.len());
    for model in models {
        let mesh = model.mesh;
        if mesh.positions.is_empty() || mesh.indices.is_empty() {
            continue;
        }
        meshes.push(ModelMesh {
            name: model.name,
            positions: mesh
                .positions
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]])
                .collect(),
            normals: mesh
                .normals
                .chunks_exact(3)
                .map(|n| [n[0], n[1], n[2]])
                .collect(),
            texcoords: mesh
                .texcoords
                .chunks_exact(2)
                .map(|t| [t[0], t[1]])
                .collect(),
            indices: mesh.indices,
        });
    }
    if meshes.is_empty() {
        return Err(DecodeError::Empty(format!("no loadable meshes in '{path}'")));
    }
    Ok(ModelData { meshes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::BufWriter;
    use std::path::Path;

    fn write_png(path: &Path, width: u32, height: u32, color: png::ColorType, data: &[u8]) {
        write_png_with_depth(path, width, height, color, png::BitDepth::Eight, data);
    }

    fn write_png_with_depth(
        path: &Path,
        width: u32,
        height: u32,
        color: png::ColorType,
        depth: png::BitDepth,
        data: &[u8],
    ) {
        let file = fs::File::create(path).expect("create test png");
        let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
        encoder.set_color(color);
        encoder.set_depth(depth);
        let mut writer = encoder.write_header().expect("write png header");
        writer.write_image_data(data).expect("write png data");
        writer.finish().expect("finish png");
    }

    fn utf8(path: &Path) -> &str {
        path.to_str().expect("utf8 test path")
    }

    #[test]
    fn png_rgba_decodes_as_is() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rgba.png");
        let pixels = [10u8, 20, 30, 255, 40, 50, 60, 128];
        write_png(&path, 2, 1, png::ColorType::Rgba, &pixels);

        let decoded = DiskDecoder.decode_texture(utf8(&path)).expect("decode rgba");
        assert_eq!(decoded.width, 2);
        assert_eq!(decoded.height, 1);
        assert_eq!(decoded.rgba, pixels);
        assert!(!decoded.is_empty());
    }

    #[test]
    fn png_rgb_gains_opaque_alpha() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rgb.png");
        write_png(&path, 1, 1, png::ColorType::Rgb, &[9, 8, 7]);

        let decoded = DiskDecoder.decode_texture(utf8(&path)).expect("decode rgb");
        assert_eq!(decoded.rgba, vec![9, 8, 7, 255]);
    }

    #[test]
    fn png_grayscale_expands_to_rgba() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gray.png");
        write_png(&path, 1, 1, png::ColorType::Grayscale, &[42]);

        let decoded = DiskDecoder.decode_texture(utf8(&path)).expect("decode gray");
        assert_eq!(decoded.rgba, vec![42, 42, 42, 255]);
    }

    #[test]
    fn png_sixteen_bit_is_unsupported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("deep.png");
        write_png_with_depth(
            &path,
            1,
            1,
            png::ColorType::Grayscale,
            png::BitDepth::Sixteen,
            &[0, 1],
        );

        let err = DiskDecoder.decode_texture(utf8(&path)).unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported(_)), "got {err}");
    }

    #[test]
    fn missing_texture_is_io_error() {
        let err = DiskDecoder
            .decode_texture("no/such/texture.png")
            .unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)), "got {err}");
    }

    #[test]
    fn garbage_texture_is_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("garbage.png");
        fs::write(&path, b"not a png at all").expect("write garbage");

        let err = DiskDecoder.decode_texture(utf8(&path)).unwrap_err();
        assert!(matches!(err, DecodeError::Corrupt(_)), "got {err}");
    }

    #[test]
    fn obj_triangle_produces_mesh() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tri.obj");
        fs::write(
            &path,
            "v 0.0 0.0 0.0\nv 1.0 0.0 0.0\nv 0.0 1.0 0.0\nf 1 2 3\n",
        )
        .expect("write obj");

        let decoded = DiskDecoder.decode_model(utf8(&path)).expect("decode obj");
        assert_eq!(decoded.meshes.len(), 1);
        let mesh = &decoded.meshes[0];
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.indices.len(), 3);
        assert_eq!(mesh.positions[1], [1.0, 0.0, 0.0]);
        assert!(!decoded.is_empty());
    }

    #[test]
    fn faceless_obj_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("points.obj");
        fs::write(&path, "v 0.0 0.0 0.0\nv 1.0 0.0 0.0\n").expect("write obj");

        let err = DiskDecoder.decode_model(utf8(&path)).unwrap_err();
        assert!(matches!(err, DecodeError::Empty(_)), "got {err}");
    }

    #[test]
    fn missing_model_is_io_error() {
        let err = DiskDecoder.decode_model("no/such/model.obj").unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)), "got {err}");
    }
}
