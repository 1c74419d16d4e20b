use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::gpu::GpuContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed,
}

impl LoadState {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadState::Loading => "loading",
            LoadState::Ready => "ready",
            LoadState::Failed => "failed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureWrap {
    Clamp,
    Repeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureSettings {
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
    pub generate_mipmaps: bool,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            filter: TextureFilter::Linear,
            wrap: TextureWrap::Repeat,
            generate_mipmaps: true,
        }
    }
}

// Order matches the +X, -X, +Y, -Y, +Z, -Z face convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CubemapFace {
    Right,
    Left,
    Top,
    Bottom,
    Front,
    Back,
}

impl CubemapFace {
    pub const COUNT: usize = 6;
    pub const ALL: [CubemapFace; CubemapFace::COUNT] = [
        CubemapFace::Right,
        CubemapFace::Left,
        CubemapFace::Top,
        CubemapFace::Bottom,
        CubemapFace::Front,
        CubemapFace::Back,
    ];

    pub fn index(self) -> usize {
        match self {
            CubemapFace::Right => 0,
            CubemapFace::Left => 1,
            CubemapFace::Top => 2,
            CubemapFace::Bottom => 3,
            CubemapFace::Front => 4,
            CubemapFace::Back => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CubemapFace::Right => "right",
            CubemapFace::Left => "left",
            CubemapFace::Top => "top",
            CubemapFace::Bottom => "bottom",
            CubemapFace::Front => "front",
            CubemapFace::Back => "back",
        }
    }
}

pub type TextureCallback<G> = Box<dyn FnOnce(Rc<Texture<G>>)>;
pub type CubemapCallback<G> = Box<dyn FnOnce(Rc<Cubemap<G>>)>;
pub type ModelCallback<G> = Box<dyn FnOnce(Rc<Model<G>>)>;

// Handles are Rc-shared and mutated through Cell/RefCell, which pins them to
// the thread that owns the streamer. Workers only ever see paths and payloads.
pub struct Texture<G: GpuContext> {
    path: String,
    settings: TextureSettings,
    state: Cell<LoadState>,
    gpu: RefCell<Option<G::TextureData>>,
    callback: RefCell<Option<TextureCallback<G>>>,
}

impl<G: GpuContext> Texture<G> {
    pub(crate) fn new(path: String, settings: TextureSettings) -> Self {
        Self {
            path,
            settings,
            state: Cell::new(LoadState::Loading),
            gpu: RefCell::new(None),
            callback: RefCell::new(None),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn settings(&self) -> TextureSettings {
        self.settings
    }

    pub fn state(&self) -> LoadState {
        self.state.get()
    }

    pub fn is_ready(&self) -> bool {
        self.state.get() == LoadState::Ready
    }

    pub fn is_failed(&self) -> bool {
        self.state.get() == LoadState::Failed
    }

    pub fn gpu_data(&self) -> Option<Ref<'_, G::TextureData>> {
        Ref::filter_map(self.gpu.borrow(), Option::as_ref).ok()
    }

    pub(crate) fn finalize(&self, data: G::TextureData) {
        *self.gpu.borrow_mut() = Some(data);
        self.state.set(LoadState::Ready);
    }

    pub(crate) fn fail(&self) {
        self.state.set(LoadState::Failed);
        self.gpu.borrow_mut().take();
        self.callback.borrow_mut().take();
    }

    pub(crate) fn set_callback(&self, callback: TextureCallback<G>) {
        *self.callback.borrow_mut() = Some(callback);
    }

    pub(crate) fn take_callback(&self) -> Option<TextureCallback<G>> {
        self.callback.borrow_mut().take()
    }
}

pub struct Cubemap<G: GpuContext> {
    key: String,
    faces: [String; CubemapFace::COUNT],
    settings: TextureSettings,
    state: Cell<LoadState>,
    faces_loaded: Cell<usize>,
    gpu: RefCell<Option<G::CubemapData>>,
    callback: RefCell<Option<CubemapCallback<G>>>,
}

impl<G: GpuContext> Cubemap<G> {
    pub(crate) fn new(
        key: String,
        faces: [String; CubemapFace::COUNT],
        settings: TextureSettings,
    ) -> Self {
        Self {
            key,
            faces,
            settings,
            state: Cell::new(LoadState::Loading),
            faces_loaded: Cell::new(0),
            gpu: RefCell::new(None),
            callback: RefCell::new(None),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn face_path(&self, face: CubemapFace) -> &str {
        &self.faces[face.index()]
    }

    pub fn settings(&self) -> TextureSettings {
        self.settings
    }

    pub fn state(&self) -> LoadState {
        self.state.get()
    }

    pub fn is_ready(&self) -> bool {
        self.state.get() == LoadState::Ready
    }

    pub fn is_failed(&self) -> bool {
        self.state.get() == LoadState::Failed
    }

    pub fn faces_loaded(&self) -> usize {
        self.faces_loaded.get()
    }

    pub fn gpu_data(&self) -> Option<Ref<'_, G::CubemapData>> {
        Ref::filter_map(self.gpu.borrow(), Option::as_ref).ok()
    }

    pub(crate) fn gpu_slot(&self) -> RefMut<'_, Option<G::CubemapData>> {
        self.gpu.borrow_mut()
    }

    pub(crate) fn record_face_loaded(&self) -> usize {
        let count = self.faces_loaded.get() + 1;
        self.faces_loaded.set(count);
        count
    }

    pub(crate) fn mark_ready(&self) {
        self.state.set(LoadState::Ready);
    }

    pub(crate) fn fail(&self) {
        self.state.set(LoadState::Failed);
        self.gpu.borrow_mut().take();
        self.callback.borrow_mut().take();
    }

    pub(crate) fn set_callback(&self, callback: CubemapCallback<G>) {
        *self.callback.borrow_mut() = Some(callback);
    }

    pub(crate) fn take_callback(&self) -> Option<CubemapCallback<G>> {
        self.callback.borrow_mut().take()
    }
}

pub struct Model<G: GpuContext> {
    path: String,
    state: Cell<LoadState>,
    gpu: RefCell<Option<G::ModelData>>,
    callback: RefCell<Option<ModelCallback<G>>>,
}

impl<G: GpuContext> Model<G> {
    pub(crate) fn new(path: String) -> Self {
        Self {
            path,
            state: Cell::new(LoadState::Loading),
            gpu: RefCell::new(None),
            callback: RefCell::new(None),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> LoadState {
        self.state.get()
    }

    pub fn is_ready(&self) -> bool {
        self.state.get() == LoadState::Ready
    }

    pub fn is_failed(&self) -> bool {
        self.state.get() == LoadState::Failed
    }

    pub fn gpu_data(&self) -> Option<Ref<'_, G::ModelData>> {
        Ref::filter_map(self.gpu.borrow(), Option::as_ref).ok()
    }

    pub(crate) fn finalize(&self, data: G::ModelData) {
        *self.gpu.borrow_mut() = Some(data);
        self.state.set(LoadState::Ready);
    }

    pub(crate) fn fail(&self) {
        self.state.set(LoadState::Failed);
        self.gpu.borrow_mut().take();
        self.callback.borrow_mut().take();
    }

    pub(crate) fn set_callback(&self, callback: ModelCallback<G>) {
        *self.callback.borrow_mut() = Some(callback);
    }

    pub(crate) fn take_callback(&self) -> Option<ModelCallback<G>> {
        self.callback.borrow_mut().take()
    }
}
