use std::{
    cell::RefCell,
    path::PathBuf,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use flow_twodee::{
    Duration, TextureRegistry,
    camera::Rect,
    data_structures::texture::Texture,
    event::MouseEvent,
    layers::Layer,
    render::{QuadTarget, Vertex},
};
use image::{DynamicImage, Rgba, RgbaImage};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Everything a drawable asked its target to do, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Projection(Rect),
    Bind(String),
    Quad([Vertex; 4]),
    Unbind,
}

#[derive(Debug, Default)]
pub struct RecordingTarget {
    pub calls: Vec<Call>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quads(&self) -> Vec<[Vertex; 4]> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Quad(quad) => Some(*quad),
                _ => None,
            })
            .collect()
    }

    /// Top-left corner of every submitted quad.
    pub fn origins(&self) -> Vec<(f32, f32)> {
        self.quads()
            .iter()
            .map(|quad| (quad[0].position[0], quad[0].position[1]))
            .collect()
    }
}

impl QuadTarget for RecordingTarget {
    fn set_projection(&mut self, view: Rect) {
        self.calls.push(Call::Projection(view));
    }

    fn bind(&mut self, texture: &Arc<Texture>) {
        self.calls.push(Call::Bind(texture.label().to_string()));
    }

    fn quad(&mut self, vertices: &[Vertex; 4]) {
        self.calls.push(Call::Quad(*vertices));
    }

    fn unbind(&mut self) {
        self.calls.push(Call::Unbind);
    }
}

/// A registry with one blank `width` x `height` sheet named `name`.
pub fn registry_with(name: &str, width: u32, height: u32) -> TextureRegistry {
    let mut textures = TextureRegistry::new();
    textures.insert(name, &DynamicImage::new_rgba8(width, height));
    textures
}

pub fn image_from_pixels(width: u32, height: u32, pixels: &[[u8; 4]]) -> RgbaImage {
    assert_eq!(pixels.len(), (width * height) as usize);
    RgbaImage::from_fn(width, height, |x, y| Rgba(pixels[(y * width + x) as usize]))
}

static TEMP_FILES: AtomicUsize = AtomicUsize::new(0);

/// A fresh path in the system temp dir; the file is not created.
pub fn temp_path(name: &str) -> PathBuf {
    let n = TEMP_FILES.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "flow-twodee-{}-{}-{}",
        std::process::id(),
        n,
        name
    ))
}

pub fn write_png(name: &str, img: &RgbaImage) -> PathBuf {
    let path = temp_path(&format!("{name}.png"));
    img.save_with_format(&path, image::ImageFormat::Png)
        .expect("could not write test map");
    path
}

pub type CallLog = Rc<RefCell<Vec<String>>>;

/// A layer that logs every call and answers mouse events with `handles`.
pub struct RecordingLayer {
    pub name: &'static str,
    pub handles: bool,
    pub log: CallLog,
}

impl RecordingLayer {
    pub fn boxed(name: &'static str, handles: bool, log: &CallLog) -> Box<dyn Layer> {
        Box::new(Self {
            name,
            handles,
            log: log.clone(),
        })
    }

    fn record(&self, what: &str) {
        self.log.borrow_mut().push(format!("{}:{}", self.name, what));
    }
}

impl Layer for RecordingLayer {
    fn render(&mut self, _target: &mut dyn QuadTarget) {
        self.record("render");
    }

    fn update(&mut self, _dt: Duration) {
        self.record("update");
    }

    fn delete(&mut self) {
        self.record("delete");
    }

    fn handle_mouse_event(&mut self, _event: &MouseEvent) -> bool {
        self.record("mouse");
        self.handles
    }
}
