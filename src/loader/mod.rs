//! Model loading
//!
//! Every supported format has one loader with the same signature,
//! `(path, scale) -> SceneNode`. [`ModelFormat::loader`] picks it from a
//! static table; the format is always given explicitly and never sniffed from
//! file contents.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Instant,
};

use crate::gfx::scene::node::SceneNode;

pub mod cache;
pub mod error;
mod fbx;
mod glb;
mod obj;
pub mod task;
mod usdz;

pub use cache::{CacheError, ModelCache};
pub use error::{FbxError, LoadError, UsdzError};
pub use task::LoadTask;

/// Loader entry point shared by all formats
pub type LoaderFn = fn(&Path, f32) -> Result<SceneNode, LoadError>;

/// Indexed by `ModelFormat as usize`
const LOADERS: [LoaderFn; 4] = [glb::load, obj::load, fbx::load, usdz::load];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ModelFormat {
    Glb,
    Obj,
    Fbx,
    Usdz,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 4] = [Self::Glb, Self::Obj, Self::Fbx, Self::Usdz];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelFormat::Glb => "glb",
            ModelFormat::Obj => "obj",
            ModelFormat::Fbx => "fbx",
            ModelFormat::Usdz => "usdz",
        }
    }

    /// Formats that tend to exhaust GPU memory and get a reduced render tier
    pub fn is_heavy(self) -> bool {
        !matches!(self, ModelFormat::Glb)
    }

    /// Guesses the format from a file extension, for dropped files
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "glb" | "gltf" => Some(ModelFormat::Glb),
            "obj" => Some(ModelFormat::Obj),
            "fbx" => Some(ModelFormat::Fbx),
            "usdz" => Some(ModelFormat::Usdz),
            _ => None,
        }
    }

    pub fn loader(self) -> LoaderFn {
        LOADERS[self as usize]
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which file to load and how
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelDescriptor {
    pub path: PathBuf,
    pub format: ModelFormat,
}

impl ModelDescriptor {
    pub fn new(path: impl Into<PathBuf>, format: ModelFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Cache and remount key, `"{format}-{path}"`
    pub fn key(&self) -> String {
        format!("{}-{}", self.format, self.path.display())
    }
}

/// Loads `descriptor` from disk with the format's loader
pub fn load_model(descriptor: &ModelDescriptor, scale: f32) -> Result<SceneNode, LoadError> {
    let started = Instant::now();
    log::info!("Loading {} model {}", descriptor.format, descriptor.path.display());

    let result = (descriptor.format.loader())(&descriptor.path, scale);
    match &result {
        Ok(root) => log::info!(
            "Loaded {} ({} meshes) in {:.2?}",
            descriptor.path.display(),
            root.mesh_count(),
            started.elapsed()
        ),
        Err(err) => log::error!("Failed to load {}: {err}", descriptor.path.display()),
    }
    result
}

/// Names the root, applies the uniform scale and rejects empty models
fn finish_root(mut root: SceneNode, path: &Path, scale: f32) -> Result<SceneNode, LoadError> {
    if root.mesh_count() == 0 {
        return Err(LoadError::NoGeometry {
            path: path.to_path_buf(),
        });
    }
    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
        root.name = stem.to_string();
    }
    root.transform.set_uniform_scale(scale);
    Ok(root)
}

fn read_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::io(path, source))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    /// Writes `bytes` to a unique file in the temp dir
    pub fn fixture(name: &str, bytes: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("truffle-showcase-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    pub const CUBE_OBJ: &str = "\
o cube
v -1 -1 -1
v 1 -1 -1
v 1 1 -1
v -1 1 -1
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
f 1 2 3 4
f 5 8 7 6
f 1 5 6 2
f 2 6 7 3
f 3 7 8 4
f 5 1 4 8
";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_key() {
        let descriptor = ModelDescriptor::new("models/truffle.glb", ModelFormat::Glb);
        assert_eq!(descriptor.key(), "glb-models/truffle.glb");
    }

    #[test]
    fn test_heavy_formats() {
        assert!(!ModelFormat::Glb.is_heavy());
        assert!(ModelFormat::Obj.is_heavy());
        assert!(ModelFormat::Fbx.is_heavy());
        assert!(ModelFormat::Usdz.is_heavy());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ModelFormat::from_extension(Path::new("a/B.FBX")), Some(ModelFormat::Fbx));
        assert_eq!(ModelFormat::from_extension(Path::new("scene.gltf")), Some(ModelFormat::Glb));
        assert_eq!(ModelFormat::from_extension(Path::new("notes.txt")), None);
        assert_eq!(ModelFormat::from_extension(Path::new("noext")), None);
    }

    #[test]
    fn test_dispatch_table_matches_formats() {
        let missing = Path::new("/definitely/not/here.model");
        for format in ModelFormat::ALL {
            let err = (format.loader())(missing, 1.0).unwrap_err();
            assert!(matches!(err, LoadError::Io { .. }), "{format}: {err}");
        }
    }

    #[test]
    fn test_load_model_applies_scale() {
        let path = test_support::fixture("scaled.obj", test_support::CUBE_OBJ.as_bytes());
        let descriptor = ModelDescriptor::new(&path, ModelFormat::Obj);
        let root = load_model(&descriptor, 2.5).unwrap();
        assert_eq!(root.transform.scale.x, 2.5);
        assert_eq!(root.name, "scaled");
    }
}
