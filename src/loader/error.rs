use std::path::PathBuf;

/// Failure to turn a model file into a scene node
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("OBJ error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("FBX error: {0}")]
    Fbx(#[from] FbxError),

    #[error("USDZ error: {0}")]
    Usdz(#[from] UsdzError),

    #[error("no renderable geometry in {path}")]
    NoGeometry { path: PathBuf },

    #[error("load cancelled")]
    Cancelled,
}

impl LoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FbxError {
    #[error("not a binary FBX file")]
    BadMagic,

    #[error("unexpected end of data at offset {0}")]
    Truncated(usize),

    #[error("unsupported property type '{0}'")]
    UnsupportedProperty(char),

    #[error("failed to decompress array: {0}")]
    Decompress(String),

    #[error("array of {count} x {element_size} bytes exceeds the size limit")]
    ArrayTooLarge { count: usize, element_size: usize },

    #[error("records nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("no geometry found")]
    MissingGeometry,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum UsdzError {
    #[error("not a zip package")]
    NotZip,

    #[error("entry '{0}' is compressed; USDZ entries must be stored")]
    CompressedEntry(String),

    #[error("package contains no USD layer")]
    NoLayer,

    #[error("binary USD crate layers are not supported ('{0}')")]
    BinaryLayer(String),

    #[error("malformed USD layer: {0}")]
    Malformed(String),
}
