//! Scene graph
//!
//! [`Scene`] owns the camera and the node tree; [`node`] defines the nodes and
//! shared geometry loaders produce.

pub mod node;
pub mod scene;
pub mod vertex;

pub use node::{Geometry, MeshData, NodeKind, SceneNode, Transform};
pub use scene::Scene;
pub use vertex::Vertex3D;
