//! 3D scene content: meshes, textures and the scene they make up.

pub mod mesh;
pub mod scene;
pub mod shapes;
pub mod texture;

pub use mesh::{LayoutError, Mesh, VertexBinding, VertexLayout};
pub use scene::{DecodedImage, Drawable, Scene, SceneAssets, SceneEntry, SceneError};
pub use texture::{Texture, TextureError};
