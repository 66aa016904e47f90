//! Reader and writer for MT Framework `MOD` v156 models.
//!
//! A model is one little-endian file: a 176 byte header, opaque blocks, the
//! skeleton, bone palettes, texture paths, materials, mesh descriptors,
//! per-bone bounds, then the shared vertex and index buffers. Meshes index
//! into those buffers with ranges and store their triangles as strips.
//!
//! ```no_run
//! use mtf_mod::Mod156;
//!
//! let data = std::fs::read("pl0200.mod")?;
//! let model = Mod156::parse(data)?;
//! let report = model.decode_meshes();
//! for mesh in &report.meshes {
//!     println!(
//!         "mesh {}: {} vertices, {} triangles",
//!         mesh.index,
//!         mesh.vertices.len(),
//!         mesh.triangles().len()
//!     );
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bone;
pub mod bounds;
pub mod error;
pub mod export;
pub mod material;
pub mod mesh;
pub mod model;
pub mod palette;
pub mod strip;
pub mod vertex;
pub mod weights;

pub use bone::{Bone, BonePalette};
pub use bounds::WeightBound;
pub use error::{ModError, Result};
pub use export::{ExportMesh, ExportModel, ExportOptions, ExportVertex, export_mod156};
pub use material::{BlendFlags, Material, MaterialFlags, ShaderFlags, TextureSlot};
pub use mesh::{Mesh, MeshFlags};
pub use model::{DecodedMesh, GroupData, HEADER_SIZE, MOD_MAGIC, MOD_VERSION, MeshDecodeReport, Mod156, Vertex};
pub use vertex::{VERTEX_LAYOUTS, VertexLayout, layout_for};
