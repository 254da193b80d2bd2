//! Error types for the library.

use thiserror::Error;

/// Library-wide error type.
///
/// Every variant is a precondition violation at the mesh-provider or caller
/// boundary. Missed ray and sweep queries are not errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Mesh has no vertices or no triangles
    #[error("mesh is empty: {vertices} vertices, {indices} indices")]
    EmptyMesh { vertices: usize, indices: usize },

    /// Index buffer length is not a multiple of three
    #[error("index buffer length {len} is not a multiple of 3")]
    MalformedIndexBuffer { len: usize },

    /// Flat position buffer length is not a multiple of three
    #[error("position buffer length {len} is not a multiple of 3")]
    MisalignedPositions { len: usize },

    /// Triangle references a vertex that does not exist
    #[error("triangle {triangle} references vertex {index}, but only {vertex_count} vertices exist")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    /// Vertex position contains NaN or infinity
    #[error("vertex {index} has a non-finite position")]
    NonFiniteVertex { index: usize },

    /// Configuration value out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Object handle does not refer to a live object
    #[error("unknown collision object: {0}")]
    UnknownObject(u32),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
