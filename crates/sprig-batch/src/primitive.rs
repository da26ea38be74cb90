//! Primitive topologies and primitive/index count conversion.

/// Topology of the primitives drawn within one batch bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveType {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
    LineStrip,
    PointList,
}

impl PrimitiveType {
    /// Vertices per primitive before any sharing (3 for triangles, 2 for lines).
    pub const fn vertices_per_primitive(self) -> u32 {
        match self {
            PrimitiveType::TriangleList | PrimitiveType::TriangleStrip => 3,
            PrimitiveType::LineList | PrimitiveType::LineStrip => 2,
            PrimitiveType::PointList => 1,
        }
    }

    /// Whether consecutive primitives share vertices.
    pub const fn is_strip(self) -> bool {
        matches!(self, PrimitiveType::TriangleStrip | PrimitiveType::LineStrip)
    }

    /// Number of indices needed to draw `primitive_count` primitives, or
    /// `None` when that does not fit in a `u32`.
    pub const fn index_count(self, primitive_count: u32) -> Option<u32> {
        if primitive_count == 0 {
            return Some(0);
        }
        if self.is_strip() {
            primitive_count.checked_add(self.vertices_per_primitive() - 1)
        } else {
            primitive_count.checked_mul(self.vertices_per_primitive())
        }
    }

    /// Number of whole primitives described by `index_count` indices, or
    /// `None` when the count does not form whole primitives.
    pub const fn primitive_count(self, index_count: u32) -> Option<u32> {
        let per = self.vertices_per_primitive();
        if self.is_strip() {
            if index_count < per {
                None
            } else {
                Some(index_count - per + 1)
            }
        } else if index_count % per == 0 {
            Some(index_count / per)
        } else {
            None
        }
    }

    /// The equivalent wgpu topology, used when building effect pipelines.
    pub const fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            PrimitiveType::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveType::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
            PrimitiveType::LineList => wgpu::PrimitiveTopology::LineList,
            PrimitiveType::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            PrimitiveType::PointList => wgpu::PrimitiveTopology::PointList,
        }
    }
}

impl std::fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimitiveType::TriangleList => write!(f, "TriangleList"),
            PrimitiveType::TriangleStrip => write!(f, "TriangleStrip"),
            PrimitiveType::LineList => write!(f, "LineList"),
            PrimitiveType::LineStrip => write!(f, "LineStrip"),
            PrimitiveType::PointList => write!(f, "PointList"),
        }
    }
}
