pub mod backgrounds;
pub mod bubble;
pub mod character;
pub mod compositor;
pub mod frame_buffer;
pub mod raster;
pub mod scene_graph;
pub mod svg;
pub mod timeline;

pub use compositor::{Compositor, Frame, RenderSettings};
pub use frame_buffer::FrameBuffer;
pub use raster::{CpuRasterizer, Rasterizer};
pub use scene_graph::FrameVisual;
pub use timeline::{FrameRef, Timeline};
