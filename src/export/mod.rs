pub mod encoder;
pub mod exporter;
pub mod job;
pub mod registry;
pub mod staging;

pub use encoder::{EncodeOutcome, EncodeRequest, FfmpegEncoder, VideoEncoder};
pub use exporter::{ExportRequest, Exporter};
pub use job::{CancellationToken, ExportJob, ExportReport, ExportState};
pub use registry::{ExportRegistry, FrameCache};
pub use staging::StagingLayout;
