//! `nodes` crate — the `ExecutableNode` trait and the video analysis node.
//!
//! The node is assembled from three stages, each usable on its own:
//! [`fetcher`] downloads a video under a size cap, [`payload`] shapes the
//! prompt and media into request parts, and [`generator`] sends them to
//! Gemini. [`video_analysis`] wires them together per input item.

pub mod error;
pub mod traits;
pub mod params;
pub mod fetcher;
pub mod payload;
pub mod generator;
pub mod video_analysis;
pub mod mock;

pub use error::NodeError;
pub use traits::{ExecutableNode, ExecutionContext};
pub use params::{GeminiModel, IngestMode, VideoAnalysisParams};
pub use generator::{ContentGenerator, GeminiClient, GeminiConfig};
pub use fetcher::{FetcherConfig, VideoFetcher};
pub use video_analysis::{AnalysisOutput, VideoAnalysisNode};
