//! `VideoAnalysisNode` — analyse a video with Gemini and return the text.
//!
//! Per item: resolve parameters, optionally download the video, build the
//! two-part payload, call the generator. Any stage failing ends the item
//! with that stage's error and no request is sent.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::fetcher::VideoFetcher;
use crate::generator::ContentGenerator;
use crate::params::{IngestMode, VideoAnalysisParams};
use crate::payload::{self, Media, DEFAULT_VIDEO_MIME_TYPE};
use crate::traits::ExecutionContext;
use crate::{ExecutableNode, NodeError};

/// JSON produced for a successful item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisOutput {
    pub text: String,
    pub model: String,
    pub prompt: String,
}

pub struct VideoAnalysisNode {
    generator: Arc<dyn ContentGenerator>,
    fetcher: VideoFetcher,
    mode: IngestMode,
}

impl VideoAnalysisNode {
    /// `generator` is shared by every item the node processes.
    pub fn new(generator: Arc<dyn ContentGenerator>, fetcher: VideoFetcher, mode: IngestMode) -> Self {
        Self {
            generator,
            fetcher,
            mode,
        }
    }

    async fn media_for(&self, params: &VideoAnalysisParams) -> Result<Media, NodeError> {
        match self.mode {
            IngestMode::UriReference => Ok(Media::UriReference {
                mime_type: DEFAULT_VIDEO_MIME_TYPE.to_owned(),
                uri: params.video_url.clone(),
            }),
            IngestMode::InlineBytes => {
                let video = self
                    .fetcher
                    .fetch(&params.video_url, params.options.max_video_size_mb)
                    .await?;
                Ok(video.into())
            }
        }
    }
}

#[async_trait]
impl ExecutableNode for VideoAnalysisNode {
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let params = VideoAnalysisParams::resolve(&input, self.mode)?;

        let media = self.media_for(&params).await?;
        let payload = payload::build(&params.custom_prompt, media)?;

        info!(item = ctx.item_index, "Analyzing video with {}...", params.model);
        let text = self
            .generator
            .generate(params.model, &payload, params.options.temperature)
            .await?;

        let output = AnalysisOutput {
            text,
            model: params.model.as_str().to_owned(),
            prompt: params.custom_prompt,
        };
        Ok(serde_json::json!(output))
    }
}
