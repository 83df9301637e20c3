//! Request payload construction.
//!
//! A payload is always exactly two parts: the prompt text, then one media
//! part. The shape serializes to the `parts` array of a Gemini
//! `generateContent` request.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::fetcher::FetchedVideo;
use crate::NodeError;

/// MIME type assumed for videos referenced by URL.
pub const DEFAULT_VIDEO_MIME_TYPE: &str = "video/mp4";

/// The video half of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    /// Provider fetches the video from `uri` itself.
    UriReference { mime_type: String, uri: String },
    /// Video bytes travel inside the request, base64-encoded.
    InlineBytes { mime_type: String, base64_data: String },
}

impl From<FetchedVideo> for Media {
    fn from(video: FetchedVideo) -> Self {
        Media::InlineBytes {
            base64_data: STANDARD.encode(&video.bytes),
            mime_type: video.mime_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// One segment of a multi-part request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Prompt followed by exactly one media part.
///
/// Only [`build`] constructs one, so the ordering and part count hold for
/// every value of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequestPayload {
    parts: [Part; 2],
}

impl RequestPayload {
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// The prompt part.
    pub fn text(&self) -> &Part {
        &self.parts[0]
    }

    /// The media part.
    pub fn media(&self) -> &Part {
        &self.parts[1]
    }
}

/// Build the two-part payload for `prompt` and `media`.
///
/// # Errors
/// [`NodeError::Config`] when the prompt is blank.
pub fn build(prompt: &str, media: Media) -> Result<RequestPayload, NodeError> {
    if prompt.trim().is_empty() {
        return Err(NodeError::config("customPrompt", "must not be empty"));
    }

    let media_part = match media {
        Media::UriReference { mime_type, uri } => Part::FileData {
            file_data: FileData {
                mime_type,
                file_uri: uri,
            },
        },
        Media::InlineBytes {
            mime_type,
            base64_data,
        } => Part::InlineData {
            inline_data: InlineData {
                mime_type,
                data: base64_data,
            },
        },
    };

    Ok(RequestPayload {
        parts: [
            Part::Text {
                text: prompt.to_owned(),
            },
            media_part,
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uri_reference_follows_prompt() {
        let payload = build(
            "Describe the scene",
            Media::UriReference {
                mime_type: "video/webm".into(),
                uri: "https://example.com/a.webm".into(),
            },
        )
        .unwrap();

        assert_eq!(
            payload.text(),
            &Part::Text {
                text: "Describe the scene".into()
            }
        );
        assert_eq!(
            payload.media(),
            &Part::FileData {
                file_data: FileData {
                    mime_type: "video/webm".into(),
                    file_uri: "https://example.com/a.webm".into(),
                }
            }
        );
    }

    #[test]
    fn inline_data_is_passed_through_unchanged() {
        let payload = build(
            "Count the cars",
            Media::InlineBytes {
                mime_type: "video/mp4".into(),
                base64_data: "AAAAIGZ0eXBpc29t".into(),
            },
        )
        .unwrap();

        match payload.media() {
            Part::InlineData { inline_data } => {
                assert_eq!(inline_data.data, "AAAAIGZ0eXBpc29t");
                assert_eq!(inline_data.mime_type, "video/mp4");
            }
            other => panic!("expected inline media, got {other:?}"),
        }
    }

    #[test]
    fn serializes_to_provider_part_shape() {
        let payload = build(
            "P",
            Media::UriReference {
                mime_type: DEFAULT_VIDEO_MIME_TYPE.into(),
                uri: "https://example.com/v.mp4".into(),
            },
        )
        .unwrap();

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!([
                { "text": "P" },
                { "fileData": { "mimeType": "video/mp4", "fileUri": "https://example.com/v.mp4" } }
            ])
        );
    }

    #[test]
    fn fetched_video_is_base64_encoded() {
        let media = Media::from(FetchedVideo {
            bytes: b"hello".to_vec(),
            mime_type: "video/quicktime".into(),
            size_bytes: 5,
        });

        assert_eq!(
            media,
            Media::InlineBytes {
                mime_type: "video/quicktime".into(),
                base64_data: "aGVsbG8=".into(),
            }
        );
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let err = build(
            " ",
            Media::UriReference {
                mime_type: DEFAULT_VIDEO_MIME_TYPE.into(),
                uri: "https://example.com/v.mp4".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, NodeError::Config { .. }));
    }
}
