//! Per-item parameters for the video analysis node.
//!
//! Items arrive as loosely-typed JSON. [`VideoAnalysisParams::resolve`] turns
//! one item into a validated struct with every default applied, so nothing
//! downstream has to look at raw JSON again.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::NodeError;

/// Sampling temperature used when the item does not set one.
pub const DEFAULT_TEMPERATURE: f64 = 0.5;

/// Download cap in megabytes used when the item does not set one.
pub const DEFAULT_MAX_VIDEO_SIZE_MB: f64 = 25.0;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Gemini models the node accepts.
///
/// One list serves both ingest modes: `Pro` is also allowed with inline
/// bytes and `FlashThinking` with a URI reference. Only the default model
/// differs per mode (see [`IngestMode::default_model`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeminiModel {
    Flash,
    FlashThinking,
    Pro,
}

impl GeminiModel {
    pub const ALL: [GeminiModel; 3] = [Self::Flash, Self::FlashThinking, Self::Pro];

    /// Identifier sent to the generation endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flash => "gemini-2.0-flash-exp",
            Self::FlashThinking => "gemini-2.0-flash-thinking-exp-01-21",
            Self::Pro => "gemini-2.0-pro",
        }
    }
}

impl fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeminiModel {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                NodeError::config(
                    "model",
                    format!("unknown model '{s}' (expected one of: {})", known.join(", ")),
                )
            })
    }
}

// ---------------------------------------------------------------------------
// Ingest mode
// ---------------------------------------------------------------------------

/// How the video reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestMode {
    /// Pass the URL through as a `fileData` part; the provider fetches it.
    #[default]
    UriReference,
    /// Download the video and embed it as base64 `inlineData`.
    InlineBytes,
}

impl IngestMode {
    /// Model used when an item leaves `model` unset.
    pub fn default_model(self) -> GeminiModel {
        match self {
            Self::UriReference => GeminiModel::Flash,
            Self::InlineBytes => GeminiModel::FlashThinking,
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Optional tuning knobs of an item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    /// Sampling temperature in `[0, 1]`.
    pub temperature: f64,
    /// Largest video the fetcher will accept, in MB.
    pub max_video_size_mb: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_video_size_mb: DEFAULT_MAX_VIDEO_SIZE_MB,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawOptions {
    temperature: Option<f64>,
    #[serde(rename = "maxVideoSizeMB", alias = "maxVideoSize")]
    max_video_size_mb: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    video_url: Option<String>,
    custom_prompt: Option<String>,
    model: Option<String>,
    options: Option<RawOptions>,
}

// ---------------------------------------------------------------------------
// Resolved parameters
// ---------------------------------------------------------------------------

/// One item's parameters, validated and with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAnalysisParams {
    /// As supplied by the item; validated as an absolute http(s) URL.
    pub video_url: String,
    pub custom_prompt: String,
    pub model: GeminiModel,
    pub options: AnalysisOptions,
}

impl VideoAnalysisParams {
    /// Resolve an item's JSON into typed parameters.
    ///
    /// # Errors
    /// [`NodeError::Config`] naming the first parameter that is missing or
    /// out of range.
    pub fn resolve(input: &Value, mode: IngestMode) -> Result<Self, NodeError> {
        if !input.is_object() {
            return Err(NodeError::config("item", "expected a JSON object"));
        }
        let raw: RawItem = serde_json::from_value(input.clone())
            .map_err(|e| NodeError::config("item", e.to_string()))?;

        let video_url = parse_video_url(raw.video_url.as_deref())?;

        let custom_prompt = raw
            .custom_prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| NodeError::config("customPrompt", "must not be empty"))?;

        let model = match raw.model.as_deref() {
            Some(m) => m.parse()?,
            None => mode.default_model(),
        };

        let raw_options = raw.options.unwrap_or_default();
        let defaults = AnalysisOptions::default();

        let temperature = raw_options.temperature.unwrap_or(defaults.temperature);
        if !(0.0..=1.0).contains(&temperature) {
            return Err(NodeError::config(
                "options.temperature",
                format!("{temperature} is outside [0, 1]"),
            ));
        }

        let max_video_size_mb = raw_options
            .max_video_size_mb
            .unwrap_or(defaults.max_video_size_mb);
        if !max_video_size_mb.is_finite() || max_video_size_mb <= 0.0 {
            return Err(NodeError::config(
                "options.maxVideoSizeMB",
                format!("{max_video_size_mb} must be a positive number"),
            ));
        }

        Ok(Self {
            video_url,
            custom_prompt,
            model,
            options: AnalysisOptions {
                temperature,
                max_video_size_mb,
            },
        })
    }
}

fn parse_video_url(raw: Option<&str>) -> Result<String, NodeError> {
    let raw = raw
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| NodeError::config("videoUrl", "must not be empty"))?;

    let url = Url::parse(raw).map_err(|e| NodeError::config("videoUrl", e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(raw.to_owned()),
        other => Err(NodeError::config(
            "videoUrl",
            format!("unsupported scheme '{other}', expected http or https"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item() -> Value {
        json!({
            "videoUrl": "https://cdn.example.com/clip.mp4",
            "customPrompt": "Summarize this video",
        })
    }

    #[test]
    fn omitted_options_fall_back_to_defaults() {
        let params = VideoAnalysisParams::resolve(&item(), IngestMode::InlineBytes).unwrap();
        assert_eq!(params.options.temperature, 0.5);
        assert_eq!(params.options.max_video_size_mb, 25.0);
        assert_eq!(params.model, GeminiModel::FlashThinking);
    }

    #[test]
    fn default_model_follows_ingest_mode() {
        let params = VideoAnalysisParams::resolve(&item(), IngestMode::UriReference).unwrap();
        assert_eq!(params.model, GeminiModel::Flash);
    }

    #[test]
    fn explicit_zero_temperature_is_kept() {
        let mut input = item();
        input["options"] = json!({ "temperature": 0.0 });
        let params = VideoAnalysisParams::resolve(&input, IngestMode::UriReference).unwrap();
        assert_eq!(params.options.temperature, 0.0);
    }

    #[test]
    fn legacy_max_video_size_key_is_accepted() {
        let mut input = item();
        input["options"] = json!({ "maxVideoSize": 10 });
        let params = VideoAnalysisParams::resolve(&input, IngestMode::InlineBytes).unwrap();
        assert_eq!(params.options.max_video_size_mb, 10.0);
    }

    #[test]
    fn temperature_out_of_range_is_rejected() {
        let mut input = item();
        input["options"] = json!({ "temperature": 1.5 });
        let err = VideoAnalysisParams::resolve(&input, IngestMode::UriReference).unwrap_err();
        assert!(matches!(err, NodeError::Config { ref name, .. } if name == "options.temperature"));
    }

    #[test]
    fn non_positive_size_cap_is_rejected() {
        let mut input = item();
        input["options"] = json!({ "maxVideoSizeMB": 0 });
        let err = VideoAnalysisParams::resolve(&input, IngestMode::InlineBytes).unwrap_err();
        assert!(matches!(err, NodeError::Config { ref name, .. } if name == "options.maxVideoSizeMB"));
    }

    #[test]
    fn unknown_model_is_rejected() {
        let mut input = item();
        input["model"] = json!("gpt-4o");
        let err = VideoAnalysisParams::resolve(&input, IngestMode::UriReference).unwrap_err();
        assert!(err.to_string().contains("unknown model 'gpt-4o'"));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let mut input = item();
        input["videoUrl"] = json!("ftp://example.com/clip.mp4");
        let err = VideoAnalysisParams::resolve(&input, IngestMode::UriReference).unwrap_err();
        assert!(matches!(err, NodeError::Config { ref name, .. } if name == "videoUrl"));
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let mut input = item();
        input["customPrompt"] = json!("   ");
        let err = VideoAnalysisParams::resolve(&input, IngestMode::UriReference).unwrap_err();
        assert!(matches!(err, NodeError::Config { ref name, .. } if name == "customPrompt"));
    }

    #[test]
    fn every_model_is_accepted_in_both_modes() {
        for mode in [IngestMode::UriReference, IngestMode::InlineBytes] {
            for model in GeminiModel::ALL {
                let mut input = item();
                input["model"] = json!(model.as_str());
                let params = VideoAnalysisParams::resolve(&input, mode).unwrap();
                assert_eq!(params.model, model);
            }
        }
    }

    #[test]
    fn model_identifiers_round_trip_through_from_str() {
        for model in GeminiModel::ALL {
            assert_eq!(model.as_str().parse::<GeminiModel>().unwrap(), model);
        }
    }
}
