//! Video download with a size cap.
//!
//! The cap is enforced twice: up front against a declared `content-length`
//! so oversized videos fail before any body bytes are read, and again while
//! buffering for servers that omit or understate the header.

use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use tracing::{debug, info};

use crate::payload::DEFAULT_VIDEO_MIME_TYPE;
use crate::NodeError;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Most the fetcher reserves up front from a declared `content-length`.
const MAX_PREALLOC_BYTES: u64 = 8 * 1024 * 1024;

/// A downloaded video, consumed once by the payload builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedVideo {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Tuning knobs for the fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Upper bound on one whole download, connect through last byte.
    pub timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
        }
    }
}

/// Downloads videos over HTTP(S). One GET per call, no retries.
#[derive(Debug, Clone)]
pub struct VideoFetcher {
    client: reqwest::Client,
}

impl VideoFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, NodeError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NodeError::Download(e.to_string()))?;
        Ok(Self { client })
    }

    /// Download `url`, failing once the body is larger than `max_size_mb`.
    ///
    /// # Errors
    /// - [`NodeError::Download`] on a non-2xx status or a broken transfer.
    /// - [`NodeError::SizeLimitExceeded`] when the declared or received size
    ///   is over the cap. No bytes are returned in that case.
    pub async fn fetch(&self, url: &str, max_size_mb: f64) -> Result<FetchedVideo, NodeError> {
        info!("Downloading video from {url}...");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NodeError::Download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status
                .canonical_reason()
                .map(str::to_owned)
                .unwrap_or_else(|| status.to_string());
            return Err(NodeError::Download(reason));
        }

        let limit_bytes = max_size_mb * BYTES_PER_MB;
        let declared = response.content_length();
        if let Some(len) = declared {
            check_size(len, max_size_mb)?;
        }

        let mime_type = mime_type_of(response.headers());

        info!("Processing video data...");
        let capacity = declared.map_or(0, |len| {
            len.min(limit_bytes as u64).min(MAX_PREALLOC_BYTES)
        }) as usize;
        let mut bytes = Vec::with_capacity(capacity);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| NodeError::Download(e.to_string()))?
        {
            bytes.extend_from_slice(&chunk);
            check_size(bytes.len() as u64, max_size_mb)?;
        }

        let size_bytes = bytes.len() as u64;
        debug!(size_bytes, %mime_type, "video downloaded");

        Ok(FetchedVideo {
            bytes,
            mime_type,
            size_bytes,
        })
    }
}

fn check_size(size_bytes: u64, max_size_mb: f64) -> Result<(), NodeError> {
    let actual_mb = size_bytes as f64 / BYTES_PER_MB;
    if actual_mb > max_size_mb {
        return Err(NodeError::SizeLimitExceeded {
            actual_mb,
            limit_mb: max_size_mb,
        });
    }
    Ok(())
}

/// Media type from `content-type` with parameters dropped, or `video/mp4`.
fn mime_type_of(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_VIDEO_MIME_TYPE)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> VideoFetcher {
        VideoFetcher::new(FetcherConfig::default()).unwrap()
    }

    fn url(server: &MockServer, p: &str) -> String {
        format!("{}{p}", server.uri())
    }

    /// Answer one request with `response` verbatim, then close the socket.
    /// For framings wiremock can't produce (chunked, lying `content-length`).
    async fn serve_raw(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{addr}/clip.mp4")
    }

    #[tokio::test]
    async fn downloads_body_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.webm"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![7u8; 64], "video/webm"))
            .mount(&server)
            .await;

        let video = fetcher().fetch(&url(&server, "/clip.webm"), 25.0).await.unwrap();

        assert_eq!(video.bytes, vec![7u8; 64]);
        assert_eq!(video.size_bytes, 64);
        assert_eq!(video.mime_type, "video/webm");
    }

    #[tokio::test]
    async fn non_success_status_is_a_download_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&url(&server, "/missing.mp4"), 25.0)
            .await
            .unwrap_err();

        assert_eq!(err, NodeError::Download("Not Found".into()));
        assert_eq!(err.to_string(), "Failed to download video: Not Found");
    }

    #[tokio::test]
    async fn declared_size_over_limit_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 4096], "video/mp4"))
            .mount(&server)
            .await;

        // 0.001 MB is roughly 1 KiB.
        let err = fetcher()
            .fetch(&url(&server, "/big.mp4"), 0.001)
            .await
            .unwrap_err();

        match err {
            NodeError::SizeLimitExceeded { actual_mb, limit_mb } => {
                assert!((actual_mb - 4096.0 / BYTES_PER_MB).abs() < 1e-9);
                assert_eq!(limit_mb, 0.001);
            }
            other => panic!("expected SizeLimitExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn chunked_body_over_limit_fails_while_buffering() {
        let mut response =
            b"HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nTransfer-Encoding: chunked\r\n\r\n1000\r\n"
                .to_vec();
        response.extend_from_slice(&[0u8; 4096]);
        response.extend_from_slice(b"\r\n0\r\n\r\n");
        let url = serve_raw(response).await;

        let err = fetcher().fetch(&url, 0.001).await.unwrap_err();

        match err {
            NodeError::SizeLimitExceeded { actual_mb, limit_mb } => {
                assert!(actual_mb > 0.001);
                assert!(actual_mb <= 4096.0 / BYTES_PER_MB);
                assert_eq!(limit_mb, 0.001);
            }
            other => panic!("expected SizeLimitExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn huge_declared_length_does_not_preallocate() {
        let mut response = b"HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: 1000000000000000\r\n\r\n"
            .to_vec();
        response.extend_from_slice(&[1u8; 16]);
        let url = serve_raw(response).await;

        // The cap admits the declared size; the body then ends early.
        let err = fetcher().fetch(&url, 1.0e12).await.unwrap_err();

        assert!(matches!(err, NodeError::Download(_)), "got {err:?}");
    }

    #[test]
    fn size_check_reports_both_sizes() {
        let err = check_size(30 * 1024 * 1024, 25.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Video size (30.00 MB) exceeds maximum allowed size (25 MB)"
        );
        assert!(check_size(25 * 1024 * 1024, 25.0).is_ok());
    }

    #[test]
    fn mime_type_defaults_to_mp4() {
        assert_eq!(mime_type_of(&HeaderMap::new()), "video/mp4");
    }

    #[test]
    fn mime_type_drops_parameters() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("video/ogg; codecs=theora"));
        assert_eq!(mime_type_of(&headers), "video/ogg");
    }
}
