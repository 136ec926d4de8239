use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use tracing::debug;
use url::Url;
use crate::core::{
    ChunkPayload, ChunkTransport, CompletionRequest, CompletionResponse, Result, SessionGrant,
    SessionRequest, UploadError, UploadSessionService, VideoProcessingService,
};

/// 错误信息中最多保留的响应体长度
const MAX_ERROR_BODY: usize = 200;

/// 基于 reqwest 的上传后端
///
/// 认证令牌只发送给会话服务和处理服务，分片地址由会话服务签发。
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    session_url: Url,
    complete_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(session_url: &str, complete_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let session_url = Url::parse(session_url)
            .map_err(|e| UploadError::config(format!("Invalid session_url {:?}: {}", session_url, e)))?;
        let complete_url = Url::parse(complete_url)
            .map_err(|e| UploadError::config(format!("Invalid complete_url {:?}: {}", complete_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            session_url,
            complete_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| UploadError::config(format!("Invalid token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// 相对地址按会话服务的地址解析
    fn resolve_upload_url(&self, upload_url: &str) -> Result<String> {
        if upload_url.starts_with("http://") || upload_url.starts_with("https://") {
            return Ok(upload_url.to_string());
        }

        self.session_url
            .join(upload_url)
            .map(|url| url.to_string())
            .map_err(|e| UploadError::SessionInit(format!("Invalid uploadUrl {:?}: {}", upload_url, e)))
    }

    async fn describe_failure(response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let body = body.trim();

        if body.is_empty() {
            format!("server responded with status {}", status.as_u16())
        } else {
            let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
            format!("server responded with status {}: {}", status.as_u16(), snippet)
        }
    }
}

#[async_trait]
impl UploadSessionService for HttpBackend {
    async fn init_session(&self, request: &SessionRequest) -> Result<SessionGrant> {
        let response = self
            .client
            .post(self.session_url.clone())
            .headers(self.auth_headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| UploadError::SessionInit(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UploadError::SessionInit(Self::describe_failure(response).await));
        }

        let mut grant: SessionGrant = response
            .json()
            .await
            .map_err(|e| UploadError::SessionInit(format!("Invalid session response: {}", e)))?;

        if grant.upload_id.is_empty() {
            return Err(UploadError::SessionInit("No uploadId in response".into()));
        }
        grant.upload_url = self.resolve_upload_url(&grant.upload_url)?;

        Ok(grant)
    }
}

#[async_trait]
impl ChunkTransport for HttpBackend {
    async fn send_chunk(&self, grant: &SessionGrant, payload: ChunkPayload) -> Result<()> {
        let index = payload.chunk_index;
        let size = payload.data.len();

        let file_part = Part::stream_with_length(payload.data, size as u64)
            .file_name(payload.file_name)
            .mime_str("application/octet-stream")?;

        let form = Form::new()
            .part("file", file_part)
            .text("upload_preset", grant.upload_preset.clone())
            .text("chunk_index", index.to_string())
            .text("total_chunks", payload.total_chunks.to_string())
            .text("upload_id", grant.upload_id.clone());

        let response = self
            .client
            .post(&grant.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::chunk_network(index, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::chunk_status(index, status.as_u16()));
        }

        debug!(index, size, status = status.as_u16(), "chunk accepted");
        Ok(())
    }
}

#[async_trait]
impl VideoProcessingService for HttpBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let response = self
            .client
            .post(self.complete_url.clone())
            .headers(self.auth_headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| UploadError::Completion(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UploadError::Completion(Self::describe_failure(response).await));
        }

        response
            .json()
            .await
            .map_err(|e| UploadError::Completion(format!("Invalid completion response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use crate::core::VideoDetails;

    fn backend(server: &Server, token: Option<&str>) -> HttpBackend {
        HttpBackend::new(
            &format!("{}/api/upload/session", server.url()),
            &format!("{}/api/videos/complete", server.url()),
            token.map(String::from),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn grant(server: &Server) -> SessionGrant {
        SessionGrant {
            upload_id: "up_1".into(),
            upload_url: format!("{}/upload/chunk", server.url()),
            upload_preset: "lessons".into(),
            cloud_name: "demo".into(),
        }
    }

    #[tokio::test]
    async fn init_session_posts_json_and_resolves_relative_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/upload/session")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::Json(json!({
                "fileName": "intro.mp4",
                "fileSize": 1024,
                "courseId": "course-1",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"uploadId":"up_1","uploadUrl":"/upload/chunk","uploadPreset":"lessons","cloudName":"demo"}"#)
            .create_async()
            .await;

        let request = SessionRequest {
            file_name: "intro.mp4".into(),
            file_size: 1024,
            course_id: "course-1".into(),
        };
        let grant = backend(&server, Some("secret")).init_session(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(grant.upload_id, "up_1");
        assert_eq!(grant.upload_url, format!("{}/upload/chunk", server.url()));
        assert_eq!(grant.cloud_name, "demo");
    }

    #[tokio::test]
    async fn init_session_failure_is_session_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/upload/session")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let request = SessionRequest {
            file_name: "intro.mp4".into(),
            file_size: 1024,
            course_id: "course-1".into(),
        };
        let result = backend(&server, None).init_session(&request).await;

        mock.assert_async().await;
        match result {
            Err(UploadError::SessionInit(message)) => {
                assert_eq!(message, "server responded with status 401: unauthorized")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_chunk_uses_multipart_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/chunk")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_header("authorization", Matcher::Missing)
            .match_header("content-length", Matcher::Regex(r"^\d+$".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="file"; filename="intro.mp4""#.into()),
                Matcher::Regex(r#"name="upload_preset"\r\n\r\nlessons"#.into()),
                Matcher::Regex(r#"name="chunk_index"\r\n\r\n2"#.into()),
                Matcher::Regex(r#"name="total_chunks"\r\n\r\n3"#.into()),
                Matcher::Regex(r#"name="upload_id"\r\n\r\nup_1"#.into()),
                Matcher::Regex("chunk-bytes".into()),
            ]))
            .with_status(201)
            .create_async()
            .await;

        let payload = ChunkPayload {
            file_name: "intro.mp4".into(),
            data: Bytes::from_static(b"chunk-bytes"),
            chunk_index: 2,
            total_chunks: 3,
        };
        backend(&server, Some("secret")).send_chunk(&grant(&server), payload).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn send_chunk_non_2xx_is_chunk_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload/chunk")
            .with_status(500)
            .create_async()
            .await;

        let payload = ChunkPayload {
            file_name: "intro.mp4".into(),
            data: Bytes::from_static(b"abc"),
            chunk_index: 1,
            total_chunks: 3,
        };
        let result = backend(&server, None).send_chunk(&grant(&server), payload).await;

        assert!(matches!(result, Err(UploadError::ChunkTransfer { index: 1, status: Some(500), .. })));
    }

    #[tokio::test]
    async fn complete_returns_video_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/videos/complete")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(json!({
                "uploadId": "up_1",
                "courseId": "course-1",
                "title": "Intro",
                "difficulty": "beginner",
                "privacy": "public",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"video":{"url":"https://cdn.example.com/intro.mp4"}}"#)
            .create_async()
            .await;

        let details = VideoDetails {
            title: "Intro".into(),
            ..Default::default()
        };
        let request = CompletionRequest::new("up_1", "course-1", &details);
        let response = backend(&server, Some("secret")).complete(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.video_url(), Some("https://cdn.example.com/intro.mp4"));
    }

    #[tokio::test]
    async fn complete_non_2xx_is_completion_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/videos/complete")
            .with_status(502)
            .create_async()
            .await;

        let request = CompletionRequest::new("up_1", "course-1", &VideoDetails::default());
        let result = backend(&server, None).complete(&request).await;

        assert!(matches!(result, Err(UploadError::Completion(_))));
    }

    #[test]
    fn rejects_invalid_urls() {
        let result = HttpBackend::new("not a url", "https://example.com", None, Duration::from_secs(1));
        assert!(matches!(result, Err(UploadError::Config(_))));
    }
}
