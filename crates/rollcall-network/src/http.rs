use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use rollcall_types::{
    api::{
        Ack, AddStudentRequest, AttendanceHistoryResponse, ChangePasswordRequest,
        FaceStatusResponse, LoginRequest, LoginResponse, MarkAttendanceRequest,
        MarkAttendanceResponse, RegisterFaceRequest, RegisterFaceResponse, SessionStatus,
        StatusEndpoint,
    },
    config::ServerConfig,
    Result,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use url::Url;

use crate::{network_error, AttendanceApi};

/// reqwest-backed client. Clones share one connection pool and one cookie
/// jar, so a login made through any clone authenticates all of them.
#[derive(Clone)]
pub struct HttpApiClient {
    client: Client,
    base: Url,
}

impl HttpApiClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|err| network_error(format!("invalid base url {}: {err}", config.base_url)))?;
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|err| network_error(format!("failed to build http client: {err}")))?;
        Ok(Self { client, base })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|err| network_error(format!("invalid endpoint {path}: {err}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send::<(), T>(Method::GET, path, None).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(Method::POST, path, Some(body)).await
    }

    async fn send<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!("{} {}", method, url);
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| network_error(format!("request to {path} failed: {err}")))?;
        let status = response.status();
        response.json::<T>().await.map_err(|err| {
            network_error(format!(
                "unreadable response from {path} (status {status}): {err}"
            ))
        })
    }
}

#[async_trait]
impl AttendanceApi for HttpApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        self.post_json("/login", request).await
    }

    async fn check_session(&self) -> Result<SessionStatus> {
        self.get_json("/check_session").await
    }

    async fn navigate(&self, path: &str) -> Result<()> {
        let url = self.endpoint(path)?;
        debug!("GET {} (navigation)", url);
        self.client
            .get(url)
            .send()
            .await
            .map_err(|err| network_error(format!("navigation to {path} failed: {err}")))?;
        Ok(())
    }

    async fn mark_attendance(
        &self,
        request: &MarkAttendanceRequest,
    ) -> Result<MarkAttendanceResponse> {
        self.post_json("/mark_attendance", request).await
    }

    async fn register_face(&self, request: &RegisterFaceRequest) -> Result<RegisterFaceResponse> {
        self.post_json("/register_face", request).await
    }

    async fn face_status(&self, endpoint: StatusEndpoint) -> Result<FaceStatusResponse> {
        self.get_json(endpoint.path()).await
    }

    async fn delete_face_data(&self) -> Result<Ack> {
        self.get_json("/delete_face_data").await
    }

    async fn attendance_history(&self) -> Result<AttendanceHistoryResponse> {
        self.get_json("/get_attendance").await
    }

    async fn add_student(&self, request: &AddStudentRequest) -> Result<Ack> {
        self.post_json("/add_student", request).await
    }

    async fn change_password(&self, request: &ChangePasswordRequest) -> Result<Ack> {
        self.post_json("/change_password", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ServerConfig {
        ServerConfig {
            base_url: base_url.into(),
            request_timeout_ms: 500,
        }
    }

    #[test]
    fn endpoints_resolve_against_base() {
        let client = HttpApiClient::new(&config("http://127.0.0.1:5000/")).unwrap();
        assert_eq!(
            client.endpoint("/mark_attendance").unwrap().as_str(),
            "http://127.0.0.1:5000/mark_attendance"
        );
        assert_eq!(
            client
                .endpoint(StatusEndpoint::Face.path())
                .unwrap()
                .as_str(),
            "http://127.0.0.1:5000/get_face_status"
        );
        assert_eq!(
            client.endpoint("/?message=session_expired").unwrap().as_str(),
            "http://127.0.0.1:5000/?message=session_expired"
        );
    }

    #[test]
    fn rejects_unparseable_base() {
        assert!(HttpApiClient::new(&config("not a url")).is_err());
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        // Port 9 (discard) is closed on test machines; the connect fails fast.
        let client = HttpApiClient::new(&config("http://127.0.0.1:9")).unwrap();
        let err = client.check_session().await.unwrap_err();
        assert!(matches!(err, rollcall_types::RollcallError::Network(_)));
    }
}
