use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use rollcall_types::{
    api::{
        Ack, AddStudentRequest, AttendanceHistoryResponse, ChangePasswordRequest,
        FaceStatusResponse, LoginRequest, LoginResponse, MarkAttendanceRequest,
        MarkAttendanceResponse, RegisterFaceRequest, RegisterFaceResponse, SessionStatus,
        StatusEndpoint,
    },
    Result,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{network_error, AttendanceApi};

/// One request seen by [`ScriptedApi`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct Script {
    responses: VecDeque<(String, Result<Value, String>)>,
    fallbacks: Vec<(String, Value)>,
    journal: Vec<ApiCall>,
}

/// In-memory backend used for offline runs and tests.
///
/// Responses are queued per path and consumed in order. When a path has no
/// queued response the fallback for that path is used; with neither, the
/// call fails like a dropped connection.
#[derive(Clone, Default)]
pub struct ScriptedApi {
    script: Arc<Mutex<Script>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, body: Value) -> &Self {
        self.with_script(|script| {
            script.responses.push_back((path.to_string(), Ok(body)));
        });
        self
    }

    pub fn fail(&self, path: &str, reason: &str) -> &Self {
        self.with_script(|script| {
            script
                .responses
                .push_back((path.to_string(), Err(reason.to_string())));
        });
        self
    }

    pub fn fallback(&self, path: &str, body: Value) -> &Self {
        self.with_script(|script| {
            script.fallbacks.retain(|(p, _)| p != path);
            script.fallbacks.push((path.to_string(), body));
        });
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.script
            .lock()
            .map(|script| script.journal.clone())
            .unwrap_or_default()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|call| call.path == path).count()
    }

    fn with_script(&self, f: impl FnOnce(&mut Script)) {
        if let Ok(mut script) = self.script.lock() {
            f(&mut script);
        }
    }

    fn exchange<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: Option<&B>) -> Result<T> {
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(|err| network_error(format!("cannot encode body for {path}: {err}")))?;
        let reply = {
            let mut script = self
                .script
                .lock()
                .map_err(|_| network_error("scripted api poisoned"))?;
            script.journal.push(ApiCall {
                path: path.to_string(),
                body,
            });
            let queued = script
                .responses
                .iter()
                .position(|(p, _)| p == path)
                .and_then(|idx| script.responses.remove(idx))
                .map(|(_, reply)| reply);
            match queued {
                Some(reply) => reply,
                None => script
                    .fallbacks
                    .iter()
                    .find(|(p, _)| p == path)
                    .map(|(_, body)| Ok(body.clone()))
                    .unwrap_or_else(|| Err(format!("no scripted response for {path}"))),
            }
        };
        let value = reply.map_err(|reason| network_error(format!("{path}: {reason}")))?;
        info!("scripted {} -> {}", path, value);
        serde_json::from_value(value)
            .map_err(|err| network_error(format!("unreadable response from {path}: {err}")))
    }
}

#[async_trait]
impl AttendanceApi for ScriptedApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        self.exchange("/login", Some(request))
    }

    async fn check_session(&self) -> Result<SessionStatus> {
        self.exchange::<(), _>("/check_session", None)
    }

    async fn navigate(&self, path: &str) -> Result<()> {
        self.with_script(|script| {
            script.journal.push(ApiCall {
                path: path.to_string(),
                body: None,
            })
        });
        Ok(())
    }

    async fn mark_attendance(
        &self,
        request: &MarkAttendanceRequest,
    ) -> Result<MarkAttendanceResponse> {
        self.exchange("/mark_attendance", Some(request))
    }

    async fn register_face(&self, request: &RegisterFaceRequest) -> Result<RegisterFaceResponse> {
        self.exchange("/register_face", Some(request))
    }

    async fn face_status(&self, endpoint: StatusEndpoint) -> Result<FaceStatusResponse> {
        self.exchange::<(), _>(endpoint.path(), None)
    }

    async fn delete_face_data(&self) -> Result<Ack> {
        self.exchange::<(), _>("/delete_face_data", None)
    }

    async fn attendance_history(&self) -> Result<AttendanceHistoryResponse> {
        self.exchange::<(), _>("/get_attendance", None)
    }

    async fn add_student(&self, request: &AddStudentRequest) -> Result<Ack> {
        self.exchange("/add_student", Some(request))
    }

    async fn change_password(&self, request: &ChangePasswordRequest) -> Result<Ack> {
        self.exchange("/change_password", Some(request))
    }
}
