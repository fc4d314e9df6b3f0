use rollcall_network::{AttendanceApi, NoticeBoard};
use rollcall_types::{
    api::{LoginRequest, UserType},
    notice::{Notice, NoticeLevel, NoticeTarget, LOGIN_MESSAGE_TTL},
    validation::{FormSubmission, FormValidator, ValidationErrors},
};
use tracing::{info, warn};

const LOGIN_FAILED: &str = "Login failed. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Server accepted the credentials; navigate to this path.
    Redirect(String),
    /// Server refused the credentials.
    Rejected(String),
    /// Local checks failed; no request was sent.
    Invalid(ValidationErrors),
    TransportFailed(String),
}

/// Login form with a faculty/student tab pair.
pub struct LoginController<A: AttendanceApi> {
    api: A,
    notices: NoticeBoard,
    active: UserType,
}

impl<A: AttendanceApi> LoginController<A> {
    pub fn new(api: A, notices: NoticeBoard) -> Self {
        Self {
            api,
            notices,
            active: UserType::Faculty,
        }
    }

    pub fn active_tab(&self) -> UserType {
        self.active
    }

    /// Exactly one tab is active at a time.
    pub fn tabs(&self) -> [(UserType, bool); 2] {
        [
            (UserType::Faculty, self.active == UserType::Faculty),
            (UserType::Student, self.active == UserType::Student),
        ]
    }

    pub fn select_tab(&mut self, user_type: UserType) {
        self.active = user_type;
    }

    pub async fn submit(&self, user_id: &str, password: &str) -> LoginOutcome {
        // Field names follow the per-tab inputs, so only presence is checked.
        let form = FormSubmission::new()
            .required(format!("{}-id", self.active), user_id)
            .required(format!("{}-password", self.active), password);
        if let Err(errors) = FormValidator::validate(&form) {
            for error in &errors.errors {
                self.notices
                    .publish(Notice::field(error.field.clone(), error.message.clone()));
            }
            return LoginOutcome::Invalid(errors);
        }

        let request = LoginRequest {
            user_type: self.active,
            user_id: user_id.trim().to_string(),
            password: password.to_string(),
        };
        match self.api.login(&request).await {
            Ok(response) if response.success => {
                let target = response
                    .redirect
                    .unwrap_or_else(|| default_dashboard(self.active).to_string());
                info!("{} {} logged in; redirecting to {}", self.active, request.user_id, target);
                LoginOutcome::Redirect(target)
            }
            Ok(response) => {
                let message = response.message.unwrap_or_else(|| LOGIN_FAILED.to_string());
                self.show(&message);
                LoginOutcome::Rejected(message)
            }
            Err(err) => {
                warn!("Login request failed: {err}");
                self.show(LOGIN_FAILED);
                LoginOutcome::TransportFailed(err.to_string())
            }
        }
    }

    fn show(&self, message: &str) {
        self.notices.publish(
            Notice::new(NoticeLevel::Error, NoticeTarget::Banner, message)
                .with_ttl(LOGIN_MESSAGE_TTL),
        );
    }
}

fn default_dashboard(user_type: UserType) -> &'static str {
    match user_type {
        UserType::Faculty => "/faculty_dashboard",
        UserType::Student => "/student_dashboard",
    }
}
