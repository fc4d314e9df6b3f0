use rollcall_network::{AttendanceApi, NoticeBoard};
use rollcall_types::{
    api::{Ack, AddStudentRequest, ChangePasswordRequest},
    notice::{Notice, NoticeLevel},
    outcome::ActionOutcome,
    validation::{sanitize_input, FormSubmission, FormValidator, ValidationErrors},
    Result,
};
use tracing::{info, warn};

/// Faculty "add student" form input.
#[derive(Debug, Clone, Default)]
pub struct NewStudent {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Account management forms. Both validate locally and send nothing when a
/// field is invalid.
pub struct AccountForms<A: AttendanceApi> {
    api: A,
    notices: NoticeBoard,
}

impl<A: AttendanceApi> AccountForms<A> {
    pub fn new(api: A, notices: NoticeBoard) -> Self {
        Self { api, notices }
    }

    pub async fn add_student(&self, student: &NewStudent) -> ActionOutcome {
        let form = FormSubmission::new()
            .required("student_id", &student.student_id)
            .required("name", &student.name)
            .optional("email", &student.email)
            .required("password", &student.password);
        if let Err(errors) = FormValidator::validate(&form) {
            return self.refuse(errors);
        }

        let request = AddStudentRequest {
            student_id: sanitize_input(&student.student_id),
            name: sanitize_input(&student.name),
            email: sanitize_input(&student.email),
            password: student.password.clone(),
        };
        let result = self.api.add_student(&request).await;
        self.settle("add student", result, "Student added successfully")
    }

    pub async fn change_password(&self, current: &str, new: &str) -> ActionOutcome {
        let form = FormSubmission::new()
            .required("current_password", current)
            .required("new_password", new);
        if let Err(errors) = FormValidator::validate(&form) {
            return self.refuse(errors);
        }

        let request = ChangePasswordRequest {
            current_password: current.to_string(),
            new_password: new.to_string(),
        };
        let result = self.api.change_password(&request).await;
        self.settle("change password", result, "Password changed successfully")
    }

    fn refuse(&self, errors: ValidationErrors) -> ActionOutcome {
        for error in &errors.errors {
            self.notices
                .publish(Notice::field(error.field.clone(), error.message.clone()));
        }
        ActionOutcome::Refused(errors.to_string())
    }

    fn settle(&self, action: &str, result: Result<Ack>, success: &str) -> ActionOutcome {
        match result {
            Ok(ack) if ack.success => {
                info!("{action} succeeded");
                let message = ack.message.unwrap_or_else(|| success.to_string());
                self.notices
                    .publish(Notice::banner(NoticeLevel::Success, message));
                ActionOutcome::Completed
            }
            Ok(ack) => {
                let message = ack.message.unwrap_or_else(|| format!("Could not {action}"));
                self.notices
                    .publish(Notice::banner(NoticeLevel::Error, message.clone()));
                ActionOutcome::Rejected(message)
            }
            Err(err) => {
                warn!("{action} request failed: {err}");
                self.notices
                    .publish(Notice::banner(NoticeLevel::Error, "Network error. Please try again."));
                ActionOutcome::TransportFailed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_network::ScriptedApi;
    use rollcall_types::{notice::NoticeTarget, validation::STUDENT_ID_MESSAGE};
    use serde_json::json;

    #[tokio::test]
    async fn invalid_student_issues_no_request() {
        let api = ScriptedApi::new();
        let notices = NoticeBoard::default();
        let mut rx = notices.receiver();
        let forms = AccountForms::new(api.clone(), notices);

        let outcome = forms
            .add_student(&NewStudent {
                student_id: "s1".into(),
                name: "Jane Smith".into(),
                email: String::new(),
                password: "abc123".into(),
            })
            .await;
        assert!(matches!(outcome, ActionOutcome::Refused(_)));
        assert!(api.calls().is_empty());
        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.target, NoticeTarget::Field("student_id".into()));
        assert_eq!(notice.message, STUDENT_ID_MESSAGE);
    }

    #[tokio::test]
    async fn valid_student_is_sanitized_and_sent() {
        let api = ScriptedApi::new();
        api.respond("/add_student", json!({"success": true}));
        let forms = AccountForms::new(api.clone(), NoticeBoard::default());
        let outcome = forms
            .add_student(&NewStudent {
                student_id: " S005 ".into(),
                name: "Ada Lovelace".into(),
                email: "ada@uni.edu".into(),
                password: "engine1".into(),
            })
            .await;
        assert_eq!(outcome, ActionOutcome::Completed);
        let body = api.calls()[0].body.clone().unwrap();
        assert_eq!(body["student_id"], "S005");
        assert_eq!(body["email"], "ada@uni.edu");
    }

    #[tokio::test]
    async fn short_new_password_is_refused() {
        let api = ScriptedApi::new();
        let forms = AccountForms::new(api.clone(), NoticeBoard::default());
        assert!(matches!(
            forms.change_password("old-secret", "abc").await,
            ActionOutcome::Refused(_)
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn server_rejection_is_shown_verbatim() {
        let api = ScriptedApi::new();
        api.respond(
            "/change_password",
            json!({"success": false, "message": "Current password is incorrect"}),
        );
        let forms = AccountForms::new(api, NoticeBoard::default());
        assert_eq!(
            forms.change_password("wrong1", "newpass1").await,
            ActionOutcome::Rejected("Current password is incorrect".into())
        );
    }
}
