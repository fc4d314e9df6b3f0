use rollcall_network::AttendanceApi;
use rollcall_types::{api::AttendanceEntry, outcome::ActionOutcome};
use tracing::warn;

const NO_RECORDS: &str = "No attendance records found.";
const LOAD_FAILED: &str = "Error loading attendance records.";

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryView {
    NotLoaded,
    Entries(Vec<AttendanceEntry>),
    Empty,
    Failed,
}

/// Student's own attendance table.
pub struct AttendanceHistory<A: AttendanceApi> {
    api: A,
    view: HistoryView,
}

impl<A: AttendanceApi> AttendanceHistory<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            view: HistoryView::NotLoaded,
        }
    }

    pub fn view(&self) -> &HistoryView {
        &self.view
    }

    pub async fn load(&mut self) -> ActionOutcome {
        let (view, outcome) = match self.api.attendance_history().await {
            Ok(response) if response.success && !response.attendance.is_empty() => {
                (HistoryView::Entries(response.attendance), ActionOutcome::Completed)
            }
            Ok(response) if response.success => (HistoryView::Empty, ActionOutcome::Completed),
            Ok(response) => (
                HistoryView::Empty,
                ActionOutcome::Rejected(response.message.unwrap_or_else(|| NO_RECORDS.into())),
            ),
            Err(err) => {
                warn!("Attendance history request failed: {err}");
                (HistoryView::Failed, ActionOutcome::TransportFailed(err.to_string()))
            }
        };
        self.view = view;
        outcome
    }

    /// One line per row as displayed, or the placeholder text.
    pub fn lines(&self) -> Vec<String> {
        match &self.view {
            HistoryView::Entries(entries) => entries
                .iter()
                .map(|entry| {
                    format!(
                        "{} | {} | {} | {}",
                        entry.subject_label(),
                        entry.date_label(),
                        entry.time_label(),
                        entry.marked_by_label()
                    )
                })
                .collect(),
            HistoryView::Empty => vec![NO_RECORDS.to_string()],
            HistoryView::Failed => vec![LOAD_FAILED.to_string()],
            HistoryView::NotLoaded => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_network::ScriptedApi;
    use serde_json::json;

    #[tokio::test]
    async fn entries_fall_back_to_default_labels() {
        let api = ScriptedApi::new();
        api.respond(
            "/get_attendance",
            json!({"success": true, "attendance": [
                {"subject": "Math", "date": "2024-03-01", "time": "09:05:11", "marked_by": "F001"},
                {"subject": "", "date": null}
            ]}),
        );
        let mut history = AttendanceHistory::new(api);
        assert_eq!(history.load().await, ActionOutcome::Completed);
        assert_eq!(
            history.lines(),
            vec![
                "Math | 2024-03-01 | 09:05:11 | F001".to_string(),
                "General | N/A | N/A | Faculty".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn empty_and_failed_loads_show_placeholders() {
        let api = ScriptedApi::new();
        api.respond("/get_attendance", json!({"success": true, "attendance": []}));
        let mut history = AttendanceHistory::new(api);
        history.load().await;
        assert_eq!(history.lines(), vec![NO_RECORDS.to_string()]);

        assert!(matches!(
            history.load().await,
            ActionOutcome::TransportFailed(_)
        ));
        assert_eq!(history.view(), &HistoryView::Failed);
        assert_eq!(history.lines(), vec![LOAD_FAILED.to_string()]);
    }
}
