use rollcall_network::ScriptedApi;
use serde_json::json;

/// Backend answers for `--offline` runs.
pub fn demo_backend() -> ScriptedApi {
    let api = ScriptedApi::new();
    api.fallback("/login", json!({"success": true}))
        .fallback(
            "/check_session",
            json!({"logged_in": true, "user_type": "faculty", "user_id": "F001"}),
        )
        .fallback(
            "/mark_attendance",
            json!({
                "success": true,
                "message": "Attendance marked for John Doe",
                "student_id": "S001",
                "student_name": "John Doe",
                "confidence": 0.91
            }),
        )
        .fallback(
            "/register_face",
            json!({"success": true, "message": "Face image registered"}),
        )
        .fallback(
            "/get_face_registration_status",
            json!({"success": true, "registered_count": 0, "total_images": 4}),
        )
        .fallback(
            "/get_face_status",
            json!({"success": true, "registered_count": 0, "total_images": 4}),
        )
        .fallback("/delete_face_data", json!({"success": true}))
        .fallback(
            "/get_attendance",
            json!({"success": true, "attendance": [
                {"subject": "Math", "date": "2024-03-04", "time": "09:02:17", "marked_by": "F001"},
                {"subject": "Physics", "date": "2024-03-05", "time": "11:15:40"}
            ]}),
        )
        .fallback("/add_student", json!({"success": true, "message": "Student added successfully"}))
        .fallback(
            "/change_password",
            json!({"success": true, "message": "Password changed successfully"}),
        );
    api
}
