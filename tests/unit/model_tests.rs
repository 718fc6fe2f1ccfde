//! Unit tests for run parameters and outbound payloads.

use redteam_console::models::session::{ActionSubmission, RunParams};
use serde_json::json;

fn base_params() -> RunParams {
    RunParams {
        target: "https://example.com".into(),
        goal: "find XSS".into(),
        model: "m1".into(),
        ..RunParams::default()
    }
}

#[test]
fn required_fields_are_trimmed() {
    let request = RunParams {
        target: "  https://example.com  ".into(),
        goal: "\tfind XSS\n".into(),
        model: " m1 ".into(),
        ..RunParams::default()
    }
    .into_request()
    .expect("valid params");

    assert_eq!(request.target, "https://example.com");
    assert_eq!(request.goal, "find XSS");
    assert_eq!(request.model, "m1");
}

#[test]
fn empty_required_field_fails_validation() {
    for field in ["target", "goal", "model"] {
        let mut params = base_params();
        match field {
            "target" => params.target = "   ".into(),
            "goal" => params.goal = String::new(),
            _ => params.model = "\n".into(),
        }
        assert!(
            params.into_request().is_err(),
            "empty {field} must fail validation"
        );
    }
}

#[test]
fn empty_optional_fields_are_omitted_from_the_payload() {
    let request = base_params().into_request().expect("valid params");

    assert_eq!(request.verify_url, None);
    assert_eq!(request.username, None);

    let payload = serde_json::to_value(&request).expect("serialize");
    let object = payload.as_object().expect("object");
    assert!(!object.contains_key("verify_url"));
    assert!(!object.contains_key("verify_str"));
    assert!(!object.contains_key("username"));
    assert!(!object.contains_key("password"));
}

#[test]
fn populated_optional_fields_are_kept() {
    let mut params = base_params();
    params.verify_url = " https://example.com/ok ".into();
    params.username = "admin".into();
    params.password = "hunter2".into();

    let request = params.into_request().expect("valid params");
    let payload = serde_json::to_value(&request).expect("serialize");

    assert_eq!(payload["verify_url"], json!("https://example.com/ok"));
    assert_eq!(payload["username"], json!("admin"));
    assert_eq!(payload["password"], json!("hunter2"));
    assert!(payload.as_object().expect("object").get("verify_str").is_none());
}

#[test]
fn initiating_text_names_target_and_goal() {
    let request = base_params().into_request().expect("valid params");
    assert_eq!(
        request.initiating_text(),
        "Target: https://example.com\nGoal: find XSS"
    );
}

#[test]
fn action_submission_serializes_all_fields() {
    let submission = ActionSubmission {
        session_id: "abc".into(),
        action_id: "act-1".into(),
        message: "yes".into(),
    };
    let payload = serde_json::to_value(&submission).expect("serialize");
    assert_eq!(
        payload,
        json!({"session_id": "abc", "action_id": "act-1", "message": "yes"})
    );
}
