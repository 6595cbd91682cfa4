use crate::dispatch::DispatchResult;
use crate::tracker::ChangeRecord;
use serde::{Deserialize, Serialize};

/// Webhook reply sent back to the assistant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub speech: String,
    pub messages: Vec<String>,

    /// Set when the intent was understood but could not be carried out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Assembles a reply from the confirmation speech and the observed changes
pub fn build(speech: &str, changes: &[ChangeRecord]) -> WebhookResponse {
    WebhookResponse {
        speech: speech.to_string(),
        messages: changes.iter().map(change_message).collect(),
        error: None,
    }
}

/// `Changed state: <friendly_name> (<entity_id>) is now "<state>"`
pub fn change_message(change: &ChangeRecord) -> String {
    format!(
        "Changed state: {} ({}) is now \"{}\"",
        change.friendly_name, change.entity_id, change.new_state
    )
}

impl From<&DispatchResult> for WebhookResponse {
    fn from(result: &DispatchResult) -> Self {
        WebhookResponse {
            error: result.error.clone(),
            ..build(&result.speech, &result.changes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(entity_id: &str, name: &str, state: &str) -> ChangeRecord {
        ChangeRecord {
            entity_id: entity_id.to_string(),
            friendly_name: name.to_string(),
            new_state: state.to_string(),
        }
    }

    #[test]
    fn test_build_formats_messages_in_order() {
        let response = build(
            "Activating scene: movie",
            &[
                record("lights.tv", "TV Backlight", "on"),
                record("scene.movie", "Movie", "scening"),
            ],
        );

        assert_eq!(response.speech, "Activating scene: movie");
        assert_eq!(
            response.messages,
            vec![
                "Changed state: TV Backlight (lights.tv) is now \"on\"",
                "Changed state: Movie (scene.movie) is now \"scening\"",
            ]
        );
    }

    #[test]
    fn test_serialized_shape_omits_absent_error() {
        let response = build("Turning on: kitchen.", &[]);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"speech": "Turning on: kitchen.", "messages": []}));
    }

    #[test]
    fn test_rejected_result_carries_error() {
        let result = DispatchResult {
            speech: String::new(),
            changes: vec![],
            error: Some("unknown action 'weather.forecast'".to_string()),
        };

        let value = serde_json::to_value(WebhookResponse::from(&result)).unwrap();
        assert_eq!(
            value,
            json!({
                "speech": "",
                "messages": [],
                "error": "unknown action 'weather.forecast'"
            })
        );
    }
}
