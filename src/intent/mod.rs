use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;


/// Intent is one parsed webhook request: an action name plus its parameters.
///
/// Built once per request by [`Intent::parse`] and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Intent {
    /// Action name as sent by the assistant (e.g., "scene.activate")
    pub action: String,

    /// Parameter values, stringified
    pub parameters: HashMap<String, String>,
}

/// Intent parsing errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntentError {
    #[error("request body is empty")]
    EmptyBody,
    #[error("request body is not valid JSON: {0}")]
    MalformedJson(String),
    #[error("request is missing the 'result' object")]
    MissingResult,
    #[error("request is missing 'result.action'")]
    MissingAction,
    #[error("'result.parameters' must be an object")]
    ParametersNotObject,
    #[error("parameter '{0}' must be a string, number, boolean or null")]
    UnsupportedParameter(String),
}

impl Intent {
    pub fn new(action: impl Into<String>, parameters: HashMap<String, String>) -> Self {
        Self {
            action: action.into(),
            parameters,
        }
    }

    /// Parses a webhook body.
    ///
    /// Expected shape:
    /// {
    ///   "result": {
    ///     "action": "scene.activate",
    ///     "parameters": { "scene": "movie" }
    ///   }
    /// }
    ///
    /// Everything outside `result.action` and `result.parameters` is ignored.
    pub fn parse(body: &[u8]) -> Result<Self, IntentError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(IntentError::EmptyBody);
        }

        let document: Value = serde_json::from_slice(body)
            .map_err(|e| IntentError::MalformedJson(e.to_string()))?;

        let result = document
            .get("result")
            .and_then(Value::as_object)
            .ok_or(IntentError::MissingResult)?;

        let action = result
            .get("action")
            .and_then(Value::as_str)
            .filter(|a| !a.trim().is_empty())
            .ok_or(IntentError::MissingAction)?;

        let parameters = match result.get("parameters") {
            None | Some(Value::Null) => HashMap::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(key, value)| parameter_text(key, value).map(|text| (key.clone(), text)))
                .collect::<Result<HashMap<_, _>, IntentError>>()?,
            Some(_) => return Err(IntentError::ParametersNotObject),
        };

        Ok(Self::new(action.trim(), parameters))
    }

    /// Parameter value if present and not blank
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

fn parameter_text(key: &str, value: &Value) -> Result<String, IntentError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        Value::Bool(_) | Value::Number(_) => Ok(value.to_string()),
        Value::Array(_) | Value::Object(_) => {
            Err(IntentError::UnsupportedParameter(key.to_string()))
        }
    }
}
