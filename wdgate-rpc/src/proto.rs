//! Wire types of the agent runtime service (`proto.AgentService`).
//!
//! The messages carry both prost and serde derives: prost for the gRPC leg,
//! serde for the JSON accepted from and relayed to HTTP clients.

use prost_types::value::Kind;
use serde::{Deserialize, Serialize};

/// One node of an execution plan, forwarded untouched.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentServiceNode {
    #[prost(string, tag = "1")]
    pub code: String,
    #[prost(string, tag = "2")]
    pub service_type: String,
    /// JSON-encoded node configuration
    #[prost(string, tag = "3")]
    pub cfg: String,
    #[prost(string, repeated, tag = "4")]
    pub ready_nodes: Vec<String>,
    #[prost(string, repeated, tag = "5")]
    pub goto_nodes: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentServiceCallRequest {
    /// Correlation id of the task; filled in by the gateway when empty
    #[prost(string, tag = "1")]
    pub task_code: String,
    #[prost(message, repeated, tag = "2")]
    pub plan: Vec<AgentServiceNode>,
    #[prost(string, tag = "3")]
    pub input: String,
    #[prost(int32, tag = "4")]
    pub mode: i32,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentServiceResult {
    #[prost(string, tag = "1")]
    pub node_code: String,
    #[prost(int32, tag = "2")]
    pub round: i32,
    #[prost(message, optional, tag = "3")]
    #[serde(with = "json_struct", skip_serializing_if = "Option::is_none")]
    pub output: Option<prost_types::Struct>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentServiceCallResponse {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AgentServiceResult>,
}

pub type CallRequest = AgentServiceCallRequest;
pub type CallResponse = AgentServiceCallResponse;

impl AgentServiceCallResponse {
    /// A payload-less response carrying only a status code and message.
    pub fn status(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            result: None,
        }
    }
}

/// Convert a protobuf `Struct` into the equivalent JSON object.
pub fn struct_to_json(value: &prost_types::Struct) -> serde_json::Value {
    let map = value
        .fields
        .iter()
        .map(|(key, value)| (key.clone(), value_to_json(value)))
        .collect();
    serde_json::Value::Object(map)
}

pub fn value_to_json(value: &prost_types::Value) -> serde_json::Value {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::NumberValue(n)) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s.clone()),
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(*b),
        Some(Kind::StructValue(s)) => struct_to_json(s),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.iter().map(value_to_json).collect())
        }
    }
}

/// Convert a JSON object into a protobuf `Struct`.
pub fn json_to_struct(map: &serde_json::Map<String, serde_json::Value>) -> prost_types::Struct {
    prost_types::Struct {
        fields: map
            .iter()
            .map(|(key, value)| (key.clone(), json_to_value(value)))
            .collect(),
    }
}

pub fn json_to_value(value: &serde_json::Value) -> prost_types::Value {
    let kind = match value {
        serde_json::Value::Null => Kind::NullValue(0),
        serde_json::Value::Bool(b) => Kind::BoolValue(*b),
        // every JSON number fits an f64, possibly with loss of precision
        serde_json::Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or_default()),
        serde_json::Value::String(s) => Kind::StringValue(s.clone()),
        serde_json::Value::Array(items) => Kind::ListValue(prost_types::ListValue {
            values: items.iter().map(json_to_value).collect(),
        }),
        serde_json::Value::Object(map) => Kind::StructValue(json_to_struct(map)),
    };
    prost_types::Value { kind: Some(kind) }
}

/// serde adapter presenting `Option<Struct>` as a plain JSON object.
mod json_struct {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<prost_types::Struct>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(s) => super::struct_to_json(s).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<prost_types::Struct>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::Object(map)) => Ok(Some(super::json_to_struct(&map))),
            Some(other) => Err(D::Error::custom(format!(
                "expected an object for output, found {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_decode_fills_defaults_and_ignores_unknown_fields() {
        let request: CallRequest = serde_json::from_str(
            r#"{"plan":[{"code":"n1","service_type":"python","goto_nodes":["n2"]}],"extra":true}"#,
        )
        .unwrap();

        assert!(request.task_code.is_empty());
        assert_eq!(request.mode, 0);
        assert_eq!(request.plan.len(), 1);
        assert_eq!(request.plan[0].code, "n1");
        assert_eq!(request.plan[0].goto_nodes, vec!["n2".to_string()]);
        assert!(request.plan[0].ready_nodes.is_empty());
    }

    #[test]
    fn test_status_frame_shape() {
        let frame = serde_json::to_value(CallResponse::status(500, "boom")).unwrap();
        assert_eq!(frame, json!({"code": 500, "message": "boom"}));
    }

    #[test]
    fn test_result_output_is_plain_json() {
        let output = json!({
            "text": "hello",
            "score": 0.5,
            "tags": ["a", "b"],
            "nested": {"ok": true, "none": null}
        });
        let response = CallResponse {
            code: 0,
            message: "success".into(),
            result: Some(AgentServiceResult {
                node_code: "llm".into(),
                round: 2,
                output: output.as_object().map(json_to_struct),
            }),
        };

        let frame = serde_json::to_value(&response).unwrap();
        assert_eq!(frame["result"]["node_code"], "llm");
        assert_eq!(frame["result"]["round"], 2);
        assert_eq!(frame["result"]["output"], output);

        let decoded: CallResponse = serde_json::from_value(frame).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_non_finite_number_becomes_null() {
        let value = prost_types::Value {
            kind: Some(Kind::NumberValue(f64::NAN)),
        };
        assert_eq!(value_to_json(&value), serde_json::Value::Null);
    }

    #[test]
    fn test_output_rejects_non_object() {
        let err = serde_json::from_value::<AgentServiceResult>(json!({"output": [1, 2]}));
        assert!(err.is_err());
    }
}
