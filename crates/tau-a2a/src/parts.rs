//! Translation between runtime parts and A2A parts.
//!
//! Function calls and responses travel as data parts whose metadata carries
//! the `adk_type` marker; the payload keeps the original call id so a stored
//! status message can be decoded back into runtime parts.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};
use tau_ai::{Blob, FileData, FunctionCall, FunctionResponse};
use thiserror::Error;

use crate::protocol::{
    DataPart, DataPartKind, FileContent, FilePart, Part as A2aPart, PartMetadata, TextPart,
};

/// Errors raised when a part is structurally invalid for translation.
#[derive(Debug, Error)]
pub enum PartConversionError {
    #[error("{kind} '{name}' has no call id")]
    MissingCallId { kind: &'static str, name: String },
    #[error("{kind} with call id '{id}' has no function name")]
    MissingFunctionName { kind: &'static str, id: String },
    #[error("invalid {kind} data part: {source}")]
    InvalidDataPart {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid base64 file bytes: {0}")]
    InvalidFileBytes(#[from] base64::DecodeError),
}

/// Converts runtime parts into A2A parts.
///
/// Function calls whose id appears in `long_running_ids` are flagged with
/// `adk_is_long_running`.
pub fn to_a2a_parts(
    parts: &[tau_ai::Part],
    long_running_ids: &[String],
) -> Result<Vec<A2aPart>, PartConversionError> {
    parts
        .iter()
        .map(|part| to_a2a_part(part, long_running_ids))
        .collect()
}

fn to_a2a_part(
    part: &tau_ai::Part,
    long_running_ids: &[String],
) -> Result<A2aPart, PartConversionError> {
    let converted = match part {
        tau_ai::Part::Text { text, thought } => A2aPart::Text(TextPart {
            text: text.clone(),
            metadata: PartMetadata {
                thought: *thought,
                ..PartMetadata::default()
            },
        }),
        tau_ai::Part::InlineData(blob) => A2aPart::File(FilePart {
            file: FileContent::Bytes {
                bytes: BASE64_STANDARD.encode(&blob.data),
                mime_type: Some(blob.mime_type.clone()),
                name: None,
            },
            metadata: PartMetadata::default(),
        }),
        tau_ai::Part::FileData(file) => A2aPart::File(FilePart {
            file: FileContent::Uri {
                uri: file.file_uri.clone(),
                mime_type: file.mime_type.clone(),
                name: None,
            },
            metadata: PartMetadata::default(),
        }),
        tau_ai::Part::FunctionCall(call) => {
            ensure_identified(DataPartKind::FunctionCall, &call.id, &call.name)?;
            let mut data = Map::new();
            data.insert("id".to_string(), Value::String(call.id.clone()));
            data.insert("name".to_string(), Value::String(call.name.clone()));
            data.insert("args".to_string(), Value::Object(call.args.clone()));
            A2aPart::Data(DataPart {
                data,
                metadata: PartMetadata {
                    long_running: long_running_ids.iter().any(|id| *id == call.id),
                    ..PartMetadata::of_kind(DataPartKind::FunctionCall)
                },
            })
        }
        tau_ai::Part::FunctionResponse(response) => {
            ensure_identified(DataPartKind::FunctionResponse, &response.id, &response.name)?;
            let mut data = Map::new();
            data.insert("id".to_string(), Value::String(response.id.clone()));
            data.insert("name".to_string(), Value::String(response.name.clone()));
            data.insert(
                "response".to_string(),
                Value::Object(response.response.clone()),
            );
            A2aPart::Data(DataPart {
                data,
                metadata: PartMetadata::of_kind(DataPartKind::FunctionResponse),
            })
        }
    };
    Ok(converted)
}

/// Converts A2A parts back into runtime parts.
///
/// Data parts without a function marker become text holding their JSON payload.
pub fn to_runtime_parts(parts: &[A2aPart]) -> Result<Vec<tau_ai::Part>, PartConversionError> {
    parts.iter().map(to_runtime_part).collect()
}

fn to_runtime_part(part: &A2aPart) -> Result<tau_ai::Part, PartConversionError> {
    match part {
        A2aPart::Text(text) => Ok(tau_ai::Part::Text {
            text: text.text.clone(),
            thought: text.metadata.thought,
        }),
        A2aPart::File(file) => match &file.file {
            FileContent::Bytes {
                bytes, mime_type, ..
            } => Ok(tau_ai::Part::InlineData(Blob {
                mime_type: mime_type.clone().unwrap_or_default(),
                data: BASE64_STANDARD.decode(bytes)?,
            })),
            FileContent::Uri { uri, mime_type, .. } => Ok(tau_ai::Part::FileData(FileData {
                mime_type: mime_type.clone(),
                file_uri: uri.clone(),
            })),
        },
        A2aPart::Data(data) => match data.metadata.kind {
            Some(DataPartKind::FunctionCall) => {
                let call: FunctionCall = decode_payload(DataPartKind::FunctionCall, data)?;
                ensure_identified(DataPartKind::FunctionCall, &call.id, &call.name)?;
                Ok(tau_ai::Part::FunctionCall(call))
            }
            Some(DataPartKind::FunctionResponse) => {
                let response: FunctionResponse =
                    decode_payload(DataPartKind::FunctionResponse, data)?;
                ensure_identified(DataPartKind::FunctionResponse, &response.id, &response.name)?;
                Ok(tau_ai::Part::FunctionResponse(response))
            }
            _ => Ok(tau_ai::Part::text(Value::Object(data.data.clone()).to_string())),
        },
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(
    kind: DataPartKind,
    data: &DataPart,
) -> Result<T, PartConversionError> {
    serde_json::from_value(Value::Object(data.data.clone())).map_err(|source| {
        PartConversionError::InvalidDataPart {
            kind: kind.as_str(),
            source,
        }
    })
}

fn ensure_identified(kind: DataPartKind, id: &str, name: &str) -> Result<(), PartConversionError> {
    if id.trim().is_empty() {
        return Err(PartConversionError::MissingCallId {
            kind: kind.as_str(),
            name: name.to_string(),
        });
    }
    if name.trim().is_empty() {
        return Err(PartConversionError::MissingFunctionName {
            kind: kind.as_str(),
            id: id.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn unit_function_call_becomes_typed_data_part_with_long_running_flag() {
        let parts = vec![
            tau_ai::Part::function_call("call-1", "approve", args(json!({ "amount": 5 }))),
            tau_ai::Part::function_call("call-2", "lookup", Map::new()),
        ];
        let converted =
            to_a2a_parts(&parts, &["call-1".to_string()]).expect("conversion should succeed");

        let first = converted[0].as_data().expect("data part");
        assert!(first.is_kind(DataPartKind::FunctionCall));
        assert!(first.metadata.long_running);
        assert_eq!(first.call_id(), Some("call-1"));
        assert_eq!(first.data["args"], json!({ "amount": 5 }));

        let second = converted[1].as_data().expect("data part");
        assert!(!second.metadata.long_running);
    }

    #[test]
    fn unit_function_response_keeps_call_id_and_marker() {
        let parts = vec![tau_ai::Part::function_response(
            "call-1",
            "approve",
            args(json!({ "status": "approved" })),
        )];
        let converted = to_a2a_parts(&parts, &[]).expect("conversion should succeed");
        let data = converted[0].as_data().expect("data part");
        assert!(data.is_kind(DataPartKind::FunctionResponse));
        assert_eq!(data.call_id(), Some("call-1"));
        assert!(!data.metadata.long_running);
    }

    #[test]
    fn functional_status_message_parts_decode_back_to_runtime_parts() {
        let parts = vec![
            tau_ai::Part::text("need approval"),
            tau_ai::Part::function_call("call-1", "approve", args(json!({ "amount": 5 }))),
            tau_ai::Part::InlineData(Blob {
                mime_type: "image/png".to_string(),
                data: vec![1, 2, 3],
            }),
            tau_ai::Part::FileData(FileData {
                mime_type: None,
                file_uri: "gs://bucket/report.pdf".to_string(),
            }),
        ];
        let converted = to_a2a_parts(&parts, &["call-1".to_string()]).expect("to a2a");
        let restored = to_runtime_parts(&converted).expect("to runtime");
        assert_eq!(restored, parts);
    }

    #[test]
    fn unit_untyped_data_part_becomes_json_text() {
        let parts = vec![A2aPart::Data(DataPart {
            data: args(json!({ "answer": 42 })),
            metadata: PartMetadata::default(),
        })];
        let restored = to_runtime_parts(&parts).expect("to runtime");
        assert_eq!(restored, vec![tau_ai::Part::text(r#"{"answer":42}"#)]);
    }

    #[test]
    fn regression_call_without_id_is_rejected() {
        let parts = vec![tau_ai::Part::function_call("", "approve", Map::new())];
        let error = to_a2a_parts(&parts, &[]).expect_err("empty id must fail");
        assert!(matches!(
            error,
            PartConversionError::MissingCallId {
                kind: "function_call",
                ..
            }
        ));
    }

    #[test]
    fn regression_corrupted_function_call_payload_is_rejected() {
        let parts = vec![A2aPart::Data(DataPart {
            data: args(json!({ "id": 7, "name": "approve" })),
            metadata: PartMetadata::of_kind(DataPartKind::FunctionCall),
        })];
        let error = to_runtime_parts(&parts).expect_err("numeric id must fail");
        assert!(matches!(error, PartConversionError::InvalidDataPart { .. }));

        let missing_name = vec![A2aPart::Data(DataPart {
            data: args(json!({ "id": "call-1" })),
            metadata: PartMetadata::of_kind(DataPartKind::FunctionResponse),
        })];
        let error = to_runtime_parts(&missing_name).expect_err("missing name must fail");
        assert!(matches!(
            error,
            PartConversionError::MissingFunctionName { .. }
        ));
    }

    #[test]
    fn regression_invalid_base64_file_bytes_are_rejected() {
        let parts = vec![A2aPart::File(FilePart {
            file: FileContent::Bytes {
                bytes: "%%%".to_string(),
                mime_type: Some("text/plain".to_string()),
                name: None,
            },
            metadata: PartMetadata::default(),
        })];
        let error = to_runtime_parts(&parts).expect_err("invalid base64 must fail");
        assert!(matches!(error, PartConversionError::InvalidFileBytes(_)));
    }
}
