use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `Role` values.
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Function invocation requested by the model.
pub struct FunctionCall {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl FunctionCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Result returned for a previously issued [`FunctionCall`], matched by `id`.
pub struct FunctionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub response: Map<String, Value>,
}

impl FunctionResponse {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        response: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            response,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `Blob` used for inline binary content.
pub struct Blob {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `FileData` referencing content by URI.
pub struct FileData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub file_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
/// One unit of runtime content. Exactly one payload per part.
pub enum Part {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "is_false")]
        thought: bool,
    },
    InlineData(Blob),
    FileData(FileData),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            thought: false,
        }
    }

    pub fn function_call(
        id: impl Into<String>,
        name: impl Into<String>,
        args: Map<String, Value>,
    ) -> Self {
        Self::FunctionCall(FunctionCall::new(id, name, args))
    }

    pub fn function_response(
        id: impl Into<String>,
        name: impl Into<String>,
        response: Map<String, Value>,
    ) -> Self {
        Self::FunctionResponse(FunctionResponse::new(id, name, response))
    }

    pub fn as_function_call(&self) -> Option<&FunctionCall> {
        match self {
            Self::FunctionCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_function_response(&self) -> Option<&FunctionResponse> {
        match self {
            Self::FunctionResponse(response) => Some(response),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Public struct `Content` used across Tau components.
pub struct Content {
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self::new(Role::Model, parts)
    }

    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text, thought } if !thought => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.parts.iter().filter_map(Part::as_function_call)
    }

    pub fn function_responses(&self) -> impl Iterator<Item = &FunctionResponse> {
        self.parts.iter().filter_map(Part::as_function_response)
    }

    /// Returns true when any part answers the call identified by `call_id`.
    pub fn has_function_response(&self, call_id: &str) -> bool {
        self.function_responses()
            .any(|response| response.id == call_id)
    }
}
