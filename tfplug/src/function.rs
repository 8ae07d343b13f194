//! Provider-defined functions

use crate::context::Context;
use crate::schema::AttributeType;
use crate::types::{Diagnostic, DynamicValue, FunctionError};
use async_trait::async_trait;

#[async_trait]
pub trait Function: Send + Sync {
    /// Name without the provider prefix, e.g. "build_space_id"
    fn name(&self) -> &str;

    async fn definition(
        &self,
        ctx: Context,
        request: FunctionDefinitionRequest,
    ) -> FunctionDefinitionResponse;

    async fn call(&self, ctx: Context, request: CallFunctionRequest) -> CallFunctionResponse;
}

pub struct FunctionDefinitionRequest;

pub struct FunctionDefinitionResponse {
    pub definition: FunctionDefinition,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct FunctionDefinition {
    pub parameters: Vec<Parameter>,
    pub variadic_parameter: Option<Parameter>,
    pub return_type: AttributeType,
    pub summary: String,
    pub description: String,
    pub deprecation_message: Option<String>,
}

pub struct Parameter {
    pub name: String,
    pub r#type: AttributeType,
    pub allow_null_value: bool,
    pub allow_unknown_values: bool,
    pub description: String,
}

impl Parameter {
    pub fn new(name: &str, r#type: AttributeType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            r#type,
            allow_null_value: false,
            allow_unknown_values: false,
            description: description.to_string(),
        }
    }
}

pub struct CallFunctionRequest {
    pub arguments: Vec<DynamicValue>,
}

pub struct CallFunctionResponse {
    pub result: Option<DynamicValue>,
    pub error: Option<FunctionError>,
}

impl CallFunctionResponse {
    pub fn ok(result: DynamicValue) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn error(text: impl Into<String>, function_argument: Option<i64>) -> Self {
        Self {
            result: None,
            error: Some(FunctionError {
                text: text.into(),
                function_argument,
            }),
        }
    }
}
