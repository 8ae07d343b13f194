use crate::ids;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::function::{
    CallFunctionRequest, CallFunctionResponse, Function, FunctionDefinition,
    FunctionDefinitionRequest, FunctionDefinitionResponse, Parameter,
};
use tfplug::schema::AttributeType;
use tfplug::types::{Dynamic, DynamicValue};

/// `provider::lightdash::parse_resource_id(id)`: splits
/// `projects/a/spaces/b` into `{ projects = "a", spaces = "b" }`
#[derive(Default)]
pub struct ParseResourceIdFunction;

impl ParseResourceIdFunction {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Function for ParseResourceIdFunction {
    fn name(&self) -> &str {
        "parse_resource_id"
    }

    async fn definition(
        &self,
        _ctx: Context,
        _request: FunctionDefinitionRequest,
    ) -> FunctionDefinitionResponse {
        FunctionDefinitionResponse {
            definition: FunctionDefinition {
                parameters: vec![Parameter::new(
                    "id",
                    AttributeType::String,
                    "A resource ID made of collection/uuid pairs",
                )],
                variadic_parameter: None,
                return_type: AttributeType::Map(Box::new(AttributeType::String)),
                summary: "Splits a Lightdash resource ID into its parts".to_string(),
                description: "Returns a map from collection name to uuid.".to_string(),
                deprecation_message: None,
            },
            diagnostics: vec![],
        }
    }

    async fn call(&self, _ctx: Context, request: CallFunctionRequest) -> CallFunctionResponse {
        let id = match super::string_argument(&request, 0, "id") {
            Ok(value) => value,
            Err(response) => return response,
        };

        match ids::parse_collections(&id) {
            Ok(parts) => CallFunctionResponse::ok(DynamicValue::new(Dynamic::Map(
                parts
                    .into_iter()
                    .map(|(collection, uuid)| (collection, Dynamic::String(uuid)))
                    .collect(),
            ))),
            Err(e) => CallFunctionResponse::error(e.to_string(), Some(0)),
        }
    }
}
