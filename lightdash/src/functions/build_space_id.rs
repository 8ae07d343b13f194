use crate::ids;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::function::{
    CallFunctionRequest, CallFunctionResponse, Function, FunctionDefinition,
    FunctionDefinitionRequest, FunctionDefinitionResponse, Parameter,
};
use tfplug::schema::AttributeType;
use tfplug::types::{Dynamic, DynamicValue};

/// `provider::lightdash::build_space_id(project_uuid, space_uuid)`
#[derive(Default)]
pub struct BuildSpaceIdFunction;

impl BuildSpaceIdFunction {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Function for BuildSpaceIdFunction {
    fn name(&self) -> &str {
        "build_space_id"
    }

    async fn definition(
        &self,
        _ctx: Context,
        _request: FunctionDefinitionRequest,
    ) -> FunctionDefinitionResponse {
        FunctionDefinitionResponse {
            definition: FunctionDefinition {
                parameters: vec![
                    Parameter::new("project_uuid", AttributeType::String, "Project UUID"),
                    Parameter::new("space_uuid", AttributeType::String, "Space UUID"),
                ],
                variadic_parameter: None,
                return_type: AttributeType::String,
                summary: "Builds a lightdash_space import ID".to_string(),
                description: "Returns projects/{project_uuid}/spaces/{space_uuid}, the ID \
                              accepted by terraform import for lightdash_space."
                    .to_string(),
                deprecation_message: None,
            },
            diagnostics: vec![],
        }
    }

    async fn call(&self, _ctx: Context, request: CallFunctionRequest) -> CallFunctionResponse {
        let project_uuid = match super::string_argument(&request, 0, "project_uuid") {
            Ok(value) => value,
            Err(response) => return response,
        };
        let space_uuid = match super::string_argument(&request, 1, "space_uuid") {
            Ok(value) => value,
            Err(response) => return response,
        };

        let id = ids::build(ids::SPACE, &[&project_uuid, &space_uuid]);
        CallFunctionResponse::ok(DynamicValue::new(Dynamic::String(id)))
    }
}
