//! Terraform data sources

pub mod ai_agents;
pub mod groups;
pub mod members;
pub mod organization;
pub mod projects;
pub mod spaces;

pub use ai_agents::AiAgentsDataSource;
pub use groups::{GroupDataSource, OrganizationGroupsDataSource};
pub use members::{OrganizationMemberDataSource, OrganizationMembersDataSource};
pub use organization::{AuthenticatedUserDataSource, OrganizationDataSource};
pub use projects::{ProjectDataSource, ProjectRoleMembersDataSource, ProjectsDataSource};
pub use spaces::{SpaceDataSource, SpacesDataSource};

use crate::provider_data::LightdashProviderData;
use std::fmt::Display;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, ReadDataSourceResponse,
};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{Diagnostic, DynamicValue};

pub(crate) fn configure(
    slot: &mut Option<LightdashProviderData>,
    request: ConfigureDataSourceRequest,
) -> ConfigureDataSourceResponse {
    let mut diagnostics = vec![];
    match LightdashProviderData::from_any(request.provider_data) {
        Ok(data) => *slot = data,
        Err(diag) => diagnostics.push(diag),
    }
    ConfigureDataSourceResponse { diagnostics }
}

/// On failure the config is echoed back as state next to the diagnostic
pub(crate) fn respond(
    config: DynamicValue,
    result: Result<DynamicValue, Diagnostic>,
) -> ReadDataSourceResponse {
    match result {
        Ok(state) => ReadDataSourceResponse {
            state,
            diagnostics: vec![],
            deferred: None,
        },
        Err(diag) => ReadDataSourceResponse {
            state: config,
            diagnostics: vec![diag],
            deferred: None,
        },
    }
}

pub(crate) fn api_error(summary: &str, err: impl Display) -> Diagnostic {
    Diagnostic::error(summary, format!("API error: {}", err))
}

pub(crate) fn computed(name: &str, type_: AttributeType) -> Attribute {
    AttributeBuilder::new(name, type_).computed().build()
}

pub(crate) fn computed_string(name: &str) -> Attribute {
    computed(name, AttributeType::String)
}

pub(crate) fn required_string(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .required()
        .build()
}

/// Computed list of objects with the given fields
pub(crate) fn computed_objects<'a>(
    name: &str,
    fields: impl IntoIterator<Item = (&'a str, AttributeType)>,
) -> Attribute {
    computed(
        name,
        AttributeType::List(Box::new(AttributeType::object(fields))),
    )
}
