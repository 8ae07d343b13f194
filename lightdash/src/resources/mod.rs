//! Terraform resources

pub mod ai_agent;
pub mod group;
pub mod organization_role_member;
pub mod project_role_group;
pub mod project_role_member;
pub mod project_scheduler_settings;
pub mod space;
pub mod warehouse_credentials;

pub use ai_agent::AiAgentResource;
pub use group::GroupResource;
pub use organization_role_member::OrganizationRoleMemberResource;
pub use project_role_group::ProjectRoleGroupResource;
pub use project_role_member::ProjectRoleMemberResource;
pub use project_scheduler_settings::ProjectSchedulerSettingsResource;
pub use space::SpaceResource;
pub use warehouse_credentials::WarehouseCredentialsResource;

use crate::ids;
use crate::values;
use std::fmt::Display;
use std::str::FromStr;
use tfplug::context::Context;
use tfplug::import_state_passthrough_id;
use tfplug::resource::{ImportResourceStateRequest, ImportResourceStateResponse};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

/// Checks the import ID against its format and hands it to read via `id`
pub(crate) fn import_by_id(
    ctx: &Context,
    template: &'static str,
    request: &ImportResourceStateRequest,
) -> ImportResourceStateResponse {
    let mut response = ImportResourceStateResponse {
        imported_resources: vec![],
        diagnostics: vec![],
        deferred: None,
    };

    if let Err(e) = ids::parse(&request.id, template) {
        response.diagnostics.push(Diagnostic::error(
            "Invalid import ID",
            format!("{}. Expected format: {}", e, template),
        ));
        return response;
    }

    import_state_passthrough_id(ctx, AttributePath::new("id"), request, &mut response);
    response
}

pub(crate) fn api_error(summary: &str, err: impl Display) -> Diagnostic {
    Diagnostic::error(summary, format!("API error: {}", err))
}

/// A required attribute parsed into one of the role enums
pub(crate) fn role_attr<R>(state: &DynamicValue, name: &str) -> Result<R, Diagnostic>
where
    R: FromStr<Err = String>,
{
    let path = AttributePath::new(name);
    let raw = values::string(state, name).ok_or_else(|| {
        Diagnostic::error(
            format!("Missing {}", name),
            format!("The '{}' attribute is required", name),
        )
        .with_attribute(path.clone())
    })?;
    raw.parse::<R>()
        .map_err(|e| Diagnostic::error("Invalid role", e).with_attribute(path))
}

/// A required string attribute
pub(crate) fn required_string(state: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    values::string(state, name).ok_or_else(|| {
        Diagnostic::error(
            format!("Missing {}", name),
            format!("The '{}' attribute is required", name),
        )
        .with_attribute(AttributePath::new(name))
    })
}

pub(crate) fn missing_id(resource: &str, err: impl Display) -> Diagnostic {
    Diagnostic::error(
        format!("Invalid {} state", resource),
        format!("Could not determine the remote object from state: {}", err),
    )
    .with_attribute(AttributePath::new("id"))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::api::Client;
    use crate::provider_data::LightdashProviderData;
    use std::any::Any;
    use std::sync::Arc;
    use tfplug::resource::{ConfigureResourceRequest, ResourceWithConfigure};
    use tfplug::types::ClientCapabilities;
    use tfplug::Context;

    pub fn provider_data(url: &str) -> Arc<dyn Any + Send + Sync> {
        let client = Client::new(url, "test-token").unwrap();
        Arc::new(LightdashProviderData::new(client))
    }

    pub async fn configured<R: ResourceWithConfigure>(mut resource: R, url: &str) -> R {
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(provider_data(url)),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        resource
    }

    pub fn capabilities() -> ClientCapabilities {
        ClientCapabilities::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::types::ClientCapabilities;

    fn request(id: &str) -> ImportResourceStateRequest {
        ImportResourceStateRequest {
            type_name: "lightdash_space".to_string(),
            id: id.to_string(),
            client_capabilities: ClientCapabilities::default(),
        }
    }

    #[test]
    fn import_by_id_rejects_malformed_ids() {
        let response = import_by_id(&Context::new(), ids::SPACE, &request("spaces/s1"));
        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Invalid import ID");
        assert!(response.diagnostics[0]
            .detail
            .contains("projects/{}/spaces/{}"));
    }

    #[test]
    fn import_by_id_passes_valid_ids_through() {
        let response = import_by_id(&Context::new(), ids::SPACE, &request("projects/p1/spaces/s1"));
        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response.imported_resources[0]
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "projects/p1/spaces/s1"
        );
    }
}
