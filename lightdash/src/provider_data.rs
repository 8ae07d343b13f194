//! Provider data structure passed to resources and data sources

use crate::api::Client;
use std::any::Any;
use std::sync::Arc;
use tfplug::types::Diagnostic;

#[derive(Clone)]
pub struct LightdashProviderData {
    pub client: Arc<Client>,
}

impl LightdashProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Extracts the data handed out by `configure`. `None` is not an error:
    /// Terraform validates configuration before the provider is configured.
    pub fn from_any(
        data: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Result<Option<Self>, Diagnostic> {
        match data {
            None => Ok(None),
            Some(data) => data
                .downcast_ref::<LightdashProviderData>()
                .cloned()
                .map(Some)
                .ok_or_else(|| {
                    Diagnostic::error(
                        "Invalid provider data",
                        "Failed to extract LightdashProviderData from provider data",
                    )
                }),
        }
    }
}

/// The client of a configured resource or data source
pub(crate) fn client_of(data: &Option<LightdashProviderData>) -> Result<&Client, Diagnostic> {
    data.as_ref().map(|d| d.client.as_ref()).ok_or_else(|| {
        Diagnostic::error(
            "Provider not configured",
            "Provider data was not properly configured",
        )
    })
}
