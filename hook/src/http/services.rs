//! Service lookups

use render_api::{CustomDomainEntry, Service, ServiceFilter, ServiceListEntry};
use secrecy::SecretString;
use tracing::{debug, error, info, warn};

use crate::deploy::outcome::ServiceUrls;
use crate::errors::ApiError;
use crate::http::client::RenderClient;

const PAGE_LIMIT: u32 = 100;

impl RenderClient {
    /// List the services visible to `api_key`
    pub async fn list_services(
        &self,
        api_key: &SecretString,
        filter: ServiceFilter,
    ) -> Result<Vec<Service>, ApiError> {
        let mut query = vec![("limit", PAGE_LIMIT.to_string())];
        if let Some(suspended) = filter.suspended_param() {
            query.push(("suspended", suspended.to_string()));
        }

        let entries: Vec<ServiceListEntry> = self.get("/services", api_key, &query).await?;
        let services: Vec<Service> = entries.into_iter().map(|e| e.service).collect();

        info!("Fetched {} services", services.len());
        for service in &services {
            debug!(
                service_id = service.id.as_deref().unwrap_or("-"),
                service_name = service.name.as_deref().unwrap_or("-"),
                "Service listed"
            );
        }
        Ok(services)
    }

    /// Verified custom domains of a service, `https://` prefixed
    pub async fn list_custom_domains(
        &self,
        service_id: &str,
        api_key: &SecretString,
    ) -> Result<Vec<String>, ApiError> {
        let path = format!("/services/{}/custom-domains", service_id);
        let entries: Vec<CustomDomainEntry> = self.get(&path, api_key, &[]).await?;

        let domains: Vec<String> = entries
            .into_iter()
            .map(|e| e.custom_domain)
            .filter(|d| d.is_verified())
            .filter_map(|d| d.name.filter(|n| !n.is_empty()))
            .map(|name| format!("https://{}", name))
            .collect();

        info!(service_id, "Found {} verified custom domains", domains.len());
        Ok(domains)
    }

    /// Default URL and verified custom domains of a service.
    ///
    /// `None` when the listing fails or the service is not in it. A failed
    /// custom domain lookup leaves the domain list empty.
    pub async fn resolve_service_urls(
        &self,
        service_id: &str,
        api_key: &SecretString,
    ) -> Option<ServiceUrls> {
        let services = match self.list_services(api_key, ServiceFilter::All).await {
            Ok(services) => services,
            Err(e) => {
                error!(service_id, error = %e, "Failed to list services while resolving URLs");
                return None;
            }
        };

        let Some(service) = services
            .into_iter()
            .find(|s| s.id.as_deref() == Some(service_id))
        else {
            error!(service_id, "Service not found while resolving URLs");
            return None;
        };

        let custom_domains = match self.list_custom_domains(service_id, api_key).await {
            Ok(domains) => domains,
            Err(e) => {
                warn!(service_id, error = %e, "Failed to fetch custom domains");
                Vec::new()
            }
        };

        Some(ServiceUrls {
            default_url: service.service_details.and_then(|d| d.url),
            custom_domains,
        })
    }
}
