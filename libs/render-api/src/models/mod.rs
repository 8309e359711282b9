//! API models

use serde::{Deserialize, Serialize};

/// One entry of `GET /services`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceListEntry {
    #[serde(default)]
    pub cursor: Option<String>,
    pub service: Service,
}

/// A Render service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub service_type: Option<String>,
    /// `suspended` or `not_suspended`
    #[serde(default)]
    pub suspended: Option<String>,
    #[serde(default)]
    pub service_details: Option<ServiceDetails>,
}

/// Type specific service details; only the public URL is used
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceDetails {
    #[serde(default)]
    pub url: Option<String>,
}

/// A deploy of a service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deploy {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

/// One entry of `GET /services/{id}/custom-domains`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomDomainEntry {
    #[serde(default)]
    pub cursor: Option<String>,
    pub custom_domain: CustomDomain,
}

/// A custom domain attached to a service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomDomain {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain_type: Option<String>,
    /// `verified` or `unverified`
    #[serde(default)]
    pub verification_status: Option<String>,
}

impl CustomDomain {
    pub fn is_verified(&self) -> bool {
        self.verification_status.as_deref() == Some("verified")
    }
}

/// Suspension filter accepted by `GET /services`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceFilter {
    #[default]
    All,
    SuspendedOnly,
    ActiveOnly,
}

impl ServiceFilter {
    /// Value of the `suspended` query parameter, if any
    pub fn suspended_param(&self) -> Option<&'static str> {
        match self {
            ServiceFilter::All => None,
            ServiceFilter::SuspendedOnly => Some("suspended"),
            ServiceFilter::ActiveOnly => Some("not_suspended"),
        }
    }
}
