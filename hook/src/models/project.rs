//! Project registry

use std::collections::BTreeMap;

use secrecy::{ExposeSecret, SecretString};

/// A deployable project and the credential used to reach its service
#[derive(Debug)]
pub struct Project {
    /// Identifier used in the `project` query parameter
    pub id: String,

    /// Human readable name
    pub name: String,

    api_key: SecretString,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            api_key: SecretString::from(api_key.into()),
        }
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    /// Whether a non-empty credential is configured
    pub fn has_credential(&self) -> bool {
        !self.api_key.expose_secret().trim().is_empty()
    }
}

/// Immutable mapping from project id to project, ordered by id
#[derive(Debug, Default)]
pub struct ProjectRegistry {
    projects: BTreeMap<String, Project>,
}

impl ProjectRegistry {
    pub fn new(projects: impl IntoIterator<Item = Project>) -> Self {
        Self {
            projects: projects.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Project> {
        self.projects.get(id)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    /// Ids of the projects that have a credential, in id order
    pub fn configured_ids(&self) -> Vec<String> {
        self.iter()
            .filter(|p| p.has_credential())
            .map(|p| p.id.clone())
            .collect()
    }
}
