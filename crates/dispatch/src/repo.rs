//! Repository provisioning.
//!
//! Unlike email dispatch, these calls exist to change the remote system, so
//! their failures propagate to the caller as `Error::Dispatch`.

use async_trait::async_trait;
use leaddesk_core::{Error, ProjectId, RepoPermission, Result};
use reqwest::{Client, ClientBuilder};
use serde_json::json;
use tracing::debug;

/// Request to create a repository for a project.
#[derive(Debug, Clone)]
pub struct RepoRequest {
    /// Repository name
    pub name: String,

    /// Repository description
    pub description: String,

    /// The project the repository is for
    pub project_id: ProjectId,

    /// Client name, recorded in the description
    pub client_name: String,

    /// Whether the repository should be private
    pub is_private: bool,
}

/// A successfully provisioned repository.
#[derive(Debug, Clone)]
pub struct ProvisionedRepo {
    /// Repository name
    pub name: String,

    /// Web URL
    pub url: String,

    /// Clone URL
    pub clone_url: String,
}

/// One collaborator to invite.
#[derive(Debug, Clone)]
pub struct CollaboratorInvite {
    /// Remote username
    pub username: String,

    /// Permission to grant
    pub permission: RepoPermission,
}

/// Per-collaborator invite result.
#[derive(Debug, Clone)]
pub struct CollaboratorResult {
    /// Remote username
    pub username: String,

    /// Whether the invite succeeded
    pub success: bool,

    /// Error detail when it did not
    pub error: Option<String>,
}

/// Provisions repositories and manages collaborators.
#[async_trait]
pub trait RepoProvisioner: Send + Sync {
    /// Create a repository.
    async fn create_repository(&self, request: &RepoRequest) -> Result<ProvisionedRepo>;

    /// Invite collaborators; each invite succeeds or fails independently.
    async fn add_collaborators(
        &self,
        repo: &str,
        invites: &[CollaboratorInvite],
    ) -> Vec<CollaboratorResult>;

    /// Remove a collaborator.
    async fn remove_collaborator(&self, repo: &str, username: &str) -> Result<()>;

    /// Delete a repository.
    async fn delete_repository(&self, repo: &str) -> Result<()>;
}

/// Provisioner backed by the GitHub REST API.
#[derive(Clone)]
pub struct GithubProvisioner {
    client: Client,
    token: String,
    owner: String,
}

impl GithubProvisioner {
    const API: &'static str = "https://api.github.com";

    /// Create a provisioner for repositories owned by `owner`.
    pub fn new(token: String, owner: String) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            token,
            owner,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", Self::API))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "leaddesk")
    }
}

#[async_trait]
impl RepoProvisioner for GithubProvisioner {
    async fn create_repository(&self, request: &RepoRequest) -> Result<ProvisionedRepo> {
        debug!(name = %request.name, project = %request.project_id, "creating repository");

        let payload = json!({
            "name": request.name,
            "description": format!("{} (client: {})", request.description, request.client_name),
            "private": request.is_private,
            "auto_init": true,
        });

        let response = self
            .request(reqwest::Method::POST, "/user/repos")
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Dispatch(format!("repository create failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Dispatch(format!(
                "repository create returned {status}: {body}"
            )));
        }

        #[derive(serde::Deserialize)]
        struct Created {
            name: String,
            html_url: String,
            clone_url: String,
        }

        let created: Created = response
            .json()
            .await
            .map_err(|e| Error::Dispatch(format!("unexpected create response: {e}")))?;

        Ok(ProvisionedRepo {
            name: created.name,
            url: created.html_url,
            clone_url: created.clone_url,
        })
    }

    async fn add_collaborators(
        &self,
        repo: &str,
        invites: &[CollaboratorInvite],
    ) -> Vec<CollaboratorResult> {
        let mut results = Vec::with_capacity(invites.len());
        for invite in invites {
            let path = format!(
                "/repos/{}/{repo}/collaborators/{}",
                self.owner, invite.username
            );
            let outcome = self
                .request(reqwest::Method::PUT, &path)
                .json(&json!({ "permission": invite.permission.as_str() }))
                .send()
                .await;
            let result = match outcome {
                Ok(r) if r.status().is_success() => CollaboratorResult {
                    username: invite.username.clone(),
                    success: true,
                    error: None,
                },
                Ok(r) => CollaboratorResult {
                    username: invite.username.clone(),
                    success: false,
                    error: Some(format!("invite returned {}", r.status())),
                },
                Err(e) => CollaboratorResult {
                    username: invite.username.clone(),
                    success: false,
                    error: Some(e.to_string()),
                },
            };
            results.push(result);
        }
        results
    }

    async fn remove_collaborator(&self, repo: &str, username: &str) -> Result<()> {
        let path = format!("/repos/{}/{repo}/collaborators/{username}", self.owner);
        let response = self
            .request(reqwest::Method::DELETE, &path)
            .send()
            .await
            .map_err(|e| Error::Dispatch(format!("collaborator removal failed: {e}")))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Dispatch(format!(
                "collaborator removal returned {}",
                response.status()
            )))
        }
    }

    async fn delete_repository(&self, repo: &str) -> Result<()> {
        let path = format!("/repos/{}/{repo}", self.owner);
        let response = self
            .request(reqwest::Method::DELETE, &path)
            .send()
            .await
            .map_err(|e| Error::Dispatch(format!("repository delete failed: {e}")))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Dispatch(format!(
                "repository delete returned {}",
                response.status()
            )))
        }
    }
}

/// Provisioner that fabricates deterministic results. Used by tests and by
/// the CLI when no token is configured.
pub struct NullProvisioner;

#[async_trait]
impl RepoProvisioner for NullProvisioner {
    async fn create_repository(&self, request: &RepoRequest) -> Result<ProvisionedRepo> {
        Ok(ProvisionedRepo {
            name: request.name.clone(),
            url: format!("https://example.invalid/{}", request.name),
            clone_url: format!("https://example.invalid/{}.git", request.name),
        })
    }

    async fn add_collaborators(
        &self,
        _repo: &str,
        invites: &[CollaboratorInvite],
    ) -> Vec<CollaboratorResult> {
        invites
            .iter()
            .map(|i| CollaboratorResult {
                username: i.username.clone(),
                success: true,
                error: None,
            })
            .collect()
    }

    async fn remove_collaborator(&self, _repo: &str, _username: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_repository(&self, _repo: &str) -> Result<()> {
        Ok(())
    }
}
