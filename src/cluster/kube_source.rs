//! `kube`-backed implementation of [`ClusterSource`].
//!
//! # Credentials
//!
//! Resolution order:
//!
//! 1. in-cluster service account (when running inside a pod)
//! 2. the explicit kubeconfig path (config file, `--kubeconfig` or `KUBECONFIG`)
//! 3. `~/.kube/config`
//!
//! The rustls crypto provider must be installed before [`KubeClusterSource::connect`]
//! is called.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod, Service};
use kube::{
    Client, Config,
    api::{Api, ListParams},
    config::{KubeConfigOptions, Kubeconfig},
};

use super::{ClusterError, ClusterSource, Query, ServiceRef};

/// Kubernetes API client used by the reader.
#[derive(Clone)]
pub struct KubeClusterSource {
    client: Client,
}

impl KubeClusterSource {
    /// Resolve credentials and build a client.
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, ClusterError> {
        let config = resolve_kube_config(kubeconfig).await?;
        let client = Client::try_from(config).map_err(ClusterError::ClientCreation)?;
        Ok(Self { client })
    }
}

/// Default kubeconfig location (`~/.kube/config`).
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".kube").join("config"))
}

/// Try in-cluster credentials first, then fall back to a kubeconfig file.
pub async fn resolve_kube_config(kubeconfig: Option<&Path>) -> Result<Config, ClusterError> {
    match Config::incluster() {
        Ok(config) => {
            log::info!("Using in-cluster Kubernetes credentials");
            return Ok(config);
        }
        Err(e) => log::debug!("In-cluster credentials unavailable: {}", e),
    }

    // KUBECONFIG may hold a path list; only the first entry is used.
    let path = match kubeconfig {
        Some(p) => std::env::split_paths(p).next().unwrap_or_else(|| p.to_path_buf()),
        None => default_kubeconfig_path().ok_or(ClusterError::NoKubeconfig)?,
    };
    let to_error = |source| ClusterError::Kubeconfig {
        path: path.display().to_string(),
        source,
    };

    let kubeconfig = Kubeconfig::read_from(&path).map_err(to_error)?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(to_error)?;

    log::info!("Using kubeconfig {}", path.display());
    Ok(config)
}

#[async_trait]
impl ClusterSource for KubeClusterSource {
    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes
            .list(&ListParams::default())
            .await
            .map_err(|source| ClusterError::Api {
                query: Query::Nodes,
                source,
            })?;
        Ok(list.items)
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces
            .list_metadata(&ListParams::default())
            .await
            .map_err(|source| ClusterError::Api {
                query: Query::Namespaces,
                source,
            })?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    async fn count_pods(&self, namespace: &str) -> Result<usize, ClusterError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list_metadata(&ListParams::default())
            .await
            .map_err(|source| ClusterError::Api {
                query: Query::Pods,
                source,
            })?;
        Ok(list.items.len())
    }

    async fn count_services(&self, namespace: &str) -> Result<usize, ClusterError> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let list = services
            .list_metadata(&ListParams::default())
            .await
            .map_err(|source| ClusterError::Api {
                query: Query::Services,
                source,
            })?;
        Ok(list.items.len())
    }

    async fn list_services(&self) -> Result<Vec<ServiceRef>, ClusterError> {
        let services: Api<Service> = Api::all(self.client.clone());
        let list = services
            .list_metadata(&ListParams::default())
            .await
            .map_err(|source| ClusterError::Api {
                query: Query::AllServices,
                source,
            })?;
        Ok(list
            .items
            .into_iter()
            .map(|svc| {
                ServiceRef::new(
                    svc.metadata.namespace.unwrap_or_default(),
                    svc.metadata.name.unwrap_or_default(),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_kubeconfig_path() {
        if let Some(path) = default_kubeconfig_path() {
            assert!(path.ends_with(".kube/config"));
        }
    }

    #[tokio::test]
    async fn test_missing_kubeconfig_is_reported() {
        // Outside a pod the in-cluster lookup fails and the file is tried.
        if std::env::var("KUBERNETES_SERVICE_HOST").is_ok() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent-config");
        let err = resolve_kube_config(Some(&missing)).await.unwrap_err();
        match err {
            ClusterError::Kubeconfig { path, .. } => assert!(path.ends_with("absent-config")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
