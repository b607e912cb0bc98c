//! Kubernetes-backed orchestrator.

use std::path::Path;

use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, DeleteParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, info};

use crate::orchestrator::{object_name, Orchestrator, OrchestratorError, OrchestratorFuture};

/// Orchestrator that manages `apps/v1` Deployments through the Kubernetes API.
#[derive(Clone)]
pub struct KubeOrchestrator {
    client: Client,
}

impl KubeOrchestrator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from an explicit kubeconfig file, a named context of
    /// the default kubeconfig, or the environment (in-cluster service
    /// account, `$KUBECONFIG`, `~/.kube/config`), in that order.
    pub async fn connect(
        kubeconfig: Option<&Path>,
        context: Option<&str>,
    ) -> Result<Self, OrchestratorError> {
        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            ..Default::default()
        };
        let config = match (kubeconfig, context) {
            (Some(path), _) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(client_error)?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(client_error)?
            }
            (None, Some(_)) => Config::from_kubeconfig(&options)
                .await
                .map_err(client_error)?,
            (None, None) => Config::infer().await.map_err(client_error)?,
        };
        info!(cluster = %config.cluster_url, "kubernetes client configured");
        let client = Client::try_from(config).map_err(client_error)?;
        Ok(Self::new(client))
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl Orchestrator for KubeOrchestrator {
    fn get<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> OrchestratorFuture<'a, Option<Deployment>> {
        Box::pin(async move {
            let found = self
                .deployments(namespace)
                .get_opt(name)
                .await
                .map_err(|e| classify(e, namespace, name))?;
            debug!(%namespace, %name, exists = found.is_some(), "deployment looked up");
            Ok(found)
        })
    }

    fn create<'a>(
        &'a self,
        namespace: &'a str,
        deployment: &'a Deployment,
    ) -> OrchestratorFuture<'a, Deployment> {
        Box::pin(async move {
            let name = object_name(deployment)?;
            self.deployments(namespace)
                .create(&PostParams::default(), deployment)
                .await
                .map_err(|e| classify(e, namespace, name))
        })
    }

    fn update<'a>(
        &'a self,
        namespace: &'a str,
        deployment: &'a Deployment,
    ) -> OrchestratorFuture<'a, Deployment> {
        Box::pin(async move {
            let name = object_name(deployment)?;
            self.deployments(namespace)
                .replace(name, &PostParams::default(), deployment)
                .await
                .map_err(|e| classify(e, namespace, name))
        })
    }

    fn delete<'a>(&'a self, namespace: &'a str, name: &'a str) -> OrchestratorFuture<'a, ()> {
        Box::pin(async move {
            self.deployments(namespace)
                .delete(name, &DeleteParams::default())
                .await
                .map_err(|e| classify(e, namespace, name))?;
            Ok(())
        })
    }
}

/// Map a kube error to an orchestrator error for the named object.
fn classify(err: kube::Error, namespace: &str, name: &str) -> OrchestratorError {
    match err {
        kube::Error::Api(response) if response.code == 404 => {
            OrchestratorError::not_found(namespace, name)
        }
        kube::Error::Api(response) if response.code == 409 => {
            OrchestratorError::conflict(namespace, name)
        }
        kube::Error::Api(response) => {
            OrchestratorError::Api(format!("{} ({})", response.message, response.code))
        }
        other => OrchestratorError::Client(other.to_string()),
    }
}

fn client_error(err: impl std::fmt::Display) -> OrchestratorError {
    OrchestratorError::Client(err.to_string())
}
