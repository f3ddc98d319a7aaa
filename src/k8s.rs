use std::path::{Path, PathBuf};

use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use kube::{
	api::{Api, ListParams},
	config::{KubeConfigOptions, Kubeconfig},
	Client, Config,
};
use tracing::{debug, info, warn};

use crate::errors::FetchError;
pub mod cache;
pub mod normalize;

/// Files tried, in order, after in-cluster credentials and `KUBECONFIG`.
const WELL_KNOWN_KUBECONFIGS: &[&str] = &["/etc/rancher/k3s/k3s.yaml", "/etc/kubernetes/admin.conf"];

/// Read access to the cluster's ingress resources.
#[async_trait]
pub trait IngressSource: Send + Sync {
	async fn list_all(&self) -> Result<Vec<Ingress>, FetchError>;

	async fn read(&self, namespace: &str, name: &str) -> Result<Ingress, FetchError>;
}

pub struct KubeIngressSource {
	client: Client,
}

impl KubeIngressSource {
	pub fn new(client: Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl IngressSource for KubeIngressSource {
	async fn list_all(&self) -> Result<Vec<Ingress>, FetchError> {
		let ingress_api: Api<Ingress> = Api::all(self.client.clone());
		let ingress_list = ingress_api.list(&ListParams::default()).await?;
		debug!("listed {} ingresses", ingress_list.items.len());
		Ok(ingress_list.items)
	}

	async fn read(&self, namespace: &str, name: &str) -> Result<Ingress, FetchError> {
		let ingress_api: Api<Ingress> = Api::namespaced(self.client.clone(), namespace);
		Ok(ingress_api.get(name).await?)
	}
}

/// Stands in for the cluster when no credentials could be resolved.
pub struct UnavailableSource;

#[async_trait]
impl IngressSource for UnavailableSource {
	async fn list_all(&self) -> Result<Vec<Ingress>, FetchError> {
		Err(FetchError::ConfigUnavailable)
	}

	async fn read(&self, _namespace: &str, _name: &str) -> Result<Ingress, FetchError> {
		Err(FetchError::ConfigUnavailable)
	}
}

/// Resolves cluster credentials: in-cluster first, then every path in `kubeconfig`
/// (colon separated, like `KUBECONFIG`), then the usual local files.
/// `None` means the orchestrator is unavailable, which is not fatal.
pub async fn connect(kubeconfig: Option<&str>) -> Option<Client> {
	let config = match Config::incluster() {
		Ok(config) => {
			info!("using in-cluster credentials");
			Some(config)
		},
		Err(e) => {
			debug!("no in-cluster credentials: {e}");
			from_kubeconfig_files(&candidate_paths(kubeconfig)).await
		},
	}?;

	match Client::try_from(config) {
		Ok(client) => Some(client),
		Err(e) => {
			warn!("could not build cluster client: {e}");
			None
		},
	}
}

fn candidate_paths(kubeconfig: Option<&str>) -> Vec<PathBuf> {
	let mut paths: Vec<PathBuf> = kubeconfig
		.into_iter()
		.flat_map(|v| v.split(':'))
		.map(str::trim)
		.filter(|p| !p.is_empty())
		.map(PathBuf::from)
		.collect();
	if let Some(home) = dirs::home_dir() {
		paths.push(home.join(".kube").join("config"));
	}
	paths.extend(WELL_KNOWN_KUBECONFIGS.iter().map(PathBuf::from));
	paths
}

async fn from_kubeconfig_files(paths: &[PathBuf]) -> Option<Config> {
	for path in paths {
		match load_kubeconfig(path).await {
			Ok(config) => {
				info!("using kubeconfig {}", path.display());
				return Some(config);
			},
			Err(e) => debug!("skipping kubeconfig {}: {e}", path.display()),
		}
	}
	warn!("no usable cluster credentials found");
	None
}

async fn load_kubeconfig(path: &Path) -> Result<Config, kube::config::KubeconfigError> {
	let kubeconfig = Kubeconfig::read_from(path)?;
	Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await
}

/// YAML rendering of one ingress, without the server-side apply bookkeeping.
pub fn render_yaml(mut ingress: Ingress) -> Result<String, serde_yaml::Error> {
	ingress.metadata.managed_fields = None;
	serde_yaml::to_string(&ingress)
}
