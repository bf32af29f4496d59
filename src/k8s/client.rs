use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use envconfig::Envconfig;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client};
use tracing::info;

use crate::config::{EnvConfig, KubeconfigSettings};
use crate::metadata::IN_CLUSTER_CONFIG_PATH;

/// Build a kube::Client for the kubeconfig at `config_path`.
/// The in-cluster sentinel (`""`) infers the config from the environment.
pub async fn build_client(config_path: &str) -> Result<Client> {
    let config = if config_path == IN_CLUSTER_CONFIG_PATH {
        kube::Config::infer()
            .await
            .context("Failed to infer in-cluster config")?
    } else {
        let kubeconfig = Kubeconfig::read_from(config_path)
            .with_context(|| format!("Failed to read kubeconfig '{config_path}'"))?;
        kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .with_context(|| format!("Failed to load kubeconfig '{config_path}'"))?
    };

    Client::try_from(config).context("Failed to build Kubernetes client")
}

fn read_kubeconfig(config_path: Option<&Path>) -> Option<Kubeconfig> {
    match config_path {
        Some(path) => Kubeconfig::read_from(path).ok(),
        None => Kubeconfig::read().ok(),
    }
}

/// Current context name of a kubeconfig ($KUBECONFIG or ~/.kube/config when `None`).
pub fn current_context(config_path: Option<&Path>) -> String {
    read_kubeconfig(config_path)
        .and_then(|cfg| cfg.current_context)
        .unwrap_or_else(|| "unknown".to_string())
}

/// All context names of a kubeconfig, sorted alphabetically.
pub fn list_contexts(config_path: Option<&Path>) -> Vec<String> {
    let mut ctxs: Vec<String> = read_kubeconfig(config_path)
        .map(|cfg| cfg.contexts.into_iter().map(|c| c.name).collect())
        .unwrap_or_default();
    ctxs.sort();
    ctxs
}

// ─── Kubeconfig keys ──────────────────────────────────────────────────────────

/// Kubeconfig keys listed in `KUBECONFIGS`.
pub fn kubeconfig_keys_from_env() -> Result<Vec<String>> {
    let env = EnvConfig::init_from_env().context("Failed to read environment")?;
    Ok(env.kubeconfig_keys())
}

/// Split the key list into (source, destination).
pub fn source_and_destination(keys: &[String]) -> Result<(&str, &str)> {
    match keys {
        [src, dst, ..] => Ok((src.as_str(), dst.as_str())),
        _ => bail!(
            "KUBECONFIGS must name a source and a destination kubeconfig, got {}",
            keys.len()
        ),
    }
}

/// Resolve a kubeconfig key to a file path.
///
/// Uses `<dir>/<key>` when it already exists; otherwise copies the key's
/// entry out of the kubeconfig ConfigMap into that file first.
pub async fn cluster_config_path(key: &str, settings: &KubeconfigSettings) -> Result<PathBuf> {
    let path = settings.dir.join(key);
    if path.exists() {
        return Ok(path);
    }

    let client = Client::try_default()
        .await
        .context("Failed to build Kubernetes client")?;
    let configmaps: Api<ConfigMap> = Api::namespaced(client, &settings.namespace);
    let cm = configmaps.get(&settings.configmap).await.with_context(|| {
        format!(
            "Failed to get ConfigMap {}/{}",
            settings.namespace, settings.configmap
        )
    })?;
    let data = cm
        .data
        .and_then(|mut data| data.remove(key))
        .ok_or_else(|| {
            anyhow!(
                "key '{key}' not found in ConfigMap {}/{}",
                settings.namespace,
                settings.configmap
            )
        })?;
    write_private(&path, &data)?;
    info!(key, path = %path.display(), "wrote kubeconfig from ConfigMap");
    Ok(path)
}

pub async fn source_cluster_config_path(
    keys: &[String],
    settings: &KubeconfigSettings,
) -> Result<PathBuf> {
    let (src, _) = source_and_destination(keys)?;
    cluster_config_path(src, settings).await
}

pub async fn destination_cluster_config_path(
    keys: &[String],
    settings: &KubeconfigSettings,
) -> Result<PathBuf> {
    let (_, dst) = source_and_destination(keys)?;
    cluster_config_path(dst, settings).await
}

/// Write `contents` to `path` readable by the owner only. The file is
/// created with mode 0600 and an existing file is narrowed to it.
pub fn write_private(path: &Path, contents: &str) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to create kubeconfig {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict kubeconfig {}", path.display()))?;
    }
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write kubeconfig {}", path.display()))
}
