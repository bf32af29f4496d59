//! Tests for torpedo::k8s::client and the kubeconfig context switcher.

use std::path::Path;

use torpedo::cluster::context::{ContextSwitcher, KubeconfigSwitcher};
use torpedo::config::KubeconfigSettings;
use torpedo::k8s::client::{
    cluster_config_path, current_context, list_contexts, source_and_destination, write_private,
};

const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: source
clusters:
- name: alpha
  cluster:
    server: https://alpha.example:6443
contexts:
- name: source
  context:
    cluster: alpha
    user: admin
- name: destination
  context:
    cluster: alpha
    user: admin
users:
- name: admin
  user:
    token: abc
"#;

fn write_kubeconfig(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

// ── current_context / list_contexts ───────────────────────────────────────────

#[test]
fn current_context_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_kubeconfig(dir.path(), "config", KUBECONFIG);
    assert_eq!(current_context(Some(&path)), "source");
}

#[test]
fn current_context_unknown_for_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(current_context(Some(&dir.path().join("absent"))), "unknown");
}

#[test]
fn list_contexts_is_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_kubeconfig(dir.path(), "config", KUBECONFIG);
    assert_eq!(list_contexts(Some(&path)), vec!["destination", "source"]);
}

#[test]
fn list_contexts_empty_for_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(list_contexts(Some(&dir.path().join("absent"))).is_empty());
}

// ── source / destination keys ─────────────────────────────────────────────────

#[test]
fn source_and_destination_take_first_two_keys() {
    let keys = vec!["src-config".to_string(), "dst-config".to_string(), "extra".to_string()];
    assert_eq!(
        source_and_destination(&keys).unwrap(),
        ("src-config", "dst-config")
    );
}

#[test]
fn source_and_destination_need_two_keys() {
    let err = source_and_destination(&["only".to_string()]).unwrap_err();
    assert!(err.to_string().contains("got 1"), "got: {err}");
}

#[tokio::test]
async fn cluster_config_path_uses_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let expected = write_kubeconfig(dir.path(), "src-config", KUBECONFIG);
    let settings = KubeconfigSettings {
        dir: dir.path().to_path_buf(),
        ..KubeconfigSettings::default()
    };
    let path = cluster_config_path("src-config", &settings).await.unwrap();
    assert_eq!(path, expected);
}

#[cfg(unix)]
#[test]
fn write_private_creates_owner_only_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dst-config");
    write_private(&path, KUBECONFIG).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(current_context(Some(&path)), "source");
}

#[cfg(unix)]
#[test]
fn write_private_narrows_existing_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = write_kubeconfig(dir.path(), "dst-config", "stale contents that are longer");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    write_private(&path, "fresh").unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh");
}

#[test]
fn write_private_reports_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let err = write_private(&dir.path().join("absent/config"), KUBECONFIG).unwrap_err();
    assert!(err.to_string().contains("Failed to create kubeconfig"), "got: {err}");
}

// ── KubeconfigSwitcher ────────────────────────────────────────────────────────

#[tokio::test]
async fn switcher_accepts_in_cluster_sentinel() {
    KubeconfigSwitcher.switch_to("").await.unwrap();
}

#[tokio::test]
async fn switcher_accepts_kubeconfig_with_current_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_kubeconfig(dir.path(), "config", KUBECONFIG);
    KubeconfigSwitcher
        .switch_to(path.to_str().unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn switcher_rejects_kubeconfig_without_current_context() {
    let dir = tempfile::tempdir().unwrap();
    let stripped = KUBECONFIG.replace("current-context: source\n", "");
    let path = write_kubeconfig(dir.path(), "config", &stripped);
    let err = KubeconfigSwitcher
        .switch_to(path.to_str().unwrap())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("has no current-context"), "got: {err}");
}

#[tokio::test]
async fn switcher_rejects_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent");
    assert!(KubeconfigSwitcher
        .switch_to(path.to_str().unwrap())
        .await
        .is_err());
}
