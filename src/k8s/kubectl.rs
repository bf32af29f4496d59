//! kubectl invocations used for diagnostics: pod logs and exec.

use std::path::Path;
use std::process::{Command, Output};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::metadata::IN_CLUSTER_CONFIG_PATH;

// ─── kubectl command builder ──────────────────────────────────────────────────

/// Build a `kubectl` command pre-loaded with `--kubeconfig <path>` unless
/// `kubeconfig` is the in-cluster sentinel.
pub fn kubectl(kubeconfig: &str) -> Command {
    let mut cmd = Command::new("kubectl");
    if kubeconfig != IN_CLUSTER_CONFIG_PATH {
        cmd.args(["--kubeconfig", kubeconfig]);
    }
    cmd
}

fn run(mut cmd: Command, what: &str) -> Result<Output> {
    let out = cmd
        .output()
        .with_context(|| format!("Failed to run kubectl {what}"))?;
    if !out.status.success() {
        bail!(
            "kubectl {what} exited with {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    Ok(out)
}

// ─── Logs ─────────────────────────────────────────────────────────────────────

/// Write the logs of `namespace/pod` to `out`.
pub fn collect_pod_logs(kubeconfig: &str, namespace: &str, pod: &str, out: &Path) -> Result<()> {
    let mut cmd = kubectl(kubeconfig);
    cmd.args(["logs", "-n", namespace, "--", pod]);
    let output = run(cmd, "logs")?;
    std::fs::write(out, &output.stdout)
        .with_context(|| format!("Failed to write logs to {}", out.display()))?;
    info!(%namespace, %pod, file = %out.display(), "collected pod logs");
    Ok(())
}

// ─── Exec ─────────────────────────────────────────────────────────────────────

/// Run `command` inside `namespace/pod` and return its stdout.
pub fn exec_in_pod(kubeconfig: &str, namespace: &str, pod: &str, command: &[&str]) -> Result<String> {
    let mut cmd = kubectl(kubeconfig);
    cmd.args(["exec", "-n", namespace, pod, "--"]).args(command);
    let output = run(cmd, "exec")?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
