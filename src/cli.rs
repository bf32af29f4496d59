use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::resiliency::failure::{AGENT_POD, KILL_AGENT_POD_DURING_DEPLOYMENT};
use crate::workload::sql::Engine;
use crate::workload::{ConnectionParams, DataCommand};

#[derive(Parser, Debug)]
#[command(
    name = "torpedo",
    about = "End-to-end test automation for storage and backup platforms on Kubernetes",
    version
)]
pub struct Args {
    /// Config file. Defaults to ~/.config/torpedo/config.toml.
    #[arg(long, global = true, value_name = "PATH", env = "TORPEDO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print shell completions for SHELL to stdout and exit.
    /// Example: `torpedo --completions bash >> ~/.bash_completion`
    #[arg(long, value_name = "SHELL", hide = true)]
    pub completions: Option<Shell>,

    /// Print the man page to stdout and exit.
    #[arg(long, hide = true)]
    pub mangen: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the contexts of a kubeconfig.
    Contexts {
        /// Kubeconfig to read. Defaults to $KUBECONFIG or ~/.kube/config.
        #[arg(long, value_name = "PATH")]
        kubeconfig: Option<PathBuf>,
    },

    /// Print generated validation statements as JSON.
    Sql {
        #[arg(long, value_enum, default_value_t = Engine::Postgres)]
        engine: Engine,

        /// Rows to generate statements for.
        #[arg(long, default_value_t = 10)]
        count: usize,
    },

    /// Inject rows into a database, then verify they are all present.
    Workload(WorkloadArgs),

    /// Save the logs of a pod to a file.
    Logs {
        #[arg(short = 'n', long, value_name = "NAMESPACE")]
        namespace: String,

        #[arg(long, value_name = "NAME")]
        pod: String,

        #[arg(long, value_name = "FILE")]
        out: PathBuf,

        /// Kubeconfig to use. Omit for the in-cluster config.
        #[arg(long, value_name = "PATH", default_value = "")]
        kubeconfig: String,
    },

    /// Resolve kubeconfig keys to files, fetching them from the kubeconfig
    /// ConfigMap when needed. Without --key, resolves the source and
    /// destination named by $KUBECONFIGS.
    Kubeconfig {
        #[arg(long)]
        key: Option<String>,
    },

    /// Wait for a replica count, then kill pods.
    Chaos(ChaosArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct WorkloadArgs {
    #[arg(long, value_enum)]
    pub engine: Engine,

    #[arg(long)]
    pub host: String,

    #[arg(long)]
    pub user: String,

    #[arg(long, env = "TORPEDO_DB_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Defaults to 5432 (postgres) or 3306 (mysql).
    #[arg(long)]
    pub port: Option<u16>,

    /// Defaults to `postgres` or `mysql`.
    #[arg(long)]
    pub database: Option<String>,

    /// Seconds to inject data before stopping and verifying.
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub duration: u64,

    /// Pause injection after this many seconds (must be below --duration).
    #[arg(long, value_name = "SECS")]
    pub pause_after: Option<u64>,
}

impl WorkloadArgs {
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            hostname: self.host.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            port: self.port,
            db_name: self.database.clone(),
        }
    }

    /// Commands to send, each with its offset from the start of injection.
    pub fn command_plan(&self) -> Vec<(Duration, DataCommand)> {
        let stop = (Duration::from_secs(self.duration), DataCommand::Stop);
        match self.pause_after {
            Some(pause) if pause < self.duration => {
                vec![(Duration::from_secs(pause), DataCommand::Pause), stop]
            }
            _ => vec![stop],
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ChaosArgs {
    /// Kubeconfig to use. Omit for the in-cluster config.
    #[arg(long, value_name = "PATH", default_value = "")]
    pub kubeconfig: String,

    #[arg(short = 'n', long, value_name = "NAMESPACE")]
    pub namespace: String,

    /// StatefulSet to watch. Without it, running pods matching
    /// --kill-prefix are counted instead.
    #[arg(long, value_name = "NAME")]
    pub statefulset: Option<String>,

    /// Ready replicas to wait for before injecting the failure.
    #[arg(long)]
    pub replicas: i32,

    /// Pods whose name starts with this prefix are killed.
    #[arg(long, default_value = AGENT_POD)]
    pub kill_prefix: String,

    /// Namespace of the pods to kill. Defaults to --namespace.
    #[arg(long, value_name = "NAMESPACE")]
    pub kill_namespace: Option<String>,

    /// Name recorded for the failure in logs and errors.
    #[arg(long, default_value = KILL_AGENT_POD_DURING_DEPLOYMENT)]
    pub failure: String,
}
