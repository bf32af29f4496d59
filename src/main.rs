use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use torpedo::cli::{Args, ChaosArgs, Command, WorkloadArgs};
use torpedo::config::Settings;
use torpedo::k8s::client::{
    build_client, cluster_config_path, kubeconfig_keys_from_env, list_contexts,
    source_and_destination,
};
use torpedo::k8s::kubectl::collect_pod_logs;
use torpedo::k8s::pods::{kill_pods_failure, RunningPods, StatefulSetReplicas};
use torpedo::logging;
use torpedo::resiliency::{wait_for_replicas, ReplicaProbe, ResiliencyContext};
use torpedo::workload::sql::{generate_random_sql_commands, Engine};
use torpedo::workload::{ApplicationDriver, MySqlDriver, PostgresDriver};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "torpedo", &mut std::io::stdout());
        return Ok(());
    }
    if args.mangen {
        clap_mangen::Man::new(Args::command()).render(&mut std::io::stdout())?;
        return Ok(());
    }
    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    logging::init();
    let settings = Settings::load(args.config.as_deref())?;

    match command {
        Command::Contexts { kubeconfig } => {
            for ctx in list_contexts(kubeconfig.as_deref()) {
                println!("{ctx}");
            }
        }
        Command::Sql { engine, count } => {
            let commands = generate_random_sql_commands(count, engine);
            println!("{}", serde_json::to_string_pretty(&commands)?);
        }
        Command::Workload(workload) => run_workload(&workload, &settings).await?,
        Command::Logs {
            namespace,
            pod,
            out,
            kubeconfig,
        } => collect_pod_logs(&kubeconfig, &namespace, &pod, &out)?,
        Command::Kubeconfig { key } => resolve_kubeconfigs(key, &settings).await?,
        Command::Chaos(chaos) => run_chaos(&chaos, &settings).await?,
    }
    Ok(())
}

/// Inject rows until the end of the command plan, then verify them.
async fn run_workload(args: &WorkloadArgs, settings: &Settings) -> Result<()> {
    let params = args.connection_params();
    let tick = settings.workload_tick();
    let driver: Box<dyn ApplicationDriver> = match args.engine {
        Engine::Postgres => Box::new(PostgresDriver::new(params).with_tick_interval(tick)),
        Engine::MySql => Box::new(MySqlDriver::new(params).with_tick_interval(tick)),
    };

    let (tx, rx) = mpsc::channel(4);
    let plan = args.command_plan();
    let sender = tokio::spawn(async move {
        let start = Instant::now();
        for (offset, cmd) in plan {
            tokio::time::sleep_until(start + offset).await;
            info!(%cmd, "sending data command");
            if tx.send(cmd).await.is_err() {
                break;
            }
        }
    });

    let result = driver.start_data(rx).await;
    sender.abort();
    result.with_context(|| format!("{} workload on {} failed", args.engine, args.host))?;
    println!("all injected rows present on {}", args.host);
    Ok(())
}

async fn resolve_kubeconfigs(key: Option<String>, settings: &Settings) -> Result<()> {
    let keys = match key {
        Some(key) => vec![key],
        None => {
            let keys = kubeconfig_keys_from_env()?;
            source_and_destination(&keys)?;
            keys
        }
    };
    for key in &keys {
        let path = cluster_config_path(key, &settings.kubeconfig).await?;
        println!("{key}\t{}", path.display());
    }
    Ok(())
}

/// Kill pods once the requested replicas are ready.
async fn run_chaos(args: &ChaosArgs, settings: &Settings) -> Result<()> {
    let client = build_client(&args.kubeconfig).await?;
    let probe: Arc<dyn ReplicaProbe> = match &args.statefulset {
        Some(name) => Arc::new(StatefulSetReplicas::new(
            client.clone(),
            &args.namespace,
            name.clone(),
        )),
        None => Arc::new(RunningPods::new(
            client.clone(),
            &args.namespace,
            args.kill_prefix.clone(),
        )),
    };
    let failure = kill_pods_failure(
        args.failure.clone(),
        client,
        args.kill_namespace.clone().unwrap_or_else(|| args.namespace.clone()),
        args.kill_prefix.clone(),
    );

    let target = args.replicas;
    let interval = settings.poll_interval();
    let timeout = settings.poll_timeout();
    let cancel = CancellationToken::new();
    ResiliencyContext::from_settings(settings)
        .induce_failure_after_waiting_for_condition(
            move |signal| async move {
                signal
                    .watch(wait_for_replicas(probe, target, interval, timeout, &cancel))
                    .await
            },
            failure,
        )
        .await?;
    println!("failure '{}' injected after {target} replicas were ready", args.failure);
    Ok(())
}
