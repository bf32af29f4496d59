//! Kubernetes access: clients per kubeconfig, pod probes and faults, kubectl helpers.

pub mod client;
pub mod kubectl;
pub mod pods;
