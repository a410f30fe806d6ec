//! GitOps Renderer: strategic-merge YAML, JSON-6902 patches, and Helm
//! values rendering of accepted recommendations, plus on-disk emission.

pub mod quantity;

use std::path::{Path, PathBuf};

use jsonptr::PointerBuf;
use json_patch::{Patch, PatchOperation, ReplaceOperation};
use serde_json::{json, Value};
use thiserror::Error;

use crate::types::GitOpsFormat;
use quantity::{format_cpu, format_memory};

#[derive(Debug, Clone)]
pub struct AcceptedRecommendation {
    pub namespace: String,
    pub kind: String,
    pub name: String,
    pub container: String,
    pub container_index: usize,
    pub cpu_millicores: f64,
    pub mem_bytes: f64,
    pub limit_cpu_millicores: Option<f64>,
    pub limit_mem_bytes: Option<f64>,
    pub confidence: f64,
    pub rationale: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum GitOpsError {
    #[error("empty namespace")]
    EmptyNamespace,
    #[error("empty kind")]
    EmptyKind,
    #[error("empty name")]
    EmptyName,
    #[error("empty container")]
    EmptyContainer,
    #[error("non-positive cpu request: {0}")]
    NonPositiveCpu(f64),
    #[error("non-positive memory request: {0}")]
    NonPositiveMemory(f64),
}

pub fn validate(rec: &AcceptedRecommendation) -> Result<(), GitOpsError> {
    if rec.namespace.is_empty() {
        return Err(GitOpsError::EmptyNamespace);
    }
    if rec.kind.is_empty() {
        return Err(GitOpsError::EmptyKind);
    }
    if rec.name.is_empty() {
        return Err(GitOpsError::EmptyName);
    }
    if rec.container.is_empty() {
        return Err(GitOpsError::EmptyContainer);
    }
    if rec.cpu_millicores <= 0.0 {
        return Err(GitOpsError::NonPositiveCpu(rec.cpu_millicores));
    }
    if rec.mem_bytes <= 0.0 {
        return Err(GitOpsError::NonPositiveMemory(rec.mem_bytes));
    }
    Ok(())
}

/// Render one strategic-merge patch document for a workload.
pub fn render_strategic_merge(rec: &AcceptedRecommendation) -> Value {
    let mut resources = json!({
        "requests": {
            "cpu": format_cpu(rec.cpu_millicores),
            "memory": format_memory(rec.mem_bytes),
        }
    });
    if let (Some(cpu_limit), Some(mem_limit)) = (rec.limit_cpu_millicores, rec.limit_mem_bytes) {
        resources["limits"] = json!({
            "cpu": format_cpu(cpu_limit),
            "memory": format_memory(mem_limit),
        });
    }

    json!({
        "apiVersion": api_version_for(&rec.kind),
        "kind": rec.kind,
        "metadata": {
            "name": rec.name,
            "namespace": rec.namespace,
        },
        "spec": {
            "template": {
                "spec": {
                    "containers": [{
                        "name": rec.container,
                        "resources": resources,
                    }]
                }
            }
        }
    })
}

fn api_version_for(kind: &str) -> &'static str {
    match kind {
        "Deployment" | "StatefulSet" | "DaemonSet" => "apps/v1",
        _ => "v1",
    }
}

/// Render the JSON-6902 replace operations for one workload's container.
pub fn render_json_patch(rec: &AcceptedRecommendation) -> Patch {
    let base = format!("/spec/template/spec/containers/{}/resources", rec.container_index);
    let mut ops = vec![
        replace_op(&format!("{base}/requests/cpu"), json!(format_cpu(rec.cpu_millicores))),
        replace_op(&format!("{base}/requests/memory"), json!(format_memory(rec.mem_bytes))),
    ];
    if let (Some(cpu_limit), Some(mem_limit)) = (rec.limit_cpu_millicores, rec.limit_mem_bytes) {
        ops.push(replace_op(&format!("{base}/limits/cpu"), json!(format_cpu(cpu_limit))));
        ops.push(replace_op(&format!("{base}/limits/memory"), json!(format_memory(mem_limit))));
    }
    Patch(ops)
}

fn replace_op(pointer: &str, value: Value) -> PatchOperation {
    PatchOperation::Replace(ReplaceOperation {
        path: PointerBuf::parse(pointer).expect("pointer is built from known-valid segments"),
        value,
    })
}

/// Render a Helm `values.yaml`-shaped hierarchical map for one workload,
/// merging into `existing` if one was already built for a prior
/// container of the same workload.
pub fn render_helm_values(rec: &AcceptedRecommendation, existing: Option<Value>) -> Value {
    let mut root = existing.unwrap_or_else(|| json!({}));
    let workload_key = format!("{}-{}", rec.namespace, rec.name);

    let mut resources = json!({
        "requests": {
            "cpu": format_cpu(rec.cpu_millicores),
            "memory": format_memory(rec.mem_bytes),
        }
    });
    if let (Some(cpu_limit), Some(mem_limit)) = (rec.limit_cpu_millicores, rec.limit_mem_bytes) {
        resources["limits"] = json!({
            "cpu": format_cpu(cpu_limit),
            "memory": format_memory(mem_limit),
        });
    }

    root[&workload_key] = json!({
        "resources": resources,
        "confidence": rec.confidence,
        "rationale": rec.rationale,
    });
    root
}

/// Stable patch filename: `patch-<ns>-<workload>-<index>.yaml|.json`.
pub fn patch_filename(rec: &AcceptedRecommendation, index: usize, format: GitOpsFormat) -> String {
    let ext = match format {
        GitOpsFormat::JsonPatch => "json",
        GitOpsFormat::StrategicMerge | GitOpsFormat::HelmValues => "yaml",
    };
    format!("patch-{}-{}-{}.{}", rec.namespace, rec.name, index, ext)
}

/// Build the `kustomization.yaml` document listing the given patch files.
pub fn render_kustomization(patch_files: &[String]) -> Value {
    json!({
        "apiVersion": "kustomize.config.k8s.io/v1beta1",
        "kind": "Kustomization",
        "patchesStrategicMerge": patch_files,
    })
}

/// Write one strategic-merge patch per recommendation plus a
/// `kustomization.yaml`, creating `output_dir` if absent.
pub fn write_strategic_merge_bundle(output_dir: &Path, recs: &[AcceptedRecommendation]) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();
    let mut patch_filenames = Vec::new();

    for (index, rec) in recs.iter().enumerate() {
        let doc = render_strategic_merge(rec);
        let filename = patch_filename(rec, index, GitOpsFormat::StrategicMerge);
        let path = output_dir.join(&filename);
        let yaml = serde_yaml::to_string(&doc).unwrap_or_default();
        std::fs::write(&path, yaml)?;
        written.push(path);
        patch_filenames.push(filename);
    }

    let kustomization = render_kustomization(&patch_filenames);
    let kustomization_path = output_dir.join("kustomization.yaml");
    std::fs::write(&kustomization_path, serde_yaml::to_string(&kustomization).unwrap_or_default())?;
    written.push(kustomization_path);

    Ok(written)
}

/// Write one JSON-6902 patch document per recommendation, creating
/// `output_dir` if absent. There is no `kustomization.yaml` for this
/// format — each file is a standalone patch applied however the GitOps
/// consumer layers JSON patches (`kubectl patch`, Flux's `patchesJson6902`).
pub fn write_json_patch_bundle(output_dir: &Path, recs: &[AcceptedRecommendation]) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    for (index, rec) in recs.iter().enumerate() {
        let patch = render_json_patch(rec);
        let filename = patch_filename(rec, index, GitOpsFormat::JsonPatch);
        let path = output_dir.join(&filename);
        let json = serde_json::to_string_pretty(&patch).unwrap_or_default();
        std::fs::write(&path, json)?;
        written.push(path);
    }

    Ok(written)
}

/// Write one merged `values.yaml` per workload (namespace/name pair),
/// folding every container recommendation for that workload into the
/// same document via [`render_helm_values`].
pub fn write_helm_values_bundle(output_dir: &Path, recs: &[AcceptedRecommendation]) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut by_workload: Vec<(String, Value)> = Vec::new();

    for rec in recs {
        let key = format!("{}-{}", rec.namespace, rec.name);
        let existing = by_workload.iter().position(|(k, _)| k == &key).map(|i| by_workload.remove(i).1);
        let merged = render_helm_values(rec, existing);
        by_workload.push((key, merged));
    }

    let mut written = Vec::new();
    for (key, doc) in by_workload {
        let path = output_dir.join(format!("values-{key}.yaml"));
        std::fs::write(&path, serde_yaml::to_string(&doc).unwrap_or_default())?;
        written.push(path);
    }
    Ok(written)
}

/// Dispatch to the bundle writer matching `format` (§4.14).
pub fn write_bundle(format: GitOpsFormat, output_dir: &Path, recs: &[AcceptedRecommendation]) -> std::io::Result<Vec<PathBuf>> {
    match format {
        GitOpsFormat::StrategicMerge => write_strategic_merge_bundle(output_dir, recs),
        GitOpsFormat::JsonPatch => write_json_patch_bundle(output_dir, recs),
        GitOpsFormat::HelmValues => write_helm_values_bundle(output_dir, recs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> AcceptedRecommendation {
        AcceptedRecommendation {
            namespace: "production".to_string(),
            kind: "Deployment".to_string(),
            name: "api".to_string(),
            container: "api".to_string(),
            container_index: 0,
            cpu_millicores: 500.0,
            mem_bytes: 512.0 * 1_048_576.0,
            limit_cpu_millicores: None,
            limit_mem_bytes: None,
            confidence: 85.0,
            rationale: "p95 usage with 1.1x safety margin".to_string(),
        }
    }

    #[test]
    fn validate_rejects_non_positive_cpu() {
        let mut rec = sample();
        rec.cpu_millicores = 0.0;
        assert_eq!(validate(&rec), Err(GitOpsError::NonPositiveCpu(0.0)));
    }

    #[test]
    fn validate_rejects_empty_fields() {
        let mut rec = sample();
        rec.namespace = String::new();
        assert_eq!(validate(&rec), Err(GitOpsError::EmptyNamespace));
    }

    #[test]
    fn strategic_merge_shape_matches_expected_fields() {
        let rec = sample();
        let doc = render_strategic_merge(&rec);
        assert_eq!(doc["apiVersion"], "apps/v1");
        assert_eq!(doc["kind"], "Deployment");
        assert_eq!(doc["metadata"]["name"], "api");
        assert_eq!(
            doc["spec"]["template"]["spec"]["containers"][0]["resources"]["requests"]["cpu"],
            "500m"
        );
        assert_eq!(
            doc["spec"]["template"]["spec"]["containers"][0]["resources"]["requests"]["memory"],
            "512Mi"
        );
    }

    #[test]
    fn json_patch_targets_correct_container_index() {
        let mut rec = sample();
        rec.container_index = 2;
        let patch = render_json_patch(&rec);
        assert_eq!(patch.0.len(), 2);
    }

    #[test]
    fn s7_kustomize_export_writes_patch_and_kustomization() {
        let dir = tempdir().unwrap();
        let rec = sample();
        let written = write_strategic_merge_bundle(dir.path(), &[rec]).unwrap();
        assert!(written.iter().any(|p| p.ends_with("kustomization.yaml")));

        let kustomization_contents = std::fs::read_to_string(dir.path().join("kustomization.yaml")).unwrap();
        assert!(kustomization_contents.contains("patch-production-api-0.yaml"));

        let patch_contents = std::fs::read_to_string(dir.path().join("patch-production-api-0.yaml")).unwrap();
        assert!(patch_contents.contains("apps/v1"));
        assert!(patch_contents.contains("Deployment"));
        assert!(patch_contents.contains("api"));
        assert!(patch_contents.contains("500m"));
        assert!(patch_contents.contains("512Mi"));
    }

    #[test]
    fn json_patch_bundle_writes_one_file_per_recommendation_with_no_kustomization() {
        let dir = tempdir().unwrap();
        let rec = sample();
        let written = write_json_patch_bundle(dir.path(), &[rec]).unwrap();
        assert_eq!(written.len(), 1);
        assert!(!written.iter().any(|p| p.ends_with("kustomization.yaml")));

        let contents = std::fs::read_to_string(dir.path().join("patch-production-api-0.json")).unwrap();
        assert!(contents.contains("/spec/template/spec/containers/0/resources/requests/cpu"));
        assert!(contents.contains("500m"));
    }

    #[test]
    fn helm_values_bundle_merges_containers_of_the_same_workload() {
        let dir = tempdir().unwrap();
        let mut second = sample();
        second.container = "sidecar".to_string();
        second.container_index = 1;
        let written = write_helm_values_bundle(dir.path(), &[sample(), second]).unwrap();
        assert_eq!(written.len(), 1, "both containers belong to the same workload");

        let contents = std::fs::read_to_string(&written[0]).unwrap();
        assert!(contents.contains("production-api"));
    }

    #[test]
    fn write_bundle_dispatches_on_format() {
        let dir = tempdir().unwrap();
        let rec = sample();
        let written = write_bundle(GitOpsFormat::JsonPatch, dir.path(), &[rec]).unwrap();
        assert!(written[0].extension().is_some_and(|ext| ext == "json"));
    }
}
