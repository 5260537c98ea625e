//! Shell templates for bringing an algorithm container up and down.
//!
//! Reproduces the operational shape of
//! `original_source/agents/execution_agent.py`'s
//! `setup_algorithm_container`/`release_algorithm_container`: remove
//! any stale container of the same name first, then start a fresh one
//! with the GPU/privileged/timezone flags the original always passed.

/// Builds the `docker run` invocation used to provision `sandbox_name`
/// from `image`, optionally bind-mounting `dataset_location` at
/// `/data`.
pub fn provisioning_script(sandbox_name: &str, image: &str, dataset_location: Option<&str>) -> String {
    let dataset_mount = dataset_location
        .map(|path| format!(" -v {path}:/data"))
        .unwrap_or_default();

    format!(
        "docker rm -f {sandbox_name} >/dev/null 2>&1; \
         docker run -d --name {sandbox_name} --gpus all --privileged \
         -v /etc/localtime:/etc/localtime:ro -e LANG=C.UTF-8{dataset_mount} {image} sleep infinity"
    )
}

/// Verifies the container actually reached the running state.
pub fn verification_script(sandbox_name: &str) -> String {
    format!("docker inspect -f '{{{{.State.Running}}}}' {sandbox_name}")
}

/// Tears a provisioned container down. Idempotent: `docker rm -f`
/// succeeds (as a no-op) even when the container is already gone.
pub fn release_script(sandbox_name: &str) -> String {
    format!("docker rm -f {sandbox_name} >/dev/null 2>&1; true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisioning_script_includes_gpu_and_timezone_flags() {
        let script = provisioning_script("sbx-1", "algo:latest", None);
        assert!(script.contains("--gpus all --privileged"));
        assert!(script.contains("/etc/localtime:/etc/localtime:ro"));
        assert!(script.contains("algo:latest sleep infinity"));
        assert!(!script.contains("-v "));
    }

    #[test]
    fn provisioning_script_mounts_dataset_when_given() {
        let script = provisioning_script("sbx-1", "algo:latest", Some("/datasets/a"));
        assert!(script.contains("-v /datasets/a:/data"));
    }

    #[test]
    fn release_script_is_idempotent_shaped() {
        let script = release_script("sbx-1");
        assert!(script.contains("docker rm -f sbx-1"));
        assert!(script.trim_end().ends_with("true"));
    }
}
