use crate::app::ports::{ContainerRuntime, ContainerSpec};
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs containers through the local `docker` CLI.
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    /// Arguments for `docker run` derived from `spec`
    pub fn run_args(spec: &ContainerSpec) -> Vec<String> {
        let mut args = vec!["run".to_string()];
        if spec.auto_remove {
            args.push("--rm".to_string());
        }
        for mount in &spec.mounts {
            let mut binding = format!("{}:{}", mount.volume, mount.target.display());
            if mount.read_only {
                binding.push_str(":ro");
            }
            args.push("-v".to_string());
            args.push(binding);
        }
        for (key, value) in &spec.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push(spec.image.clone());
        args.extend(spec.command.iter().cloned());
        args
    }

    async fn exec(&self, args: &[String]) -> Result<Vec<u8>> {
        debug!(program = %self.program, ?args, "Running container command");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| ScraperError::Container {
                message: format!("failed to start {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScraperError::Container {
                message: format!(
                    "{} {} exited with {}: {}",
                    self.program,
                    args.first().map(String::as_str).unwrap_or_default(),
                    output.status,
                    stderr.trim()
                ),
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn run(&self, spec: &ContainerSpec) -> Result<Vec<u8>> {
        if spec.force_pull {
            info!(image = %spec.image, "Pulling image");
            self.exec(&["pull".to_string(), spec.image.clone()]).await?;
        }
        self.exec(&Self::run_args(spec)).await
    }
}
