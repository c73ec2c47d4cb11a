//! Local NFS Mounts
//!
//! Mounts and unmounts backend exports on the host running the driver by
//! shelling out to the platform's `mount` and `umount` tools.

use crate::domain::ports::MountExecutor;
use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Build the shell command mounting `export_path` at `mountpoint` on `os`
pub fn mount_command(os: &str, options: &str, export_path: &str, mountpoint: &str) -> Result<String> {
    match os {
        "linux" => Ok(format!("mount -v {} {} {}", options, export_path, mountpoint)),
        "macos" => Ok(format!(
            "mount -v -o rw {} -t nfs {} {}",
            options, export_path, mountpoint
        )),
        other => Err(Error::UnsupportedPlatform { os: other.to_string() }),
    }
}

/// Build the shell command unmounting `mountpoint`
pub fn unmount_command(mountpoint: &str) -> String {
    format!("umount {}", mountpoint)
}

/// Runs mount commands through `sh -c`
#[derive(Debug, Clone, Copy, Default)]
pub struct NfsMountExecutor;

impl NfsMountExecutor {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, command: &str, operation: &str, mountpoint: &str) -> Result<()> {
        let output = Command::new("sh")
            .args(["-c", command])
            .output()
            .await
            .map_err(|e| Error::LocalMount {
                operation: operation.into(),
                mountpoint: mountpoint.into(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            debug!(output = %combined.trim(), "{} failed.", operation);
            return Err(Error::LocalMount {
                operation: operation.into(),
                mountpoint: mountpoint.into(),
                reason: output.status.to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl MountExecutor for NfsMountExecutor {
    async fn mount(&self, export_path: &str, mountpoint: &str, options: &str) -> Result<()> {
        let command = mount_command(std::env::consts::OS, options, export_path, mountpoint)?;
        debug!(command = %command, "Mounting volume.");
        self.run(&command, "mounting", mountpoint).await
    }

    async fn unmount(&self, mountpoint: &str) -> Result<()> {
        let command = unmount_command(mountpoint);
        debug!(command = %command, "Unmounting volume.");
        self.run(&command, "unmounting", mountpoint).await
    }
}
