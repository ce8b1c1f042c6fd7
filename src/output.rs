//! Artifact writing

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::RunReport;

/// Write the subscription artifact, replacing any previous one
pub async fn write_artifact(path: impl AsRef<Path>, artifact: &str) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::write(path, artifact.as_bytes()).await?;
    info!("Subscription written to {}", path.display());
    Ok(())
}

/// Write the run report as pretty JSON
pub async fn write_report(path: impl AsRef<Path>, report: &RunReport) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_vec_pretty(report)?;
    tokio::fs::write(path, json).await?;
    debug!("Run report written to {}", path.display());
    Ok(())
}

/// Append `node_count=<n>` to a CI step-output file
pub async fn append_step_output(path: impl AsRef<Path>, node_count: usize) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())
        .await?;
    file.write_all(format!("node_count={}\n", node_count).as_bytes())
        .await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeStrategy;

    fn scratch(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("subsift-{}-{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn test_write_artifact_overwrites() {
        let path = scratch("artifact.txt");
        write_artifact(&path, "first").await.unwrap();
        write_artifact(&path, "second").await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "second");
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_write_report() {
        let path = scratch("report.json");
        let mut report = RunReport::new(ProbeStrategy::Tls);
        report.emitted = 7;
        write_report(&path, &report).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(json["emitted"], 7);
        assert_eq!(json["probe_strategy"], "tls");
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_append_step_output() {
        let path = scratch("github-output");
        let _ = tokio::fs::remove_file(&path).await;
        append_step_output(&path, 3).await.unwrap();
        append_step_output(&path, 5).await.unwrap();
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "node_count=3\nnode_count=5\n"
        );
        let _ = tokio::fs::remove_file(&path).await;
    }
}
