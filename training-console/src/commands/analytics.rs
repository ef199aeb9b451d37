use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::CommandContext;
use crate::{
    api::{client::DownloadKind, ArtifactSource},
    error::{ConsoleError, Result},
    notify::Notification,
    view::reports::render_comparison,
};
use classifier_common::{utils::format_file_size, ReportReply};

pub async fn run_compare(ctx: &CommandContext) -> Result<()> {
    let reply = ctx.client.model_comparison().await?;
    println!("{}", render_comparison(&reply));
    Ok(())
}

pub async fn run_metrics(ctx: &CommandContext, model: &str) -> Result<()> {
    let metrics = ctx.client.model_metrics(model).await?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}

/// Message to show for a report reply, or the failure it carries.
pub fn report_outcome(reply: &ReportReply) -> Result<String> {
    match (reply.success, reply.message.is_empty()) {
        (true, true) => Ok("Report generated successfully".to_string()),
        (true, false) => Ok(reply.message.clone()),
        (false, true) => Err(ConsoleError::Report("no details from backend".to_string())),
        (false, false) => Err(ConsoleError::Report(reply.message.clone())),
    }
}

pub async fn run_report(ctx: &CommandContext) -> Result<()> {
    let reply = ctx.client.generate_report().await?;

    match report_outcome(&reply) {
        Ok(message) => ctx.notifier.notify(Notification::success(message)),
        Err(e) => {
            ctx.notifier.notify(Notification::failure(e.to_string()));
            return Err(e);
        }
    }

    if let Some(url) = reply.report_url {
        println!("Report: {}{}", ctx.client.base_url(), url);
    }
    Ok(())
}

/// Writes a downloaded artifact into `dir`, creating it if needed.
pub async fn save_artifact(dir: &Path, file_name: &str, data: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    fs::write(&path, data).await?;
    debug!("Wrote {} ({})", path.display(), format_file_size(data.len() as u64));
    Ok(path)
}

fn output_dir(ctx: &CommandContext, out: Option<&Path>) -> PathBuf {
    out.map(Path::to_path_buf)
        .unwrap_or_else(|| ctx.config.downloads.output_dir.clone())
}

pub async fn run_download(
    ctx: &CommandContext,
    kind: DownloadKind,
    name: &str,
    out: Option<&Path>,
) -> Result<()> {
    let data = match ctx.client.download(kind, name).await {
        Ok(data) => data,
        Err(e) => {
            ctx.notifier
                .notify(Notification::failure(format!("Error downloading {}: {}", name, e)));
            return Err(e);
        }
    };

    let path = save_artifact(&output_dir(ctx, out), &kind.file_name(name), &data).await?;
    ctx.notifier.notify(Notification::success(format!(
        "Saved {} ({})",
        path.display(),
        format_file_size(data.len() as u64)
    )));
    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BulkDownload {
    pub saved: Vec<PathBuf>,
    /// Not produced by the backend yet.
    pub missing: Vec<String>,
    pub failed: Vec<String>,
}

/// Probes every bulk name of `kind` and saves the artifacts that exist.
/// Each name is handled on its own; one failure never stops the rest.
pub async fn download_artifacts(
    source: &dyn ArtifactSource,
    kind: DownloadKind,
    dir: &Path,
) -> BulkDownload {
    let mut result = BulkDownload::default();

    for name in kind.bulk_names() {
        match source.probe_artifact(kind, &name).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(name = %name, "Nothing to download");
                result.missing.push(name);
                continue;
            }
            Err(e) => {
                warn!(name = %name, "Probe failed: {}", e);
                result.failed.push(name);
                continue;
            }
        }

        let data = match source.fetch_artifact(kind, &name).await {
            Ok(data) => data,
            Err(e) => {
                warn!(name = %name, "Download failed: {}", e);
                result.failed.push(name);
                continue;
            }
        };

        match save_artifact(dir, &kind.file_name(&name), &data).await {
            Ok(path) => result.saved.push(path),
            Err(e) => {
                warn!(name = %name, "Could not save artifact: {}", e);
                result.failed.push(name);
            }
        }
    }

    result
}

/// Downloads every artifact of `kind` the backend has. Returns how many
/// files were written.
pub async fn run_download_all(
    ctx: &CommandContext,
    kind: DownloadKind,
    out: Option<&Path>,
) -> Result<usize> {
    let dir = output_dir(ctx, out);
    let result = download_artifacts(ctx.client.as_ref(), kind, &dir).await;

    info!(
        saved = result.saved.len(),
        missing = result.missing.len(),
        failed = result.failed.len(),
        dir = %dir.display(),
        "Bulk download finished"
    );

    if !result.failed.is_empty() {
        ctx.notifier.notify(Notification::warning(format!(
            "Could not download: {}",
            result.failed.join(", ")
        )));
    }
    if result.saved.is_empty() {
        ctx.notifier
            .notify(Notification::warning("No artifacts available to download"));
    } else {
        ctx.notifier.notify(Notification::success(format!(
            "Downloaded {} files to {}",
            result.saved.len(),
            dir.display()
        )));
    }
    Ok(result.saved.len())
}
