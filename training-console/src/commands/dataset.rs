use std::path::PathBuf;
use tracing::{info, warn};

use super::CommandContext;
use crate::{error::Result, notify::Notification, view::reports::render_dataset};
use classifier_common::{CreateFoldersRequest, UploadResponse};

pub async fn run_dataset(ctx: &CommandContext) -> Result<()> {
    let info = ctx.client.dataset_info().await?;
    println!("{}", render_dataset(&info));
    Ok(())
}

/// Trims names and drops empty ones.
pub fn folder_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn run_create_folders(ctx: &CommandContext, names: &[String]) -> Result<()> {
    let request = CreateFoldersRequest {
        folders: folder_names(names),
    };

    match ctx.client.create_folders(&request).await {
        Ok(reply) => {
            info!(folders = ?reply.folders, "Class folders created");
            ctx.notifier.notify(Notification::success(reply.message));
            Ok(())
        }
        Err(e) => {
            ctx.notifier
                .notify(Notification::failure(format!("Error creating folders: {}", e)));
            Err(e)
        }
    }
}

pub fn upload_summary(reply: &UploadResponse) -> Vec<Notification> {
    let mut notes = vec![Notification::success(reply.message.clone())];
    notes.extend(
        reply
            .warnings
            .iter()
            .map(|warning| Notification::warning(warning.clone())),
    );
    notes
}

pub async fn run_upload(ctx: &CommandContext, folder: &str, files: &[PathBuf]) -> Result<()> {
    match ctx.client.upload_images(folder, files).await {
        Ok(reply) => {
            info!(folder, uploaded = reply.uploaded_count, "Images uploaded");
            if !reply.warnings.is_empty() {
                warn!("Upload finished with {} warnings", reply.warnings.len());
            }
            for note in upload_summary(&reply) {
                ctx.notifier.notify(note);
            }
            Ok(())
        }
        Err(e) => {
            ctx.notifier
                .notify(Notification::failure(format!("Error uploading images: {}", e)));
            Err(e)
        }
    }
}
