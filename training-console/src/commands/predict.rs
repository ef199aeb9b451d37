use std::path::Path;
use tracing::info;

use super::CommandContext;
use crate::{
    error::Result,
    notify::Notification,
    view::reports::{available_count, render_catalogue, render_prediction},
};

pub async fn run_models(ctx: &CommandContext) -> Result<()> {
    let catalogue = ctx.client.available_models().await?;
    println!("{}", render_catalogue(&catalogue));

    if available_count(&catalogue) == 0 {
        ctx.notifier.notify(Notification::info(
            "No trained models available. Train models first to enable prediction.",
        ));
    }
    Ok(())
}

pub async fn run_predict(ctx: &CommandContext, image: &Path) -> Result<()> {
    let reply = match ctx.client.predict(image).await {
        Ok(reply) => reply,
        Err(e) => {
            ctx.notifier
                .notify(Notification::failure(format!("Error making prediction: {}", e)));
            return Err(e);
        }
    };

    info!(
        models = reply.individual_results.len(),
        ensemble = reply.ensemble_result.is_some(),
        "Prediction received"
    );
    println!("{}", render_prediction(&reply));
    Ok(())
}
