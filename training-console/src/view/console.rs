use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::{CardDetail, ModelCard, ProgressSnapshot, ProgressView};
use classifier_common::ModelState;

const BAR_WIDTH: usize = 30;

/// Writes progress blocks to stdout while the surface is open.
#[derive(Debug, Default)]
pub struct ConsoleView {
    open: AtomicBool,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl ProgressView for ConsoleView {
    fn open(&self) {
        if !self.open.swap(true, Ordering::SeqCst) {
            println!("== Training progress ==");
        }
    }

    // Out-of-session refreshes still print; only the banner tracks the surface.
    fn render(&self, snapshot: &ProgressSnapshot) {
        debug!(models = snapshot.cards.len(), "Rendering training snapshot");
        println!("{}", render_progress(snapshot));
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            println!("== Training progress closed ==");
        }
    }
}

pub fn status_glyph(state: ModelState) -> &'static str {
    match state {
        ModelState::Pending => "…",
        ModelState::Training => "⚙",
        ModelState::Completed => "✔",
        ModelState::Error => "✖",
        ModelState::Unknown => "?",
    }
}

pub fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn render_card(out: &mut String, card: &ModelCard) {
    let _ = writeln!(
        out,
        "{} {:<14} {}",
        status_glyph(card.state),
        card.model.to_uppercase(),
        card.state
    );

    let _ = match &card.detail {
        CardDetail::Training {
            epochs,
            total_epochs,
            accuracy,
            ..
        } => writeln!(
            out,
            "  {} Epoch: {}/{}  Accuracy: {}",
            progress_bar(card.bar_fraction(), BAR_WIDTH),
            epochs,
            total_epochs,
            accuracy
        ),
        CardDetail::Completed { accuracy } => writeln!(
            out,
            "  {} Final Accuracy: {}",
            progress_bar(1.0, BAR_WIDTH),
            accuracy
        ),
        CardDetail::Failed { message } => writeln!(out, "  Error: {}", message),
        CardDetail::Waiting => writeln!(out, "  Waiting to start..."),
    };
}

pub fn render_progress(snapshot: &ProgressSnapshot) -> String {
    if snapshot.is_placeholder() {
        return "Training progress will appear here once started".to_string();
    }

    let mut out = String::new();
    for card in &snapshot.cards {
        render_card(&mut out, card);
    }

    if let Some(model) = &snapshot.current_model {
        let _ = writeln!(out, "Currently training: {}", model.to_uppercase());
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use classifier_common::TrainingStatus;

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 4), "[----]");
        assert_eq!(progress_bar(0.5, 4), "[##--]");
        assert_eq!(progress_bar(3.0, 4), "[####]");
    }

    #[test]
    fn test_render_training_snapshot() {
        let status: TrainingStatus = serde_json::from_str(
            r#"{
                "is_training": true,
                "current_model": "mobilenet",
                "progress": {
                    "mobilenet": {"status": "training", "epochs": 7, "accuracy": 62.3},
                    "resnet": {"status": "pending", "epochs": 0, "accuracy": 0}
                }
            }"#,
        )
        .unwrap();

        let text = render_progress(&ProgressSnapshot::from_status(&status));

        assert!(text.contains("MOBILENET"));
        assert!(text.contains("Epoch: 7/15  Accuracy: 62.3%"));
        assert!(text.contains("Waiting to start..."));
        assert!(text.ends_with("Currently training: MOBILENET"));
    }

    #[test]
    fn test_render_placeholder() {
        let text = render_progress(&ProgressSnapshot::from_status(&TrainingStatus::default()));
        assert_eq!(text, "Training progress will appear here once started");
    }

    #[test]
    fn test_open_close_tracks_surface() {
        let view = ConsoleView::new();
        assert!(!view.is_open());

        view.open();
        assert!(view.is_open());

        view.close();
        assert!(!view.is_open());
    }
}
