use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use classifier_common::{
    utils::format_training_time, ComparisonReply, ConfidenceBand, DatasetInfo, ModelCatalogue,
    ModelPrediction, PredictionReply, QuickStats, Reliability,
};

pub fn render_dataset(info: &DatasetInfo) -> String {
    if info.total_images == 0 {
        return "No training data found. Please create folders and upload images.".to_string();
    }

    let mut out = format!("{} classes, {} total images\n", info.num_classes, info.total_images);
    for (class, count, share) in info.class_shares() {
        let _ = writeln!(out, "  {:<20} {:>6} images  {:>5.1}%", class, count, share);
    }
    out.trim_end().to_string()
}

pub fn available_count(catalogue: &ModelCatalogue) -> usize {
    catalogue.values().filter(|info| info.is_available()).count()
}

pub fn render_catalogue(catalogue: &ModelCatalogue) -> String {
    let mut out = format!(
        "{}/{} models ready for prediction\n",
        available_count(catalogue),
        catalogue.len()
    );

    for (model, info) in catalogue {
        let name = if info.name.is_empty() { model.as_str() } else { info.name.as_str() };
        let _ = writeln!(out, "  {:<14} {:<20} {}", model, name, info.status);

        if !info.description.is_empty() {
            let _ = writeln!(out, "      {}", info.description);
        }

        let params = info.params.as_ref().map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
        let speed = info.speed.as_ref().map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "      Params: {}  Speed: {}", params, speed);
    }

    out.trim_end().to_string()
}

fn band_label(band: ConfidenceBand) -> &'static str {
    match band {
        ConfidenceBand::High => "high",
        ConfidenceBand::Medium => "medium",
        ConfidenceBand::Low => "low",
    }
}

fn reliability_label(reliability: Reliability) -> &'static str {
    match reliability {
        Reliability::High => "High",
        Reliability::Medium => "Medium",
        Reliability::Low => "Low",
    }
}

fn display_name(result: &ModelPrediction) -> &str {
    if result.model_display_name.is_empty() {
        result.model_name.as_str()
    } else {
        result.model_display_name.as_str()
    }
}

/// Sorted union of the classes any model reported a probability for.
pub fn probability_classes(results: &[ModelPrediction]) -> Vec<&str> {
    results
        .iter()
        .flat_map(|result| result.all_probabilities.keys().map(String::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn write_probability_row(
    out: &mut String,
    name: &str,
    classes: &[&str],
    probabilities: &BTreeMap<String, f64>,
) {
    let _ = write!(out, "  {:<16}", name);
    for class in classes {
        let probability = probabilities.get(*class).copied().unwrap_or(0.0);
        let _ = write!(out, " {:>9.1}%", probability);
    }
    out.push('\n');
}

/// Model by class probability table. Classes a model did not report show as 0.
pub fn render_probability_table(reply: &PredictionReply) -> String {
    let classes = probability_classes(&reply.individual_results);
    if classes.is_empty() {
        return String::new();
    }

    let mut out = format!("  {:<16}", "Model");
    for class in &classes {
        let _ = write!(out, " {:>10}", class);
    }
    out.push('\n');

    for result in &reply.individual_results {
        write_probability_row(&mut out, display_name(result), &classes, &result.all_probabilities);
    }
    if let Some(ensemble) = &reply.ensemble_result {
        if !ensemble.average_probabilities.is_empty() {
            write_probability_row(&mut out, "Ensemble", &classes, &ensemble.average_probabilities);
        }
    }

    out.trim_end().to_string()
}

pub fn render_prediction(reply: &PredictionReply) -> String {
    let mut out = String::new();

    match &reply.ensemble_result {
        Some(ensemble) => {
            let _ = writeln!(
                out,
                "Ensemble: {} ({:.1}% confidence, {:.1}% model agreement)",
                ensemble.predicted_class, ensemble.confidence, ensemble.model_agreement
            );
        }
        None => {
            let _ = writeln!(
                out,
                "Ensemble prediction requires multiple models. Train more models for ensemble results."
            );
        }
    }

    let best = reply.best_prediction().map(|p| p.model_name.clone());
    for result in &reply.individual_results {
        let marker = if Some(&result.model_name) == best.as_ref() { "*" } else { " " };
        let display = display_name(result);
        let _ = writeln!(
            out,
            "{} {:<16} {:<16} {:>5.1}% ({})  {:.1} ms",
            marker,
            display,
            result.predicted_class,
            result.confidence,
            band_label(ConfidenceBand::of(result.confidence)),
            result.prediction_time
        );
    }

    let table = render_probability_table(reply);
    if !table.is_empty() {
        let _ = writeln!(out, "{}", table);
    }

    let analysis = &reply.confidence_analysis;
    let _ = writeln!(
        out,
        "Average confidence: {:.1}% ({})  Consensus: {}  Range: {:.1}%  Reliability: {}",
        analysis.avg_confidence,
        analysis.confidence_level,
        if analysis.class_consensus { "All Agree" } else { "Mixed" },
        analysis.confidence_range,
        reliability_label(analysis.reliability())
    );

    if !reply.explanation.is_empty() {
        let _ = writeln!(out, "{}", reply.explanation);
    }

    out.trim_end().to_string()
}

pub fn render_comparison(reply: &ComparisonReply) -> String {
    let Some(stats) = QuickStats::from_comparison(&reply.comparison_data) else {
        return "No training data available. Please train models first.".to_string();
    };

    let mut out = format!(
        "Best model: {} ({:.1}%)\nAverage accuracy: {:.1}%\nModels trained: {}\nTotal training time: {}\n",
        stats.best_model,
        stats.best_accuracy,
        stats.average_accuracy,
        stats.completed_models,
        format_training_time(stats.total_training_time)
    );

    for row in &reply.comparison_data {
        let _ = writeln!(
            out,
            "  {:<14} best {:>5.1}%  final {:>5.1}%  epochs {:>3}  {:>10}  {}",
            row.model,
            row.best_accuracy,
            row.final_accuracy,
            row.total_epochs,
            format_training_time(row.training_time),
            row.status
        );
    }

    out.trim_end().to_string()
}
