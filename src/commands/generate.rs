use anyhow::Result;
use std::path::Path;
use std::time::Duration;

use profilekit::analyzer::CommandAnalyzer;
use profilekit::config::Config;
use profilekit::ops;
use profilekit::recommendation::Alignment;

pub fn run(dir: &Path, json: bool) -> Result<()> {
    let config = Config::load(dir).unwrap_or_default();
    let analyzer = CommandAnalyzer::new(&config.analyzer.command)
        .with_model(config.analyzer.model.clone())
        .with_timeout(Duration::from_secs(config.analyzer.timeout_secs));

    let outcome = ops::generate_recommendations(dir, &analyzer)?;

    if json {
        let output = serde_json::json!({
            "set": outcome.set,
            "recommendations": outcome.recommendations,
            "dropped": outcome.dropped,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let summary = &outcome.set.analysis_summary;
    if !summary.summary.is_empty() {
        println!("{}", summary.summary);
    }
    match summary.config_alignment {
        Alignment::Good => println!("Alignment: good"),
        Alignment::NeedsTuning => println!("Alignment: needs tuning"),
    }

    if outcome.recommendations.is_empty() {
        println!("No recommendations (set {})", outcome.set.id);
    } else {
        println!(
            "{} recommendation(s) in set {}:",
            outcome.recommendations.len(),
            outcome.set.id
        );
        for rec in &outcome.recommendations {
            println!(
                "  {} [{}] {}",
                rec.id,
                rec.edit.type_str(),
                rec.target_section.label()
            );
        }
        println!("Review with 'pk recs', apply with 'pk apply'");
    }

    if !outcome.dropped.is_empty() {
        println!("{} draft(s) dropped as malformed", outcome.dropped.len());
    }
    Ok(())
}
