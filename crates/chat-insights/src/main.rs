mod bootstrap;

use anyhow::Result;
use insights_core::formatting::format_count;
use insights_core::settings::Settings;
use insights_core::time_utils::resolve_timezone;
use insights_runtime::report::ReportGenerator;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;
    bootstrap::ensure_config_dir()?;
    bootstrap::ensure_output_dir(&settings.output_dir)?;

    tracing::info!("Chat Insights v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Mode: {}, Input: {}, Output: {}, Timezone: {}",
        settings.mode,
        settings.input.display(),
        settings.output_dir.display(),
        settings.timezone
    );

    let timezone = resolve_timezone(&settings.timezone)?;
    let mut generator =
        ReportGenerator::new(settings.input.clone(), settings.output_dir.clone(), timezone);

    match settings.mode.as_str() {
        "report" => {
            let path = generator.generate_final_report()?;
            println!("Report written to {}", path.display());
        }

        "load" => {
            let stats = generator.run_data_loader();
            generator.table()?;
            println!("Messages:      {}", format_count(stats.total_messages));
            println!("Period:        {} ~ {}", stats.start_date, stats.end_date);
            println!("Avg words:     {:.3}", stats.avg_word_count);
            println!("Avg depth:     {:.3}", stats.avg_question_depth);
        }

        "correlation" => {
            generator.run_data_loader();
            let analysis = generator.run_correlation_analysis()?;
            println!("{}", analysis.insights.strongest_summary());
            for (label, n) in analysis.insights.distribution.rows() {
                println!("{}: {}", label, n);
            }
        }

        "dashboard" => {
            generator.run_data_loader();
            let stats = generator.run_dashboard_creation()?;
            println!(
                "Dashboard: {} topics, peak hourly efficiency {:.3}",
                stats.topic_count(),
                stats.peak_hourly_efficiency().unwrap_or(0.0)
            );
        }

        "questions" => {
            generator.run_data_loader();
            let analysis = generator.run_question_level_analysis()?;
            let summary = analysis.summary();
            println!(
                "Learning conversations: {} ({:.1}%)",
                format_count(summary.learning_count),
                analysis.learning_ratio()
            );
            println!("Daily question depth:   {:.2}", summary.daily_average);
            println!("Weekly question depth:  {:.2}", summary.weekly_average);
        }

        unknown => {
            anyhow::bail!("Unknown mode: {}", unknown);
        }
    }

    Ok(())
}
