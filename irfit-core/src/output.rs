use crate::analysis::{GroupSummary, ModelReport, Report};
use crate::hypothesis::{FTest, NormalityTest, TTest, Verdict};
use crate::statistics::DescriptiveStats;
use crate::variance_table::VarianceTable;
use colored::*;

/// Compact number formatting for terminal tables
pub fn format_number(value: f64) -> String {
    if value.is_infinite() {
        if value > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else if value.is_nan() {
        "n/a".to_string()
    } else if value != 0.0 && (value.abs() >= 1e6 || value.abs() < 1e-3) {
        format!("{:.4e}", value)
    } else {
        format!("{:.4}", value)
    }
}

pub fn format_descriptive(label: &str, stats: &DescriptiveStats) -> String {
    let (low, high) = stats.confidence_bounds();
    format!(
        "{} {} n: {}, mean: {}, sd: {}, Q1/median/Q3: {}/{}/{} {}",
        "STATS".green().bold(),
        label.cyan(),
        stats.count,
        format_number(stats.mean).cyan().bold(),
        format_number(stats.std_dev),
        format_number(stats.q1).dimmed(),
        format_number(stats.median).dimmed(),
        format_number(stats.q3).dimmed(),
        format!(
            "({:.0}% CI: {} .. {})",
            stats.confidence_level * 100.0,
            format_number(low),
            format_number(high)
        )
        .dimmed()
    )
}

fn verdict_tag(verdict: Verdict, reject: &str, keep: &str) -> ColoredString {
    match verdict {
        Verdict::Reject => reject.red().bold(),
        Verdict::FailToReject => keep.green().bold(),
    }
}

pub fn format_normality(test: &NormalityTest) -> String {
    format!(
        "        {} W = {}, p = {} (alpha = {})",
        verdict_tag(test.verdict, "NOT NORMAL", "NORMAL"),
        format_number(test.w),
        format_number(test.p_value),
        test.alpha
    )
}

pub fn format_t_test(label: &str, test: &TTest) -> String {
    format!(
        "{} {} t = {}, critical = {}, df = {} {}",
        verdict_tag(test.verdict, "DIFFER", "SAME"),
        label.cyan(),
        format_number(test.statistic).bold(),
        format_number(test.critical_value),
        test.degrees_of_freedom,
        format!("(alpha = {})", test.alpha).dimmed()
    )
}

pub fn format_f_test(test: &FTest) -> String {
    format!(
        "        {} F0 = {}, p = {}",
        verdict_tag(test.verdict, "SIGNIFICANT", "NOT SIGNIFICANT"),
        format_number(test.value),
        format_number(test.p_value)
    )
}

pub fn format_variance_table(table: &VarianceTable) -> String {
    let mut lines = vec![format!(
        "        {:<12} {:>14} {:>4} {:>14} {:>12}",
        "source", "SS", "df", "MS", "F0"
    )
    .dimmed()
    .to_string()];
    for row in table.rows() {
        lines.push(format!(
            "        {:<12} {:>14} {:>4} {:>14} {:>12}",
            row.source,
            format_number(row.sum_of_squares),
            row.degrees_of_freedom,
            row.mean_square.map(format_number).unwrap_or_default(),
            row.f0.map(format_number).unwrap_or_default()
        ));
    }
    lines.join("\n")
}

pub fn format_model_report(report: &ModelReport) -> String {
    let c = &report.coefficients;
    format!(
        "{} {} {} b0 = {} (+/- {}), b1 = {} (+/- {})",
        "MODEL".green().bold(),
        report.name.cyan(),
        format!("[{} on {}: {}]", report.family, report.column, report.family.equation()).dimmed(),
        format_number(c.beta0).cyan().bold(),
        format_number(c.beta0_interval),
        format_number(c.beta1).cyan().bold(),
        format_number(c.beta1_interval)
    )
}

pub fn print_group(summary: &GroupSummary) {
    println!("{}", format_descriptive(&summary.label, &summary.stats));
    if let Some(test) = &summary.normality {
        println!("{}", format_normality(test));
    }
}

/// Print one model as soon as it is evaluated (for streaming output)
pub fn print_model_line(report: &ModelReport) {
    println!("{}", format_model_report(report));
    if let Some(test) = &report.significance {
        println!("{}", format_f_test(test));
    }
    if let Some(test) = &report.residual_normality {
        println!("{}", format_normality(test));
    }
}

/// Print the summary footer of a full run
pub fn print_summary(report: &Report) {
    let manifest = &report.manifest;
    let significant = report
        .models
        .iter()
        .filter(|m| m.significance.map(|t| t.verdict.is_reject()).unwrap_or(false))
        .count();
    let normal_residuals = report
        .models
        .iter()
        .filter(|m| m.residual_normality.map(|t| t.is_normal()).unwrap_or(false))
        .count();

    println!("{}", "─".repeat(80).dimmed());
    println!(
        "{} {} rows, {} models: {} {}, {} {}",
        "Summary:".cyan().bold(),
        manifest.rows,
        report.models.len(),
        significant,
        "significant".green(),
        normal_residuals,
        "with normal residuals".dimmed()
    );
    println!(
        "{} {} files, manifest at {}",
        "Wrote".green().bold(),
        manifest.files.len(),
        report.manifest_path.display()
    );
}
