//! End-of-run output

use anyhow::Result;

use cwtune_rl::{RunSummary, ValueTable};

/// Print the run summary and learned table, as text or JSON
pub fn print_summary(summary: &RunSummary, table: &ValueTable, json: bool) -> Result<()> {
    if json {
        println!("{}", render_json(summary, table)?);
    } else {
        print!("{}", render_text(summary, table));
    }
    Ok(())
}

fn render_json(summary: &RunSummary, table: &ValueTable) -> Result<String> {
    let report = serde_json::json!({
        "summary": summary,
        "table": table.rows(),
    });
    Ok(serde_json::to_string_pretty(&report)?)
}

fn render_text(summary: &RunSummary, table: &ValueTable) -> String {
    let mut out = String::new();

    out.push_str("Episodes\n");
    out.push_str("========\n");
    if summary.episodes.is_empty() {
        out.push_str("  (none completed)\n");
    }
    for stats in &summary.episodes {
        out.push_str(&format!(
            "  #{:<3} steps={:<5} rx_pkts={:<10.1} mean_reward={:<8.2} explore={:.0}%\n",
            stats.episode,
            stats.steps,
            stats.rx_packets,
            stats.mean_reward(),
            stats.exploration_rate() * 100.0,
        ));
    }
    out.push_str(&format!(
        "Total steps: {}  Total rx pkts: {:.1}\n\n",
        summary.total_steps,
        summary.total_rx_packets()
    ));

    out.push_str("Value table (bucket x action)\n");
    out.push_str("=============================\n");
    out.push_str(&table.to_string());
    out.push('\n');

    out.push_str("Learned policy\n");
    out.push_str("==============\n");
    if summary.policy.is_empty() {
        out.push_str("  (no rewarded buckets)\n");
    }
    for entry in &summary.policy {
        out.push_str(&format!(
            "  bucket {:>2} -> action {:>2} (best reward {:.1})\n",
            entry.bucket, entry.action, entry.value
        ));
    }

    out
}
