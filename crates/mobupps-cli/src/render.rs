//! Plain-text rendering of dashboard data to stdout.

use chrono::{DateTime, Local};
use mobupps_core::RequestToken;
use mobupps_types::{
    HealthStatus, HistoryEntry, MetricsSnapshot, PREDICTED_SCORE_MAX, PredictionResult,
    SearchResult, format_uptime, group_thousands,
};

pub fn search_result(result: &SearchResult) {
    println!(
        "{} similar apps (arm {}, cid {})",
        result.similar_apps.len(),
        result.ab_arm,
        result.correlation_id
    );
    for (rank, app) in result.similar_apps.iter().enumerate() {
        println!(
            "{:>3}. {:<32} {:<16} {:>6}  {}",
            rank + 1,
            app.app_name,
            app.category,
            app.similarity_percent(),
            app.app_id
        );
    }
}

pub fn prediction(result: &PredictionResult) {
    println!(
        "Predicted score: {:.2} / {PREDICTED_SCORE_MAX} ({:.0}%)",
        result.predicted_score,
        result.score_percent()
    );
    println!("Confidence:      {:.0}%", result.confidence * 100.0);
    if result.user_segments.is_empty() {
        println!("Segments:        -");
    } else {
        println!("Segments:        {}", result.user_segments.join(", "));
    }
    println!(
        "Latency:         {}ms (arm {}, cid {})",
        result.latency_ms, result.ab_arm, result.correlation_id
    );
}

pub fn metrics(snapshot: &MetricsSnapshot, token: RequestToken) {
    let overview = snapshot.overview();
    println!(
        "Metrics {token} at {}",
        Local::now().format("%H:%M:%S")
    );
    println!(
        "  Requests {}  Avg latency {}  Success {}  Uptime {}  Errors {}",
        overview.total_requests,
        overview.avg_latency,
        overview.success_rate,
        overview.uptime,
        group_thousands(snapshot.error_count)
    );

    if !snapshot.latency_stats.is_empty() {
        println!(
            "  {:<28} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "endpoint", "count", "avg", "min", "p50", "p95", "p99", "max"
        );
        for (endpoint, stats) in &snapshot.latency_stats {
            println!(
                "  {endpoint:<28} {:>8} {:>8.1} {:>8.1} {:>8.1} {:>8.1} {:>8.1} {:>8.1}",
                stats.count, stats.avg, stats.min, stats.p50, stats.p95, stats.p99, stats.max
            );
        }
    }

    let split = snapshot.ab_testing.split();
    println!(
        "  A/B  v1 {} ({:.1}%)  v2 {} ({:.1}%)",
        group_thousands(snapshot.ab_testing.v1_count),
        split.v1_percent,
        group_thousands(snapshot.ab_testing.v2_count),
        split.v2_percent
    );
    for (endpoint, arms) in &snapshot.ab_testing.by_endpoint {
        println!(
            "       {endpoint:<28} v1 {:>6}  v2 {:>6}  ({:.1}% v1)",
            arms.v1,
            arms.v2,
            arms.v1_percent()
        );
    }

    if !snapshot.status_codes.is_empty() {
        let codes: Vec<String> = snapshot
            .status_codes
            .iter()
            .map(|(code, count)| format!("{code}: {count}"))
            .collect();
        println!("  Status  {}", codes.join("  "));
    }
}

pub fn health(status: Option<&HealthStatus>) {
    match status {
        Some(health) => println!(
            "API status: {} (up {})",
            HealthStatus::label(status),
            format_uptime(health.uptime_seconds)
        ),
        None => println!("API status: {}", HealthStatus::label(None)),
    }
}

pub fn history(entries: &[HistoryEntry]) {
    for entry in entries {
        let when = DateTime::parse_from_rfc3339(&entry.timestamp).map_or_else(
            |_| entry.timestamp.clone(),
            |at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        );
        let tags: Vec<&str> = [&entry.app.category, &entry.app.region, &entry.app.pricing]
            .into_iter()
            .filter_map(|tag| tag.as_deref())
            .collect();

        if tags.is_empty() {
            println!("{when}  {}", entry.app.name);
        } else {
            println!("{when}  {} [{}]", entry.app.name, tags.join(", "));
        }
    }
}
