use std::fmt::Write;

use super::QueryStats;
use crate::cluster::Query;

/// Render the query counters in Prometheus text format.
pub fn render_prometheus(stats: &QueryStats) -> String {
    let mut out = String::with_capacity(512);

    write_counter_family(
        &mut out,
        "batteries_cluster_queries_total",
        "Cluster API list queries issued",
        |q| stats.attempts(q),
    );
    write_counter_family(
        &mut out,
        "batteries_cluster_query_failures_total",
        "Cluster API list queries that failed or timed out and were replaced by an empty result",
        |q| stats.failures(q),
    );

    out
}

fn write_counter_family(out: &mut String, name: &str, help: &str, value: impl Fn(Query) -> u64) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");
    for query in Query::ALL {
        let _ = writeln!(out, "{name}{{query=\"{query}\"}} {}", value(query));
    }
}
