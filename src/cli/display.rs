//! Display formatting for CLI output
//!
//! SBIO pattern: Pure functions that format data for display

use chrono::{DateTime, Utc};

use super::commands::ContextInfo;
use crate::cluster::{ClusterSnapshot, ClusterStatus, Node, Placement, Pod};

/// Shown by `format_table` when there are no rows
pub const EMPTY_TABLE: &str = "No resources found.";

// ============================================================================
// Table formatting helpers
// ============================================================================

/// Format a simple table with headers and rows
pub fn format_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    if rows.is_empty() {
        return format!("{}\n", EMPTY_TABLE);
    }

    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut output = String::new();

    // Header
    for (i, header) in headers.iter().enumerate() {
        if i > 0 {
            output.push_str("   ");
        }
        output.push_str(&format!(
            "{:width$}",
            header.to_uppercase(),
            width = widths[i]
        ));
    }
    trim_line_end(&mut output);
    output.push('\n');

    // Rows
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                output.push_str("   ");
            }
            if i < widths.len() {
                output.push_str(&format!("{:width$}", cell, width = widths[i]));
            } else {
                output.push_str(cell);
            }
        }
        trim_line_end(&mut output);
        output.push('\n');
    }

    output
}

fn trim_line_end(output: &mut String) {
    let trimmed = output.trim_end_matches(' ').len();
    output.truncate(trimmed);
}

fn format_date(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_running(running: bool) -> &'static str {
    if running {
        "Running"
    } else {
        "Stopped"
    }
}

fn format_ports(pod: &Pod) -> String {
    if pod.ports.is_empty() {
        return "-".to_string();
    }
    pod.ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn format_role(node: &Node) -> &'static str {
    if node.is_master() {
        "master"
    } else {
        "worker"
    }
}

// ============================================================================
// Context display
// ============================================================================

/// Format context list for display
pub fn format_context_list(contexts: &[ContextInfo]) -> String {
    let headers = &["", "NAME", "URL"];
    let rows: Vec<Vec<String>> = contexts
        .iter()
        .map(|ctx| {
            vec![
                if ctx.is_current { "*" } else { " " }.to_string(),
                ctx.name.clone(),
                ctx.url.clone(),
            ]
        })
        .collect();

    format_table(headers, rows)
}

/// Format current context for display
pub fn format_current_context(name: &str, url: &str) -> String {
    format!("Current context: {} ({})\n", name, url)
}

// ============================================================================
// Node and pod display
// ============================================================================

/// Format node list for display
pub fn format_node_list(nodes: &[Node]) -> String {
    let headers = &["NAME", "STATUS", "ROLE", "ADDRESS", "NAMESPACE", "PODS", "STARTED"];
    let rows: Vec<Vec<String>> = nodes
        .iter()
        .map(|n| {
            vec![
                n.name.clone(),
                format_running(n.status).to_string(),
                format_role(n).to_string(),
                n.address.to_string(),
                n.namespace.clone(),
                n.pod_count().to_string(),
                format_date(n.started_at),
            ]
        })
        .collect();

    format_table(headers, rows)
}

/// Format pod list (with owning node) for display
pub fn format_pod_list(pods: &[Placement]) -> String {
    let headers = &["NAME", "NODE", "IMAGE", "STATUS", "ADDRESS", "PORTS"];
    let rows: Vec<Vec<String>> = pods
        .iter()
        .map(|p| {
            vec![
                p.pod.name.clone(),
                p.node.clone(),
                p.pod.image.clone(),
                format_running(p.pod.status).to_string(),
                p.pod.address.to_string(),
                format_ports(&p.pod),
            ]
        })
        .collect();

    format_table(headers, rows)
}

// ============================================================================
// Cluster display
// ============================================================================

/// Format a full cluster dump: summary, then every node with its pods
pub fn format_cluster(snapshot: &ClusterSnapshot) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Cluster {} ({}) {}\n",
        snapshot.name,
        snapshot.address,
        format_running(snapshot.status)
    ));
    output.push_str(&format!("Nodes: {}\n", snapshot.node_count));
    output.push_str(&format!("Pods:  {}\n", snapshot.pod_count));
    if let Some(ref candidate) = snapshot.next_candidate {
        output.push_str(&format!("Next:  {}\n", candidate));
    }

    for node in &snapshot.nodes {
        output.push('\n');
        output.push_str(&format!(
            "Node {} ({}, {}, {}, {})\n",
            node.name,
            node.address,
            node.namespace,
            format_role(node),
            format_date(node.started_at)
        ));

        let headers = &["NAME", "IMAGE", "STATUS", "ADDRESS", "PORTS", "STARTED"];
        let rows: Vec<Vec<String>> = node
            .pods
            .values()
            .map(|pod| {
                vec![
                    pod.name.clone(),
                    pod.image.clone(),
                    format_running(pod.status).to_string(),
                    pod.address.to_string(),
                    format_ports(pod),
                    format_date(pod.started_at),
                ]
            })
            .collect();
        for line in format_table(headers, rows).lines() {
            output.push_str("  ");
            output.push_str(line);
            output.push('\n');
        }
    }

    output
}

/// Node and pod names recovered from `format_cluster` output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCluster {
    pub node_count: usize,
    pub pod_count: usize,
    pub nodes: Vec<ParsedNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedNode {
    pub name: String,
    pub pods: Vec<String>,
}

impl ParsedCluster {
    /// Pods found under node sections
    pub fn listed_pods(&self) -> usize {
        self.nodes.iter().map(|n| n.pods.len()).sum()
    }
}

/// Re-read a cluster dump produced by `format_cluster`
pub fn parse_cluster(output: &str) -> ParsedCluster {
    let mut parsed = ParsedCluster::default();
    // The first indented line under a node heading is the pod table header
    let mut expect_header = false;

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with(' ') {
            if expect_header {
                expect_header = false;
                continue;
            }
            if let (Some(node), Some(pod)) =
                (parsed.nodes.last_mut(), line.split_whitespace().next())
            {
                node.pods.push(pod.to_string());
            }
            continue;
        }

        if let Some(count) = line.strip_prefix("Nodes:") {
            parsed.node_count = count.trim().parse().unwrap_or(0);
        } else if let Some(count) = line.strip_prefix("Pods:") {
            parsed.pod_count = count.trim().parse().unwrap_or(0);
        } else if let Some(rest) = line.strip_prefix("Node ") {
            if let Some(name) = rest.split_whitespace().next() {
                parsed.nodes.push(ParsedNode {
                    name: name.to_string(),
                    pods: Vec::new(),
                });
                expect_header = true;
            }
        }
    }

    parsed
}

/// Format cluster status for display
pub fn format_cluster_status(status: &ClusterStatus) -> String {
    let mut output = String::new();

    output.push_str(&format!("Cluster: {}\n", status.name));
    output.push_str(&format!("Status:  {}\n\n", format_running(status.running)));

    output.push_str("Nodes:\n");
    output.push_str(&format!("  Total:       {}\n", status.stats.total_nodes));
    output.push_str(&format!("  Running:     {}\n", status.stats.running_nodes));
    output.push_str(&format!(
        "  Schedulable: {}\n",
        status.stats.schedulable_nodes
    ));

    output.push_str("\nPods:\n");
    output.push_str(&format!("  Total:       {}\n", status.stats.total_pods));
    output.push_str(&format!("  Running:     {}\n", status.stats.running_pods));

    output
}

/// One-line confirmation for a placed pod
pub fn format_placement(placement: &Placement) -> String {
    format!(
        "pod/{} scheduled on {} at {}\n",
        placement.pod.name,
        placement.node,
        placement.pod.endpoint()
    )
}

/// One-line confirmation for a registered node
pub fn format_node_added(node: &Node) -> String {
    let mut line = format!("node/{} registered at {}", node.name, node.address);
    if !node.schedulable {
        line.push_str(&format!(" with {} control-plane pods", node.pod_count()));
    }
    line.push('\n');
    line
}
