//! Report rendering: an indented text tree for humans and a single JSON
//! document for machines

use std::fmt::Write as _;

use crate::health::ContainerHealth;
use crate::model::{Document, HealthReport, HostReport, ProjectReport, ServiceReport};
use crate::theme::{dim, paint};

const INDENT: &str = "  ";

/// What the text tree shows
#[derive(Clone, Debug)]
pub struct TextOptions {
    /// Print routing domains
    pub host_labels: bool,
    /// Only projects and their domains
    pub short: bool,
    /// Emit ANSI colors
    pub color: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            host_labels: true,
            short: false,
            color: false,
        }
    }
}

fn line(out: &mut String, depth: usize, text: &str) {
    let _ = writeln!(out, "{}{}", INDENT.repeat(depth), text);
}

/// Dim the part of `domain` that repeats the project's hosting domain
pub fn highlight_domain(domain: &str, hosting_domain: &str, color: bool) -> String {
    if hosting_domain.is_empty() {
        return domain.to_string();
    }
    match domain.rfind(hosting_domain) {
        Some(at) => {
            let (head, rest) = domain.split_at(at);
            let tail = &rest[hosting_domain.len()..];
            format!("{}{}{}", head, dim(hosting_domain, color), tail)
        }
        None => domain.to_string(),
    }
}

/// `"{name}: {status}[ & {healthcheck}]"` colored by level
pub fn health_line(health: &ContainerHealth, color: bool) -> String {
    paint(&health.status_line(), health.level.color(), color)
}

pub fn render_text(report: &HostReport, options: &TextOptions) -> String {
    let mut out = String::new();
    line(&mut out, 0, &report.server_name);
    for project in &report.projects {
        render_project(&mut out, project, options);
    }
    out
}

fn render_project(out: &mut String, project: &ProjectReport, options: &TextOptions) {
    let header = if project.hosting_domain.is_empty() {
        project.name.clone()
    } else {
        format!("{} ({})", project.name, project.hosting_domain)
    };
    line(out, 1, &header);

    if options.short {
        if options.host_labels {
            for domain in project.domains() {
                line(out, 2, &highlight_domain(domain, &project.hosting_domain, options.color));
            }
        }
        return;
    }

    if let (Some(human), Some(bytes)) = (&project.disk_usage_human, project.disk_usage_bytes) {
        line(out, 2, &format!("disk: {} ({} bytes)", human, bytes));
    }

    if let Some(settings) = &project.settings {
        line(out, 2, "settings:");
        for (key, value) in settings {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            line(out, 3, &format!("{}: {}", key, value));
        }
    }

    for service in &project.services {
        render_service(out, service, &project.hosting_domain, options);
    }
}

fn render_service(
    out: &mut String,
    service: &ServiceReport,
    hosting_domain: &str,
    options: &TextOptions,
) {
    line(out, 2, &service.name);

    if !service.exposed_ports.is_empty() {
        let ports: Vec<String> = service.exposed_ports.iter().map(u16::to_string).collect();
        line(out, 3, &format!("exposes: {}", ports.join(", ")));
    }
    if !service.published_ports.is_empty() {
        line(out, 3, &format!("ports: {}", service.published_ports.join(", ")));
    }
    if options.host_labels && !service.domains.is_empty() {
        line(out, 3, "domains:");
        for domain in &service.domains {
            line(out, 4, &highlight_domain(domain, hosting_domain, options.color));
        }
    }
    if let Some(containers) = &service.health {
        line(out, 3, "health:");
        if containers.is_empty() {
            line(out, 4, &dim("no containers", options.color));
        }
        for container in containers {
            line(out, 4, &health_line(container, options.color));
        }
    }
}

/// Health command text output, one line per container
pub fn render_health_text(containers: &[ContainerHealth], color: bool) -> String {
    let mut out = String::new();
    for container in containers {
        line(&mut out, 0, &health_line(container, color));
    }
    out
}

/// The whole report as one `{"data": {...}}` document
pub fn render_json(report: &HostReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&Document { data: report })
}

pub fn render_health_json(containers: &[ContainerHealth]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&Document {
        data: HealthReport {
            containers: containers.to_vec(),
        },
    })
}
