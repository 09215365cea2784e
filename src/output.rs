use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use tabled::Table;
use tabled::settings::Style;

use crate::model::AggregatedRow;
use crate::scan::ScanError;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

pub fn render_rows(rows: &[AggregatedRow], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(Table::new(rows).with(Style::ascii()).to_string()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(rows).context("failed to encode rows as JSON")
        }
        OutputFormat::Yaml => serde_yaml::to_string(rows).context("failed to encode rows as YAML"),
    }
}

pub fn render_failures(failures: &[ScanError]) -> String {
    failures
        .iter()
        .map(|failure| format!("  {}", failure.chain()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{OutputFormat, render_failures, render_rows};
    use crate::model::AggregatedRow;
    use crate::scan::ScanError;
    use serde_json::Value;

    fn rows() -> Vec<AggregatedRow> {
        vec![
            AggregatedRow {
                namespace: "default".to_string(),
                name: "web-1".to_string(),
                ready: "1/2".to_string(),
                status: "CrashLoopBackOff".to_string(),
                restarts: 3,
                age: "3h2m10s".to_string(),
                age_seconds: Some(10_930),
            },
            AggregatedRow {
                namespace: "batch".to_string(),
                name: "job-done".to_string(),
                ready: "1/1".to_string(),
                status: "Succeeded".to_string(),
                restarts: 0,
                age: "-".to_string(),
                age_seconds: None,
            },
        ]
    }

    #[test]
    fn table_has_headers_and_rows_in_order() {
        let table = render_rows(&rows(), OutputFormat::Table).unwrap();
        let lines = table.lines().collect::<Vec<_>>();

        let header = lines.iter().position(|line| line.contains("NAME")).unwrap();
        for column in ["NAMESPACE", "READY", "STATUS", "RESTARTS", "AGE"] {
            assert!(lines[header].contains(column), "missing column {column}");
        }
        let web = lines.iter().position(|line| line.contains("web-1")).unwrap();
        let job = lines.iter().position(|line| line.contains("job-done")).unwrap();
        assert!(header < web && web < job);
        assert!(lines[web].contains("CrashLoopBackOff"));
        assert!(lines[web].contains("3h2m10s"));
        assert!(!table.contains("10930"));
    }

    #[test]
    fn empty_table_still_renders_headers() {
        let table = render_rows(&[], OutputFormat::Table).unwrap();
        assert!(table.contains("STATUS"));
    }

    #[test]
    fn json_output_lists_rows() {
        let json = render_rows(&rows(), OutputFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed[0]["name"], "web-1");
        assert_eq!(parsed[0]["restarts"], 3);
        assert_eq!(parsed[0]["age_seconds"], 10_930);
        assert!(parsed[1].get("age_seconds").is_none());
    }

    #[test]
    fn yaml_output_lists_rows() {
        let yaml = render_rows(&rows(), OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("name: web-1"));
        assert!(yaml.contains("status: Succeeded"));
    }

    #[test]
    fn failures_render_with_causes() {
        let failures = vec![ScanError::Listing {
            namespace: "locked".to_string(),
            source: anyhow::anyhow!("forbidden"),
        }];

        assert_eq!(
            render_failures(&failures),
            "  unable to list pods in namespace locked: forbidden"
        );
    }
}
