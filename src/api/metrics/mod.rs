pub mod counters;
pub mod device;
pub mod runtime;
pub mod status;
pub mod time_stats;
pub mod usage;

use crate::usage::UsageSnapshot;

/// Trait for exporting metrics in Prometheus format
pub trait MetricExporter {
    /// Export metrics to Prometheus format string
    fn export_metrics(&self) -> String;
}

/// Helper struct to build Prometheus metrics
pub struct MetricBuilder {
    metrics: String,
}

impl MetricBuilder {
    pub fn new() -> Self {
        Self {
            metrics: String::new(),
        }
    }

    /// Add a HELP line
    pub fn help(&mut self, name: &str, description: &str) -> &mut Self {
        self.metrics
            .push_str(&format!("# HELP {name} {description}\n"));
        self
    }

    /// Add a TYPE line
    pub fn type_(&mut self, name: &str, metric_type: &str) -> &mut Self {
        self.metrics
            .push_str(&format!("# TYPE {name} {metric_type}\n"));
        self
    }

    /// HELP and TYPE for a family. Call once, before its samples.
    pub fn family(&mut self, name: &str, description: &str, metric_type: &str) -> &mut Self {
        self.help(name, description).type_(name, metric_type)
    }

    /// Add a metric line with labels
    pub fn metric(
        &mut self,
        name: &str,
        labels: &[(&str, &str)],
        value: impl ToString,
    ) -> &mut Self {
        self.metrics.push_str(name);

        if !labels.is_empty() {
            self.metrics.push('{');
            for (i, (key, value)) in labels.iter().enumerate() {
                if i > 0 {
                    self.metrics.push(',');
                }
                self.metrics
                    .push_str(&format!("{key}=\"{}\"", escape_label_value(value)));
            }
            self.metrics.push('}');
        }

        self.metrics.push(' ');
        self.metrics.push_str(&value.to_string());
        self.metrics.push('\n');
        self
    }

    /// Build the final metric string
    pub fn build(self) -> String {
        self.metrics
    }
}

impl Default for MetricBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape a label value for the text exposition format.
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// The `mountpoint` and `uuid` labels carried by every bcachefs family.
#[derive(Debug, Clone, Copy)]
pub struct FsLabels<'a> {
    pub mountpoint: &'a str,
    pub uuid: &'a str,
}

impl<'a> FsLabels<'a> {
    pub fn new(usage: &'a UsageSnapshot) -> Self {
        Self {
            mountpoint: &usage.mount_path,
            uuid: &usage.id,
        }
    }

    /// The filesystem labels followed by `extra`.
    pub fn with<'b>(&'b self, extra: &[(&'b str, &'b str)]) -> Vec<(&'b str, &'b str)> {
        let mut labels = Vec::with_capacity(extra.len() + 2);
        labels.push(("mountpoint", self.mountpoint));
        labels.push(("uuid", self.uuid));
        labels.extend_from_slice(extra);
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_line() {
        let mut builder = MetricBuilder::new();
        builder
            .family("bcachefs_test", "A test family", "gauge")
            .metric("bcachefs_test", &[("a", "1"), ("b", "two")], 42)
            .metric("bcachefs_test", &[], 0.5);
        assert_eq!(
            builder.build(),
            "# HELP bcachefs_test A test family\n\
             # TYPE bcachefs_test gauge\n\
             bcachefs_test{a=\"1\",b=\"two\"} 42\n\
             bcachefs_test 0.5\n"
        );
    }

    #[test]
    fn test_label_escaping() {
        assert_eq!(escape_label_value(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(escape_label_value("line\nbreak"), "line\\nbreak");
        assert_eq!(escape_label_value("hdd.hdd1"), "hdd.hdd1");
    }

    #[test]
    fn test_fs_labels() {
        let usage = UsageSnapshot {
            id: "1234".to_string(),
            mount_path: "/mnt/pool".to_string(),
            ..Default::default()
        };
        let fs = FsLabels::new(&usage);
        assert_eq!(
            fs.with(&[("type", "used")]),
            vec![("mountpoint", "/mnt/pool"), ("uuid", "1234"), ("type", "used")]
        );
    }
}
