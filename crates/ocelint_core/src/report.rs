//! Findings and their aggregation.
//!
//! Inspectors produce an [`Inspection`] per source unit: reports keyed
//! by the plugin that emitted them. [`merge_inspections`] flattens any
//! number of inspections into one view grouped by a caller-chosen
//! [`Group`] axis, after dropping ignored codes. Filtering happens
//! before grouping, so empty groups never appear in the output.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Upper-cased hook name, e.g. `DEFAULT_MUTABLE_ARG`.
    pub code: String,
    pub line: u32,
    pub column: u32,
    /// Source unit the finding belongs to.
    pub file: String,
    /// First source line of the offending node, when the inspector
    /// had the source text at hand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

/// Findings of one source unit, keyed by plugin name.
pub type Inspection = HashMap<String, Vec<Report>>;

/// Axis reports are grouped along.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Group {
    #[default]
    Plugin,
    Code,
    Line,
    Column,
    File,
}

impl Group {
    fn key_of(self, report: &Report, plugin: &str) -> GroupKey {
        match self {
            Group::Plugin => GroupKey::Text(plugin.to_owned()),
            Group::Code => GroupKey::Text(report.code.clone()),
            Group::Line => GroupKey::Number(report.line),
            Group::Column => GroupKey::Number(report.column),
            Group::File => GroupKey::Text(report.file.clone()),
        }
    }
}

impl FromStr for Group {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "plugin" => Ok(Group::Plugin),
            "code" => Ok(Group::Code),
            "line" => Ok(Group::Line),
            "column" => Ok(Group::Column),
            "file" => Ok(Group::File),
            other => Err(format!(
                "unknown group `{other}`, expected one of plugin, code, line, column, file"
            )),
        }
    }
}

/// The value of the grouping axis for one group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupKey {
    Number(u32),
    Text(String),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Number(number) => write!(f, "{number}"),
            GroupKey::Text(text) => f.write_str(text),
        }
    }
}

/// A report inside a group, tagged with its plugin when the grouping
/// axis isn't the plugin itself.
#[derive(Debug, Clone, Serialize)]
pub struct GroupedReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(flatten)]
    pub report: Report,
}

/// Reports grouped along one axis, with deterministic group order.
pub type Grouped = BTreeMap<GroupKey, Vec<GroupedReport>>;

/// Flattens inspections into groups, dropping `ignored_codes` first.
/// Every surviving report lands in exactly one group.
pub fn merge_inspections<I>(inspections: I, group: Group, ignored_codes: &HashSet<String>) -> Grouped
where
    I: IntoIterator<Item = Inspection>,
{
    let mut grouped = Grouped::new();
    for inspection in inspections {
        for (plugin, reports) in inspection {
            for report in reports {
                if ignored_codes.contains(&report.code) {
                    continue;
                }
                let key = group.key_of(&report, &plugin);
                let tag = (group != Group::Plugin).then(|| plugin.clone());
                grouped.entry(key).or_default().push(GroupedReport {
                    plugin: tag,
                    report,
                });
            }
        }
    }
    grouped
}

/// Renders grouped reports as a JSON object keyed by group.
pub fn grouped_to_json(grouped: &Grouped) -> serde_json::Value {
    serde_json::Value::Object(
        grouped
            .iter()
            .map(|(key, reports)| {
                let value = serde_json::to_value(reports).unwrap_or_default();
                (key.to_string(), value)
            })
            .collect(),
    )
}
