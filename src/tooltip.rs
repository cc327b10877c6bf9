use crate::join::RegionView;
use serde::Serialize;

/// Shown for a stat field when the region has no stat record.
pub const MISSING_STAT: &str = "NA";
/// Shown for the testing figure when no test record matched.
pub const MISSING_TESTS: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub code: String,
    pub title: String,
    pub rows: Vec<TooltipRow>,
}

impl Tooltip {
    pub fn for_region(region: &RegionView) -> Self {
        let count = |pick: fn(&crate::types::RegionStat) -> Option<u64>| {
            region
                .stat
                .as_ref()
                .and_then(pick)
                .map(|n| n.to_string())
                .unwrap_or_else(|| MISSING_STAT.to_string())
        };

        let rows = vec![
            TooltipRow { label: "Active", value: count(|s| s.active) },
            TooltipRow { label: "Confirmed", value: count(|s| s.confirmed) },
            TooltipRow { label: "Deaths", value: count(|s| s.deaths) },
            TooltipRow { label: "Recovered", value: count(|s| s.recovered) },
            TooltipRow {
                label: "Tested",
                value: region
                    .total_tested
                    .clone()
                    .unwrap_or_else(|| MISSING_TESTS.to_string()),
            },
        ];

        Self {
            code: region.code.clone(),
            title: region.name.clone(),
            rows,
        }
    }

    #[cfg(test)]
    pub fn value(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.label == label)
            .map(|r| r.value.as_str())
    }

    pub fn to_html(&self) -> String {
        let items: String = self
            .rows
            .iter()
            .map(|r| format!("<li><strong>{}:</strong> {}</li>", r.label, escape(&r.value)))
            .collect();
        format!(
            r#"<span class="tooltip"><h2>{}</h2><ul>{}</ul></span>"#,
            escape(&self.title),
            items
        )
    }

    pub fn to_text(&self) -> String {
        let mut out = self.title.clone();
        for row in &self.rows {
            out.push('\n');
            out.push_str(row.label);
            out.push_str(": ");
            out.push_str(&row.value);
        }
        out
    }
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
