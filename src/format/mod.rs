//! Output formatter: renders an `ExecutionResult` stream in one of three
//! interchangeable encodings. Colorizing the text encoding is a terminal
//! printer's job upstream of this module, which only produces the plain
//! summary lines it paints.

use std::time::Duration;

use serde::Serialize;

use crate::executor::ExecutionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Text,
    Table,
    Json,
}

pub fn render(results: &[ExecutionResult], encoding: Encoding) -> String {
    match encoding {
        Encoding::Text => render_text(results),
        Encoding::Table => render_table(results),
        Encoding::Json => render_json(results),
    }
}

/// One summary line per module, then an aggregate line. Plain text; the
/// consumer crate's printer is responsible for any ANSI coloring.
fn render_text(results: &[ExecutionResult]) -> String {
    let mut out = String::new();
    for r in results {
        let status = if r.success { "ok" } else { "error" };
        out.push_str(&format!(
            "[{status}] {name}: {old} -> {new}",
            status = status,
            name = r.module.name,
            old = r.old_version,
            new = r.new_version,
        ));
        if let Some(e) = &r.error {
            out.push_str(&format!(" ({})", e));
        }
        out.push('\n');
    }
    out.push_str(&summary_line(results));
    out
}

fn summary_line(results: &[ExecutionResult]) -> String {
    let total = results.len();
    let success_count = results.iter().filter(|r| r.success).count();
    let error_count = total - success_count;
    format!("{total} module(s): {success_count} ok, {error_count} failed")
}

/// Fixed-column ASCII table with a divider rule; columns are sized to the
/// widest cell in each column.
fn render_table(results: &[ExecutionResult]) -> String {
    let headers = ["MODULE", "STATUS", "OLD", "NEW", "DURATION"];
    let rows: Vec<[String; 5]> = results
        .iter()
        .map(|r| {
            [
                r.module.name.clone(),
                if r.success { "ok".to_string() } else { "error".to_string() },
                r.old_version.clone(),
                r.new_version.clone(),
                humanize_duration(r.duration),
            ]
        })
        .collect();

    let mut widths = [0usize; 5];
    for (i, h) in headers.iter().enumerate() {
        widths[i] = h.len();
    }
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    out.push_str(&format_row(&headers.map(|h| h.to_string()), &widths));
    out.push_str(&divider(&widths));
    for row in &rows {
        out.push_str(&format_row(row, &widths));
    }
    out
}

fn format_row(cells: &[String; 5], widths: &[usize; 5]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str(" | ");
        }
        line.push_str(&format!("{:width$}", cell, width = widths[i]));
    }
    line.push('\n');
    line
}

fn divider(widths: &[usize; 5]) -> String {
    let mut line = String::new();
    for (i, w) in widths.iter().enumerate() {
        if i > 0 {
            line.push_str("-+-");
        }
        line.push_str(&"-".repeat(*w));
    }
    line.push('\n');
    line
}

#[derive(Serialize)]
struct JsonResult {
    module: String,
    success: bool,
    old_version: String,
    new_version: String,
    error: Option<String>,
    duration: String,
}

#[derive(Serialize)]
struct JsonReport {
    results: Vec<JsonResult>,
    total: usize,
    success_count: usize,
    error_count: usize,
    total_duration: String,
}

fn render_json(results: &[ExecutionResult]) -> String {
    let total_duration: Duration = results.iter().map(|r| r.duration).sum();
    let success_count = results.iter().filter(|r| r.success).count();
    let report = JsonReport {
        results: results
            .iter()
            .map(|r| JsonResult {
                module: r.module.name.clone(),
                success: r.success,
                old_version: r.old_version.clone(),
                new_version: r.new_version.clone(),
                error: r.error.as_ref().map(|e| e.to_string()),
                duration: humanize_duration(r.duration),
            })
            .collect(),
        total: results.len(),
        success_count,
        error_count: results.len() - success_count,
        total_duration: humanize_duration(total_duration),
    };
    serde_json::to_string(&report).unwrap_or_else(|_| "{}".to_string())
}

/// Renders a duration as a human string (`"123ms"`, `"1.5s"`) rather than a
/// raw `Debug` dump of `Duration`.
fn humanize_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Module;
    use crate::error::Error;
    use std::path::PathBuf;

    fn result(name: &str, success: bool) -> ExecutionResult {
        ExecutionResult {
            module: Module {
                name: name.to_string(),
                path: PathBuf::from(format!("/ws/{name}/.version")),
                rel_path: PathBuf::from(name),
                dir: PathBuf::from(format!("/ws/{name}")),
                current_version: "1.0.0".to_string(),
            },
            success,
            old_version: "1.0.0".to_string(),
            new_version: if success { "1.0.1".to_string() } else { "1.0.0".to_string() },
            error: if success { None } else { Some(Error::InvalidInput("boom".to_string())) },
            duration: Duration::from_millis(42),
        }
    }

    #[test]
    fn text_includes_summary_line() {
        let results = vec![result("a", true), result("b", false)];
        let text = render_text(&results);
        assert!(text.contains("[ok] a: 1.0.0 -> 1.0.1"));
        assert!(text.contains("[error] b"));
        assert!(text.ends_with("2 module(s): 1 ok, 1 failed"));
    }

    #[test]
    fn table_columns_align_to_widest_cell() {
        let results = vec![result("a", true), result("longer-module-name", false)];
        let table = render_table(&results);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0].find('|'), lines[2].find('|'));
        assert_eq!(lines[0].find('|'), lines[3].find('|'));
    }

    #[test]
    fn json_exposes_aggregate_counts() {
        let results = vec![result("a", true), result("b", false)];
        let json = render_json(&results);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["total"], 2);
        assert_eq!(parsed["success_count"], 1);
        assert_eq!(parsed["error_count"], 1);
        assert!(parsed["results"].as_array().unwrap().len() == 2);
    }

    #[test]
    fn humanize_duration_switches_units_at_one_second() {
        assert_eq!(humanize_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(humanize_duration(Duration::from_millis(1500)), "1.5s");
    }
}
