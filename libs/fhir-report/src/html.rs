//! HTML rendering.
//!
//! Renderers take the generation timestamp as text so output is reproducible.

use crate::bindings::ValueSetRow;
use crate::membership::{CodeSystemRow, MembershipRow};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;
use txcheck_bindings::Outcome;

const BASE_STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
h1 { color: #2c3e50; }
h2 { color: #666; font-size: 14px; font-weight: normal; margin: 10px 0 20px 0; }
table { border-collapse: collapse; width: 100%; margin-top: 20px; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; vertical-align: top; }
th { background-color: #34495e; color: white; font-weight: bold; }
tr:nth-child(even) { background-color: #f9f9f9; }
a { color: #3498db; text-decoration: none; }
a:hover { text-decoration: underline; color: #2980b9; }
.info { background-color: #ecf0f1; padding: 15px; border-radius: 5px; margin: 15px 0; }
.status-check { background-color: #ffe5e5; }
.status-not-applicable { background-color: #f0f0f0; }
.status-excluded { background-color: #fff3e0; }
.status-fail { background-color: #ffe5e5; }
";

fn open_document(out: &mut String, title: &str) {
    let title = encode_text(title);
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>\n{BASE_STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n"
    );
}

fn close_document(out: &mut String) {
    out.push_str("</body>\n</html>\n");
}

fn link(url: &str, text: &str) -> String {
    format!(
        "<a href=\"{}\" target=\"_blank\">{}</a>",
        encode_double_quoted_attribute(url),
        encode_text(text)
    )
}

fn header_row(out: &mut String, columns: &[&str]) {
    out.push_str("<thead>\n<tr>");
    for column in columns {
        let _ = write!(out, "<th>{}</th>", encode_text(column));
    }
    out.push_str("</tr>\n</thead>\n");
}

fn cell(out: &mut String, text: &str) {
    let _ = write!(out, "<td>{}</td>", encode_text(text));
}

fn classed_cell(out: &mut String, class: Option<&str>, text: &str) {
    match class {
        Some(class) => {
            let _ = write!(out, "<td class=\"{class}\">{}</td>", encode_text(text));
        }
        None => cell(out, text),
    }
}

/// CSS class highlighting outcomes that need attention.
pub fn status_class(outcome: Outcome) -> Option<&'static str> {
    match outcome {
        Outcome::Pass => None,
        Outcome::Check => Some("status-check"),
        Outcome::NotApplicable => Some("status-not-applicable"),
        Outcome::Excluded => Some("status-excluded"),
    }
}

/// ValueSet → profile binding report.
pub fn binding_report(rows: &[ValueSetRow], criteria: &str, generated_on: &str) -> String {
    let mut out = String::new();
    open_document(&mut out, "FHIR Profile ValueSet Bindings Report");

    out.push_str("<div class=\"info\">\n");
    let _ = writeln!(
        out,
        "<p><strong>Generated on:</strong> {}</p>",
        encode_text(generated_on)
    );
    if !rows.is_empty() {
        let _ = writeln!(out, "<p><strong>Total ValueSets found:</strong> {}</p>", rows.len());
    }
    let _ = writeln!(out, "<p><strong>Criteria:</strong> {}</p>", encode_text(criteria));
    if rows.is_empty() {
        out.push_str(
            "<p>No ValueSet bindings meeting the criteria were found in the processed profiles.</p>\n",
        );
    }
    out.push_str("</div>\n");

    if !rows.is_empty() {
        out.push_str("<h2>ValueSet Bindings</h2>\n<table>\n");
        header_row(&mut out, &["ValueSet", "Expansion size", "Profiles"]);
        out.push_str("<tbody>\n");
        for row in rows {
            let profiles: Vec<String> = row
                .profiles
                .iter()
                .map(|p| link(&p.url, &p.title))
                .collect();
            let count = row
                .expansion_count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                link(&row.url, &row.title),
                count,
                profiles.join(", ")
            );
        }
        out.push_str("</tbody>\n</table>\n");
    }

    close_document(&mut out);
    out
}

const MEMBERSHIP_COLUMNS: &[&str] = &[
    "file",
    "source",
    "path",
    "binding_path",
    "system",
    "code",
    "valueset",
    "strength",
    "vs_result",
    "reason",
];

/// Example ValueSet membership report for one package.
pub fn membership_report(rows: &[MembershipRow], endpoint: &str, package: &str) -> String {
    let mut out = String::new();
    open_document(&mut out, "Example ValueSet Membership Checks");
    let _ = writeln!(out, "<h2>Terminology Server: {}</h2>", encode_text(endpoint));
    let _ = writeln!(out, "<h2>IG Package: {}</h2>", encode_text(package));

    if rows.is_empty() {
        out.push_str("<p>No checks performed or no matching bindings found.</p>\n");
        close_document(&mut out);
        return out;
    }

    out.push_str("<table>\n");
    header_row(&mut out, MEMBERSHIP_COLUMNS);
    out.push_str("<tbody>\n");
    for row in rows {
        out.push_str("<tr>");
        for text in [
            &row.file,
            &row.source,
            &row.path,
            &row.binding_path,
            &row.system,
            &row.code,
            &row.value_set,
            &row.strength,
        ] {
            cell(&mut out, text);
        }
        classed_cell(&mut out, status_class(row.outcome), row.outcome.as_str());
        cell(&mut out, &row.reason);
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
    close_document(&mut out);
    out
}

/// Flat CodeSystem check report for one package.
pub fn code_system_report(rows: &[CodeSystemRow], endpoint: &str, package: &str) -> String {
    let mut out = String::new();
    open_document(&mut out, "Example CodeSystem Checks");
    let _ = writeln!(out, "<h2>Terminology Server: {}</h2>", encode_text(endpoint));
    let _ = writeln!(out, "<h2>IG Package: {}</h2>", encode_text(package));

    if rows.is_empty() {
        out.push_str("<p>No codings found in the examples.</p>\n");
        close_document(&mut out);
        return out;
    }

    out.push_str("<table>\n");
    header_row(&mut out, &["file", "path", "code", "system", "result", "reason"]);
    out.push_str("<tbody>\n");
    for row in rows {
        out.push_str("<tr>");
        cell(&mut out, &row.file);
        cell(&mut out, &row.path);
        cell(&mut out, &row.code);
        cell(&mut out, &row.system);
        classed_cell(
            &mut out,
            row.is_failure().then_some("status-fail"),
            &row.result,
        );
        cell(&mut out, &row.reason);
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
    close_document(&mut out);
    out
}
