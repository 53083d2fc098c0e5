//! Tab-separated export of the binding table.

use crate::bindings::ValueSetRow;

const COLUMNS: &[&str] = &[
    "valueset_name",
    "valueset_title",
    "valueset_url",
    "expansion_count",
    "profile_names",
    "profile_titles",
    "profile_urls",
];

/// One header line, then one line per ValueSet. Profile columns hold
/// comma-separated lists in the same order.
pub fn binding_tsv(rows: &[ValueSetRow]) -> String {
    let mut out = COLUMNS.join("\t");
    out.push('\n');
    for row in rows {
        let names: Vec<&str> = row.profiles.iter().map(|p| p.name.as_str()).collect();
        let titles: Vec<&str> = row.profiles.iter().map(|p| p.title.as_str()).collect();
        let urls: Vec<&str> = row.profiles.iter().map(|p| p.url.as_str()).collect();
        let fields = [
            field(row.name()),
            field(&row.title),
            field(&row.url),
            row.expansion_count.map(|c| c.to_string()).unwrap_or_default(),
            field(&names.join(", ")),
            field(&titles.join(", ")),
            field(&urls.join(", ")),
        ];
        out.push_str(&fields.join("\t"));
        out.push('\n');
    }
    out
}

/// Tabs and line breaks would split the record.
fn field(text: &str) -> String {
    text.replace(['\t', '\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::ProfileRef;

    #[test]
    fn one_line_per_value_set() {
        let rows = vec![ValueSetRow {
            title: "Marital\tStatus".into(),
            url: "http://hl7.org/fhir/ValueSet/marital-status|4.0.1".into(),
            expansion_count: None,
            profiles: vec![
                ProfileRef {
                    name: "A".into(),
                    title: "Profile A".into(),
                    url: "http://x/a".into(),
                },
                ProfileRef {
                    name: "B".into(),
                    title: "Profile B".into(),
                    url: "http://x/b".into(),
                },
            ],
        }];

        let tsv = binding_tsv(&rows);
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines.len(), 2);
        let fields: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(fields.len(), COLUMNS.len());
        assert_eq!(fields[0], "marital-status|4.0.1");
        assert_eq!(fields[1], "Marital Status");
        assert_eq!(fields[3], "");
        assert_eq!(fields[6], "http://x/a, http://x/b");
    }
}
