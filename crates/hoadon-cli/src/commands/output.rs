//! Rendering extraction results as JSON, CSV or text.

use serde::Serialize;

use hoadon_core::{ExtractionResult, Line};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// One line record in `--lines` output.
#[derive(Serialize)]
struct LineRecord<'a> {
    line_text: &'a str,
    bbox: [f32; 4],
}

#[derive(Serialize)]
struct WithLines<'a> {
    #[serde(flatten)]
    fields: &'a ExtractionResult,
    lines: Vec<LineRecord<'a>>,
}

pub const CSV_HEADER: [&str; 4] = ["date", "total", "address", "phone"];

/// Render `fields`, adding line records when `lines` is given.
pub fn format_result(
    fields: &ExtractionResult,
    lines: Option<&[Line]>,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => match lines {
            Some(lines) => Ok(serde_json::to_string_pretty(&WithLines {
                fields,
                lines: line_records(lines),
            })?),
            None => Ok(serde_json::to_string_pretty(fields)?),
        },
        OutputFormat::Csv => format_csv(fields),
        OutputFormat::Text => Ok(format_text(fields, lines)),
    }
}

fn line_records(lines: &[Line]) -> Vec<LineRecord<'_>> {
    lines
        .iter()
        .map(|line| LineRecord {
            line_text: line.text(),
            bbox: line.bbox().to_array(),
        })
        .collect()
}

/// The four field columns, empty when absent.
pub fn csv_fields(fields: &ExtractionResult) -> [String; 4] {
    [
        fields.date.clone().unwrap_or_default(),
        fields.total.clone().unwrap_or_default(),
        fields.address.clone().unwrap_or_default(),
        fields.phone.clone().unwrap_or_default(),
    ]
}

fn format_csv(fields: &ExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;
    wtr.write_record(csv_fields(fields))?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(fields: &ExtractionResult, lines: Option<&[Line]>) -> String {
    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    let mut output = String::new();
    output.push_str(&format!("Date:    {}\n", show(&fields.date)));
    output.push_str(&format!("Total:   {}\n", show(&fields.total)));
    output.push_str(&format!("Address: {}\n", show(&fields.address)));
    output.push_str(&format!("Phone:   {}\n", show(&fields.phone)));

    if let Some(lines) = lines {
        output.push_str("\nLines:\n");
        for line in lines {
            output.push_str(&format!("  {}\n", line.text()));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoadon_core::{BoundingBox, Fragment, group_into_lines};

    fn sample() -> ExtractionResult {
        ExtractionResult {
            date: Some("05/10/2023".to_string()),
            total: Some("58500".to_string()),
            address: None,
            phone: Some("0912345678".to_string()),
            raw_text: "Ngày: 05/10/2023".to_string(),
        }
    }

    #[test]
    fn test_json_is_extraction_result() {
        let out = format_result(&sample(), None, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["total"], "58500");
        assert!(value["address"].is_null());
        assert!(value.get("lines").is_none());
    }

    #[test]
    fn test_json_with_lines() {
        let bbox = BoundingBox::new(0.0, 0.0, 80.0, 20.0).unwrap();
        let lines = group_into_lines(vec![Fragment::new(bbox, "Ngày: 05/10/2023")], 30.0);

        let out = format_result(&sample(), Some(&lines), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["date"], "05/10/2023");
        assert_eq!(value["lines"][0]["line_text"], "Ngày: 05/10/2023");
        assert_eq!(value["lines"][0]["bbox"][2], 80.0);
    }

    #[test]
    fn test_csv_leaves_absent_fields_empty() {
        let out = format_result(&sample(), None, OutputFormat::Csv).unwrap();
        assert_eq!(
            out,
            "date,total,address,phone\n05/10/2023,58500,,0912345678\n"
        );
    }

    #[test]
    fn test_text_marks_absent_fields() {
        let out = format_result(&sample(), None, OutputFormat::Text).unwrap();
        assert!(out.contains("Address: -"));
        assert!(out.contains("Total:   58500"));
    }
}
