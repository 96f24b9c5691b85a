use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

/// Helper function to run fluxion with arguments and optional stdin input
fn run_fluxion(args: &[&str], stdin: Option<&str>) -> Result<Vec<u8>, String> {
    let mut child = Command::new("cargo")
        .args(["run", "--quiet", "--bin", "fluxion", "--"])
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to spawn process: {}", e))?;

    if let Some(mut handle) = child.stdin.take() {
        if let Some(input) = stdin {
            handle
                .write_all(input.as_bytes())
                .map_err(|e| format!("Failed to write to stdin: {}", e))?;
        }
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("Failed to wait for process: {}", e))?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

fn render_json(args: &[&str]) -> serde_json::Value {
    let mut full = vec!["render", "--format", "json"];
    full.extend_from_slice(args);
    let bytes = run_fluxion(&full, None).expect("render failed");
    serde_json::from_slice(&bytes).expect("output is not JSON")
}

#[test]
fn test_end_to_end_bar_chart_from_csv() {
    let csv = fs::read_to_string("test/sales.csv").expect("Failed to read test CSV");
    let result = run_fluxion(
        &["render", "--csv", "--kind", "bar", "-x", "month", "-y", "revenue"],
        Some(&csv),
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(is_valid_png(&result.unwrap()), "Output is not a valid PNG");
}

#[test]
fn test_end_to_end_line_chart_from_upload_response() {
    let result = run_fluxion(
        &[
            "render",
            "--input",
            "test/upload_response.json",
            "--kind",
            "line",
            "-x",
            "day",
            "-y",
            "temp",
            "--palette",
            "purple",
        ],
        None,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(is_valid_png(&result.unwrap()));
}

#[test]
fn test_end_to_end_scatter_chart() {
    let result = run_fluxion(
        &[
            "render", "--csv", "-i", "test/sales.csv", "--kind", "scatter", "-x", "units", "-y",
            "revenue",
        ],
        None,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(is_valid_png(&result.unwrap()));
}

#[test]
fn test_end_to_end_pie_chart_svg() {
    let result = run_fluxion(
        &[
            "render",
            "--csv",
            "-i",
            "test/sales.csv",
            "--kind",
            "pie",
            "--value",
            "revenue",
            "--label",
            "region",
            "--palette",
            "rainbow",
            "--title",
            "Revenue by region",
            "--format",
            "svg",
        ],
        None,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    let svg = String::from_utf8(result.unwrap()).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("Revenue by region"));
}

#[test]
fn test_options_file_selects_svg() {
    let result = run_fluxion(
        &[
            "render",
            "-i",
            "test/upload_response.json",
            "-x",
            "day",
            "-y",
            "temp",
            "--options",
            "test/options.json",
        ],
        None,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    let svg = String::from_utf8(result.unwrap()).unwrap();
    assert!(svg.contains("<svg"));
}

#[test]
fn test_json_output_axis_series() {
    let chart = render_json(&["-i", "test/upload_response.json", "-x", "day", "-y", "temp"]);
    assert_eq!(chart["kind"], "bar");
    assert_eq!(
        chart["labels"],
        serde_json::json!(["Mon", "Tue", "Wed", "Fri"])
    );
    assert_eq!(chart["values"], serde_json::json!([21.5, 19.0, 0.0, 24.5]));
    assert_eq!(chart["colors"].as_array().unwrap().len(), 4);
}

#[test]
fn test_json_output_pie_drops_non_numeric() {
    let chart = render_json(&[
        "--csv",
        "-i",
        "test/sales.csv",
        "--kind",
        "pie",
        "--value",
        "revenue",
        "--label",
        "region",
    ]);
    assert_eq!(
        chart["labels"],
        serde_json::json!(["North", "South", "West", "North"])
    );
    assert_eq!(
        chart["values"],
        serde_json::json!([1200.0, 980.5, 1430.0, 1105.0])
    );
}

#[test]
fn test_json_output_cycles_palette() {
    let chart = render_json(&[
        "--csv",
        "-i",
        "test/sales.csv",
        "-x",
        "month",
        "-y",
        "units",
        "--palette",
        "blue",
    ]);
    let colors = chart["colors"].as_array().unwrap();
    assert_eq!(colors.len(), 6);
    assert_eq!(colors[5], colors[0]);
}

#[test]
fn test_header_only_csv_renders_empty_chart() {
    let csv = fs::read_to_string("test/header_only.csv").expect("Failed to read test CSV");
    let result = run_fluxion(
        &["render", "--csv", "-x", "month", "-y", "revenue"],
        Some(&csv),
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(is_valid_png(&result.unwrap()));
}

#[test]
fn test_unknown_column_error() {
    let result = run_fluxion(
        &["render", "--csv", "-i", "test/sales.csv", "-x", "month", "-y", "profit"],
        None,
    );
    let err = result.unwrap_err();
    assert!(err.contains("'profit' not found"), "stderr: {}", err);
}

#[test]
fn test_missing_roles_error() {
    let result = run_fluxion(
        &[
            "render", "--csv", "-i", "test/sales.csv", "--kind", "pie", "--value", "revenue",
        ],
        None,
    );
    let err = result.unwrap_err();
    assert!(err.contains("needs columns for: label"), "stderr: {}", err);
}

#[test]
fn test_unknown_chart_kind_error() {
    let result = run_fluxion(
        &["render", "--csv", "-i", "test/sales.csv", "--kind", "radar"],
        None,
    );
    let err = result.unwrap_err();
    assert!(err.contains("Unknown chart type 'radar'"), "stderr: {}", err);
}

#[test]
fn test_preview_pages() {
    let out = run_fluxion(&["preview", "--csv", "-i", "test/sales.csv"], None).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("sales.csv\n6 rows, 4 columns"));
    assert!(text.contains("month\trevenue\tregion\tunits"));
    assert!(text.contains("May\t1105\tNorth\t27"));
    assert!(!text.contains("Jun"));
    assert!(text.contains("... 1 more preview rows"));

    let out = run_fluxion(&["preview", "--csv", "-i", "test/sales.csv", "--pages", "2"], None)
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Jun\t1620\t\t35"));
    assert!(!text.contains("more preview rows"));
}

#[test]
fn test_check_command() {
    let out = run_fluxion(&["check", "test/sales.csv"], None).unwrap();
    assert!(String::from_utf8(out).unwrap().contains("ready to upload"));

    let err = run_fluxion(&["check", "test/notes.txt"], None).unwrap_err();
    assert!(err.contains("Invalid file type"), "stderr: {}", err);
}

#[test]
fn test_output_file_extension_picks_format() {
    let path = std::env::temp_dir().join("fluxion_output_test.svg");
    let _ = fs::remove_file(&path);
    let path_str = path.to_string_lossy().to_string();

    let out = run_fluxion(
        &[
            "render", "--csv", "-i", "test/sales.csv", "-x", "month", "-y", "units", "-o",
            &path_str,
        ],
        None,
    )
    .unwrap();
    assert!(out.is_empty());

    let svg = fs::read_to_string(&path).expect("chart file was not written");
    assert!(svg.contains("<svg"));
    let _ = fs::remove_file(&path);
}

#[test]
fn test_end_to_end_pdf_export() {
    let result = run_fluxion(
        &[
            "render", "--csv", "-i", "test/sales.csv", "--kind", "line", "-x", "month", "-y",
            "revenue", "--format", "pdf",
        ],
        None,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(result.unwrap().starts_with(b"%PDF"));
}

#[test]
fn test_oversized_canvas_error() {
    let result = run_fluxion(
        &[
            "render", "--csv", "-i", "test/sales.csv", "-x", "month", "-y", "revenue",
            "--width", "70000", "--height", "70000",
        ],
        None,
    );
    let err = result.unwrap_err();
    assert!(err.contains("exceeds the limit"), "stderr: {}", err);
}
