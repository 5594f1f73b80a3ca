use csv_loader::LoadReport;
use serde::Serialize;

/// Structured result returned to the invoker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl LoadResponse {
    /// 200 when every row was written, 207 when best-effort loading left rows behind.
    pub fn from_report(report: &LoadReport) -> Self {
        if report.is_complete() {
            Self {
                status_code: 200,
                body: "uploaded".to_string(),
            }
        } else {
            Self {
                status_code: 207,
                body: format!(
                    "uploaded {} rows, {} failed",
                    report.rows_written, report.failed_rows
                ),
            }
        }
    }
}
