//! Local persistence for the mean-price report.

use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::aggregate::MeanPriceReport;

/// Writes the report as pretty-printed JSON to `path`.
pub fn write_report(path: impl AsRef<Path>, report: &MeanPriceReport) -> Result<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Writing JSON report");

    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use std::env;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_write_report_creates_file() {
        let path = temp_path("fipe_price_report_test_write.json");
        let _ = fs::remove_file(&path); // clean up any prior run

        let input = "anoModelo,marca,valor\n2020,Fiat,100.0\n";
        let report = aggregate(input.as_bytes()).unwrap();
        write_report(&path, &report).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"2020\""));
        assert!(content.contains("\"Fiat\": 100.0"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_report_is_valid_json() {
        let path = temp_path("fipe_price_report_test_json.json");
        let _ = fs::remove_file(&path);

        let input = "anoModelo,marca,valor\n2019,Zeta,1.0\n2019,Acme,2.0\n";
        let report = aggregate(input.as_bytes()).unwrap();
        write_report(&path, &report).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["2019"]["Acme"], 2.0);
        assert_eq!(parsed["2019"]["Zeta"], 1.0);

        fs::remove_file(&path).unwrap();
    }
}
