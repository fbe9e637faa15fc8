use crate::domain::report::MergedReport;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

/// Writes the report as CSV. The header is always written, so an empty report is still a
/// valid table.
pub fn write_report<W: Write>(report: &MergedReport, out: W) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer
        .write_record(MergedReport::COLUMNS)
        .context("write report header failed")?;
    for row in &report.rows {
        writer.serialize(row).context("write report row failed")?;
    }
    writer.flush().context("flush report failed")?;
    Ok(())
}

pub fn render_csv(report: &MergedReport) -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_report(report, &mut buf)?;
    Ok(buf)
}

pub fn write_report_csv(report: &MergedReport, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_report(report, file)?;
    tracing::info!(path = %path.display(), rows = report.len(), "wrote recommendation report");
    Ok(())
}
