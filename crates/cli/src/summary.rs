use engine::{Completeness, Detail, Report, ScanStatus};
use std::io::{self, Write};

/// Writes the summary report in the engine's own console layout.
pub fn write_report(out: &mut impl Write, report: &Report) -> io::Result<()> {
    writeln!(out, "PID: {}", report.pid)?;
    if report.status() == ScanStatus::NotPerformed {
        return writeln!(out, "Scan not performed: the process could not be opened");
    }

    let bitness = if report.is_64bit { 64 } else { 32 };
    writeln!(out, "Bitness: {bitness}")?;
    if report.is_managed {
        writeln!(out, "Managed: yes")?;
    }
    if report.is_reflection {
        writeln!(out, "Scanned on reflection")?;
    }
    writeln!(out, "---")?;
    writeln!(out, "SUMMARY:")?;
    writeln!(out)?;
    writeln!(out, "Total scanned:      {}", report.scanned)?;
    writeln!(out, "Skipped:            {}", report.skipped)?;
    writeln!(out, "-")?;
    writeln!(out, "Hooked:             {}", report.patched)?;
    writeln!(out, "Replaced:           {}", report.replaced)?;
    writeln!(out, "Hdrs Modified:      {}", report.hdr_modified)?;
    writeln!(out, "IAT Hooks:          {}", report.iat_hooked)?;
    writeln!(out, "Implanted:          {}", report.implanted)?;
    writeln!(out, "Implanted PE:       {}", report.implanted_pe)?;
    writeln!(out, "Implanted shc:      {}", report.implanted_shc)?;
    writeln!(out, "Unreachable files:  {}", report.unreachable_file)?;
    writeln!(out, "Other:              {}", report.other)?;
    writeln!(out, "-")?;
    writeln!(out, "Total suspicious:   {}", report.suspicious)?;
    if let ScanStatus::Partial { errors } = report.status() {
        writeln!(out, "[!] Errors:         {errors}")?;
    }
    writeln!(out, "---")
}

/// Writes the detail text, noting when only a prefix was retrieved.
pub fn write_detail(out: &mut impl Write, detail: &Detail) -> io::Result<()> {
    if detail.is_empty() && !detail.is_truncated() {
        return Ok(());
    }
    out.write_all(detail.as_bytes())?;
    writeln!(out)?;
    if let Completeness::Truncated { needed, capacity } = detail.completeness() {
        writeln!(
            out,
            "[!] Report truncated: {capacity} of {needed} bytes, rerun with --max-detail-size {needed} or --refetch"
        )?;
    }
    Ok(())
}
