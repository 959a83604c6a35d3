use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::SinkError;
use crate::fusion::ConsolidatedReport;

pub const ARTIFACT_PREFIX: &str = "consolidated_analysis_";
pub const ARTIFACT_EXT: &str = "txt";

/// Base name used for the artifact: the input file name without its extension.
pub fn document_base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// `<out_dir>/consolidated_analysis_<base_name>.txt`
pub fn artifact_path(out_dir: &Path, base_name: &str) -> PathBuf {
    out_dir.join(format!("{}{}.{}", ARTIFACT_PREFIX, base_name, ARTIFACT_EXT))
}

/// Write the report, replacing any earlier artifact for the same document.
pub fn write_report(out_dir: &Path, report: &ConsolidatedReport) -> Result<PathBuf, SinkError> {
    let path = artifact_path(out_dir, &report.source_document_name);

    std::fs::create_dir_all(out_dir).map_err(|source| SinkError {
        path: out_dir.to_path_buf(),
        source,
    })?;
    std::fs::write(&path, &report.raw_text).map_err(|source| SinkError {
        path: path.clone(),
        source,
    })?;

    info!(
        path = %path.display(),
        bytes = report.raw_text.len(),
        degraded = report.fusion_failed,
        "Report saved"
    );
    Ok(path)
}
