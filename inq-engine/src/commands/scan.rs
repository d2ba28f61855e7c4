//! `scan` command: resolve sources from configuration and run a scan

use crate::config::{resolve_scan_settings, resolve_sources_config, ScanOverrides};
use crate::error::InqResult;
use crate::repository::IntelligenceRepository;
use crate::scan::{ScanReport, Scanner};
use crate::sources::build_sources;
use inq_common::config::TomlConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn scan(
    repo: Arc<IntelligenceRepository>,
    overrides: &ScanOverrides,
    toml: &TomlConfig,
    cancel: CancellationToken,
) -> InqResult<ScanReport> {
    let sources = build_sources(&resolve_sources_config(overrides, toml));
    let settings = resolve_scan_settings(overrides, toml);
    Scanner::new(repo, sources, settings, cancel).run().await
}
