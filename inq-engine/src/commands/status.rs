//! `status` command: asset counts per kind
//!
//! Strong mode counts explicit classifications (accepted, unknown,
//! rejected). Weak mode counts inferred ownership (accepted, not accepted).

use crate::assets::{AssetKind, Ownership};
use crate::error::InqResult;
use crate::ownership::is_owned;
use crate::repository::IntelligenceRepository;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub kind: AssetKind,
    /// One count per non-total column
    pub counts: Vec<usize>,
}

impl StatusRow {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub strong: bool,
    pub rows: Vec<StatusRow>,
}

impl StatusReport {
    pub fn headers(&self) -> &'static [&'static str] {
        if self.strong {
            &["Asset", "Accepted", "Unknown", "Rejected", "Total"]
        } else {
            &["Asset", "Accepted", "Not Accepted", "Total"]
        }
    }

    pub fn row(&self, kind: AssetKind) -> Option<&StatusRow> {
        self.rows.iter().find(|r| r.kind == kind)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers = self.headers();
        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![row.kind.label().to_string()];
                cells.extend(row.counts.iter().map(usize::to_string));
                cells.push(row.total().to_string());
                cells
            })
            .collect();

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| body.iter().map(|r| r[i].len()).chain([h.len()]).max().unwrap_or(0))
            .collect();

        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("  "))?;
        let header: Vec<String> = headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| format!("{:<w$}", h, w = w))
            .collect();
        writeln!(f, "{}", header.join("  ").trim_end())?;
        writeln!(f, "{}", rule.join("  "))?;

        for row in body {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (cell, w))| {
                    if i == 0 {
                        format!("{:<w$}", cell, w = w)
                    } else {
                        format!("{:>w$}", cell, w = w)
                    }
                })
                .collect();
            writeln!(f, "{}", cells.join("  "))?;
        }
        write!(f, "{}", rule.join("  "))
    }
}

/// Count stored assets per kind
pub async fn status(repo: &IntelligenceRepository, strong: bool) -> InqResult<StatusReport> {
    let mut rows = Vec::with_capacity(AssetKind::ALL.len());

    for spec in repo.registry().iter() {
        let assets = repo.assets_of_kind(spec.kind).await?;
        let counts = if strong {
            let count = |o: Ownership| assets.iter().filter(|a| a.ownership() == o).count();
            vec![
                count(Ownership::Accepted),
                count(Ownership::Unknown),
                count(Ownership::Rejected),
            ]
        } else {
            let mut owned = 0;
            for asset in &assets {
                if is_owned(asset, repo).await? {
                    owned += 1;
                }
            }
            vec![owned, assets.len() - owned]
        };
        rows.push(StatusRow {
            kind: spec.kind,
            counts,
        });
    }

    Ok(StatusReport { strong, rows })
}
