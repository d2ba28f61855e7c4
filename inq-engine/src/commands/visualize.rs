//! `visualize` command: hierarchy of owned assets as a JSON tree
//!
//! The tree is rooted at a synthetic `root` node. Each owned asset hangs
//! under its parent asset, or under the root when it has none. Leaves carry
//! `size: 1` instead of `children`.

use crate::assets::{Asset, AssetRef};
use crate::commands::dump::write_json;
use crate::error::InqResult;
use crate::hierarchy::Hierarchy;
use crate::ownership::owned_assets;
use crate::repository::IntelligenceRepository;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default report file name, written next to the database
pub const REPORT_FILE_NAME: &str = "report.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<VisualNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl VisualNode {
    fn new(name: String, children: Vec<VisualNode>) -> Self {
        if children.is_empty() {
            Self {
                name,
                children: None,
                size: Some(1),
            }
        } else {
            Self {
                name,
                children: Some(children),
                size: None,
            }
        }
    }
}

/// Build the hierarchy tree of every owned asset
pub async fn visualize(repo: &IntelligenceRepository) -> InqResult<VisualNode> {
    let hierarchy = Hierarchy::load(repo).await?;

    let mut placed = Vec::new();
    for asset in owned_assets(repo).await? {
        let parent = hierarchy.parent_of(&asset).await?.map(|p| p.reference());
        placed.push((asset, parent));
    }

    let mut visited = HashSet::new();
    Ok(VisualNode::new(
        "root".to_string(),
        children_of(None, &placed, &mut visited),
    ))
}

fn children_of(
    parent: Option<&AssetRef>,
    placed: &[(Asset, Option<AssetRef>)],
    visited: &mut HashSet<AssetRef>,
) -> Vec<VisualNode> {
    let mut children = Vec::new();
    for (asset, asset_parent) in placed {
        if asset_parent.as_ref() != parent {
            continue;
        }
        let reference = asset.reference();
        if !visited.insert(reference.clone()) {
            continue;
        }
        let grandchildren = children_of(Some(&reference), placed, visited);
        children.push(VisualNode::new(asset.to_string(), grandchildren));
    }
    children
}

/// Write the tree to `path`
pub async fn visualize_to(repo: &IntelligenceRepository, path: &Path) -> InqResult<()> {
    let tree = visualize(repo).await?;
    let value = serde_json::to_value(&tree)?;
    let file = std::fs::File::create(path)?;
    write_json(&value, std::io::BufWriter::new(file))?;
    tracing::info!(path = %path.display(), "Wrote hierarchy report");
    Ok(())
}
