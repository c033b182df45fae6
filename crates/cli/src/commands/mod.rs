pub mod analyze;
pub mod average;
pub mod combined;
pub mod dynamics;
pub mod infection;
pub mod peaks;
pub mod plaque;
pub mod stems;
pub mod sweep;

use std::path::{Path, PathBuf};

use dipfig_shared::config::GroupingConfig;

pub(crate) fn grouping(tag: &str, allow: Option<Vec<u32>>) -> GroupingConfig {
    GroupingConfig {
        tag: tag.to_string(),
        allow,
        ..GroupingConfig::default()
    }
}

/// `dir/stem.png` and `dir/stem.svg`.
pub(crate) fn figure_paths(dir: &Path, stem: &str) -> [PathBuf; 2] {
    [
        dir.join(format!("{stem}.png")),
        dir.join(format!("{stem}.svg")),
    ]
}

pub(crate) fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    if !dir.as_os_str().is_empty() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}
