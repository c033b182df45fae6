use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dipfig_shared::config::GroupingConfig;
use dipfig_shared::tag::{is_numbered_run_dir, parse_replicate_suffix, TagPattern};

#[derive(Debug, thiserror::Error)]
#[error("cannot list {path}: {source}")]
pub struct DiscoverError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

fn child_dirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, DiscoverError> {
    let entries = fs::read_dir(dir).map_err(|source| DiscoverError {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut dirs: Vec<(String, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?.to_string();
            Some((name, p))
        })
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Run files of every tagged child directory of `root`, grouped by tag value.
///
/// Directories whose value is not in the allow-list are skipped. The run file
/// is not checked for existence here; loading reports missing files.
pub fn discover_runs(
    root: &Path,
    config: &GroupingConfig,
) -> Result<BTreeMap<u32, Vec<PathBuf>>, DiscoverError> {
    let pattern = TagPattern::new(&config.tag);
    let mut groups: BTreeMap<u32, Vec<PathBuf>> = BTreeMap::new();
    for (name, dir) in child_dirs(root)? {
        let Some(key) = pattern.parse(&name) else {
            continue;
        };
        if !config.allows(key) {
            tracing::trace!(%name, key, "not in allow-list");
            continue;
        }
        groups.entry(key).or_default().push(dir.join(&config.run_file));
    }
    tracing::debug!(root = %root.display(), groups = groups.len(), "discovered runs");
    Ok(groups)
}

/// Numbered simulation directories (`<n>_..<TAG><v>..`) inside `dir`, with
/// their tag value, sorted by name.
pub fn numbered_runs(
    dir: &Path,
    pattern: &TagPattern,
) -> Result<Vec<(u32, PathBuf)>, DiscoverError> {
    Ok(child_dirs(dir)?
        .into_iter()
        .filter(|(name, _)| is_numbered_run_dir(name))
        .filter_map(|(name, path)| Some((pattern.parse(&name)?, path)))
        .collect())
}

pub fn sweep_groups(
    root: &Path,
    config: &GroupingConfig,
) -> Result<BTreeMap<u32, Vec<PathBuf>>, DiscoverError> {
    let pattern = TagPattern::new(&config.tag);
    let mut groups: BTreeMap<u32, Vec<PathBuf>> = BTreeMap::new();
    for (key, dir) in numbered_runs(root, &pattern)? {
        if config.allows(key) {
            groups.entry(key).or_default().push(dir.join(&config.run_file));
        }
    }
    Ok(groups)
}

/// Replicate experiment directories named `<base>` or `<base>_<n>`, looked
/// up both inside `root/<base>` and next to it in `root`.
///
/// Returns `(replicate_id, path)` pairs sorted by path, without duplicates.
pub fn replicate_dirs(root: &Path, base: &str) -> Result<Vec<(u32, PathBuf)>, DiscoverError> {
    let mut found: Vec<PathBuf> = Vec::new();
    let nested = root.join(base);
    for dir in [nested.as_path(), root] {
        if !dir.is_dir() {
            continue;
        }
        for (name, path) in child_dirs(dir)? {
            if name.starts_with(base) {
                found.push(path);
            }
        }
    }
    found.sort();
    found.dedup();

    let mut out = Vec::with_capacity(found.len());
    for path in found {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        match parse_replicate_suffix(name, base) {
            Some(id) => out.push((id, path)),
            None => tracing::warn!(dir = %path.display(), "cannot determine replicate id"),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_groups_and_filters() {
        let tmp = tempfile::tempdir().unwrap();
        for name in [
            "2_Dinit0_DIPBst200_x",
            "1_Dinit0_DIPBst100_x",
            "3_Dinit0_DIPBst100_y",
            "notes",
        ] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        fs::write(tmp.path().join("DIPBst500.txt"), "file, not dir").unwrap();

        let config = GroupingConfig::default();
        let groups = discover_runs(tmp.path(), &config).unwrap();
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![100, 200]);
        let hundred = &groups[&100];
        assert_eq!(hundred.len(), 2);
        assert!(hundred[0].starts_with(tmp.path().join("1_Dinit0_DIPBst100_x")));
        assert!(hundred[0].ends_with("simulation_output.csv"));

        let filtered = GroupingConfig {
            allow: Some(vec![200]),
            ..GroupingConfig::default()
        };
        let groups = discover_runs(tmp.path(), &filtered).unwrap();
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![200]);
    }

    #[test]
    fn test_missing_root_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = discover_runs(&tmp.path().join("absent"), &GroupingConfig::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_replicate_dirs_nested_and_sibling() {
        let tmp = tempfile::tempdir().unwrap();
        let base = "exp_option1";
        fs::create_dir_all(tmp.path().join(base).join("exp_option1_2")).unwrap();
        fs::create_dir(tmp.path().join("exp_option1_3")).unwrap();
        fs::create_dir(tmp.path().join("other")).unwrap();

        let reps = replicate_dirs(tmp.path(), base).unwrap();
        let ids: Vec<u32> = reps.iter().map(|(id, _)| *id).collect();
        // root/exp_option1 itself is replicate 1.
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&1) && ids.contains(&2) && ids.contains(&3));
    }

    #[test]
    fn test_numbered_runs() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["10_DIPBst300_a", "DIPBst400_b", "x_DIPBst500"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        let runs = numbered_runs(tmp.path(), &TagPattern::new("DIPBst")).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].0, 300);
    }

    #[test]
    fn test_sweep_groups_skip_unnumbered() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["1_DIPBst100", "DIPBst200", "2_DIPBst300"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        let config = GroupingConfig {
            allow: Some(vec![100, 200]),
            ..GroupingConfig::default()
        };
        let groups = sweep_groups(tmp.path(), &config).unwrap();
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![100]);
        assert!(groups[&100][0].ends_with("simulation_output.csv"));
    }
}
