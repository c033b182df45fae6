use std::sync::OnceLock;

use regex::Regex;

fn replicate_suffix() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| Regex::new(r"_(\d+)$").expect("literal pattern"))
}

/// Compiled `<tag><digits>` matcher for directory and file names.
#[derive(Debug, Clone)]
pub struct TagPattern {
    tag: String,
    re: Regex,
}

impl TagPattern {
    pub fn new(tag: &str) -> Self {
        let re = Regex::new(&format!(r"{}(\d+)", regex::escape(tag)))
            .expect("escaped tag always compiles");
        Self {
            tag: tag.to_string(),
            re,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Value after the first occurrence of the tag, or `None` when the tag is
    /// absent, not followed by digits, or does not fit in a `u32`.
    pub fn parse(&self, name: &str) -> Option<u32> {
        let caps = self.re.captures(name)?;
        caps.get(1)?.as_str().parse().ok()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.parse(name).is_some()
    }

    /// Name a group summary file carries, e.g. `summary_DIPBst700.csv`.
    pub fn summary_file_name(&self, key: u32) -> String {
        format!("summary_{}{}.csv", self.tag, key)
    }
}

pub fn parse_tag(name: &str, tag: &str) -> Option<u32> {
    TagPattern::new(tag).parse(name)
}

/// Replicate id of an experiment directory: the trailing `_<n>`, or 1 for the
/// unsuffixed base directory.
pub fn parse_replicate_suffix(name: &str, base: &str) -> Option<u32> {
    if let Some(caps) = replicate_suffix().captures(name) {
        if let Some(id) = caps.get(1).and_then(|m| m.as_str().parse().ok()) {
            // The base name itself may end in digits (`..._option1`).
            if name != base {
                return Some(id);
            }
        }
    }
    if name.ends_with(base) {
        return Some(1);
    }
    None
}

/// Simulation directories are numbered: `<n>_Dinit0_DIPBst100_...`.
pub fn is_numbered_run_dir(name: &str) -> bool {
    let digits = name.bytes().take_while(|b| b.is_ascii_digit()).count();
    digits > 0 && name.as_bytes().get(digits) == Some(&b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const RUN_DIR: &str =
        "1_Dinit0_DIPBst100_noJ_Vinit1_VBst50_Global_mdbk_times502_tau95_ifnBothFold1.00_grid50";

    #[test]
    fn test_parse_known_names() {
        assert_eq!(parse_tag(RUN_DIR, "DIPBst"), Some(100));
        assert_eq!(parse_tag(RUN_DIR, "VBst"), Some(50));
        assert_eq!(parse_tag("summary_DIPBst700.csv", "DIPBst"), Some(700));
    }

    #[test]
    fn test_parse_missing_tag() {
        assert_eq!(parse_tag("output", "DIPBst"), None);
        assert_eq!(parse_tag("DIPBst_x", "DIPBst"), None);
        assert_eq!(parse_tag("DIPBst99999999999", "DIPBst"), None);
    }

    #[test]
    fn test_first_occurrence_wins() {
        assert_eq!(parse_tag("DIPBst5_DIPBst6", "DIPBst"), Some(5));
    }

    #[test]
    fn test_tag_is_literal() {
        assert_eq!(parse_tag("a.b7", "a.b"), Some(7));
        assert_eq!(parse_tag("axb7", "a.b"), None);
    }

    #[test]
    fn test_replicate_suffix() {
        let base = "IFNclr3_30runs_global_celltocell_tau95_option1";
        assert_eq!(parse_replicate_suffix(base, base), Some(1));
        assert_eq!(parse_replicate_suffix(&format!("{base}_2"), base), Some(2));
        assert_eq!(parse_replicate_suffix(&format!("{base}_17"), base), Some(17));
        assert_eq!(parse_replicate_suffix("unrelated", base), None);
    }

    #[test]
    fn test_numbered_run_dir() {
        assert!(is_numbered_run_dir(RUN_DIR));
        assert!(!is_numbered_run_dir("output"));
        assert!(!is_numbered_run_dir("12"));
    }

    #[test]
    fn test_summary_file_name() {
        assert_eq!(TagPattern::new("DIPBst").summary_file_name(650), "summary_DIPBst650.csv");
    }

    proptest! {
        #[test]
        fn prop_tag_then_digits_roundtrips(prefix in "[a-z_]{0,12}", value in 0u32..1_000_000, suffix in "(_[a-z]{0,8})?") {
            let name = format!("{prefix}DIPBst{value}{suffix}");
            prop_assert_eq!(parse_tag(&name, "DIPBst"), Some(value));
        }

        #[test]
        fn prop_no_tag_is_none(name in "[a-z0-9_]{0,40}") {
            prop_assume!(!name.contains("DIPBst"));
            prop_assert_eq!(parse_tag(&name, "DIPBst"), None);
        }
    }
}
