//! Output directory layout.
//!
//! When caller metadata carries both `short_name` and `start_time`, the
//! artifact stem lands under `<root>/<short_name>/<YYYY>/<MM>/<DD>/`;
//! otherwise directly under the root. Date components are always formatted
//! from UTC. The metadata itself stays opaque; only these two fields are
//! read, with a real JSON parser.

use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};

/// Compute the artifact stem (path without extension) for an upload.
#[must_use]
pub fn output_stem(output_root: &Path, metadata: Option<&str>, basename: &str) -> PathBuf {
    let stem = basename.strip_suffix(".p25").unwrap_or(basename);

    if let Some(dated) = dated_dir(output_root, metadata) {
        return dated.join(stem);
    }

    output_root.join(stem)
}

fn dated_dir(root: &Path, metadata: Option<&str>) -> Option<PathBuf> {
    let value: serde_json::Value = serde_json::from_str(metadata?).ok()?;

    let short_name = value.get("short_name")?.as_str()?;
    if short_name.is_empty() || short_name.contains(['/', '\\', '.']) {
        return None;
    }

    let start_time = value.get("start_time")?.as_i64()?;
    let when = Utc.timestamp_opt(start_time, 0).single()?;

    Some(
        root.join(short_name)
            .join(when.format("%Y").to_string())
            .join(when.format("%m").to_string())
            .join(when.format("%d").to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_layout_from_metadata() {
        let meta = "{\"short_name\": \"SYS1\", \"start_time\": 1700000000, \"talkgroup\": 42}";
        let stem = output_stem(Path::new("/out"), Some(meta), "call_1.p25");
        // 1700000000 is 2023-11-14 UTC.
        assert_eq!(stem, PathBuf::from("/out/SYS1/2023/11/14/call_1"));
    }

    #[test]
    fn missing_fields_fall_back_to_root() {
        let meta = "{\"talkgroup\": 42}";
        assert_eq!(
            output_stem(Path::new("/out"), Some(meta), "call.p25"),
            PathBuf::from("/out/call")
        );
        assert_eq!(
            output_stem(Path::new("/out"), None, "call.p25"),
            PathBuf::from("/out/call")
        );
    }

    #[test]
    fn unparseable_metadata_falls_back_to_root() {
        assert_eq!(
            output_stem(Path::new("/out"), Some("{not json"), "call.p25"),
            PathBuf::from("/out/call")
        );
    }

    #[test]
    fn hostile_short_name_is_ignored() {
        let meta = "{\"short_name\": \"../evil\", \"start_time\": 1700000000}";
        assert_eq!(
            output_stem(Path::new("/out"), Some(meta), "call.p25"),
            PathBuf::from("/out/call")
        );
    }

    #[test]
    fn extension_is_stripped_once() {
        assert_eq!(
            output_stem(Path::new("/out"), None, "weird.name.p25"),
            PathBuf::from("/out/weird.name")
        );
        assert_eq!(
            output_stem(Path::new("/out"), None, "noext"),
            PathBuf::from("/out/noext")
        );
    }
}
