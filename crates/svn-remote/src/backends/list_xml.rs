//! Parser for `svn list --xml` output.

use std::time::SystemTime;

use chrono::DateTime;
use serde::Deserialize;

use crate::error::RemoteError;
use crate::models::NodeKind;

#[derive(Debug, Deserialize)]
struct Lists {
    #[serde(rename = "list", default)]
    lists: Vec<List>,
}

#[derive(Debug, Deserialize)]
struct List {
    #[serde(rename = "entry", default)]
    entries: Vec<EntryXml>,
}

#[derive(Debug, Deserialize)]
struct EntryXml {
    #[serde(rename = "@kind")]
    kind: String,
    name: String,
    size: Option<u64>,
    commit: Option<CommitXml>,
}

#[derive(Debug, Deserialize)]
struct CommitXml {
    date: Option<String>,
}

/// One listing record with the name exactly as svn printed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListedEntry {
    pub name: String,
    pub kind: NodeKind,
    pub size: u64,
    pub mtime: SystemTime,
}

pub(crate) fn parse_list_xml(xml: &str) -> Result<Vec<ListedEntry>, RemoteError> {
    let lists: Lists =
        quick_xml::de::from_str(xml).map_err(|e| RemoteError::MalformedListing(e.to_string()))?;

    let mut out = Vec::new();
    for list in lists.lists {
        for entry in list.entries {
            let kind = match entry.kind.as_str() {
                "file" => NodeKind::File,
                "dir" => NodeKind::Dir,
                other => {
                    return Err(RemoteError::MalformedListing(format!(
                        "unknown entry kind '{other}'"
                    )));
                }
            };
            out.push(ListedEntry {
                name: entry.name,
                kind,
                size: entry.size.unwrap_or(0),
                mtime: entry
                    .commit
                    .and_then(|c| c.date)
                    .map_or(SystemTime::UNIX_EPOCH, |d| parse_commit_date(&d)),
            });
        }
    }
    Ok(out)
}

/// svn emits RFC 3339 dates with fractional seconds,
/// e.g. `2007-06-18T21:45:21.000000Z`. Unparsable dates fall back to the
/// epoch rather than failing the whole listing.
fn parse_commit_date(raw: &str) -> SystemTime {
    DateTime::parse_from_rfc3339(raw)
        .map(SystemTime::from)
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<lists>
<list path="svn://example.org/repo/docs">
<entry kind="file">
<name>readme.txt</name>
<size>42</size>
<commit revision="30">
<author>john</author>
<date>2007-06-18T21:45:21.000000Z</date>
</commit>
</entry>
<entry kind="dir">
<name>images</name>
<commit revision="28">
<date>2007-06-04T15:56:03.000000Z</date>
</commit>
</entry>
</list>
</lists>
"#;

    #[test]
    fn parses_files_and_directories() {
        let entries = parse_list_xml(SAMPLE).unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].name, "readme.txt");
        assert_eq!(entries[0].kind, NodeKind::File);
        assert_eq!(entries[0].size, 42);

        assert_eq!(entries[1].name, "images");
        assert_eq!(entries[1].kind, NodeKind::Dir);
        assert_eq!(entries[1].size, 0);
    }

    #[test]
    fn parses_commit_dates() {
        let entries = parse_list_xml(SAMPLE).unwrap();
        // 2007-06-18T21:45:21Z
        let expected = SystemTime::UNIX_EPOCH + Duration::from_secs(1_182_203_121);
        assert_eq!(entries[0].mtime, expected);
    }

    #[test]
    fn depth_empty_directory_listing_uses_dot_name() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<lists>
<list path="svn://example.org/repo">
<entry kind="dir">
<name>.</name>
<commit revision="30">
<date>2007-06-18T21:45:21.000000Z</date>
</commit>
</entry>
</list>
</lists>
"#;
        let entries = parse_list_xml(xml).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, ".");
        assert_eq!(entries[0].kind, NodeKind::Dir);
    }

    #[test]
    fn empty_directory_yields_no_entries() {
        let xml = r#"<?xml version="1.0"?>
<lists>
<list path="svn://example.org/repo/empty">
</list>
</lists>
"#;
        let entries = parse_list_xml(xml).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn unknown_kind_is_malformed() {
        let xml = r#"<lists><list path="x"><entry kind="symlink"><name>a</name></entry></list></lists>"#;
        let err = parse_list_xml(xml).unwrap_err();
        assert!(matches!(err, RemoteError::MalformedListing(_)));
    }

    #[test]
    fn missing_date_falls_back_to_epoch() {
        let xml = r#"<lists><list path="x"><entry kind="file"><name>a</name><size>1</size></entry></list></lists>"#;
        let entries = parse_list_xml(xml).unwrap();
        assert_eq!(entries[0].mtime, SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn garbage_input_is_malformed() {
        assert!(matches!(
            parse_list_xml("not xml at all"),
            Err(RemoteError::MalformedListing(_))
        ));
    }
}
