use crate::diary::entry::DiaryEntry;
use crate::diary::parse::{extract_year, extract_year_month};
use crate::drive::client::RemoteDocument;
use std::collections::BTreeMap;

/// Group a flat remote listing by year, using only path metadata. Documents
/// whose path yields no year are skipped with a warning; grouping is never
/// fatal and never reads content.
pub fn group_documents_by_year(documents: Vec<RemoteDocument>) -> BTreeMap<i32, Vec<RemoteDocument>> {
    let mut by_year: BTreeMap<i32, Vec<RemoteDocument>> = BTreeMap::new();

    for doc in documents {
        let Some(year) = extract_year(&doc.path) else {
            println!(
                "Warning: unable to extract year from path '{}', skipping file",
                doc.path
            );
            continue;
        };
        by_year.entry(year).or_default().push(doc);
    }

    by_year
}

/// Group a flat remote listing by year and month. A document may resolve a
/// year but not a month; it is then skipped here (it still counts for the
/// year-level grouping).
pub fn group_documents_by_year_month(
    documents: Vec<RemoteDocument>,
) -> BTreeMap<i32, BTreeMap<u32, Vec<RemoteDocument>>> {
    let mut by_year_month: BTreeMap<i32, BTreeMap<u32, Vec<RemoteDocument>>> = BTreeMap::new();

    for doc in documents {
        let (year, month) = extract_year_month(&doc.path);
        let Some(year) = year else {
            println!(
                "Warning: unable to extract year from path '{}', skipping file",
                doc.path
            );
            continue;
        };
        let Some(month) = month else {
            println!(
                "Warning: unable to extract month from path '{}', skipping file",
                doc.path
            );
            continue;
        };
        by_year_month
            .entry(year)
            .or_default()
            .entry(month)
            .or_default()
            .push(doc);
    }

    by_year_month
}

/// Regroup one year's cached entries by month. Used in cache-only mode,
/// where the raw-text file preserves order but not the month structure.
pub fn group_entries_by_month(entries: &[DiaryEntry]) -> BTreeMap<u32, Vec<DiaryEntry>> {
    let mut by_month: BTreeMap<u32, Vec<DiaryEntry>> = BTreeMap::new();

    for entry in entries {
        let (_, month) = extract_year_month(&entry.path);
        let Some(month) = month else {
            println!(
                "Warning: unable to extract month from path '{}', skipping file",
                entry.path
            );
            continue;
        };
        by_month.entry(month).or_default().push(entry.clone());
    }

    by_month
}

#[cfg(test)]
mod tests {
    use super::{group_documents_by_year, group_documents_by_year_month, group_entries_by_month};
    use crate::diary::entry::DiaryEntry;
    use crate::drive::client::RemoteDocument;

    fn doc(path: &str) -> RemoteDocument {
        RemoteDocument {
            id: format!("id-{path}"),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            created_time: None,
            modified_time: None,
        }
    }

    #[test]
    fn groups_nested_cjk_paths_by_year_and_month() {
        let docs = vec![
            doc("2023年/2023年1月/2023年1月5日"),
            doc("2023年/2023年2月/2023年2月3日"),
        ];

        let by_year = group_documents_by_year(docs.clone());
        assert_eq!(by_year.len(), 1);
        assert_eq!(by_year[&2023].len(), 2);

        let by_year_month = group_documents_by_year_month(docs);
        assert_eq!(by_year_month[&2023].len(), 2);
        assert_eq!(by_year_month[&2023][&1].len(), 1);
        assert_eq!(by_year_month[&2023][&2].len(), 1);
        assert_eq!(by_year_month[&2023][&1][0].path, "2023年/2023年1月/2023年1月5日");
    }

    #[test]
    fn unresolvable_paths_are_dropped_not_fatal() {
        let docs = vec![doc("2023年/2023年1月/2023年1月5日"), doc("misc/no-date")];

        let by_year = group_documents_by_year(docs.clone());
        assert_eq!(by_year[&2023].len(), 1);
        assert_eq!(by_year.len(), 1);

        let by_year_month = group_documents_by_year_month(docs);
        assert_eq!(by_year_month.len(), 1);
    }

    #[test]
    fn year_without_month_counts_only_at_year_level() {
        let docs = vec![doc("2024年总结")];

        assert_eq!(group_documents_by_year(docs.clone()).len(), 1);
        assert!(group_documents_by_year_month(docs).is_empty());
    }

    #[test]
    fn year_keys_iterate_ascending() {
        let docs = vec![doc("2025年/2025年1月1日"), doc("2021年/2021年3月2日")];
        let years: Vec<_> = group_documents_by_year(docs).into_keys().collect();
        assert_eq!(years, vec![2021, 2025]);
    }

    #[test]
    fn cached_entries_regroup_by_month() {
        let entries = vec![
            DiaryEntry {
                filename: "2023年1月5日".to_string(),
                path: "2023年/2023年1月/2023年1月5日".to_string(),
                content: "内容".to_string(),
                created_at: String::new(),
                modified_at: String::new(),
            },
            DiaryEntry {
                filename: "2023年2月3日".to_string(),
                path: "2023年/2023年2月/2023年2月3日".to_string(),
                content: "内容".to_string(),
                created_at: String::new(),
                modified_at: String::new(),
            },
        ];

        let by_month = group_entries_by_month(&entries);
        assert_eq!(by_month.len(), 2);
        assert_eq!(by_month[&1].len(), 1);
        assert_eq!(by_month[&2].len(), 1);
    }
}
