//! Human-readable rendering of exported records.

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::models::ExportRecord;

/// Year span shown next to a title, e.g. `2021` or `2019-2023`
pub fn year_span(record: &ExportRecord) -> String {
    let published = record.published.format("%Y").to_string();
    let updated = record.updated.format("%Y").to_string();
    if published == updated {
        published
    } else {
        format!("{}-{}", published, updated)
    }
}

fn primary_category(record: &ExportRecord) -> &str {
    record
        .categories
        .split(", ")
        .next()
        .unwrap_or(&record.categories)
}

/// One markdown bullet per record, linked to its abstract page
pub fn format_markdown(records: &[ExportRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let category = primary_category(record);
        out.push_str(&format!(
            "* [{} ({})](https://arxiv.org/abs/{}) ([{}](https://arxiv.org/list/{}/recent))\n",
            record.title,
            year_span(record),
            record.identifier,
            category,
            category
        ));
    }
    out
}

/// Terminal table with the most useful columns
pub fn format_table(records: &[ExportRecord]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Updated", "Title", "Term", "Categories"]);

    for record in records {
        table.add_row(vec![
            format!("{}v{}", record.identifier, record.version),
            record.updated.format("%Y-%m-%d").to_string(),
            record.title.clone(),
            record.matched_term.clone().unwrap_or_default(),
            record.categories.clone(),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(published: i32, updated: i32) -> ExportRecord {
        ExportRecord {
            identifier: "2301.12345".to_string(),
            version: 2,
            published: Utc.with_ymd_and_hms(published, 1, 1, 0, 0, 0).unwrap(),
            updated: Utc.with_ymd_and_hms(updated, 6, 1, 0, 0, 0).unwrap(),
            title: "A Review".to_string(),
            matched_term: Some("review".to_string()),
            categories: "cs.LG, stat.ML".to_string(),
            r#abstract: String::new(),
        }
    }

    #[test]
    fn test_year_span() {
        assert_eq!(year_span(&record(2021, 2021)), "2021");
        assert_eq!(year_span(&record(2019, 2023)), "2019-2023");
    }

    #[test]
    fn test_format_markdown() {
        let md = format_markdown(&[record(2019, 2023)]);
        assert_eq!(
            md,
            "* [A Review (2019-2023)](https://arxiv.org/abs/2301.12345) \
             ([cs.LG](https://arxiv.org/list/cs.LG/recent))\n"
        );
    }

    #[test]
    fn test_format_table_contains_rows() {
        let table = format_table(&[record(2021, 2021)]);
        assert!(table.contains("2301.12345v2"));
        assert!(table.contains("review"));
    }
}
