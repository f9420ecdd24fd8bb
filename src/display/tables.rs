//! Table formatting for categories, stats and search results.

use comfy_table::{
    Attribute, Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};

use crate::categorize::CategorizationReport;
use crate::query::{CategoryCount, CategoryStats};
use crate::types::WordHit;

/// Categories shown in the post-run summary.
pub const SUMMARY_CATEGORY_LIMIT: usize = 10;
/// Example words shown per category in the summary.
pub const SUMMARY_EXAMPLE_WORDS: usize = 8;

/// Builder for creating formatted tables.
pub struct TableBuilder {
    table: Table,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { table: base_table() }
    }

    pub fn set_headers(mut self, headers: Vec<&str>) -> Self {
        self.table.set_header(bold_cells(headers));
        self
    }

    pub fn add_row(mut self, row: Vec<String>) -> Self {
        self.table.add_row(row);
        self
    }

    pub fn build(self) -> String {
        self.table.to_string()
    }
}

fn base_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table
}

fn bold_cells(headers: Vec<&str>) -> Vec<Cell> {
    headers
        .into_iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
        .collect()
}

/// Summary of a categorization run: the largest categories with a few
/// representative words each.
pub fn create_categorization_table(report: &CategorizationReport) -> String {
    let mut table = base_table();
    table.set_header(bold_cells(vec!["Category", "Words", "Examples"]));

    for entry in report
        .snapshot
        .by_size()
        .into_iter()
        .take(SUMMARY_CATEGORY_LIMIT)
    {
        let examples: Vec<&str> = entry
            .representative_words
            .iter()
            .take(SUMMARY_EXAMPLE_WORDS)
            .map(String::as_str)
            .collect();
        table.add_row(vec![
            Cell::new(&entry.title).fg(Color::Cyan),
            Cell::new(entry.total_words),
            Cell::new(examples.join(", ")),
        ]);
    }

    let hidden = report.snapshot.len().saturating_sub(SUMMARY_CATEGORY_LIMIT);
    if hidden > 0 {
        table.add_row(vec![
            Cell::new(format!("... {hidden} more")).add_attribute(Attribute::Dim),
            Cell::new(""),
            Cell::new(""),
        ]);
    }

    table.to_string()
}

pub fn create_category_table(categories: &[CategoryCount]) -> String {
    let mut table = base_table();
    table.set_header(bold_cells(vec!["Category", "Words"]));
    for category in categories {
        table.add_row(vec![
            Cell::new(&category.category),
            Cell::new(category.word_count),
        ]);
    }
    table.to_string()
}

pub fn create_stats_table(stats: &CategoryStats) -> String {
    let describe = |c: &Option<CategoryCount>| {
        c.as_ref()
            .map(|c| format!("{} ({})", c.category, c.word_count))
            .unwrap_or_else(|| "-".to_string())
    };

    let mut table = base_table();
    table.set_header(bold_cells(vec!["Metric", "Value"]));
    table.add_row(vec![
        "Categories".to_string(),
        stats.total_categories.to_string(),
    ]);
    table.add_row(vec!["Labelled words".to_string(), stats.total_words.to_string()]);
    table.add_row(vec![
        "Average per category".to_string(),
        format!("{:.2}", stats.average_words_per_category),
    ]);
    table.add_row(vec!["Largest".to_string(), describe(&stats.largest_category)]);
    table.add_row(vec!["Smallest".to_string(), describe(&stats.smallest_category)]);
    table.to_string()
}

/// Word hits; the score column is left blank for unranked results.
pub fn create_hits_table(hits: &[WordHit]) -> String {
    let mut table = base_table();
    table.set_header(bold_cells(vec!["Word", "Score", "Category", "Meaning"]));
    for hit in hits {
        table.add_row(vec![
            hit.word.clone(),
            hit.score.map(|s| format!("{s:.3}")).unwrap_or_default(),
            hit.category.clone().unwrap_or_default(),
            hit.meaning.clone(),
        ]);
    }
    table.to_string()
}
