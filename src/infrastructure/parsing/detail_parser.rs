//! Field extractor for bid-result detail documents.
//!
//! Turns raw markup into the stable [`DetailExtraction`] payload: a flat
//! basic-info mapping plus at most one technical and one financial
//! evaluation table, classified by the header-keyword rule table. The
//! heuristics are tuned to one document shape and are not meant to
//! generalize.

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::rules::ClassificationRules;
use crate::domain::{BasicInfo, BasicInfoSection, DetailExtraction, EvaluationTable, TableKind};

/// Parser for bid-result detail pages.
pub struct DetailParser {
    info_pair_selector: Selector,
    label_selector: Selector,
    value_selector: Selector,
    table_selector: Selector,
    header_cell_selector: Selector,
    row_selector: Selector,
    data_cell_selector: Selector,
    rules: ClassificationRules,
}

impl DetailParser {
    /// Create a parser with the default classification rules.
    pub fn new() -> Result<Self> {
        Self::with_rules(ClassificationRules::default())
    }

    /// Create a parser with a custom rule table.
    pub fn with_rules(rules: ClassificationRules) -> Result<Self> {
        Ok(Self {
            info_pair_selector: compile("div.block p")?,
            label_selector: compile("strong")?,
            value_selector: compile("span")?,
            table_selector: compile("table")?,
            header_cell_selector: compile("th")?,
            row_selector: compile("tr")?,
            data_cell_selector: compile("td")?,
            rules,
        })
    }

    /// Extract everything this parser understands from one document.
    pub fn extract(&self, html: &str) -> DetailExtraction {
        let document = Html::parse_document(html);
        let bid_info = self.extract_basic_info(&document);
        let (technical, financial) = self.classify_tables(&document);

        DetailExtraction {
            basic_info: BasicInfoSection { bid_info },
            technical_evaluation: technical,
            financial_evaluation: financial,
        }
    }

    /// Scan candidate label/value pairs in document order. A pair counts
    /// only when both sub-elements are present; the label is normalized,
    /// the value kept as written.
    fn extract_basic_info(&self, document: &Html) -> BasicInfo {
        let mut info = BasicInfo::new();
        for pair in document.select(&self.info_pair_selector) {
            let label = pair.select(&self.label_selector).next();
            let value = pair.select(&self.value_selector).next();
            if let (Some(label), Some(value)) = (label, value) {
                let key = normalize_label(&joined_text(label));
                if key.is_empty() {
                    continue;
                }
                info.insert(key, raw_text(value).trim().to_string());
            }
        }
        info
    }

    /// Walk every table in document order and classify by header keywords.
    /// Each kind fires at most once and a claimed table is never reused for
    /// the other kind.
    fn classify_tables(&self, document: &Html) -> (Option<EvaluationTable>, Option<EvaluationTable>) {
        let mut technical = None;
        let mut financial = None;

        for table in document.select(&self.table_selector) {
            if technical.is_some() && financial.is_some() {
                break;
            }

            let headers: Vec<String> = table
                .select(&self.header_cell_selector)
                .map(concatenated_text)
                .collect();
            if headers.is_empty() {
                continue;
            }

            let header_text = headers
                .iter()
                .map(|header| normalize_fragment(header))
                .collect::<Vec<_>>()
                .join(" ");

            match self
                .rules
                .kind_for(&header_text, technical.is_some(), financial.is_some())
            {
                Some(TableKind::Technical) => {
                    debug!("classified technical table ({} headers)", headers.len());
                    technical = Some(EvaluationTable {
                        headers,
                        rows: self.table_rows(table),
                    });
                }
                Some(TableKind::Financial) => {
                    debug!("classified financial table ({} headers)", headers.len());
                    let mut headers = headers;
                    // Synthetic column; extraction leaves its values
                    // unpopulated, so rows stay one column narrower.
                    headers.push("Winner".to_string());
                    financial = Some(EvaluationTable {
                        headers,
                        rows: self.table_rows(table),
                    });
                }
                None => {}
            }
        }

        (technical, financial)
    }

    /// All rows after the header row, as whitespace-joined cell texts.
    fn table_rows(&self, table: ElementRef<'_>) -> Vec<Vec<String>> {
        table
            .select(&self.row_selector)
            .skip(1)
            .map(|row| {
                row.select(&self.data_cell_selector)
                    .map(joined_text)
                    .collect()
            })
            .collect()
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("invalid selector '{selector}': {e}"))
}

/// Text segments trimmed and joined with single spaces, empties dropped.
fn joined_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text segments trimmed and concatenated without a separator.
fn concatenated_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect::<String>()
}

/// Untouched concatenation of the element's text segments.
fn raw_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Lowercase, collapse whitespace/NBSP/newlines, strip the trailing colon.
fn normalize_label(text: &str) -> String {
    let collapsed = text
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed.trim_end_matches(':').trim_end().to_string()
}

/// Lowercase with NBSP and newlines mapped to spaces; used only for
/// keyword matching, never for output headers.
fn normalize_fragment(text: &str) -> String {
    text.to_lowercase()
        .replace('\u{a0}', " ")
        .replace('\n', " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> DetailParser {
        DetailParser::new().unwrap()
    }

    #[test]
    fn basic_info_keys_are_normalized_and_values_kept() {
        let html = r#"
            <div class="block">
                <p><strong>Bid Number:</strong><span>GEM/2024/1</span></p>
                <p><strong>  Total&nbsp;Quantity : </strong><span> 25 </span></p>
                <p><strong>No Value Here</strong></p>
            </div>
        "#;
        let extraction = parser().extract(html);
        let info = &extraction.basic_info.bid_info;

        assert_eq!(info.get("bid number"), Some("GEM/2024/1"));
        assert_eq!(info.get("total quantity"), Some("25"));
        assert_eq!(info.len(), 2);
    }

    #[test]
    fn repeated_labels_overwrite_earlier_values() {
        let html = r#"
            <div class="block">
                <p><strong>Status:</strong><span>Evaluation</span></p>
                <p><strong>status</strong><span>Completed</span></p>
            </div>
        "#;
        let info = parser().extract(html).basic_info.bid_info;
        assert_eq!(info.len(), 1);
        assert_eq!(info.get("status"), Some("Completed"));
    }

    fn technical_table(extra: &str) -> String {
        format!(
            r#"<table>
                <tr>
                    <th>Seller Name</th><th>Offered Item</th>
                    <th>Participated On</th><th>MSE</th><th>Status</th>
                </tr>
                <tr><td>Acme Ltd</td><td>Desktop</td><td>Yes</td><td>No</td><td>Accepted</td></tr>
                <tr><td>Zen Corp</td><td>Desktop</td><td>Yes</td><td>Yes</td><td>Rejected</td></tr>
            </table>{extra}"#
        )
    }

    #[test]
    fn technical_table_is_classified_and_header_row_skipped() {
        let extraction = parser().extract(&technical_table(""));
        let table = extraction.technical_evaluation.expect("technical table");

        assert_eq!(table.headers.len(), 5);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], ["Acme Ltd", "Desktop", "Yes", "No", "Accepted"]);
        assert!(extraction.financial_evaluation.is_none());
    }

    #[test]
    fn only_first_technical_candidate_is_kept() {
        let duplicate = technical_table("").replace("Acme Ltd", "Other Seller");
        let html = technical_table(&duplicate);
        let extraction = parser().extract(&html);

        let table = extraction.technical_evaluation.expect("technical table");
        assert_eq!(table.rows[0][0], "Acme Ltd");
    }

    #[test]
    fn financial_headers_gain_winner_column_rows_stay_narrow() {
        let html = r#"<table>
            <tr><th>Seller</th><th>Offered Price</th><th>Rank</th></tr>
            <tr><td>Acme Ltd</td><td>₹10,000</td><td>L1</td></tr>
        </table>"#;
        let extraction = parser().extract(html);
        let table = extraction.financial_evaluation.expect("financial table");

        assert_eq!(table.headers, ["Seller", "Offered Price", "Rank", "Winner"]);
        assert_eq!(table.rows, [["Acme Ltd", "₹10,000", "L1"]]);
    }

    #[test]
    fn table_matching_both_rule_sets_is_claimed_once() {
        // All eight keywords in one header row.
        let html = r#"<table>
            <tr>
                <th>Seller</th><th>Offered Price</th><th>Participated</th>
                <th>MSE</th><th>Status</th><th>Rank</th>
            </tr>
            <tr><td>Acme Ltd</td><td>₹9,000</td><td>Yes</td><td>No</td><td>Accepted</td><td>L1</td></tr>
        </table>"#;
        let extraction = parser().extract(html);

        assert!(extraction.technical_evaluation.is_some());
        assert!(extraction.financial_evaluation.is_none());
    }

    #[test]
    fn tables_without_header_cells_are_ignored() {
        let html = r#"<table>
            <tr><td>seller offered participated mse status</td></tr>
        </table>"#;
        let extraction = parser().extract(html);

        assert!(extraction.technical_evaluation.is_none());
        assert!(extraction.financial_evaluation.is_none());
    }

    #[test]
    fn nbsp_and_case_do_not_defeat_keyword_matching() {
        let html = "<table>\
            <tr><th>SELLER&nbsp;NAME</th><th>Offered\u{a0}Price</th><th>RANK</th></tr>\
            <tr><td>Acme</td><td>₹1</td><td>L1</td></tr>\
        </table>";
        let extraction = parser().extract(html);
        assert!(extraction.financial_evaluation.is_some());
    }
}
