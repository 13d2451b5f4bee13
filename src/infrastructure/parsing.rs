//! HTML parsing for detail documents.

pub mod detail_parser;
pub mod rules;

pub use detail_parser::DetailParser;
pub use rules::ClassificationRules;
