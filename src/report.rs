//! Runs every catalog query of one or more sections.

use log::{error, info};

use crate::{
    error::Result,
    queries::{self, CatalogQuery, Section},
    results::ResultSet,
    store::Store,
};

#[derive(Debug)]
pub struct ReportEntry {
    pub query: &'static CatalogQuery,
    pub outcome: Result<ResultSet>,
}

#[derive(Debug, Default)]
pub struct Report {
    pub entries: Vec<ReportEntry>,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_err()).count()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&'static CatalogQuery, &ResultSet)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.outcome.as_ref().ok().map(|result| (entry.query, result)))
    }
}

/// Runs the queries of `sections` in catalog order. A failing query is logged
/// and recorded; the rest still run.
pub fn run_sections(store: &Store, sections: &[Section]) -> Result<Report> {
    store.ensure_ready()?;
    let mut report = Report::default();
    for &section in sections {
        info!("Running section: {section}");
        for query in queries::in_section(section) {
            let outcome = store.fetch(query.name, &query.sql);
            if let Err(err) = &outcome {
                error!("Query '{}' failed: {err}", query.name);
            }
            report.entries.push(ReportEntry { query, outcome });
        }
    }
    Ok(report)
}
