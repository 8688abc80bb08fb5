//! Table locator: first matching layout selector wins.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::layout::{TableLayout, TableSelector};

/// A table found in a document together with the layout that matched it
#[derive(Debug, Clone, Copy)]
pub struct Located<'a, 'l, C> {
    pub table: ElementRef<'a>,
    pub layout: &'l TableLayout<C>,
}

/// Finds the entry or history table among known layout variants
pub struct TableLocator;

impl TableLocator {
    /// Try each layout in order; `None` means no known table is present.
    ///
    /// A table that is present but has no data rows is still returned.
    pub fn locate<'a, 'l, C>(
        document: &'a Html,
        layouts: &'l [TableLayout<C>],
    ) -> Option<Located<'a, 'l, C>> {
        for layout in layouts {
            if let Some(table) = Self::find(document, &layout.selector) {
                debug!("Matched table layout {}", layout.name);
                return Some(Located { table, layout });
            }
        }
        None
    }

    fn find<'a>(document: &'a Html, selector: &TableSelector) -> Option<ElementRef<'a>> {
        match selector {
            TableSelector::Css(css) => match Selector::parse(css) {
                Ok(sel) => document.select(&sel).next(),
                Err(e) => {
                    warn!("Skipping invalid table selector {:?}: {:?}", css, e);
                    None
                }
            },
            TableSelector::HeaderText(text) => Self::find_by_header(document, text),
        }
    }

    /// First table whose `<th>` cells (or first row) mention `text`
    fn find_by_header<'a>(document: &'a Html, text: &str) -> Option<ElementRef<'a>> {
        let table_sel = Selector::parse("table").ok()?;
        let th_sel = Selector::parse("th").ok()?;
        let tr_sel = Selector::parse("tr").ok()?;

        document.select(&table_sel).find(|table| {
            let in_th = table
                .select(&th_sel)
                .any(|th| th.text().collect::<String>().contains(text));
            in_th
                || table
                    .select(&tr_sel)
                    .next()
                    .map(|row| row.text().collect::<String>().contains(text))
                    .unwrap_or(false)
        })
    }
}
