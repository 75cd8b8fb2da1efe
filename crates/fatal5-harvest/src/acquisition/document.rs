//! Listing-page parsing from raw HTML.
//!
//! Uses the `scraper` crate for CSS selector-based lookups. Everything that
//! depends on the portal's markup sits here: the results-table marker, the
//! positional cell mapping ([`RowExtractor`]) and the "next page" link test
//! ([`NextLinkPredicate`]). The pager only sees [`ListingPage`] values.

use crate::record::RowMetadata;
use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};

/// Structural marker of the results table.
pub const RESULTS_TABLE: &str = "table.table.main.table-condensed.table-bordered.table-hover";

/// Cells a row needs before it is considered well-formed.
pub const MIN_ROW_CELLS: usize = 8;

/// Parse a CSS selector, reporting the offending input on failure.
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector `{css}`: {e:?}"))
}

/// Whitespace-trimmed text content of an element.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// A parsed HTML document with selector lookups.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// First element matching `sel`, in document order.
    pub fn find(&self, sel: &Selector) -> Option<ElementRef<'_>> {
        self.html.select(sel).next()
    }

    /// All elements matching `sel`, in document order.
    pub fn find_all<'a>(&'a self, sel: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.html.select(sel)
    }
}

/// One table row as found in the markup, before its link is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedRow {
    pub filename: String,
    /// Document link as written in the page, usually relative.
    pub href: String,
    pub metadata: RowMetadata,
}

/// Maps the cells of one table row to a [`ScrapedRow`].
pub trait RowExtractor: Send + Sync {
    /// `None` marks the row as malformed; it is skipped.
    fn extract(&self, cells: &[ElementRef<'_>]) -> Option<ScrapedRow>;
}

/// The portal's layout: a linked filename followed by seven metadata cells.
pub struct PositionalRowExtractor {
    anchor: Selector,
}

impl PositionalRowExtractor {
    pub fn new() -> Self {
        Self {
            anchor: Selector::parse("a").unwrap(),
        }
    }
}

impl Default for PositionalRowExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RowExtractor for PositionalRowExtractor {
    fn extract(&self, cells: &[ElementRef<'_>]) -> Option<ScrapedRow> {
        if cells.len() < MIN_ROW_CELLS {
            return None;
        }
        let link = cells[0].select(&self.anchor).next()?;
        let href = link.value().attr("href")?.trim().to_string();
        let text = |i: usize| element_text(cells[i]);

        Some(ScrapedRow {
            filename: element_text(link),
            href,
            metadata: RowMetadata {
                fatal5: text(1),
                activity: text(2),
                equipment: text(3),
                body_part: text(4),
                injury: text(5),
                area: text(6),
                country: text(7),
            },
        })
    }
}

/// Decides whether an anchor's text marks the "next page" link.
pub trait NextLinkPredicate: Send + Sync {
    fn is_next(&self, text: &str) -> bool;
}

/// Matches anchors whose text contains a literal, case-sensitive needle.
#[derive(Debug, Clone)]
pub struct TextContains(pub String);

impl Default for TextContains {
    fn default() -> Self {
        Self("Next".to_string())
    }
}

impl NextLinkPredicate for TextContains {
    fn is_next(&self, text: &str) -> bool {
        text.contains(self.0.as_str())
    }
}

/// What one listing page contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// `false` when the results table marker was not found.
    pub table_found: bool,
    /// Well-formed rows in table order.
    pub rows: Vec<ScrapedRow>,
    /// Body rows rejected by the row extractor.
    pub skipped: usize,
    /// `href` of the first "next" anchor, unresolved.
    pub next_href: Option<String>,
}

/// Selectors plus the pluggable row and next-link logic for the listing.
pub struct ListingLayout {
    table: Selector,
    rows: Selector,
    cells: Selector,
    anchors: Selector,
    row_extractor: Box<dyn RowExtractor>,
    next_link: Box<dyn NextLinkPredicate>,
}

impl ListingLayout {
    pub fn new(
        table_selector: &str,
        row_extractor: Box<dyn RowExtractor>,
        next_link: Box<dyn NextLinkPredicate>,
    ) -> Result<Self> {
        Ok(Self {
            table: selector(table_selector)?,
            rows: selector("tbody tr")?,
            cells: selector("td")?,
            anchors: selector("a")?,
            row_extractor,
            next_link,
        })
    }

    /// Parse a listing page.
    pub fn parse(&self, html: &str) -> ListingPage {
        let doc = Document::parse(html);

        let Some(table) = doc.find(&self.table) else {
            return ListingPage::default();
        };

        let mut page = ListingPage {
            table_found: true,
            ..ListingPage::default()
        };

        for row in table.select(&self.rows) {
            let cells: Vec<ElementRef<'_>> = row.select(&self.cells).collect();
            match self.row_extractor.extract(&cells) {
                Some(scraped) => page.rows.push(scraped),
                None => page.skipped += 1,
            }
        }

        page.next_href = doc
            .find_all(&self.anchors)
            .filter(|a| self.next_link.is_next(&a.text().collect::<String>()))
            .find_map(|a| a.value().attr("href").map(|h| h.trim().to_string()));

        page
    }
}

impl Default for ListingLayout {
    fn default() -> Self {
        Self {
            table: Selector::parse(RESULTS_TABLE).unwrap(),
            rows: Selector::parse("tbody tr").unwrap(),
            cells: Selector::parse("td").unwrap(),
            anchors: Selector::parse("a").unwrap(),
            row_extractor: Box::new(PositionalRowExtractor::new()),
            next_link: Box::new(TextContains::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, href: &str) -> String {
        format!(
            "<tr><td><a href=\"{href}\"> {name} </a></td>\
             <td>F5-{name}</td><td>Lifting</td><td>Crane</td><td>Hand</td>\
             <td>Crush</td><td>Deck</td><td>NO</td></tr>"
        )
    }

    fn page(rows: &str, extra: &str) -> String {
        format!(
            "<html><body><table class=\"table main table-condensed table-bordered table-hover\">\
             <thead><tr><th>File</th></tr></thead><tbody>{rows}</tbody></table>{extra}</body></html>"
        )
    }

    #[test]
    fn test_parses_rows_in_order() {
        let html = page(&format!("{}{}", row("a", "/f/1"), row("b", "/f/2")), "");
        let listing = ListingLayout::default().parse(&html);

        assert!(listing.table_found);
        assert_eq!(listing.rows.len(), 2);
        assert_eq!(listing.rows[0].filename, "a");
        assert_eq!(listing.rows[0].href, "/f/1");
        assert_eq!(listing.rows[1].filename, "b");

        let meta = &listing.rows[0].metadata;
        assert_eq!(meta.fatal5, "F5-a");
        assert_eq!(meta.activity, "Lifting");
        assert_eq!(meta.equipment, "Crane");
        assert_eq!(meta.body_part, "Hand");
        assert_eq!(meta.injury, "Crush");
        assert_eq!(meta.area, "Deck");
        assert_eq!(meta.country, "NO");
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let short = "<tr><td><a href=\"/f/9\">x</a></td><td>1</td><td>2</td></tr>";
        let html = page(&format!("{}{short}{}", row("a", "/f/1"), row("b", "/f/2")), "");
        let listing = ListingLayout::default().parse(&html);

        assert_eq!(listing.rows.len(), 2);
        assert_eq!(listing.skipped, 1);
        assert!(listing.rows.iter().all(|r| r.href != "/f/9"));
    }

    #[test]
    fn test_row_without_link_is_skipped() {
        let unlinked = "<tr><td>plain</td><td>1</td><td>2</td><td>3</td>\
                        <td>4</td><td>5</td><td>6</td><td>7</td></tr>";
        let listing = ListingLayout::default().parse(&page(unlinked, ""));

        assert!(listing.rows.is_empty());
        assert_eq!(listing.skipped, 1);
    }

    #[test]
    fn test_missing_table() {
        let listing = ListingLayout::default()
            .parse("<html><body><table class=\"other\"><tr><td>x</td></tr></table></body></html>");
        assert!(!listing.table_found);
        assert!(listing.rows.is_empty());
        assert!(listing.next_href.is_none());
    }

    #[test]
    fn test_next_link_detection() {
        let html = page(
            &row("a", "/f/1"),
            "<a href=\"?page=1\">Prev</a><a href=\"?page=3\">Next &raquo;</a>",
        );
        let listing = ListingLayout::default().parse(&html);
        assert_eq!(listing.next_href.as_deref(), Some("?page=3"));
    }

    #[test]
    fn test_next_match_is_case_sensitive() {
        let html = page(&row("a", "/f/1"), "<a href=\"?page=2\">next</a>");
        assert!(ListingLayout::default().parse(&html).next_href.is_none());
    }

    #[test]
    fn test_next_anchor_without_href_is_ignored() {
        let html = page(&row("a", "/f/1"), "<a>Next</a>");
        assert!(ListingLayout::default().parse(&html).next_href.is_none());
    }

    #[test]
    fn test_custom_predicate() {
        struct Arrow;
        impl NextLinkPredicate for Arrow {
            fn is_next(&self, text: &str) -> bool {
                text.trim() == "›"
            }
        }

        let layout = ListingLayout::new(
            RESULTS_TABLE,
            Box::new(PositionalRowExtractor::new()),
            Box::new(Arrow),
        )
        .unwrap();
        let html = page(&row("a", "/f/1"), "<a href=\"/p/2\">Next</a><a href=\"/p/3\">›</a>");
        assert_eq!(layout.parse(&html).next_href.as_deref(), Some("/p/3"));
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let err = selector("table[").unwrap_err();
        assert!(err.to_string().contains("table["));
    }
}
