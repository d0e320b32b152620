//! Locating artwork and track assets on album and detail pages.
//!
//! Parsing is kept synchronous and separate from fetching: a parsed
//! `scraper::Html` never lives across an await point.

use albumrip_model::{
    file_name_from_url, url_has_extension, Album, AssetKind, ImageLink, ResolvedAsset,
    TargetFormat, TrackEntry,
};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::error::{AcquireError, Result};
use crate::http::{Fetcher, Transport};

pub const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

/// Header text of the track table's title column.
pub const TRACK_TITLE_HEADER: &str = "Song Name";

/// Zero-based index of the cell holding the target-format link.
const FORMAT_COLUMN: usize = 5;

/// Links to other albums that the catalog shows next to this one.
pub const DEFAULT_EXCLUDE_PATTERNS: [&str; 1] = ["/game-soundtracks/album/"];

/// Everything the pipeline needs from the album page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumPage {
    /// Raw `<title>` text.
    pub title: String,
    pub images: Vec<ImageLink>,
    /// `None` when the page has no track table for the target format.
    pub tracks: Option<Vec<TrackEntry>>,
}

/// Parse the album page into its title, image candidates and track list.
pub fn parse_album_page(
    html: &str,
    page_url: &Url,
    format: &TargetFormat,
    exclude_patterns: &[String],
) -> AlbumPage {
    let document = Html::parse_document(html);

    AlbumPage {
        title: page_title(&document),
        images: image_links(&document, page_url, exclude_patterns),
        tracks: track_entries(&document, page_url, format),
    }
}

fn page_title(document: &Html) -> String {
    let title_sel = Selector::parse("title").expect("valid selector");
    document
        .select(&title_sel)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn cell_text(element: ElementRef) -> String {
    element.text().map(str::trim).collect()
}

/// Every thumbnail wrapped in a link, in document order, one per target.
fn image_links(document: &Html, page_url: &Url, exclude_patterns: &[String]) -> Vec<ImageLink> {
    let img_sel = Selector::parse("a[href] img").expect("valid selector");

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for img in document.select(&img_sel) {
        let Some(href) = img
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| a.value().name() == "a" && a.value().attr("href").is_some())
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };

        let target = match page_url.join(href.trim()) {
            Ok(target) => target,
            Err(e) => {
                tracing::debug!(href, error = %e, "Skipping unparseable image link");
                continue;
            }
        };

        if !seen.insert(target.clone()) {
            continue;
        }

        // Matched against the raw attribute: relative links to this album's
        // own artwork resolve under the album URL and must stay in.
        let excluded = exclude_patterns.iter().any(|p| href.contains(p.as_str()));

        links.push(ImageLink { target, excluded });
    }

    links
}

/// Rows of the track table that link to the target format, in table order.
fn track_entries(document: &Html, page_url: &Url, format: &TargetFormat) -> Option<Vec<TrackEntry>> {
    let table_sel = Selector::parse("table").expect("valid selector");
    let th_sel = Selector::parse("th").expect("valid selector");
    let tr_sel = Selector::parse("tr").expect("valid selector");
    let td_sel = Selector::parse("td").expect("valid selector");
    let a_sel = Selector::parse("a[href]").expect("valid selector");

    let table = document.select(&table_sel).find(|table| {
        let headers: Vec<String> = table.select(&th_sel).map(cell_text).collect();
        headers.iter().any(|h| h == TRACK_TITLE_HEADER) && headers.iter().any(|h| *h == format.label)
    })?;

    let mut entries = Vec::new();

    for (index, tr) in table.select(&tr_sel).enumerate().skip(1) {
        let tds: Vec<ElementRef> = tr.select(&td_sel).collect();
        if tds.len() <= FORMAT_COLUMN {
            tracing::debug!(row = index, cols = tds.len(), "Skipping short track row");
            continue;
        }

        let Some(href) = tds[FORMAT_COLUMN]
            .select(&a_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            tracing::debug!(row = index, "Skipping track row without {} link", format.label);
            continue;
        };

        match page_url.join(href.trim()) {
            Ok(link) => entries.push(TrackEntry {
                position: entries.len() + 1,
                link,
            }),
            Err(e) => tracing::debug!(row = index, href, error = %e, "Skipping unparseable track link"),
        }
    }

    Some(entries)
}

/// First `<img>` on a detail page whose source is an image file.
pub fn first_image_source(html: &str, page_url: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    let img_sel = Selector::parse("img[src]").expect("valid selector");

    document
        .select(&img_sel)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| {
            let lower = src.trim().to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        })
        .find_map(|src| page_url.join(src.trim()).ok())
}

/// First link on a detail page whose target is a file of `format`.
pub fn first_format_link(html: &str, page_url: &Url, format: &TargetFormat) -> Option<Url> {
    let document = Html::parse_document(html);
    let a_sel = Selector::parse("a[href]").expect("valid selector");

    document
        .select(&a_sel)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| format.matches_href(href.trim()))
        .find_map(|href| page_url.join(href.trim()).ok())
}

fn resolved(kind: AssetKind, url: Url, referer: Url, dir: &std::path::Path) -> Result<ResolvedAsset> {
    let name = file_name_from_url(&url).ok_or_else(|| AcquireError::NoFileName {
        url: url.to_string(),
    })?;
    Ok(ResolvedAsset {
        kind,
        destination: dir.join(name),
        url,
        referer,
    })
}

/// Resolve a thumbnail link to its full-size image.
///
/// Returns `Ok(None)` when the linked page has no usable image.
pub async fn resolve_image<T: Transport>(
    fetcher: &Fetcher<T>,
    album: &Album,
    link: &ImageLink,
) -> Result<Option<ResolvedAsset>> {
    let page = &link.target;

    let image_url = if url_has_extension(page, &IMAGE_EXTENSIONS) {
        page.clone()
    } else {
        let html = fetcher.fetch_page(page, Some(&album.url)).await?;
        match first_image_source(&html, page) {
            Some(url) => url,
            None => return Ok(None),
        }
    };

    resolved(AssetKind::Image, image_url, page.clone(), &album.images_dir()).map(Some)
}

/// Resolve a track row to its direct download URL.
///
/// A link that already ends in the format's extension costs no request;
/// anything else is treated as a detail page and fetched once.
pub async fn resolve_track<T: Transport>(
    fetcher: &Fetcher<T>,
    album: &Album,
    format: &TargetFormat,
    entry: &TrackEntry,
) -> Result<ResolvedAsset> {
    let link = &entry.link;

    let asset_url = if format.matches_url(link) {
        link.clone()
    } else {
        let html = fetcher.fetch_page(link, Some(&album.url)).await?;
        first_format_link(&html, link, format).ok_or_else(|| AcquireError::AssetLinkMissing {
            what: format.label.clone(),
            page: link.to_string(),
        })?
    };

    resolved(AssetKind::Track, asset_url, link.clone(), &album.output_dir)
}
