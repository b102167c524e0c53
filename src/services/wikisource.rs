//! Resolving Wikisource `File:` pages to the document they describe.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::SourceError;

const FILE_PAGE_PREFIX: &str = "/wiki/File:";
const DOCUMENT_SUFFIXES: &[&str] = &[".pdf", ".djvu"];

/// Whether `url` is a human-readable `File:` page on one of `hosts`.
pub fn is_file_page(url: &Url, hosts: &[String]) -> bool {
    let host_matches = url
        .host_str()
        .map(|host| host_matches_any(host, hosts))
        .unwrap_or(false);
    host_matches && url.path().starts_with(FILE_PAGE_PREFIX)
}

/// `host` equals one of `hosts` or is a subdomain of it.
pub fn host_matches_any(host: &str, hosts: &[String]) -> bool {
    let host = host.to_lowercase();
    hosts.iter().any(|candidate| {
        host == *candidate || host.ends_with(&format!(".{}", candidate))
    })
}

/// Picks the direct PDF/DjVu link out of a file page.
///
/// Only links on `asset_host` qualify. Protocol-relative and absolute links
/// win over relative ones; within each group the first link on the page wins.
pub fn find_direct_file_link(html: &str, page_url: &Url, asset_host: &str) -> Option<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").ok()?;

    let candidates: Vec<&str> = document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| {
            let lower = href.to_lowercase();
            DOCUMENT_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
                && href.contains(asset_host)
        })
        .collect();

    let absolute = candidates.iter().find_map(|href| {
        if let Some(rest) = href.strip_prefix("//") {
            Url::parse(&format!("https://{}", rest)).ok()
        } else if href.starts_with("http://") || href.starts_with("https://") {
            Url::parse(href).ok()
        } else {
            None
        }
    });

    absolute.or_else(|| candidates.iter().find_map(|href| page_url.join(href).ok()))
}

/// Fetches a file page and returns the direct document URL it links to.
///
/// A page that cannot be fetched is treated like a page without a link.
pub async fn extract_direct_file_url(
    client: &Client,
    page_url: &Url,
    asset_host: &str,
    timeout: Duration,
) -> Result<Url, SourceError> {
    info!("Resolving Wikisource file page {}", page_url);

    let link_extraction = || SourceError::LinkExtraction {
        url: page_url.to_string(),
    };

    let response = client
        .get(page_url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            warn!("Could not fetch file page {}: {}", page_url, e);
            link_extraction()
        })?;

    if !response.status().is_success() {
        warn!(
            "File page {} answered HTTP {}",
            page_url,
            response.status().as_u16()
        );
        return Err(link_extraction());
    }

    let html = response.text().await.map_err(|e| {
        warn!("Could not read file page {}: {}", page_url, e);
        link_extraction()
    })?;

    let direct =
        find_direct_file_link(&html, page_url, asset_host).ok_or_else(link_extraction)?;
    debug!("File page {} resolved to {}", page_url, direct);
    Ok(direct)
}
