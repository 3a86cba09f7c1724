use log::{error, info};
use scraper::Html;

use crate::{
    errors::FetchError,
    registry::{ExtractionMode, SourceDescriptor},
    requests::RequestClient,
    text_manipulators::flatten_text,
};

/// Content handed to the extractor: the representative example text for
/// rendered pages, the raw body for JSON APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    pub content: String,
    pub mode: ExtractionMode,
    pub source_url: String,
}

#[allow(async_fn_in_trait)]
pub trait ContentFetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<FetchedContent, FetchError>;
}

pub struct HttpFetcher<'a> {
    request_client: &'a RequestClient,
}

impl<'a> HttpFetcher<'a> {
    pub fn new(request_client: &'a RequestClient) -> Self {
        Self { request_client }
    }
}

impl ContentFetcher for HttpFetcher<'_> {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<FetchedContent, FetchError> {
        let body = self.request_client.fetch_url_body(&source.content_url).await?;
        let content = match source.mode {
            ExtractionMode::RenderedPage => representative_text(source, &body)?,
            ExtractionMode::JsonApi => body,
        };
        Ok(FetchedContent {
            content,
            mode: source.mode,
            source_url: source.content_url.clone(),
        })
    }
}

/// Finds the representative example block in `html` and returns its visible
/// text.
pub fn representative_text(source: &SourceDescriptor, html: &str) -> Result<String, FetchError> {
    let not_found = |selectors| FetchError::RegionNotFound {
        url: source.content_url.clone(),
        selectors,
    };
    let Some(locator) = &source.region else {
        return Err(not_found(Vec::new()));
    };
    let document = Html::parse_document(html);
    match locator.locate(&document) {
        Some((selector, element)) => {
            info!("{}: found representative example with selector {selector:?}", source.bank_id);
            Ok(flatten_text(element))
        }
        None => {
            let selectors = locator.selectors();
            error!(
                "{}: no representative example at {}, tried {:?}",
                source.bank_id, source.content_url, selectors
            );
            Err(not_found(selectors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SourceRegistry;

    #[test]
    fn bank99_region_is_the_paragraph_after_the_heading() {
        let registry = SourceRegistry::builtin().unwrap();
        let bank99 = registry.get("bank99").unwrap();
        let html = r#"<html><body>
            <h2 id="reprasentatives-beispiel-1">Repräsentatives Beispiel</h2>
            <div class="copy"><p>Sollzinssatz 5,90 % p.a. fix</p></div>
            <p>Sollzinssatz 9,99 % p.a. fix</p>
        </body></html>"#;
        let text = representative_text(bank99, html).unwrap();
        assert_eq!(text, "Sollzinssatz 5,90 % p.a. fix");
    }

    #[test]
    fn raiffeisen_falls_back_to_looser_selector() {
        let registry = SourceRegistry::builtin().unwrap();
        let raiffeisen = registry.get("raiffeisen").unwrap();
        let html = r#"<div class="rlb-representative-calc-v2"><span>Sollzinssatz:</span> <span>3,45 %</span></div>"#;
        let text = representative_text(raiffeisen, html).unwrap();
        assert_eq!(text, "Sollzinssatz: 3,45 %");
    }

    #[test]
    fn missing_region_lists_every_selector() {
        let registry = SourceRegistry::builtin().unwrap();
        let bawag = registry.get("bawag").unwrap();
        let err = representative_text(bawag, "<html><body><p>Wartung</p></body></html>").unwrap_err();
        match err {
            FetchError::RegionNotFound { url, selectors } => {
                assert_eq!(url, "https://kreditrechner.bawag.at/");
                assert_eq!(selectors.len(), 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
