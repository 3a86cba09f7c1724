use scraper::{ElementRef, Html, Selector};

use crate::errors::ConfigError;

pub const REPRESENTATIVE_EXAMPLE: &str = "Representative Example";
pub const CURRENCY: &str = "EUR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Visible text of a located region of an HTML page.
    RenderedPage,
    /// A JSON object returned directly by an API.
    JsonApi,
}

impl ExtractionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMode::RenderedPage => "rendered-page",
            ExtractionMode::JsonApi => "json-api",
        }
    }
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered CSS selector strategies for finding the representative example
/// block. Tried lazily, first match wins.
#[derive(Debug, Clone)]
pub struct RegionLocator {
    strategies: Vec<(String, Selector)>,
}

impl RegionLocator {
    pub fn new(bank_id: &str, selectors: &[&str]) -> Result<Self, ConfigError> {
        if selectors.is_empty() {
            return Err(ConfigError::InvalidSelector {
                bank: bank_id.to_string(),
                selector: String::new(),
                reason: "no region selectors configured".to_string(),
            });
        }
        let strategies = selectors
            .iter()
            .map(|raw| {
                Selector::parse(raw)
                    .map(|selector| (raw.to_string(), selector))
                    .map_err(|e| ConfigError::InvalidSelector {
                        bank: bank_id.to_string(),
                        selector: raw.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { strategies })
    }

    /// Returns the first element matched, together with the selector that
    /// found it.
    pub fn locate<'a>(&'a self, document: &'a Html) -> Option<(&'a str, ElementRef<'a>)> {
        self.strategies.iter().find_map(|(raw, selector)| {
            document
                .select(selector)
                .next()
                .map(|element| (raw.as_str(), element))
        })
    }

    pub fn selectors(&self) -> Vec<String> {
        self.strategies.iter().map(|(raw, _)| raw.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub bank_id: String,
    pub product_name: String,
    pub content_url: String,
    pub mode: ExtractionMode,
    /// Only set for rendered-page sources.
    pub region: Option<RegionLocator>,
    pub enabled: bool,
}

impl SourceDescriptor {
    pub fn rendered_page(bank_id: &str, content_url: &str, selectors: &[&str]) -> Result<Self, ConfigError> {
        Ok(Self {
            bank_id: bank_id.to_string(),
            product_name: REPRESENTATIVE_EXAMPLE.to_string(),
            content_url: content_url.to_string(),
            mode: ExtractionMode::RenderedPage,
            region: Some(RegionLocator::new(bank_id, selectors)?),
            enabled: true,
        })
    }

    pub fn is_enabled(&self, disabled: &[String]) -> bool {
        self.enabled && !disabled.contains(&self.bank_id)
    }

    pub fn json_api(bank_id: &str, content_url: &str) -> Self {
        Self {
            bank_id: bank_id.to_string(),
            product_name: REPRESENTATIVE_EXAMPLE.to_string(),
            content_url: content_url.to_string(),
            mode: ExtractionMode::JsonApi,
            region: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<SourceDescriptor>) -> Self {
        Self { sources }
    }

    /// The four Austrian consumer-loan sources.
    pub fn builtin() -> Result<Self, ConfigError> {
        let sources = vec![
            SourceDescriptor::rendered_page(
                "raiffeisen",
                "https://www.raiffeisen.at/noew/rlb/de/privatkunden/kredit-leasing/der-faire-credit.html",
                &[
                    ".credit-calculator-dfc-representative-calc",
                    "[class*=\"representative-calc\"]",
                    "[class*=\"credit-calculator\"]",
                ],
            )?,
            SourceDescriptor::rendered_page(
                "bawag",
                "https://kreditrechner.bawag.at/",
                &[
                    ".representative-calculation-example.calculation-text",
                    "[class*=\"representative-calculation\"]",
                ],
            )?,
            SourceDescriptor::rendered_page(
                "bank99",
                "https://bank99.at/kredit/rundumkredit99",
                &[
                    "h2[id*='reprasentatives-beispiel'] + div.copy p",
                    "[id*='reprasentatives-beispiel'] ~ div p",
                ],
            )?,
            SourceDescriptor::json_api(
                "erste",
                "https://shop.sparkasse.at/storeconsumerloan/rest/emilcalculators/198",
            ),
        ];
        Ok(Self::new(sources))
    }

    pub fn get(&self, bank_id: &str) -> Result<&SourceDescriptor, ConfigError> {
        self.sources
            .iter()
            .find(|source| source.bank_id == bank_id)
            .ok_or_else(|| ConfigError::UnknownBank(bank_id.to_string()))
    }

    pub fn all(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    /// Sources to scrape this run, in registry order. `disabled` overrides
    /// the per-source flag.
    pub fn enabled<'a>(&'a self, disabled: &'a [String]) -> impl Iterator<Item = &'a SourceDescriptor> + 'a {
        self.sources
            .iter()
            .filter(move |source| source.is_enabled(disabled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_four_sources_in_order() {
        let registry = SourceRegistry::builtin().unwrap();
        let ids: Vec<_> = registry.all().iter().map(|s| s.bank_id.as_str()).collect();
        assert_eq!(ids, ["raiffeisen", "bawag", "bank99", "erste"]);
        assert_eq!(registry.get("erste").unwrap().mode, ExtractionMode::JsonApi);
        assert!(registry.get("erste").unwrap().region.is_none());
        assert!(registry.get("bank99").unwrap().region.is_some());
    }

    #[test]
    fn unknown_bank_is_a_config_error() {
        let registry = SourceRegistry::builtin().unwrap();
        assert!(matches!(
            registry.get("volksbank"),
            Err(ConfigError::UnknownBank(id)) if id == "volksbank"
        ));
    }

    #[test]
    fn disabled_banks_are_skipped() {
        let mut registry = SourceRegistry::builtin().unwrap();
        registry.sources[0].enabled = false;
        let disabled = vec!["erste".to_string()];
        let ids: Vec<_> = registry.enabled(&disabled).map(|s| s.bank_id.as_str()).collect();
        assert_eq!(ids, ["bawag", "bank99"]);
    }

    #[test]
    fn invalid_selector_is_rejected() {
        let result = SourceDescriptor::rendered_page("x", "https://x.example", &["div[["]);
        assert!(matches!(result, Err(ConfigError::InvalidSelector { .. })));
    }

    #[test]
    fn locator_falls_back_to_later_selectors() {
        let locator = RegionLocator::new("x", &[".missing", "div.second", "div"]).unwrap();
        let document = Html::parse_document(
            "<html><body><div class=\"first\">a</div><div class=\"second\">b</div></body></html>",
        );
        let (selector, element) = locator.locate(&document).unwrap();
        assert_eq!(selector, "div.second");
        assert_eq!(element.text().collect::<String>(), "b");
    }

    #[test]
    fn locator_reports_none_when_all_strategies_fail() {
        let locator = RegionLocator::new("x", &[".a", ".b"]).unwrap();
        let document = Html::parse_document("<p>nothing here</p>");
        assert!(locator.locate(&document).is_none());
        assert_eq!(locator.selectors(), vec![".a".to_string(), ".b".to_string()]);
    }
}
