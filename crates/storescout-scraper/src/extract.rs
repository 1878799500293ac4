//! Multi-strategy field extraction from storefront listing markup.
//!
//! Storefront markup drifts between regions and deployments, so every field
//! is described as an ordered list of [`FieldStrategy`] values. The first
//! strategy that yields a non-empty value wins. Listings missing a name or a
//! price are skipped and counted, never raised as errors.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use storescout_core::{RawListing, Region};

/// Container selectors, tried in order; the first one matching anything wins.
const CONTAINER_CSS: &[&str] = &[
    r#"[data-qa*="productTile"]"#,
    "[data-product-id]",
    ".product-tile",
    "article",
];

/// Path fragments that mark an image as decorative rather than product art.
const DECORATIVE_IMAGE_MARKERS: &[&str] = &["icon", "logo", "sprite", "badge", "placeholder"];

/// Symbols recognised by the price pattern in every region.
const COMMON_CURRENCY_SYMBOLS: &[&str] = &["€", "$", "£", "¥"];

fn parse_static(css: &str) -> Selector {
    Selector::parse(css).expect("valid static selector")
}

static CONTAINERS: LazyLock<Vec<(&'static str, Selector)>> = LazyLock::new(|| {
    CONTAINER_CSS
        .iter()
        .map(|css| (*css, parse_static(css)))
        .collect()
});

/// Region-independent strategies; [`ListingSelectors::for_region`] adds the
/// price pattern for the region's currency symbol.
static BASE_SELECTORS: LazyLock<ListingSelectors> = LazyLock::new(|| ListingSelectors {
    name: vec![
        FieldStrategy::Text(parse_static(
            r#"[data-qa*="product-name"], [data-testid*="product-name"]"#,
        )),
        FieldStrategy::Text(parse_static("h3")),
        FieldStrategy::Text(parse_static("h2")),
        FieldStrategy::Text(parse_static("h4")),
        FieldStrategy::Text(parse_static("a")),
        FieldStrategy::OwnAttr("aria-label"),
    ],
    price: vec![
        FieldStrategy::Text(parse_static(r#"[data-qa*="display-price"]"#)),
        FieldStrategy::Text(parse_static(r#"[data-qa*="price"]"#)),
        FieldStrategy::Text(parse_static(r#".price, span[class*="price"]"#)),
    ],
    image: vec![
        FieldStrategy::Image {
            selector: parse_static(r#"[data-qa*="image"] img, img[data-qa*="image"]"#),
            skip_decorative: true,
        },
        FieldStrategy::Image {
            selector: parse_static("img"),
            skip_decorative: true,
        },
        FieldStrategy::Image {
            selector: parse_static("img"),
            skip_decorative: false,
        },
    ],
    detail_url: vec![
        FieldStrategy::Attr {
            selector: parse_static(r#"a[href*="/product/"]"#),
            attr: "href",
        },
        FieldStrategy::OwnAttr("href"),
        FieldStrategy::Attr {
            selector: parse_static("a[href]"),
            attr: "href",
        },
    ],
});

/// One way of pulling a field out of a listing element.
#[derive(Debug, Clone)]
pub enum FieldStrategy {
    /// Whitespace-collapsed text of the first matching descendant with text.
    Text(Selector),
    /// Attribute of the first matching descendant carrying it.
    Attr {
        selector: Selector,
        attr: &'static str,
    },
    /// Attribute of the listing element itself.
    OwnAttr(&'static str),
    /// Image source (`src`, `data-src`, first `srcset` candidate) of the
    /// first matching `img`, optionally skipping decorative assets.
    Image {
        selector: Selector,
        skip_decorative: bool,
    },
    /// First regex match over the listing's full text.
    Pattern(Regex),
}

impl FieldStrategy {
    fn apply(&self, element: ElementRef<'_>) -> Option<String> {
        match self {
            FieldStrategy::Text(selector) => element
                .select(selector)
                .map(collapsed_text)
                .find(|text| !text.is_empty()),
            FieldStrategy::Attr { selector, attr } => element
                .select(selector)
                .filter_map(|el| non_empty_attr(el, attr))
                .next(),
            FieldStrategy::OwnAttr(attr) => non_empty_attr(element, attr),
            FieldStrategy::Image {
                selector,
                skip_decorative,
            } => element
                .select(selector)
                .filter_map(image_source)
                .find(|src| !skip_decorative || !is_decorative_image(src)),
            FieldStrategy::Pattern(re) => {
                let text = collapsed_text(element);
                re.find(&text).map(|m| m.as_str().trim().to_owned())
            }
        }
    }
}

/// Ordered extraction strategies per field for one region.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    pub name: Vec<FieldStrategy>,
    pub price: Vec<FieldStrategy>,
    pub image: Vec<FieldStrategy>,
    pub detail_url: Vec<FieldStrategy>,
}

impl ListingSelectors {
    /// Default strategies plus a price pattern matching `region`'s symbol.
    #[must_use]
    pub fn for_region(region: &Region) -> Self {
        let mut selectors = BASE_SELECTORS.clone();
        match price_patterns(region.currency_symbol) {
            Ok((prefixed, suffixed)) => {
                selectors.price.push(FieldStrategy::Pattern(prefixed));
                selectors.price.push(FieldStrategy::Pattern(suffixed));
            }
            Err(e) => {
                tracing::warn!(region = region.code, error = %e, "price pattern unavailable");
            }
        }
        selectors
    }
}

/// Builds regexes for symbol-prefixed (`"€59,99"`, `"R$ 249,90"`) and
/// symbol-suffixed (`"59,99 zł"`) amounts.
///
/// They are separate strategies so a number in the title followed by a
/// prefixed price (`"DOOM 64 €19,99"`) yields the price. Longer symbols are
/// tried first so `R$` wins over `$`.
fn price_patterns(region_symbol: &str) -> Result<(Regex, Regex), regex::Error> {
    let mut symbols: Vec<&str> = Vec::new();
    for symbol in std::iter::once(region_symbol).chain(COMMON_CURRENCY_SYMBOLS.iter().copied()) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols.sort_by_key(|s| std::cmp::Reverse(s.chars().count()));

    let alternation = symbols
        .iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|");
    let prefixed = Regex::new(&format!(r"(?:{alternation})\s?\d[\d.,]*"))?;
    let suffixed = Regex::new(&format!(r"\d[\d.,]*\s?(?:{alternation})"))?;
    Ok((prefixed, suffixed))
}

/// Result of one extraction pass over a results page.
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    pub listings: Vec<RawListing>,
    /// Elements dropped because a required field (name, price) was missing.
    pub skipped: usize,
    /// Container selector that matched, if any did.
    pub container: Option<&'static str>,
}

/// Extracts the fields of one listing element.
///
/// Returns `None` when no strategy produced a name or a price.
#[must_use]
pub fn extract_listing(element: ElementRef<'_>, selectors: &ListingSelectors) -> Option<RawListing> {
    let name = first_match(element, &selectors.name)?;
    let price_text = first_match(element, &selectors.price)?;
    Some(RawListing {
        name: Some(name),
        price_text: Some(price_text),
        image_url: first_match(element, &selectors.image),
        detail_url: first_match(element, &selectors.detail_url),
    })
}

/// Parses a results page and extracts every listing.
///
/// The parsed document stays inside this function, so callers can hold the
/// outcome across await points.
#[must_use]
pub fn extract_listings(html: &str, selectors: &ListingSelectors) -> ExtractionOutcome {
    let document = Html::parse_document(html);

    let Some((css, elements)) = CONTAINERS.iter().find_map(|(css, selector)| {
        let elements = outermost(document.select(selector).collect());
        (!elements.is_empty()).then_some((*css, elements))
    }) else {
        tracing::debug!("no listing containers found on page");
        return ExtractionOutcome::default();
    };

    let mut outcome = ExtractionOutcome {
        container: Some(css),
        ..ExtractionOutcome::default()
    };
    for (position, element) in elements.into_iter().enumerate() {
        if let Some(listing) = extract_listing(element, selectors) {
            outcome.listings.push(listing);
        } else {
            tracing::debug!(position, container = css, "skipped listing without name or price");
            outcome.skipped += 1;
        }
    }

    tracing::debug!(
        container = css,
        listings = outcome.listings.len(),
        skipped = outcome.skipped,
        "extracted listings"
    );
    outcome
}

/// Resolves `href` against `origin` and drops query and fragment.
///
/// Returns `None` for unresolvable or non-HTTP(S) links.
#[must_use]
pub fn canonical_url(origin: &Url, href: &str) -> Option<String> {
    let mut url = absolute(origin, href)?;
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

/// Resolves `href` against `origin`, keeping the query (image CDNs use it).
#[must_use]
pub fn absolute_url(origin: &Url, href: &str) -> Option<String> {
    absolute(origin, href).map(String::from)
}

fn absolute(origin: &Url, href: &str) -> Option<Url> {
    let url = origin.join(href.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Whether `src` looks like a decorative asset rather than product art.
#[must_use]
pub fn is_decorative_image(src: &str) -> bool {
    let lower = src.to_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or(&lower);
    path.ends_with(".svg")
        || DECORATIVE_IMAGE_MARKERS
            .iter()
            .any(|marker| path.contains(marker))
}

/// Drops matches nested inside another match, so a tile's own
/// `data-qa="...#productTile0#price"` children are not treated as tiles.
fn outermost(elements: Vec<ElementRef<'_>>) -> Vec<ElementRef<'_>> {
    let ids: HashSet<_> = elements.iter().map(|el| el.id()).collect();
    elements
        .into_iter()
        .filter(|el| !el.ancestors().any(|ancestor| ids.contains(&ancestor.id())))
        .collect()
}

fn first_match(element: ElementRef<'_>, strategies: &[FieldStrategy]) -> Option<String> {
    strategies.iter().find_map(|strategy| strategy.apply(element))
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty_attr(element: ElementRef<'_>, attr: &str) -> Option<String> {
    element
        .value()
        .attr(attr)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// `src`, then `data-src`, then the first `srcset` candidate. Inline `data:`
/// placeholders used for lazy loading are ignored.
fn image_source(img: ElementRef<'_>) -> Option<String> {
    let usable = |v: &String| !v.starts_with("data:");
    non_empty_attr(img, "src")
        .filter(usable)
        .or_else(|| non_empty_attr(img, "data-src").filter(usable))
        .or_else(|| {
            non_empty_attr(img, "srcset").and_then(|srcset| {
                srcset
                    .split(',')
                    .next()
                    .and_then(|candidate| candidate.split_whitespace().next())
                    .map(str::to_owned)
            })
        })
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
