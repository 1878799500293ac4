//! Product metadata parsing from storefront detail pages.
//!
//! Detail pages usually embed a schema.org `Product` as JSON-LD. When that is
//! missing or partial, Open Graph tags and the price elements of the purchase
//! panel fill the gaps.

use std::sync::LazyLock;

use chrono::Utc;
use scraper::{Html, Selector};
use serde_json::Value;
use storescout_core::{MetadataCacheEntry, Region};

use crate::error::ScraperError;
use crate::price::parse_price;

fn parse_static(css: &str) -> Selector {
    Selector::parse(css).expect("valid static selector")
}

static JSON_LD: LazyLock<Selector> =
    LazyLock::new(|| parse_static(r#"script[type="application/ld+json"]"#));
static OG_TITLE: LazyLock<Selector> =
    LazyLock::new(|| parse_static(r#"meta[property="og:title"]"#));
static OG_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| parse_static(r#"meta[property="og:image"]"#));
static TITLE_ELEMENT: LazyLock<Selector> = LazyLock::new(|| {
    parse_static(r#"[data-qa="mfe-game-title#name"], [data-qa*="game-title"], h1"#)
});
static FINAL_PRICE: LazyLock<Selector> =
    LazyLock::new(|| parse_static(r#"[data-qa*="finalPrice"]"#));
static ORIGINAL_PRICE: LazyLock<Selector> =
    LazyLock::new(|| parse_static(r#"[data-qa*="originalPrice"]"#));

/// Fields recovered from a schema.org `Product` block.
#[derive(Debug, Default)]
struct JsonLdProduct {
    name: Option<String>,
    image: Option<String>,
    price: Option<f64>,
    currency: Option<String>,
}

/// Parses product metadata out of a detail page.
///
/// Name and price are required. Prices from the page's price panel take
/// precedence over JSON-LD offers because the panel reflects active
/// discounts; a strikethrough price above the final price becomes the base
/// price and the final price the discount.
///
/// # Errors
///
/// Returns [`ScraperError::Metadata`] when no name or no price can be found.
pub fn parse_product_metadata(
    html: &str,
    product_id: &str,
    region: &Region,
) -> Result<MetadataCacheEntry, ScraperError> {
    let document = Html::parse_document(html);
    let json_ld = find_json_ld_product(&document).unwrap_or_default();

    let display_name = json_ld
        .name
        .or_else(|| meta_content(&document, &OG_TITLE))
        .or_else(|| first_text(&document, &TITLE_ELEMENT))
        .ok_or_else(|| ScraperError::Metadata {
            product_id: product_id.to_owned(),
            reason: "no product name on detail page".to_owned(),
        })?;

    let final_price = first_text(&document, &FINAL_PRICE).map(|t| parse_price(&t));
    let original_price = first_text(&document, &ORIGINAL_PRICE).map(|t| parse_price(&t));

    let (base_price, discounted_price) = match (final_price.or(json_ld.price), original_price) {
        (Some(current), Some(original)) if original > current => (original, Some(current)),
        (Some(current), _) => (current, None),
        (None, _) => {
            return Err(ScraperError::Metadata {
                product_id: product_id.to_owned(),
                reason: "no price on detail page".to_owned(),
            });
        }
    };

    let image_url = json_ld
        .image
        .or_else(|| meta_content(&document, &OG_IMAGE));
    let currency_code = json_ld
        .currency
        .map(|c| c.to_uppercase())
        .unwrap_or_else(|| region.currency_code.to_owned());

    Ok(MetadataCacheEntry {
        product_id: product_id.to_owned(),
        display_name,
        base_price,
        discounted_price,
        currency_code,
        image_url,
        fetched_at: Utc::now(),
    })
}

fn find_json_ld_product(document: &Html) -> Option<JsonLdProduct> {
    document
        .select(&JSON_LD)
        .filter_map(|script| {
            let body: String = script.text().collect();
            match serde_json::from_str::<Value>(body.trim()) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed JSON-LD block");
                    None
                }
            }
        })
        .find_map(|value| product_node(&value).map(json_ld_product))
}

/// Finds the first `@type: Product` node in a JSON-LD value, looking
/// through top-level arrays and `@graph`.
fn product_node(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(product_node),
        Value::Object(map) => {
            let is_product = match map.get("@type") {
                Some(Value::String(t)) => t == "Product",
                Some(Value::Array(types)) => types.iter().any(|t| t == "Product"),
                _ => false,
            };
            if is_product {
                Some(value)
            } else {
                map.get("@graph").and_then(product_node)
            }
        }
        _ => None,
    }
}

fn json_ld_product(node: &Value) -> JsonLdProduct {
    let image = match node.get("image") {
        Some(Value::String(url)) => Some(url.clone()),
        Some(Value::Array(urls)) => urls.iter().find_map(Value::as_str).map(str::to_owned),
        Some(Value::Object(obj)) => obj.get("url").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    };

    let offer = match node.get("offers") {
        Some(Value::Array(offers)) => offers.first(),
        other => other,
    };
    let price = offer.and_then(|o| o.get("price")).and_then(|p| match p {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => Some(parse_price(s)),
        _ => None,
    });
    let currency = offer
        .and_then(|o| o.get("priceCurrency"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    JsonLdProduct {
        name: node
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_owned),
        image,
        price: price.filter(|p| p.is_finite() && *p >= 0.0),
        currency,
    }
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_owned)
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|el| el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "))
        .find(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use storescout_core::find_region;

    use super::*;

    fn be() -> &'static Region {
        find_region("BE").expect("BE configured")
    }

    #[test]
    fn json_ld_product_is_preferred() {
        let html = r#"
            <html><head>
              <meta property="og:title" content="OG Title">
              <script type="application/ld+json">
                {"@context":"https://schema.org","@type":"Product","name":"DOOM",
                 "image":["https://image.example.net/doom.png?w=54"],
                 "offers":{"@type":"Offer","price":"19.99","priceCurrency":"eur"}}
              </script>
            </head><body></body></html>
        "#;
        let entry = parse_product_metadata(html, "EP1003", be()).expect("metadata");
        assert_eq!(entry.display_name, "DOOM");
        assert!((entry.base_price - 19.99).abs() < 1e-9);
        assert!(entry.discounted_price.is_none());
        assert_eq!(entry.currency_code, "EUR");
        assert_eq!(
            entry.image_url.as_deref(),
            Some("https://image.example.net/doom.png?w=54")
        );
    }

    #[test]
    fn graph_nodes_are_searched() {
        let html = r#"
            <script type="application/ld+json">
              {"@graph":[{"@type":"BreadcrumbList"},
                         {"@type":["Product","VideoGame"],"name":"Astro Bot",
                          "offers":[{"price":59.99}]}]}
            </script>
        "#;
        let entry = parse_product_metadata(html, "UP9000", be()).expect("metadata");
        assert_eq!(entry.display_name, "Astro Bot");
        assert!((entry.base_price - 59.99).abs() < 1e-9);
        assert_eq!(entry.currency_code, "EUR");
    }

    #[test]
    fn price_panel_reports_discount() {
        let html = r#"
            <html><head><meta property="og:title" content="DOOM Eternal">
            <meta property="og:image" content="https://image.example.net/eternal.png"></head>
            <body>
              <span data-qa="mfeCtaMain#offer0#finalPrice">€9,99</span>
              <span data-qa="mfeCtaMain#offer0#originalPrice">€39,99</span>
            </body></html>
        "#;
        let entry = parse_product_metadata(html, "EP1003", be()).expect("metadata");
        assert_eq!(entry.display_name, "DOOM Eternal");
        assert!((entry.base_price - 39.99).abs() < 1e-9);
        assert!((entry.effective_price() - 9.99).abs() < 1e-9);
        assert_eq!(
            entry.image_url.as_deref(),
            Some("https://image.example.net/eternal.png")
        );
    }

    #[test]
    fn malformed_json_ld_falls_back_to_markup() {
        let html = r#"
            <script type="application/ld+json">{not json</script>
            <h1>Ratchet &amp; Clank</h1>
            <span data-qa="mfeCtaMain#offer0#finalPrice">€19,99</span>
        "#;
        let entry = parse_product_metadata(html, "EP9000", be()).expect("metadata");
        assert_eq!(entry.display_name, "Ratchet & Clank");
        assert!((entry.base_price - 19.99).abs() < 1e-9);
    }

    #[test]
    fn missing_price_is_an_error() {
        let html = "<h1>Coming Soon</h1>";
        let err = parse_product_metadata(html, "EP0001", be()).unwrap_err();
        assert!(matches!(err, ScraperError::Metadata { .. }));
    }

    #[test]
    fn missing_name_is_an_error() {
        let html = r#"<span data-qa="finalPrice">€1,00</span>"#;
        let err = parse_product_metadata(html, "EP0001", be()).unwrap_err();
        assert!(err.to_string().contains("no product name"));
    }
}
