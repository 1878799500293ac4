//! Locale-aware price parsing.

/// Parses a storefront price string such as `"€59,99"` or `"$1,234.56"`.
///
/// Everything except digits, commas and dots is stripped. The rightmost of the
/// last comma and last dot is the decimal separator when at most two digits
/// follow it; otherwise every separator is a thousands separator. So
/// `"1.234,56"` is `1234.56` while `"1,234"` is `1234`.
///
/// Never fails: text without digits (`"Free"`, `"Included"`) yields `0.0`, and
/// the result is always finite and non-negative.
#[must_use]
pub fn parse_price(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return 0.0;
    }

    let separator_pos = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(c), Some(d)) => Some(c.max(d)),
        (Some(p), None) | (None, Some(p)) => Some(p),
        (None, None) => None,
    };

    let normalized = match separator_pos {
        Some(pos) if cleaned.len() - pos - 1 <= 2 => {
            let integer: String = cleaned[..pos]
                .chars()
                .filter(char::is_ascii_digit)
                .collect();
            let fraction = &cleaned[pos + 1..];
            match (integer.is_empty(), fraction.is_empty()) {
                (_, true) => integer,
                (true, false) => format!("0.{fraction}"),
                (false, false) => format!("{integer}.{fraction}"),
            }
        }
        _ => cleaned.chars().filter(char::is_ascii_digit).collect(),
    };

    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => 0.0,
    }
}

/// Rewrites a storefront image URL to request the high-resolution rendition.
///
/// Image CDNs take the width as a `w` query parameter and serve thumbnails
/// when `thumb=true` is present; the width is forced to 1024 and the
/// thumbnail flag dropped. URLs that cannot be parsed are returned unchanged.
#[must_use]
pub fn upscale_image_url(url: &str) -> String {
    const HIGH_RES_WIDTH: &str = "1024";

    let Ok(mut parsed) = reqwest::Url::parse(url) else {
        return url.to_owned();
    };
    if parsed.query().is_none() {
        return url.to_owned();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "thumb")
        .map(|(k, v)| {
            if k == "w" {
                (k.into_owned(), HIGH_RES_WIDTH.to_owned())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();

    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
    }
    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn parses_dot_decimal_with_comma_thousands() {
        assert_close(parse_price("1,234.56"), 1234.56);
        assert_close(parse_price("$1,234.56"), 1234.56);
    }

    #[test]
    fn parses_comma_decimal_with_dot_thousands() {
        assert_close(parse_price("1.234,56"), 1234.56);
        assert_close(parse_price("1.234,56 €"), 1234.56);
    }

    #[test]
    fn parses_plain_integer() {
        assert_close(parse_price("1234"), 1234.0);
    }

    #[test]
    fn parses_euro_comma_decimal() {
        assert_close(parse_price("€59,99"), 59.99);
    }

    #[test]
    fn three_trailing_digits_mean_thousands() {
        assert_close(parse_price("1,234"), 1234.0);
        assert_close(parse_price("¥6,800"), 6800.0);
        assert_close(parse_price("1.234.567"), 1_234_567.0);
    }

    #[test]
    fn single_decimal_digit_is_fraction() {
        assert_close(parse_price("12.5"), 12.5);
        assert_close(parse_price("R$ 249,9"), 249.9);
    }

    #[test]
    fn trailing_separator_is_ignored() {
        assert_close(parse_price("59,"), 59.0);
    }

    #[test]
    fn leading_separator_is_fraction_only() {
        assert_close(parse_price(".99"), 0.99);
    }

    #[test]
    fn garbage_yields_zero() {
        assert_close(parse_price("Free"), 0.0);
        assert_close(parse_price(""), 0.0);
        assert_close(parse_price("..,"), 0.0);
        assert_close(parse_price("Included with PlayStation Plus"), 0.0);
    }

    #[test]
    fn minus_sign_is_stripped() {
        assert_close(parse_price("-5.00"), 5.0);
    }

    #[test]
    fn upscale_sets_width_and_drops_thumb() {
        let url = "https://image.api.example.net/cdn/EP1003/abc.png?w=54&thumb=true";
        assert_eq!(
            upscale_image_url(url),
            "https://image.api.example.net/cdn/EP1003/abc.png?w=1024"
        );
    }

    #[test]
    fn upscale_drops_query_when_only_thumb() {
        let url = "https://image.api.example.net/abc.png?thumb=true";
        assert_eq!(
            upscale_image_url(url),
            "https://image.api.example.net/abc.png"
        );
    }

    #[test]
    fn upscale_leaves_plain_urls_alone() {
        assert_eq!(
            upscale_image_url("https://cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );
        assert_eq!(upscale_image_url("not a url"), "not a url");
    }
}
