//! Static storefront region table.
//!
//! Each region maps a public code (`"BE"`) to the storefront locale path
//! segment (`"en-be"`) and the currency prices are listed in. Supporting a new
//! region is one entry in [`REGIONS`].

use serde::Serialize;

/// Currency every exchange rate is expressed against.
pub const REFERENCE_CURRENCY: &str = "EUR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub code: &'static str,
    pub locale: &'static str,
    pub currency_code: &'static str,
    pub currency_symbol: &'static str,
}

pub static REGIONS: &[Region] = &[
    Region {
        code: "US",
        locale: "en-us",
        currency_code: "USD",
        currency_symbol: "$",
    },
    Region {
        code: "CA",
        locale: "en-ca",
        currency_code: "CAD",
        currency_symbol: "$",
    },
    Region {
        code: "GB",
        locale: "en-gb",
        currency_code: "GBP",
        currency_symbol: "£",
    },
    Region {
        code: "BE",
        locale: "en-be",
        currency_code: "EUR",
        currency_symbol: "€",
    },
    Region {
        code: "DE",
        locale: "de-de",
        currency_code: "EUR",
        currency_symbol: "€",
    },
    Region {
        code: "FR",
        locale: "fr-fr",
        currency_code: "EUR",
        currency_symbol: "€",
    },
    Region {
        code: "NL",
        locale: "nl-nl",
        currency_code: "EUR",
        currency_symbol: "€",
    },
    Region {
        code: "ES",
        locale: "es-es",
        currency_code: "EUR",
        currency_symbol: "€",
    },
    Region {
        code: "IT",
        locale: "it-it",
        currency_code: "EUR",
        currency_symbol: "€",
    },
    Region {
        code: "JP",
        locale: "ja-jp",
        currency_code: "JPY",
        currency_symbol: "¥",
    },
    Region {
        code: "AU",
        locale: "en-au",
        currency_code: "AUD",
        currency_symbol: "$",
    },
    Region {
        code: "BR",
        locale: "pt-br",
        currency_code: "BRL",
        currency_symbol: "R$",
    },
    Region {
        code: "PL",
        locale: "pl-pl",
        currency_code: "PLN",
        currency_symbol: "zł",
    },
    Region {
        code: "SE",
        locale: "sv-se",
        currency_code: "SEK",
        currency_symbol: "kr",
    },
    Region {
        code: "CH",
        locale: "de-ch",
        currency_code: "CHF",
        currency_symbol: "CHF",
    },
];

/// Looks up a region by its public code, case-insensitively.
#[must_use]
pub fn find_region(code: &str) -> Option<&'static Region> {
    let code = code.trim();
    REGIONS.iter().find(|r| r.code.eq_ignore_ascii_case(code))
}
