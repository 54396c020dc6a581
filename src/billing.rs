// src/billing.rs
//
// Pricing rules for credit packages. Prices are kept in MXN centavos;
// other currencies are derived from the configured exchange rate.

use std::fmt;
use std::str::FromStr;

use crate::catalog::CreditPackage;
use crate::error::CheckoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Currency {
    #[default]
    Mxn,
    Usd,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::Mxn => "mxn",
            Currency::Usd => "usd",
        }
    }

    /// Checkout page locale.
    pub fn locale(self) -> &'static str {
        match self {
            Currency::Mxn => "es-419",
            Currency::Usd => "en",
        }
    }

    /// OXXO vouchers settle in MXN only.
    pub fn accepts_voucher(self) -> bool {
        matches!(self, Currency::Mxn)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "mxn" => Ok(Currency::Mxn),
            "usd" => Ok(Currency::Usd),
            other => Err(CheckoutError::UnsupportedCurrency(other.to_string())),
        }
    }
}

/// USD cents equivalent of an MXN centavo amount at `mxn_per_usd`.
pub fn usd_cents_from_mxn(mxn_cents: i64, mxn_per_usd: f64) -> i64 {
    (mxn_cents as f64 / mxn_per_usd).round() as i64
}

/// What a package costs in one currency, plus its canonical MXN amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub currency: Currency,
    pub unit_amount: i64,
    pub amount_mxn_cents: i64,
    pub amount_usd_cents: Option<i64>,
}

pub fn quote(package: &CreditPackage, currency: Currency, mxn_per_usd: f64) -> Quote {
    let mxn = package.price_mxn_cents;
    match currency {
        Currency::Mxn => Quote {
            currency,
            unit_amount: mxn,
            amount_mxn_cents: mxn,
            amount_usd_cents: None,
        },
        Currency::Usd => {
            let usd = usd_cents_from_mxn(mxn, mxn_per_usd);
            Quote {
                currency,
                unit_amount: usd,
                amount_mxn_cents: mxn,
                amount_usd_cents: Some(usd),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::credit_package;

    #[test]
    fn usd_quote_keeps_canonical_amount() {
        let pack = credit_package("pack_10").unwrap();
        let q = quote(pack, Currency::Usd, 17.5);
        // 15000 / 17.5 = 857.14
        assert_eq!(q.unit_amount, 857);
        assert_eq!(q.amount_mxn_cents, 15_000);
        assert_eq!(q.amount_usd_cents, Some(857));

        let q = quote(pack, Currency::Mxn, 17.5);
        assert_eq!(q.unit_amount, 15_000);
        assert_eq!(q.amount_usd_cents, None);
    }

    #[test]
    fn rounding_is_to_nearest_cent() {
        assert_eq!(usd_cents_from_mxn(129_000, 17.5), 7_371);
        assert_eq!(usd_cents_from_mxn(35, 17.5), 2);
    }

    #[test]
    fn currency_parsing() {
        assert_eq!("".parse::<Currency>().unwrap(), Currency::Mxn);
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Usd);
        assert!(matches!(
            "eur".parse::<Currency>(),
            Err(CheckoutError::UnsupportedCurrency(c)) if c == "eur"
        ));
        assert_eq!(Currency::Usd.locale(), "en");
        assert!(!Currency::Usd.accepts_voucher());
    }
}
