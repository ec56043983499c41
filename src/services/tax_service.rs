use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::TaxConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxSplit {
    pub sub_total: Decimal,
    pub c_gst: Decimal,
    pub s_gst: Decimal,
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Splits a tax-inclusive total into subtotal, CGST and SGST.
///
/// When prices are not tax-inclusive the whole total is the subtotal. SGST is
/// taken as the remainder so the three parts always add up to `total`.
pub fn split_gst(total: Decimal, config: &TaxConfig) -> TaxSplit {
    if !config.prices_with_tax || config.tax_rate <= Decimal::ZERO {
        return TaxSplit {
            sub_total: round2(total),
            c_gst: Decimal::ZERO,
            s_gst: Decimal::ZERO,
        };
    }

    let rate = config.tax_rate / Decimal::ONE_HUNDRED;
    let half_rate = rate / Decimal::TWO;

    let sub_total = round2(total / (Decimal::ONE + rate));
    let c_gst = round2(sub_total * half_rate);
    let s_gst = round2(total - sub_total - c_gst);

    TaxSplit {
        sub_total,
        c_gst,
        s_gst,
    }
}
