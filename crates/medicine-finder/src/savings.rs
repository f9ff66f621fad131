/// Savings calculator.
///
/// All arithmetic is unrounded; `round_cents` exists for the presentation layer only.
use crate::error::AppError;
use crate::locality::LocalityTable;
use crate::model::MedicineRecord;

/// Yearly (or per-period) totals for a brand/generic price pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavingsBreakdown {
    pub brand_total: f64,
    pub generic_total: f64,
    /// `brand_total - generic_total`; negative when the generic costs more.
    pub absolute_savings: f64,
    /// Share of `brand_total` saved, in percent. Zero when `brand_total` is zero.
    pub percent_savings: f64,
}

/// Compute totals over `frequency` fills.
///
/// Negative or non-finite prices and a zero frequency are rejected.
pub fn calculate(
    brand_price: f64,
    generic_price: f64,
    frequency: u32,
) -> Result<SavingsBreakdown, AppError> {
    check_price("brand_price", brand_price)?;
    check_price("generic_price", generic_price)?;
    if frequency == 0 {
        return Err(AppError::invalid("frequency must be a positive integer"));
    }

    let frequency = f64::from(frequency);
    let brand_total = brand_price * frequency;
    let generic_total = generic_price * frequency;
    let absolute_savings = brand_total - generic_total;
    let percent_savings = if brand_total > 0.0 {
        absolute_savings / brand_total * 100.0
    } else {
        0.0
    };

    Ok(SavingsBreakdown {
        brand_total,
        generic_total,
        absolute_savings,
        percent_savings,
    })
}

/// Validate a frequency supplied as an arbitrary JSON number.
pub fn frequency_from(value: f64) -> Result<u32, AppError> {
    if !value.is_finite() || value <= 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(AppError::invalid(
            "prescriptions_per_year must be a positive integer",
        ));
    }
    Ok(value as u32)
}

fn check_price(name: &str, price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::invalid(format!(
            "{name} must be a non-negative number"
        )));
    }
    Ok(())
}

/// Therapy-length estimate for a catalog medicine.
#[derive(Debug, Clone, PartialEq)]
pub struct SavingsEstimate {
    pub months: u32,
    pub monthly_quantity: f64,
    pub monthly_brand_cost: f64,
    pub monthly_generic_cost: f64,
    pub monthly_savings: f64,
    pub totals: SavingsBreakdown,
}

/// Estimate savings over `months` of therapy, filling `monthly_quantity` packs a month
/// at locality-adjusted catalog prices.
pub fn estimate(
    record: &MedicineRecord,
    months: i64,
    monthly_quantity: f64,
    localities: &LocalityTable,
    locality: Option<&str>,
) -> Result<SavingsEstimate, AppError> {
    if months <= 0 || months > i64::from(u32::MAX) {
        return Err(AppError::invalid("months must be a positive integer"));
    }
    if !monthly_quantity.is_finite() || monthly_quantity <= 0.0 {
        return Err(AppError::invalid("monthly_quantity must be positive"));
    }
    let months = months as u32;

    let monthly_brand_cost =
        localities.adjust(record.average_brand_price, locality) * monthly_quantity;
    let monthly_generic_cost =
        localities.adjust(record.average_generic_price, locality) * monthly_quantity;
    let totals = calculate(monthly_brand_cost, monthly_generic_cost, months)?;

    Ok(SavingsEstimate {
        months,
        monthly_quantity,
        monthly_brand_cost,
        monthly_generic_cost,
        monthly_savings: monthly_brand_cost - monthly_generic_cost,
        totals,
    })
}

/// Round to two decimal places for display.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
