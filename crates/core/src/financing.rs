//! Financing math behind the credit, leasing and amortization pages.

use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::FinancingConfig;

const MONTHS_PER_YEAR: u32 = 12;
const DEFAULT_SCHEDULE_YEARS: u32 = 20;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FinancingError {
    #[error("financing arithmetic overflowed while computing {0}")]
    Overflow(&'static str),
}

fn cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::AwayFromZero)
}

fn monthly_rate(annual_rate_percent: Decimal) -> Decimal {
    annual_rate_percent / Decimal::ONE_HUNDRED / Decimal::from(MONTHS_PER_YEAR)
}

fn compound(rate: Decimal, months: u32) -> Result<Decimal, FinancingError> {
    (Decimal::ONE + rate)
        .checked_powi(i64::from(months))
        .ok_or(FinancingError::Overflow("compound growth"))
}

/// Fixed monthly payment of an amortizing loan,
/// `A = P*r*(1+r)^n / ((1+r)^n - 1)`, rounded up to whole cents.
///
/// A zero term returns the principal. A zero rate returns the exact
/// quotient `P/n`; rounding is left to presentation.
pub fn monthly_payment(
    principal: Decimal,
    annual_rate_percent: Decimal,
    months: u32,
) -> Result<Decimal, FinancingError> {
    if months == 0 {
        return Ok(principal);
    }
    let rate = monthly_rate(annual_rate_percent);
    if rate.is_zero() {
        return Ok(principal / Decimal::from(months));
    }

    let growth = compound(rate, months)?;
    let numerator = principal
        .checked_mul(rate)
        .and_then(|value| value.checked_mul(growth))
        .ok_or(FinancingError::Overflow("annuity"))?;
    numerator
        .checked_div(growth - Decimal::ONE)
        .map(cents)
        .ok_or(FinancingError::Overflow("annuity"))
}

/// Outstanding balance after `months_paid` payments.
pub fn remaining_balance(
    principal: Decimal,
    annual_rate_percent: Decimal,
    payment: Decimal,
    months_paid: u32,
) -> Result<Decimal, FinancingError> {
    let overflow = || FinancingError::Overflow("remaining balance");
    let rate = monthly_rate(annual_rate_percent);
    let balance = if rate.is_zero() {
        let paid = payment.checked_mul(Decimal::from(months_paid)).ok_or_else(overflow)?;
        principal - paid
    } else {
        let growth = compound(rate, months_paid)?;
        let grown = principal.checked_mul(growth).ok_or_else(overflow)?;
        let paid = payment
            .checked_mul(growth - Decimal::ONE)
            .and_then(|value| value.checked_div(rate))
            .ok_or_else(overflow)?;
        grown.checked_sub(paid).ok_or_else(overflow)?
    };
    Ok(balance.max(Decimal::ZERO).round_dp(2))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCalculation {
    pub principal: Decimal,
    pub annual_rate_percent: Decimal,
    pub months: u32,
    pub monthly_payment: Decimal,
    pub total_paid: Decimal,
    pub total_interest: Decimal,
}

pub fn calculate_credit(
    principal: Decimal,
    annual_rate_percent: Decimal,
    months: u32,
) -> Result<CreditCalculation, FinancingError> {
    let payment = monthly_payment(principal, annual_rate_percent, months)?;
    // An interest-free loan repays exactly the principal, whatever the quotient's scale.
    let total_paid = if months == 0 || monthly_rate(annual_rate_percent).is_zero() {
        principal
    } else {
        payment
            .checked_mul(Decimal::from(months))
            .ok_or(FinancingError::Overflow("credit total"))?
    };

    Ok(CreditCalculation {
        principal,
        annual_rate_percent,
        months,
        monthly_payment: payment,
        total_paid,
        total_interest: total_paid - principal,
    })
}

/// Leasing with a fixed monthly factor on the principal and a residual
/// value due at the end of the term.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeasingCalculation {
    pub principal: Decimal,
    pub leasing_factor_percent: Decimal,
    pub months: u32,
    pub monthly_rate: Decimal,
    pub total_rates: Decimal,
    pub residual_value: Decimal,
    pub total_cost: Decimal,
}

pub fn calculate_leasing(
    principal: Decimal,
    leasing_factor_percent: Decimal,
    months: u32,
    residual_value_percent: Decimal,
) -> LeasingCalculation {
    let rate = cents(principal * leasing_factor_percent / Decimal::ONE_HUNDRED);
    let total_rates = rate * Decimal::from(months);
    let residual_value = cents(principal * residual_value_percent / Decimal::ONE_HUNDRED);

    LeasingCalculation {
        principal,
        leasing_factor_percent,
        months,
        monthly_rate: rate,
        total_rates,
        residual_value,
        total_cost: total_rates + residual_value,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationYear {
    pub year: u32,
    pub annual_savings: Decimal,
    pub cumulative_savings: Decimal,
    pub credit_payments: Decimal,
    pub remaining_balance: Decimal,
    /// Cumulative savings minus the investment.
    pub net_position: Decimal,
    pub is_break_even: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub rows: Vec<AmortizationYear>,
    pub break_even_year: Option<u32>,
}

pub fn amortization_schedule(
    investment: Decimal,
    annual_savings: Decimal,
    credit: &CreditCalculation,
    years: u32,
) -> Result<AmortizationSchedule, FinancingError> {
    let mut rows = Vec::with_capacity(years as usize);
    let mut break_even_year = None;
    let mut cumulative_savings = Decimal::ZERO;

    for year in 1..=years {
        cumulative_savings += annual_savings;
        let months_paid = (year * MONTHS_PER_YEAR).min(credit.months);
        let previous_months = ((year - 1) * MONTHS_PER_YEAR).min(credit.months);
        let credit_payments =
            cents(credit.monthly_payment * Decimal::from(months_paid - previous_months));
        let balance = if credit.months == 0 {
            Decimal::ZERO
        } else {
            remaining_balance(
                credit.principal,
                credit.annual_rate_percent,
                credit.monthly_payment,
                months_paid,
            )?
        };
        let net_position = cumulative_savings - investment;
        let is_break_even = break_even_year.is_none() && net_position >= Decimal::ZERO;
        if is_break_even {
            break_even_year = Some(year);
        }

        rows.push(AmortizationYear {
            year,
            annual_savings,
            cumulative_savings,
            credit_payments,
            remaining_balance: balance,
            net_position,
            is_break_even,
        });
    }

    Ok(AmortizationSchedule { rows, break_even_year })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancingOption {
    Cash,
    Credit,
    Leasing,
}

impl FinancingOption {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Barkauf",
            Self::Credit => "Kredit",
            Self::Leasing => "Leasing",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingComparison {
    pub cash_total: Decimal,
    pub credit: CreditCalculation,
    pub leasing: LeasingCalculation,
    pub cheapest: FinancingOption,
}

impl FinancingComparison {
    pub fn total_for(&self, option: FinancingOption) -> Decimal {
        match option {
            FinancingOption::Cash => self.cash_total,
            FinancingOption::Credit => self.credit.total_paid,
            FinancingOption::Leasing => self.leasing.total_cost,
        }
    }

    pub fn recommendation_text(&self) -> String {
        match self.cheapest {
            FinancingOption::Cash => format!(
                "Empfehlung: Barkauf. Gegenüber dem Kredit sparen Sie {} EUR Zinsen, gegenüber dem Leasing {} EUR.",
                cents(self.credit.total_paid - self.cash_total),
                cents(self.leasing.total_cost - self.cash_total)
            ),
            FinancingOption::Credit => format!(
                "Empfehlung: Kredit. Die monatliche Rate von {} EUR schont Ihre Liquidität bei geringsten Gesamtkosten.",
                cents(self.credit.monthly_payment)
            ),
            FinancingOption::Leasing => format!(
                "Empfehlung: Leasing. Die Leasingrate von {} EUR monatlich ist die günstigste Variante.",
                self.leasing.monthly_rate
            ),
        }
    }
}

pub fn compare_financing(
    principal: Decimal,
    config: &FinancingConfig,
) -> Result<FinancingComparison, FinancingError> {
    let credit =
        calculate_credit(principal, config.interest_rate_percent, config.credit_term_months)?;
    let leasing = calculate_leasing(
        principal,
        config.leasing_factor_percent,
        config.leasing_term_months,
        config.residual_value_percent,
    );

    let mut options = [
        (FinancingOption::Cash, principal),
        (FinancingOption::Credit, credit.total_paid),
        (FinancingOption::Leasing, leasing.total_cost),
    ];
    // Stable sort keeps cash ahead of an equally priced alternative.
    options.sort_by(|left, right| left.1.cmp(&right.1));

    Ok(FinancingComparison { cash_total: principal, credit, leasing, cheapest: options[0].0 })
}

/// Years covered by the amortization table: at least the credit term,
/// never less than the default horizon.
pub fn schedule_years(credit_term_months: u32) -> u32 {
    credit_term_months.div_ceil(MONTHS_PER_YEAR).max(DEFAULT_SCHEDULE_YEARS)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        amortization_schedule, calculate_credit, calculate_leasing, compare_financing,
        monthly_payment, remaining_balance, schedule_years, FinancingError, FinancingOption,
    };
    use crate::config::FinancingConfig;

    #[test]
    fn annuity_matches_reference_value() {
        // 10,000 over 12 months at 6 % p.a.
        let payment = monthly_payment(Decimal::new(10_000, 0), Decimal::new(6, 0), 12);
        assert_eq!(payment, Ok(Decimal::new(86_067, 2)));
    }

    #[test]
    fn zero_rate_divides_principal_evenly() {
        let principal = Decimal::new(12_000, 0);
        let payment = monthly_payment(principal, Decimal::ZERO, 24).expect("payment");

        assert_eq!(payment, principal / Decimal::from(24u32));
        let credit = calculate_credit(principal, Decimal::ZERO, 24).expect("credit");
        assert_eq!(credit.total_interest, Decimal::ZERO);
    }

    #[test]
    fn zero_rate_payment_is_the_unrounded_quotient() {
        let principal = Decimal::new(10_000, 0);
        let payment = monthly_payment(principal, Decimal::ZERO, 3).expect("payment");

        assert_eq!(payment, principal / Decimal::from(3u32));
        assert!(payment.scale() > 2);

        let credit = calculate_credit(principal, Decimal::ZERO, 3).expect("credit");
        assert_eq!(credit.total_paid, principal);
        assert_eq!(credit.total_interest, Decimal::ZERO);
        assert_eq!(remaining_balance(principal, Decimal::ZERO, payment, 3), Ok(Decimal::ZERO));
    }

    #[test]
    fn zero_term_returns_principal() {
        let principal = Decimal::new(15_000, 0);

        assert_eq!(monthly_payment(principal, Decimal::new(5, 0), 0), Ok(principal));
        let credit = calculate_credit(principal, Decimal::new(5, 0), 0).expect("credit");
        assert_eq!(credit.total_paid, principal);
        assert_eq!(credit.total_interest, Decimal::ZERO);
    }

    #[test]
    fn total_interest_is_payments_minus_principal_and_never_negative() {
        for (principal, rate, months) in [
            (Decimal::new(20_000, 0), Decimal::new(45, 1), 180u32),
            (Decimal::new(9_999, 0), Decimal::new(1, 1), 7),
            (Decimal::new(31_415, 0), Decimal::new(129, 1), 240),
        ] {
            let credit = calculate_credit(principal, rate, months).expect("credit");
            assert_eq!(
                credit.monthly_payment * Decimal::from(months) - principal,
                credit.total_interest
            );
            assert!(credit.total_interest >= Decimal::ZERO, "{principal} {rate} {months}");
        }
    }

    #[test]
    fn loan_is_paid_off_at_end_of_term() {
        let principal = Decimal::new(25_000, 0);
        let rate = Decimal::new(39, 1);
        let payment = monthly_payment(principal, rate, 120).expect("payment");

        assert_eq!(remaining_balance(principal, rate, payment, 120), Ok(Decimal::ZERO));
        assert!(remaining_balance(principal, rate, payment, 60).expect("balance") > Decimal::ZERO);
    }

    #[test]
    fn compounding_overflow_is_an_error() {
        let principal = Decimal::new(20_000, 0);
        let rate = Decimal::new(200, 0);

        assert_eq!(
            monthly_payment(principal, rate, 600),
            Err(FinancingError::Overflow("compound growth"))
        );
        assert!(remaining_balance(principal, rate, Decimal::ONE, 600).is_err());

        let config = FinancingConfig {
            interest_rate_percent: rate,
            credit_term_months: 600,
            ..FinancingConfig::default()
        };
        assert!(compare_financing(principal, &config).is_err());
    }

    #[test]
    fn leasing_uses_factor_and_residual_value() {
        let leasing =
            calculate_leasing(Decimal::new(20_000, 0), Decimal::new(12, 1), 120, Decimal::new(10, 0));

        assert_eq!(leasing.monthly_rate, Decimal::new(240, 0));
        assert_eq!(leasing.total_rates, Decimal::new(28_800, 0));
        assert_eq!(leasing.residual_value, Decimal::new(2_000, 0));
        assert_eq!(leasing.total_cost, Decimal::new(30_800, 0));
    }

    #[test]
    fn schedule_marks_first_break_even_year_only() {
        let credit =
            calculate_credit(Decimal::new(10_000, 0), Decimal::new(4, 0), 60).expect("credit");
        let schedule =
            amortization_schedule(Decimal::new(10_000, 0), Decimal::new(1_500, 0), &credit, 20)
                .expect("schedule");

        assert_eq!(schedule.break_even_year, Some(7));
        assert_eq!(schedule.rows.iter().filter(|row| row.is_break_even).count(), 1);
        assert_eq!(schedule.rows[5].remaining_balance, Decimal::ZERO);
        assert_eq!(schedule.rows[5].credit_payments, Decimal::ZERO);
    }

    #[test]
    fn comparison_prefers_cash_when_rates_are_positive() {
        let comparison = compare_financing(Decimal::new(20_000, 0), &FinancingConfig::default())
            .expect("comparison");

        assert_eq!(comparison.cheapest, FinancingOption::Cash);
        assert!(comparison.total_for(FinancingOption::Credit) > comparison.cash_total);
        assert!(comparison.recommendation_text().starts_with("Empfehlung: Barkauf"));
    }

    #[test]
    fn schedule_horizon_covers_long_credit_terms() {
        assert_eq!(schedule_years(60), 20);
        assert_eq!(schedule_years(300), 25);
    }
}
