use rust_decimal::Decimal;
use solquote_core::config::FinancingConfig;
use solquote_core::financing::{
    amortization_schedule, compare_financing, schedule_years, FinancingError, FinancingOption,
};
use solquote_core::OfferData;

use crate::error::PdfError;
use crate::layout::{Column, FlowDocument};
use crate::text::{format_eur, format_percent};

const PRINCIPAL_KEYS: [&str; 3] =
    ["total_investment_brutto", "final_price_brutto", "total_investment_netto"];

fn financed_amount(offer: &OfferData) -> Result<Decimal, PdfError> {
    PRINCIPAL_KEYS
        .iter()
        .find_map(|key| offer.calculation_results.get(key))
        .filter(|amount| *amount > Decimal::ZERO)
        .ok_or_else(|| PdfError::Section("no positive investment amount to finance".to_string()))
}

fn section_error(error: FinancingError) -> PdfError {
    PdfError::Section(error.to_string())
}

pub(crate) fn page_footer(offer: &OfferData) -> String {
    format!("{} | Angebot {}", offer.company.name, offer.offer_number)
}

/// Credit, leasing, amortization and comparison pages as a standalone PDF.
pub fn financing_section(offer: &OfferData, config: &FinancingConfig) -> Result<Vec<u8>, PdfError> {
    let mut flow = FlowDocument::new(page_footer(offer));
    render_financing(&mut flow, offer, config)?;
    flow.finish()
}

pub fn render_financing(
    flow: &mut FlowDocument,
    offer: &OfferData,
    config: &FinancingConfig,
) -> Result<(), PdfError> {
    let principal = financed_amount(offer)?;
    let annual_savings = offer.calculation_results.get("annual_savings_eur").unwrap_or_default();
    let comparison = compare_financing(principal, config).map_err(section_error)?;
    let credit = &comparison.credit;
    let leasing = &comparison.leasing;

    flow.title("Finanzierungsmöglichkeiten")?;
    flow.paragraph(&format!(
        "Für die Investition von {} haben wir Ihnen drei Varianten gegenübergestellt.",
        format_eur(principal)
    ))?;
    flow.space(8.0);

    flow.heading("Kreditfinanzierung")?;
    flow.key_value("Kreditbetrag", &format_eur(credit.principal), false)?;
    flow.key_value("Sollzins p.a.", &format_percent(credit.annual_rate_percent), false)?;
    flow.key_value("Laufzeit", &format!("{} Monate", credit.months), false)?;
    flow.key_value("Monatliche Rate", &format_eur(credit.monthly_payment), true)?;
    flow.key_value("Gesamtbetrag", &format_eur(credit.total_paid), false)?;
    flow.key_value("Zinskosten", &format_eur(credit.total_interest), false)?;
    flow.space(10.0);

    flow.heading("Leasing")?;
    flow.key_value("Leasingfaktor", &format_percent(leasing.leasing_factor_percent), false)?;
    flow.key_value("Laufzeit", &format!("{} Monate", leasing.months), false)?;
    flow.key_value("Monatliche Leasingrate", &format_eur(leasing.monthly_rate), true)?;
    flow.key_value("Summe der Raten", &format_eur(leasing.total_rates), false)?;
    flow.key_value("Restwert", &format_eur(leasing.residual_value), false)?;
    flow.key_value("Gesamtkosten", &format_eur(leasing.total_cost), false)?;
    flow.space(10.0);

    let schedule = amortization_schedule(
        principal,
        annual_savings,
        credit,
        schedule_years(config.credit_term_months),
    )
    .map_err(section_error)?;
    flow.heading("Amortisationsplan")?;
    let rows: Vec<Vec<String>> = schedule
        .rows
        .iter()
        .map(|row| {
            vec![
                row.year.to_string(),
                format_eur(row.cumulative_savings),
                format_eur(row.credit_payments),
                format_eur(row.remaining_balance),
                format_eur(row.net_position),
            ]
        })
        .collect();
    let highlighted: Vec<usize> = schedule
        .rows
        .iter()
        .position(|row| row.is_break_even)
        .into_iter()
        .collect();
    flow.table(
        &[
            Column::left("Jahr", 45.0),
            Column::right("Ersparnis kumuliert", 115.0),
            Column::right("Kreditraten", 105.0),
            Column::right("Restschuld", 105.0),
            Column::right("Saldo", 125.28),
        ],
        &rows,
        &highlighted,
    )?;
    match schedule.break_even_year {
        Some(year) => flow.paragraph(&format!(
            "Die Anlage hat sich voraussichtlich im Jahr {year} amortisiert (hervorgehoben)."
        ))?,
        None => flow.paragraph(&format!(
            "Innerhalb von {} Jahren wird die Gewinnschwelle nicht erreicht.",
            schedule.rows.len()
        ))?,
    }
    flow.space(10.0);

    flow.heading("Vergleich der Finanzierungsarten")?;
    let options = [FinancingOption::Cash, FinancingOption::Credit, FinancingOption::Leasing];
    let option_rows: Vec<Vec<String>> = options
        .into_iter()
        .map(|option| {
            let monthly = match option {
                FinancingOption::Cash => "-".to_string(),
                FinancingOption::Credit => format_eur(credit.monthly_payment),
                FinancingOption::Leasing => format_eur(leasing.monthly_rate),
            };
            let extra = comparison.total_for(option) - comparison.cash_total;
            vec![
                option.label().to_string(),
                format_eur(comparison.total_for(option)),
                monthly,
                format_eur(extra),
            ]
        })
        .collect();
    let cheapest: Vec<usize> =
        options.iter().position(|option| *option == comparison.cheapest).into_iter().collect();
    flow.table(
        &[
            Column::left("Variante", 120.0),
            Column::right("Gesamtkosten", 130.0),
            Column::right("Monatlich", 120.0),
            Column::right("Mehrkosten", 125.28),
        ],
        &option_rows,
        &cheapest,
    )?;
    flow.paragraph(&comparison.recommendation_text())?;
    Ok(())
}
