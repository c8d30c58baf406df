//! Standard offer pages: letterhead, cover letter, system overview, price
//! breakdown and economics. Letter text comes from Tera templates.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use solquote_core::{CalculationSource, Company, CustomerData, OfferData};
use tera::{Context, Tera};

use crate::canvas::{Font, Rgb, A4_HEIGHT, A4_WIDTH};
use crate::error::PdfError;
use crate::financing_pages::page_footer;
use crate::layout::{Column, FlowDocument, MARGIN};
use crate::text::{format_decimal_de, format_eur, format_percent};

const COVER_LETTER: &str = "cover_letter.txt.tera";
const CLOSING: &str = "closing.txt.tera";

const PRICE_LINES: [(&str, &str); 6] = [
    ("cost_modules_netto", "PV-Module"),
    ("cost_inverter_netto", "Wechselrichter"),
    ("cost_storage_netto", "Batteriespeicher"),
    ("cost_installation_netto", "Montage und Installation"),
    ("total_additional_costs_netto", "Zusatzkosten (Gerüst, Elektrik, Anmeldung)"),
    ("subtotal_netto", "Zwischensumme netto"),
];

/// Registers the German number filters used by the offer templates.
///
/// - `money`: `1234.5 | money` renders `1.234,50 €`
/// - `number`: `8.4 | number(places=1)` renders `8,4`
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", tera_money_filter);
    tera.register_filter("number", tera_number_filter);
}

fn decimal_value(value: &tera::Value) -> tera::Result<Decimal> {
    match value {
        tera::Value::Number(number) => Decimal::from_str(&number.to_string())
            .map_err(|error| tera::Error::msg(format!("not a decimal: {error}"))),
        tera::Value::String(text) => Decimal::from_str(text.trim())
            .map_err(|error| tera::Error::msg(format!("not a decimal: {error}"))),
        tera::Value::Null => Ok(Decimal::ZERO),
        other => Err(tera::Error::msg(format!("cannot format {other} as a number"))),
    }
}

fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    Ok(tera::Value::String(format_eur(decimal_value(value)?)))
}

fn tera_number_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let places = args.get("places").and_then(tera::Value::as_u64).unwrap_or(2) as u32;
    Ok(tera::Value::String(format_decimal_de(decimal_value(value)?, places)))
}

#[derive(Serialize)]
struct LetterContext<'a> {
    salutation_line: String,
    company: &'a Company,
    customer: &'a CustomerData,
    results: BTreeMap<&'a str, String>,
    storage_name: Option<String>,
    valid_until: String,
    vat_percent_zero: bool,
    estimated: bool,
}

fn salutation_line(offer: &OfferData) -> String {
    let last_name = offer.customer.last_name.trim();
    match offer.customer.salutation.trim() {
        "Herr" if !last_name.is_empty() => format!("Sehr geehrter Herr {last_name}"),
        "Frau" if !last_name.is_empty() => format!("Sehr geehrte Frau {last_name}"),
        _ => "Sehr geehrte Damen und Herren".to_string(),
    }
}

/// Renders the base offer document for one company.
pub struct OfferPdfBuilder {
    tera: Tera,
}

impl OfferPdfBuilder {
    pub fn with_embedded_templates() -> Result<Self, PdfError> {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);
        tera.add_raw_templates(vec![
            (COVER_LETTER, include_str!("../../../templates/offer/cover_letter.txt.tera")),
            (CLOSING, include_str!("../../../templates/offer/closing.txt.tera")),
        ])?;
        Ok(Self { tera })
    }

    fn letter_context(&self, offer: &OfferData) -> Result<Context, PdfError> {
        let results = offer
            .calculation_results
            .iter()
            .map(|(key, value)| (key.as_str(), value.normalize().to_string()))
            .collect();
        let vat = offer.calculation_results.get("vat_amount").unwrap_or_default();
        let context = LetterContext {
            salutation_line: salutation_line(offer),
            company: &offer.company,
            customer: &offer.customer,
            results,
            storage_name: offer.products.storage.as_ref().map(|storage| storage.display_name()),
            valid_until: offer.valid_until.format("%d.%m.%Y").to_string(),
            vat_percent_zero: vat.is_zero(),
            estimated: offer.calculation_source == CalculationSource::Estimated,
        };
        Ok(Context::from_serialize(context)?)
    }

    pub fn render_letter_text(&self, offer: &OfferData) -> Result<(String, String), PdfError> {
        let context = self.letter_context(offer)?;
        Ok((self.tera.render(COVER_LETTER, &context)?, self.tera.render(CLOSING, &context)?))
    }

    pub fn build(&self, offer: &OfferData) -> Result<Vec<u8>, PdfError> {
        let (cover_letter, closing) = self.render_letter_text(offer)?;
        let mut flow = FlowDocument::new(page_footer(offer));

        letterhead(&mut flow, offer);
        flow.space(150.0);
        flow.title("Angebot Photovoltaikanlage")?;
        flow.paragraph(&cover_letter)?;
        flow.space(10.0);

        system_overview(&mut flow, offer)?;
        price_breakdown(&mut flow, offer)?;
        economics(&mut flow, offer)?;

        flow.space(10.0);
        flow.paragraph(&closing)?;
        flow.finish()
    }
}

fn letterhead(flow: &mut FlowDocument, offer: &OfferData) {
    let company = &offer.company;
    let customer = &offer.customer;
    let right = A4_WIDTH - MARGIN;
    let top = A4_HEIGHT - MARGIN;
    let canvas = flow.canvas_mut();

    canvas.text(MARGIN, top - 16.0, 16.0, Font::Bold, &company.name);
    canvas.text_colored(MARGIN, top - 30.0, 8.5, Font::Regular, Rgb::GREY, &company.address_line());
    let contacts: Vec<&str> = [company.phone.as_deref(), company.email.as_deref(), company.website.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    canvas.text_colored(MARGIN, top - 41.0, 8.5, Font::Regular, Rgb::GREY, &contacts.join(" | "));
    canvas.fill_rect(MARGIN, top - 50.0, right - MARGIN, 1.5, Rgb::ACCENT);

    let address = [
        customer.full_name(),
        customer.street.clone(),
        format!("{} {}", customer.postal_code, customer.city).trim().to_string(),
    ];
    for (line, text) in address.iter().enumerate() {
        canvas.text(MARGIN, top - 90.0 - line as f32 * 13.0, 10.0, Font::Regular, text);
    }

    let meta = [
        ("Angebotsnummer", offer.offer_number.clone()),
        ("Datum", offer.offer_date.format("%d.%m.%Y").to_string()),
        ("Gültig bis", offer.valid_until.format("%d.%m.%Y").to_string()),
    ];
    for (line, (label, value)) in meta.iter().enumerate() {
        let y = top - 90.0 - line as f32 * 13.0;
        canvas.text_colored(right - 210.0, y, 9.0, Font::Regular, Rgb::GREY, label);
        canvas.text_right(right, y, 9.0, Font::Bold, value);
    }
}

fn system_overview(flow: &mut FlowDocument, offer: &OfferData) -> Result<(), PdfError> {
    let results = &offer.calculation_results;
    flow.heading("Ihre Anlage")?;

    if let Some(module) = &offer.products.module {
        let quantity = offer.products.module_quantity.max(offer.project_details.module_quantity);
        flow.key_value("PV-Module", &format!("{quantity} x {}", module.display_name()), false)?;
    }
    if let Some(inverter) = &offer.products.inverter {
        flow.key_value("Wechselrichter", &inverter.display_name(), false)?;
    }
    if let Some(storage) = &offer.products.storage {
        let capacity = storage
            .storage_capacity_kwh
            .map(|kwh| format!(" ({} kWh)", format_decimal_de(kwh, 1)))
            .unwrap_or_default();
        flow.key_value("Batteriespeicher", &format!("{}{capacity}", storage.display_name()), false)?;
    }
    let technical = [
        ("anlage_kwp", "Anlagenleistung", " kWp", 2),
        ("annual_pv_production_kwh", "Jahresertrag", " kWh", 0),
        ("self_consumption_kwh", "Eigenverbrauch", " kWh", 0),
        ("feed_in_kwh", "Netzeinspeisung", " kWh", 0),
    ];
    for (key, label, unit, places) in technical {
        if let Some(value) = results.get(key) {
            flow.key_value(label, &format!("{}{unit}", format_decimal_de(value, places)), false)?;
        }
    }
    if let Some(autarky) = results.get("autarky_percent") {
        flow.key_value("Autarkiegrad", &format_percent(autarky), false)?;
    }
    flow.space(10.0);
    Ok(())
}

fn price_breakdown(flow: &mut FlowDocument, offer: &OfferData) -> Result<(), PdfError> {
    let results = &offer.calculation_results;
    let mut rows: Vec<Vec<String>> = PRICE_LINES
        .iter()
        .filter_map(|(key, label)| {
            results
                .get(key)
                .filter(|value| !value.is_zero() || *key == "subtotal_netto")
                .map(|value| vec![label.to_string(), format_eur(value)])
        })
        .collect();
    if let Some(vat) = results.get("vat_amount") {
        rows.push(vec!["Umsatzsteuer".to_string(), format_eur(vat)]);
    }
    let total = results
        .get("total_investment_brutto")
        .or_else(|| results.get("final_price_brutto"));
    if let Some(total) = total {
        rows.push(vec!["Gesamtpreis".to_string(), format_eur(total)]);
    }
    if rows.is_empty() {
        return Ok(());
    }

    flow.heading("Ihre Investition")?;
    let highlighted = if total.is_some() { vec![rows.len() - 1] } else { Vec::new() };
    flow.table(
        &[Column::left("Position", 345.28), Column::right("Betrag", 150.0)],
        &rows,
        &highlighted,
    )?;
    flow.space(6.0);
    Ok(())
}

fn economics(flow: &mut FlowDocument, offer: &OfferData) -> Result<(), PdfError> {
    let results = &offer.calculation_results;
    let lines = [
        results.get("annual_savings_eur").map(|v| ("Jährliche Ersparnis", format_eur(v))),
        results.get("annual_feed_in_revenue_eur").map(|v| ("Einspeisevergütung pro Jahr", format_eur(v))),
        results
            .get("amortization_time_years")
            .map(|v| ("Amortisationszeit", format!("{} Jahre", format_decimal_de(v, 1)))),
        results.get("simple_roi_percent").map(|v| ("Rendite p.a.", format_percent(v))),
    ];
    if lines.iter().all(Option::is_none) {
        return Ok(());
    }

    flow.heading("Wirtschaftlichkeit")?;
    for (label, value) in lines.into_iter().flatten() {
        flow.key_value(label, &value, false)?;
    }
    Ok(())
}
