use std::collections::HashSet;
use std::io::{Cursor, Write};

use solquote_core::GeneratedOffer;
use thiserror::Error;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no offer PDFs to package")]
    NothingToPackage,
}

fn sanitize_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() || ch.is_whitespace() => '_',
            ch => ch,
        })
        .collect();
    let cleaned = cleaned.trim_matches(|ch| ch == '.' || ch == '_').to_string();
    if cleaned.is_empty() {
        "Unbekannt".to_string()
    } else {
        cleaned
    }
}

/// `Angebot_<company>_<lastname>.pdf` with filesystem-unsafe characters replaced.
pub fn offer_file_name(company_name: &str, customer_last_name: &str) -> String {
    format!(
        "Angebot_{}_{}.pdf",
        sanitize_component(company_name),
        sanitize_component(customer_last_name)
    )
}

/// Appends `_2`, `_3`, ... before the extension until `name` is unused.
fn unique_name(name: String, used: &mut HashSet<String>) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let stem = name.strip_suffix(".pdf").unwrap_or(&name).to_string();
    let mut counter = 2;
    loop {
        let candidate = format!("{stem}_{counter}.pdf");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Packs one PDF per generated offer into a ZIP archive and returns its bytes.
pub fn package_offers(offers: &[GeneratedOffer]) -> Result<Vec<u8>, PackageError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut used = HashSet::new();
    let mut packaged = 0usize;

    for offer in offers {
        if offer.pdf.is_empty() {
            warn!(
                event_name = "offer.package.skipped_empty",
                company = %offer.company_name,
                "offer has no PDF bytes"
            );
            continue;
        }
        let name = unique_name(offer_file_name(&offer.company_name, &offer.customer_last_name), &mut used);
        writer.start_file(name, options)?;
        writer.write_all(&offer.pdf)?;
        packaged += 1;
    }
    if packaged == 0 {
        return Err(PackageError::NothingToPackage);
    }

    let bytes = writer.finish()?.into_inner();
    info!(event_name = "offer.package.created", entries = packaged, bytes = bytes.len(), "offer archive created");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use rust_decimal::Decimal;
    use solquote_core::{CalculationSource, CompanyId, GeneratedOffer};
    use zip::ZipArchive;

    use super::{offer_file_name, package_offers, PackageError};

    fn offer(index: usize, company: &str, last_name: &str, pdf: &[u8]) -> GeneratedOffer {
        GeneratedOffer {
            company_index: index,
            company_id: CompanyId(index as i64 + 1),
            company_name: company.to_string(),
            customer_last_name: last_name.to_string(),
            offer_number: format!("AN-20261019-run-{}", index + 1),
            calculation_source: CalculationSource::Calculated,
            price_factor: Decimal::ONE,
            pdf: pdf.to_vec(),
        }
    }

    #[test]
    fn names_replace_unsafe_characters() {
        assert_eq!(
            offer_file_name("Solar & Dach GmbH/Süd", "Müller"),
            "Angebot_Solar_&_Dach_GmbH_Süd_Müller.pdf"
        );
        assert_eq!(offer_file_name("../..", " "), "Angebot_Unbekannt_Unbekannt.pdf");
    }

    #[test]
    fn archive_holds_one_entry_per_offer_with_deduplicated_names() {
        let offers = [
            offer(0, "Sonnendach", "Brenner", b"%PDF-a"),
            offer(1, "Sonnendach", "Brenner", b"%PDF-b"),
            offer(2, "Sonnendach", "Brenner", b"%PDF-c"),
            offer(3, "Watt Werk", "Brenner", b"%PDF-d"),
        ];

        let bytes = package_offers(&offers).expect("package");
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("archive");
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "Angebot_Sonnendach_Brenner.pdf",
                "Angebot_Sonnendach_Brenner_2.pdf",
                "Angebot_Sonnendach_Brenner_3.pdf",
                "Angebot_Watt_Werk_Brenner.pdf",
            ]
        );
        let mut content = Vec::new();
        archive
            .by_name("Angebot_Sonnendach_Brenner_2.pdf")
            .expect("entry")
            .read_to_end(&mut content)
            .expect("read");
        assert_eq!(content, b"%PDF-b");
    }

    #[test]
    fn nothing_to_package_is_an_error() {
        assert!(matches!(package_offers(&[]), Err(PackageError::NothingToPackage)));
        assert!(matches!(
            package_offers(&[offer(0, "A", "B", b"")]),
            Err(PackageError::NothingToPackage)
        ));
    }
}
