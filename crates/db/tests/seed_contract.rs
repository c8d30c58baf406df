use std::collections::HashSet;

use solquote_core::domain::product::ProductCategory;
use solquote_db::repositories::{
    SqlCompanyDocumentRepository, SqlCompanyRepository, SqlProductRepository,
};
use solquote_db::{connect_with_settings, load_snapshot, migrations, DemoSeedDataset};

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

/// Value tuples of the `INSERT ... VALUES` block that follows `table`.
fn seed_rows<'a>(sql: &'a str, table: &str) -> SeedContractTestResult<Vec<&'a str>> {
    let marker = format!("INSERT OR IGNORE INTO {table} (");
    let start = sql.find(&marker).ok_or_else(|| format!("no insert block for {table}"))?;
    let block = &sql[start..];
    let values = block.find("VALUES").ok_or_else(|| format!("{table} insert has no VALUES"))?;
    let end = block.find(';').ok_or_else(|| format!("{table} insert is not terminated"))?;

    Ok(block[values + "VALUES".len()..end]
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('('))
        .collect())
}

fn leading_id(row: &str) -> SeedContractTestResult<i64> {
    row.trim_start_matches('(')
        .split(',')
        .next()
        .and_then(|id| id.trim().parse().ok())
        .ok_or_else(|| format!("row without numeric id: {row}"))
}

#[test]
fn seed_sql_uses_unique_ids_and_known_categories() -> SeedContractTestResult {
    let sql = DemoSeedDataset::SQL;

    for table in ["product", "company", "company_document"] {
        let rows = seed_rows(sql, table)?;
        require!(!rows.is_empty(), "{table} seed block is empty");
        let ids = rows.iter().map(|row| leading_id(row)).collect::<Result<Vec<_>, _>>()?;
        let unique: HashSet<_> = ids.iter().collect();
        require_eq!(unique.len(), ids.len());
    }

    for row in seed_rows(sql, "product")? {
        let category = row
            .split(',')
            .nth(1)
            .map(|field| field.trim().trim_matches('\''))
            .ok_or_else(|| format!("product row without category: {row}"))?;
        require!(
            category.parse::<ProductCategory>().is_ok(),
            "unknown product category `{category}`"
        );
    }

    Ok(())
}

#[tokio::test]
async fn seeded_database_supports_rotation_in_every_category() -> SeedContractTestResult {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|e| e.to_string())?;
    migrations::run_pending(&pool).await.map_err(|e| e.to_string())?;
    DemoSeedDataset::load(&pool).await.map_err(|e| e.to_string())?;

    let snapshot = load_snapshot(
        &SqlProductRepository::new(pool.clone()),
        &SqlCompanyRepository::new(pool.clone()),
        &SqlCompanyDocumentRepository::new(pool),
    )
    .await
    .map_err(|e| e.to_string())?;

    for category in ProductCategory::ALL {
        require!(
            snapshot.catalog.ids_in(category).len() > 1,
            "{category} needs more than one product to rotate"
        );
    }
    require_eq!(snapshot.companies.iter().filter(|c| c.is_default).count(), 1);
    require!(snapshot
        .documents
        .iter()
        .all(|doc| snapshot.companies.iter().any(|c| c.id == doc.company_id)));

    Ok(())
}
