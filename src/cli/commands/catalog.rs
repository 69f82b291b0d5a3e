use anyhow::Context;
use clap::Subcommand;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::utils::{connect, output_error, output_success};
use crate::cli::OutputFormat;
use crate::services::product_service::NewProduct;
use crate::services::ProductService;

#[derive(Subcommand)]
pub enum CatalogCommands {
    #[command(about = "Create or update products by SKU from a YAML file")]
    Import {
        #[arg(help = "YAML file with a `products:` list")]
        file: PathBuf,
        #[arg(long, help = "Validate the file without writing anything")]
        dry_run: bool,
    },
}

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<NewProduct>,
}

/// Parse a catalog and report per-SKU problems without touching the database
pub fn parse_catalog(raw: &str) -> anyhow::Result<(Vec<NewProduct>, Vec<String>)> {
    let file: CatalogFile = serde_yaml::from_str(raw).context("catalog is not valid YAML")?;

    let mut problems = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for product in &file.products {
        if !seen.insert(product.sku.trim().to_string()) {
            problems.push(format!("{}: duplicate SKU in file", product.sku));
        }
        if let Err(errors) = product.validate() {
            problems.push(format!("{}: {}", product.sku, errors));
        }
    }
    Ok((file.products, problems))
}

pub async fn handle(cmd: CatalogCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        CatalogCommands::Import { file, dry_run } => {
            let raw = std::fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
            let (products, problems) = parse_catalog(&raw)?;

            if !problems.is_empty() {
                for problem in &problems {
                    output_error(output_format, problem, Some("INVALID_PRODUCT"))?;
                }
                anyhow::bail!("{} of {} products are invalid; nothing imported", problems.len(), products.len());
            }

            if dry_run {
                return output_success(
                    output_format,
                    &format!("{} products are valid (dry run)", products.len()),
                    Some(json!({ "valid": products.len() })),
                );
            }

            let service = ProductService::new(connect().await?);
            let (mut created, mut updated) = (0usize, 0usize);
            for product in &products {
                match service.upsert_by_sku(product).await {
                    Ok(true) => created += 1,
                    Ok(false) => updated += 1,
                    Err(e) => anyhow::bail!("{}: {}", product.sku, e),
                }
            }
            tracing::info!("Catalog import from {}: {} created, {} updated", file.display(), created, updated);

            output_success(
                output_format,
                &format!("Imported {} products ({} created, {} updated)", products.len(), created, updated),
                Some(json!({ "created": created, "updated": updated })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_valid_catalog() {
        let raw = r#"
products:
  - sku: AMOX-250
    name: Amoxicillin 250mg
    unit: strip
    price: "62.00"
    discount_percent: "7.5"
    stock_quantity: 400
  - sku: ORS-1
    name: ORS sachet
    price: 12
"#;
        let (products, problems) = parse_catalog(raw).unwrap();
        assert_eq!(products.len(), 2);
        assert!(problems.is_empty(), "{:?}", problems);
        assert!(products[1].is_active);
    }

    #[test]
    fn reports_invalid_and_duplicate_rows() {
        let raw = r#"
products:
  - sku: DUP-1
    name: First
    price: 10
  - sku: DUP-1
    name: Second
    price: -3
"#;
        let (_, problems) = parse_catalog(raw).unwrap();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("duplicate"));
        assert!(problems[1].contains("price"));
    }

    #[test]
    fn rejects_non_yaml() {
        assert!(parse_catalog("products: [").is_err());
    }
}
