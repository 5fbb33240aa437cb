use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

use crate::db::Database;
use crate::error::CatalogResult;
use crate::models::{CategoryPatch, ParentPatch, ProductPatch, ProductWithCategories};
use crate::response::{status_code, Envelope};

/// Each command maps to exactly one repository operation and prints one
/// JSON response envelope on stdout.
pub(crate) fn as_cli(args: &[String], db: &mut Database) -> Result<()> {
    match args[1].as_str() {
        "categories" => respond(db.get_categories()),
        "category" => category_command(&args[2..], db),
        "products" => respond(db.get_products()),
        "product" => product_command(&args[2..], db),
        "by-products" => {
            let ids = parse_ids_args(&args[2..])?;
            respond(db.categories_for_products(&ids))
        }
        "counts" => {
            let ids = parse_ids_args(&args[2..])?;
            respond(db.categories_with_product_count(&ids))
        }
        "tree" => {
            let id = parse_id(args.get(2), "Usage: shopdb tree <category-id>")?;
            respond(db.products_by_category_tree(id))
        }
        "unique" => {
            let ids = parse_ids_args(&args[2..])?;
            respond(db.unique_product_count(&ids))
        }
        "export" => cli_export(&args[2..], db),
        "seed" => cli_seed(db),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("shopdb {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

pub(crate) fn print_usage() {
    println!("shopdb — local product catalog with hierarchical categories");
    println!();
    println!("Usage: shopdb <command>");
    println!();
    println!("Commands:");
    println!("  categories                    List all categories");
    println!("  category show <id>            Look up one category");
    println!("  category add <name>           Create a category");
    println!("    --parent <id>               Parent category id");
    println!("  category update <id>          Update a category (partial)");
    println!("    --name <name>               New name");
    println!("    --parent <id>               Re-parent under <id>");
    println!("    --no-parent                 Detach to root");
    println!("  category rm <id>              Delete a category");
    println!("  products                      List all products");
    println!("  product show <id>             Look up one product");
    println!("  product add <name> <price>    Create a product");
    println!("    --categories <id,id,...>    Associate with categories");
    println!("  product update <id>           Update a product (partial)");
    println!("    --name <name>               New name");
    println!("    --price <price>             New price");
    println!("    --categories <id,id,...>    Replace the association set");
    println!("    --clear-categories          Remove all associations");
    println!("  product rm <id>               Delete a product");
    println!("  by-products <id> [id ...]     Categories for the given products");
    println!("  counts <id> [id ...]          Product count per category");
    println!("  tree <id>                     Products in a category or its direct children");
    println!("  unique <id> [id ...]          Distinct product count across categories");
    println!("  export [path]                 Export products to CSV");
    println!("  seed                          Insert sample catalog data");
    println!("  --help, -h                    Show this help");
    println!("  --version, -V                 Show version");
}

fn category_command(args: &[String], db: &mut Database) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("show") => {
            let id = parse_id(args.get(1), "Usage: shopdb category show <id>")?;
            respond(db.get_category(id))
        }
        Some("add") => {
            let name = args
                .get(1)
                .filter(|a| !a.starts_with('-'))
                .ok_or_else(|| anyhow::anyhow!("Usage: shopdb category add <name> [--parent <id>]"))?;
            let parent = flag_value(args, "--parent")
                .map(|v| v.parse::<i64>())
                .transpose()?;
            respond(db.create_category(name, parent))
        }
        Some("update") => {
            let id = parse_id(args.get(1), "Usage: shopdb category update <id> [flags]")?;
            let parent = if args.iter().any(|a| a == "--no-parent") {
                ParentPatch::Clear
            } else if let Some(v) = flag_value(args, "--parent") {
                ParentPatch::Set(v.parse()?)
            } else {
                ParentPatch::Keep
            };
            let patch = CategoryPatch {
                name: flag_value(args, "--name").map(str::to_string),
                parent,
            };
            respond(db.update_category(id, &patch))
        }
        Some("rm") => {
            let id = parse_id(args.get(1), "Usage: shopdb category rm <id>")?;
            respond(db.delete_category(id))
        }
        _ => {
            print_usage();
            anyhow::bail!("Usage: shopdb category <show|add|update|rm> ...");
        }
    }
}

fn product_command(args: &[String], db: &mut Database) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("show") => {
            let id = parse_id(args.get(1), "Usage: shopdb product show <id>")?;
            let result = db.get_product(id).and_then(|p| {
                Ok(ProductWithCategories {
                    id,
                    name: p.name,
                    price: p.price,
                    category_ids: db.get_product_category_ids(id)?,
                })
            });
            respond(result)
        }
        Some("add") => {
            let name = args
                .get(1)
                .filter(|a| !a.starts_with('-'))
                .ok_or_else(|| anyhow::anyhow!("Usage: shopdb product add <name> <price> [--categories <ids>]"))?;
            let price = args
                .get(2)
                .filter(|a| !a.starts_with('-'))
                .ok_or_else(|| anyhow::anyhow!("Missing price"))?;
            let price = Decimal::from_str(price)?;
            let category_ids = match flag_value(args, "--categories") {
                Some(list) => parse_id_list(list)?,
                None => Vec::new(),
            };
            respond(db.create_product(name, price, &category_ids))
        }
        Some("update") => {
            let id = parse_id(args.get(1), "Usage: shopdb product update <id> [flags]")?;
            let category_ids = if args.iter().any(|a| a == "--clear-categories") {
                Some(Vec::new())
            } else {
                flag_value(args, "--categories")
                    .map(parse_id_list)
                    .transpose()?
            };
            let patch = ProductPatch {
                name: flag_value(args, "--name").map(str::to_string),
                price: flag_value(args, "--price")
                    .map(Decimal::from_str)
                    .transpose()?,
                category_ids,
            };
            respond(db.update_product(id, &patch))
        }
        Some("rm") => {
            let id = parse_id(args.get(1), "Usage: shopdb product rm <id>")?;
            respond(db.delete_product(id))
        }
        _ => {
            print_usage();
            anyhow::bail!("Usage: shopdb product <show|add|update|rm> ...");
        }
    }
}

fn cli_export(args: &[String], db: &mut Database) -> Result<()> {
    let output_path = args
        .first()
        .filter(|a| !a.starts_with('-'))
        .map(|a| shellexpand(a))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            format!("{home}/shopdb-export.csv")
        });

    let products = db.get_products()?;
    let mut writer = csv::Writer::from_path(&output_path)?;
    writer.write_record(["id", "name", "price", "category_ids"])?;
    for p in &products {
        let ids = p
            .category_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(";");
        writer.write_record([p.id.to_string(), p.name.clone(), p.price.to_string(), ids])?;
    }
    writer.flush()?;
    println!("Exported {} products to {output_path}", products.len());
    Ok(())
}

/// Sample data: a small category tree with a handful of products,
/// inserted through the normal create paths.
fn cli_seed(db: &mut Database) -> Result<()> {
    let electronics = db.create_category("Electronics", None)?;
    let audio = db.create_category("Audio", electronics.id)?;
    let phones = db.create_category("Phones", electronics.id)?;
    let outdoors = db.create_category("Outdoors", None)?;

    let items: &[(&str, &str, Vec<Option<i64>>)] = &[
        ("Wireless Earbuds", "89.99", vec![audio.id]),
        ("Bookshelf Speakers", "249.00", vec![audio.id]),
        ("Smartphone", "699.00", vec![phones.id]),
        ("Phone Case", "19.99", vec![phones.id, outdoors.id]),
        ("Camping Lantern", "34.50", vec![outdoors.id]),
    ];
    for (name, price, cats) in items {
        let ids: Vec<i64> = cats.iter().flatten().copied().collect();
        db.create_product(name, Decimal::from_str(price)?, &ids)?;
    }

    println!("Seeded 4 categories and {} products", items.len());
    Ok(())
}

/// Prints the success or error envelope for a repository outcome. The
/// process exit code stays 0 either way; the envelope is the response.
fn respond<T: Serialize>(result: CatalogResult<T>) -> Result<()> {
    match result {
        Ok(data) => println!("{}", serde_json::to_string_pretty(&Envelope::success(data))?),
        Err(err) => {
            let envelope: Envelope<()> = Envelope::failure(&err);
            tracing::debug!(status = status_code(&err), "request failed");
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_id(arg: Option<&String>, usage: &str) -> Result<i64> {
    arg.ok_or_else(|| anyhow::anyhow!("{usage}"))?
        .parse::<i64>()
        .map_err(|_| anyhow::anyhow!("{usage}"))
}

fn parse_ids_args(args: &[String]) -> Result<Vec<i64>> {
    if args.is_empty() {
        anyhow::bail!("Expected one or more ids");
    }
    args.iter()
        .map(|a| {
            a.parse::<i64>()
                .map_err(|_| anyhow::anyhow!("Invalid id: {a}"))
        })
        .collect()
}

fn parse_id_list(list: &str) -> Result<Vec<i64>> {
    list.split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim()
                .parse::<i64>()
                .map_err(|_| anyhow::anyhow!("Invalid id: {s}"))
        })
        .collect()
}

pub(crate) fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}
