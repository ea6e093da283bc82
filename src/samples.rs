//! Demo workbooks for trying the tool without real data.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::JoinConfig;
use crate::error::Result;
use crate::io::excel_write::{WorkbookData, write_workbook};
use crate::model::{CellValue, Dataset};

pub const SEARCH_FILE: &str = "orders_sample.xlsx";
pub const MASTER_FILE: &str = "products_master.xlsx";

/// Excel serial of 2024-05-01.
const FIRST_ORDER_DAY: f64 = 45_413.0;

/// Paths of the generated workbooks plus a configuration that joins them.
#[derive(Debug, Clone)]
pub struct SampleFiles {
    pub search_path: PathBuf,
    pub master_path: PathBuf,
    pub config: JoinConfig,
}

/// Writes a search workbook (`Orders`, `Sales`) and a master workbook
/// (`Products`, `Customers`) into `dir`.
pub fn create_sample_files(dir: &Path) -> Result<SampleFiles> {
    fs::create_dir_all(dir)?;
    let search_path = dir.join(SEARCH_FILE);
    let master_path = dir.join(MASTER_FILE);

    let mut search = WorkbookData::default();
    search.push("Orders", orders()?);
    search.push("Sales", sales()?);
    write_workbook(&search_path, &search)?;

    let mut master = WorkbookData::default();
    master.push("Products", products()?);
    master.push("Customers", customers()?);
    write_workbook(&master_path, &master)?;

    info!(
        search = %search_path.display(),
        master = %master_path.display(),
        "sample workbooks written"
    );

    let config = JoinConfig::new(
        search_path.clone(),
        "Orders",
        master_path.clone(),
        "Products",
        "product_code",
        "product_code",
        vec![
            "product_name".to_string(),
            "price".to_string(),
            "category".to_string(),
        ],
    );

    Ok(SampleFiles {
        search_path,
        master_path,
        config,
    })
}

fn text(value: &str) -> CellValue {
    CellValue::Text(value.to_string())
}

fn number(value: f64) -> CellValue {
    CellValue::Number(value)
}

fn day(offset: f64) -> CellValue {
    CellValue::DateTime(FIRST_ORDER_DAY + offset)
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn orders() -> Result<Dataset> {
    let rows = [
        (1.0, "A001", 2.0, 0.0),
        (2.0, "A002", 1.0, 0.0),
        (3.0, "B001", 3.0, 1.0),
        (4.0, "A001", 1.0, 1.0),
        (5.0, "C001", 2.0, 2.0),
    ]
    .into_iter()
    .map(|(id, code, qty, offset)| vec![number(id), text(code), number(qty), day(offset)])
    .collect();

    Dataset::new(
        columns(&["order_id", "product_code", "quantity", "order_date"]),
        rows,
    )
}

fn sales() -> Result<Dataset> {
    let rows = [
        (101.0, "A001", 1000.0, 0.0),
        (102.0, "B001", 2000.0, 1.0),
        (103.0, "A002", 800.0, 2.0),
    ]
    .into_iter()
    .map(|(id, code, amount, offset)| vec![number(id), text(code), number(amount), day(offset)])
    .collect();

    Dataset::new(
        columns(&["sale_id", "product_code", "amount", "sale_date"]),
        rows,
    )
}

fn products() -> Result<Dataset> {
    let rows = [
        ("A001", "Apple", 100.0, "Fruit", 50.0),
        ("A002", "Orange", 80.0, "Fruit", 30.0),
        ("A003", "Banana", 120.0, "Fruit", 25.0),
        ("B001", "Bread", 200.0, "Bakery", 20.0),
        ("B002", "Cake", 350.0, "Bakery", 10.0),
    ]
    .into_iter()
    .map(|(code, name, price, category, stock)| {
        vec![text(code), text(name), number(price), text(category), number(stock)]
    })
    .collect();

    Dataset::new(
        columns(&["product_code", "product_name", "price", "category", "stock"]),
        rows,
    )
}

fn customers() -> Result<Dataset> {
    let rows = [
        ("C001", "Tanaka Trading", "Tokyo", "03-1234-5678"),
        ("C002", "Sato Corporation", "Osaka", "06-2345-6789"),
        ("C003", "Suzuki Commerce", "Aichi", "052-3456-7890"),
    ]
    .into_iter()
    .map(|(id, name, region, phone)| vec![text(id), text(name), text(region), text(phone)])
    .collect();

    Dataset::new(
        columns(&["customer_id", "customer_name", "region", "phone"]),
        rows,
    )
}
