#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use retail_etl::{
    data::Value,
    schema::{ColumnMeta, ColumnType},
    table::Table,
};
use tempfile::{TempDir, tempdir};

pub const SALES_CSV: &str = "\
Order Number,Line Item,Order Date,Delivery Date,CustomerKey,StoreKey,ProductKey,Quantity,Currency Code
366000,1,1/1/2016,,265598,10,1304,1,CAD
366001,1,1/1/2016,1/13/2016,1269051,0,1048,2,USD
366001,2,1/1/2016,1/13/2016,1269051,0,2007,1,USD
366002,1,1/2/2016,1/12/2016,266019,0,1106,7,CAD
";

pub const PRODUCTS_CSV: &str = "\
ProductKey,Product Name,Brand,Color,Unit Cost USD,Unit Price USD,Subcategory,Category
1304,Contoso Lens Adapter M450 White,Contoso,White,$31.27 ,$68.00 ,Cameras Accessories,Cameras and camcorders
1048,A. Datum Standard Smart phones E100 Black,A. Datum,Black,$141.47 ,$307.95 ,Smart phones & PDAs,Cell phones
2007,Litware Home Theater System 5.1 Channel M510 Black,Litware,Black,\"$1,165.39 \",\"$2,469.99 \",Home Theater System,\"Music, Movies and Audio Books\"
1106,Contoso 512MB MP3 Player E51 Silver,Contoso,Silver,$11.00 ,$21.57 ,MP4&MP3,Audio
";

pub const CUSTOMERS_CSV: &str = "\
CustomerKey,Gender,Name,City,State,Country,Birthday
265598,Male,Ryan Wright,Newmarket,Ontario,Canada,3/5/1968
1269051,Female,Amanda Black,Wichita,Kansas,United States,11/13/1951
266019,Male,Tyler Ferguson,Ottawa,Ontario,Canada,9/11/1990
";

pub const STORES_CSV: &str = "\
StoreKey,Country,State,Square Meters,Open Date
0,Online,Online,,1/1/2010
10,Canada,Ontario,1500,6/3/2012
";

pub const EXCHANGE_RATES_CSV: &str = "\
Date,Currency,Exchange
1/1/2016,USD,1.0000
1/1/2016,CAD,1.3884
1/2/2016,CAD,1.3900
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }

    /// Writes the five sample extracts under their default file names.
    pub fn write_retail_extracts(&self) {
        self.write("Sales.csv", SALES_CSV);
        self.write("Products.csv", PRODUCTS_CSV);
        self.write("Customers.csv", CUSTOMERS_CSV);
        self.write("Stores.csv", STORES_CSV);
        self.write("Exchange_Rates.csv", EXCHANGE_RATES_CSV);
    }
}

pub fn text(value: &str) -> Option<Value> {
    Some(Value::String(value.to_string()))
}

pub fn int(value: i64) -> Option<Value> {
    Some(Value::Integer(value))
}

/// Builds a table whose columns are all text.
pub fn string_table(name: &str, headers: &[&str], rows: Vec<Vec<Option<Value>>>) -> Table {
    typed_table(
        name,
        &headers
            .iter()
            .map(|h| (*h, ColumnType::String))
            .collect::<Vec<_>>(),
        rows,
    )
}

pub fn typed_table(
    name: &str,
    columns: &[(&str, ColumnType)],
    rows: Vec<Vec<Option<Value>>>,
) -> Table {
    Table::from_rows(
        name,
        columns
            .iter()
            .map(|(header, ty)| ColumnMeta::new(*header, *ty))
            .collect(),
        rows,
    )
    .expect("build table")
}
