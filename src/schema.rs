//! Semantic column types and the fixed table roles of the retail extracts.
//!
//! Every extract plays exactly one [`TableRole`]. A role knows its default
//! file name, the key column that must be unique (dimensions only), and the
//! columns the validator requires to be present.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Header names as they appear in the source extracts and in derived output.
pub mod columns {
    pub const ORDER_NUMBER: &str = "Order Number";
    pub const LINE_ITEM: &str = "Line Item";
    pub const ORDER_DATE: &str = "Order Date";
    pub const DELIVERY_DATE: &str = "Delivery Date";
    pub const CUSTOMER_KEY: &str = "CustomerKey";
    pub const STORE_KEY: &str = "StoreKey";
    pub const PRODUCT_KEY: &str = "ProductKey";
    pub const QUANTITY: &str = "Quantity";
    pub const CURRENCY_CODE: &str = "Currency Code";

    pub const PRODUCT_NAME: &str = "Product Name";
    pub const BRAND: &str = "Brand";
    pub const CATEGORY: &str = "Category";
    pub const UNIT_COST_USD: &str = "Unit Cost USD";
    pub const UNIT_PRICE_USD: &str = "Unit Price USD";

    pub const NAME: &str = "Name";
    pub const GENDER: &str = "Gender";
    pub const COUNTRY: &str = "Country";
    pub const BIRTHDAY: &str = "Birthday";

    pub const SQUARE_METERS: &str = "Square Meters";
    pub const OPEN_DATE: &str = "Open Date";

    pub const DATE: &str = "Date";
    pub const CURRENCY: &str = "Currency";
    pub const EXCHANGE: &str = "Exchange";

    pub const REVENUE: &str = "Revenue";
    pub const COST: &str = "Cost";
    pub const PROFIT: &str = "Profit";
    pub const PROFIT_MARGIN: &str = "Profit Margin";
    pub const YEAR: &str = "Year";
    pub const MONTH: &str = "Month";
    pub const QUARTER: &str = "Quarter";
    pub const DAY_OF_WEEK: &str = "Day of Week";
    pub const MONTH_NAME: &str = "Month Name";
    pub const WEEK_OF_YEAR: &str = "Week of Year";
    pub const CUSTOMER_AGE: &str = "Customer Age";
    pub const AGE_GROUP: &str = "Age Group";
    pub const DELIVERY_DAYS: &str = "Delivery Days";
    pub const REVENUE_LOCAL: &str = "Revenue Local";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    String,
    Integer,
    Decimal,
    Float,
    Date,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Decimal => "decimal",
            ColumnType::Float => "float",
            ColumnType::Date => "date",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::Decimal | ColumnType::Float
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnType::Date)
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, ColumnType::String)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub datatype: ColumnType,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, datatype: ColumnType) -> Self {
        Self {
            name: name.into(),
            datatype,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    Sales,
    Products,
    Customers,
    Stores,
    ExchangeRates,
}

impl TableRole {
    pub const ALL: [TableRole; 5] = [
        TableRole::Sales,
        TableRole::Products,
        TableRole::Customers,
        TableRole::Stores,
        TableRole::ExchangeRates,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TableRole::Sales => "Sales",
            TableRole::Products => "Products",
            TableRole::Customers => "Customers",
            TableRole::Stores => "Stores",
            TableRole::ExchangeRates => "Exchange Rates",
        }
    }

    /// Lowercase singular used to disambiguate colliding joined columns.
    pub fn suffix(&self) -> &'static str {
        match self {
            TableRole::Sales => "sales",
            TableRole::Products => "product",
            TableRole::Customers => "customer",
            TableRole::Stores => "store",
            TableRole::ExchangeRates => "exchange",
        }
    }

    pub fn default_file_name(&self) -> &'static str {
        match self {
            TableRole::Sales => "Sales.csv",
            TableRole::Products => "Products.csv",
            TableRole::Customers => "Customers.csv",
            TableRole::Stores => "Stores.csv",
            TableRole::ExchangeRates => "Exchange_Rates.csv",
        }
    }

    /// Unique key of a dimension table; `None` for the fact and reference tables.
    pub fn key_column(&self) -> Option<&'static str> {
        match self {
            TableRole::Products => Some(columns::PRODUCT_KEY),
            TableRole::Customers => Some(columns::CUSTOMER_KEY),
            TableRole::Stores => Some(columns::STORE_KEY),
            TableRole::Sales | TableRole::ExchangeRates => None,
        }
    }

    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            TableRole::Sales => &[
                columns::ORDER_NUMBER,
                columns::CUSTOMER_KEY,
                columns::PRODUCT_KEY,
                columns::STORE_KEY,
                columns::QUANTITY,
                columns::ORDER_DATE,
            ],
            TableRole::Products => &[
                columns::PRODUCT_KEY,
                columns::UNIT_COST_USD,
                columns::UNIT_PRICE_USD,
            ],
            TableRole::Customers => &[columns::CUSTOMER_KEY, columns::NAME],
            TableRole::Stores => &[columns::STORE_KEY, columns::COUNTRY],
            TableRole::ExchangeRates => &[columns::DATE, columns::CURRENCY, columns::EXCHANGE],
        }
    }

    /// Without the fact table there is nothing to join, so a run cannot
    /// proceed. Any other table that fails to load is replaced by an empty one.
    pub fn is_required(&self) -> bool {
        matches!(self, TableRole::Sales)
    }
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
