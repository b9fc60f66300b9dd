//! A small Northwind-shaped SQLite database with hand-checked answers.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tempfile::TempDir;

/// Known answers over the fixture data.
pub mod expected {
    /// Top 3 products by revenue, all time.
    pub const TOP3_PRODUCTS: [(&str, f64); 3] = [
        ("Cote de Blaye", 790.5),
        ("Carnarvon Tigers", 750.0),
        ("Chai", 648.0),
    ];
    /// Average order value, December 1997 (two orders).
    pub const AOV_DECEMBER_1997: f64 = 642.05;
    /// Top category by quantity, June 1997.
    pub const SUMMER_1997_TOP_CATEGORY: (&str, i64) = ("Beverages", 41);
    /// Beverages revenue, June 1997.
    pub const BEVERAGES_REVENUE_JUNE_1997: f64 = 724.5;
    /// Top customer by gross margin (cost ratio 0.7), 1997.
    pub const TOP_MARGIN_CUSTOMER_1997: (&str, f64) = ("Ernst Handel", 330.0);
    /// Orders placed in 1997.
    pub const ORDERS_1997: i64 = 6;
}

const SCHEMA: &str = r#"
CREATE TABLE Categories (
    CategoryID INTEGER PRIMARY KEY,
    CategoryName TEXT NOT NULL,
    Description TEXT
);
CREATE TABLE Customers (
    CustomerID TEXT PRIMARY KEY,
    CompanyName TEXT NOT NULL,
    Country TEXT
);
CREATE TABLE Products (
    ProductID INTEGER PRIMARY KEY,
    ProductName TEXT NOT NULL,
    CategoryID INTEGER REFERENCES Categories(CategoryID),
    UnitPrice REAL NOT NULL
);
CREATE TABLE Orders (
    OrderID INTEGER PRIMARY KEY,
    CustomerID TEXT REFERENCES Customers(CustomerID),
    OrderDate TEXT NOT NULL
);
CREATE TABLE "Order Details" (
    OrderID INTEGER REFERENCES Orders(OrderID),
    ProductID INTEGER REFERENCES Products(ProductID),
    UnitPrice REAL NOT NULL,
    Quantity INTEGER NOT NULL,
    Discount REAL NOT NULL DEFAULT 0,
    PRIMARY KEY (OrderID, ProductID)
);
"#;

const CATEGORIES: &[(i64, &str)] = &[
    (1, "Beverages"),
    (2, "Condiments"),
    (3, "Confections"),
    (4, "Dairy Products"),
    (5, "Grains/Cereals"),
    (6, "Meat/Poultry"),
    (7, "Produce"),
    (8, "Seafood"),
];

const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("ALFKI", "Alfreds Futterkiste", "Germany"),
    ("ERNSH", "Ernst Handel", "Austria"),
    ("QUICK", "QUICK-Stop", "Germany"),
];

const PRODUCTS: &[(i64, &str, i64, f64)] = &[
    (1, "Chai", 1, 18.0),
    (2, "Chang", 1, 19.0),
    (3, "Aniseed Syrup", 2, 10.0),
    (4, "Cote de Blaye", 1, 263.5),
    (5, "Mozzarella di Giovanni", 4, 34.8),
    (6, "Carnarvon Tigers", 8, 62.5),
    (7, "Teatime Chocolate Biscuits", 3, 9.2),
];

const ORDERS: &[(i64, &str, &str)] = &[
    (10248, "ALFKI", "1997-03-10"),
    (10249, "ERNSH", "1997-06-05"),
    (10250, "QUICK", "1997-06-20"),
    (10251, "ALFKI", "1997-06-30"),
    (10252, "ERNSH", "1997-12-03"),
    (10253, "QUICK", "1997-12-15"),
    (10254, "ALFKI", "1998-01-07"),
    (10255, "QUICK", "1996-11-20"),
];

const ORDER_DETAILS: &[(i64, i64, f64, i64, f64)] = &[
    (10248, 4, 263.5, 2, 0.0),
    (10248, 1, 18.0, 10, 0.0),
    (10249, 1, 18.0, 20, 0.0),
    (10249, 3, 10.0, 5, 0.0),
    (10250, 2, 19.0, 15, 0.1),
    (10250, 5, 34.8, 4, 0.0),
    (10251, 1, 18.0, 6, 0.0),
    (10251, 7, 9.2, 10, 0.0),
    (10252, 6, 62.5, 8, 0.0),
    (10252, 2, 19.0, 10, 0.0),
    (10253, 5, 34.8, 10, 0.05),
    (10253, 4, 263.5, 1, 0.0),
    (10254, 6, 62.5, 4, 0.0),
    (10255, 3, 10.0, 12, 0.0),
];

/// Fixture database in a temporary directory, removed on drop.
pub struct NorthwindDb {
    _dir: TempDir,
    path: PathBuf,
}

impl NorthwindDb {
    /// Create and populate the fixture database.
    ///
    /// # Panics
    /// Panics if the temporary database cannot be written.
    pub fn create() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("northwind.sqlite");
        populate(&path).unwrap_or_else(|e| panic!("populate {}: {e}", path.display()));
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn populate(path: &Path) -> rusqlite::Result<()> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;
    let tx = conn.transaction()?;
    for (id, name) in CATEGORIES {
        tx.execute(
            "INSERT INTO Categories (CategoryID, CategoryName) VALUES (?1, ?2)",
            params![id, name],
        )?;
    }
    for (id, company, country) in CUSTOMERS {
        tx.execute(
            "INSERT INTO Customers (CustomerID, CompanyName, Country) VALUES (?1, ?2, ?3)",
            params![id, company, country],
        )?;
    }
    for (id, name, category, price) in PRODUCTS {
        tx.execute(
            "INSERT INTO Products (ProductID, ProductName, CategoryID, UnitPrice) VALUES (?1, ?2, ?3, ?4)",
            params![id, name, category, price],
        )?;
    }
    for (id, customer, date) in ORDERS {
        tx.execute(
            "INSERT INTO Orders (OrderID, CustomerID, OrderDate) VALUES (?1, ?2, ?3)",
            params![id, customer, date],
        )?;
    }
    for (order, product, price, qty, discount) in ORDER_DETAILS {
        tx.execute(
            r#"INSERT INTO "Order Details" (OrderID, ProductID, UnitPrice, Quantity, Discount) VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![order, product, price, qty, discount],
        )?;
    }
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_answers_hold_on_fixture_data() {
        let db = NorthwindDb::create();
        let conn = Connection::open(db.path()).unwrap();

        let aov: f64 = conn
            .query_row(
                r#"SELECT ROUND(SUM(od.UnitPrice * od.Quantity * (1 - od.Discount)) / COUNT(DISTINCT o.OrderID), 2)
                   FROM Orders o JOIN "Order Details" od ON o.OrderID = od.OrderID
                   WHERE o.OrderDate >= '1997-12-01' AND o.OrderDate < '1998-01-01'"#,
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert!((aov - expected::AOV_DECEMBER_1997).abs() < 1e-9);

        let (product, revenue): (String, f64) = conn
            .query_row(
                r#"SELECT p.ProductName, ROUND(SUM(od.UnitPrice * od.Quantity * (1 - od.Discount)), 2) AS revenue
                   FROM Products p JOIN "Order Details" od ON p.ProductID = od.ProductID
                   GROUP BY p.ProductID ORDER BY revenue DESC LIMIT 1"#,
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(product, expected::TOP3_PRODUCTS[0].0);
        assert!((revenue - expected::TOP3_PRODUCTS[0].1).abs() < 1e-9);
    }
}
