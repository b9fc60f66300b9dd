//! Hand-authored query templates for recognized question shapes.
//!
//! Templates are the deterministic path: they render from the constraint
//! set alone and need no model. Each one names the tables it reads so a
//! template is only offered when the dataset actually has them.

use chrono::NaiveDate;
use quarry_core::models::{ConstraintSet, SchemaDescription};

const REVENUE: &str = "SUM(od.UnitPrice * od.Quantity * (1 - od.Discount))";

const BASE_TABLES: &[&str] = &["Orders", "Order Details", "Products", "Categories"];
const CUSTOMER_TABLES: &[&str] = &["Orders", "Order Details", "Products", "Categories", "Customers"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    TopProductsByRevenue,
    AverageOrderValue,
    TopCategoryByQuantity,
    CategoryRevenue,
    TopCustomerByMargin,
}

impl Template {
    /// Matching order; the first match wins.
    pub const ALL: [Template; 5] = [
        Template::TopCustomerByMargin,
        Template::AverageOrderValue,
        Template::TopCategoryByQuantity,
        Template::TopProductsByRevenue,
        Template::CategoryRevenue,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::TopProductsByRevenue => "top_products_by_revenue",
            Self::AverageOrderValue => "average_order_value",
            Self::TopCategoryByQuantity => "top_category_by_quantity",
            Self::CategoryRevenue => "category_revenue",
            Self::TopCustomerByMargin => "top_customer_by_margin",
        }
    }

    pub fn tables(self) -> &'static [&'static str] {
        match self {
            Self::TopCustomerByMargin => CUSTOMER_TABLES,
            _ => BASE_TABLES,
        }
    }

    pub fn matches(self, question: &str, constraints: &ConstraintSet) -> bool {
        let q = question.to_ascii_lowercase();
        let kpi = constraints.kpi().map(str::to_ascii_lowercase).unwrap_or_default();
        match self {
            Self::TopCustomerByMargin => {
                q.contains("customer") && (q.contains("margin") || kpi.contains("margin"))
            }
            Self::AverageOrderValue => {
                q.contains("aov") || q.contains("average order value") || kpi == "aov"
            }
            Self::TopCategoryByQuantity => q.contains("category") && q.contains("quantity"),
            Self::TopProductsByRevenue => q.contains("product") && q.contains("revenue"),
            Self::CategoryRevenue => q.contains("revenue") && constraints.category().is_some(),
        }
    }

    /// First template matching the question whose tables all exist.
    pub fn select(
        question: &str,
        constraints: &ConstraintSet,
        schema: &SchemaDescription,
    ) -> Option<Self> {
        Self::ALL.into_iter().find(|t| {
            t.matches(question, constraints) && t.tables().iter().all(|name| schema.has_table(name))
        })
    }

    /// Render the SQL text for `constraints`.
    pub fn render(self, constraints: &ConstraintSet, cost_ratio: f64) -> String {
        let filter = where_clause(constraints);
        match self {
            Self::TopProductsByRevenue => format!(
                "SELECT p.ProductName AS product, ROUND({REVENUE}, 2) AS revenue\n{}{filter}\n\
                 GROUP BY p.ProductID, p.ProductName\nORDER BY revenue DESC\nLIMIT {}",
                from_clause(false),
                constraints.top_n().unwrap_or(3),
            ),
            Self::AverageOrderValue => format!(
                "SELECT ROUND({REVENUE} / COUNT(DISTINCT o.OrderID), 2) AS aov\n{}{filter}",
                from_clause(false),
            ),
            Self::TopCategoryByQuantity => format!(
                "SELECT c.CategoryName AS category, SUM(od.Quantity) AS quantity\n{}{filter}\n\
                 GROUP BY c.CategoryID, c.CategoryName\nORDER BY quantity DESC\nLIMIT {}",
                from_clause(false),
                constraints.top_n().unwrap_or(1),
            ),
            Self::CategoryRevenue => format!(
                "SELECT ROUND({REVENUE}, 2) AS revenue\n{}{filter}",
                from_clause(false),
            ),
            Self::TopCustomerByMargin => format!(
                "SELECT cu.CompanyName AS customer, \
                 ROUND(SUM((od.UnitPrice - {cost_ratio} * od.UnitPrice) * od.Quantity * (1 - od.Discount)), 2) AS margin\n\
                 {}{filter}\nGROUP BY cu.CustomerID, cu.CompanyName\nORDER BY margin DESC\nLIMIT {}",
                from_clause(true),
                constraints.top_n().unwrap_or(1),
            ),
        }
    }
}

/// Day after `end`, for half-open date ranges over text timestamps.
pub fn exclusive_end(end: NaiveDate) -> NaiveDate {
    end.succ_opt().unwrap_or(end)
}

fn from_clause(with_customers: bool) -> String {
    let mut from = String::from(
        "FROM Orders o\n\
         JOIN \"Order Details\" od ON od.OrderID = o.OrderID\n\
         JOIN Products p ON p.ProductID = od.ProductID\n\
         JOIN Categories c ON c.CategoryID = p.CategoryID",
    );
    if with_customers {
        from.push_str("\nJOIN Customers cu ON cu.CustomerID = o.CustomerID");
    }
    from
}

fn where_clause(constraints: &ConstraintSet) -> String {
    let mut conditions = Vec::new();
    if let Some(start) = constraints.date_start() {
        conditions.push(format!("o.OrderDate >= '{}'", start.format("%Y-%m-%d")));
    }
    if let Some(end) = constraints.date_end() {
        conditions.push(format!("o.OrderDate < '{}'", exclusive_end(end).format("%Y-%m-%d")));
    }
    if let Some(category) = constraints.category() {
        conditions.push(format!("c.CategoryName = '{}'", category.replace('\'', "''")));
    }
    if conditions.is_empty() {
        String::new()
    } else {
        format!("\nWHERE {}", conditions.join(" AND "))
    }
}
