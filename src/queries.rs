//! The fixed catalog of business questions asked of the `superstore` table.
//!
//! Every query is parameterless and read-only. Currency and percentage
//! aggregates are rounded to 2 decimals, shipping days to 1. Margins divide by
//! `NULLIF(SUM(sales), 0)` so a zero-sales group reports NULL rather than
//! failing. Bucketed queries take their `CASE` expressions from
//! [`crate::buckets`]; elapsed days come from the `days_between` and
//! `whole_days_between` functions registered on every store connection.

use std::{fmt, sync::OnceLock};

use log::info;
use serde::Serialize;

use crate::{
    buckets::{CHURN_RISK, DISCOUNT_BANDS, DISCOUNT_IMPACT, PURCHASE_FREQUENCY, quote},
    error::{Error, Result},
    results::ResultSet,
    store::Store,
};

/// Customers need at least this many orders before churn risk is assessed.
pub const CHURN_MIN_ORDERS: u32 = 3;

/// Sub-categories whose average discount on discounted lines exceeds this
/// fraction count as heavily discounted.
pub const HIGH_DISCOUNT_THRESHOLD: f64 = 0.15;

const MARGIN: &str = "ROUND(100.0 * SUM(profit) / NULLIF(SUM(sales), 0), 2)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Business,
    Customers,
    Products,
    Discounts,
    Seasonality,
    Cohorts,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Business,
        Section::Customers,
        Section::Products,
        Section::Discounts,
        Section::Seasonality,
        Section::Cohorts,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Business => "Business metrics",
            Section::Customers => "Customer analysis",
            Section::Products => "Product analysis",
            Section::Discounts => "Discount strategy",
            Section::Seasonality => "Time series and seasonality",
            Section::Cohorts => "Customer cohorts and RFM",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogQuery {
    pub name: &'static str,
    pub title: &'static str,
    pub section: Section,
    pub sql: String,
}

impl CatalogQuery {
    fn new(name: &'static str, title: &'static str, section: Section, sql: String) -> Self {
        Self {
            name,
            title,
            section,
            sql,
        }
    }
}

pub fn catalog() -> &'static [CatalogQuery] {
    static CATALOG: OnceLock<Vec<CatalogQuery>> = OnceLock::new();
    CATALOG.get_or_init(build_catalog)
}

pub fn find(name: &str) -> Result<&'static CatalogQuery> {
    catalog()
        .iter()
        .find(|query| query.name == name)
        .ok_or_else(|| Error::UnknownQuery(name.to_string()))
}

pub fn in_section(section: Section) -> impl Iterator<Item = &'static CatalogQuery> {
    catalog().iter().filter(move |query| query.section == section)
}

/// Runs one catalog query after checking the table is loaded and non-empty.
pub fn run(store: &Store, name: &str) -> Result<ResultSet> {
    let query = find(name)?;
    store.ensure_ready()?;
    let result = store.fetch(query.name, &query.sql)?;
    info!("Query '{}' returned {} row(s)", query.name, result.len());
    Ok(result)
}

fn build_catalog() -> Vec<CatalogQuery> {
    let mut queries = Vec::new();
    queries.extend(business_queries());
    queries.extend(customer_queries());
    queries.extend(product_queries());
    queries.extend(discount_queries());
    queries.extend(seasonality_queries());
    queries.extend(cohort_queries());
    queries
}

fn business_queries() -> Vec<CatalogQuery> {
    use Section::Business;
    vec![
        CatalogQuery::new(
            "overall-performance",
            "Overall business performance",
            Business,
            format!(
                "SELECT
    COUNT(DISTINCT order_id) AS total_orders,
    COUNT(DISTINCT customer_id) AS total_customers,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    {MARGIN} AS profit_margin_percent,
    SUM(quantity) AS total_quantity_sold,
    ROUND(AVG(sales), 2) AS avg_order_value,
    ROUND(AVG(profit), 2) AS avg_profit_per_order
FROM superstore"
            ),
        ),
        CatalogQuery::new(
            "sales-by-year",
            "Sales and profit by year",
            Business,
            format!(
                "SELECT
    CAST(strftime('%Y', order_date) AS INTEGER) AS year,
    COUNT(DISTINCT order_id) AS orders,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    {MARGIN} AS profit_margin_percent
FROM superstore
GROUP BY year
ORDER BY year"
            ),
        ),
        CatalogQuery::new(
            "sales-by-region",
            "Sales and profit by region",
            Business,
            format!(
                "SELECT
    region,
    COUNT(DISTINCT order_id) AS orders,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    {MARGIN} AS profit_margin_percent,
    ROUND(AVG(sales), 2) AS avg_sales_per_order
FROM superstore
GROUP BY region
ORDER BY total_sales DESC"
            ),
        ),
        CatalogQuery::new(
            "sales-by-category",
            "Sales and profit by category",
            Business,
            format!(
                "SELECT
    category,
    COUNT(DISTINCT order_id) AS orders,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    {MARGIN} AS profit_margin_percent,
    SUM(quantity) AS units_sold
FROM superstore
GROUP BY category
ORDER BY total_profit DESC"
            ),
        ),
        CatalogQuery::new(
            "top-sub-categories",
            "Top 10 sub-categories by profit",
            Business,
            format!(
                "SELECT
    category,
    sub_category,
    COUNT(DISTINCT order_id) AS orders,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    {MARGIN} AS profit_margin_percent
FROM superstore
GROUP BY category, sub_category
ORDER BY total_profit DESC
LIMIT 10"
            ),
        ),
        CatalogQuery::new(
            "loss-making-sub-categories",
            "Loss-making sub-categories",
            Business,
            format!(
                "SELECT
    category,
    sub_category,
    COUNT(DISTINCT order_id) AS orders,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    {MARGIN} AS profit_margin_percent
FROM superstore
GROUP BY category, sub_category
HAVING SUM(profit) < 0
ORDER BY total_profit ASC"
            ),
        ),
    ]
}

fn customer_queries() -> Vec<CatalogQuery> {
    use Section::Customers;
    vec![
        CatalogQuery::new(
            "top-customers",
            "Top 10 customers by sales",
            Customers,
            "SELECT
    customer_id,
    customer_name,
    COUNT(DISTINCT order_id) AS total_orders,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    ROUND(AVG(sales), 2) AS avg_order_value
FROM superstore
GROUP BY customer_id, customer_name
ORDER BY total_sales DESC
LIMIT 10"
                .to_string(),
        ),
        CatalogQuery::new(
            "segment-summary",
            "Customer segmentation",
            Customers,
            format!(
                "SELECT
    segment,
    COUNT(DISTINCT customer_id) AS total_customers,
    COUNT(DISTINCT order_id) AS total_orders,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    ROUND(AVG(sales), 2) AS avg_order_value,
    {MARGIN} AS profit_margin_percent
FROM superstore
GROUP BY segment
ORDER BY total_sales DESC"
            ),
        ),
    ]
}

fn product_queries() -> Vec<CatalogQuery> {
    use Section::Products;
    vec![
        CatalogQuery::new(
            "top-products",
            "Top 10 products by profit",
            Products,
            format!(
                "SELECT
    product_name,
    category,
    sub_category,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    {MARGIN} AS profit_margin_percent
FROM superstore
GROUP BY product_name, category, sub_category
ORDER BY total_profit DESC
LIMIT 10"
            ),
        ),
        CatalogQuery::new(
            "discount-impact",
            "Discount impact on profitability",
            Products,
            format!(
                "SELECT
    {bucket} AS discount_range,
    COUNT(DISTINCT order_id) AS total_orders,
    ROUND(AVG(discount) * 100, 2) AS avg_discount_percent,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    {MARGIN} AS profit_margin_percent
FROM superstore
GROUP BY discount_range
ORDER BY avg_discount_percent",
                bucket = DISCOUNT_IMPACT.label_sql("discount"),
            ),
        ),
        CatalogQuery::new(
            "sales-by-ship-mode",
            "Sales by shipping mode",
            Products,
            "SELECT
    ship_mode,
    COUNT(DISTINCT order_id) AS total_orders,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    ROUND(AVG(sales), 2) AS avg_order_value
FROM superstore
GROUP BY ship_mode
ORDER BY total_sales DESC"
                .to_string(),
        ),
    ]
}

fn discount_queries() -> Vec<CatalogQuery> {
    use Section::Discounts;
    vec![
        CatalogQuery::new(
            "discount-bands",
            "Discount bands versus profit",
            Discounts,
            format!(
                "SELECT
    {bucket} AS discount_range,
    COUNT(*) AS transaction_count,
    ROUND(AVG(discount) * 100, 2) AS avg_discount_percent,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    ROUND(AVG(sales), 2) AS avg_transaction_value,
    {MARGIN} AS profit_margin_percent
FROM superstore
GROUP BY discount_range
ORDER BY avg_discount_percent",
                bucket = DISCOUNT_BANDS.label_sql("discount"),
            ),
        ),
        CatalogQuery::new(
            "high-discount-sub-categories",
            "Sub-categories with heavy discounting",
            Discounts,
            format!(
                "SELECT
    category,
    sub_category,
    COUNT(DISTINCT order_id) AS orders,
    ROUND(AVG(discount) * 100, 2) AS avg_discount_percent,
    ROUND(MAX(discount) * 100, 2) AS max_discount_percent,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    {MARGIN} AS profit_margin_percent
FROM superstore
WHERE discount > 0
GROUP BY category, sub_category
HAVING AVG(discount) > {HIGH_DISCOUNT_THRESHOLD}
ORDER BY avg_discount_percent DESC
LIMIT 10"
            ),
        ),
        CatalogQuery::new(
            "segment-discount-behaviour",
            "Discounting by customer segment",
            Discounts,
            format!(
                "SELECT
    segment,
    COUNT(DISTINCT customer_id) AS customers,
    COUNT(DISTINCT order_id) AS orders,
    ROUND(AVG(CASE WHEN discount > 0 THEN discount END) * 100, 2) AS avg_discount_when_given,
    ROUND(SUM(CASE WHEN discount > 0 THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2) AS pct_orders_with_discount,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    {MARGIN} AS profit_margin_percent
FROM superstore
GROUP BY segment
ORDER BY total_sales DESC"
            ),
        ),
        CatalogQuery::new(
            "monthly-discount-trend",
            "Monthly discount trend",
            Discounts,
            format!(
                "SELECT
    strftime('%Y-%m', order_date) AS year_month,
    COUNT(DISTINCT order_id) AS orders,
    ROUND(AVG(discount) * 100, 2) AS avg_discount_percent,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    {MARGIN} AS profit_margin_percent
FROM superstore
GROUP BY year_month
ORDER BY year_month"
            ),
        ),
    ]
}

fn seasonality_queries() -> Vec<CatalogQuery> {
    use Section::Seasonality;
    const DAY_NAMES: [&str; 7] = [
        "Sunday",
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
    ];
    const MONTH_NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    let day_number = "CAST(strftime('%w', order_date) AS INTEGER)";
    let month_number = "CAST(strftime('%m', order_date) AS INTEGER)";
    vec![
        CatalogQuery::new(
            "sales-by-day-of-week",
            "Sales by day of week",
            Seasonality,
            format!(
                "SELECT
    {day_name} AS day_of_week,
    {day_number} AS day_num,
    COUNT(DISTINCT order_id) AS orders,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    ROUND(AVG(sales), 2) AS avg_order_value
FROM superstore
GROUP BY day_num
ORDER BY day_num",
                day_name = name_lookup_sql(day_number, &DAY_NAMES, 0),
            ),
        ),
        CatalogQuery::new(
            "sales-by-month",
            "Sales by calendar month",
            Seasonality,
            format!(
                "SELECT
    {month_number} AS month_num,
    {month_name} AS month_name,
    COUNT(DISTINCT order_id) AS orders,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit
FROM superstore
GROUP BY month_num
ORDER BY month_num",
                month_name = name_lookup_sql(month_number, &MONTH_NAMES, 1),
            ),
        ),
        CatalogQuery::new(
            "shipping-performance",
            "Shipping performance by mode",
            Seasonality,
            "SELECT
    ship_mode,
    COUNT(DISTINCT order_id) AS orders,
    ROUND(AVG(days_between(order_date, ship_date)), 1) AS avg_ship_days,
    ROUND(MIN(days_between(order_date, ship_date)), 1) AS min_ship_days,
    ROUND(MAX(days_between(order_date, ship_date)), 1) AS max_ship_days,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(AVG(sales), 2) AS avg_order_value
FROM superstore
GROUP BY ship_mode
ORDER BY avg_ship_days"
                .to_string(),
        ),
        CatalogQuery::new(
            "quarterly-performance",
            "Quarterly performance",
            Seasonality,
            format!(
                "SELECT
    CAST(strftime('%Y', order_date) AS INTEGER) AS year,
    'Q' || (({month_number} + 2) / 3) AS quarter,
    COUNT(DISTINCT order_id) AS orders,
    ROUND(SUM(sales), 2) AS total_sales,
    ROUND(SUM(profit), 2) AS total_profit,
    {MARGIN} AS profit_margin_percent
FROM superstore
GROUP BY year, quarter
ORDER BY year, quarter"
            ),
        ),
    ]
}

fn cohort_queries() -> Vec<CatalogQuery> {
    use Section::Cohorts;
    vec![
        CatalogQuery::new(
            "purchase-frequency",
            "Customer purchase frequency distribution",
            Cohorts,
            format!(
                "WITH customer_orders AS (
    SELECT customer_id, COUNT(DISTINCT order_id) AS order_count
    FROM superstore
    GROUP BY customer_id
),
tiers AS (
    SELECT
        {label} AS purchase_count,
        {rank} AS tier_rank,
        COUNT(*) AS customer_count
    FROM customer_orders
    GROUP BY purchase_count, tier_rank
)
SELECT
    purchase_count,
    customer_count,
    ROUND(customer_count * 100.0 / SUM(customer_count) OVER (), 2) AS percentage,
    ROUND(SUM(customer_count) OVER (ORDER BY tier_rank ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW)
          * 100.0 / SUM(customer_count) OVER (), 2) AS cumulative_percentage
FROM tiers
ORDER BY tier_rank",
                label = PURCHASE_FREQUENCY.label_sql("order_count"),
                rank = PURCHASE_FREQUENCY.rank_sql("order_count"),
            ),
        ),
        CatalogQuery::new(
            "customer-lifetime-value",
            "Top 20 customers by lifetime value",
            Cohorts,
            "SELECT
    customer_id,
    customer_name,
    segment,
    COUNT(DISTINCT order_id) AS total_orders,
    ROUND(SUM(sales), 2) AS lifetime_value,
    ROUND(SUM(profit), 2) AS lifetime_profit,
    ROUND(AVG(sales), 2) AS avg_order_value,
    ROUND(SUM(profit) * 1.0 / COUNT(DISTINCT order_id), 2) AS avg_profit_per_order
FROM superstore
GROUP BY customer_id, customer_name, segment
ORDER BY lifetime_value DESC
LIMIT 20"
                .to_string(),
        ),
        CatalogQuery::new(
            "segment-lifetime-value",
            "Lifetime value by segment",
            Cohorts,
            "SELECT
    segment,
    COUNT(DISTINCT customer_id) AS customers,
    ROUND(AVG(customer_orders), 1) AS avg_orders_per_customer,
    ROUND(AVG(customer_sales), 2) AS avg_lifetime_value,
    ROUND(AVG(customer_profit), 2) AS avg_lifetime_profit,
    ROUND(SUM(customer_sales), 2) AS segment_total_sales,
    ROUND(SUM(customer_profit), 2) AS segment_total_profit
FROM (
    SELECT
        segment,
        customer_id,
        COUNT(DISTINCT order_id) AS customer_orders,
        SUM(sales) AS customer_sales,
        SUM(profit) AS customer_profit
    FROM superstore
    GROUP BY segment, customer_id
)
GROUP BY segment
ORDER BY segment_total_sales DESC"
                .to_string(),
        ),
        CatalogQuery::new(
            "churn-risk",
            "Customers at risk of churning",
            Cohorts,
            format!(
                "WITH snapshot AS (
    SELECT MAX(order_date) AS max_order_date FROM superstore
),
customer_last_order AS (
    SELECT
        customer_id,
        customer_name,
        segment,
        MAX(order_date) AS last_order_date,
        COUNT(DISTINCT order_id) AS total_orders,
        ROUND(SUM(sales), 2) AS lifetime_value,
        ROUND(SUM(profit), 2) AS lifetime_profit
    FROM superstore
    GROUP BY customer_id, customer_name, segment
),
recency AS (
    SELECT
        c.*,
        whole_days_between(c.last_order_date, s.max_order_date) AS days_since_last_order
    FROM customer_last_order c
    CROSS JOIN snapshot s
),
classified AS (
    SELECT recency.*, {risk} AS risk_status
    FROM recency
)
SELECT
    customer_id,
    customer_name,
    segment,
    last_order_date,
    days_since_last_order,
    total_orders,
    lifetime_value,
    lifetime_profit,
    risk_status
FROM classified
WHERE total_orders >= {CHURN_MIN_ORDERS}
  AND risk_status <> {active}
ORDER BY days_since_last_order DESC, lifetime_value DESC
LIMIT 20",
                risk = CHURN_RISK.label_sql("days_since_last_order"),
                active = quote(CHURN_RISK.fallback.label),
            ),
        ),
    ]
}

/// `CASE` mapping a 0- or 1-based number onto a fixed list of names.
fn name_lookup_sql(expr: &str, names: &[&str], first: usize) -> String {
    let arms = names
        .iter()
        .enumerate()
        .map(|(idx, name)| format!(" WHEN {} THEN {}", idx + first, quote(name)))
        .collect::<String>();
    format!("CASE {expr}{arms} END")
}
