//! Labeled threshold tables used to bucket discounts, purchase frequency and
//! churn risk.
//!
//! A [`BucketTable`] is an ordered list of bands plus a catch-all fallback.
//! The first band whose rule matches wins, so every value lands in exactly one
//! bucket. The same tables classify values in Rust ([`BucketTable::classify`])
//! and generate the SQL `CASE` expressions used by the catalog queries.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    Equals(f64),
    /// `above < value <= at_most`
    Within { above: f64, at_most: f64 },
    Above(f64),
}

impl Rule {
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            Rule::Equals(target) => value == target,
            Rule::Within { above, at_most } => value > above && value <= at_most,
            Rule::Above(threshold) => value > threshold,
        }
    }

    fn to_sql(self, expr: &str) -> String {
        match self {
            Rule::Equals(target) => format!("{expr} = {target}"),
            Rule::Within { above, at_most } => format!("{expr} > {above} AND {expr} <= {at_most}"),
            Rule::Above(threshold) => format!("{expr} > {threshold}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    pub label: &'static str,
    /// Display order, independent of the label's alphabetical order.
    pub rank: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub rule: Rule,
    pub bucket: Bucket,
}

const fn band(rule: Rule, label: &'static str, rank: u32) -> Band {
    Band {
        rule,
        bucket: Bucket { label, rank },
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BucketTable {
    pub name: &'static str,
    pub bands: &'static [Band],
    pub fallback: Bucket,
}

impl BucketTable {
    pub fn classify(&self, value: f64) -> &Bucket {
        self.bands
            .iter()
            .find(|band| band.rule.matches(value))
            .map(|band| &band.bucket)
            .unwrap_or(&self.fallback)
    }

    /// Every bucket in rank order, fallback last.
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> {
        self.bands.iter().map(|b| &b.bucket).chain(std::iter::once(&self.fallback))
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.buckets().map(|b| b.label).collect()
    }

    /// `CASE` expression yielding the bucket label for `expr`.
    pub fn label_sql(&self, expr: &str) -> String {
        self.case_sql(expr, |bucket| quote(bucket.label))
    }

    /// `CASE` expression yielding the bucket rank for `expr`.
    pub fn rank_sql(&self, expr: &str) -> String {
        self.case_sql(expr, |bucket| bucket.rank.to_string())
    }

    fn case_sql(&self, expr: &str, output: impl Fn(&Bucket) -> String) -> String {
        let arms = self
            .bands
            .iter()
            .map(|band| format!(" WHEN {} THEN {}", band.rule.to_sql(expr), output(&band.bucket)))
            .collect::<String>();
        format!("CASE{arms} ELSE {} END", output(&self.fallback))
    }
}

pub(crate) fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Five bands used by the product-level discount impact rollup.
pub const DISCOUNT_IMPACT: BucketTable = BucketTable {
    name: "discount_impact",
    bands: &[
        band(Rule::Equals(0.0), "No Discount", 1),
        band(Rule::Within { above: 0.0, at_most: 0.1 }, "1-10% Discount", 2),
        band(Rule::Within { above: 0.1, at_most: 0.2 }, "11-20% Discount", 3),
        band(Rule::Within { above: 0.2, at_most: 0.3 }, "21-30% Discount", 4),
    ],
    fallback: Bucket {
        label: "Over 30% Discount",
        rank: 5,
    },
};

/// Six bands used by the discount deep dive.
pub const DISCOUNT_BANDS: BucketTable = BucketTable {
    name: "discount_bands",
    bands: &[
        band(Rule::Equals(0.0), "No Discount", 1),
        band(Rule::Within { above: 0.0, at_most: 0.1 }, "1-10%", 2),
        band(Rule::Within { above: 0.1, at_most: 0.2 }, "11-20%", 3),
        band(Rule::Within { above: 0.2, at_most: 0.3 }, "21-30%", 4),
        band(Rule::Within { above: 0.3, at_most: 0.4 }, "31-40%", 5),
    ],
    fallback: Bucket {
        label: "Over 40%",
        rank: 6,
    },
};

/// Customers by count of distinct orders.
pub const PURCHASE_FREQUENCY: BucketTable = BucketTable {
    name: "purchase_frequency",
    bands: &[
        band(Rule::Equals(1.0), "1 (One-time)", 1),
        band(Rule::Within { above: 1.0, at_most: 3.0 }, "2-3 (Occasional)", 2),
        band(Rule::Within { above: 3.0, at_most: 6.0 }, "4-6 (Regular)", 3),
        band(Rule::Within { above: 6.0, at_most: 10.0 }, "7-10 (Frequent)", 4),
    ],
    fallback: Bucket {
        label: "11+ (VIP)",
        rank: 5,
    },
};

/// Days since a customer's last order, relative to the newest order overall.
pub const CHURN_RISK: BucketTable = BucketTable {
    name: "churn_risk",
    bands: &[
        band(Rule::Above(365.0), "High Risk", 1),
        band(Rule::Above(180.0), "Medium Risk", 2),
    ],
    fallback: Bucket {
        label: "Active",
        rank: 3,
    },
};

pub const ALL_TABLES: &[BucketTable] = &[DISCOUNT_IMPACT, DISCOUNT_BANDS, PURCHASE_FREQUENCY, CHURN_RISK];
