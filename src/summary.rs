// Summary tables produced by the pipeline and consumed by the renderers

use serde::Serialize;

/// Number of products per distinct rating value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingCount {
    pub rating: f64,
    pub count: usize,
}

/// Mean prices of the products sharing one rating value.
/// A mean is `None` when every price in the group is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceByRating {
    pub rating: f64,
    pub mean_actual_price: Option<f64>,
    pub mean_discounted_price: Option<f64>,
}

/// One aggregated value per category (mean rating or mean price)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryValue {
    pub category: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Square, symmetric matrix of pairwise Pearson coefficients.
///
/// `values[i][j]` correlates `columns[i]` with `columns[j]`. Off-diagonal
/// cells are `None` when fewer than two paired observations exist or one side
/// has zero variance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row).and_then(|r| r.get(col).copied().flatten())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "rows", rename_all = "snake_case")]
pub enum SummaryTable {
    RatingDistribution(Vec<RatingCount>),
    PriceByRating(Vec<PriceByRating>),
    Correlation(CorrelationMatrix),
    TopRatedCategories(Vec<CategoryValue>),
    CategoryCounts(Vec<CategoryCount>),
    CheapestCategories(Vec<CategoryValue>),
}

impl SummaryTable {
    /// Number of records (matrix rows for the correlation table)
    pub fn len(&self) -> usize {
        match self {
            SummaryTable::RatingDistribution(rows) => rows.len(),
            SummaryTable::PriceByRating(rows) => rows.len(),
            SummaryTable::Correlation(m) => m.columns.len(),
            SummaryTable::TopRatedCategories(rows) => rows.len(),
            SummaryTable::CategoryCounts(rows) => rows.len(),
            SummaryTable::CheapestCategories(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a section hands to the display: a chart-ready table, or a notice
/// shown in place of the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartPayload {
    Table(SummaryTable),
    Message(String),
}

/// The six dashboard sections, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    RatingDistribution,
    PriceByRating,
    CorrelationMatrix,
    TopRatedCategories,
    CategoryCounts,
    CheapestCategories,
}

impl SectionKind {
    pub const ALL: [SectionKind; 6] = [
        SectionKind::RatingDistribution,
        SectionKind::PriceByRating,
        SectionKind::CorrelationMatrix,
        SectionKind::TopRatedCategories,
        SectionKind::CategoryCounts,
        SectionKind::CheapestCategories,
    ];

    pub fn title(self) -> &'static str {
        match self {
            SectionKind::RatingDistribution => "Product Rating Distribution",
            SectionKind::PriceByRating => "Actual Price, Discounted Price and Rating",
            SectionKind::CorrelationMatrix => "Correlation Matrix for All Numeric Columns",
            SectionKind::TopRatedCategories => "Top 5 Categories by Product Rating",
            SectionKind::CategoryCounts => "Product Count per Category",
            SectionKind::CheapestCategories => "Top 5 Cheapest Categories by Discounted Price",
        }
    }

    /// File-name friendly identifier
    pub fn slug(self) -> &'static str {
        match self {
            SectionKind::RatingDistribution => "rating_distribution",
            SectionKind::PriceByRating => "price_by_rating",
            SectionKind::CorrelationMatrix => "correlation_matrix",
            SectionKind::TopRatedCategories => "top_rated_categories",
            SectionKind::CategoryCounts => "category_counts",
            SectionKind::CheapestCategories => "cheapest_categories",
        }
    }
}

/// A titled pipeline result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub payload: ChartPayload,
}

impl Section {
    pub fn table(kind: SectionKind, table: SummaryTable) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            payload: ChartPayload::Table(table),
        }
    }

    pub fn message(kind: SectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            payload: ChartPayload::Message(message.into()),
        }
    }
}

/// Round to `decimals` places, ties to even (the data-frame convention)
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
