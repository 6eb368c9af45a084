// Aggregation pipeline: Dataset -> six summary tables

use crate::data::{ColumnKind, Dataset};
use crate::error::PipelineError;
use crate::summary::{
    round_to, CategoryCount, CategoryValue, CorrelationMatrix, PriceByRating, RatingCount,
    Section, SectionKind, SummaryTable,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

pub const RATING_COL: &str = "rating";
pub const ACTUAL_PRICE_COL: &str = "actual_price";
pub const DISCOUNTED_PRICE_COL: &str = "discounted_price";
pub const CATEGORY_COL: &str = "category";

/// Rows kept by the top-N category stages
pub const TOP_N: usize = 5;

/// Shown instead of the correlation heatmap when nothing is numeric
pub const NO_NUMERIC_MESSAGE: &str = "No numeric columns found in the dataset.";

/// Run all six stages in display order.
///
/// Only the correlation stage has a non-fatal failure; every other error
/// (missing or non-numeric required column) aborts the run.
pub fn run_pipeline(data: &Dataset) -> Result<Vec<Section>, PipelineError> {
    info!(
        "Aggregating {} rows across {} columns",
        data.row_count(),
        data.columns().len()
    );

    let mut sections = Vec::with_capacity(SectionKind::ALL.len());
    for kind in SectionKind::ALL {
        let section = run_stage(kind, data)?;
        sections.push(section);
    }
    Ok(sections)
}

/// Compute a single section
pub fn run_stage(kind: SectionKind, data: &Dataset) -> Result<Section, PipelineError> {
    let table = match kind {
        SectionKind::RatingDistribution => {
            SummaryTable::RatingDistribution(rating_distribution(data)?)
        }
        SectionKind::PriceByRating => SummaryTable::PriceByRating(price_by_rating(data)?),
        SectionKind::CorrelationMatrix => match correlation_matrix(data) {
            Ok(matrix) => SummaryTable::Correlation(matrix),
            Err(PipelineError::NoNumericData) => {
                warn!("{}: {}", kind.title(), NO_NUMERIC_MESSAGE);
                return Ok(Section::message(kind, NO_NUMERIC_MESSAGE));
            }
            Err(e) => return Err(e),
        },
        SectionKind::TopRatedCategories => {
            SummaryTable::TopRatedCategories(top_rated_categories(data, TOP_N)?)
        }
        SectionKind::CategoryCounts => SummaryTable::CategoryCounts(category_counts(data)?),
        SectionKind::CheapestCategories => {
            SummaryTable::CheapestCategories(cheapest_categories(data, TOP_N)?)
        }
    };

    debug!("{}: {} summary rows", kind.slug(), table.len());
    Ok(Section::table(kind, table))
}

// =============================================================================
// Stages
// =============================================================================

/// Count of products per rating value, ratings ascending
pub fn rating_distribution(data: &Dataset) -> Result<Vec<RatingCount>, PipelineError> {
    let ratings = data.numeric(RATING_COL, "rating distribution")?;

    Ok(group_by_number(&ratings)
        .into_iter()
        .map(|(rating, rows)| RatingCount {
            rating,
            count: rows.len(),
        })
        .collect())
}

/// Mean actual and discounted price per rating value, ratings ascending
pub fn price_by_rating(data: &Dataset) -> Result<Vec<PriceByRating>, PipelineError> {
    const STAGE: &str = "price by rating";
    let ratings = data.numeric(RATING_COL, STAGE)?;
    let actual = data.numeric(ACTUAL_PRICE_COL, STAGE)?;
    let discounted = data.numeric(DISCOUNTED_PRICE_COL, STAGE)?;

    Ok(group_by_number(&ratings)
        .into_iter()
        .map(|(rating, rows)| PriceByRating {
            rating,
            mean_actual_price: mean_of(&actual, &rows),
            mean_discounted_price: mean_of(&discounted, &rows),
        })
        .collect())
}

/// Pairwise Pearson correlation of every numeric column, rounded to 2 places
pub fn correlation_matrix(data: &Dataset) -> Result<CorrelationMatrix, PipelineError> {
    let numeric = data.numeric_columns();
    if numeric.is_empty() {
        return Err(PipelineError::NoNumericData);
    }

    let n = numeric.len();
    let mut values = vec![vec![None; n]; n];

    for i in 0..n {
        values[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let r = pearson(numeric[i].1, numeric[j].1).map(|r| round_to(r, 2));
            // Mirror so the matrix is exactly symmetric
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        columns: numeric.iter().map(|(name, _)| name.to_string()).collect(),
        values,
    })
}

/// Categories with the highest mean rating (2 decimals), best first
pub fn top_rated_categories(
    data: &Dataset,
    limit: usize,
) -> Result<Vec<CategoryValue>, PipelineError> {
    const STAGE: &str = "top rated categories";
    let mut rows = mean_by_category(data, RATING_COL, STAGE, 2)?;
    rows.sort_by(|a, b| cmp_missing_last(a.value, b.value, true));
    rows.truncate(limit);
    Ok(rows)
}

/// Number of products per category, most frequent first.
///
/// Categories with equal counts keep the order they first appear in.
pub fn category_counts(data: &Dataset) -> Result<Vec<CategoryCount>, PipelineError> {
    let labels = data.labels(CATEGORY_COL, "category counts")?;

    let mut order: Vec<CategoryCount> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for label in labels.into_iter().flatten() {
        match position.get(&label) {
            Some(&idx) => order[idx].count += 1,
            None => {
                position.insert(label.clone(), order.len());
                order.push(CategoryCount {
                    category: label,
                    count: 1,
                });
            }
        }
    }

    // Stable: ties stay in first-appearance order
    order.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(order)
}

/// Categories with the lowest mean discounted price (rounded to an integer),
/// cheapest first
pub fn cheapest_categories(
    data: &Dataset,
    limit: usize,
) -> Result<Vec<CategoryValue>, PipelineError> {
    const STAGE: &str = "cheapest categories";
    let mut rows = mean_by_category(data, DISCOUNTED_PRICE_COL, STAGE, 0)?;
    rows.sort_by(|a, b| cmp_missing_last(a.value, b.value, false));
    rows.truncate(limit);
    Ok(rows)
}

// =============================================================================
// Helpers
// =============================================================================

/// Mean of `value_col` per category (categories in sorted key order), rounded
fn mean_by_category(
    data: &Dataset,
    value_col: &str,
    stage: &'static str,
    decimals: i32,
) -> Result<Vec<CategoryValue>, PipelineError> {
    let groups = group_by_category(data, stage)?;
    let values = data.numeric(value_col, stage)?;

    Ok(groups
        .into_iter()
        .map(|(category, rows)| CategoryValue {
            category,
            value: mean_of(&values, &rows).map(|m| round_to(m, decimals)),
        })
        .collect())
}

/// Row indices per category. Numeric categories are ordered by value, text
/// categories lexically.
fn group_by_category(
    data: &Dataset,
    stage: &'static str,
) -> Result<Vec<(String, Vec<usize>)>, PipelineError> {
    match data.column(CATEGORY_COL).map(|c| c.kind()) {
        Some(ColumnKind::Numeric) => {
            let keys = data.numeric(CATEGORY_COL, stage)?;
            Ok(group_by_number(&keys)
                .into_iter()
                .map(|(key, rows)| (key.to_string(), rows))
                .collect())
        }
        _ => Ok(group_by_label(&data.labels(CATEGORY_COL, stage)?)),
    }
}

/// Row indices per distinct key, keys ascending. Missing keys are skipped.
fn group_by_number(keys: &[Option<f64>]) -> Vec<(f64, Vec<usize>)> {
    let mut indexed: Vec<(f64, usize)> = keys
        .iter()
        .enumerate()
        .filter_map(|(idx, key)| key.map(|k| (k, idx)))
        .collect();
    indexed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut groups: Vec<(f64, Vec<usize>)> = Vec::new();
    for (key, idx) in indexed {
        match groups.last_mut() {
            Some((last, rows)) if *last == key => rows.push(idx),
            _ => groups.push((key, vec![idx])),
        }
    }
    groups
}

/// Row indices per distinct label, labels in lexical order. Missing labels are skipped.
fn group_by_label(labels: &[Option<String>]) -> Vec<(String, Vec<usize>)> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, label) in labels.iter().enumerate() {
        if let Some(label) = label {
            groups.entry(label.as_str()).or_default().push(idx);
        }
    }
    groups
        .into_iter()
        .map(|(label, rows)| (label.to_string(), rows))
        .collect()
}

/// Mean over the selected rows, ignoring missing cells
fn mean_of(values: &[Option<f64>], rows: &[usize]) -> Option<f64> {
    let (sum, count) = rows
        .iter()
        .filter_map(|&idx| values[idx])
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Pearson coefficient over rows where both sides are present
fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    if r.is_finite() {
        Some(r.clamp(-1.0, 1.0))
    } else {
        None
    }
}

/// Order values ascending (or descending), missing values last
fn cmp_missing_last(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let ord = x.total_cmp(&y);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
