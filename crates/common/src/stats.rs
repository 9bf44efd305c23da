//! Descriptive statistics over a finished crawl's item set
//!
//! The crawl backend delivers one row per catalog item; this module turns
//! that list into the numbers quoted in the summary message and the report
//! export. Construction fails on an empty set so callers can surface the
//! "invalid or empty category" message instead of a zero-filled report.

use crate::crawl::ItemRecord;
use crate::errors::{AppError, Result};

/// Aggregated category statistics
#[derive(Debug, Clone)]
pub struct CategoryStats {
    items: Vec<ItemRecord>,
}

impl CategoryStats {
    /// Build stats from the scraped item list.
    ///
    /// Returns [`AppError::EmptyDataset`] when no usable rows are present.
    pub fn from_items(items: Vec<ItemRecord>) -> Result<Self> {
        if items.is_empty() {
            return Err(AppError::EmptyDataset);
        }
        Ok(Self { items })
    }

    /// The scraped rows, in crawl order
    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    /// Category display name, taken from the first scraped row
    pub fn category_name(&self) -> &str {
        &self.items[0].category_name
    }

    /// Category URL, taken from the first scraped row
    pub fn category_url(&self) -> &str {
        &self.items[0].category_url
    }

    pub fn goods_count(&self) -> usize {
        self.items.len()
    }

    pub fn purchases_sum(&self) -> f64 {
        self.items.iter().map(|i| i.purchases).sum()
    }

    pub fn purchases_mean(&self) -> f64 {
        self.purchases_sum() / self.items.len() as f64
    }

    pub fn purchases_median(&self) -> f64 {
        median(self.items.iter().map(|i| i.purchases))
    }

    pub fn turnover_sum(&self) -> f64 {
        self.items.iter().map(ItemRecord::turnover).sum()
    }

    pub fn turnover_mean(&self) -> f64 {
        self.turnover_sum() / self.items.len() as f64
    }

    pub fn turnover_median(&self) -> f64 {
        median(self.items.iter().map(ItemRecord::turnover))
    }

    pub fn price_mean(&self) -> f64 {
        self.items.iter().map(|i| i.price).sum::<f64>() / self.items.len() as f64
    }

    pub fn price_max(&self) -> f64 {
        self.items.iter().map(|i| i.price).fold(f64::MIN, f64::max)
    }
}

fn median(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, price: f64, purchases: f64) -> ItemRecord {
        ItemRecord {
            name: name.to_string(),
            url: format!("https://www.wildberries.ru/catalog/{}/detail.aspx", name),
            category_name: "Книги и диски".to_string(),
            category_url: "https://www.wildberries.ru/catalog/knigi-i-diski".to_string(),
            price,
            purchases,
        }
    }

    #[test]
    fn test_empty_set_is_rejected() {
        assert!(matches!(
            CategoryStats::from_items(vec![]),
            Err(AppError::EmptyDataset)
        ));
    }

    #[test]
    fn test_basic_aggregates() {
        let stats = CategoryStats::from_items(vec![
            item("a", 1.0, 4.0),
            item("b", 2.0, 4.0),
            item("c", 3.0, 6.0),
        ])
        .unwrap();

        assert_eq!(stats.goods_count(), 3);
        assert_eq!(stats.purchases_sum(), 14.0);
        assert!((stats.purchases_mean() - 4.666_666).abs() < 1e-3);
        assert_eq!(stats.purchases_median(), 4.0);
        assert_eq!(stats.price_mean(), 2.0);
        assert_eq!(stats.price_max(), 3.0);
    }

    #[test]
    fn test_turnover_is_price_times_purchases() {
        let stats = CategoryStats::from_items(vec![item("a", 100.0, 3.0), item("b", 50.0, 2.0)]).unwrap();
        assert_eq!(stats.turnover_sum(), 400.0);
        assert_eq!(stats.turnover_mean(), 200.0);
    }

    #[test]
    fn test_even_count_median_averages_middles() {
        let stats = CategoryStats::from_items(vec![
            item("a", 1.0, 1.0),
            item("b", 1.0, 2.0),
            item("c", 1.0, 10.0),
            item("d", 1.0, 20.0),
        ])
        .unwrap();
        assert_eq!(stats.purchases_median(), 6.0);
    }

    #[test]
    fn test_single_item() {
        let stats = CategoryStats::from_items(vec![item("a", 760.0, 3250.0)]).unwrap();
        assert_eq!(stats.purchases_median(), 3250.0);
        assert_eq!(stats.category_name(), "Книги и диски");
    }
}
