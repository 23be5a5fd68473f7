//! Amount predicate and key extraction
//!
//! First two stages of the pipeline: drop sales at or below the
//! configured amount, then project survivors to their aggregation key
//! and a unit increment (the pipeline counts occurrences, not sums).

use super::error::PipelineError;
use super::types::SaleEvent;

/// Unit increment paired with the aggregation key.
pub const UNIT: u64 = 1;

/// Threshold predicate over the sale amount. Stateless and pure; only
/// sales strictly above the threshold qualify.
#[derive(Debug, Clone, Copy)]
pub struct AmountFilter {
    threshold: f64,
}

impl AmountFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn passes(&self, event: &SaleEvent) -> bool {
        event.amount > self.threshold
    }
}

/// Project a qualifying event to `(product, unit)`.
///
/// Rejects only events without a product key; the caller drops those,
/// bumps the diagnostic counter, and keeps going.
pub fn rekey(event: &SaleEvent) -> Result<(&str, u64), PipelineError> {
    if event.product.is_empty() {
        return Err(PipelineError::MalformedEvent(format!(
            "event at t={}ms has no product key (customer: {:?})",
            event.timestamp_ms, event.customer
        )));
    }
    Ok((&event.product, UNIT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_sale(product: &str, amount: f64) -> SaleEvent {
        SaleEvent {
            product: product.to_string(),
            customer: "C1".to_string(),
            timestamp_ms: 1_000,
            amount,
        }
    }

    #[test]
    fn test_filter_threshold_is_strict() {
        // Test: amount must be strictly above the threshold
        let filter = AmountFilter::new(100.0);

        assert!(filter.passes(&make_sale("Laptop", 150.0)));
        assert!(!filter.passes(&make_sale("Laptop", 100.0))); // equal fails
        assert!(!filter.passes(&make_sale("Phone", 50.0)));
    }

    #[test]
    fn test_rekey_yields_product_and_unit() {
        let event = make_sale("Laptop", 150.0);
        let (key, value) = rekey(&event).unwrap();

        assert_eq!(key, "Laptop");
        assert_eq!(value, UNIT);
    }

    #[test]
    fn test_rekey_rejects_empty_product() {
        let event = make_sale("", 150.0);
        let err = rekey(&event).unwrap_err();

        assert!(matches!(err, PipelineError::MalformedEvent(_)));
    }
}
