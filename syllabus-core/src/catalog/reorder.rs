use serde::Deserialize;

use crate::validation::{Validate, ValidationErrors, Validator};

/// Body of every `.../reorder` endpoint: `{"orders": [{"id": 4, "position": 0}]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReorderRequest {
    pub orders: Option<Vec<PositionUpdate>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PositionUpdate {
    pub id: Option<i64>,
    pub position: Option<i32>,
}

/// A validated `(id, position)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub id: i64,
    pub position: i32,
}

impl Validate for ReorderRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        match &self.orders {
            None => v.fail("orders", "The orders field is required."),
            Some(orders) if orders.is_empty() => {
                v.fail("orders", "The orders must have at least 1 items.")
            }
            Some(orders) => {
                for (index, order) in orders.iter().enumerate() {
                    let mut item = Validator::new();
                    item.required("id", order.id.as_ref());
                    item.required("position", order.position.as_ref());
                    item.min("position", order.position, 0);
                    v.nest(&format!("orders.{index}"), item.finish());
                }
            }
        }
        v.finish()
    }
}

impl ReorderRequest {
    /// Validated placements in request order.
    pub fn placements(&self) -> Result<Vec<Placement>, ValidationErrors> {
        self.validate()?;
        Ok(self
            .orders
            .iter()
            .flatten()
            .filter_map(|order| {
                Some(Placement {
                    id: order.id?,
                    position: order.position?,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn orders_are_required_and_checked_per_item() {
        let empty: ReorderRequest = serde_json::from_value(json!({})).unwrap();
        assert!(empty.validate().unwrap_err().contains("orders"));

        let bad: ReorderRequest = serde_json::from_value(json!({
            "orders": [{"id": 1, "position": 0}, {"position": -2}]
        }))
        .unwrap();
        let errors = bad.validate().unwrap_err();
        assert!(errors.contains("orders.1.id"));
        assert!(errors.contains("orders.1.position"));
        assert!(!errors.contains("orders.0.id"));
    }

    #[test]
    fn placements_preserve_order() {
        let request: ReorderRequest = serde_json::from_value(json!({
            "orders": [{"id": 9, "position": 2}, {"id": 4, "position": 0}]
        }))
        .unwrap();
        assert_eq!(
            request.placements().unwrap(),
            vec![
                Placement { id: 9, position: 2 },
                Placement { id: 4, position: 0 }
            ]
        );
    }
}
