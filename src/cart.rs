//! Cart normalization: raw cart JSON -> grouped, priced line items.
//!
//! The cart arrives as a loose JSON object keyed by store id. Malformed
//! entries are dropped, never fatal; a group that ends up with zero kept
//! items is excluded entirely.

use serde_json::Value;

pub const FALLBACK_ITEM_NAME: &str = "未知菜品";
pub const FALLBACK_STORE_NAME: &str = "店铺";

/// One kept cart line after normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    /// Empty string when the item carries no note.
    pub note: String,
}

impl Line {
    pub fn total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// One store's kept items plus their subtotal. Transient, lives for one
/// render call.
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub store_name: String,
    pub items: Vec<Line>,
    pub subtotal: f64,
}

/// Build the grouped structure from a raw cart object.
///
/// One output entry per input key, in the object's iteration order. Keys
/// whose entry is missing, whose `items` is not an array, or whose items all
/// fail the filter produce no group.
pub fn normalize(cart: &Value) -> Vec<Group> {
    let Some(stores) = cart.as_object() else {
        return Vec::new();
    };

    let mut groups = Vec::new();
    for entry in stores.values() {
        let Some(items) = entry.get("items").and_then(Value::as_array) else {
            continue;
        };

        let kept: Vec<Line> = items.iter().filter_map(normalize_line).collect();
        if kept.is_empty() {
            continue;
        }

        let subtotal = kept.iter().map(Line::total).sum();
        groups.push(Group {
            store_name: store_name(entry),
            items: kept,
            subtotal,
        });
    }
    groups
}

/// Sum of subtotals across all normalized groups.
pub fn grand_total(groups: &[Group]) -> f64 {
    groups.iter().map(|g| g.subtotal).sum()
}

fn normalize_line(item: &Value) -> Option<Line> {
    // Kept iff price is a JSON number > 0 and quantity a JSON number >= 1.
    let price = item.get("price")?.as_f64()?;
    let quantity = item.get("quantity")?.as_f64()?;
    if !(price > 0.0) || quantity < 1.0 {
        return None;
    }

    // Truthiness, not just presence: a name of 0, false or "" falls back to
    // the placeholder, while true or 123 is stringified.
    let name = match item.get("name") {
        Some(v) if is_truthy(v) => stringify(v),
        _ => FALLBACK_ITEM_NAME.to_string(),
    };
    let note = match item.get("note") {
        Some(v) if is_truthy(v) => stringify(v),
        _ => String::new(),
    };

    Some(Line {
        name,
        price,
        quantity: quantity as u32,
        note,
    })
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// JS-style string coercion for the scalar values a cart realistically
/// carries.
fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(a) => a.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn store_name(entry: &Value) -> String {
    entry
        .get("storeInfo")
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_STORE_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_valid_lines_and_drops_the_rest() {
        let cart = json!({
            "s1": {
                "storeInfo": { "name": "Noodle House" },
                "items": [
                    { "name": "Beef Noodles", "price": 22, "quantity": 2 },
                    { "name": "Bad Item", "price": 0, "quantity": 1 },
                    { "name": "No Qty", "price": 5, "quantity": 0 },
                    { "name": "String Price", "price": "9", "quantity": 1 },
                ]
            }
        });
        let groups = normalize(&cart);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].store_name, "Noodle House");
        assert_eq!(groups[0].items.len(), 1);
        assert_eq!(groups[0].items[0].name, "Beef Noodles");
        assert_eq!(groups[0].subtotal, 44.0);
        assert_eq!(grand_total(&groups), 44.0);
    }

    #[test]
    fn skips_empty_and_malformed_store_entries() {
        let cart = json!({
            "a": { "items": [] },
            "b": { "items": "nope" },
            "c": {},
            "d": null,
            "e": { "items": [ { "price": -3, "quantity": 2 } ] },
        });
        assert!(normalize(&cart).is_empty());
    }

    #[test]
    fn non_object_cart_yields_no_groups() {
        assert!(normalize(&json!([1, 2, 3])).is_empty());
        assert!(normalize(&json!("cart")).is_empty());
        assert!(normalize(&json!(null)).is_empty());
    }

    #[test]
    fn name_and_note_defaults() {
        let cart = json!({
            "s": { "items": [
                { "price": 10, "quantity": 1 },
                { "name": "", "price": 1, "quantity": 1, "note": "less spicy" },
            ] }
        });
        let groups = normalize(&cart);
        assert_eq!(groups[0].store_name, FALLBACK_STORE_NAME);
        assert_eq!(groups[0].items[0].name, FALLBACK_ITEM_NAME);
        assert_eq!(groups[0].items[0].note, "");
        assert_eq!(groups[0].items[1].name, FALLBACK_ITEM_NAME);
        assert_eq!(groups[0].items[1].note, "less spicy");
    }

    #[test]
    fn falsy_names_fall_back_and_truthy_scalars_are_stringified() {
        let cart = json!({
            "s": { "items": [
                { "name": 0, "price": 1, "quantity": 1, "note": 0 },
                { "name": false, "price": 1, "quantity": 1, "note": false },
                { "name": null, "price": 1, "quantity": 1, "note": null },
                { "name": true, "price": 1, "quantity": 1, "note": true },
                { "name": 123, "price": 1, "quantity": 1, "note": 123 },
            ] }
        });
        let items = &normalize(&cart)[0].items;
        // 0, false and null are falsy: placeholder name, empty note.
        assert_eq!(items[0].name, FALLBACK_ITEM_NAME);
        assert_eq!(items[0].note, "");
        assert_eq!(items[1].name, FALLBACK_ITEM_NAME);
        assert_eq!(items[1].note, "");
        assert_eq!(items[2].name, FALLBACK_ITEM_NAME);
        assert_eq!(items[2].note, "");
        // Truthy non-strings keep their string form.
        assert_eq!(items[3].name, "true");
        assert_eq!(items[3].note, "true");
        assert_eq!(items[4].name, "123");
        assert_eq!(items[4].note, "123");
    }

    #[test]
    fn subtotal_ignores_dropped_items() {
        let cart = json!({
            "s": { "items": [
                { "name": "a", "price": 3.5, "quantity": 2 },
                { "name": "b", "price": 100, "quantity": "2" },
                { "name": "c", "price": 1, "quantity": 3 },
            ] }
        });
        let groups = normalize(&cart);
        assert_eq!(groups[0].subtotal, 3.5 * 2.0 + 3.0);
    }

    #[test]
    fn normalization_is_idempotent() {
        let cart = json!({
            "s1": { "storeInfo": { "name": "A" }, "items": [
                { "name": "x", "price": 2, "quantity": 1, "note": "n" },
                { "name": "y", "price": 4.5, "quantity": 3 },
            ] },
            "s2": { "items": [ { "name": "z", "price": 1, "quantity": 1 } ] },
        });
        let once = normalize(&cart);

        // Re-encode the normalized structure as a cart and normalize again.
        let mut reencoded = serde_json::Map::new();
        for (i, g) in once.iter().enumerate() {
            let items: Vec<Value> = g
                .items
                .iter()
                .map(|l| {
                    json!({
                        "name": l.name,
                        "price": l.price,
                        "quantity": l.quantity,
                        "note": l.note,
                    })
                })
                .collect();
            reencoded.insert(
                format!("k{i}"),
                json!({ "storeInfo": { "name": g.store_name }, "items": items }),
            );
        }
        let twice = normalize(&Value::Object(reencoded));
        // Note: empty note strings survive the round trip as empty strings.
        assert_eq!(once, twice);
    }

    #[test]
    fn one_group_per_input_key_in_map_order() {
        let cart = json!({
            "b": { "items": [ { "name": "2", "price": 1, "quantity": 1 } ] },
            "a": { "items": [ { "name": "1", "price": 1, "quantity": 1 } ] },
        });
        let g1 = normalize(&cart);
        let g2 = normalize(&cart);
        assert_eq!(g1.len(), 2);
        // Deterministic across calls, no shuffling.
        assert_eq!(g1, g2);
    }

    #[test]
    fn fractional_quantity_is_floored() {
        let cart = json!({
            "s": { "items": [ { "name": "a", "price": 10, "quantity": 2.9 } ] }
        });
        let groups = normalize(&cart);
        assert_eq!(groups[0].items[0].quantity, 2);
        assert_eq!(groups[0].subtotal, 20.0);
    }
}
