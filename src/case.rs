//! Name conversions: entity names (CamelCase) -> table names (snake_case), plus display plurals.

/// Convert an entity identifier from CamelCase to snake_case.
/// e.g. "CommodityType" -> "commodity_type", "TrxnType" -> "trxn_type"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// English plural for summaries only; never used to build identifiers.
pub fn plural(word: &str) -> String {
    match word.strip_suffix('y') {
        Some(stem) => format!("{}ies", stem),
        None => format!("{}s", word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_from_entity_names() {
        assert_eq!(to_snake_case("Commodity"), "commodity");
        assert_eq!(to_snake_case("CommodityType"), "commodity_type");
        assert_eq!(to_snake_case("DataSource"), "data_source");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn plural_handles_trailing_y() {
        assert_eq!(plural("Company"), "Companies");
        assert_eq!(plural("Commodity"), "Commodities");
        assert_eq!(plural("Price"), "Prices");
    }
}
