// Permissive decoding for columns that hold Python-style JSON literals,
// e.g. "['drama', 'crime']".

use serde_json::Value;

use super::CellValue;

/// Swap single quotes for double quotes and parse as JSON.
/// Anything that is not text or does not parse becomes an empty list.
pub fn decode_permissive(cell: &CellValue) -> Value {
    match cell {
        CellValue::Text(raw) => {
            serde_json::from_str(&raw.replace('\'', "\"")).unwrap_or_else(|_| empty_list())
        }
        _ => empty_list(),
    }
}

fn empty_list() -> Value {
    Value::Array(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use serde_json::json;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_single_quoted_list() {
        assert_eq!(decode_permissive(&text("['a', 'b']")), json!(["a", "b"]));
    }

    #[test]
    fn test_not_json_falls_back() {
        assert_eq!(decode_permissive(&text("not json")), json!([]));
    }

    #[test]
    fn test_non_text_falls_back() {
        assert_eq!(decode_permissive(&CellValue::Integer(42)), json!([]));
        assert_eq!(decode_permissive(&CellValue::Null), json!([]));
    }

    #[test]
    fn test_objects_decode() {
        assert_eq!(
            decode_permissive(&text("{'id': 18, 'name': 'Drama'}")),
            json!({"id": 18, "name": "Drama"})
        );
    }

    #[test]
    fn test_apostrophes_break_decoding() {
        // "it's" becomes "it"s", which is not valid JSON
        assert_eq!(decode_permissive(&text("['it's']")), json!([]));
    }

    #[test]
    fn test_parse_json_column() {
        let csv = "title,genres\nAlien,\"['horror', 'sci-fi']\"\nHeat,oops\n";
        let dataset = Dataset::from_csv_bytes(csv.as_bytes()).unwrap();
        let decoded = dataset.parse_json_column("genres").unwrap();
        assert_eq!(decoded, vec![json!(["horror", "sci-fi"]), json!([])]);
        assert!(dataset.parse_json_column("missing").is_err());
    }
}
