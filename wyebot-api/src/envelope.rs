//! Unwrapping of the `{resource_key: {data: ...}}` response envelope.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::transport::Endpoint;

/// Field holding the payload inside most envelopes.
pub const DATA: &str = "data";

/// Decode `document[key][field]` into `T`.
///
/// A missing key, a missing field or an explicit `null` all yield
/// `T::default()`: the API does not guarantee its envelope shape across
/// resources. A value that is present but cannot be decoded into `T` is an
/// [`ApiError::Decode`].
pub fn unwrap<T>(endpoint: Endpoint, document: &Value, key: &str, field: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match document.get(key).and_then(|inner| inner.get(field)) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => T::deserialize(value)
            .map_err(|e| ApiError::decode(endpoint, format!("{key}.{field}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_present() {
        let doc = json!({ "location_details": { "data": [1, 2, 3] } });
        let data: Vec<u32> =
            unwrap(Endpoint::Locations, &doc, "location_details", DATA).unwrap();
        assert_eq!(data, vec![1, 2, 3]);
    }

    #[test]
    fn test_unwrap_missing_key_is_empty() {
        let doc = json!({ "something_else": {} });
        let data: Vec<u32> =
            unwrap(Endpoint::Locations, &doc, "location_details", DATA).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_unwrap_missing_data_is_empty() {
        let doc = json!({ "location_details": { "status": "ok" } });
        let data: Vec<u32> =
            unwrap(Endpoint::Locations, &doc, "location_details", DATA).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_unwrap_null_is_empty() {
        let doc = json!({ "location_details": { "data": null } });
        let data: Vec<u32> =
            unwrap(Endpoint::Locations, &doc, "location_details", DATA).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_unwrap_non_object_document_is_empty() {
        let doc = json!("maintenance");
        let data: Vec<u32> =
            unwrap(Endpoint::Locations, &doc, "location_details", DATA).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_unwrap_wrong_shape_is_error() {
        let doc = json!({ "location_details": { "data": "nope" } });
        let result: Result<Vec<u32>> = unwrap(Endpoint::Locations, &doc, "location_details", DATA);

        let err = result.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
        assert!(err.to_string().contains("location_details.data"));
    }
}
