//! Asset creation request body.

use serde::Serialize;

use super::manifest::AssetRecord;

/// Body of a cloud-backed image asset creation request.
///
/// Built fresh for every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub gcs_location: GcsLocation,
    pub properties: AssetProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GcsLocation {
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssetProperties {
    pub row: u64,
    pub col: u64,
}

impl AssetRequest {
    pub fn image(record: &AssetRecord) -> Self {
        Self {
            kind: "IMAGE".to_string(),
            gcs_location: GcsLocation {
                uris: vec![record.uri.clone()],
            },
            properties: AssetProperties {
                row: record.row,
                col: record.col,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json() {
        let record = AssetRecord {
            name: "t078095_cog".to_string(),
            uri: "gs://b/078/t078095_cog.tif".to_string(),
            row: 78,
            col: 95,
        };
        let value = serde_json::to_value(AssetRequest::image(&record)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "IMAGE",
                "gcs_location": { "uris": ["gs://b/078/t078095_cog.tif"] },
                "properties": { "row": 78, "col": 95 }
            })
        );
    }

    #[test]
    fn test_requests_are_independent() {
        let a = AssetRecord {
            name: "a".to_string(),
            uri: "gs://b/001/a.tif".to_string(),
            row: 1,
            col: 1,
        };
        let b = AssetRecord {
            name: "b".to_string(),
            uri: "gs://b/001/b.tif".to_string(),
            row: 1,
            col: 2,
        };

        let first = AssetRequest::image(&a);
        let second = AssetRequest::image(&b);
        assert_eq!(first.gcs_location.uris, vec!["gs://b/001/a.tif"]);
        assert_eq!(first.properties.col, 1);
        assert_eq!(second.properties.col, 2);
    }
}
