//! Typed records for FindQC API responses
//!
//! The upstream wraps every payload in a `{"data": ...}` envelope and is
//! loose about field presence, so everything interesting is optional and
//! decoded exactly once at the client boundary. Unknown fields are ignored.

use serde::{Deserialize, Deserializer};

/// One page of `/goods/getCategoryProducts`.
#[derive(Debug, Clone, Default)]
pub struct CategoryPage {
    /// Product summaries on this page.
    pub items: Vec<ListingItem>,
    /// Advisory flag; only authoritative for the page-1-empty short circuit.
    pub has_more: bool,
}

/// Product summary as it appears in the category listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItem {
    /// Upstream primary identity (`findqc_id`).
    pub id: Option<i64>,
    pub item_id: Option<String>,
    pub mall_type: Option<String>,
}

/// Decoded `/goods/detail` payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodsDetail {
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub pic_list: Vec<String>,
    #[serde(default)]
    pub props_list: Vec<PropEntry>,
    #[serde(default)]
    pub qc_list: Vec<QcEntry>,
}

/// One property group in the detail's option tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropEntry {
    #[serde(default)]
    pub option_list: Vec<PropOption>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropOption {
    pub pic_url: Option<String>,
}

/// One QC photo reference, shared by detail and atlas payloads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QcEntry {
    pub url: Option<String>,
    /// Epoch timestamp; unit (seconds vs milliseconds) is resolved during
    /// normalization.
    pub time: Option<i64>,
}

/// One page of `/goods/atlas`.
#[derive(Debug, Clone, Default)]
pub struct AtlasPage {
    pub atlas_items: Vec<AtlasItem>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtlasItem {
    #[serde(default)]
    pub qc_list: Vec<QcEntry>,
}

// Raw envelope shapes; public response types above are extracted from these
// by the client so callers never see the nesting.

#[derive(Debug, Deserialize)]
pub(crate) struct ListEnvelope {
    #[serde(default)]
    pub data: ListData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListData {
    #[serde(default)]
    pub data: Vec<ListingItem>,
    #[serde(default)]
    pub has_more: bool,
}

impl From<ListEnvelope> for CategoryPage {
    fn from(env: ListEnvelope) -> Self {
        CategoryPage { items: env.data.data, has_more: env.data.has_more }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailEnvelope {
    #[serde(default)]
    pub data: DetailData,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DetailData {
    #[serde(default)]
    pub data: GoodsDetail,
}

impl From<DetailEnvelope> for GoodsDetail {
    fn from(env: DetailEnvelope) -> Self {
        env.data.data
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AtlasEnvelope {
    #[serde(default)]
    pub data: AtlasData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AtlasData {
    #[serde(default)]
    pub atlas_list: Vec<AtlasItem>,
    #[serde(default)]
    pub has_more: bool,
}

impl From<AtlasEnvelope> for AtlasPage {
    fn from(env: AtlasEnvelope) -> Self {
        AtlasPage { atlas_items: env.data.atlas_list, has_more: env.data.has_more }
    }
}

/// The upstream sends price as either a JSON string or a bare number.
/// Keep the raw textual representation either way; never parse to a float.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Weight arrives as a number or a numeric string; anything unparsable is
/// treated as absent.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_listing_envelope() {
        let raw = r#"{"data":{"data":[{"id":1001,"itemId":"i-1","mallType":"taobao"}],"hasMore":true}}"#;
        let page: CategoryPage = serde_json::from_str::<ListEnvelope>(raw).unwrap().into();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, Some(1001));
        assert!(page.has_more);
    }

    #[test]
    fn decodes_detail_with_numeric_price_and_string_weight() {
        let raw = r#"{"data":{"data":{
            "price": 19.90,
            "weight": "0.35",
            "picList": ["https://img/main.jpg"],
            "propsList": [{"optionList":[{"picUrl":"https://img/sku.jpg"},{"picUrl":null}]}],
            "qcList": [{"url":"https://img/qc.jpg","time":1700000000}]
        }}}"#;
        let detail: GoodsDetail = serde_json::from_str::<DetailEnvelope>(raw).unwrap().into();
        assert_eq!(detail.price.as_deref(), Some("19.9"));
        assert_eq!(detail.weight, Some(0.35));
        assert_eq!(detail.pic_list.len(), 1);
        assert_eq!(detail.props_list[0].option_list[0].pic_url.as_deref(), Some("https://img/sku.jpg"));
        assert_eq!(detail.qc_list[0].time, Some(1700000000));
    }

    #[test]
    fn decodes_string_price_verbatim() {
        let raw = r#"{"data":{"data":{"price":"¥128.00"}}}"#;
        let detail: GoodsDetail = serde_json::from_str::<DetailEnvelope>(raw).unwrap().into();
        assert_eq!(detail.price.as_deref(), Some("¥128.00"));
    }

    #[test]
    fn decodes_atlas_envelope_with_missing_fields() {
        let raw = r#"{"data":{"atlasList":[{"qcList":[{"url":"https://img/a.jpg","time":1700000000000}]},{}],"hasMore":false}}"#;
        let page: AtlasPage = serde_json::from_str::<AtlasEnvelope>(raw).unwrap().into();
        assert_eq!(page.atlas_items.len(), 2);
        assert_eq!(page.atlas_items[0].qc_list[0].time, Some(1700000000000));
        assert!(page.atlas_items[1].qc_list.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn tolerates_empty_envelope() {
        let page: CategoryPage = serde_json::from_str::<ListEnvelope>(r#"{"data":{}}"#).unwrap().into();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }
}
