//! The bean model of the container service.
//!
//! Beans are opaque records emitted by the container backend. The JSON
//! field names are fixed by the wire schema and shared with the HTTP
//! payloads: beans travel grouped in a sections object
//! `{"alias":[...],"header":[...],"content":[...],"chunk":[...]}` and
//! are rendered back grouped under `aliases`/`headers`/`contents`/
//! `chunks`.

use gridgate_core::{GridError, GridResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasBean {
    pub name: String,
    #[serde(rename = "ver", default)]
    pub version: i64,
    #[serde(default)]
    pub ctime: i64,
    #[serde(default)]
    pub system_metadata: String,
    /// Hex content-header id.
    #[serde(default)]
    pub header: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderBean {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub size: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBean {
    #[serde(rename = "hdr", default)]
    pub header: String,
    #[serde(default)]
    pub chunk: String,
    #[serde(rename = "pos", default)]
    pub position: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkBean {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub size: i64,
}

/// One container-service record.
#[derive(Debug, Clone, PartialEq)]
pub enum Bean {
    Alias(AliasBean),
    Header(HeaderBean),
    Content(ContentBean),
    Chunk(ChunkBean),
}

impl Bean {
    pub fn kind(&self) -> &'static str {
        match self {
            Bean::Alias(_) => "alias",
            Bean::Header(_) => "header",
            Bean::Content(_) => "content",
            Bean::Chunk(_) => "chunk",
        }
    }
}

fn collect<T: Serialize>(items: Vec<&T>) -> Value {
    Value::Array(
        items
            .into_iter()
            .map(|b| serde_json::to_value(b).expect("bean serialization"))
            .collect(),
    )
}

/// Groups beans into the four output arrays, in wire order.
pub fn dump_sections(beans: &[Bean]) -> Map<String, Value> {
    let mut aliases = Vec::new();
    let mut headers = Vec::new();
    let mut contents = Vec::new();
    let mut chunks = Vec::new();
    for bean in beans {
        match bean {
            Bean::Alias(b) => aliases.push(b),
            Bean::Header(b) => headers.push(b),
            Bean::Content(b) => contents.push(b),
            Bean::Chunk(b) => chunks.push(b),
        }
    }
    let mut out = Map::new();
    out.insert("aliases".into(), collect(aliases));
    out.insert("headers".into(), collect(headers));
    out.insert("contents".into(), collect(contents));
    out.insert("chunks".into(), collect(chunks));
    out
}

fn decode_array<T>(section: &str, v: &Value, wrap: fn(T) -> Bean, out: &mut Vec<Bean>) -> GridResult<()>
where
    T: for<'de> Deserialize<'de>,
{
    let items = v
        .as_array()
        .ok_or_else(|| GridError::bad_request(format!("Section {} is not an array", section)))?;
    for item in items {
        let bean: T = serde_json::from_value(item.clone())
            .map_err(|e| GridError::bad_request(format!("Invalid {} bean: {}", section, e)))?;
        out.push(wrap(bean));
    }
    Ok(())
}

/// Decodes a sections object (`alias`/`header`/`content`/`chunk` keys,
/// each an array of beans). Absent sections are fine.
pub fn decode_sections(sections: &Value) -> GridResult<Vec<Bean>> {
    let obj = sections
        .as_object()
        .ok_or_else(|| GridError::bad_request("Bean sections is not a JSON object"))?;
    let mut out = Vec::new();
    if let Some(v) = obj.get("alias") {
        decode_array("alias", v, Bean::Alias, &mut out)?;
    }
    if let Some(v) = obj.get("header") {
        decode_array("header", v, Bean::Header, &mut out)?;
    }
    if let Some(v) = obj.get("content") {
        decode_array("content", v, Bean::Content, &mut out)?;
    }
    if let Some(v) = obj.get("chunk") {
        decode_array("chunk", v, Bean::Chunk, &mut out)?;
    }
    Ok(out)
}

/// Reads the named sections object out of a request body.
pub fn section_from_body(body: &Value, key: &str) -> GridResult<Vec<Bean>> {
    let obj = body
        .as_object()
        .ok_or_else(|| GridError::bad_request("Body is not a valid JSON object"))?;
    let section = obj
        .get(key)
        .ok_or_else(|| GridError::bad_request(format!("Section {} not found in JSON body", key)))?;
    if !section.is_object() {
        return Err(GridError::bad_request(format!(
            "Section {} from body is not a JSON object",
            key
        )));
    }
    decode_sections(section)
}

/// Serializes beans back into a sections object for the wire.
pub fn beans_to_sections(beans: &[Bean]) -> Value {
    let mut alias = Vec::new();
    let mut header = Vec::new();
    let mut content = Vec::new();
    let mut chunk = Vec::new();
    for bean in beans {
        match bean {
            Bean::Alias(b) => alias.push(serde_json::to_value(b).expect("bean serialization")),
            Bean::Header(b) => header.push(serde_json::to_value(b).expect("bean serialization")),
            Bean::Content(b) => content.push(serde_json::to_value(b).expect("bean serialization")),
            Bean::Chunk(b) => chunk.push(serde_json::to_value(b).expect("bean serialization")),
        }
    }
    serde_json::json!({
        "alias": alias,
        "header": header,
        "content": content,
        "chunk": chunk,
    })
}
