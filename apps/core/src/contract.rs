use serde::{Deserialize, Serialize};

use crate::model::ResultMeta;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InitialSearchRequest {
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubSearchRequest {
    #[serde(default)]
    pub previous: Vec<String>,
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolveMetasRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivateRequest {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultSetResponse {
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultMetaDto {
    pub id: String,
    pub name: String,
    pub icon_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetasResponse {
    pub metas: Vec<ResultMetaDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivateResponse {
    pub activated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum CoreRequest {
    InitialSearch(InitialSearchRequest),
    SubSearch(SubSearchRequest),
    ResolveMetas(ResolveMetasRequest),
    Activate(ActivateRequest),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum CoreResponse {
    ResultSet(ResultSetResponse),
    Metas(MetasResponse),
    Activate(ActivateResponse),
}

impl From<ResultMeta> for ResultMetaDto {
    fn from(value: ResultMeta) -> Self {
        Self {
            id: value.id,
            name: value.name,
            icon_path: value
                .icon_path
                .map(|path| path.to_string_lossy().into_owned()),
        }
    }
}
