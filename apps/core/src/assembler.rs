use crate::icon_store::IconStore;
use crate::model::{parse_result_id, ResultMeta};

/// Builds display metadata for each result id, in input order, one record
/// per id.
///
/// An id that does not parse keeps the text before its first colon as the
/// name and gets no icon. An icon that cannot be resolved leaves
/// `icon_path` empty for that row only.
pub fn assemble_metas(ids: &[String], icons: &IconStore) -> Vec<ResultMeta> {
    ids.iter()
        .map(|id| {
            let Some(parsed) = parse_result_id(id) else {
                log::warn!("malformed result id '{id}'; returning it without an icon");
                let name = id.split_once(':').map_or(id.as_str(), |(name, _)| name);
                return ResultMeta {
                    id: id.clone(),
                    name: name.to_string(),
                    icon_path: None,
                };
            };

            let icon_path = if parsed.icon_token.is_empty() {
                None
            } else {
                match icons.resolve(parsed.icon_token) {
                    Ok(path) => Some(path),
                    Err(error) => {
                        log::warn!("icon for '{}' unavailable: {error}", parsed.name);
                        None
                    }
                }
            };

            ResultMeta {
                id: id.clone(),
                name: parsed.name.to_string(),
                icon_path,
            }
        })
        .collect()
}
