use super::render::render_item;
use super::SyncError;
use crate::registry::ApiRouter;
use serde_json::Value;
use tracing::debug;

/// Counts reported by [`update_postman_collection`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub replaced: usize,
    pub appended: usize,
    pub hidden: usize,
}

/// Merge the router's visible endpoints into a collection document
/// `{ "collection": { "item": [..] } }`.
///
/// Items are matched by `name` among the top-level items. A match is replaced
/// in place; otherwise the new item is appended. Items the router does not
/// know about are left untouched.
pub fn update_postman_collection(
    router: &ApiRouter,
    doc: &mut Value,
) -> Result<MergeStats, SyncError> {
    let collection = doc
        .get_mut("collection")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| SyncError::Malformed {
            reason: "missing `collection` object".to_string(),
        })?;
    let items = collection
        .entry("item")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| SyncError::Malformed {
            reason: "`collection.item` is not an array".to_string(),
        })?;

    let mut stats = MergeStats::default();
    for endpoint in router.endpoints() {
        if endpoint.hidden {
            stats.hidden += 1;
            continue;
        }
        let position = items
            .iter()
            .position(|item| item.get("name").and_then(Value::as_str) == Some(endpoint.name.as_str()));
        match position {
            Some(at) => {
                let item = render_item(router, &endpoint, Some(&items[at]));
                items[at] = item;
                stats.replaced += 1;
            }
            None => {
                items.push(render_item(router, &endpoint, None));
                stats.appended += 1;
            }
        }
    }
    debug!(
        router = %router.name(),
        replaced = stats.replaced,
        appended = stats.appended,
        hidden = stats.hidden,
        "Collection merged"
    );
    Ok(stats)
}
