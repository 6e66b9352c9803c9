use super::client::PostmanClient;
use super::merge::update_postman_collection;
use super::SyncError;
use crate::registry::{ApiRouter, RouterRegistry};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// What a sync did to the remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The merged document equals the fetched one; nothing was written
    Unchanged,
    /// The merged document was written back
    Updated,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Unchanged => f.write_str("unchanged"),
            SyncOutcome::Updated => f.write_str("updated"),
        }
    }
}

/// Result of syncing one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub collection_uid: String,
    /// Routers merged into the collection, in merge order
    pub routers: Vec<String>,
    pub result: Result<SyncOutcome, SyncError>,
}

/// Fetch, merge every router in `routers`, write back when changed.
///
/// The comparison is between the fetched document and the merged document,
/// both serialized the same way, so formatting differences of the remote
/// body alone never trigger a write.
pub fn sync_collection(
    client: &PostmanClient,
    uid: &str,
    api_key: &str,
    routers: &[&ApiRouter],
) -> Result<SyncOutcome, SyncError> {
    let raw = client.fetch_collection(uid, api_key)?;
    let mut doc: Value = serde_json::from_str(&raw).map_err(|e| SyncError::Decode {
        uid: uid.to_string(),
        reason: e.to_string(),
    })?;
    let before = doc.to_string();

    for router in routers {
        update_postman_collection(router, &mut doc)?;
    }

    let after = doc.to_string();
    if before == after {
        info!(collection_uid = %uid, "Collection up to date; skipping write");
        return Ok(SyncOutcome::Unchanged);
    }
    client.put_collection(uid, api_key, after)?;
    info!(collection_uid = %uid, routers = routers.len(), "Collection updated");
    Ok(SyncOutcome::Updated)
}

/// Sync one router into its own collection.
pub fn update_postman(router: &ApiRouter, client: &PostmanClient) -> Result<SyncOutcome, SyncError> {
    let postman = router.postman().ok_or_else(|| SyncError::NotConfigured {
        router: router.name().to_string(),
    })?;
    let result = sync_collection(client, &postman.collection_uid, &postman.api_key, &[router]);
    if let Err(e) = &result {
        error!(
            router = %router.name(),
            collection_uid = %postman.collection_uid,
            error = %e,
            "Collection sync failed"
        );
    }
    result
}

/// Sync every configured router of `registry`.
///
/// Routers sharing a collection uid are merged into one fetched document and
/// written once, using the first router's api key. Distinct collections are
/// synced concurrently. Concurrent writers to the same collection from other
/// processes are not detected; the last write wins.
#[must_use]
pub fn update_all_collections(registry: &RouterRegistry, client: &PostmanClient) -> Vec<SyncReport> {
    let mut groups: BTreeMap<String, Vec<Arc<ApiRouter>>> = BTreeMap::new();
    for router in registry.routers() {
        if let Some(postman) = router.postman() {
            groups
                .entry(postman.collection_uid.clone())
                .or_default()
                .push(Arc::clone(&router));
        }
    }
    sync_groups(client, groups)
}

fn sync_groups(
    client: &PostmanClient,
    groups: BTreeMap<String, Vec<Arc<ApiRouter>>>,
) -> Vec<SyncReport> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = groups
            .iter()
            .map(|(uid, routers)| {
                let handle = scope.spawn(move || {
                    let api_key = routers
                        .iter()
                        .find_map(|r| r.postman().map(|p| p.api_key.as_str()))
                        .unwrap_or_default();
                    let refs: Vec<&ApiRouter> = routers.iter().map(AsRef::as_ref).collect();
                    sync_collection(client, uid, api_key, &refs)
                });
                (uid, routers, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(uid, routers, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(SyncError::Transport {
                        uid: uid.clone(),
                        reason: "sync worker panicked".to_string(),
                    })
                });
                if let Err(e) = &result {
                    error!(collection_uid = %uid, error = %e, "Collection sync failed");
                }
                SyncReport {
                    collection_uid: uid.clone(),
                    routers: routers.iter().map(|r| r.name().to_string()).collect(),
                    result,
                }
            })
            .collect()
    })
}

/// Sync the router called `target`, or every router for `"*"`.
pub fn sync_named(
    registry: &RouterRegistry,
    client: &PostmanClient,
    target: &str,
) -> Result<Vec<SyncReport>, SyncError> {
    if target == "*" {
        return Ok(update_all_collections(registry, client));
    }
    let router = registry.get(target).ok_or_else(|| SyncError::UnknownRouter {
        name: target.to_string(),
    })?;
    let postman = router.postman().ok_or_else(|| SyncError::NotConfigured {
        router: router.name().to_string(),
    })?;
    Ok(vec![SyncReport {
        collection_uid: postman.collection_uid.clone(),
        routers: vec![router.name().to_string()],
        result: update_postman(&router, client),
    }])
}
