//! Namespace Controller
//!
//! Implements the namespace lifecycle on top of the engine gateway:
//! - Create / Delete: registry-authoritative, serialized per name
//! - List / Get: engine-authoritative for existence
//! - Stats: registry resolves the volume, engine supplies the counters
//!
//! Registry and engine are reconciled only while a request runs.

use crate::controlplane::metrics::ControllerMetrics;
use crate::domain::model::{
    CreateNamespaceRequest, DeleteNamespaceRequest, GetNamespaceRequest, ListNamespacesRequest,
    ListNamespacesResponse, Namespace, NamespaceSpec, NamespaceStatsRequest,
    NamespaceStatsResponse, NamespaceStatus, Subsystem, UpdateNamespaceRequest, VolumeStats,
};
use crate::domain::ports::{
    commands, AttachParams, DetachParams, EngineGatewayRef, ListParams, NamespaceStoreRef,
    SubsystemDirectoryRef, DEFAULT_BDEV_TYPE, DEFAULT_CONTROLLER_ID,
};
use crate::domain::resource::{
    namespace_name, new_system_generated_id, resource_id, validate_resource_name,
    validate_update_mask, validate_user_settable_id, volume_device_name,
};
use crate::error::{Error, Result};
use crate::registry::{PaginationConfig, PaginationStore, StripedLocks, LOCK_STRIPE_COUNT};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use validator::Validate;

// =============================================================================
// Controller Configuration
// =============================================================================

/// Configuration for the namespace controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControllerConfig {
    /// List pagination settings
    pub pagination: PaginationConfig,
    /// Number of per-name lock stripes
    pub lock_stripes: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pagination: PaginationConfig::default(),
            lock_stripes: LOCK_STRIPE_COUNT,
        }
    }
}

// =============================================================================
// Namespace Controller
// =============================================================================

/// Controller for NVMe namespace resources
pub struct NamespaceController {
    engine: EngineGatewayRef,
    subsystems: SubsystemDirectoryRef,
    store: NamespaceStoreRef,
    cursors: PaginationStore,
    locks: StripedLocks,
    metrics: ControllerMetrics,
}

impl NamespaceController {
    /// Create a new controller
    pub fn new(
        config: ControllerConfig,
        engine: EngineGatewayRef,
        subsystems: SubsystemDirectoryRef,
        store: NamespaceStoreRef,
    ) -> Result<Arc<Self>> {
        info!(
            "Namespace controller using engine '{}' ({} lock stripes)",
            engine.engine_name(),
            config.lock_stripes
        );

        Ok(Arc::new(Self {
            engine,
            subsystems,
            store,
            cursors: PaginationStore::new(config.pagination),
            locks: StripedLocks::new(config.lock_stripes),
            metrics: ControllerMetrics::new()?,
        }))
    }

    pub fn metrics(&self) -> &ControllerMetrics {
        &self.metrics
    }

    /// Check engine reachability
    pub async fn health_check(&self) -> Result<bool> {
        self.engine.health_check().await
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Create a namespace, or return the existing one registered under the
    /// same resolved name without touching the engine
    pub async fn create_namespace(&self, request: CreateNamespaceRequest) -> Result<Namespace> {
        info!("CreateNvmeNamespace: {:?}", request);
        let result = self.create_inner(request).await;
        self.finish("create", result)
    }

    async fn create_inner(&self, request: CreateNamespaceRequest) -> Result<Namespace> {
        request.validate()?;

        let mut namespace = request.namespace;
        let id = match request.namespace_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                validate_user_settable_id(&id)?;
                if !namespace.name.is_empty() {
                    info!(
                        "Client provided ID {}, ignoring name field {}",
                        id, namespace.name
                    );
                }
                id
            }
            None => new_system_generated_id(),
        };
        namespace.name = namespace_name(&id);

        let _guard = self.locks.lock(&namespace.name).await;

        if let Some(existing) = self.store.get(&namespace.name) {
            info!("Namespace {} already exists", existing.name);
            return Ok(existing);
        }

        let subsystem = self
            .subsystems
            .get(&namespace.spec.subsystem_id)
            .ok_or_else(|| Error::subsystem_not_found(&namespace.spec.subsystem_id))?;

        let params = attach_params(&namespace.spec, &subsystem);
        self.engine_call(commands::ATTACH, self.engine.attach(params))
            .await?;

        namespace.status = Some(NamespaceStatus::attached());
        self.store.put(namespace.clone());
        info!("Created namespace {}", namespace.name);

        Ok(namespace)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Detach and forget a namespace
    pub async fn delete_namespace(&self, request: DeleteNamespaceRequest) -> Result<()> {
        info!("DeleteNvmeNamespace: {:?}", request);
        let result = self.delete_inner(request).await;
        self.finish("delete", result)
    }

    async fn delete_inner(&self, request: DeleteNamespaceRequest) -> Result<()> {
        request.validate()?;
        validate_resource_name(&request.name)?;

        let _guard = self.locks.lock(&request.name).await;

        let namespace = match self.store.get(&request.name) {
            Some(namespace) => namespace,
            None if request.allow_missing => {
                debug!("Namespace {} absent, allow_missing set", request.name);
                return Ok(());
            }
            None => return Err(Error::namespace_not_found(&request.name)),
        };

        let subsystem = self.owning_subsystem(&namespace)?;
        let params = DetachParams {
            nsid: namespace.spec.host_nsid,
            subnqn: subsystem.spec.nqn,
            cntlid: DEFAULT_CONTROLLER_ID,
        };
        self.engine_call(commands::DETACH, self.engine.detach(params))
            .await?;

        self.store.delete(&namespace.name);
        info!("Deleted namespace {}", namespace.name);

        Ok(())
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Validate an update request. Applying it is not supported.
    pub async fn update_namespace(&self, request: UpdateNamespaceRequest) -> Result<Namespace> {
        info!("UpdateNvmeNamespace: {:?}", request);
        let result = self.update_inner(request);
        self.finish("update", result)
    }

    fn update_inner(&self, request: UpdateNamespaceRequest) -> Result<Namespace> {
        request.validate()?;
        let name = &request.namespace.name;
        if name.is_empty() {
            return Err(Error::MissingField {
                field: "namespace.name".into(),
            });
        }
        validate_resource_name(name)?;

        let existing = match self.store.get(name) {
            Some(existing) => existing,
            None => {
                if request.allow_missing {
                    warn!("allow_missing does not create {} on update", name);
                }
                return Err(Error::namespace_not_found(name));
            }
        };

        validate_update_mask(&request.update_mask)?;

        Err(Error::Unimplemented(format!(
            "UpdateNvmeNamespace for {}",
            resource_id(&existing.name)
        )))
    }

    // =========================================================================
    // List
    // =========================================================================

    /// List namespaces the engine reports under a subsystem, ordered by host nsid
    pub async fn list_namespaces(
        &self,
        request: ListNamespacesRequest,
    ) -> Result<ListNamespacesResponse> {
        info!("ListNvmeNamespaces: {:?}", request);
        let result = self.list_inner(request).await;
        self.finish("list", result)
    }

    async fn list_inner(&self, request: ListNamespacesRequest) -> Result<ListNamespacesResponse> {
        request.validate()?;
        validate_resource_name(&request.parent)?;

        let window = self
            .cursors
            .resolve(request.page_size, request.page_token.as_deref())?;

        let subsystem = self
            .subsystems
            .get(&request.parent)
            .ok_or_else(|| Error::subsystem_not_found(&request.parent))?;

        let params = ListParams {
            subnqn: subsystem.spec.nqn,
            cntlid: DEFAULT_CONTROLLER_ID,
        };
        let mut reported = self
            .engine_call(commands::LIST, self.engine.list(params))
            .await?
            .namespaces;
        reported.sort_by_key(|ns| ns.nsid);

        debug!(
            "Limiting result len({}) to [{}:{}]",
            reported.len(),
            window.offset,
            window.next_offset()
        );
        let (page, has_more) = window.apply(reported);

        let next_page_token = if has_more {
            self.cursors.mint(window.next_offset())
        } else {
            String::new()
        };

        let namespaces = page
            .into_iter()
            .map(|ns| Namespace {
                spec: NamespaceSpec {
                    host_nsid: ns.nsid,
                    ..Default::default()
                },
                ..Default::default()
            })
            .collect();

        Ok(ListNamespacesResponse {
            namespaces,
            next_page_token,
        })
    }

    // =========================================================================
    // Get
    // =========================================================================

    /// Confirm a registered namespace against the engine
    pub async fn get_namespace(&self, request: GetNamespaceRequest) -> Result<Namespace> {
        info!("GetNvmeNamespace: {:?}", request);
        let result = self.get_inner(request).await;
        self.finish("get", result)
    }

    async fn get_inner(&self, request: GetNamespaceRequest) -> Result<Namespace> {
        request.validate()?;
        validate_resource_name(&request.name)?;

        let namespace = self
            .store
            .get(&request.name)
            .ok_or_else(|| Error::namespace_not_found(&request.name))?;
        let subsystem = self.owning_subsystem(&namespace)?;

        let params = ListParams {
            subnqn: subsystem.spec.nqn,
            cntlid: DEFAULT_CONTROLLER_ID,
        };
        let reported = self
            .engine_call(commands::LIST, self.engine.list(params))
            .await?;

        let host_nsid = namespace.spec.host_nsid;
        reported
            .namespaces
            .iter()
            .find(|ns| ns.nsid == host_nsid)
            .map(|ns| Namespace {
                name: namespace.name.clone(),
                spec: NamespaceSpec {
                    host_nsid: ns.nsid,
                    ..Default::default()
                },
                status: Some(NamespaceStatus::attached()),
            })
            .ok_or_else(|| {
                Error::EngineMismatch(format!(
                    "engine reports no nsid {} for {}",
                    host_nsid, namespace.name
                ))
            })
    }

    // =========================================================================
    // Stats
    // =========================================================================

    /// Read IO counters for the volume behind a namespace
    pub async fn namespace_stats(
        &self,
        request: NamespaceStatsRequest,
    ) -> Result<NamespaceStatsResponse> {
        info!("NvmeNamespaceStats: {:?}", request);
        let result = self.stats_inner(request).await;
        self.finish("stats", result)
    }

    async fn stats_inner(&self, request: NamespaceStatsRequest) -> Result<NamespaceStatsResponse> {
        request.validate()?;
        validate_resource_name(&request.namespace_id)?;

        let namespace = self
            .store
            .get(&request.namespace_id)
            .ok_or_else(|| Error::namespace_not_found(&request.namespace_id))?;

        let iostat = self
            .engine_call(commands::IOSTAT, self.engine.iostat())
            .await?;

        let device_name = volume_device_name(&namespace.spec.volume_id);
        let device = iostat.find_device(device_name).ok_or_else(|| {
            Error::EngineMismatch(format!("engine reports no device {}", device_name))
        })?;

        Ok(NamespaceStatsResponse {
            id: request.namespace_id,
            stats: VolumeStats {
                read_ops_count: device.read_ios,
                write_ops_count: device.write_ios,
            },
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Subsystem of a registered namespace. Its absence means the registry
    /// and the directory disagree, not that the caller asked for something
    /// unknown.
    fn owning_subsystem(&self, namespace: &Namespace) -> Result<Subsystem> {
        self.subsystems
            .get(&namespace.spec.subsystem_id)
            .ok_or_else(|| Error::RegistryInconsistent {
                namespace: namespace.name.clone(),
                subsystem: namespace.spec.subsystem_id.clone(),
            })
    }

    async fn engine_call<T, F>(&self, command: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _timer = self.metrics.engine_timer(command);
        let result = call.await;
        match &result {
            Ok(_) => debug!("Engine accepted {}", command),
            Err(e) => warn!("Engine call {} failed: {}", command, e),
        }
        result
    }

    fn finish<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            error!("{} failed ({}): {}", operation, e.kind(), e);
        }
        self.metrics.record(operation, &result);
        self.metrics.set_namespaces(self.store.len());
        result
    }
}

fn attach_params(spec: &NamespaceSpec, subsystem: &Subsystem) -> AttachParams {
    AttachParams {
        bdev_type: DEFAULT_BDEV_TYPE.to_string(),
        bdev: volume_device_name(&spec.volume_id).to_string(),
        nsid: spec.host_nsid,
        subnqn: subsystem.spec.nqn.clone(),
        cntlid: DEFAULT_CONTROLLER_ID,
        uuid: spec.uuid.clone().unwrap_or_default(),
        nguid: spec.nguid.clone(),
        eui64: spec.eui64.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{EngineGateway, EngineGatewayRef, EngineNamespace, NamespaceStore};
    use crate::engine::MemoryEngine;
    use crate::error::ErrorKind;
    use crate::registry::{NamespaceRegistry, SubsystemCatalog};
    use assert_matches::assert_matches;

    const SUBSYSTEM: &str = "subsystems/nqn-1";
    const NQN: &str = "nqn.2022-09.io.spdk:opi1";

    struct Fixture {
        controller: Arc<NamespaceController>,
        engine: Arc<MemoryEngine>,
        catalog: Arc<SubsystemCatalog>,
        registry: Arc<NamespaceRegistry>,
    }

    fn fixture() -> Fixture {
        fixture_with(ControllerConfig::default())
    }

    fn fixture_with(config: ControllerConfig) -> Fixture {
        let engine = Arc::new(MemoryEngine::new());
        let catalog = SubsystemCatalog::from_subsystems([Subsystem::new(SUBSYSTEM, NQN)]);
        let registry = NamespaceRegistry::new();
        let gateway: EngineGatewayRef = engine.clone();

        let controller = NamespaceController::new(
            config,
            gateway,
            catalog.clone(),
            registry.clone(),
        )
        .unwrap();

        Fixture {
            controller,
            engine,
            catalog,
            registry,
        }
    }

    fn create_request(id: Option<&str>, volume: &str, nsid: i32) -> CreateNamespaceRequest {
        CreateNamespaceRequest {
            namespace: Namespace {
                spec: NamespaceSpec {
                    subsystem_id: SUBSYSTEM.into(),
                    volume_id: volume.into(),
                    host_nsid: nsid,
                    ..Default::default()
                },
                ..Default::default()
            },
            namespace_id: id.map(str::to_string),
        }
    }

    fn list_request(page_size: i32, page_token: Option<String>) -> ListNamespacesRequest {
        ListNamespacesRequest {
            parent: SUBSYSTEM.into(),
            page_size,
            page_token,
        }
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_attaches_and_registers() {
        let f = fixture();

        let created = f
            .controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();

        assert_eq!(created.name, "namespaces/ns-1");
        assert_eq!(created.status.unwrap().pci_state.code(), 2);
        assert_eq!(created.status.unwrap().pci_oper_state.code(), 1);
        assert_eq!(f.registry.get("namespaces/ns-1").unwrap(), created);

        let attached = f
            .engine
            .list(ListParams { subnqn: NQN.into(), cntlid: 0 })
            .await
            .unwrap();
        assert_eq!(attached.namespaces.len(), 1);
        assert_eq!(attached.namespaces[0].bdev, "v1");
        assert_eq!(attached.namespaces[0].nsid, 5);
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let f = fixture();

        let first = f
            .controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();
        let second = f
            .controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(f.engine.call_count(commands::ATTACH), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_attach_once() {
        let f = fixture();

        let creates = (0..8).map(|_| {
            let controller = f.controller.clone();
            tokio::spawn(async move {
                controller
                    .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
                    .await
            })
        });
        let results = futures::future::join_all(creates).await;

        let first = results[0].as_ref().unwrap().as_ref().unwrap().clone();
        for result in results {
            assert_eq!(result.unwrap().unwrap(), first);
        }
        assert_eq!(f.engine.call_count(commands::ATTACH), 1);
        assert_eq!(f.registry.len(), 1);
    }

    #[tokio::test]
    async fn test_create_generates_system_id() {
        let f = fixture();

        let created = f
            .controller
            .create_namespace(create_request(None, "volumes/v1", 5))
            .await
            .unwrap();

        let id = created.name.strip_prefix("namespaces/").unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input_without_engine_call() {
        let f = fixture();

        let err = f
            .controller
            .create_namespace(create_request(Some("Bad_ID"), "volumes/v1", 5))
            .await
            .unwrap_err();
        assert_matches!(err, Error::InvalidResourceId { .. });

        let err = f
            .controller
            .create_namespace(create_request(Some("ns-1"), "", 5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        assert_eq!(f.engine.call_count(commands::ATTACH), 0);
    }

    #[tokio::test]
    async fn test_create_unknown_subsystem() {
        let f = fixture();
        let mut request = create_request(Some("ns-1"), "volumes/v1", 5);
        request.namespace.spec.subsystem_id = "subsystems/missing".into();

        let err = f.controller.create_namespace(request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(f.engine.call_count(commands::ATTACH), 0);
    }

    #[tokio::test]
    async fn test_create_engine_refusal_leaves_no_trace() {
        let f = fixture();
        f.engine.refuse(commands::ATTACH);

        let err = f
            .controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(f.registry.is_empty());
        assert_eq!(f.controller.metrics().request_count("create", "invalid_argument"), 1);
    }

    // -------------------------------------------------------------------------
    // Delete
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_delete_missing() {
        let f = fixture();

        f.controller
            .delete_namespace(DeleteNamespaceRequest {
                name: "namespaces/ghost".into(),
                allow_missing: true,
            })
            .await
            .unwrap();

        let err = f
            .controller
            .delete_namespace(DeleteNamespaceRequest {
                name: "namespaces/ghost".into(),
                allow_missing: false,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(f.engine.call_count(commands::DETACH), 0);
    }

    #[tokio::test]
    async fn test_delete_detaches_and_forgets() {
        let f = fixture();
        f.controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();

        f.controller
            .delete_namespace(DeleteNamespaceRequest {
                name: "namespaces/ns-1".into(),
                allow_missing: false,
            })
            .await
            .unwrap();

        assert_eq!(f.engine.call_count(commands::DETACH), 1);
        assert!(f.registry.is_empty());

        let err = f
            .controller
            .get_namespace(GetNamespaceRequest {
                name: "namespaces/ns-1".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_with_vanished_subsystem_is_internal() {
        let f = fixture();
        f.controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();
        f.catalog.remove(SUBSYSTEM);

        let err = f
            .controller
            .delete_namespace(DeleteNamespaceRequest {
                name: "namespaces/ns-1".into(),
                allow_missing: false,
            })
            .await
            .unwrap_err();

        assert_matches!(err, Error::RegistryInconsistent { .. });
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(f.registry.contains("namespaces/ns-1"));
    }

    #[tokio::test]
    async fn test_delete_engine_refusal_keeps_entry() {
        let f = fixture();
        f.controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();
        f.engine.refuse(commands::DETACH);

        let err = f
            .controller
            .delete_namespace(DeleteNamespaceRequest {
                name: "namespaces/ns-1".into(),
                allow_missing: true,
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(f.registry.contains("namespaces/ns-1"));
    }

    // -------------------------------------------------------------------------
    // Update
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_update_is_unimplemented() {
        let f = fixture();
        let created = f
            .controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();

        let err = f
            .controller
            .update_namespace(UpdateNamespaceRequest {
                namespace: created.clone(),
                update_mask: vec!["spec.volume_id".into()],
                allow_missing: false,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unimplemented);

        let err = f
            .controller
            .update_namespace(UpdateNamespaceRequest {
                namespace: created.clone(),
                update_mask: vec!["spec.capacity".into()],
                allow_missing: false,
            })
            .await
            .unwrap_err();
        assert_matches!(err, Error::InvalidUpdateMask { .. });

        let mut unknown = created;
        unknown.name = "namespaces/ghost".into();
        let err = f
            .controller
            .update_namespace(UpdateNamespaceRequest {
                namespace: unknown,
                update_mask: vec![],
                allow_missing: true,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // -------------------------------------------------------------------------
    // List
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_list_pages_in_nsid_order() {
        let f = fixture();
        for nsid in [7, 3, 9, 1, 5] {
            f.engine
                .insert_namespace(
                    NQN,
                    EngineNamespace {
                        nsid,
                        bdev: format!("v{}", nsid),
                        ..Default::default()
                    },
                )
                .await;
        }

        let nsids = |response: &ListNamespacesResponse| -> Vec<i32> {
            response.namespaces.iter().map(|ns| ns.spec.host_nsid).collect()
        };

        let page = f.controller.list_namespaces(list_request(2, None)).await.unwrap();
        assert_eq!(nsids(&page), vec![1, 3]);
        assert!(!page.next_page_token.is_empty());

        let page = f
            .controller
            .list_namespaces(list_request(2, Some(page.next_page_token)))
            .await
            .unwrap();
        assert_eq!(nsids(&page), vec![5, 7]);
        assert!(!page.next_page_token.is_empty());

        let page = f
            .controller
            .list_namespaces(list_request(2, Some(page.next_page_token)))
            .await
            .unwrap();
        assert_eq!(nsids(&page), vec![9]);
        assert!(page.next_page_token.is_empty());

        let all = f.controller.list_namespaces(list_request(0, None)).await.unwrap();
        assert_eq!(nsids(&all), vec![1, 3, 5, 7, 9]);
        assert!(all.next_page_token.is_empty());
    }

    #[tokio::test]
    async fn test_list_errors() {
        let f = fixture();

        let err = f
            .controller
            .list_namespaces(list_request(2, Some("not-a-token".into())))
            .await
            .unwrap_err();
        assert_matches!(err, Error::InvalidPageToken { .. });

        let err = f.controller.list_namespaces(list_request(-1, None)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let mut request = list_request(2, None);
        request.parent = "subsystems/missing".into();
        let err = f.controller.list_namespaces(request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(f.engine.call_count(commands::LIST), 0);
    }

    #[tokio::test]
    async fn test_list_with_zero_page_size_config_advances() {
        let f = fixture_with(ControllerConfig {
            pagination: PaginationConfig {
                default_page_size: 0,
                ..Default::default()
            },
            ..Default::default()
        });
        for nsid in [1, 2] {
            f.engine
                .insert_namespace(NQN, EngineNamespace { nsid, ..Default::default() })
                .await;
        }

        let first = f.controller.list_namespaces(list_request(0, None)).await.unwrap();
        assert_eq!(first.namespaces.len(), 1);
        assert_eq!(first.namespaces[0].spec.host_nsid, 1);
        assert!(!first.next_page_token.is_empty());

        let second = f
            .controller
            .list_namespaces(list_request(0, Some(first.next_page_token)))
            .await
            .unwrap();
        assert_eq!(second.namespaces[0].spec.host_nsid, 2);
        assert!(second.next_page_token.is_empty());
    }

    #[tokio::test]
    async fn test_list_engine_refusal() {
        let f = fixture();
        f.engine.refuse(commands::LIST);

        let err = f.controller.list_namespaces(list_request(10, None)).await.unwrap_err();
        assert_matches!(err, Error::EngineRejected { .. });
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(f.controller.metrics().request_count("list", "invalid_argument"), 1);
    }

    #[tokio::test]
    async fn test_list_ignores_registry() {
        let f = fixture();
        f.controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();
        f.engine.remove_namespace(NQN, 5).await;

        let page = f.controller.list_namespaces(list_request(10, None)).await.unwrap();
        assert!(page.namespaces.is_empty());
    }

    // -------------------------------------------------------------------------
    // Get
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_get_matches_engine() {
        let f = fixture();
        f.controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();

        let found = f
            .controller
            .get_namespace(GetNamespaceRequest {
                name: "namespaces/ns-1".into(),
            })
            .await
            .unwrap();
        assert_eq!(found.spec.host_nsid, 5);
        assert_eq!(found.status, Some(NamespaceStatus::attached()));
    }

    #[tokio::test]
    async fn test_get_engine_disagreement() {
        let f = fixture();
        f.controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();
        f.engine.remove_namespace(NQN, 5).await;

        let err = f
            .controller
            .get_namespace(GetNamespaceRequest {
                name: "namespaces/ns-1".into(),
            })
            .await
            .unwrap_err();
        assert_matches!(err, Error::EngineMismatch(_));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = f
            .controller
            .get_namespace(GetNamespaceRequest {
                name: "namespaces/ghost".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_get_engine_refusal() {
        let f = fixture();
        f.controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();
        f.engine.refuse(commands::LIST);

        let err = f
            .controller
            .get_namespace(GetNamespaceRequest {
                name: "namespaces/ns-1".into(),
            })
            .await
            .unwrap_err();
        assert_matches!(err, Error::EngineRejected { .. });
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_get_with_vanished_subsystem_is_internal() {
        let f = fixture();
        f.controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();
        f.catalog.remove(SUBSYSTEM);

        let err = f
            .controller
            .get_namespace(GetNamespaceRequest {
                name: "namespaces/ns-1".into(),
            })
            .await
            .unwrap_err();
        assert_matches!(err, Error::RegistryInconsistent { .. });
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(f.engine.call_count(commands::LIST), 0);
    }

    // -------------------------------------------------------------------------
    // Stats
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_stats_engine_refusal() {
        let f = fixture();
        f.controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();
        f.engine.refuse(commands::IOSTAT);

        let err = f
            .controller
            .namespace_stats(NamespaceStatsRequest {
                namespace_id: "namespaces/ns-1".into(),
            })
            .await
            .unwrap_err();
        assert_matches!(err, Error::EngineRejected { .. });
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_stats_reads_device_counters() {
        let f = fixture();
        f.controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();
        f.engine.record_io("v1", 10, 3).await;

        let response = f
            .controller
            .namespace_stats(NamespaceStatsRequest {
                namespace_id: "namespaces/ns-1".into(),
            })
            .await
            .unwrap();

        assert_eq!(response.id, "namespaces/ns-1");
        assert_eq!(
            response.stats,
            VolumeStats {
                read_ops_count: 10,
                write_ops_count: 3
            }
        );
    }

    #[tokio::test]
    async fn test_stats_errors() {
        let f = fixture();

        let err = f
            .controller
            .namespace_stats(NamespaceStatsRequest {
                namespace_id: "namespaces/ghost".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(f.engine.call_count(commands::IOSTAT), 0);

        f.controller
            .create_namespace(create_request(Some("ns-1"), "volumes/v1", 5))
            .await
            .unwrap();
        f.engine.remove_namespace(NQN, 5).await;

        let err = f
            .controller
            .namespace_stats(NamespaceStatsRequest {
                namespace_id: "namespaces/ns-1".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
