//! CanonRuntime: an explicit handle owning every Canon subsystem.
//!
//! There is no process-wide singleton. Callers create a runtime, pass it to
//! the operations in `bindings`, and drop (or `shutdown`) it when done.
//! Project stores are opened on first use from the registry's recorded path
//! and stay attached to the aggregator until the project is unlinked. Their
//! learners are also registered with the runtime's learning scheduler, which
//! runs queued changes in trigger priority order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use canon_analysis::compliance::ConflictDetector;
use canon_analysis::extraction::{FsSourceReader, LexicalExtractor};
use canon_analysis::learning::{IncrementalLearner, LearningScheduler};
use canon_analysis::{GlobalAggregator, ProjectRegistry};
use canon_core::config::CanonConfig;
use canon_core::constants;
use canon_core::errors::error_code;
use canon_core::events::{CanonEventHandler, EventDispatcher};
use canon_core::traits::{ConceptExtractor, SourceReader};
use canon_storage::{GlobalStore, PatternStore};
use dashmap::DashMap;

use crate::error::ApiError;

/// Options for creating a runtime.
#[derive(Default, Clone)]
pub struct RuntimeOptions {
    /// Path to the global database. If None, uses `<global_dir>/global.db`.
    pub global_db_path: Option<PathBuf>,
    /// Directory whose `canon.toml` (plus user config and env) is loaded.
    pub config_root: Option<PathBuf>,
    /// TOML configuration string. Takes precedence over `config_root`.
    pub config_toml: Option<String>,
    /// Keep every database in memory. Project sources are still read from disk.
    pub in_memory: bool,
    /// Handlers registered on the runtime's event dispatcher.
    pub event_handlers: Vec<Arc<dyn CanonEventHandler>>,
}

/// Per-project subsystems sharing one pattern store.
pub struct ProjectHandle {
    pub project_id: String,
    pub store: Arc<PatternStore>,
    pub learner: Arc<IncrementalLearner>,
    pub detector: ConflictDetector,
}

/// The central runtime owning all Canon subsystems.
pub struct CanonRuntime {
    config: CanonConfig,
    dispatcher: Arc<EventDispatcher>,
    global: Arc<GlobalStore>,
    registry: ProjectRegistry,
    aggregator: GlobalAggregator,
    scheduler: LearningScheduler,
    projects: DashMap<String, Arc<ProjectHandle>>,
    extractor: Arc<dyn ConceptExtractor>,
    reader: Arc<dyn SourceReader>,
    in_memory: bool,
}

impl CanonRuntime {
    /// Create a runtime with the built-in lexical extractor and filesystem reader.
    pub fn new(opts: RuntimeOptions) -> Result<Self, ApiError> {
        Self::with_collaborators(opts, Arc::new(LexicalExtractor::new()), None)
    }

    /// Create a runtime with a caller-supplied extractor and, optionally, reader.
    pub fn with_collaborators(
        opts: RuntimeOptions,
        extractor: Arc<dyn ConceptExtractor>,
        reader: Option<Arc<dyn SourceReader>>,
    ) -> Result<Self, ApiError> {
        canon_core::tracing::setup::init_tracing();

        let config = match (&opts.config_toml, &opts.config_root) {
            (Some(toml_str), _) => CanonConfig::from_toml(toml_str)?,
            (None, Some(root)) => CanonConfig::load(root, None)?,
            (None, None) => CanonConfig::default(),
        };

        let global = if opts.in_memory {
            GlobalStore::open_in_memory()?
        } else {
            let path = match opts.global_db_path {
                Some(path) => path,
                None => config
                    .global_dir()
                    .map(|dir| dir.join(constants::GLOBAL_DB_FILE))
                    .ok_or_else(|| {
                        ApiError::new(
                            error_code::CONFIG_ERROR,
                            "no global directory configured and no home directory found",
                        )
                    })?,
            };
            GlobalStore::open(&path, config.storage.effective_read_pool_size())?
        };
        let global = Arc::new(global);

        let mut dispatcher = EventDispatcher::new();
        for handler in opts.event_handlers {
            dispatcher.register(handler);
        }
        let dispatcher = Arc::new(dispatcher);

        let reader = reader.unwrap_or_else(|| {
            Arc::new(FsSourceReader::new(config.learning.effective_max_file_size()))
        });
        let registry = ProjectRegistry::new(Arc::clone(&global), &config, Arc::clone(&dispatcher));
        let aggregator =
            GlobalAggregator::new(Arc::clone(&global), &config, Arc::clone(&dispatcher));
        let scheduler = LearningScheduler::new(&config.workers);

        tracing::info!(
            in_memory = opts.in_memory,
            handlers = dispatcher.handler_count(),
            "canon runtime initialized"
        );
        Ok(Self {
            config,
            dispatcher,
            global,
            registry,
            aggregator,
            scheduler,
            projects: DashMap::new(),
            extractor,
            reader,
            in_memory: opts.in_memory,
        })
    }

    pub fn config(&self) -> &CanonConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn aggregator(&self) -> &GlobalAggregator {
        &self.aggregator
    }

    pub fn scheduler(&self) -> &LearningScheduler {
        &self.scheduler
    }

    /// The handle for an active project, opening its store on first use.
    pub fn project(&self, project_id: &str) -> Result<Arc<ProjectHandle>, ApiError> {
        if let Some(handle) = self.projects.get(project_id) {
            return Ok(Arc::clone(handle.value()));
        }
        let entry = self
            .projects
            .entry(project_id.to_string())
            .or_try_insert_with(|| self.open_project(project_id))?;
        Ok(Arc::clone(entry.value()))
    }

    fn open_project(&self, project_id: &str) -> Result<Arc<ProjectHandle>, ApiError> {
        let project = self
            .registry
            .get_project(project_id)?
            .ok_or_else(|| ApiError::unknown_project(project_id))?;
        if !project.is_active {
            return Err(ApiError::inactive_project(project_id));
        }

        let root = Path::new(&project.path);
        let store = if self.in_memory {
            PatternStore::open_in_memory(root)?
        } else {
            PatternStore::open_for_project(root, self.config.storage.effective_read_pool_size())?
        };
        let store = Arc::new(store);
        self.aggregator.attach_store(project_id, Arc::clone(&store));

        let learner = Arc::new(IncrementalLearner::new(
            project_id,
            Arc::clone(&store),
            Arc::clone(&self.extractor),
            Arc::clone(&self.reader),
            &self.config,
            Arc::clone(&self.dispatcher),
        ));
        self.scheduler.register(Arc::clone(&learner));

        tracing::debug!(project_id, path = %project.path, "project store opened");
        Ok(Arc::new(ProjectHandle {
            project_id: project_id.to_string(),
            learner,
            detector: ConflictDetector::new(
                project_id,
                Arc::clone(&store),
                Arc::clone(&self.extractor),
                &self.config.detection,
                Arc::clone(&self.dispatcher),
            ),
            store,
        }))
    }

    /// Close a project's store, detach it from the aggregator and drop its
    /// queued changes. Returns false when the project had no open handle.
    pub fn release_project(&self, project_id: &str) -> bool {
        self.scheduler.unregister(project_id);
        self.aggregator.detach_store(project_id);
        match self.projects.remove(project_id) {
            Some((_, handle)) => {
                if let Err(e) = handle.store.checkpoint() {
                    tracing::warn!(project_id, error = %e, "checkpoint on release failed");
                }
                true
            }
            None => false,
        }
    }

    /// Number of project stores currently open.
    pub fn open_projects(&self) -> usize {
        self.projects.len()
    }

    /// Flush every open store. The runtime stays usable.
    pub fn checkpoint(&self) -> Result<(), ApiError> {
        for handle in self.projects.iter() {
            handle.store.checkpoint()?;
        }
        self.global.checkpoint()?;
        Ok(())
    }

    /// Finish queued learning, then flush and close every store.
    pub fn shutdown(self) -> Result<(), ApiError> {
        self.scheduler.shutdown();
        self.checkpoint()?;
        tracing::info!(projects = self.projects.len(), "canon runtime shut down");
        Ok(())
    }
}
