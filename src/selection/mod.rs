//! Batch queue selection
//!
//! An execution system owns an ordered list of batch queues; list order is
//! priority. Selection is first-fit over that order, no sorting.
//!
//! Queue resolution for a job request:
//! 1. The queue named by the request (`batchQueue`, legacy `queue`)
//! 2. The software's default queue
//! 3. The system default queue, if the request fits it
//! 4. The first other queue the request fits

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

use crate::catalog::Software;
use crate::job::JobResources;
use crate::resources::{ResourceError, ResourceRequest, RunTime, UNBOUNDED};

fn unbounded_i64() -> i64 {
    UNBOUNDED
}

fn unbounded_f64() -> f64 {
    UNBOUNDED as f64
}

/// A named resource-limit tier on an execution system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchQueue {
    pub name: String,

    /// `-1` = unbounded.
    #[serde(default = "unbounded_i64")]
    pub max_nodes: i64,

    /// `-1` = unbounded.
    #[serde(default = "unbounded_i64")]
    pub max_processors_per_node: i64,

    /// GB; `-1` = unbounded.
    #[serde(default = "unbounded_f64")]
    pub max_memory_per_node: f64,

    /// `None` = unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requested_time: Option<RunTime>,

    #[serde(default)]
    pub system_default: bool,
}

impl BatchQueue {
    /// A queue with no limits.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_nodes: UNBOUNDED,
            max_processors_per_node: UNBOUNDED,
            max_memory_per_node: UNBOUNDED as f64,
            max_requested_time: None,
            system_default: false,
        }
    }

    pub fn with_limits(
        mut self,
        max_nodes: i64,
        max_processors_per_node: i64,
        max_memory_per_node: f64,
        max_requested_time: Option<RunTime>,
    ) -> Self {
        self.max_nodes = max_nodes;
        self.max_processors_per_node = max_processors_per_node;
        self.max_memory_per_node = max_memory_per_node;
        self.max_requested_time = max_requested_time;
        self
    }

    pub fn system_default(mut self, system_default: bool) -> Self {
        self.system_default = system_default;
        self
    }

    fn fits_nodes(&self, nodes: i64) -> bool {
        nodes == UNBOUNDED || self.max_nodes == UNBOUNDED || nodes <= self.max_nodes
    }

    fn fits_processors(&self, processors: i64) -> bool {
        processors == UNBOUNDED
            || self.max_processors_per_node == UNBOUNDED
            || processors <= self.max_processors_per_node
    }

    fn fits_memory(&self, memory: Option<f64>) -> bool {
        match memory {
            None => true,
            Some(m) if m == UNBOUNDED as f64 => true,
            Some(m) => self.max_memory_per_node == UNBOUNDED as f64 || m <= self.max_memory_per_node,
        }
    }

    fn fits_time(&self, time: Option<RunTime>) -> bool {
        match (time, self.max_requested_time) {
            (None, _) | (_, None) => true,
            (Some(t), Some(limit)) => t <= limit,
        }
    }
}

/// Errors for execution system definitions
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("execution system {system} declares queue '{queue}' more than once")]
    DuplicateQueue { system: String, queue: String },

    #[error("execution system {system} declares more than one default queue")]
    MultipleDefaults { system: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Execution system with its ordered queues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSystem {
    pub id: String,
    #[serde(default)]
    pub queues: Vec<BatchQueue>,
}

impl ExecutionSystem {
    pub fn new(id: impl Into<String>, queues: Vec<BatchQueue>) -> Self {
        Self {
            id: id.into(),
            queues,
        }
    }

    pub fn queue(&self, name: &str) -> Option<&BatchQueue> {
        self.queues.iter().find(|q| q.name == name)
    }

    pub fn default_queue(&self) -> Option<&BatchQueue> {
        self.queues.iter().find(|q| q.system_default)
    }

    pub fn validate(&self) -> Result<(), SystemError> {
        for (i, queue) in self.queues.iter().enumerate() {
            if self.queues[..i].iter().any(|q| q.name == queue.name) {
                return Err(SystemError::DuplicateQueue {
                    system: self.id.clone(),
                    queue: queue.name.clone(),
                });
            }
        }
        if self.queues.iter().filter(|q| q.system_default).count() > 1 {
            return Err(SystemError::MultipleDefaults {
                system: self.id.clone(),
            });
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SystemError> {
        let system: ExecutionSystem = toml::from_str(content)?;
        system.validate()?;
        Ok(system)
    }

    /// Load and validate a system definition from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SystemError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// Resource dimension named in selection errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Nodes,
    ProcessorsPerNode,
    MemoryPerNode,
    RunTime,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Nodes => write!(f, "nodeCount"),
            Dimension::ProcessorsPerNode => write!(f, "processorsPerNode"),
            Dimension::MemoryPerNode => write!(f, "memoryPerNode"),
            Dimension::RunTime => write!(f, "maxRunTime"),
        }
    }
}

/// Errors for queue selection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectionError {
    #[error("Invalid batchQueue. No batch queue named {queue} is defined on system {system}")]
    UnknownQueue { queue: String, system: String },

    #[error("Invalid default batchQueue for {software}. No batch queue named {queue} is defined on system {system}")]
    UnknownDefaultQueue {
        software: String,
        queue: String,
        system: String,
    },

    #[error("No queue found on execution system {system} to support jobs requiring {request}")]
    NoMatchingQueue { system: String, request: String },

    #[error("{dimension} is not specified")]
    Unspecified { dimension: Dimension },

    #[error("Invalid {dimension} {value}. {dimension} must be positive or -1.")]
    NonPositive { dimension: Dimension, value: String },

    #[error("{dimension} {value} exceeds the limit {limit} of queue {queue}")]
    ExceedsQueue {
        dimension: Dimension,
        value: String,
        limit: String,
        queue: String,
    },

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// First queue, in system order, that can hold `nodes`, `memory` and `time`.
///
/// A request value of `-1` or `None` fits any queue; a bounded request fits
/// when the queue's limit is unbounded or at least as large.
pub fn select_queue(
    system: &ExecutionSystem,
    nodes: i64,
    memory: Option<f64>,
    time: Option<RunTime>,
) -> Option<&BatchQueue> {
    system
        .queues
        .iter()
        .find(|q| q.fits_nodes(nodes) && q.fits_memory(memory) && q.fits_time(time))
}

/// Check every dimension of a resolved request against the selected queue.
pub fn validate_batch_submit_parameters(
    queue: &BatchQueue,
    request: &ResourceRequest,
) -> Result<(), SelectionError> {
    let exceeds = |dimension: Dimension, value: String, limit: String| SelectionError::ExceedsQueue {
        dimension,
        value,
        limit,
        queue: queue.name.clone(),
    };

    for (dimension, value) in [
        (Dimension::Nodes, request.max_nodes()),
        (Dimension::ProcessorsPerNode, request.max_processors_per_node()),
    ] {
        if value == 0 || value < UNBOUNDED {
            return Err(SelectionError::NonPositive {
                dimension,
                value: value.to_string(),
            });
        }
    }
    if !queue.fits_nodes(request.max_nodes()) {
        return Err(exceeds(
            Dimension::Nodes,
            request.max_nodes().to_string(),
            queue.max_nodes.to_string(),
        ));
    }
    if !queue.fits_processors(request.max_processors_per_node()) {
        return Err(exceeds(
            Dimension::ProcessorsPerNode,
            request.max_processors_per_node().to_string(),
            queue.max_processors_per_node.to_string(),
        ));
    }

    let memory = request.max_memory_per_node().ok_or(SelectionError::Unspecified {
        dimension: Dimension::MemoryPerNode,
    })?;
    if memory == 0.0 || memory < UNBOUNDED as f64 {
        return Err(SelectionError::NonPositive {
            dimension: Dimension::MemoryPerNode,
            value: memory.to_string(),
        });
    }
    if !queue.fits_memory(Some(memory)) {
        return Err(exceeds(
            Dimension::MemoryPerNode,
            memory.to_string(),
            queue.max_memory_per_node.to_string(),
        ));
    }

    let time = request.max_requested_time().ok_or(SelectionError::Unspecified {
        dimension: Dimension::RunTime,
    })?;
    if time.is_zero() {
        return Err(SelectionError::NonPositive {
            dimension: Dimension::RunTime,
            value: time.to_string(),
        });
    }
    if !queue.fits_time(Some(time)) {
        let limit = queue
            .max_requested_time
            .map(|t| t.to_string())
            .unwrap_or_default();
        return Err(exceeds(Dimension::RunTime, time.to_string(), limit));
    }

    Ok(())
}

/// Queue chosen for a job and the resources resolved against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSelection {
    pub queue: String,
    pub resources: JobResources,
}

/// Render a raw request value (string or number) for a resource setter.
fn raw_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// First non-blank value among `keys`, in order.
fn first_present(request: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| raw_text(request.get(*key)))
        .find(|v| !v.trim().is_empty())
}

/// Resolves the resource request and queue for one job request.
#[derive(Debug)]
pub struct QueueProcessor<'a> {
    software: &'a Software,
    system: &'a ExecutionSystem,
    ceiling: RunTime,
}

impl<'a> QueueProcessor<'a> {
    pub fn new(software: &'a Software, system: &'a ExecutionSystem, ceiling: RunTime) -> Self {
        Self {
            software,
            system,
            ceiling,
        }
    }

    /// Parse the resource fields of `request` against the software defaults.
    pub fn resource_request(&self, request: &Map<String, Value>) -> Result<ResourceRequest, ResourceError> {
        let mut resources = ResourceRequest::new(self.software.defaults.clone(), self.ceiling);
        resources.set_max_nodes(first_present(request, &["nodeCount"]).as_deref())?;
        resources.set_max_memory_per_node(
            first_present(request, &["memoryPerNode", "maxMemory"]).as_deref(),
        )?;
        resources.set_max_requested_time(
            first_present(request, &["maxRunTime", "requestedTime"]).as_deref(),
        )?;
        resources.set_max_processors_per_node(
            first_present(request, &["processorsPerNode", "processorCount"]).as_deref(),
        )?;
        Ok(resources)
    }

    pub fn process(&self, request: &Map<String, Value>) -> Result<QueueSelection, SelectionError> {
        let resources = self.resource_request(request)?;
        let queue = self.choose_queue(request, &resources)?;
        let resolved = resources.resolved_against(queue, self.ceiling);
        validate_batch_submit_parameters(queue, &resolved)?;

        debug!(
            system = %self.system.id,
            queue = %queue.name,
            nodes = resolved.max_nodes(),
            processors = resolved.max_processors_per_node(),
            "selected batch queue"
        );

        Ok(QueueSelection {
            queue: queue.name.clone(),
            resources: JobResources {
                node_count: resolved.max_nodes(),
                processors_per_node: resolved.max_processors_per_node(),
                memory_per_node: resolved.max_memory_per_node(),
                max_run_time: resolved.max_requested_time(),
            },
        })
    }

    fn choose_queue(
        &self,
        request: &Map<String, Value>,
        resources: &ResourceRequest,
    ) -> Result<&'a BatchQueue, SelectionError> {
        if let Some(name) = first_present(request, &["batchQueue", "queue"]) {
            let name = name.trim();
            return self.system.queue(name).ok_or_else(|| SelectionError::UnknownQueue {
                queue: name.to_string(),
                system: self.system.id.clone(),
            });
        }

        if let Some(name) = self
            .software
            .defaults
            .default_queue
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        {
            return self
                .system
                .queue(name)
                .ok_or_else(|| SelectionError::UnknownDefaultQueue {
                    software: self.software.id.clone(),
                    queue: name.to_string(),
                    system: self.system.id.clone(),
                });
        }

        let fits = |q: &BatchQueue| resources.compare_to(q) != Ordering::Greater;

        if let Some(default) = self.system.default_queue().filter(|q| fits(*q)) {
            return Ok(default);
        }

        self.system
            .queues
            .iter()
            .find(|q| !q.system_default && fits(*q))
            .ok_or_else(|| SelectionError::NoMatchingQueue {
                system: self.system.id.clone(),
                request: describe(resources),
            })
    }
}

fn describe(resources: &ResourceRequest) -> String {
    format!(
        "{} nodes with {} memory and {} processors per node, and a max run time of {}",
        resources.max_nodes(),
        resources
            .max_memory_per_node()
            .map(|m| format!("{}GB", m))
            .unwrap_or_else(|| "unspecified".to_string()),
        resources.max_processors_per_node(),
        resources
            .max_requested_time()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unspecified".to_string()),
    )
}
