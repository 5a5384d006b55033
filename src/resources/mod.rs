//! Requested compute resources.
//!
//! A [`ResourceRequest`] is bound to a software definition: blank request
//! values inherit the software defaults, everything else is parsed strictly.
//! `-1` means "defer to the queue" for nodes, processors and memory.

mod time;

pub use time::{InvalidRunTime, RunTime};

use std::cmp::Ordering;

use crate::catalog::SoftwareDefaults;
use crate::selection::BatchQueue;

/// Sentinel for "unbounded" / "defer to the queue".
pub const UNBOUNDED: i64 = -1;

/// Errors for resource values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResourceError {
    #[error("Invalid {origin}nodeCount '{value}'. If specified, nodeCount must be a positive integer value.")]
    InvalidNodeCount { origin: &'static str, value: String },

    #[error("Invalid {origin}processorsPerNode value '{value}'. processorsPerNode must be a positive integer value.")]
    InvalidProcessorCount { origin: &'static str, value: String },

    #[error("Invalid {origin}memoryPerNode '{value}'. memoryPerNode should be a positive value specified in ###.#[EPTGM]B format.")]
    InvalidMemory { origin: &'static str, value: String },

    #[error("Invalid {origin}maxRunTime '{value}'. maxRunTime should be the maximum run time for this job in hh:mm:ss format.")]
    InvalidRunTime { origin: &'static str, value: String },

    #[error("Invalid maxRunTime '{value}'. maxRunTime may not exceed {ceiling}.")]
    RunTimeExceedsCeiling { value: String, ceiling: RunTime },
}

fn origin(from_default: bool) -> &'static str {
    if from_default {
        "default "
    } else {
        ""
    }
}

/// Parse a positive integer count or the `-1` sentinel.
pub fn parse_count(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() || !value.trim_start_matches(['-', '+']).bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let count: i64 = value.parse().ok()?;
    (count >= 1 || count == UNBOUNDED).then_some(count)
}

/// Parse a memory quantity into GB.
///
/// Accepts `-1`, a bare positive number of GB, or a number followed by a
/// magnitude `E`, `P`, `T`, `G` or `M` and an optional `B` (`512MB`, `2GB`,
/// `1.5T`).
pub fn parse_memory(value: &str) -> Option<f64> {
    let value = value.trim();
    if value == "-1" {
        return Some(UNBOUNDED as f64);
    }

    let (number, scale) = match value.trim_end_matches(['B', 'b']) {
        stripped if stripped.len() < value.len() || ends_with_magnitude(stripped) => {
            let mut chars = stripped.chars();
            let unit = chars.next_back()?;
            (chars.as_str().trim(), magnitude(unit)?)
        }
        _ => (value, 1.0),
    };

    if number.is_empty()
        || !number
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b'.' || b == b'e' || b == b'E' || b == b'+' || b == b'-')
    {
        return None;
    }

    let gb = number.parse::<f64>().ok()? * scale;
    (gb.is_finite() && gb > 0.0).then_some(gb)
}

fn ends_with_magnitude(value: &str) -> bool {
    value
        .chars()
        .last()
        .is_some_and(|c| magnitude(c).is_some())
}

fn magnitude(unit: char) -> Option<f64> {
    match unit.to_ascii_uppercase() {
        'M' => Some(1.0 / 1024.0),
        'G' => Some(1.0),
        'T' => Some(1024.0),
        'P' => Some(1024.0 * 1024.0),
        'E' => Some(1024.0 * 1024.0 * 1024.0),
        _ => None,
    }
}

/// Compare one bounded dimension against a queue limit.
///
/// A queue limit of `-1` is unbounded; a request of `-1` defers to the
/// queue and therefore always fits.
fn compare_limit(request: f64, limit: f64) -> Ordering {
    let request_unbounded = request == UNBOUNDED as f64;
    if limit == UNBOUNDED as f64 {
        return if request_unbounded {
            Ordering::Equal
        } else {
            Ordering::Less
        };
    }
    if request_unbounded {
        return Ordering::Less;
    }
    request.partial_cmp(&limit).unwrap_or(Ordering::Greater)
}

fn compare_time(request: Option<RunTime>, limit: Option<RunTime>) -> Ordering {
    match (request, limit) {
        (None, None) => Ordering::Equal,
        (_, None) | (None, Some(_)) => Ordering::Less,
        (Some(request), Some(limit)) => request.cmp(&limit),
    }
}

/// Fold per-dimension comparisons: all equal is a match, any dimension over
/// the limit is too big, otherwise the queue has room to spare.
pub(crate) fn fold_comparisons(dimensions: &[Ordering]) -> Ordering {
    if dimensions.iter().all(|d| *d == Ordering::Equal) {
        Ordering::Equal
    } else if dimensions.iter().any(|d| *d == Ordering::Greater) {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

/// Compute resources requested for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRequest {
    defaults: SoftwareDefaults,
    ceiling: RunTime,
    max_nodes: i64,
    max_processors_per_node: i64,
    max_memory_per_node: Option<f64>,
    max_requested_time: Option<RunTime>,
}

impl ResourceRequest {
    /// A request with every dimension at its software default.
    pub fn new(defaults: SoftwareDefaults, ceiling: RunTime) -> Self {
        Self {
            max_nodes: defaults.default_nodes.filter(|n| *n != UNBOUNDED).unwrap_or(1),
            max_processors_per_node: defaults.default_processors_per_node.unwrap_or(1),
            max_memory_per_node: None,
            max_requested_time: None,
            defaults,
            ceiling,
        }
    }

    pub fn max_nodes(&self) -> i64 {
        self.max_nodes
    }

    pub fn max_processors_per_node(&self) -> i64 {
        self.max_processors_per_node
    }

    /// GB per node; `None` when unspecified.
    pub fn max_memory_per_node(&self) -> Option<f64> {
        self.max_memory_per_node
    }

    pub fn max_requested_time(&self) -> Option<RunTime> {
        self.max_requested_time
    }

    pub fn set_max_nodes(&mut self, value: Option<&str>) -> Result<(), ResourceError> {
        let (value, from_default) = match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => (v.to_string(), false),
            None => {
                let default = self.defaults.default_nodes.filter(|n| *n != UNBOUNDED).unwrap_or(1);
                (default.to_string(), true)
            }
        };

        self.max_nodes = parse_count(&value).ok_or(ResourceError::InvalidNodeCount {
            origin: origin(from_default),
            value,
        })?;
        Ok(())
    }

    pub fn set_max_processors_per_node(&mut self, value: Option<&str>) -> Result<(), ResourceError> {
        let (value, from_default) = match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => (v.to_string(), false),
            None => {
                let default = self.defaults.default_processors_per_node.unwrap_or(1);
                (default.to_string(), true)
            }
        };

        self.max_processors_per_node = parse_count(&value).ok_or(ResourceError::InvalidProcessorCount {
            origin: origin(from_default),
            value,
        })?;
        Ok(())
    }

    pub fn set_max_memory_per_node(&mut self, value: Option<&str>) -> Result<(), ResourceError> {
        let (value, from_default) = match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => (v.to_string(), false),
            None => match self.defaults.default_memory_per_node {
                Some(default) => (default.to_string(), true),
                None => {
                    self.max_memory_per_node = None;
                    return Ok(());
                }
            },
        };

        let memory = parse_memory(&value).ok_or(ResourceError::InvalidMemory {
            origin: origin(from_default),
            value,
        })?;
        self.max_memory_per_node = Some(memory);
        Ok(())
    }

    pub fn set_max_requested_time(&mut self, value: Option<&str>) -> Result<(), ResourceError> {
        let (value, from_default) = match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => (v.to_string(), false),
            None => match self.defaults.default_max_run_time.as_deref().map(str::trim) {
                Some(default) if !default.is_empty() => (default.to_string(), true),
                _ => {
                    self.max_requested_time = None;
                    return Ok(());
                }
            },
        };

        let time: RunTime = value.parse().map_err(|_| ResourceError::InvalidRunTime {
            origin: origin(from_default),
            value: value.clone(),
        })?;
        if time > self.ceiling {
            return Err(ResourceError::RunTimeExceedsCeiling {
                value,
                ceiling: self.ceiling,
            });
        }
        self.max_requested_time = Some(time);
        Ok(())
    }

    /// Copy of this request with deferred (`-1`) and unspecified dimensions
    /// taken from `queue`. A queue without a time limit yields `ceiling`.
    pub fn resolved_against(&self, queue: &BatchQueue, ceiling: RunTime) -> ResourceRequest {
        let mut resolved = self.clone();
        if resolved.max_nodes == UNBOUNDED {
            resolved.max_nodes = queue.max_nodes;
        }
        if resolved.max_processors_per_node == UNBOUNDED {
            resolved.max_processors_per_node = queue.max_processors_per_node;
        }
        if resolved
            .max_memory_per_node
            .map_or(true, |m| m == UNBOUNDED as f64)
        {
            resolved.max_memory_per_node = Some(queue.max_memory_per_node);
        }
        if resolved.max_requested_time.is_none() {
            resolved.max_requested_time = Some(queue.max_requested_time.unwrap_or(ceiling));
        }
        resolved
    }

    /// Compare this request with a queue's limits across all four
    /// dimensions.
    ///
    /// `Equal` when every dimension matches exactly, `Greater` when any
    /// dimension exceeds the queue, `Less` otherwise.
    pub fn compare_to(&self, queue: &BatchQueue) -> Ordering {
        fold_comparisons(&[
            compare_limit(self.max_nodes as f64, queue.max_nodes as f64),
            compare_limit(
                self.max_memory_per_node.unwrap_or(UNBOUNDED as f64),
                queue.max_memory_per_node,
            ),
            compare_limit(
                self.max_processors_per_node as f64,
                queue.max_processors_per_node as f64,
            ),
            compare_time(self.max_requested_time, queue.max_requested_time),
        ])
    }
}
