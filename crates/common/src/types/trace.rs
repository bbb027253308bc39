// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Execution trace data model.
//!
//! A [`TraceResult`] is one call frame of a transaction's execution. Frames nest:
//! every frame owns its sub-calls in execution order, and carries the path of
//! indices (`traceAddress`) leading from the root frame to itself.
//!
//! Nodes usually report traces in the flat, Parity-style layout where each
//! frame only knows its absolute address and the number of direct children.
//! [`TraceResult::from_flat`] rebuilds the tree from that layout.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A single call frame of an execution trace, with its nested sub-calls.
///
/// The length of [`TraceResult::trace_address`] equals the frame's depth from
/// the root, and every child's address is its parent's address followed by the
/// child's own position in [`TraceResult::subtraces`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceResult {
    /// Frame kind as reported by the node (`call`, `create`, `suicide`, `reward`)
    #[serde(rename = "type")]
    pub trace_type: String,
    /// Opaque action payload (caller, callee, value, input, ...)
    #[serde(default)]
    pub action: Value,
    /// Opaque result payload (gas used, output, created address, ...)
    #[serde(default)]
    pub result: Value,
    /// Direct child frames in execution order
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtraces: Vec<TraceResult>,
    /// Path of child indices from the root frame to this frame
    #[serde(rename = "traceAddress", default, deserialize_with = "null_as_default")]
    pub trace_address: Vec<usize>,
    /// Error message if the frame failed
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub error: Option<String>,
}

/// One frame of a flat, Parity-style trace as returned by `trace_transaction`.
///
/// Unlike [`TraceResult`], `subtraces` is the number of direct children and the
/// frame carries no nested frames.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatTrace {
    /// Frame kind
    #[serde(rename = "type")]
    pub trace_type: String,
    /// Opaque action payload
    #[serde(default)]
    pub action: Value,
    /// Opaque result payload
    #[serde(default)]
    pub result: Value,
    /// Number of direct children
    #[serde(default)]
    pub subtraces: usize,
    /// Absolute path of the frame in the tree
    #[serde(default, deserialize_with = "null_as_default")]
    pub trace_address: Vec<usize>,
    /// Error message if the frame failed
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub error: Option<String>,
}

/// Reasons a flat trace cannot be turned into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceTreeError {
    /// No frames at all
    #[error("trace contains no frames")]
    Empty,

    /// No frame with an empty trace address
    #[error("trace has no root frame")]
    MissingRoot,

    /// More than one frame with an empty trace address
    #[error("trace has more than one root frame")]
    MultipleRoots,

    /// A frame whose parent address is not part of the trace
    #[error("frame {address:?} has no parent frame")]
    MissingParent {
        /// Address of the orphaned frame
        address: Vec<usize>,
    },

    /// A frame whose index skips or repeats a sibling position
    #[error("frame {address:?} is out of order, expected index {expected}")]
    UnexpectedIndex {
        /// Address of the offending frame
        address: Vec<usize>,
        /// Index the next child of the parent should have
        expected: usize,
    },

    /// The declared number of children does not match the frames present
    #[error("frame {address:?} declares {declared} subtraces but has {actual}")]
    SubtraceCountMismatch {
        /// Address of the frame
        address: Vec<usize>,
        /// Child count reported by the node
        declared: usize,
        /// Child count found in the trace
        actual: usize,
    },
}

impl TraceResult {
    /// Create a leaf frame at the root position
    pub fn new(trace_type: impl Into<String>, action: Value, result: Value) -> Self {
        Self { trace_type: trace_type.into(), action, result, ..Default::default() }
    }

    /// Attach an error message to the frame
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Append `child` as the next sub-call, rewriting the addresses of its whole subtree.
    pub fn push_subtrace(&mut self, mut child: Self) {
        let mut address = self.trace_address.clone();
        address.push(self.subtraces.len());
        child.assign_addresses(address);
        self.subtraces.push(child);
    }

    /// Rebuild a trace tree from flat, Parity-style frames.
    ///
    /// Frames may arrive in any order. Each one is attached under the frame whose
    /// address is its own address without the last index.
    pub fn from_flat(mut frames: Vec<FlatTrace>) -> Result<Self, TraceTreeError> {
        // Lexicographic order puts every parent before its children and siblings in index order
        frames.sort_by(|a, b| a.trace_address.cmp(&b.trace_address));

        let mut frames = frames.into_iter();
        let root_frame = frames.next().ok_or(TraceTreeError::Empty)?;
        if !root_frame.trace_address.is_empty() {
            return Err(TraceTreeError::MissingRoot);
        }

        let mut declared = vec![(Vec::new(), root_frame.subtraces)];
        let mut root = Self::from(root_frame);

        for frame in frames {
            let Some((&index, parent_address)) = frame.trace_address.split_last() else {
                return Err(TraceTreeError::MultipleRoots);
            };

            let parent = root.frame_mut(parent_address).ok_or_else(|| {
                TraceTreeError::MissingParent { address: frame.trace_address.clone() }
            })?;

            let expected = parent.subtraces.len();
            if index != expected {
                return Err(TraceTreeError::UnexpectedIndex {
                    address: frame.trace_address.clone(),
                    expected,
                });
            }

            declared.push((frame.trace_address.clone(), frame.subtraces));
            parent.subtraces.push(Self::from(frame));
        }

        for (address, count) in declared {
            let actual = root.frame(&address).map(|f| f.subtraces.len()).unwrap_or_default();
            if actual != count {
                return Err(TraceTreeError::SubtraceCountMismatch {
                    address,
                    declared: count,
                    actual,
                });
            }
        }

        Ok(root)
    }

    /// Look up the frame at `address`, relative to this frame.
    pub fn frame(&self, address: &[usize]) -> Option<&Self> {
        address.iter().try_fold(self, |frame, &index| frame.subtraces.get(index))
    }

    /// Mutable variant of [`TraceResult::frame`].
    pub fn frame_mut(&mut self, address: &[usize]) -> Option<&mut Self> {
        address.iter().try_fold(self, |frame, &index| frame.subtraces.get_mut(index))
    }

    /// Total number of frames in this subtree, including this one.
    pub fn frame_count(&self) -> usize {
        1 + self.subtraces.iter().map(Self::frame_count).sum::<usize>()
    }

    /// Treat this frame as the root and rewrite every address from the tree shape.
    pub fn reindex(&mut self) {
        self.assign_addresses(Vec::new());
    }

    /// Whether every address in this tree agrees with the tree shape, taking
    /// this frame's own address as the starting point.
    pub fn has_consistent_addresses(&self) -> bool {
        self.subtraces.iter().enumerate().all(|(index, child)| {
            child.trace_address.len() == self.trace_address.len() + 1
                && child.trace_address.starts_with(&self.trace_address)
                && child.trace_address.last() == Some(&index)
                && child.has_consistent_addresses()
        })
    }

    fn assign_addresses(&mut self, address: Vec<usize>) {
        for (index, child) in self.subtraces.iter_mut().enumerate() {
            let mut child_address = address.clone();
            child_address.push(index);
            child.assign_addresses(child_address);
        }
        self.trace_address = address;
    }
}

impl From<FlatTrace> for TraceResult {
    fn from(frame: FlatTrace) -> Self {
        Self {
            trace_type: frame.trace_type,
            action: frame.action,
            result: frame.result,
            subtraces: Vec::new(),
            trace_address: frame.trace_address,
            error: frame.error,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}
