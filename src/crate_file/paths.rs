//! PATHS section: reconstruction of the path hierarchy.
//!
//! Paths are stored as a pre-order flattening of the path tree in three
//! parallel integer arrays:
//!
//! - `path_indices[i]`: output slot of the node at logical position `i`
//! - `element_token_indices[i]`: token of the node's last element,
//!   negated for property elements (ignored for the root)
//! - `jumps[i]`: where the node's child and next sibling are, see [`Jump`]
//!
//! ```text
//! u64 path count
//! u64 path count (again, must match)
//! compressed u32 path indices
//! compressed i32 element token indices
//! compressed i32 jumps
//! ```

use super::integer_coding::read_compressed_integers;
use super::streams::ByteCursor;
use crate::sdf::{Path, Token};
use crate::util::{Error, Result};

/// Decoded jump value of one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Jump {
    /// No child, no sibling (`<= -2`).
    Leaf,
    /// Child at the next position, no sibling (`-1`).
    ChildOnly,
    /// Sibling at the next position, no child (`0`).
    SiblingOnly,
    /// Child at the next position, sibling `offset` positions ahead (`> 0`).
    ChildAndSibling(usize),
}

impl Jump {
    pub fn from_raw(jump: i32) -> Self {
        match jump {
            -1 => Self::ChildOnly,
            0 => Self::SiblingOnly,
            j if j > 0 => Self::ChildAndSibling(j as usize),
            _ => Self::Leaf,
        }
    }

    pub fn has_child(&self) -> bool {
        matches!(self, Self::ChildOnly | Self::ChildAndSibling(_))
    }

    pub fn has_sibling(&self) -> bool {
        matches!(self, Self::SiblingOnly | Self::ChildAndSibling(_))
    }
}

/// Read the PATHS section at the cursor.
pub fn read_paths(cursor: &mut ByteCursor<'_>, tokens: &[Token]) -> Result<Vec<Path>> {
    let num_paths = cursor.read_u64()?;
    let num_paths_again = cursor.read_u64()?;
    if num_paths != num_paths_again {
        return Err(Error::invalid(format!(
            "path count mismatch: {} vs {}",
            num_paths, num_paths_again
        )));
    }
    let num_paths = usize::try_from(num_paths)
        .map_err(|_| Error::invalid(format!("path count {} too large", num_paths)))?;

    let path_indices = read_compressed_integers::<u32, i32>(cursor, num_paths)?;
    let element_token_indices = read_compressed_integers::<i32, i32>(cursor, num_paths)?;
    let jumps = read_compressed_integers::<i32, i32>(cursor, num_paths)?;

    let paths = build_paths(&path_indices, &element_token_indices, &jumps, tokens)?;
    tracing::debug!(count = paths.len(), "read paths");
    Ok(paths)
}

/// Rebuild every path from the three parallel arrays.
///
/// The walk is depth first from logical position 0. A node's child
/// continues the current run with the node as parent; a sibling subtree is
/// queued with the node's own parent. Every output slot must be written
/// exactly once.
pub fn build_paths(
    path_indices: &[u32],
    element_token_indices: &[i32],
    jumps: &[i32],
    tokens: &[Token],
) -> Result<Vec<Path>> {
    let n = path_indices.len();
    if element_token_indices.len() != n || jumps.len() != n {
        return Err(Error::invalid(format!(
            "path arrays differ in length: {}, {}, {}",
            n,
            element_token_indices.len(),
            jumps.len()
        )));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut slots: Vec<Option<Path>> = vec![None; n];
    let mut filled = 0usize;
    // (logical position, parent); `None` parent marks the root.
    let mut pending: Vec<(usize, Option<Path>)> = vec![(0, None)];

    while let Some((start, parent)) = pending.pop() {
        let mut index = start;
        let mut parent = parent;

        loop {
            if index >= n {
                return Err(Error::out_of_bounds("path position", index as u64, n));
            }
            let slot = path_indices[index] as usize;
            if slot >= n {
                return Err(Error::out_of_bounds("path slot", path_indices[index], n));
            }
            if slots[slot].is_some() {
                return Err(Error::invalid(format!("path slot {} written twice", slot)));
            }

            let path = match &parent {
                None => Path::absolute_root(),
                Some(parent) => {
                    let element = element_token_indices[index];
                    let token = tokens.get(element.unsigned_abs() as usize).ok_or_else(|| {
                        Error::out_of_bounds("path element token", element.unsigned_abs(), tokens.len())
                    })?;
                    if element < 0 {
                        parent.append_property(token)?
                    } else {
                        parent.append_child(token)?
                    }
                }
            };
            slots[slot] = Some(path.clone());
            filled += 1;

            // Siblings of the root hang off the root itself.
            let sibling_parent = parent.unwrap_or_else(|| path.clone());

            match Jump::from_raw(jumps[index]) {
                Jump::Leaf => break,
                Jump::SiblingOnly => {
                    parent = Some(sibling_parent);
                }
                Jump::ChildOnly => {
                    parent = Some(path);
                }
                Jump::ChildAndSibling(offset) => {
                    pending.push((index + offset, Some(sibling_parent)));
                    parent = Some(path);
                }
            }
            index += 1;
        }
    }

    if filled != n {
        return Err(Error::invalid(format!(
            "path tree covers {} of {} slots",
            filled, n
        )));
    }
    Ok(slots.into_iter().flatten().collect())
}
