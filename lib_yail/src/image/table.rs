//! Run compression of encoded blocks into the table stream.
//!
//! Blocks sharing identical key bytes form one group; a group is emitted
//! as its key, its first 1-indexed grid coordinate, and then one entry
//! per further occurrence: a continuation token when the occurrence
//! sits at the traversal successor of the previous one, an explicit
//! coordinate otherwise. A delimiter token closes each group.

use std::collections::HashMap;

use log::debug;

use super::blocks::EncodedBlock;
use super::format::Mode;

/// Logical unit of the compressed table. Reserved tokens stay out of
/// band until serialization so they can never collide with data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableToken {
    /// Literal key or coordinate byte.
    Byte(u8),
    /// The previous key repeats at the successor coordinate.
    Continuation,
    /// End of the current group.
    EndGroup,
}

/// 1-indexed block grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coord {
    pub col: u8,
    pub row: u8,
}

impl Coord {
    /// Coordinate of the n-th block (1-indexed) in traversal order.
    fn from_block_number(n: usize, grid_width: usize) -> Coord {
        Coord {
            col: ((n - 1) % grid_width + 1) as u8,
            row: ((n - 1) / grid_width + 1) as u8,
        }
    }

    /// The next block position in traversal order.
    fn successor(self, grid_width: usize) -> Coord {
        if (self.col as usize) < grid_width {
            Coord {
                col: self.col + 1,
                row: self.row,
            }
        } else {
            Coord {
                col: 1,
                row: self.row + 1,
            }
        }
    }

    /// Numeric emission key: row, then column.
    fn sort_key(self) -> u32 {
        self.row as u32 * 1000 + self.col as u32
    }
}

/// Groups the encoded blocks by key and emits the token stream.
///
/// Groups are ordered by their first coordinate's numeric key,
/// descending. First coordinates are unique across groups, so the order
/// is total; the numeric row-then-column form is the documented rule.
pub fn compress(blocks: &[EncodedBlock], grid_width: usize, mode: Mode) -> Vec<TableToken> {
    let mut groups: Vec<(Vec<u8>, Vec<Coord>)> = Vec::new();
    let mut group_of: HashMap<Vec<u8>, usize> = HashMap::new();
    for (i, block) in blocks.iter().enumerate() {
        let key = block.key_bytes(mode);
        let coord = Coord::from_block_number(i + 1, grid_width);
        match group_of.get(&key) {
            Some(&group) => groups[group].1.push(coord),
            None => {
                group_of.insert(key.clone(), groups.len());
                groups.push((key, vec![coord]));
            }
        }
    }

    groups.sort_by(|a, b| b.1[0].sort_key().cmp(&a.1[0].sort_key()));

    let mut tokens = Vec::new();
    for (key, coords) in &groups {
        tokens.extend(key.iter().map(|&byte| TableToken::Byte(byte)));
        let mut previous: Option<Coord> = None;
        for &coord in coords {
            match previous {
                Some(prev) if prev.successor(grid_width) == coord => {
                    tokens.push(TableToken::Continuation);
                }
                _ => {
                    tokens.push(TableToken::Byte(coord.col));
                    tokens.push(TableToken::Byte(coord.row));
                }
            }
            previous = Some(coord);
        }
        tokens.push(TableToken::EndGroup);
    }

    debug!("Table: {} groups, {} tokens", groups.len(), tokens.len());
    tokens
}
