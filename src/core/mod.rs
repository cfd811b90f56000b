//! Core data types for alignment classification.
//!
//! This module provides the values the alignment walker operates on:
//!
//! - [`Cigar`] / [`CigarOp`] / [`OpKind`]: decoded alignment operations
//! - [`Base`]: a read base in the 4-bit IUPAC alphabet
//! - [`AlignmentRecord`]: one read with its placement, operations, bases and qualities
//! - [`ReferenceSlice`]: reference bases for one target sequence
//! - [`ClassificationCounters`], [`RunSummary`]: results
//!
//! ## Operation alphabet
//!
//! | Code | Symbol | Consumes query | Consumes reference |
//! |------|--------|----------------|--------------------|
//! | 0    | M      | yes            | yes                |
//! | 1    | I      | yes            | no                 |
//! | 2    | D      | no             | yes                |
//! | 3    | N      | no             | yes                |
//! | 4    | S      | yes            | no                 |
//! | 5    | H      | no             | no                 |
//! | 6    | P      | no             | no                 |
//! | 7    | =      | yes            | yes                |
//! | 8    | X      | yes            | yes                |

pub mod base;
pub mod cigar;
pub mod record;
pub mod reference;
pub mod types;

pub use base::Base;
pub use cigar::{Cigar, CigarOp, OpKind};
pub use record::AlignmentRecord;
pub use reference::ReferenceSlice;
pub use types::{ClassificationCounters, RunSummary};
