#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::collapsible_if)]

//! Hierarchical free-energy homeostasis.
//!
//! Agents keep their body temperature viable by minimizing variational free
//! energy over a stack of belief levels expressed in generalized coordinates.

pub mod simulation;
pub mod ui;
