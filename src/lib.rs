//! Staged runners for Cowan's atomic-structure programs `rcn`, `rcn2` and
//! `ttrcg`. The programs read and write fixed `fort.*` files in their working
//! directory; a [stage::Stage] links `<name>.<ext>` into those slots, runs the
//! program, and renames what it wrote back to `<name>.<ext>`.
//!
//! Only one run may use a working directory at a time. Runners in this crate
//! enforce that with a lock file: a [stage::Stage] holds it while it runs, a
//! [pipeline::Pipeline] holds it from the first stage to the last, including
//! the input rewrites in between, and [pipeline::remove_calculation_files]
//! holds it while deleting. Other processes touching the directory are not
//! excluded.

pub mod cli;
pub mod config;
pub mod lock;
pub mod pipeline;
pub mod program;
pub mod slot;
pub mod stage;
