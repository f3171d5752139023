//! CLI command implementations.
//!
//! | Module  | Commands handled |
//! |---------|------------------|
//! | `run`   | `Run`            |
//! | `serve` | `Serve`          |

pub mod run;
pub mod serve;

pub use run::cmd_run;
pub use serve::cmd_serve;
