//! Pipeline authoring for Gofer.
//!
//! Build a [`Pipeline`] out of [`Task`]s and call [`Pipeline::finish`]; the
//! definition is validated (ids, dependencies, no cycles) before it is
//! written out as the JSON document the host registers.
//!
//! ```no_run
//! use gofer_sdk::{Pipeline, RequiredParentStatus, Task};
//!
//! Pipeline::new("release", "Release")
//!     .description("Build then publish")
//!     .task(Task::new("build", "rust:1.85").command(["cargo", "build", "--release"]))
//!     .task(
//!         Task::new("publish", "alpine")
//!             .depends_on("build", RequiredParentStatus::Success)
//!             .inject_api_token(true),
//!     )
//!     .finish()
//!     .unwrap();
//! ```

pub mod dag;
pub mod error;
pub mod pipeline;
pub mod task;

pub use error::SdkError;
pub use pipeline::Pipeline;
pub use task::{RegistryAuth, RequiredParentStatus, Task};
