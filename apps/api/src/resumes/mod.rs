// Resume lifecycle: owner-scoped CRUD plus the improve/versioning path.
// Handlers stay thin; every rule lives in `workflow`.

pub mod handlers;
pub mod improver;
pub mod workflow;
