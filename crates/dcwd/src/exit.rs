// Process exit codes consumed by the deployment's service wrapper.
pub const SUCCESS: i32 = 0;
/// Fatal device-link or setup failure.
pub const FAILURE: i32 = 1;
/// No DC-01 attached.
pub const NO_DEVICE: i32 = 2;
/// More than one DC-01 attached and no endpoint pinned.
pub const AMBIGUOUS_DEVICE: i32 = 3;
