pub const RESOLUTION_ERROR: &str = "RESOLUTION_ERROR";
pub const TRANSFORM_ERROR: &str = "TRANSFORM_ERROR";
pub const STYLE_EVAL_ERROR: &str = "STYLE_EVAL_ERROR";
pub const SPLIT_CONFLICT: &str = "SPLIT_CONFLICT";
pub const EMISSION_ERROR: &str = "EMISSION_ERROR";
pub const UNRESOLVED_ENTRY: &str = "UNRESOLVED_ENTRY";
pub const PANIC: &str = "PANIC";
pub const IO_ERROR: &str = "IO_ERROR";
