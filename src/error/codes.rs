/// Error code registry for the batch controller
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Workload and task-graph errors
/// - 3000-3999: Job submission errors
/// - 4000-4999: Pool management errors
/// - 7000-7999: Validation errors
/// - 9000-9999: Other errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_YAML: u16 = 1002;
    pub const CONFIG_INVALID_JSON: u16 = 1003;
    pub const CONFIG_MISSING_REQUIRED: u16 = 1004;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;
    pub const CONFIG_IO_ERROR: u16 = 1006;

    // Workload errors (2000-2999)
    pub const WORKLOAD_INVALID_PARTITION: u16 = 2001;
    pub const WORKLOAD_ARITY_MISMATCH: u16 = 2002;
    pub const WORKLOAD_UNSUPPORTED_PARAMETER: u16 = 2003;
    pub const WORKLOAD_INVALID_PROBABILITY: u16 = 2004;
    pub const WORKLOAD_UNKNOWN_STAGE: u16 = 2005;
    pub const WORKLOAD_DUPLICATE_STAGE: u16 = 2006;
    pub const WORKLOAD_EMPTY: u16 = 2007;
    pub const WORKLOAD_INVALID_GRAPH: u16 = 2008;

    // Job submission errors (3000-3999)
    pub const SUBMIT_JOB_EXISTS: u16 = 3001;
    pub const SUBMIT_NOT_FOUND: u16 = 3002;
    pub const SUBMIT_UNAUTHORIZED: u16 = 3003;
    pub const SUBMIT_REJECTED: u16 = 3004;
    pub const SUBMIT_TRANSPORT: u16 = 3005;
    pub const SUBMIT_TASK_FAILED: u16 = 3006;

    // Pool errors (4000-4999)
    pub const POOL_NOT_FOUND: u16 = 4001;
    pub const POOL_RESIZE_FAILED: u16 = 4002;

    // Validation errors (7000-7999)
    pub const VALIDATION_GENERIC: u16 = 7000;
    pub const VALIDATION_REQUIRED_FIELD: u16 = 7001;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        // Configuration errors
        1001 => "Configuration file not found",
        1002 => "Invalid YAML syntax in configuration",
        1003 => "Invalid JSON syntax",
        1004 => "Required configuration field is missing",
        1005 => "Invalid value in configuration",
        1006 => "Failed to read configuration",

        // Workload errors
        2001 => "Work range cannot be partitioned",
        2002 => "Positional dependency between stages of unequal size",
        2003 => "Parameter not supported by the selected algorithm",
        2004 => "Failure probability out of range",
        2005 => "Stage depends on an unknown stage",
        2006 => "Stage declared more than once",
        2007 => "Workflow or stage has no tasks",
        2008 => "Task graph is malformed",

        // Job submission errors
        3001 => "Job already exists",
        3002 => "Job not found",
        3003 => "Batch service rejected the credentials",
        3004 => "Batch service rejected the request",
        3005 => "Could not reach the batch service",
        3006 => "One or more tasks were not added",

        // Pool errors
        4001 => "Pool not found",
        4002 => "Pool resize failed",

        // Validation errors
        7000 => "Generic validation error",
        7001 => "Required field is missing",

        // Other errors
        9000 => "Generic error",

        _ => "Unknown error code",
    }
}
