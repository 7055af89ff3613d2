//! Target programs and the fixed text they print.
//!
//! These strings are the output contract of programs outside this
//! repository; they must match what those programs emit byte for byte.

/// Program that only starts the runtime, so its container trace is printed.
pub const HELLO: &str = "HelloDocker";

/// Program printing the runtime's view of container limits.
pub const PRINT_CONTAINER_INFO: &str = "PrintContainerInfo";

/// Program allocating a given number of mebibytes.
pub const ATTEMPT_OOM: &str = "AttemptOOM";

/// Program printing the metrics API's memory and swap figures.
pub const CHECK_OS_MXBEAN: &str = "CheckOperatingSystemMXBean";

/// Runtime option enabling container detection trace output.
pub const CONTAINER_TRACE_OPTION: &str = "-Xlog:os+container=trace";

/// Runtime options enabling the diagnostics API used by [`PRINT_CONTAINER_INFO`].
pub const WHITEBOX_OPTIONS: [&str; 3] = [
    "-Xbootclasspath/a:/test-classes/whitebox.jar",
    "-XX:+UnlockDiagnosticVMOptions",
    "-XX:+WhiteBoxAPI",
];

/// Runtime options exposing internal platform metrics to [`CHECK_OS_MXBEAN`].
pub const METRICS_EXPORT_OPTIONS: [&str; 2] =
    ["--add-exports", "java.base/jdk.internal.platform=ALL-UNNAMED"];

/// Trace line prefix for the detected hard limit.
pub const MEMORY_LIMIT_TRACE: &str = "Memory Limit is:";

/// Trace line prefix for the detected soft limit.
pub const MEMORY_SOFT_LIMIT_TRACE: &str = "Memory Soft Limit";

/// Printed by [`ATTEMPT_OOM`] on entry.
pub const OOM_START_MARKER: &str = "Entering AttemptOOM main";

/// Printed by [`ATTEMPT_OOM`] only if every allocation succeeded.
pub const OOM_SUCCESS_MARKER: &str = "AttemptOOM allocation successful";

/// Printed by the runtime when an allocation fails.
pub const OOM_ERROR: &str = "java.lang.OutOfMemoryError";

/// Printed by [`CHECK_OS_MXBEAN`] on entry.
pub const MXBEAN_BANNER: &str = "Checking OperatingSystemMXBean";

/// Line prefix for total physical memory.
pub const MXBEAN_TOTAL_PHYSICAL: &str = "OperatingSystemMXBean.getTotalPhysicalMemorySize: ";

/// Line prefix for total swap.
pub const MXBEAN_TOTAL_SWAP: &str = "OperatingSystemMXBean.getTotalSwapSpaceSize: ";

/// Pattern capturing the host's physical memory from the container trace.
pub const TOTAL_PHYSICAL_PATTERN: &str = r"total physical memory: (\d+)";
