//! System-wide constants and defaults.

/// Application name used in CLI output and container names.
pub const APP_NAME: &str = "memaware";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "memaware";

/// Default container engine CLI.
pub const DEFAULT_ENGINE: &str = "docker";

/// Default tag for the image the scenarios run in.
pub const DEFAULT_IMAGE_NAME: &str = "memaware-test:memory";

/// Default base image the test image is built from.
pub const DEFAULT_BASE_IMAGE: &str = "oraclelinux:8";

/// Location of the runtime inside the test image.
pub const IMAGE_RUNTIME_HOME: &str = "/jdk";

/// Default runtime launcher inside the test image.
pub const DEFAULT_LAUNCHER: &str = "/jdk/bin/java";

/// Mount point of the target-program directory inside the container.
pub const CONTAINER_PROGRAM_DIR: &str = "/test-classes/";

/// File name of the diagnostics jar staged next to the target programs.
pub const WHITEBOX_JAR: &str = "whitebox.jar";

/// Default supervising timeout for one container run, in seconds.
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 300;

/// Grace period between `SIGTERM` and `SIGKILL` for a hung client.
pub const KILL_GRACE_MILLIS: u64 = 2_000;

/// Poll interval while waiting on a child process.
pub const POLL_INTERVAL_MILLIS: u64 = 50;

/// Engine exit code: the engine itself failed to create the container.
pub const ENGINE_EXIT_DAEMON_ERROR: i32 = 125;

/// Engine exit code: the entry program could not be invoked.
pub const ENGINE_EXIT_CANNOT_INVOKE: i32 = 126;

/// Engine exit code: the entry program was not found.
pub const ENGINE_EXIT_NOT_FOUND: i32 = 127;

/// Number of trailing output lines kept in failure excerpts.
pub const EXCERPT_LINES: usize = 40;
