//! Command-line configuration.

use crate::prebuild::BuildStep;
use clap::{ArgAction, Args, Parser, ValueEnum};
use mcpcheck_testing::{RunOptions, TestScenario, fixtures};
use mcpcheck_transport::ServerProcessBuilder;
use std::path::PathBuf;
use std::time::Duration;

/// Conformance harness for stdio MCP prompt servers.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcpcheck", author, version, about)]
pub struct Cli {
    /// Server executable to launch
    #[arg(
        long,
        env = "MCPCHECK_SERVER",
        value_name = "PATH",
        default_value = "./gemara-mcp-server"
    )]
    pub server: PathBuf,

    /// Scenario to run
    #[arg(long, value_enum, default_value_t = Suite::Full)]
    pub suite: Suite,

    /// Pre-run build flags.
    #[command(flatten)]
    pub build: BuildArgs,

    /// Time bounds.
    #[command(flatten)]
    pub timing: TimingArgs,

    /// Verbosity flags.
    #[command(flatten)]
    pub logging: LoggingArgs,
}

/// Built-in scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Suite {
    /// Handshake, listing and one prompt retrieval.
    Smoke,
    /// Prompt catalog and parameterized rendering.
    Prompts,
    /// Every step.
    Full,
}

impl Suite {
    /// The scenario this suite runs.
    #[must_use]
    pub fn scenario(self) -> TestScenario {
        match self {
            Self::Smoke => fixtures::smoke_scenario(),
            Self::Prompts => fixtures::prompts_scenario(),
            Self::Full => fixtures::full_scenario(),
        }
    }
}

/// The optional pre-run build step.
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Build the server before running
    #[arg(long = "build")]
    pub enabled: bool,

    /// Build tool, invoked as `<tool> build -o <server> <target>`
    #[arg(long = "build-tool", value_name = "CMD", default_value = "go")]
    pub tool: String,

    /// Build target passed to the build tool
    #[arg(
        long = "build-target",
        value_name = "TARGET",
        default_value = "./cmd/gemara-mcp-server"
    )]
    pub target: String,

    /// Directory to run the build tool in
    #[arg(long = "build-dir", value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

/// Time bounds.
#[derive(Args, Debug, Clone)]
pub struct TimingArgs {
    /// Seconds to wait for each response; 0 waits forever
    #[arg(
        long = "timeout",
        env = "MCPCHECK_TIMEOUT",
        value_name = "SECS",
        default_value_t = 30
    )]
    pub read_timeout_secs: u64,

    /// Seconds the server gets to exit before it is killed
    #[arg(long = "shutdown-timeout", value_name = "SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,

    /// Milliseconds to wait after launching the server
    #[arg(long = "startup-delay-ms", value_name = "MS", default_value_t = 500)]
    pub startup_delay_ms: u64,
}

/// Log verbosity. `RUST_LOG` overrides both flags.
#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl LoggingArgs {
    /// Default filter directive for these flags.
    #[must_use]
    pub const fn filter(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

impl Cli {
    /// The per-receive bound, `None` when disabled.
    #[must_use]
    pub const fn read_timeout(&self) -> Option<Duration> {
        match self.timing.read_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Runner options derived from the flags.
    #[must_use]
    pub const fn run_options(&self) -> RunOptions {
        RunOptions {
            read_timeout: self.read_timeout(),
            startup_delay: Duration::from_millis(self.timing.startup_delay_ms),
        }
    }

    /// How to launch the server. It gets no arguments.
    #[must_use]
    pub fn server_builder(&self) -> ServerProcessBuilder {
        ServerProcessBuilder::new(&self.server)
            .shutdown_timeout(Duration::from_secs(self.timing.shutdown_timeout_secs))
    }

    /// The build step, if `--build` was given.
    #[must_use]
    pub fn build_step(&self) -> Option<BuildStep> {
        if !self.build.enabled {
            return None;
        }
        let step = BuildStep::new(&self.build.tool, &self.build.target, &self.server);
        Some(match &self.build.dir {
            Some(dir) => step.current_dir(dir),
            None => step,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mcpcheck").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.server, PathBuf::from("./gemara-mcp-server"));
        assert_eq!(cli.suite, Suite::Full);
        assert!(cli.build_step().is_none());
        assert_eq!(cli.read_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            cli.run_options().startup_delay,
            Duration::from_millis(500)
        );
        assert_eq!(cli.logging.filter(), "info");
    }

    #[test]
    fn test_flags() {
        let cli = parse(&[
            "--server",
            "/opt/bin/server",
            "--suite",
            "smoke",
            "--timeout",
            "0",
            "--startup-delay-ms",
            "0",
            "-vv",
        ]);
        assert_eq!(cli.server, PathBuf::from("/opt/bin/server"));
        assert_eq!(cli.suite, Suite::Smoke);
        assert_eq!(cli.read_timeout(), None);
        assert_eq!(cli.run_options().startup_delay, Duration::ZERO);
        assert_eq!(cli.logging.filter(), "trace");
        assert_eq!(
            cli.server_builder().program(),
            std::path::Path::new("/opt/bin/server")
        );
    }

    #[test]
    fn test_build_step() {
        let cli = parse(&["--build", "--build-tool", "make", "--build-dir", "/src"]);
        let step = cli.build_step().unwrap();
        assert_eq!(step.tool(), "make");
        assert_eq!(
            step.args(),
            vec!["build", "-o", "./gemara-mcp-server", "./cmd/gemara-mcp-server"]
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(
            Cli::try_parse_from(["mcpcheck", "--suite", "everything"]).is_err()
        );
        assert!(Cli::try_parse_from(["mcpcheck", "-v", "-q"]).is_err());
        assert!(
            Cli::try_parse_from(["mcpcheck", "--timeout", "soon"]).is_err()
        );
    }

    #[test]
    fn test_suites_map_to_scenarios() {
        assert_eq!(Suite::Smoke.scenario().name, "smoke");
        assert_eq!(Suite::Prompts.scenario().name, "prompts");
        assert_eq!(Suite::Full.scenario().steps.len(), 7);
    }
}
