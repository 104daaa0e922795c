//! Supervised execution of a single Claude Code run.
//!
//! This module connects the process spawner, the stream parser and the
//! output mirror. One `tokio::select!` loop owns everything belonging to a
//! run: both pipe readers, the idle check, the kill deadline and the exit
//! wait. Nothing is detached, so every resource is released when the run
//! resolves.

use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::time::{Instant, MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::cli::{
    exit_signal_name, ClaudeEvent, ClaudeProcess, ClaudeProcessBuilder, LineReader, StreamParser,
    DEFAULT_PROGRAM,
};
use crate::config::RunnerConfig;
use crate::display;
use crate::output::{Mirror, OutputSink};
use crate::supervisor::{LivenessClock, RunError, RunStateMachine, TerminationReason};

/// Default idle timeout before the process is terminated.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Default delay between SIGTERM and SIGKILL.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Default interval of the idle check.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest idle-check interval; a zero period would make the ticker panic.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(1);

/// Default time to wait for the pipes to close once the process has exited.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Options for a supervised run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Longest allowed gap between output lines.
    pub timeout: Duration,
    /// Mirror answer text to the sink as it arrives.
    pub stream_output: bool,
    /// Pass `--verbose` to Claude Code.
    pub verbose: bool,
    /// Copy the child's stderr lines to our stderr.
    pub forward_stderr: bool,
    /// Interval of the idle check.
    pub check_interval: Duration,
    /// Delay between SIGTERM and SIGKILL.
    pub grace_period: Duration,
    /// Time to wait for the pipes to close after exit.
    pub drain_timeout: Duration,
    /// Program to run.
    pub program: String,
    /// Arguments placed before the Claude arguments.
    pub program_args: Vec<String>,
    /// Working directory for the process.
    pub working_dir: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_IDLE_TIMEOUT,
            stream_output: true,
            verbose: true,
            forward_stderr: false,
            check_interval: DEFAULT_CHECK_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            program: DEFAULT_PROGRAM.to_string(),
            program_args: Vec::new(),
            working_dir: None,
        }
    }
}

impl RunOptions {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn stream_output(mut self, enabled: bool) -> Self {
        self.stream_output = enabled;
        self
    }

    #[must_use]
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    #[must_use]
    pub fn forward_stderr(mut self, enabled: bool) -> Self {
        self.forward_stderr = enabled;
        self
    }

    #[must_use]
    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    #[must_use]
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    #[must_use]
    pub fn drain_timeout(mut self, drain: Duration) -> Self {
        self.drain_timeout = drain;
        self
    }

    /// Run `program` with `args` in front of the Claude arguments.
    #[must_use]
    pub fn program(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.program = program.into();
        self.program_args = args;
        self
    }

    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl From<&RunnerConfig> for RunOptions {
    fn from(config: &RunnerConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            stream_output: config.stream_output,
            verbose: config.verbose,
            forward_stderr: config.forward_stderr,
            grace_period: Duration::from_secs(config.grace_period_secs),
            program: config.program.clone(),
            program_args: config.program_args.clone(),
            ..Self::default()
        }
    }
}

/// Runs Claude Code non-interactively and collects the answer.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    options: RunOptions,
}

impl Runner {
    #[must_use]
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run Claude Code with `prompt` and return the full answer text.
    ///
    /// Answer text is mirrored to `sink` while it streams in when
    /// `stream_output` is set; a failing sink is abandoned without failing
    /// the run. Cancelling `cancel` starts the same SIGTERM/SIGKILL sequence
    /// as an idle timeout.
    ///
    /// # Errors
    ///
    /// - `RunError::InvalidInput` if the prompt is blank (nothing is spawned)
    /// - `RunError::Spawn` if the process cannot be started
    /// - `RunError::Signal` if the process was killed by a signal
    /// - `RunError::AbnormalExit` on a non-zero exit code
    /// - `RunError::Terminated` if the process outlived the grace period
    pub async fn execute<S>(
        &self,
        prompt: &str,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<String, RunError>
    where
        S: OutputSink + ?Sized,
    {
        if prompt.trim().is_empty() {
            return Err(RunError::InvalidInput);
        }
        if cancel.is_cancelled() {
            return Err(RunError::Terminated {
                reason: TerminationReason::Cancelled,
            });
        }

        let run_id = Uuid::new_v4();
        self.supervise(prompt, sink, cancel)
            .instrument(tracing::info_span!("claude_run", %run_id))
            .await
    }

    async fn supervise<S>(
        &self,
        prompt: &str,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<String, RunError>
    where
        S: OutputSink + ?Sized,
    {
        let opts = &self.options;

        let mut builder = ClaudeProcessBuilder::new(prompt).verbose(opts.verbose);
        if let Some(dir) = &opts.working_dir {
            builder = builder.working_dir(dir);
        }
        let mut process =
            ClaudeProcess::spawn_with_command(&opts.program, &opts.program_args, &builder)?;
        tracing::info!(pid = ?process.id(), program = %opts.program, "Spawned Claude process");

        let mut stdout = process.take_stdout().map(LineReader::new);
        let mut stderr = process.take_stderr().map(LineReader::new);

        let mut run = Invocation {
            options: opts,
            answer: String::new(),
            clock: LivenessClock::start(),
            state: RunStateMachine::new(),
            mirror: Mirror::new(sink, opts.stream_output),
            saw_result: false,
        };

        let check_interval = opts.check_interval.max(MIN_CHECK_INTERVAL);
        let mut ticker = tokio::time::interval_at(Instant::now() + check_interval, check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut pending_kill: Option<PendingKill> = None;
        let mut exit: Option<ExitStatus> = None;
        let mut drain_deadline: Option<Pin<Box<Sleep>>> = None;

        loop {
            if let Some(status) = exit {
                if stdout.is_none() && stderr.is_none() {
                    return run.finish_exit(status);
                }
            }

            let accepting_triggers = exit.is_none() && !run.state.is_terminating();

            // Control branches go first so a child that floods its pipes
            // cannot starve cancellation, the forced kill or exit handling.
            // Line readers still run before the idle check.
            tokio::select! {
                biased;

                status = process.wait(), if exit.is_none() => match status {
                    Ok(status) => {
                        tracing::info!(%status, "Claude process exited");
                        pending_kill = None;
                        exit = Some(status);
                        drain_deadline = Some(Box::pin(tokio::time::sleep(opts.drain_timeout)));
                    }
                    Err(e) => return run.resolve(Err(RunError::Wait(e))),
                },

                reason = kill_due(&mut pending_kill), if pending_kill.is_some() => {
                    return run.finish_killed(reason, &mut process);
                }

                () = deadline(&mut drain_deadline), if drain_deadline.is_some() => {
                    tracing::warn!("Output streams still open after exit, keeping output read so far");
                    stdout = None;
                    stderr = None;
                }

                () = cancel.cancelled(), if accepting_triggers => {
                    if run.begin_termination(TerminationReason::Cancelled, &mut process) {
                        pending_kill = Some(PendingKill::new(TerminationReason::Cancelled, opts.grace_period));
                    }
                }

                line = next_line(&mut stdout), if stdout.is_some() => match line {
                    Ok(Some(line)) => run.on_stdout_line(&line),
                    Ok(None) => stdout = None,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read Claude stdout");
                        stdout = None;
                    }
                },

                line = next_line(&mut stderr), if stderr.is_some() => match line {
                    Ok(Some(line)) => run.on_stderr_line(&line),
                    Ok(None) => stderr = None,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read Claude stderr");
                        stderr = None;
                    }
                },

                _ = ticker.tick(), if accepting_triggers => {
                    if let Some(idle) = run.clock.stale(opts.timeout) {
                        let reason = TerminationReason::IdleTimeout { idle };
                        if run.begin_termination(reason, &mut process) {
                            pending_kill = Some(PendingKill::new(reason, opts.grace_period));
                        }
                    }
                }
            }
        }
    }
}

/// Run Claude Code, mirroring the answer to stdout.
///
/// # Errors
///
/// See [`Runner::execute`].
pub async fn run_claude(prompt: &str, options: RunOptions) -> Result<String, RunError> {
    let mut stdout = std::io::stdout();
    Runner::new(options)
        .execute(prompt, &mut stdout, &CancellationToken::new())
        .await
}

/// State owned by one in-flight run.
struct Invocation<'a, S: OutputSink + ?Sized> {
    options: &'a RunOptions,
    answer: String,
    clock: LivenessClock,
    state: RunStateMachine,
    mirror: Mirror<'a, S>,
    saw_result: bool,
}

impl<S: OutputSink + ?Sized> Invocation<'_, S> {
    fn on_stdout_line(&mut self, line: &str) {
        self.clock.touch();

        let event = match StreamParser::parse_line(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::trace!(error = %e, "Ignoring stdout line");
                return;
            }
        };

        self.saw_result |= event.is_terminal();
        match &event {
            ClaudeEvent::System(system) => tracing::debug!(
                session_id = ?event.session_id(),
                model = ?system.model,
                "Claude session started"
            ),
            ClaudeEvent::Result(result) => tracing::debug!(
                session_id = ?event.session_id(),
                cost_usd = ?result.total_cost_usd,
                num_turns = ?result.num_turns,
                is_error = result.is_error,
                "Claude reported result"
            ),
            _ => {}
        }

        for text in event.text_parts() {
            self.answer.push_str(text);
            self.mirror.write_text(text);
        }
    }

    fn on_stderr_line(&mut self, line: &str) {
        self.clock.touch();
        if self.options.forward_stderr {
            let _ = writeln!(std::io::stderr(), "{line}");
        }
    }

    /// Send SIGTERM unless a termination is already underway.
    fn begin_termination(&mut self, reason: TerminationReason, process: &mut ClaudeProcess) -> bool {
        if !self.state.begin_termination(reason) {
            return false;
        }
        tracing::warn!(
            %reason,
            grace_ms = u64::try_from(self.options.grace_period.as_millis()).unwrap_or(u64::MAX),
            "Terminating Claude process"
        );
        if let Err(e) = process.terminate() {
            tracing::warn!(error = %e, "Failed to send SIGTERM");
        }
        true
    }

    fn finish_killed(
        &mut self,
        reason: TerminationReason,
        process: &mut ClaudeProcess,
    ) -> Result<String, RunError> {
        tracing::warn!(%reason, "Grace period elapsed, killing Claude process");
        if let Err(e) = process.start_kill() {
            tracing::warn!(error = %e, "Failed to send SIGKILL");
        }
        display::print_termination(&reason);
        self.resolve(Err(RunError::Terminated { reason }))
    }

    fn finish_exit(&mut self, status: ExitStatus) -> Result<String, RunError> {
        self.mirror.write_line_end();

        if let Some(reason) = self.state.termination_reason() {
            tracing::info!(%reason, "Claude exited within the grace period");
        }
        if status.success() && !self.saw_result {
            tracing::debug!("Claude exited without a result event");
        }

        let result = if let Some(signal) = exit_signal_name(&status) {
            Err(RunError::Signal { signal })
        } else {
            match status.code() {
                Some(0) => Ok(std::mem::take(&mut self.answer)),
                code => Err(RunError::AbnormalExit {
                    code: code.unwrap_or(1),
                }),
            }
        };

        self.resolve(result)
    }

    /// Record the single resolution of this run.
    fn resolve(&mut self, result: Result<String, RunError>) -> Result<String, RunError> {
        let first = self.state.resolve(result.is_ok());
        debug_assert!(first, "run resolved twice");
        result
    }
}

/// Forced kill scheduled after a termination request.
struct PendingKill {
    reason: TerminationReason,
    deadline: Pin<Box<Sleep>>,
}

impl PendingKill {
    fn new(reason: TerminationReason, grace: Duration) -> Self {
        Self {
            reason,
            deadline: Box::pin(tokio::time::sleep(grace)),
        }
    }
}

async fn next_line<R: AsyncRead + Unpin>(
    reader: &mut Option<LineReader<R>>,
) -> std::io::Result<Option<String>> {
    match reader {
        Some(reader) => reader.next_line().await,
        None => std::future::pending().await,
    }
}

async fn kill_due(pending: &mut Option<PendingKill>) -> TerminationReason {
    match pending {
        Some(kill) => {
            kill.deadline.as_mut().await;
            kill.reason
        }
        None => std::future::pending().await,
    }
}

async fn deadline(sleep: &mut Option<Pin<Box<Sleep>>>) {
    match sleep {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
