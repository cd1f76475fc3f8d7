//! Command-line surface.

use clap::Parser;
use core_pipeline::{PipelineError, PipelineSpec};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "topless",
    version,
    about = "Re-run a command periodically and redraw its output in place, highlighting what changed"
)]
pub struct Args {
    /// Seconds between runs (fractional values allowed).
    #[arg(short = 's', long = "interval", default_value = "1", value_parser = parse_interval)]
    pub interval: Duration,
    /// Leave the terminal in normal mode: no keyboard control, stop with Ctrl-C.
    #[arg(short = 'i', long = "interactive")]
    pub interactive: bool,
    /// Join the command words and run them with `sh -c`.
    #[arg(long = "sh")]
    pub shell: bool,
    /// Keep running and displaying output when the command fails.
    #[arg(short = 'f', long = "force")]
    pub force: bool,
    /// Configuration file path (overrides discovery of `topless.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Command to watch. A standalone `|` argument separates pipeline stages.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Args {
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn pipeline(&self) -> Result<PipelineSpec, PipelineError> {
        if self.shell {
            PipelineSpec::shell(&self.command)
        } else {
            PipelineSpec::direct(&self.command)
        }
    }
}

fn parse_interval(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a number of seconds"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!(
            "interval must be a positive number of seconds, got `{raw}`"
        ));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("interval `{raw}` out of range: {e}"))
}

/// Rewrite the single-dash `-sh` spelling to `--sh` among the leading
/// options. Everything from the first command word on is passed through
/// untouched, so `topless ls -sh` keeps `-sh` as an `ls` flag.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut iter = args.into_iter().map(Into::into);
    let mut out: Vec<OsString> = iter.next().into_iter().collect();
    let mut expects_value = false;
    while let Some(arg) = iter.next() {
        if expects_value {
            expects_value = false;
            out.push(arg);
            continue;
        }
        match arg.to_str() {
            Some("-sh") => out.push("--sh".into()),
            Some("-s" | "--interval" | "--config") => {
                expects_value = true;
                out.push(arg);
            }
            Some("--") => {
                out.push(arg);
                out.extend(iter);
                break;
            }
            Some(opt) if opt.starts_with('-') && opt.len() > 1 => out.push(arg),
            _ => {
                out.push(arg);
                out.extend(iter);
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(normalize_args(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let a = parse(&["topless", "date"]);
        assert_eq!(a.interval, Duration::from_secs(1));
        assert!(!a.interactive && !a.shell && !a.force);
        assert_eq!(a.command, vec!["date"]);
    }

    #[test]
    fn fractional_interval_and_flags() {
        let a = parse(&["topless", "-s", "0.25", "-f", "-i", "uptime"]);
        assert_eq!(a.interval, Duration::from_millis(250));
        assert!(a.force);
        assert!(a.interactive);
    }

    #[test]
    fn single_dash_sh_is_accepted() {
        let a = parse(&["topless", "-sh", "ps aux | grep x"]);
        assert!(a.shell);
        let spec = a.pipeline().unwrap();
        assert_eq!(
            spec.stages(),
            &[vec!["sh".to_string(), "-c".into(), "ps aux | grep x".into()]]
        );
    }

    #[test]
    fn command_flags_are_not_rewritten() {
        let a = parse(&["topless", "ls", "-sh", "-l"]);
        assert!(!a.shell);
        assert_eq!(a.command, vec!["ls", "-sh", "-l"]);
    }

    #[test]
    fn interval_value_is_not_mistaken_for_command() {
        let out = normalize_args(["topless", "-s", "2", "-sh", "date"]);
        assert_eq!(out, vec!["topless", "-s", "2", "--sh", "date"]);
    }

    #[test]
    fn pipe_argument_splits_stages() {
        let a = parse(&["topless", "printf", "hi", "|", "tr", "h", "H"]);
        let spec = a.pipeline().unwrap();
        assert_eq!(spec.stages().len(), 2);
    }

    #[test]
    fn rejects_bad_intervals() {
        for bad in ["0", "-1", "nan", "inf", "abc"] {
            let res = Args::try_parse_from(["topless", "-s", bad, "date"]);
            assert!(res.is_err(), "accepted interval {bad}");
        }
    }

    #[test]
    fn command_is_required() {
        assert!(Args::try_parse_from(["topless", "-f"]).is_err());
    }
}
