use crate::symbols::TargetSymbols;
use crate::timeframe::{self, IntervalConfig, InvalidTimeframe};
use clap::{ArgAction, CommandFactory, Parser};
use std::io::{self, BufRead, Write};

const EXAMPLES: &str = "\
Examples:
  crypto-cycles                         Run continuously (all symbols)
  crypto-cycles --5m                    Run every 5 minutes (all symbols)
  crypto-cycles --symbols BTC,ETH,ADA   Run continuously (specific symbols)
  crypto-cycles --test --symbol BTC     Test run (BTC only)
  crypto-cycles --preview               Preview mappings

Timeframes: --2m, --5m, --15m, --30m, --1h, --2h, --4h, --6h, --12h, --1d
Minimum interval is 2 minutes (--2m)";

/// Forward CoinGecko prices to Cycles streams
#[derive(Debug, Parser)]
#[command(name = "crypto-cycles", after_help = EXAMPLES)]
struct Cli {
    /// Run a single cycle and exit
    #[arg(long, conflicts_with = "preview")]
    test: bool,

    /// Show the stream mappings without sending anything
    #[arg(long)]
    preview: bool,

    /// Single symbol, may be repeated
    #[arg(short = 's', long = "symbol", value_name = "SYMBOL", action = ArgAction::Append)]
    symbol: Vec<String>,

    /// Comma-separated symbols
    #[arg(long, value_name = "LIST", value_delimiter = ',', action = ArgAction::Append)]
    symbols: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Continuous,
    SingleRun,
    Preview,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Usage(#[from] clap::Error),
    #[error(transparent)]
    InvalidTimeframe(#[from] InvalidTimeframe),
}

/// What the command line asked for, before any interactive fallback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub mode: Option<Mode>,
    pub interval: IntervalConfig,
    pub targets: TargetSymbols,
}

/// Fully resolved run settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub mode: Mode,
    pub interval: IntervalConfig,
    pub targets: TargetSymbols,
}

impl CliArgs {
    /// Parse the full argv, program name first.
    ///
    /// `--<n><unit>` tokens are not clap flags; they are taken out first and
    /// the last one sets the interval.
    pub fn parse<I>(argv: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let (timeframes, rest): (Vec<String>, Vec<String>) = argv
            .into_iter()
            .partition(|arg| timeframe::looks_like_timeframe(arg));

        let cli = Cli::try_parse_from(rest)?;

        let mut interval = IntervalConfig::default();
        for token in &timeframes {
            interval = timeframe::parse(token)?;
        }

        let mode = if cli.test {
            Some(Mode::SingleRun)
        } else if cli.preview {
            Some(Mode::Preview)
        } else {
            None
        };

        Ok(Self {
            mode,
            interval,
            targets: TargetSymbols::normalize(cli.symbol.iter().chain(&cli.symbols)),
        })
    }

    /// Neither a mode nor any symbol was given
    pub fn needs_prompt(&self) -> bool {
        self.mode.is_none() && self.targets.is_empty()
    }

    /// Resolve without asking anything; no mode means continuous
    pub fn into_plan(self) -> RunPlan {
        RunPlan {
            mode: self.mode.unwrap_or(Mode::Continuous),
            interval: self.interval,
            targets: self.targets,
        }
    }

    /// Ask for a mode and, if none were given, symbols
    pub fn prompt<R: BufRead, W: Write>(self, input: &mut R, output: &mut W) -> io::Result<RunPlan> {
        writeln!(output, "\n{}", Cli::command().render_help())?;

        let choice = ask(input, output, "\nChoose mode (c)ontinuous/(t)est/(p)review: ")?;
        let mode = match choice.to_lowercase().as_str() {
            "c" | "continuous" => Mode::Continuous,
            "p" | "preview" => Mode::Preview,
            _ => Mode::SingleRun,
        };

        let mut targets = self.targets;
        if targets.is_empty() {
            let symbols = ask(
                input,
                output,
                "Enter symbols (comma-separated, or press Enter for all): ",
            )?;
            targets = TargetSymbols::normalize([symbols]);
            if !targets.is_empty() {
                writeln!(output, "Will monitor symbols: {}", targets)?;
            }
        }

        Ok(RunPlan {
            mode,
            interval: self.interval,
            targets,
        })
    }
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<String> {
    write!(output, "{}", question)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeframe::TimeframeReason;
    use clap::error::ErrorKind;
    use std::io::Cursor;

    fn parse(args: &[&str]) -> Result<CliArgs, CliError> {
        CliArgs::parse(
            std::iter::once("crypto-cycles")
                .chain(args.iter().copied())
                .map(String::from),
        )
    }

    fn usage_kind(err: CliError) -> ErrorKind {
        match err {
            CliError::Usage(e) => e.kind(),
            other => panic!("expected a usage error, got {:?}", other),
        }
    }

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_arguments() {
        let args = parse(&[]).unwrap();

        assert_eq!(args, CliArgs::default());
        assert!(args.needs_prompt());
        assert_eq!(args.into_plan().mode, Mode::Continuous);
    }

    #[test]
    fn test_modes() {
        assert_eq!(parse(&["--test"]).unwrap().mode, Some(Mode::SingleRun));
        assert_eq!(parse(&["--preview"]).unwrap().mode, Some(Mode::Preview));
        assert_eq!(
            usage_kind(parse(&["--preview", "--test"]).unwrap_err()),
            ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_all_symbol_forms_merge() {
        let args = parse(&[
            "--symbol",
            "btc",
            "-s",
            "eth",
            "--symbol=sol",
            "--symbols",
            "ada,dot",
            "--symbols=xrp, BTC",
        ])
        .unwrap();

        assert_eq!(args.targets.to_string(), "ADA, BTC, DOT, ETH, SOL, XRP");
        assert!(!args.needs_prompt());
        assert_eq!(args.into_plan().mode, Mode::Continuous);
    }

    #[test]
    fn test_timeframe_flag() {
        let args = parse(&["--test", "--15m"]).unwrap();

        assert_eq!(args.interval.seconds, 900);
        assert_eq!(args.interval.label, "15 minutes");
    }

    #[test]
    fn test_timeframe_between_flag_and_value() {
        let args = parse(&["--symbol", "--1h", "btc"]).unwrap();

        assert_eq!(args.interval.seconds, 3600);
        assert_eq!(args.targets.to_string(), "BTC");
    }

    #[test]
    fn test_last_timeframe_wins() {
        let args = parse(&["--5m", "--1d"]).unwrap();
        assert_eq!(args.interval.seconds, 86_400);
    }

    #[test]
    fn test_bad_timeframe_is_fatal() {
        let err = parse(&["--1m"]).unwrap_err();
        assert!(matches!(
            err,
            CliError::InvalidTimeframe(InvalidTimeframe {
                reason: TimeframeReason::BelowMinimum(60),
                ..
            })
        ));

        assert!(matches!(
            parse(&["--5x"]).unwrap_err(),
            CliError::InvalidTimeframe(_)
        ));
    }

    #[test]
    fn test_missing_values() {
        assert!(matches!(parse(&["--symbol"]), Err(CliError::Usage(_))));
        assert!(matches!(
            parse(&["--test", "--symbols"]),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn test_unknown_argument() {
        assert_eq!(
            usage_kind(parse(&["--verbose"]).unwrap_err()),
            ErrorKind::UnknownArgument
        );
        assert!(parse(&["test"]).is_err());
    }

    #[test]
    fn test_help_flag() {
        assert_eq!(
            usage_kind(parse(&["--help"]).unwrap_err()),
            ErrorKind::DisplayHelp
        );
        assert_eq!(
            usage_kind(parse(&["-h"]).unwrap_err()),
            ErrorKind::DisplayHelp
        );
    }

    #[test]
    fn test_prompt_continuous_with_symbols() {
        let args = parse(&["--5m"]).unwrap();
        let mut input = Cursor::new("c\nbtc, eth\n");
        let mut output = Vec::new();

        let plan = args.prompt(&mut input, &mut output).unwrap();

        assert_eq!(plan.mode, Mode::Continuous);
        assert_eq!(plan.interval.seconds, 300);
        assert_eq!(plan.targets, TargetSymbols::normalize(["BTC", "ETH"]));
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("--symbols <LIST>"));
        assert!(printed.contains("Choose mode"));
        assert!(printed.contains("Will monitor symbols: BTC, ETH"));
    }

    #[test]
    fn test_prompt_preview_all_symbols() {
        let mut input = Cursor::new("preview\n\n");
        let plan = CliArgs::default()
            .prompt(&mut input, &mut Vec::new())
            .unwrap();

        assert_eq!(plan.mode, Mode::Preview);
        assert!(plan.targets.is_empty());
    }

    #[test]
    fn test_prompt_defaults_to_single_run() {
        // closed stdin
        let mut input = Cursor::new("");
        let plan = CliArgs::default()
            .prompt(&mut input, &mut Vec::new())
            .unwrap();

        assert_eq!(plan.mode, Mode::SingleRun);
        assert_eq!(plan.interval, IntervalConfig::default());
    }
}
