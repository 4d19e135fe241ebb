//! mixsda runs statistical disclosure attacks against a participant of a
//! simulated mix network, given a trace of the packets that went through
//! the network.
//!
//! # Getting started
//!
//! mixsda takes as input a trace file, such as:
//!
//!     alice
//!     ['bob', 'carol']
//!     [[0.0, 0.5, 0.5], [1.0, 0.0, 0.0], [0.5, 0.5, 0.0]]
//!     {'src': 'alice', 'dst': 'bob', 'time_sent': 0.12, 'time_delivered': 0.31}
//!     ...
//!
//! where the first line names the target of the attack, the second lists
//! its real recipients, the third is the sending profile of every
//! participant (or `[]`), and the remaining lines are packets.
//!
//! The general syntax is:
//!
//!     mixsda <estimate> [options] <trace>
//!
//! ## Estimates
//!
//! **standard** Statistical disclosure attack: the packets received
//! shortly after the target sends are compared to a background profile
//! of the other participants (their sending profile, or uniform).
//!
//! **extended** The background is learnt from rounds in which the target
//! was silent but the participants sending alongside it (its cloak) were
//! active.
//!
//! ## Further options
//!
//! Mixing parameters are read from a TOML file (`--config`), and can be
//! overridden from the command line. With `--over-time`, `mixsda` reports
//! the accuracy after each round, and how many rounds were needed for it
//! to settle within `--delta` of its final value for at least `--qstop`
//! rounds.
use docopt::Docopt;
use serde::Deserialize;
use std::process;
use tracing::info;

use mixsda::Result;
use mixsda::attack::{AttackOutcome, run_disclosure_attack, write_curve};
use mixsda::config::{AttackConfig, MixStrategy, MixingParams};
use mixsda::error::SdaError;
use mixsda::estimates::Estimate;
use mixsda::evaluation::convergence_point;
use mixsda::trace::Trace;


const USAGE: &str = "
Statistical disclosure attacks on mix network traces.

Usage: mixsda standard [options] <trace>
       mixsda extended [options] <trace>
       mixsda (--help | --version)

Options:
    --config=<file>             TOML file with the attack configuration.
    --mu=<mu>                   Inverse of the mean delay at each mix.
    --hops=<n>                  Number of mix layers crossed by packets.
    --mix=<type>                Mixing strategy: threshold, pool or
                                stopandgo.
    --threshold=<b>             Messages per round for threshold and pool
                                mixing (threshold, or pool size).
    --confidence=<c>            Confidence of the delay bound.
    --uniform                   Use a uniform background instead of the
                                trace's sending profile.
    --over-time                 Report the accuracy after each round.
    --log=<file>                Write the accuracy curve to this CSV file.
    --delta=<d>                 Delta for delta convergence [default: 0.05].
    --qstop=<q>                 Number of rounds to declare
                                delta-convergence [default: 10].
    -v, --verbose               Log debugging information to stderr.
    -h, --help                  Show help.
    --version                   Show the version.
";

#[derive(Deserialize)]
struct Args {
    cmd_extended: bool,
    flag_config: Option<String>,
    flag_mu: Option<f64>,
    flag_hops: Option<usize>,
    flag_mix: Option<String>,
    flag_threshold: Option<f64>,
    flag_confidence: Option<f64>,
    flag_uniform: bool,
    flag_over_time: bool,
    flag_log: Option<String>,
    flag_delta: f64,
    flag_qstop: usize,
    flag_verbose: bool,
    arg_trace: String,
}

/// Parses the mixing strategy named on the command line.
fn mix_strategy(name: &str, b: Option<f64>) -> Result<MixStrategy> {
    let needs_b = || SdaError::Config(format!("--mix={} requires --threshold", name));
    match name {
        "threshold" => Ok(MixStrategy::Threshold { threshold: b.ok_or_else(needs_b)? }),
        "pool" => Ok(MixStrategy::Pool { size: b.ok_or_else(needs_b)? }),
        "stopandgo" => Ok(MixStrategy::StopAndGo),
        _ => Err(SdaError::Config(format!("unknown mixing strategy: {}", name))),
    }
}

/// Builds the attack configuration from the configuration file, if any,
/// and the command line flags, which take precedence.
fn attack_config(args: &Args) -> Result<AttackConfig> {
    let mut config = match args.flag_config {
        Some(ref path) => AttackConfig::load_from_file(path)?,
        None => {
            let missing = |flag: &str| SdaError::Config(format!("{} is required without --config",
                                                          flag));
            let mu = args.flag_mu.ok_or_else(|| missing("--mu"))?;
            let n_hops = args.flag_hops.ok_or_else(|| missing("--hops"))?;
            let mix = args.flag_mix.as_deref().ok_or_else(|| missing("--mix"))?;
            let strategy = mix_strategy(mix, args.flag_threshold)?;
            AttackConfig::new(MixingParams { mu, n_hops, strategy })
        },
    };

    if let Some(mu) = args.flag_mu {
        config.mixing.mu = mu;
    }
    if let Some(n_hops) = args.flag_hops {
        config.mixing.n_hops = n_hops;
    }
    if let Some(ref mix) = args.flag_mix {
        config.mixing.strategy = mix_strategy(mix, args.flag_threshold)?;
    } else if let Some(b) = args.flag_threshold {
        match config.mixing.strategy {
            MixStrategy::Threshold { ref mut threshold } => *threshold = b,
            MixStrategy::Pool { ref mut size } => *size = b,
            MixStrategy::StopAndGo => {},
        }
    }
    if let Some(c) = args.flag_confidence {
        config.confidence = c;
    }
    if args.flag_uniform {
        config.use_background_profile = false;
    }
    if args.flag_over_time {
        config.over_time = true;
    }
    config.estimate = if args.cmd_extended { Estimate::Extended } else { Estimate::Standard };

    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = attack_config(args)?;
    let trace = Trace::load(&args.arg_trace)?;
    info!("{} participants, {} packets", trace.n_participants(), trace.packets.len());

    match run_disclosure_attack(&trace, &config)? {
        AttackOutcome::Ranked { predicted, accuracy, .. } => {
            let ids = predicted.iter()
                               .map(|&i| trace.participant_id(i).unwrap_or("?"))
                               .collect::<Vec<_>>();
            println!("Predicted recipients: {}", ids.join(", "));
            println!("Accuracy: {}", accuracy);
        },
        AttackOutcome::OverTime { curve } => {
            println!("rounds, accuracy");
            for (t, a) in curve.iter().enumerate() {
                match a {
                    Some(a) => println!("{}, {}", t + 1, a),
                    None => println!("{}, -", t + 1),
                }
            }
            match convergence_point(&curve, args.flag_delta, args.flag_qstop) {
                Some(t) => println!("[*] {}-convergence after {} rounds", args.flag_delta, t),
                None => println!("[*] no {}-convergence", args.flag_delta),
            }
            if let Some(ref path) = args.flag_log {
                write_curve(path, &curve)?;
            }
        },
    }
    Ok(())
}

fn main() {
    let args: Args = Docopt::new(USAGE)
                            .map(|d| d.version(Some(env!("CARGO_PKG_VERSION").to_string())))
                            .and_then(|d| d.deserialize())
                            .unwrap_or_else(|e| e.exit());

    let level = if args.flag_verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("mixsda={}", level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("[!] {}", e);
        process::exit(1);
    }
}
