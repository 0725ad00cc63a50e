use std::ffi::OsString;
use std::path::PathBuf;

use structopt::clap;
use structopt::StructOpt;

use crate::network::loss::Loss;

/// Train a deep Q-learning agent on the catcher game and record a test run as a gif
#[derive(StructOpt, Debug, Clone, PartialEq)]
#[structopt(name = "catcher")]
pub struct Config {
    /// Width and height of the square game grid
    #[structopt(long = "grid", default_value = "11")]
    pub grid: usize,

    /// Number of transitions kept in the replay memory
    #[structopt(long = "memory", default_value = "500")]
    pub memory: usize,

    /// Number of training episodes
    #[structopt(long = "epoch", default_value = "1000")]
    pub epoch: usize,

    /// Number of transitions sampled for every learning step
    #[structopt(long = "batch", default_value = "50")]
    pub batch: usize,

    /// Probability of a random action during training
    #[structopt(long = "epsilon", default_value = "0.1")]
    pub epsilon: f64,

    /// Discount factor of future rewards
    #[structopt(long = "gamma", default_value = "0.9")]
    pub gamma: f64,

    /// Path the trained model parameters are written to
    #[structopt(long = "save", default_value = "catcher_agent.h5", parse(from_os_str))]
    pub save: PathBuf,

    /// Path of the gif recorded while testing
    #[structopt(long = "output", default_value = "catcher_output.gif", parse(from_os_str))]
    pub output: PathBuf,

    /// Learning rate of the SGD optimizer
    #[structopt(long = "lr", default_value = "0.2")]
    pub lr: f64,

    /// Training loss, only mse is supported
    #[structopt(long = "loss", default_value = "mse")]
    pub loss: Loss,

    /// Number of greedy test episodes
    #[structopt(long = "test-epoch", default_value = "100")]
    pub test_epoch: usize,

    /// Maximum number of frames in the gif
    #[structopt(long = "frames", default_value = "270")]
    pub frames: usize,

    /// Record the gif in color instead of grayscale
    #[structopt(long = "color")]
    pub color: bool,

    /// 0 is silent, 1 shows a progress bar, 2 also logs every epoch
    #[structopt(long = "verbose", default_value = "2")]
    pub verbose: u8,

    /// Seed of every random number generator, random when absent
    #[structopt(long = "seed")]
    pub seed: Option<u64>,
}

const FLAGS: [&str; 15] = [
    "grid",
    "memory",
    "epoch",
    "batch",
    "epsilon",
    "gamma",
    "save",
    "output",
    "lr",
    "loss",
    "test-epoch",
    "frames",
    "color",
    "verbose",
    "seed",
];

/// Rewrites `-name` and `-name=value` into their `--` form for every known flag.
fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(|arg| {
            let arg: OsString = arg.into();
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text.starts_with("--") {
                return arg;
            }
            let Some(flag) = text.strip_prefix('-') else {
                return arg;
            };
            let name = flag.split_once('=').map_or(flag, |(name, _)| name);
            if FLAGS.contains(&name) {
                OsString::from(format!("-{}", text))
            } else {
                arg
            }
        })
        .collect()
}

impl Config {
    /// Parses the arguments, program name first.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::from_iter_safe(normalize_args(args))
    }

    pub fn from_env_args() -> Result<Self, clap::Error> {
        Self::try_parse_from(std::env::args_os())
    }
}
