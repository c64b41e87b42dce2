use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use probekit_capture::configs::Settings;
use probekit_capture::services::LogFormat;

/// Capture CoAP/MQTT traffic from a sensor grid and analyse the captures.
#[derive(Debug, Parser)]
#[command(name = "probekit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding default.toml and {RUN_MODE}.toml
    #[arg(long, global = true, default_value = "configs")]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Probe every listed CoAP resource with every method
    Coap(CoapArgs),

    /// Record every message published on an MQTT broker
    Mqtt(MqttArgs),

    /// Print the noise-filtered key grouping of a capture log
    Group {
        log: PathBuf,

        /// Print `<count> <key> <values>` lines sorted by key instead of JSON
        #[arg(long)]
        text: bool,
    },

    /// Extract coordinates from a capture log and render the occupancy grid
    Grid {
        log: PathBuf,

        #[arg(long, value_enum, default_value_t = LogFormat::Hits)]
        format: LogFormat,

        /// Separator after the coordinate in `lines` logs
        #[arg(long)]
        line_separator: Option<String>,

        /// Also write the extracted hits to this file
        #[arg(long)]
        hits_out: Option<PathBuf>,
    },

    /// Report coordinates captured by both logs and draw them on one grid
    Conflicts {
        left: PathBuf,
        right: PathBuf,

        #[arg(long, value_enum, default_value_t = LogFormat::Hits)]
        left_format: LogFormat,

        #[arg(long, value_enum, default_value_t = LogFormat::Lines)]
        right_format: LogFormat,

        #[arg(long, default_value_t = 'C')]
        left_label: char,

        #[arg(long, default_value_t = 'M')]
        right_label: char,

        /// Separator after the coordinate in `lines` logs
        #[arg(long)]
        line_separator: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CoapArgs {
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Resource list, one path per line
    #[arg(long)]
    pub resources: Option<String>,

    /// Capture document to (re)create
    #[arg(long)]
    pub output: Option<String>,

    /// Per-request timeout, 0 to wait forever
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Args)]
pub struct MqttArgs {
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Topic filter to subscribe to
    #[arg(long)]
    pub topic: Option<String>,

    /// Time budget in seconds
    #[arg(long)]
    pub listen_secs: Option<u64>,

    /// Capture document to (re)create
    #[arg(long)]
    pub output: Option<String>,
}

impl Command {
    /// Folds command-line overrides into the loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        match self {
            Command::Coap(args) => {
                let coap = &mut settings.coap;
                override_with(&mut coap.host, &args.host);
                override_with(&mut coap.port, &args.port);
                override_with(&mut coap.resources, &args.resources);
                override_with(&mut coap.timeout_secs, &args.timeout_secs);
                override_with(&mut settings.sink.path, &args.output);
            }
            Command::Mqtt(args) => {
                let mqtt = &mut settings.mqtt;
                override_with(&mut mqtt.host, &args.host);
                override_with(&mut mqtt.port, &args.port);
                override_with(&mut mqtt.topic, &args.topic);
                override_with(&mut mqtt.listen_secs, &args.listen_secs);
                override_with(&mut settings.sink.path, &args.output);
            }
            Command::Grid { line_separator, .. } | Command::Conflicts { line_separator, .. } => {
                override_with(&mut settings.analyser.line_separator, line_separator);
            }
            Command::Group { .. } => {}
        }
    }
}

fn override_with<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}
