use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use clap::{Args, Subcommand};
use leadcomm_frame::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FRAME_SIZE};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept connections and print every received message.
    Serve(ServeArgs),
    /// Connect to a service and send messages.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// TCP port to listen on.
    pub port: u16,
    /// Address to bind.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,
    /// Service name used in logs and output.
    #[arg(long)]
    pub name: Option<String>,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Bytes requested per socket read.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// Largest accepted message in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Service address, e.g. 127.0.0.1:7000.
    pub addr: String,
    /// Message to send; repeat for several messages.
    #[arg(long, short = 'd', conflicts_with = "file")]
    pub data: Vec<String>,
    /// Send each line of a file as one message.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Do not send the disconnect sentinel afterwards.
    #[arg(long)]
    pub keep_open: bool,
    /// Wait for one reply message and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for a reply when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
    /// Maximum time to establish the connection (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
