use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_CONFIG: &str = "bedrock-gateway.toml";

/// OpenAI-compatible gateway for Amazon Bedrock
#[derive(Debug, Parser)]
#[command(name = "bedrock-gateway", about = "OpenAI-compatible API gateway for Amazon Bedrock")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG, env = "BEDROCK_GATEWAY_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "BEDROCK_GATEWAY_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log filter directive
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log: String,
}
