use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Builder;

use ndn_lsr::config::RouterConfig;
use ndn_lsr::router::InstanceId;
use ndn_lsr::transport::UdpTransport;
use ndn_lsr::tuning::ThresholdPolicy;

#[derive(Parser)]
#[command(name = "nlsrd", about = "Named-data link-state routing daemon")]
struct Cli {
    /// Router configuration file (JSON)
    #[arg(long, short)]
    config: PathBuf,

    /// Adjust the LSA interest lifetime every N seconds
    #[arg(long)]
    tuning_interval: Option<u64>,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let conf = RouterConfig::load(&cli.config)?;
    if cli.dump_config {
        println!("{}", serde_json::to_string_pretty(&conf)?);
        return Ok(());
    }

    let instance = InstanceId::random();
    info!("Starting {} as instance {}", conf.router_prefix(), instance);

    let rt = Builder::new_multi_thread().enable_all().build()?;

    rt.block_on(async {
        let mut transport = UdpTransport::bind(conf, instance).await?;
        if let Some(secs) = cli.tuning_interval {
            transport
                .router_mut()
                .set_tuning_policy(Box::new(ThresholdPolicy::default()), Duration::from_secs(secs));
        }
        transport.run().await
    })
}
