use clap::Parser;
use sip_proxy_resolver::{
    account::{AccountKey, MemoryAccountConfig},
    dns::HickoryLookup,
    transport::parse_transport,
    ProxyConnectionBuilder, Result,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Print the SIP proxy addresses an account would try, in order")]
struct Args {
    /// Account user ID, e.g. alice@example.com
    #[arg(short, long)]
    user_id: Option<String>,

    /// Registrar used when the user ID carries no domain
    #[arg(short, long)]
    server: Option<String>,

    /// Proxy host; resolves this instead of the account domain
    #[arg(short, long)]
    proxy: Option<String>,

    /// Proxy port (manual mode only)
    #[arg(long)]
    port: Option<u16>,

    /// Preferred transport: udp, tcp or tls
    #[arg(short, long)]
    transport: Option<String>,

    /// Resolve the proxy with A/AAAA only, skipping NAPTR and SRV
    #[arg(short, long, default_value = "false")]
    manual: bool,

    /// Validate answers with DNSSEC; unvalidated answers stop the search
    #[arg(long, default_value = "false")]
    dnssec: bool,

    /// Log every resolution step
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let account = MemoryAccountConfig::new()
        .with(AccountKey::ProxyAutoConfig, (!args.manual).to_string());
    if let Some(user_id) = &args.user_id {
        account.set(AccountKey::UserId, user_id.as_str());
    }
    if let Some(server) = &args.server {
        account.set(AccountKey::ServerAddress, server.as_str());
    }
    if let Some(proxy) = &args.proxy {
        account.set(AccountKey::ProxyAddress, proxy.as_str());
    }
    if let Some(port) = args.port {
        account.set(AccountKey::ProxyPort, port.to_string());
    }
    if let Some(transport) = &args.transport {
        parse_transport(transport)?;
        account.set(AccountKey::PreferredTransport, transport.as_str());
    }

    let mut builder = ProxyConnectionBuilder::new()
        .with_account(Arc::new(account))
        .with_dns(Arc::new(HickoryLookup::from_system(args.dnssec)?));
    if let (false, Some(proxy)) = (args.manual, &args.proxy) {
        builder = builder.with_address(proxy.as_str());
    }
    let mut connection = builder.build()?;

    let mut count = 0;
    while connection.next_address().await? {
        count += 1;
        if let Some(line) = connection.outbound_proxy_string() {
            println!("{}", line);
        }
    }
    info!("{} proxy addresses", count);
    Ok(())
}
