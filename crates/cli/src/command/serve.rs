use crate::address::{resolve, split_address};
use crate::app::Args;
use anyhow::{anyhow, Result};
use grip_config::Config;

/// Starts a server rendering the Readme until Ctrl-C.
pub async fn run(args: &Args, config: &Config) -> Result<()> {
    let (path, address) = resolve(args.path.clone(), args.address.clone());

    let (host, port) = match address.as_deref() {
        Some(address) => {
            split_address(address).ok_or_else(|| anyhow!("Invalid address {address:?}"))?
        }
        None => (None, None),
    };
    let host = host.unwrap_or_else(|| config.host.clone());
    let port = port.unwrap_or(config.port);

    let reader = args.reader(path.as_deref())?;
    let autorefresh = !args.norefresh && config.autorefresh;
    let grip = args.grip(config, reader, autorefresh, false)?;

    grip.run(&host, port, args.browser).await?;

    Ok(())
}
