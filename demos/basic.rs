use bitcoind_rpc_retry::{ClientOptions, RpcClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::var("BITCOIND_RPC_URL")?;

    let rpc = RpcClient::connect(
        &url,
        ClientOptions::default()
            .with_max_retries(3)
            .with_retry_delay_ms(500)
            .with_timeout_ms(5_000)
            .with_logger(|attempt: usize, method: &str, error: &bitcoind_rpc_retry::CallFailure| {
                eprintln!("retry {attempt} for {method}: {error}");
            }),
    )?;

    let height = rpc.get_block_count(()).await?;
    let tip = rpc.get_best_block_hash(()).await?;
    let header = rpc.call("getBlockHeader", [tip.clone()]).await?;

    println!("height {height}, tip {tip}");
    println!("{header:#}");

    Ok(())
}
