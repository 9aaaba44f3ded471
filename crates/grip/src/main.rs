use clap::Parser;
use cli::Args;
use grip_server::ServerError;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(err) = args.run().await {
        eprintln!("Error: {err}");
        if err
            .downcast_ref::<ServerError>()
            .is_some_and(ServerError::is_addr_in_use)
        {
            eprintln!(
                "This port is in use. Is a grip server already running? \
                 Stop that instance or specify another port here."
            );
        }
        std::process::exit(1);
    }
}
