// allergyguard - keeping meals safe, one allergy at a time

use allergyguard::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
