#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lib_regionguard::init().await
}
