#[tokio::main]
async fn main() -> std::io::Result<()> {
    dungeon_chase::run_with_config().await
}
