use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    local_music_skill::run().await
}
