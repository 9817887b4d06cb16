/// Liveness probe; never touches Bedrock
pub async fn liveness() -> &'static str {
    "ok"
}
